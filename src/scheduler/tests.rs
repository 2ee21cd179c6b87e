use super::*;
use crate::model::{
    attrs, kinds, Device, DeviceStatus, DeviceType, SecurityState, SecuritySystem, Severity,
    WeatherCondition, WeatherSnapshot,
};
use chrono::Duration;
use serde_json::json;

struct Home {
    store: Arc<WorldStore>,
    devices: Arc<DeviceSimulator>,
    engine: SchedulingEngine,
}

fn home_with(config: SimulationConfig) -> Home {
    let store = Arc::new(WorldStore::new());
    let devices = Arc::new(DeviceSimulator::new(Arc::clone(&store), &config));
    let engine = SchedulingEngine::new(Arc::clone(&store), Arc::clone(&devices), &config);
    Home {
        store,
        devices,
        engine,
    }
}

fn home() -> Home {
    home_with(SimulationConfig {
        random_seed: Some(1),
        ..SimulationConfig::default()
    })
}

fn events_of(store: &WorldStore, event_type: &str) -> Vec<crate::model::SystemEvent> {
    store
        .get_system_events(0)
        .into_iter()
        .filter(|e| e.event_type == event_type)
        .collect()
}

#[test]
fn test_add_task_defaults() {
    let h = home();
    let before = Utc::now();
    let task = h
        .engine
        .add_task(ScheduledTask::new("Lights on", "light_001", "turn_on", "every_15_minutes"))
        .unwrap();

    assert!(task.id.starts_with("task_"));
    assert!(task.enabled);
    let next = task.next_run.unwrap();
    assert!(next >= before + Duration::minutes(15));
    assert!(next <= Utc::now() + Duration::minutes(15));
    assert_eq!(h.engine.get_task(&task.id).unwrap(), task);
}

#[test]
fn test_add_task_forces_enabled_and_keeps_explicit_next_run() {
    let h = home();
    let at = Utc::now() + Duration::days(2);
    let mut task = ScheduledTask::new("Later", "light_001", "turn_off", "daily").with_id("later");
    task.enabled = false;
    task.next_run = Some(at);

    let task = h.engine.add_task(task).unwrap();
    assert!(task.enabled);
    assert_eq!(task.next_run, Some(at));
}

#[test]
fn test_add_task_rejects_unknown_keywords() {
    let h = home();

    let err = h
        .engine
        .add_task(ScheduledTask::new("x", "light_001", "explode", "hourly"))
        .unwrap_err();
    assert_eq!(err, HubError::UnknownAction("explode".to_string()));

    let err = h
        .engine
        .add_task(ScheduledTask::new("x", "light_001", "turn_on", "fortnightly"))
        .unwrap_err();
    assert_eq!(err, HubError::UnknownSchedule("fortnightly".to_string()));
    assert!(h.engine.list_tasks().is_empty());
}

#[test]
fn test_add_task_duplicate_id_conflicts() {
    let h = home();
    let task = ScheduledTask::new("x", "light_001", "turn_on", "hourly").with_id("t1");
    h.engine.add_task(task.clone()).unwrap();
    assert_eq!(h.engine.add_task(task).unwrap_err().kind(), "Conflict");
}

#[test]
fn test_process_tasks_runs_due_tasks() {
    let h = home();
    h.devices.seed_default_devices();

    let mut due = ScheduledTask::new("Dim", "light_001", "set_brightness", "hourly")
        .with_id("dim")
        .with_parameters(attrs([("brightness", json!(15))]));
    due.next_run = Some(Utc::now() - Duration::seconds(5));
    h.store.add_task(due).unwrap();

    let mut later = ScheduledTask::new("Off", "light_001", "turn_off", "hourly").with_id("later");
    later.next_run = Some(Utc::now() + Duration::hours(1));
    h.store.add_task(later).unwrap();

    let mut disabled = ScheduledTask::new("Lock", "lock_001", "unlock", "hourly").with_id("disabled");
    disabled.enabled = false;
    h.store.add_task(disabled).unwrap();

    assert_eq!(h.engine.process_tasks(), 1);

    let light = h.store.get_device("light_001").unwrap();
    assert_eq!(light.int("brightness"), Some(15));
    assert_eq!(light.flag("power"), Some(true));
    assert_eq!(h.store.get_device("lock_001").unwrap().flag("locked"), Some(true));

    let ran = h.store.get_task("dim").unwrap();
    assert!(ran.last_run.is_some());
    assert!(ran.next_run.unwrap() > Utc::now() + Duration::minutes(59));

    let executed = events_of(&h.store, kinds::TASK_EXECUTED);
    assert_eq!(executed.len(), 1);
    assert_eq!(executed[0].message, "Task Dim executed successfully");
    assert_eq!(executed[0].data["action"], "set_brightness");

    // Rescheduled, so a second pass does nothing
    assert_eq!(h.engine.process_tasks(), 0);
}

#[test]
fn test_task_with_missing_device_is_skipped() {
    let h = home();
    h.store
        .add_task(ScheduledTask::new("Ghost", "ghost_1", "turn_on", "hourly").with_id("ghost"))
        .unwrap();

    assert_eq!(h.engine.process_tasks(), 0);
    let task = h.store.get_task("ghost").unwrap();
    assert!(task.last_run.is_none());
    assert!(events_of(&h.store, kinds::TASK_EXECUTED).is_empty());

    assert_eq!(
        h.engine.trigger_task("ghost").unwrap_err(),
        HubError::device_not_found("ghost_1")
    );
}

#[test]
fn test_unknown_action_in_store_is_skipped() {
    let h = home();
    h.devices.seed_default_devices();
    h.store
        .add_task(ScheduledTask::new("Odd", "light_001", "dance", "hourly").with_id("odd"))
        .unwrap();

    assert_eq!(h.engine.process_tasks(), 0);
    assert!(h.store.get_task("odd").unwrap().last_run.is_none());
    assert_eq!(
        h.engine.trigger_task("odd").unwrap_err(),
        HubError::UnknownAction("dance".to_string())
    );
}

#[test]
fn test_unknown_schedule_in_store_defaults_to_hourly() {
    let h = home();
    h.devices.seed_default_devices();
    h.store
        .add_task(ScheduledTask::new("Odd", "lock_001", "unlock", "sometimes").with_id("odd"))
        .unwrap();

    let before = Utc::now();
    let task = h.engine.trigger_task("odd").unwrap();
    let next = task.next_run.unwrap();
    assert!(next >= before + Duration::hours(1));
    assert!(next <= Utc::now() + Duration::hours(1));
    assert_eq!(h.store.get_device("lock_001").unwrap().flag("locked"), Some(false));
}

#[test]
fn test_trigger_task_not_found() {
    let h = home();
    assert_eq!(
        h.engine.trigger_task("nope").unwrap_err(),
        HubError::task_not_found("nope")
    );
}

#[test]
fn test_security_tasks_need_no_device() {
    let h = home();
    h.devices.seed_default_devices();
    h.engine
        .add_task(ScheduledTask::new("Arm", "", "arm_security", "daily").with_id("arm"))
        .unwrap();

    h.engine.trigger_task("arm").unwrap();
    let sys = h.store.get_security();
    assert_eq!(sys.state, SecurityState::Armed);
    assert!(sys.active_sensors.contains("sensor_001"));

    h.engine
        .add_task(ScheduledTask::new("Disarm", "", "disarm_security", "daily").with_id("disarm"))
        .unwrap();
    h.engine.trigger_task("disarm").unwrap();
    assert_eq!(h.store.get_security().state, SecurityState::Disarmed);
}

#[test]
fn test_set_temperature_task() {
    let h = home();
    h.devices.seed_default_devices();
    h.engine
        .add_task(
            ScheduledTask::new("Warm", "thermostat_001", "set_temperature", "daily")
                .with_id("warm")
                .with_parameters(attrs([("temperature", json!(24.5))])),
        )
        .unwrap();

    h.engine.trigger_task("warm").unwrap();
    let thermostat = h.store.get_device("thermostat_001").unwrap();
    assert_eq!(thermostat.float("target_temp"), Some(24.5));
}

#[test]
fn test_morning_routine() {
    let h = home();
    for id in ["light_a", "light_b"] {
        h.devices
            .add_device(
                Device::new(id, id, DeviceType::Light, "Kitchen")
                    .with_property("power", json!(false))
                    .with_property("brightness", json!(10)),
            )
            .unwrap();
    }
    h.devices
        .add_device(Device::new("thermo", "Thermo", DeviceType::Thermostat, "Hall"))
        .unwrap();
    h.store.update_security(SecuritySystem {
        state: SecurityState::Armed,
        ..SecuritySystem::default()
    });

    let report = h.engine.trigger_automation_scenario("morning_routine").unwrap();
    assert_eq!(report.scenario, AutomationScenario::MorningRoutine);
    assert_eq!(report.devices_updated, 3);
    assert_eq!(report.security, Some(SecurityState::Disarmed));

    for id in ["light_a", "light_b"] {
        let light = h.store.get_device(id).unwrap();
        assert_eq!(light.flag("power"), Some(true));
        assert_eq!(light.int("brightness"), Some(80));
    }
    assert_eq!(h.store.get_device("thermo").unwrap().float("target_temp"), Some(22.0));
    assert_eq!(h.store.get_security().state, SecurityState::Disarmed);
    assert_eq!(events_of(&h.store, kinds::AUTOMATION_SCENARIO).len(), 1);
}

#[test]
fn test_away_sleep_and_breach() {
    let h = home();
    h.devices.seed_default_devices();

    h.engine.trigger_automation_scenario("away_mode").unwrap();
    let sys = h.store.get_security();
    assert_eq!(sys.state, SecurityState::Armed);
    assert!(sys.active_sensors.contains("sensor_001"));
    assert_eq!(h.store.get_device("light_001").unwrap().flag("power"), Some(false));
    assert_eq!(h.store.get_device("thermostat_001").unwrap().float("target_temp"), Some(18.0));

    h.store
        .update_device("lock_001", attrs([("locked", json!(false))]))
        .unwrap();
    let report = h.engine.trigger_automation_scenario("sleep_mode").unwrap();
    assert_eq!(report.security, None);
    assert_eq!(h.store.get_device("lock_001").unwrap().flag("locked"), Some(true));

    h.engine.trigger_automation_scenario("security_breach").unwrap();
    let sys = h.store.get_security();
    assert_eq!(sys.state, SecurityState::Triggered);
    assert_eq!(sys.triggered_by.as_deref(), Some("simulation"));
    let light = h.store.get_device("light_001").unwrap();
    assert_eq!(light.int("brightness"), Some(100));
    assert_eq!(light.flag("power"), Some(true));

    h.engine.trigger_automation_scenario("evening_routine").unwrap();
    assert_eq!(h.store.get_device("light_001").unwrap().int("brightness"), Some(40));
    assert_eq!(h.store.get_security().state, SecurityState::Triggered);
}

#[test]
fn test_unknown_scenario_changes_nothing() {
    let h = home();
    h.devices.seed_default_devices();
    let before = h.store.snapshot();

    let err = h.engine.trigger_automation_scenario("bogus").unwrap_err();
    assert_eq!(err, HubError::UnknownScenario("bogus".to_string()));

    let after = h.store.snapshot();
    assert_eq!(after.devices, before.devices);
    assert_eq!(after.security, before.security);
    assert_eq!(after.system_events, before.system_events);
}

#[test]
fn test_energy_tick_records_and_alerts() {
    let h = home_with(SimulationConfig {
        energy_alert_threshold_kwh: 1.0,
        ..SimulationConfig::default()
    });
    h.devices.seed_default_devices();

    let quiet = h.engine.energy_tick();
    assert_eq!(quiet.records, 5);
    assert!(!quiet.alert);
    assert_eq!(h.store.get_energy_usage(0).len(), 5);

    // A cooling thermostat pushes the total over 1 kWh
    h.store
        .update_device("thermostat_001", attrs([("cooling", json!(true))]))
        .unwrap();
    let loud = h.engine.energy_tick();
    assert!(loud.alert);
    assert!(loud.total_kwh > 3.0);

    let alerts = events_of(&h.store, kinds::ENERGY_ALERT);
    assert_eq!(alerts.len(), 1);
    assert_eq!(alerts[0].severity, Severity::Warning);
    assert!(alerts[0].message.starts_with("High energy usage detected:"));
}

#[test]
fn test_default_threshold_is_not_crossed_by_default_home() {
    let h = home();
    h.devices.seed_default_devices();
    assert!(!h.engine.energy_tick().alert);
}

#[test]
fn test_security_tick_rearms_after_timeout() {
    let h = home();
    h.store.update_security(SecuritySystem {
        state: SecurityState::Triggered,
        last_triggered: Some(Utc::now() - Duration::minutes(6)),
        triggered_by: Some("sensor_001".to_string()),
        ..SecuritySystem::default()
    });

    let tick = h.engine.security_tick();
    assert!(tick.rearmed);
    assert_eq!(h.store.get_security().state, SecurityState::Armed);

    let resets = events_of(&h.store, kinds::SECURITY_RESET);
    assert_eq!(resets.len(), 1);
    assert_eq!(resets[0].data["timeout_minutes"], 5);

    assert!(!h.engine.security_tick().rearmed);
}

#[test]
fn test_security_tick_waits_for_timeout() {
    let h = home();
    h.store.update_security(SecuritySystem {
        state: SecurityState::Triggered,
        last_triggered: Some(Utc::now() - Duration::minutes(2)),
        ..SecuritySystem::default()
    });

    assert!(!h.engine.security_tick().rearmed);
    assert_eq!(h.store.get_security().state, SecurityState::Triggered);
}

#[test]
fn test_security_tick_reports_offline_sensors() {
    let h = home();
    for (id, status) in [
        ("sensor_a", DeviceStatus::Offline),
        ("sensor_b", DeviceStatus::Online),
        ("sensor_c", DeviceStatus::Offline),
    ] {
        h.store
            .add_device(Device::new(id, id, DeviceType::Sensor, "Yard").with_status(status))
            .unwrap();
    }
    h.store
        .add_device(Device::new("light_x", "L", DeviceType::Light, "Yard").with_status(DeviceStatus::Offline))
        .unwrap();

    let tick = h.engine.security_tick();
    assert_eq!(tick.offline_sensors, 2);
    let warnings = events_of(&h.store, kinds::SENSOR_OFFLINE);
    assert_eq!(warnings.len(), 2);
    assert!(warnings.iter().all(|e| e.severity == Severity::Warning));
}

#[test]
fn test_health_tick_offline_majority() {
    let h = home();
    for (i, status) in [DeviceStatus::Offline, DeviceStatus::Offline, DeviceStatus::Online]
        .into_iter()
        .enumerate()
    {
        h.store
            .add_device(Device::new(format!("lock_{}", i), "Lock", DeviceType::Lock, "Door").with_status(status))
            .unwrap();
    }

    assert_eq!(h.engine.health_tick(), 1);
    let warning = &events_of(&h.store, kinds::SYSTEM_HEALTH_WARNING)[0];
    assert_eq!(warning.message, "High number of offline devices: 2/3");

    h.store
        .update_device("lock_0", attrs([("status", json!("online"))]))
        .unwrap();
    assert_eq!(h.engine.health_tick(), 0);
}

#[test]
fn test_health_tick_exactly_half_offline_is_fine() {
    let h = home();
    for (i, status) in [DeviceStatus::Offline, DeviceStatus::Online].into_iter().enumerate() {
        h.store
            .add_device(Device::new(format!("lock_{}", i), "Lock", DeviceType::Lock, "Door").with_status(status))
            .unwrap();
    }
    assert_eq!(h.engine.health_tick(), 0);
    assert_eq!(home().engine.health_tick(), 0);
}

#[test]
fn test_health_tick_weather_alert() {
    let h = home();
    h.store.update_weather(WeatherSnapshot {
        condition: WeatherCondition::Stormy,
        ..WeatherSnapshot::default()
    });

    assert_eq!(h.engine.health_tick(), 1);
    let alert = &events_of(&h.store, kinds::WEATHER_ALERT)[0];
    assert_eq!(alert.message, "Storm warning - Severe weather conditions");
    assert_eq!(alert.data["alert"], "storm");
    assert_eq!(alert.severity, Severity::Warning);
}

#[test]
fn test_device_failure_takes_first_device_offline() {
    let h = home();
    h.devices.seed_default_devices();

    let report = h.engine.trigger_fault_scenario("device_failure").unwrap();
    assert_eq!(report.scenario, FaultScenario::DeviceFailure);
    assert_eq!(report.failed_device.as_deref(), Some("camera_001"));
    assert_eq!(
        h.store.get_device("camera_001").unwrap().status,
        DeviceStatus::Offline
    );
    assert_eq!(h.store.devices_by_status(DeviceStatus::Offline).len(), 1);

    // The failed device no longer draws power
    assert_eq!(h.devices.calculate_energy_usage().len(), 4);
}

#[test]
fn test_device_failure_on_empty_home() {
    let h = home();
    let report = h.engine.trigger_fault_scenario("device_failure").unwrap();
    assert_eq!(report.failed_device, None);
    assert!(h.store.get_system_events(0).is_empty());
}

#[test]
fn test_power_surge_appends_scaled_samples() {
    let h = home();
    h.devices.seed_default_devices();
    let normal = h.devices.calculate_energy_usage();

    let report = h.engine.trigger_fault_scenario("power_surge").unwrap();
    assert_eq!(report.surge_records, 5);

    let ring = h.store.get_energy_usage(0);
    assert_eq!(ring.len(), 5);
    for (surged, base) in ring.iter().zip(&normal) {
        assert_eq!(surged.device_id, base.device_id);
        assert!((surged.usage_kwh - base.usage_kwh * SURGE_FACTOR).abs() < 1e-9);
        assert!((surged.cost_usd - base.cost_usd * SURGE_FACTOR).abs() < 1e-9);
    }
}

#[test]
fn test_unknown_fault_scenario() {
    let h = home();
    assert_eq!(
        h.engine.trigger_fault_scenario("meteor").unwrap_err(),
        HubError::UnknownScenario("meteor".to_string())
    );
}

#[test]
fn test_repeated_skips_are_tracked_until_the_task_runs() {
    let h = home();
    h.store
        .add_task(ScheduledTask::new("Late", "light_late", "turn_on", "hourly").with_id("late"))
        .unwrap();

    assert_eq!(h.engine.process_tasks(), 0);
    assert_eq!(h.engine.process_tasks(), 0);
    assert!(h.engine.skipped.lock().contains("late"));
    assert!(!h.engine.note_skip("late"));

    h.devices
        .add_device(Device::new("light_late", "Late", DeviceType::Light, "Den"))
        .unwrap();
    assert_eq!(h.engine.process_tasks(), 1);
    assert!(h.engine.skipped.lock().is_empty());
    assert!(h.engine.note_skip("late"));
}

use super::*;
use crate::config::LimitsConfig;
use crate::model::{attrs, kinds, SecurityState, Severity, WeatherCondition};
use chrono::Duration;
use serde_json::json;
use std::sync::Arc;
use std::thread;

fn light(id: &str) -> Device {
    Device::new(id, format!("Light {}", id), DeviceType::Light, "Living Room")
        .with_property("brightness", json!(50))
        .with_property("power", json!(true))
}

fn small_store(energy: usize, events: usize) -> WorldStore {
    WorldStore::with_limits(&LimitsConfig {
        energy_log_capacity: energy,
        event_log_capacity: events,
        ..LimitsConfig::default()
    })
}

fn energy(i: usize) -> EnergyUsageRecord {
    EnergyUsageRecord {
        device_id: format!("dev_{}", i),
        device_name: "Device".to_string(),
        usage_kwh: i as f64,
        cost_usd: 0.0,
        timestamp: Utc::now(),
    }
}

#[test]
fn test_add_and_get_device() {
    let store = WorldStore::new();
    let added = store.add_device(light("light_1")).unwrap();

    let fetched = store.get_device("light_1").unwrap();
    assert_eq!(fetched, added);
    assert_eq!(fetched.created_at, fetched.last_updated);

    let events = store.get_system_events(0);
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].event_type, kinds::DEVICE_ADDED);
    assert_eq!(events[0].data["device_id"], "light_1");
    assert_eq!(events[0].severity, Severity::Info);
}

#[test]
fn test_duplicate_device_conflicts_and_leaves_store_unchanged() {
    let store = WorldStore::new();
    store.add_device(light("light_1")).unwrap();

    let dup = Device::new("light_1", "Other", DeviceType::Lock, "Garage");
    let err = store.add_device(dup).unwrap_err();
    assert_eq!(err.kind(), "Conflict");

    let kept = store.get_device("light_1").unwrap();
    assert_eq!(kept.device_type, DeviceType::Light);
    assert_eq!(store.list_devices().len(), 1);
    assert_eq!(store.get_system_events(0).len(), 1);
}

#[test]
fn test_update_device_merges_properties_and_top_level_fields() {
    let store = WorldStore::new();
    store.add_device(light("light_1")).unwrap();

    let updated = store
        .update_device(
            "light_1",
            attrs([
                ("name", json!("Reading Lamp")),
                ("status", json!("offline")),
                ("location", json!("Study")),
                ("brightness", json!(10)),
                ("color", json!("blue")),
            ]),
        )
        .unwrap();

    assert_eq!(updated.name, "Reading Lamp");
    assert_eq!(updated.status, DeviceStatus::Offline);
    assert_eq!(updated.location, "Study");
    assert_eq!(updated.int("brightness"), Some(10));
    assert_eq!(updated.text("color"), Some("blue"));
    assert!(!updated.properties.contains_key("name"));
    assert!(updated.last_updated >= updated.created_at);

    let last = store.get_system_events(1).remove(0);
    assert_eq!(last.event_type, kinds::DEVICE_UPDATED);
    assert_eq!(last.data["updates"]["brightness"], 10);
}

#[test]
fn test_update_device_ignores_mistyped_top_level_fields() {
    let store = WorldStore::new();
    store.add_device(light("light_1")).unwrap();

    let updated = store
        .update_device(
            "light_1",
            attrs([("name", json!(42)), ("status", json!("melted"))]),
        )
        .unwrap();

    assert_eq!(updated.name, "Light light_1");
    assert_eq!(updated.status, DeviceStatus::Online);
}

#[test]
fn test_missing_device_and_task_are_not_found() {
    let store = WorldStore::new();

    assert_eq!(store.get_device("nope").unwrap_err().kind(), "NotFound");
    assert_eq!(
        store.update_device("nope", Attributes::new()).unwrap_err(),
        HubError::device_not_found("nope")
    );
    assert_eq!(
        store.delete_device("nope").unwrap_err(),
        HubError::device_not_found("nope")
    );
    assert_eq!(
        store.update_task("nope", TaskUpdate::default()).unwrap_err(),
        HubError::task_not_found("nope")
    );
    assert!(store.get_system_events(0).is_empty());
}

#[test]
fn test_delete_device() {
    let store = WorldStore::new();
    store.add_device(light("light_1")).unwrap();

    let removed = store.delete_device("light_1").unwrap();
    assert_eq!(removed.id, "light_1");
    assert!(store.list_devices().is_empty());
    assert_eq!(store.get_system_events(1)[0].event_type, kinds::DEVICE_DELETED);
}

#[test]
fn test_update_device_with_skips_when_closure_declines() {
    let store = WorldStore::new();
    store.add_device(light("light_1")).unwrap();

    let untouched = store.update_device_with("light_1", |_| None).unwrap();
    assert!(untouched.is_none());
    assert_eq!(store.get_system_events(0).len(), 1);

    let dimmed = store
        .update_device_with("light_1", |d| {
            let current = d.int("brightness").unwrap_or(0);
            Some(attrs([("brightness", json!(current - 20))]))
        })
        .unwrap()
        .unwrap();
    assert_eq!(dimmed.int("brightness"), Some(30));

    assert!(store.update_device_with("ghost", |_| None).is_err());
}

#[test]
fn test_device_filters() {
    let store = WorldStore::new();
    store.add_device(light("light_1")).unwrap();
    store
        .add_device(Device::new("lock_1", "Front Door", DeviceType::Lock, "Entrance"))
        .unwrap();
    store
        .add_device(light("light_2").with_status(DeviceStatus::Offline))
        .unwrap();

    assert_eq!(store.devices_by_type(DeviceType::Light).len(), 2);
    assert_eq!(store.devices_by_location("Entrance")[0].id, "lock_1");
    assert_eq!(store.devices_by_status(DeviceStatus::Offline)[0].id, "light_2");
}

#[test]
fn test_weather_and_security_replace_whole_object() {
    let store = WorldStore::new();
    assert_eq!(store.get_weather().temperature, 20.0);
    assert_eq!(store.get_security().state, SecurityState::Disarmed);

    let weather = WeatherSnapshot {
        temperature: 31.0,
        condition: WeatherCondition::Sunny,
        ..WeatherSnapshot::default()
    };
    store.update_weather(weather);
    assert_eq!(store.get_weather().condition, WeatherCondition::Sunny);

    let security = SecuritySystem {
        state: SecurityState::Armed,
        last_armed: Some(Utc::now()),
        ..SecuritySystem::default()
    };
    store.update_security(security);
    assert!(store.get_security().is_armed());

    let types: Vec<_> = store
        .get_system_events(0)
        .into_iter()
        .map(|e| e.event_type)
        .collect();
    assert_eq!(types, vec![kinds::WEATHER_UPDATED, kinds::SECURITY_UPDATED]);
}

#[test]
fn test_transition_security_is_conditional() {
    let store = WorldStore::new();

    let unchanged = store.transition_security(|sys, _| {
        sys.is_armed().then(|| SecuritySystem::default())
    });
    assert!(unchanged.is_none());
    assert!(store.get_system_events(0).is_empty());

    store.add_device(light("light_1")).unwrap();
    let next = store
        .transition_security(|_, devices| {
            Some(SecuritySystem {
                state: SecurityState::Armed,
                active_sensors: devices.keys().cloned().collect(),
                ..SecuritySystem::default()
            })
        })
        .unwrap();
    assert!(next.active_sensors.contains("light_1"));
    assert_eq!(store.get_security(), next);
}

#[test]
fn test_tasks_add_get_list() {
    let store = WorldStore::new();
    let task = ScheduledTask::new("Morning lights", "light_1", "turn_on", "daily").with_id("task_1");
    store.add_task(task.clone()).unwrap();

    assert_eq!(store.get_task("task_1").unwrap().name, "Morning lights");
    assert_eq!(store.list_tasks().len(), 1);
    assert_eq!(store.add_task(task).unwrap_err().kind(), "Conflict");

    let events = store.get_system_events(0);
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].event_type, kinds::TASK_ADDED);
    assert_eq!(events[0].data["schedule"], "daily");
}

#[test]
fn test_update_task_does_not_append_system_event() {
    let store = WorldStore::new();
    store
        .add_task(ScheduledTask::new("t", "light_1", "turn_on", "hourly").with_id("task_1"))
        .unwrap();
    let before = store.get_system_events(0).len();

    let now = Utc::now();
    let updated = store
        .update_task(
            "task_1",
            TaskUpdate {
                enabled: Some(false),
                next_run: Some(now + Duration::hours(1)),
                last_run: Some(now),
            },
        )
        .unwrap();

    assert!(!updated.enabled);
    assert_eq!(updated.last_run, Some(now));
    // Device updates are logged, task updates are not
    assert_eq!(store.get_system_events(0).len(), before);
}

#[test]
fn test_energy_ring_keeps_most_recent_in_order() {
    let store = small_store(5, 5);
    for i in 0..12 {
        store.add_energy_usage(energy(i));
    }

    let all = store.get_energy_usage(0);
    assert_eq!(all.len(), 5);
    let usages: Vec<f64> = all.iter().map(|r| r.usage_kwh).collect();
    assert_eq!(usages, vec![7.0, 8.0, 9.0, 10.0, 11.0]);

    let last_two: Vec<f64> = store.get_energy_usage(2).iter().map(|r| r.usage_kwh).collect();
    assert_eq!(last_two, vec![10.0, 11.0]);
    assert_eq!(store.get_energy_usage(50).len(), 5);
}

#[test]
fn test_default_rings_respect_capacity() {
    let store = WorldStore::new();
    for i in 0..1100 {
        store.add_energy_usage(energy(i));
    }
    for i in 0..520 {
        store.add_system_event(SystemEvent::new("test", "test", format!("event {}", i)));
    }

    let energy = store.get_energy_usage(0);
    assert_eq!(energy.len(), 1000);
    assert_eq!(energy[0].usage_kwh, 100.0);

    let events = store.get_system_events(0);
    assert_eq!(events.len(), 500);
    assert_eq!(events[0].message, "event 20");
    assert_eq!(events[499].message, "event 519");
}

#[test]
fn test_snapshot_is_consistent() {
    let store = WorldStore::new();
    store.add_device(light("light_1")).unwrap();
    store.add_energy_usage(energy(1));

    let snap = store.snapshot();
    assert_eq!(snap.devices.len(), 1);
    assert_eq!(snap.energy_usage.len(), 1);
    assert_eq!(snap.system_events.len(), 1);
    assert!(snap.uptime_seconds >= 0);
    assert!(snap.timestamp >= snap.started_at);

    let json = serde_json::to_value(&snap).unwrap();
    assert_eq!(json["devices"][0]["type"], "light");
    assert_eq!(json["security"]["state"], "disarmed");
}

#[test]
fn test_reset_clears_everything_and_logs_once() {
    let store = WorldStore::new();
    store.add_device(light("light_1")).unwrap();
    store
        .add_task(ScheduledTask::new("t", "light_1", "turn_on", "hourly").with_id("task_1"))
        .unwrap();
    store.add_energy_usage(energy(1));
    store.update_security(SecuritySystem {
        state: SecurityState::Triggered,
        ..SecuritySystem::default()
    });
    let started = store.snapshot().started_at;

    store.reset();

    let snap = store.snapshot();
    assert!(snap.devices.is_empty());
    assert!(snap.tasks.is_empty());
    assert!(snap.energy_usage.is_empty());
    assert_eq!(snap.security.state, SecurityState::Disarmed);
    assert_eq!(snap.weather.temperature, 20.0);
    assert!(snap.started_at >= started);
    assert_eq!(snap.system_events.len(), 1);
    assert_eq!(snap.system_events[0].event_type, kinds::SYSTEM_RESET);
}

#[test]
fn test_apply_batch_events_each_mutation() {
    let store = WorldStore::new();
    store.add_device(light("light_1")).unwrap();
    store.add_device(light("light_2")).unwrap();

    let touched = store.apply_batch(|batch| {
        let ids: Vec<String> = batch.devices().map(|d| d.id.clone()).collect();
        for id in &ids {
            batch
                .update_device(id, attrs([("power", json!(false))]))
                .unwrap();
        }
        let mut security = batch.security().clone();
        security.state = SecurityState::Armed;
        batch.update_security(security);
        ids.len()
    });

    assert_eq!(touched, 2);
    assert!(store.list_devices().iter().all(|d| d.flag("power") == Some(false)));
    // 2 adds + 2 updates + 1 security change
    assert_eq!(store.get_system_events(0).len(), 5);
}

#[test]
fn test_subscribers_receive_one_change_per_mutation() {
    let store = WorldStore::new();
    let mut sub = store.subscribe();

    store.add_device(light("light_1")).unwrap();
    store
        .update_device("light_1", attrs([("brightness", json!(70))]))
        .unwrap();
    store.add_energy_usage(energy(1));
    store
        .add_task(ScheduledTask::new("t", "light_1", "turn_on", "hourly").with_id("task_1"))
        .unwrap();
    store
        .update_task("task_1", TaskUpdate { enabled: Some(false), ..TaskUpdate::default() })
        .unwrap();
    store.delete_device("light_1").unwrap();

    let mut received = Vec::new();
    while let Some(change) = sub.try_recv() {
        received.push(change.event_type);
    }
    assert_eq!(
        received,
        vec![
            kinds::DEVICE_ADDED,
            kinds::DEVICE_UPDATED,
            kinds::ENERGY_USAGE,
            kinds::TASK_ADDED,
            kinds::TASK_UPDATED,
            kinds::DEVICE_DELETED,
        ]
    );
}

#[test]
fn test_concurrent_add_device() {
    let store = Arc::new(WorldStore::new());
    let mut handles = vec![];

    // Spawn 10 threads, each adding 50 distinct devices
    for t in 0..10 {
        let store = Arc::clone(&store);
        let handle = thread::spawn(move || {
            for i in 0..50 {
                store.add_device(light(&format!("light_{}_{}", t, i))).unwrap();
            }
        });
        handles.push(handle);
    }

    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(store.list_devices().len(), 500);
    assert_eq!(store.get_system_events(0).len(), 500);
}

#[test]
fn test_concurrent_duplicate_add_has_one_winner() {
    let store = Arc::new(WorldStore::new());
    let mut handles = vec![];

    for _ in 0..8 {
        let store = Arc::clone(&store);
        handles.push(thread::spawn(move || store.add_device(light("light_1")).is_ok()));
    }

    let wins = handles
        .into_iter()
        .map(|h| h.join().unwrap())
        .filter(|ok| *ok)
        .count();
    assert_eq!(wins, 1);
    assert_eq!(store.list_devices().len(), 1);
}

#[test]
fn test_concurrent_readers_and_writers() {
    let store = Arc::new(small_store(100, 100));
    let mut handles = vec![];

    for t in 0..4 {
        let store = Arc::clone(&store);
        handles.push(thread::spawn(move || {
            for i in 0..200 {
                store.add_energy_usage(energy(t * 1000 + i));
            }
        }));
    }
    for _ in 0..4 {
        let store = Arc::clone(&store);
        handles.push(thread::spawn(move || {
            for _ in 0..200 {
                assert!(store.snapshot().energy_usage.len() <= 100);
            }
        }));
    }

    for handle in handles {
        handle.join().unwrap();
    }
    assert_eq!(store.get_energy_usage(0).len(), 100);
}

use super::SOURCE;
use crate::model::{attrs, kinds, Attributes, DeviceStatus, DeviceType, SecurityState, SystemEvent};
use crate::security;
use crate::store::Batch;
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::json;
use strum::{AsRefStr, Display, EnumIter, EnumString};
use tracing::debug;

/// Named whole-house batch operations
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Display, EnumString, AsRefStr, EnumIter)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum AutomationScenario {
    MorningRoutine,
    EveningRoutine,
    AwayMode,
    SleepMode,
    SecurityBreach,
}

/// Fault injections for exercising callers' failure handling
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Display, EnumString, AsRefStr, EnumIter)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum FaultScenario {
    /// First device by id goes Offline
    DeviceFailure,
    /// One usage sample per online device at five times the normal draw
    PowerSurge,
}

/// Multiplier applied to usage and cost by a power surge
pub const SURGE_FACTOR: f64 = 5.0;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FaultReport {
    pub scenario: FaultScenario,
    /// Device taken offline by a device failure
    pub failed_device: Option<String>,
    /// Energy samples appended by a power surge
    pub surge_records: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScenarioReport {
    pub scenario: AutomationScenario,
    pub devices_updated: usize,
    /// Security state after the scenario, when it changed security
    pub security: Option<SecurityState>,
}

enum SecurityChange {
    Arm,
    Disarm,
    Trigger,
}

impl AutomationScenario {
    fn device_changes(self) -> Vec<(DeviceType, Attributes)> {
        match self {
            AutomationScenario::MorningRoutine => vec![
                (DeviceType::Light, attrs([("power", json!(true)), ("brightness", json!(80))])),
                (DeviceType::Thermostat, attrs([("target_temp", json!(22.0))])),
            ],
            AutomationScenario::EveningRoutine => vec![
                (DeviceType::Light, attrs([("power", json!(true)), ("brightness", json!(40))])),
                (DeviceType::Thermostat, attrs([("target_temp", json!(20.0))])),
            ],
            AutomationScenario::AwayMode => vec![
                (DeviceType::Light, attrs([("power", json!(false))])),
                (DeviceType::Thermostat, attrs([("target_temp", json!(18.0))])),
            ],
            AutomationScenario::SleepMode => vec![
                (DeviceType::Light, attrs([("power", json!(false))])),
                (DeviceType::Lock, attrs([("locked", json!(true))])),
            ],
            AutomationScenario::SecurityBreach => vec![(
                DeviceType::Light,
                attrs([("power", json!(true)), ("brightness", json!(100))]),
            )],
        }
    }

    fn security_change(self) -> Option<SecurityChange> {
        match self {
            AutomationScenario::MorningRoutine => Some(SecurityChange::Disarm),
            AutomationScenario::AwayMode => Some(SecurityChange::Arm),
            AutomationScenario::SecurityBreach => Some(SecurityChange::Trigger),
            AutomationScenario::EveningRoutine | AutomationScenario::SleepMode => None,
        }
    }

    /// Apply every change inside the caller's exclusive section
    pub(crate) fn apply(self, batch: &mut Batch<'_>, now: DateTime<Utc>) -> ScenarioReport {
        let security = self.security_change().map(|change| {
            let current = batch.security();
            let next = match change {
                SecurityChange::Arm => security::armed(current, batch.devices(), now),
                SecurityChange::Disarm => security::disarmed(current),
                SecurityChange::Trigger => security::triggered(current, "simulation", now),
            };
            let state = next.state;
            batch.update_security(next);
            state
        });

        let mut devices_updated = 0;
        for (device_type, updates) in self.device_changes() {
            let ids: Vec<String> = batch
                .devices()
                .filter(|d| d.device_type == device_type)
                .map(|d| d.id.clone())
                .collect();
            for id in ids {
                match batch.update_device(&id, updates.clone()) {
                    Ok(_) => devices_updated += 1,
                    Err(e) => debug!(device_id = %id, error = %e, "Scenario skipped device"),
                }
            }
        }

        batch.add_system_event(
            SystemEvent::new(
                kinds::AUTOMATION_SCENARIO,
                SOURCE,
                format!("Automation scenario {} executed", self),
            )
            .with_data(attrs([
                ("scenario", json!(self)),
                ("devices_updated", json!(devices_updated)),
            ])),
        );

        ScenarioReport {
            scenario: self,
            devices_updated,
            security,
        }
    }
}

/// Mark the first device (by id) Offline; `None` for an empty home
pub(crate) fn fail_first_device(batch: &mut Batch<'_>) -> Option<String> {
    let id = batch.devices().next()?.id.clone();
    match batch.update_device(&id, attrs([("status", json!(DeviceStatus::Offline))])) {
        Ok(_) => Some(id),
        Err(e) => {
            debug!(device_id = %id, error = %e, "Device failure not applied");
            None
        }
    }
}

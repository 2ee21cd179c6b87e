use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};
use uuid::Uuid;

use super::device::Attributes;

/// System event type names
pub mod kinds {
    pub const DEVICE_ADDED: &str = "device_added";
    pub const DEVICE_UPDATED: &str = "device_updated";
    pub const DEVICE_DELETED: &str = "device_deleted";
    pub const WEATHER_UPDATED: &str = "weather_updated";
    pub const SECURITY_UPDATED: &str = "security_updated";
    pub const TASK_ADDED: &str = "task_added";
    pub const TASK_UPDATED: &str = "task_updated";
    pub const TASK_EXECUTED: &str = "task_executed";
    pub const ENERGY_USAGE: &str = "energy_usage";
    pub const ENERGY_ALERT: &str = "energy_alert";
    pub const SECURITY_RESET: &str = "security_reset";
    pub const SENSOR_OFFLINE: &str = "sensor_offline";
    pub const SYSTEM_HEALTH_WARNING: &str = "system_health_warning";
    pub const WEATHER_ALERT: &str = "weather_alert";
    pub const AUTOMATION_SCENARIO: &str = "automation_scenario";
    pub const SYSTEM_RESET: &str = "system_reset";
}

#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Severity {
    #[default]
    Info,
    Warning,
    Error,
}

/// Entry in the bounded audit trail
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SystemEvent {
    /// UUIDv7 identifier (time-ordered)
    pub id: String,
    #[serde(rename = "type")]
    pub event_type: String,
    pub source: String,
    pub message: String,
    #[serde(default)]
    pub data: Attributes,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub severity: Severity,
}

impl SystemEvent {
    pub fn new(event_type: &str, source: &str, message: impl Into<String>) -> Self {
        Self {
            id: Uuid::now_v7().to_string(),
            event_type: event_type.to_string(),
            source: source.to_string(),
            message: message.into(),
            data: Attributes::new(),
            timestamp: Utc::now(),
            severity: Severity::Info,
        }
    }

    pub fn with_data(mut self, data: Attributes) -> Self {
        self.data = data;
        self
    }

    pub fn warning(mut self) -> Self {
        self.severity = Severity::Warning;
        self
    }
}

/// One energy sample for one device
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EnergyUsageRecord {
    pub device_id: String,
    pub device_name: String,
    pub usage_kwh: f64,
    pub cost_usd: f64,
    pub timestamp: DateTime<Utc>,
}

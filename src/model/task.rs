use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};

use super::device::Attributes;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, AsRefStr)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum TaskAction {
    TurnOn,
    TurnOff,
    SetTemperature,
    SetBrightness,
    Lock,
    Unlock,
    ArmSecurity,
    DisarmSecurity,
}

impl TaskAction {
    /// Security actions act on the whole house, not the task's device
    pub fn targets_device(self) -> bool {
        !matches!(self, TaskAction::ArmSecurity | TaskAction::DisarmSecurity)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, AsRefStr)]
pub enum Schedule {
    #[serde(rename = "every_15_minutes")]
    #[strum(serialize = "every_15_minutes")]
    Every15Minutes,
    #[serde(rename = "every_30_minutes")]
    #[strum(serialize = "every_30_minutes")]
    Every30Minutes,
    #[serde(rename = "hourly")]
    #[strum(serialize = "hourly")]
    Hourly,
    #[serde(rename = "daily")]
    #[strum(serialize = "daily")]
    Daily,
    #[serde(rename = "weekly")]
    #[strum(serialize = "weekly")]
    Weekly,
}

impl Schedule {
    pub fn period(self) -> Duration {
        match self {
            Schedule::Every15Minutes => Duration::minutes(15),
            Schedule::Every30Minutes => Duration::minutes(30),
            Schedule::Hourly => Duration::hours(1),
            Schedule::Daily => Duration::days(1),
            Schedule::Weekly => Duration::days(7),
        }
    }

    /// Next run for a raw schedule keyword; unknown keywords run hourly
    pub fn next_run(keyword: &str, now: DateTime<Utc>) -> DateTime<Utc> {
        let period = keyword
            .parse::<Schedule>()
            .map(Schedule::period)
            .unwrap_or_else(|_| Duration::hours(1));
        now + period
    }
}

/// A recurring device action
///
/// `action` and `schedule` hold raw keywords: the scheduling engine validates
/// them on add, while the task runner tolerates unknown values on tasks that
/// reached the store by other paths.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ScheduledTask {
    #[serde(default)]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub device_id: String,
    pub action: String,
    #[serde(default)]
    pub parameters: Attributes,
    pub schedule: String,
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub next_run: Option<DateTime<Utc>>,
    #[serde(default)]
    pub last_run: Option<DateTime<Utc>>,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
}

impl ScheduledTask {
    pub fn new(
        name: impl Into<String>,
        device_id: impl Into<String>,
        action: impl Into<String>,
        schedule: impl Into<String>,
    ) -> Self {
        Self {
            id: String::new(),
            name: name.into(),
            device_id: device_id.into(),
            action: action.into(),
            parameters: Attributes::new(),
            schedule: schedule.into(),
            enabled: true,
            next_run: None,
            last_run: None,
            created_at: Utc::now(),
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    pub fn with_parameters(mut self, parameters: Attributes) -> Self {
        self.parameters = parameters;
        self
    }

    /// Enabled and never run, or its next run is already past
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.enabled && self.next_run.map_or(true, |next| next < now)
    }
}

/// Fields the task update path recognizes
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TaskUpdate {
    pub enabled: Option<bool>,
    pub next_run: Option<DateTime<Utc>>,
    pub last_run: Option<DateTime<Utc>>,
}

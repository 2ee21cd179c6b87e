use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use strum::{AsRefStr, Display, EnumString};

#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum SecurityState {
    #[default]
    Disarmed,
    Armed,
    Triggered,
}

/// Security subsystem; replaced wholesale on every update
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SecuritySystem {
    pub state: SecurityState,
    pub last_armed: Option<DateTime<Utc>>,
    pub last_triggered: Option<DateTime<Utc>>,
    /// Sensor ids snapshotted at arm time
    pub active_sensors: BTreeSet<String>,
    pub triggered_by: Option<String>,
}

impl SecuritySystem {
    pub fn is_armed(&self) -> bool {
        self.state == SecurityState::Armed
    }
}

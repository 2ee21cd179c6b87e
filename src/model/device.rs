use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use strum::{AsRefStr, Display, EnumIter, EnumString};

/// Open per-device attribute map (valid keys depend on device type)
pub type Attributes = serde_json::Map<String, Value>;

/// Build an attribute map from literal pairs
pub fn attrs<const N: usize>(pairs: [(&str, Value); N]) -> Attributes {
    pairs
        .into_iter()
        .map(|(key, value)| (key.to_string(), value))
        .collect()
}

#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, AsRefStr, EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum DeviceType {
    Light,
    Thermostat,
    Camera,
    Sensor,
    Lock,
    Alarm,
}

#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum DeviceStatus {
    #[default]
    Online,
    Offline,
    Error,
}

/// A simulated device owned by the world store
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Device {
    /// Unique device identifier (e.g., "light_001")
    #[serde(default)]
    pub id: String,

    pub name: String,

    #[serde(rename = "type")]
    pub device_type: DeviceType,

    #[serde(default)]
    pub status: DeviceStatus,

    #[serde(default)]
    pub location: String,

    /// Type-specific properties (brightness, target_temp, locked, ...)
    #[serde(default)]
    pub properties: Attributes,

    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,

    #[serde(default = "Utc::now")]
    pub last_updated: DateTime<Utc>,
}

impl Device {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        device_type: DeviceType,
        location: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            name: name.into(),
            device_type,
            status: DeviceStatus::Online,
            location: location.into(),
            properties: Attributes::new(),
            created_at: now,
            last_updated: now,
        }
    }

    pub fn with_property(mut self, key: &str, value: Value) -> Self {
        self.properties.insert(key.to_string(), value);
        self
    }

    pub fn with_status(mut self, status: DeviceStatus) -> Self {
        self.status = status;
        self
    }

    pub fn is_online(&self) -> bool {
        self.status == DeviceStatus::Online
    }

    /// Numeric property as f64; `None` when absent or not a number
    pub fn float(&self, key: &str) -> Option<f64> {
        self.properties.get(key)?.as_f64()
    }

    /// Integer property; whole-valued floats are accepted
    pub fn int(&self, key: &str) -> Option<i64> {
        value_as_int(self.properties.get(key)?)
    }

    pub fn flag(&self, key: &str) -> Option<bool> {
        self.properties.get(key)?.as_bool()
    }

    pub fn text(&self, key: &str) -> Option<&str> {
        self.properties.get(key)?.as_str()
    }
}

pub(crate) fn value_as_int(value: &Value) -> Option<i64> {
    let Value::Number(n) = value else {
        return None;
    };
    n.as_i64().or_else(|| {
        n.as_f64()
            .filter(|f| f.is_finite() && f.fract() == 0.0)
            .map(|f| f as i64)
    })
}

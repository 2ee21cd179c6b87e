use crate::error::{HubError, HubResult};
use crate::model::{value_as_int, Attributes, DeviceStatus, DeviceType};
use serde_json::{json, Value};

/// Expected shape of one device property
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum PropKind {
    Bool,
    Str,
    Int { min: i64, max: i64 },
    Float { min: f64, max: f64 },
}

impl PropKind {
    fn check(self, key: &str, value: &Value) -> HubResult<()> {
        let ok = match self {
            PropKind::Bool => value.is_boolean(),
            PropKind::Str => value.is_string(),
            PropKind::Int { min, max } => {
                let n = value_as_int(value).ok_or_else(|| {
                    HubError::validation(format!("{} must be an integer, got {}", key, value))
                })?;
                if !(min..=max).contains(&n) {
                    return Err(HubError::validation(format!(
                        "{} must be between {} and {}, got {}",
                        key, min, max, n
                    )));
                }
                true
            }
            PropKind::Float { min, max } => {
                let n = value.as_f64().ok_or_else(|| {
                    HubError::validation(format!("{} must be a number, got {}", key, value))
                })?;
                if !(min..=max).contains(&n) {
                    return Err(HubError::validation(format!(
                        "{} must be between {} and {}, got {}",
                        key, min, max, n
                    )));
                }
                true
            }
        };

        if ok {
            Ok(())
        } else {
            Err(HubError::validation(format!(
                "{} must be a {}, got {}",
                key,
                if self == PropKind::Bool { "boolean" } else { "string" },
                value
            )))
        }
    }
}

const PERCENT: PropKind = PropKind::Int { min: 0, max: 100 };

/// Known properties per device type; keys outside the schema are accepted as-is
pub fn schema(device_type: DeviceType) -> &'static [(&'static str, PropKind)] {
    match device_type {
        DeviceType::Light => &[
            ("brightness", PERCENT),
            ("power", PropKind::Bool),
            ("color", PropKind::Str),
        ],
        DeviceType::Thermostat => &[
            ("temperature", PropKind::Float { min: -50.0, max: 60.0 }),
            ("target_temp", PropKind::Float { min: 10.0, max: 35.0 }),
            ("heating", PropKind::Bool),
            ("cooling", PropKind::Bool),
            ("mode", PropKind::Str),
        ],
        DeviceType::Camera => &[
            ("recording", PropKind::Bool),
            ("motion_detect", PropKind::Bool),
            ("night_vision", PropKind::Bool),
            ("resolution", PropKind::Str),
        ],
        DeviceType::Sensor => &[
            ("motion_detected", PropKind::Bool),
            ("sensitivity", PropKind::Int { min: 1, max: 10 }),
            ("battery_level", PERCENT),
        ],
        DeviceType::Lock => &[
            ("locked", PropKind::Bool),
            ("auto_lock", PropKind::Bool),
            ("battery_level", PERCENT),
        ],
        DeviceType::Alarm => &[],
    }
}

/// Defaults seeded for missing keys when a device is added
pub fn defaults(device_type: DeviceType) -> Vec<(&'static str, Value)> {
    match device_type {
        DeviceType::Light => vec![("brightness", json!(50)), ("power", json!(true))],
        DeviceType::Thermostat => vec![
            ("temperature", json!(20.0)),
            ("target_temp", json!(21.0)),
            ("mode", json!("auto")),
        ],
        DeviceType::Camera => vec![("recording", json!(true)), ("motion_detect", json!(true))],
        DeviceType::Sensor => vec![
            ("motion_detected", json!(false)),
            ("sensitivity", json!(5)),
            ("battery_level", json!(100)),
        ],
        DeviceType::Lock => vec![("locked", json!(true)), ("battery_level", json!(100))],
        DeviceType::Alarm => vec![],
    }
}

/// Fill in defaults for absent or null keys
pub fn seed_defaults(device_type: DeviceType, properties: &mut Attributes) {
    for (key, value) in defaults(device_type) {
        let slot = properties.entry(key.to_string()).or_insert(Value::Null);
        if slot.is_null() {
            *slot = value;
        }
    }
}

/// Validate a property map against the device type's schema
pub fn validate_properties(device_type: DeviceType, properties: &Attributes) -> HubResult<()> {
    for (key, kind) in schema(device_type) {
        if let Some(value) = properties.get(*key) {
            kind.check(key, value)?;
        }
    }
    Ok(())
}

/// Validate an update map: top-level fields plus schema properties
pub fn validate_updates(device_type: DeviceType, updates: &Attributes) -> HubResult<()> {
    for (key, value) in updates {
        match key.as_str() {
            "name" | "location" => PropKind::Str.check(key, value)?,
            "status" => {
                let valid = value
                    .as_str()
                    .map_or(false, |s| s.parse::<DeviceStatus>().is_ok());
                if !valid {
                    return Err(HubError::validation(format!(
                        "status must be one of online, offline, error; got {}",
                        value
                    )));
                }
            }
            _ => {}
        }
    }
    validate_properties(device_type, updates)
}

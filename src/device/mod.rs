// Device simulation and the validated device CRUD facade

pub mod schema;

use crate::config::SimulationConfig;
use crate::error::HubResult;
use crate::model::{
    attrs, Attributes, Device, DeviceStatus, DeviceType, EnergyUsageRecord,
};
use crate::rng::sim_rng;
use crate::security;
use crate::store::WorldStore;
use chrono::Utc;
use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::Rng;
use serde_json::json;
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

const RNG_STREAM: u64 = 2;

/// Chance per tick that a device gets a random perturbation
const PERTURB_CHANCE: f64 = 0.1;
/// Chance per tick that a sensor produces a motion reading
const SENSOR_READING_CHANCE: f64 = 0.05;

/// What one device tick changed
#[derive(Debug, Default, Clone, PartialEq)]
pub struct DeviceTickReport {
    pub perturbed: usize,
    pub thermostats: usize,
    pub motion_readings: usize,
    /// Sensor that tripped the alarm this tick
    pub triggered_by: Option<String>,
}

/// Instantaneous usage estimate (kWh) from a device's current attributes
pub fn usage_kwh(device: &Device) -> f64 {
    match device.device_type {
        DeviceType::Light => {
            if device.flag("power") == Some(true) {
                device.int("brightness").map_or(0.05, |b| b as f64 * 0.001)
            } else {
                0.0
            }
        }
        DeviceType::Thermostat => {
            if device.flag("cooling") == Some(true) {
                3.0
            } else if device.flag("heating") == Some(true) {
                2.5
            } else {
                0.1
            }
        }
        DeviceType::Camera => {
            if device.flag("recording") == Some(true) {
                0.8
            } else {
                0.2
            }
        }
        DeviceType::Sensor => 0.01,
        DeviceType::Lock => 0.005,
        DeviceType::Alarm => 0.1,
    }
}

/// Heating/cooling step followed by drift toward the ambient temperature
///
/// `None` when the current or target temperature is unreadable.
pub fn thermostat_step(device: &Device, ambient: f64) -> Option<Attributes> {
    let current = device.float("temperature")?;
    let target = device.float("target_temp")?;
    let diff = target - current;

    let mut updates = if diff > 1.0 {
        attrs([
            ("heating", json!(true)),
            ("cooling", json!(false)),
            ("temperature", json!(current + 0.5)),
        ])
    } else if diff < -1.0 {
        attrs([
            ("heating", json!(false)),
            ("cooling", json!(true)),
            ("temperature", json!(current - 0.5)),
        ])
    } else {
        attrs([("heating", json!(false)), ("cooling", json!(false))])
    };

    // Ambient drift replaces the heating/cooling step when present
    let influence = (ambient - current) * 0.1;
    if influence != 0.0 {
        updates.insert("temperature".to_string(), json!(current + influence));
    }
    Some(updates)
}

/// The five devices a fresh home starts with
pub fn default_devices() -> Vec<Device> {
    vec![
        Device::new("light_001", "Living Room Light", DeviceType::Light, "Living Room")
            .with_property("brightness", json!(80))
            .with_property("color", json!("warm_white"))
            .with_property("power", json!(true)),
        Device::new("thermostat_001", "Main Thermostat", DeviceType::Thermostat, "Hallway")
            .with_property("temperature", json!(22.5))
            .with_property("target_temp", json!(21.0))
            .with_property("mode", json!("auto"))
            .with_property("heating", json!(false))
            .with_property("cooling", json!(false)),
        Device::new("camera_001", "Front Door Camera", DeviceType::Camera, "Front Door")
            .with_property("recording", json!(true))
            .with_property("motion_detect", json!(true))
            .with_property("night_vision", json!(true))
            .with_property("resolution", json!("1080p")),
        Device::new("sensor_001", "Motion Sensor", DeviceType::Sensor, "Living Room")
            .with_property("motion_detected", json!(false))
            .with_property("sensitivity", json!(7))
            .with_property("battery_level", json!(85)),
        Device::new("lock_001", "Front Door Lock", DeviceType::Lock, "Front Door")
            .with_property("locked", json!(true))
            .with_property("auto_lock", json!(true))
            .with_property("battery_level", json!(92)),
    ]
}

pub struct DeviceSimulator {
    store: Arc<WorldStore>,
    rng: Mutex<StdRng>,
    cost_per_kwh: f64,
}

impl DeviceSimulator {
    pub fn new(store: Arc<WorldStore>, config: &SimulationConfig) -> Self {
        Self {
            store,
            rng: Mutex::new(sim_rng(config.random_seed, RNG_STREAM)),
            cost_per_kwh: config.cost_per_kwh,
        }
    }

    /// Insert a device, generating an id and seeding type defaults as needed
    pub fn add_device(&self, mut device: Device) -> HubResult<Device> {
        if device.id.is_empty() {
            device.id = format!("{}_{}", device.device_type, Uuid::now_v7().simple());
        }
        schema::seed_defaults(device.device_type, &mut device.properties);
        schema::validate_properties(device.device_type, &device.properties)?;

        let device = self.store.add_device(device)?;
        info!(device_id = %device.id, device_type = %device.device_type, "Device added");
        Ok(device)
    }

    /// Fetch one device
    pub fn get_device(&self, id: &str) -> HubResult<Device> {
        self.store.get_device(id)
    }

    pub fn list_devices(&self) -> Vec<Device> {
        self.store.list_devices()
    }

    /// Validate against the device's schema, then merge
    pub fn update_device(&self, id: &str, updates: Attributes) -> HubResult<Device> {
        let device = self.store.get_device(id)?;
        schema::validate_updates(device.device_type, &updates)?;
        self.store.update_device(id, updates)
    }

    /// Remove a device. Missing ids are `DeviceNotFound`
    pub fn delete_device(&self, id: &str) -> HubResult<Device> {
        let device = self.store.delete_device(id)?;
        info!(device_id = %id, "Device deleted");
        Ok(device)
    }

    pub fn devices_by_type(&self, device_type: DeviceType) -> Vec<Device> {
        self.store.devices_by_type(device_type)
    }

    pub fn devices_by_location(&self, location: &str) -> Vec<Device> {
        self.store.devices_by_location(location)
    }

    pub fn devices_by_status(&self, status: DeviceStatus) -> Vec<Device> {
        self.store.devices_by_status(status)
    }

    /// Add the default devices; ids already present are left alone
    pub fn seed_default_devices(&self) -> usize {
        let mut added = 0;
        for device in default_devices() {
            let id = device.id.clone();
            match self.add_device(device) {
                Ok(_) => added += 1,
                Err(e) => debug!(device_id = %id, error = %e, "Skipping default device"),
            }
        }
        added
    }

    /// Per-device usage for every Online device
    pub fn calculate_energy_usage(&self) -> Vec<EnergyUsageRecord> {
        let now = Utc::now();
        self.store
            .list_devices()
            .into_iter()
            .filter(Device::is_online)
            .map(|device| {
                let usage = usage_kwh(&device);
                EnergyUsageRecord {
                    device_id: device.id,
                    device_name: device.name,
                    usage_kwh: usage,
                    cost_usd: usage * self.cost_per_kwh,
                    timestamp: now,
                }
            })
            .collect()
    }

    /// One simulation step over every device
    pub fn tick(&self) -> DeviceTickReport {
        let mut report = DeviceTickReport::default();
        let ambient = self.store.get_weather().temperature;

        for device in self.store.list_devices() {
            let perturbation = {
                let mut rng = self.rng.lock();
                if rng.gen::<f64>() < PERTURB_CHANCE {
                    perturb(device.device_type, &mut *rng)
                } else {
                    None
                }
            };
            if let Some(updates) = perturbation {
                match self.store.update_device(&device.id, updates) {
                    Ok(_) => report.perturbed += 1,
                    Err(e) => debug!(device_id = %device.id, error = %e, "Device vanished mid-tick"),
                }
            }

            match device.device_type {
                DeviceType::Thermostat => {
                    match self
                        .store
                        .update_device_with(&device.id, |d| thermostat_step(d, ambient))
                    {
                        Ok(Some(_)) => report.thermostats += 1,
                        Ok(None) => debug!(device_id = %device.id, "Thermostat temperatures unreadable"),
                        Err(e) => debug!(device_id = %device.id, error = %e, "Device vanished mid-tick"),
                    }
                }
                DeviceType::Sensor => {
                    if let Some(tripped) = self.sensor_reading(&device.id, &mut report) {
                        report.triggered_by = Some(tripped);
                    }
                }
                _ => {}
            }
        }

        report
    }

    fn sensor_reading(&self, sensor_id: &str, report: &mut DeviceTickReport) -> Option<String> {
        let motion = {
            let mut rng = self.rng.lock();
            if rng.gen::<f64>() >= SENSOR_READING_CHANCE {
                return None;
            }
            rng.gen::<f64>() < 0.3
        };

        if let Err(e) = self
            .store
            .update_device(sensor_id, attrs([("motion_detected", json!(motion))]))
        {
            debug!(device_id = %sensor_id, error = %e, "Device vanished mid-tick");
            return None;
        }
        report.motion_readings += 1;

        if !motion {
            return None;
        }
        let now = Utc::now();
        let triggered = self
            .store
            .transition_security(|sys, _| security::on_motion(sys, sensor_id, now))?;
        warn!(sensor_id = %sensor_id, state = %triggered.state, "Security triggered by motion");
        triggered.triggered_by
    }
}

/// Random attribute changes for one device type
fn perturb(device_type: DeviceType, rng: &mut impl Rng) -> Option<Attributes> {
    let mut updates = Attributes::new();
    match device_type {
        DeviceType::Light => {
            if rng.gen::<f64>() < 0.5 {
                updates.insert("brightness".into(), json!(rng.gen_range(1..=100)));
            }
            if rng.gen::<f64>() < 0.3 {
                updates.insert("power".into(), json!(rng.gen::<f64>() < 0.7));
            }
        }
        DeviceType::Camera => {
            if rng.gen::<f64>() < 0.2 {
                updates.insert("motion_detect".into(), json!(rng.gen::<f64>() < 0.8));
            }
            if rng.gen::<f64>() < 0.1 {
                updates.insert("recording".into(), json!(rng.gen::<f64>() < 0.9));
            }
        }
        DeviceType::Lock => {
            if rng.gen::<f64>() < 0.1 {
                updates.insert("locked".into(), json!(rng.gen::<f64>() < 0.9));
            }
            if rng.gen::<f64>() < 0.05 {
                updates.insert("battery_level".into(), json!(rng.gen_range(1..=100)));
            }
        }
        _ => {}
    }
    (!updates.is_empty()).then_some(updates)
}

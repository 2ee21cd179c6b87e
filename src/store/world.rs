use super::ring::BoundedLog;
use crate::error::{HubError, HubResult};
use crate::model::{
    kinds, Attributes, Device, DeviceStatus, EnergyUsageRecord, ScheduledTask, SecuritySystem,
    SystemEvent, TaskUpdate, WeatherSnapshot,
};
use crate::notify::{ChangeEvent, Notifier};
use chrono::{DateTime, Utc};
use serde_json::{json, Value};
use std::collections::BTreeMap;

const SOURCE: &str = "storage";

/// Everything guarded by the store lock
///
/// Each mutation appends its system event and publishes the change while the
/// caller still holds the exclusive section, so subscribers see log order.
pub(crate) struct WorldState {
    pub(crate) devices: BTreeMap<String, Device>,
    pub(crate) tasks: BTreeMap<String, ScheduledTask>,
    pub(crate) weather: WeatherSnapshot,
    pub(crate) security: SecuritySystem,
    pub(crate) energy: BoundedLog<EnergyUsageRecord>,
    pub(crate) events: BoundedLog<SystemEvent>,
    pub(crate) started_at: DateTime<Utc>,
    notifier: Notifier,
}

impl WorldState {
    pub(crate) fn new(energy_capacity: usize, event_capacity: usize, notifier: Notifier) -> Self {
        Self {
            devices: BTreeMap::new(),
            tasks: BTreeMap::new(),
            weather: WeatherSnapshot::default(),
            security: SecuritySystem::default(),
            energy: BoundedLog::new(energy_capacity),
            events: BoundedLog::new(event_capacity),
            started_at: Utc::now(),
            notifier,
        }
    }

    pub(crate) fn record(&mut self, event: SystemEvent) {
        self.notifier.publish(&ChangeEvent::from(&event));
        self.events.push(event);
    }

    fn announce(&self, event_type: &str, data: Value) {
        self.notifier.publish(&ChangeEvent::new(event_type, data));
    }

    fn emit(&mut self, event_type: &str, message: String, data: Value) {
        let data = match data {
            Value::Object(map) => map,
            _ => Attributes::new(),
        };
        self.record(SystemEvent::new(event_type, SOURCE, message).with_data(data));
    }

    pub(crate) fn insert_device(&mut self, mut device: Device) -> HubResult<Device> {
        if self.devices.contains_key(&device.id) {
            return Err(HubError::Conflict {
                kind: "device",
                id: device.id,
            });
        }

        let now = Utc::now();
        device.created_at = now;
        device.last_updated = now;
        self.devices.insert(device.id.clone(), device.clone());

        self.emit(
            kinds::DEVICE_ADDED,
            format!("Device {} added", device.name),
            json!({ "device_id": device.id, "device_type": device.device_type }),
        );
        Ok(device)
    }

    /// Apply top-level fields directly and merge everything else into properties
    pub(crate) fn update_device(&mut self, id: &str, updates: Attributes) -> HubResult<Device> {
        let device = self
            .devices
            .get_mut(id)
            .ok_or_else(|| HubError::device_not_found(id))?;

        for (key, value) in &updates {
            match key.as_str() {
                "name" => {
                    if let Some(name) = value.as_str() {
                        device.name = name.to_string();
                    }
                }
                "status" => {
                    if let Some(status) = value.as_str().and_then(|s| s.parse::<DeviceStatus>().ok()) {
                        device.status = status;
                    }
                }
                "location" => {
                    if let Some(location) = value.as_str() {
                        device.location = location.to_string();
                    }
                }
                _ => {
                    device.properties.insert(key.clone(), value.clone());
                }
            }
        }
        device.last_updated = Utc::now();
        let device = device.clone();

        self.emit(
            kinds::DEVICE_UPDATED,
            format!("Device {} updated", device.name),
            json!({ "device_id": device.id, "updates": updates }),
        );
        Ok(device)
    }

    pub(crate) fn remove_device(&mut self, id: &str) -> HubResult<Device> {
        let device = self
            .devices
            .remove(id)
            .ok_or_else(|| HubError::device_not_found(id))?;

        self.emit(
            kinds::DEVICE_DELETED,
            format!("Device {} deleted", device.name),
            json!({ "device_id": device.id }),
        );
        Ok(device)
    }

    pub(crate) fn replace_weather(&mut self, weather: WeatherSnapshot) {
        let data = json!({ "temperature": weather.temperature, "condition": weather.condition });
        self.weather = weather;
        self.emit(kinds::WEATHER_UPDATED, "Weather data updated".to_string(), data);
    }

    pub(crate) fn replace_security(&mut self, security: SecuritySystem) {
        let message = format!("Security state changed to {}", security.state);
        let data = json!({ "state": security.state, "sensors": security.active_sensors });
        self.security = security;
        self.emit(kinds::SECURITY_UPDATED, message, data);
    }

    pub(crate) fn insert_task(&mut self, mut task: ScheduledTask) -> HubResult<ScheduledTask> {
        if self.tasks.contains_key(&task.id) {
            return Err(HubError::Conflict {
                kind: "task",
                id: task.id,
            });
        }

        task.created_at = Utc::now();
        self.tasks.insert(task.id.clone(), task.clone());

        self.emit(
            kinds::TASK_ADDED,
            format!("Scheduled task {} added", task.name),
            json!({ "task_id": task.id, "device_id": task.device_id, "schedule": task.schedule }),
        );
        Ok(task)
    }

    /// Task updates publish a change but leave the system event log untouched
    pub(crate) fn update_task(&mut self, id: &str, update: TaskUpdate) -> HubResult<ScheduledTask> {
        let task = self
            .tasks
            .get_mut(id)
            .ok_or_else(|| HubError::task_not_found(id))?;

        if let Some(enabled) = update.enabled {
            task.enabled = enabled;
        }
        if let Some(next_run) = update.next_run {
            task.next_run = Some(next_run);
        }
        if let Some(last_run) = update.last_run {
            task.last_run = Some(last_run);
        }
        let task = task.clone();

        self.announce(kinds::TASK_UPDATED, json!({ "task_id": task.id, "enabled": task.enabled }));
        Ok(task)
    }

    pub(crate) fn push_energy(&mut self, record: EnergyUsageRecord) {
        self.announce(
            kinds::ENERGY_USAGE,
            json!({ "device_id": record.device_id, "usage_kwh": record.usage_kwh }),
        );
        self.energy.push(record);
    }

    pub(crate) fn clear(&mut self) {
        self.devices.clear();
        self.tasks.clear();
        self.weather = WeatherSnapshot::default();
        self.security = SecuritySystem::default();
        self.energy.clear();
        self.events.clear();
        self.started_at = Utc::now();
        self.emit(kinds::SYSTEM_RESET, "System state reset".to_string(), json!({}));
    }
}

/// Several mutations applied under one exclusive section
///
/// Every mutation is still evented individually.
pub struct Batch<'a> {
    pub(crate) state: &'a mut WorldState,
}

impl Batch<'_> {
    /// Devices in id order, as of this point in the batch
    pub fn devices(&self) -> impl Iterator<Item = &Device> {
        self.state.devices.values()
    }

    /// Look up one device
    pub fn device(&self, id: &str) -> Option<&Device> {
        self.state.devices.get(id)
    }

    /// Merge `updates` into a device and log `device_updated`
    pub fn update_device(&mut self, id: &str, updates: Attributes) -> HubResult<Device> {
        self.state.update_device(id, updates)
    }

    /// Security system as of this point in the batch
    pub fn security(&self) -> &SecuritySystem {
        &self.state.security
    }

    pub fn update_security(&mut self, security: SecuritySystem) {
        self.state.replace_security(security);
    }

    /// Append to the event log and publish
    pub fn add_system_event(&mut self, event: SystemEvent) {
        self.state.record(event);
    }
}

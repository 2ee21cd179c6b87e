// World store: the single source of truth for the simulated home

mod ring;
mod world;

pub use ring::BoundedLog;
pub use world::Batch;

use crate::config::LimitsConfig;
use crate::error::{HubError, HubResult};
use crate::model::{
    Attributes, Device, DeviceStatus, DeviceType, EnergyUsageRecord, ScheduledTask,
    SecuritySystem, SystemEvent, TaskUpdate, WeatherSnapshot,
};
use crate::notify::{Notifier, Subscription};
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::Serialize;
use std::collections::BTreeMap;
use world::WorldState;

/// Consistent point-in-time view of the whole world
#[derive(Debug, Clone, Serialize)]
pub struct WorldSnapshot {
    pub devices: Vec<Device>,
    pub weather: WeatherSnapshot,
    pub security: SecuritySystem,
    pub tasks: Vec<ScheduledTask>,
    pub energy_usage: Vec<EnergyUsageRecord>,
    pub system_events: Vec<SystemEvent>,
    pub started_at: DateTime<Utc>,
    pub uptime_seconds: i64,
    pub timestamp: DateTime<Utc>,
}

/// Shared world state behind a single reader-writer lock
///
/// Any number of reads proceed together; every mutation is exclusive with
/// all reads and other mutations. Critical sections never await.
pub struct WorldStore {
    inner: RwLock<WorldState>,
    notifier: Notifier,
}

impl WorldStore {
    /// Store with the default capacities
    pub fn new() -> Self {
        Self::with_limits(&LimitsConfig::default())
    }

    /// Store sized by `limits`; the notifier shares the subscriber buffer
    pub fn with_limits(limits: &LimitsConfig) -> Self {
        let notifier = Notifier::new(limits.subscriber_buffer);
        Self {
            inner: RwLock::new(WorldState::new(
                limits.energy_log_capacity,
                limits.event_log_capacity,
                notifier.clone(),
            )),
            notifier,
        }
    }

    /// Subscribe to change events for every subsequent mutation
    pub fn subscribe(&self) -> Subscription {
        self.notifier.subscribe()
    }

    pub fn notifier(&self) -> &Notifier {
        &self.notifier
    }

    // Devices

    pub fn add_device(&self, device: Device) -> HubResult<Device> {
        self.inner.write().insert_device(device)
    }

    /// Clone of one device, or `DeviceNotFound`
    pub fn get_device(&self, id: &str) -> HubResult<Device> {
        self.inner
            .read()
            .devices
            .get(id)
            .cloned()
            .ok_or_else(|| HubError::device_not_found(id))
    }

    /// All devices ordered by id
    pub fn list_devices(&self) -> Vec<Device> {
        self.inner.read().devices.values().cloned().collect()
    }

    pub fn update_device(&self, id: &str, updates: Attributes) -> HubResult<Device> {
        self.inner.write().update_device(id, updates)
    }

    /// Read-modify-write of one device inside the exclusive section
    ///
    /// `f` sees the current device and returns the updates to merge, or
    /// `None` to leave it untouched (and unevented).
    pub fn update_device_with<F>(&self, id: &str, f: F) -> HubResult<Option<Device>>
    where
        F: FnOnce(&Device) -> Option<Attributes>,
    {
        let mut state = self.inner.write();
        let device = state
            .devices
            .get(id)
            .ok_or_else(|| HubError::device_not_found(id))?;

        match f(device) {
            Some(updates) => state.update_device(id, updates).map(Some),
            None => Ok(None),
        }
    }

    /// Remove a device and return it
    pub fn delete_device(&self, id: &str) -> HubResult<Device> {
        self.inner.write().remove_device(id)
    }

    pub fn devices_by_type(&self, device_type: DeviceType) -> Vec<Device> {
        self.filter_devices(|d| d.device_type == device_type)
    }

    pub fn devices_by_location(&self, location: &str) -> Vec<Device> {
        self.filter_devices(|d| d.location == location)
    }

    pub fn devices_by_status(&self, status: DeviceStatus) -> Vec<Device> {
        self.filter_devices(|d| d.status == status)
    }

    fn filter_devices(&self, pred: impl Fn(&Device) -> bool) -> Vec<Device> {
        self.inner
            .read()
            .devices
            .values()
            .filter(|d| pred(d))
            .cloned()
            .collect()
    }

    // Weather and security

    pub fn update_weather(&self, weather: WeatherSnapshot) {
        self.inner.write().replace_weather(weather);
    }

    /// Derive the next snapshot from the current one inside the exclusive section
    pub fn update_weather_with<F>(&self, f: F) -> WeatherSnapshot
    where
        F: FnOnce(&WeatherSnapshot) -> WeatherSnapshot,
    {
        let mut state = self.inner.write();
        let next = f(&state.weather);
        state.replace_weather(next.clone());
        next
    }

    /// Current weather
    pub fn get_weather(&self) -> WeatherSnapshot {
        self.inner.read().weather.clone()
    }

    pub fn update_security(&self, security: SecuritySystem) {
        self.inner.write().replace_security(security);
    }

    /// Current security system
    pub fn get_security(&self) -> SecuritySystem {
        self.inner.read().security.clone()
    }

    /// Compare-and-transition of the security system
    ///
    /// `f` sees the current system and the device map under the exclusive
    /// section; a returned system replaces the current one and is evented.
    pub fn transition_security<F>(&self, f: F) -> Option<SecuritySystem>
    where
        F: FnOnce(&SecuritySystem, &BTreeMap<String, Device>) -> Option<SecuritySystem>,
    {
        let mut state = self.inner.write();
        let next = f(&state.security, &state.devices)?;
        state.replace_security(next.clone());
        Some(next)
    }

    // Tasks

    pub fn add_task(&self, task: ScheduledTask) -> HubResult<ScheduledTask> {
        self.inner.write().insert_task(task)
    }

    /// Clone of one task, or `TaskNotFound`
    pub fn get_task(&self, id: &str) -> HubResult<ScheduledTask> {
        self.inner
            .read()
            .tasks
            .get(id)
            .cloned()
            .ok_or_else(|| HubError::task_not_found(id))
    }

    /// All tasks ordered by id
    pub fn list_tasks(&self) -> Vec<ScheduledTask> {
        self.inner.read().tasks.values().cloned().collect()
    }

    /// Apply the set fields of `update`. Publishes a change but logs no event
    pub fn update_task(&self, id: &str, update: TaskUpdate) -> HubResult<ScheduledTask> {
        self.inner.write().update_task(id, update)
    }

    // Logs

    pub fn add_energy_usage(&self, record: EnergyUsageRecord) {
        self.inner.write().push_energy(record);
    }

    /// Most recent `limit` records, oldest first. Zero means all
    pub fn get_energy_usage(&self, limit: usize) -> Vec<EnergyUsageRecord> {
        self.inner.read().energy.recent(limit)
    }

    pub fn add_system_event(&self, event: SystemEvent) {
        self.inner.write().record(event);
    }

    /// Most recent `limit` events, oldest first. Zero means all
    pub fn get_system_events(&self, limit: usize) -> Vec<SystemEvent> {
        self.inner.read().events.recent(limit)
    }

    // Whole-world operations

    /// Copy everything under one read section
    pub fn snapshot(&self) -> WorldSnapshot {
        let state = self.inner.read();
        let now = Utc::now();
        WorldSnapshot {
            devices: state.devices.values().cloned().collect(),
            weather: state.weather.clone(),
            security: state.security.clone(),
            tasks: state.tasks.values().cloned().collect(),
            energy_usage: state.energy.recent(0),
            system_events: state.events.recent(0),
            started_at: state.started_at,
            uptime_seconds: (now - state.started_at).num_seconds(),
            timestamp: now,
        }
    }

    /// Clear every collection and restore initial weather and security
    pub fn reset(&self) {
        self.inner.write().clear();
    }

    /// Run several mutations atomically with respect to all other callers
    pub fn apply_batch<R>(&self, f: impl FnOnce(&mut Batch<'_>) -> R) -> R {
        let mut state = self.inner.write();
        let mut batch = Batch { state: &mut *state };
        f(&mut batch)
    }
}

impl Default for WorldStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests;

// Derived summaries over the world store

use crate::model::{DeviceStatus, EnergyUsageRecord, SecurityState, SystemEvent, WeatherCondition, WeatherSnapshot};
use crate::store::WorldStore;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;

/// Energy records considered by the summary
pub const ENERGY_WINDOW: usize = 500;
/// System events scanned for security activity
pub const EVENT_WINDOW: usize = 100;

#[derive(Debug, Clone, Serialize)]
pub struct AnalyticsSummary {
    pub total_devices: usize,
    pub online_devices: usize,
    pub offline_devices: usize,
    pub total_energy_usage_kwh: f64,
    pub total_energy_cost_usd: f64,
    /// Usage per device name across the energy window
    pub device_usage: BTreeMap<String, f64>,
    pub security_events: usize,
    pub scheduled_tasks: usize,
    pub weather_summary: WeatherSnapshot,
    pub generated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct HealthSummary {
    pub status: &'static str,
    pub uptime_seconds: i64,
    pub total_devices: usize,
    pub online_devices: usize,
    pub weather_status: WeatherCondition,
    pub security_state: SecurityState,
    pub timestamp: DateTime<Utc>,
}

/// Aggregate devices, energy, security activity and tasks from one snapshot
pub fn summary(store: &WorldStore) -> AnalyticsSummary {
    let snapshot = store.snapshot();
    let energy = tail(&snapshot.energy_usage, ENERGY_WINDOW);
    let events = tail(&snapshot.system_events, EVENT_WINDOW);

    let online = count_status(snapshot.devices.iter().map(|d| d.status), DeviceStatus::Online);
    let offline = count_status(snapshot.devices.iter().map(|d| d.status), DeviceStatus::Offline);

    AnalyticsSummary {
        total_devices: snapshot.devices.len(),
        online_devices: online,
        offline_devices: offline,
        total_energy_usage_kwh: energy.iter().map(|r| r.usage_kwh).sum(),
        total_energy_cost_usd: energy.iter().map(|r| r.cost_usd).sum(),
        device_usage: usage_by_device(energy),
        security_events: security_event_count(events),
        scheduled_tasks: snapshot.tasks.len(),
        weather_summary: snapshot.weather,
        generated_at: snapshot.timestamp,
    }
}

pub fn health(store: &WorldStore) -> HealthSummary {
    let snapshot = store.snapshot();
    HealthSummary {
        status: "healthy",
        uptime_seconds: snapshot.uptime_seconds,
        total_devices: snapshot.devices.len(),
        online_devices: count_status(snapshot.devices.iter().map(|d| d.status), DeviceStatus::Online),
        weather_status: snapshot.weather.condition,
        security_state: snapshot.security.state,
        timestamp: snapshot.timestamp,
    }
}

fn tail<T>(items: &[T], limit: usize) -> &[T] {
    &items[items.len().saturating_sub(limit)..]
}

fn count_status(statuses: impl Iterator<Item = DeviceStatus>, wanted: DeviceStatus) -> usize {
    statuses.filter(|s| *s == wanted).count()
}

fn usage_by_device(records: &[EnergyUsageRecord]) -> BTreeMap<String, f64> {
    let mut usage = BTreeMap::new();
    for record in records {
        *usage.entry(record.device_name.clone()).or_insert(0.0) += record.usage_kwh;
    }
    usage
}

fn security_event_count(events: &[SystemEvent]) -> usize {
    events
        .iter()
        .filter(|e| e.event_type.contains("security"))
        .count()
}

use super::{SchedulingEngine, SOURCE};
use crate::model::{attrs, kinds, DeviceStatus, DeviceType, SystemEvent};
use crate::security;
use crate::weather::weather_alert;
use chrono::Utc;
use serde_json::json;
use tracing::{info, warn};

/// Outcome of one energy monitor tick
#[derive(Debug, Clone, PartialEq)]
pub struct EnergyTick {
    pub records: usize,
    pub total_kwh: f64,
    pub alert: bool,
}

/// Outcome of one security monitor tick
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SecurityTick {
    pub rearmed: bool,
    pub offline_sensors: usize,
}

impl SchedulingEngine {
    /// Sample usage for every online device and warn above the threshold
    pub fn energy_tick(&self) -> EnergyTick {
        let records = self.devices.calculate_energy_usage();
        let count = records.len();
        let total: f64 = records.iter().map(|r| r.usage_kwh).sum();

        for record in records {
            self.store.add_energy_usage(record);
        }

        let alert = total > self.energy_alert_threshold;
        if alert {
            warn!(total_kwh = total, "High energy usage");
            self.store.add_system_event(
                SystemEvent::new(
                    kinds::ENERGY_ALERT,
                    SOURCE,
                    format!("High energy usage detected: {:.2} kWh", total),
                )
                .with_data(attrs([
                    ("total_usage", json!(total)),
                    ("threshold", json!(self.energy_alert_threshold)),
                ]))
                .warning(),
            );
        }

        EnergyTick {
            records: count,
            total_kwh: total,
            alert,
        }
    }

    /// Re-arm a timed-out alarm and flag offline sensors
    pub fn security_tick(&self) -> SecurityTick {
        let now = Utc::now();
        let timeout = self.security_timeout;
        let mut tick = SecurityTick::default();

        if self
            .store
            .transition_security(|sys, _| security::on_timeout(sys, now, timeout))
            .is_some()
        {
            tick.rearmed = true;
            info!("Security system re-armed after timeout");
            self.store.add_system_event(
                SystemEvent::new(
                    kinds::SECURITY_RESET,
                    SOURCE,
                    "Security system automatically reset after timeout",
                )
                .with_data(attrs([
                    ("previous_state", json!("triggered")),
                    ("timeout_minutes", json!(timeout.num_minutes())),
                ])),
            );
        }

        for sensor in self.store.devices_by_type(DeviceType::Sensor) {
            if sensor.status != DeviceStatus::Offline {
                continue;
            }
            tick.offline_sensors += 1;
            self.store.add_system_event(
                SystemEvent::new(
                    kinds::SENSOR_OFFLINE,
                    SOURCE,
                    format!("Security sensor {} is offline", sensor.name),
                )
                .with_data(attrs([
                    ("device_id", json!(sensor.id)),
                    ("location", json!(sensor.location)),
                ]))
                .warning(),
            );
        }

        tick
    }

    /// Offline-majority and weather alert checks; returns warnings emitted
    pub fn health_tick(&self) -> usize {
        let devices = self.store.list_devices();
        let total = devices.len();
        let offline = devices
            .iter()
            .filter(|d| d.status == DeviceStatus::Offline)
            .count();
        let mut warnings = 0;

        if offline * 2 > total {
            warnings += 1;
            warn!(offline, total, "Most devices are offline");
            self.store.add_system_event(
                SystemEvent::new(
                    kinds::SYSTEM_HEALTH_WARNING,
                    SOURCE,
                    format!("High number of offline devices: {}/{}", offline, total),
                )
                .with_data(attrs([
                    ("offline_count", json!(offline)),
                    ("total_devices", json!(total)),
                ]))
                .warning(),
            );
        }

        let weather = self.store.get_weather();
        if let Some(alert) = weather_alert(&weather) {
            warnings += 1;
            warn!(alert = %alert, "Weather alert");
            self.store.add_system_event(
                SystemEvent::new(kinds::WEATHER_ALERT, SOURCE, alert.message())
                    .with_data(attrs([
                        ("alert", json!(alert)),
                        ("temperature", json!(weather.temperature)),
                        ("condition", json!(weather.condition)),
                        ("wind_speed", json!(weather.wind_speed)),
                        ("pressure", json!(weather.pressure)),
                    ]))
                    .warning(),
            );
        }

        warnings
    }
}

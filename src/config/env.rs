use super::HomeConfig;
use std::str::FromStr;
use tracing::warn;

impl HomeConfig {
    /// Override fields from `HOMESIM_*` env vars
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    pub(crate) fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let w = &mut self.workers;
        set(&lookup, "HOMESIM_WEATHER_INTERVAL_SECS", &mut w.weather_interval_secs);
        set(&lookup, "HOMESIM_DEVICE_INTERVAL_SECS", &mut w.device_interval_secs);
        set(&lookup, "HOMESIM_TASK_INTERVAL_SECS", &mut w.task_interval_secs);
        set(&lookup, "HOMESIM_ENERGY_INTERVAL_SECS", &mut w.energy_interval_secs);
        set(&lookup, "HOMESIM_SECURITY_INTERVAL_SECS", &mut w.security_interval_secs);
        set(&lookup, "HOMESIM_HEALTH_INTERVAL_SECS", &mut w.health_interval_secs);

        let l = &mut self.limits;
        set(&lookup, "HOMESIM_ENERGY_LOG_CAPACITY", &mut l.energy_log_capacity);
        set(&lookup, "HOMESIM_EVENT_LOG_CAPACITY", &mut l.event_log_capacity);
        set(&lookup, "HOMESIM_SUBSCRIBER_BUFFER", &mut l.subscriber_buffer);
        set(&lookup, "HOMESIM_SHUTDOWN_TIMEOUT_SECS", &mut l.shutdown_timeout_secs);

        let s = &mut self.simulation;
        set(&lookup, "HOMESIM_SECURITY_TIMEOUT_SECS", &mut s.security_timeout_secs);
        set(&lookup, "HOMESIM_ENERGY_ALERT_THRESHOLD_KWH", &mut s.energy_alert_threshold_kwh);
        set(&lookup, "HOMESIM_COST_PER_KWH", &mut s.cost_per_kwh);
        set(&lookup, "HOMESIM_SEED_DEFAULT_DEVICES", &mut s.seed_default_devices);

        if let Some(v) = lookup("HOMESIM_RANDOM_SEED") {
            match v.parse::<u64>() {
                Ok(seed) => s.random_seed = Some(seed),
                Err(_) => warn!(value = %v, "Ignoring invalid HOMESIM_RANDOM_SEED"),
            }
        }
    }
}

fn set<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str, field: &mut T) {
    if let Some(v) = lookup(key) {
        match v.parse::<T>() {
            Ok(parsed) => *field = parsed,
            Err(_) => warn!(key, value = %v, "Ignoring unparseable config override"),
        }
    }
}

mod env;

use anyhow::{ensure, Context, Result};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

/// Complete homesim configuration
#[derive(Debug, Clone, Default, Deserialize)]
pub struct HomeConfig {
    #[serde(default)]
    pub workers: WorkersConfig,
    #[serde(default)]
    pub limits: LimitsConfig,
    #[serde(default)]
    pub simulation: SimulationConfig,
}

/// Tick interval per periodic worker (seconds)
#[derive(Debug, Clone, Deserialize)]
pub struct WorkersConfig {
    /// Weather random-walk step
    #[serde(default = "default_weather_interval")]
    pub weather_interval_secs: u64,
    /// Device perturbation, thermostats and motion sensors
    #[serde(default = "default_device_interval")]
    pub device_interval_secs: u64,
    /// Due-task runner
    #[serde(default = "default_task_interval")]
    pub task_interval_secs: u64,
    /// Energy sampling and alert check
    #[serde(default = "default_energy_interval")]
    pub energy_interval_secs: u64,
    /// Alarm re-arm check
    #[serde(default = "default_security_interval")]
    pub security_interval_secs: u64,
    /// Offline device report
    #[serde(default = "default_health_interval")]
    pub health_interval_secs: u64,
}

fn default_weather_interval() -> u64 {
    30
}

fn default_device_interval() -> u64 {
    5
}

fn default_task_interval() -> u64 {
    10
}

fn default_energy_interval() -> u64 {
    10
}

fn default_security_interval() -> u64 {
    5
}

fn default_health_interval() -> u64 {
    30
}

impl Default for WorkersConfig {
    fn default() -> Self {
        Self {
            weather_interval_secs: default_weather_interval(),
            device_interval_secs: default_device_interval(),
            task_interval_secs: default_task_interval(),
            energy_interval_secs: default_energy_interval(),
            security_interval_secs: default_security_interval(),
            health_interval_secs: default_health_interval(),
        }
    }
}

impl WorkersConfig {
    pub fn weather_interval(&self) -> Duration {
        secs(self.weather_interval_secs)
    }

    pub fn device_interval(&self) -> Duration {
        secs(self.device_interval_secs)
    }

    pub fn task_interval(&self) -> Duration {
        secs(self.task_interval_secs)
    }

    pub fn energy_interval(&self) -> Duration {
        secs(self.energy_interval_secs)
    }

    pub fn security_interval(&self) -> Duration {
        secs(self.security_interval_secs)
    }

    pub fn health_interval(&self) -> Duration {
        secs(self.health_interval_secs)
    }
}

/// Longest accepted worker interval or timeout (one year)
pub const MAX_PERIOD_SECS: u64 = 365 * 24 * 60 * 60;
/// Largest accepted ring capacity or subscriber buffer
pub const MAX_CAPACITY: usize = 1_000_000;

// tokio intervals panic on a zero period and Instant arithmetic overflows on huge ones
fn secs(n: u64) -> Duration {
    Duration::from_secs(n.clamp(1, MAX_PERIOD_SECS))
}

/// Capacities and timeouts
#[derive(Debug, Clone, Deserialize)]
pub struct LimitsConfig {
    /// Energy records kept before the oldest are dropped
    #[serde(default = "default_energy_capacity")]
    pub energy_log_capacity: usize,
    /// System events kept before the oldest are dropped
    #[serde(default = "default_event_capacity")]
    pub event_log_capacity: usize,
    /// Per-subscriber change event buffer
    #[serde(default = "default_subscriber_buffer")]
    pub subscriber_buffer: usize,
    /// How long shutdown waits before aborting workers
    #[serde(default = "default_shutdown_timeout")]
    pub shutdown_timeout_secs: u64,
}

fn default_energy_capacity() -> usize {
    1000
}

fn default_event_capacity() -> usize {
    500
}

fn default_subscriber_buffer() -> usize {
    256
}

fn default_shutdown_timeout() -> u64 {
    5
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            energy_log_capacity: default_energy_capacity(),
            event_log_capacity: default_event_capacity(),
            subscriber_buffer: default_subscriber_buffer(),
            shutdown_timeout_secs: default_shutdown_timeout(),
        }
    }
}

impl LimitsConfig {
    /// Shutdown deadline, capped at `MAX_PERIOD_SECS`
    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.shutdown_timeout_secs.min(MAX_PERIOD_SECS))
    }
}

/// Simulation tunables
#[derive(Debug, Clone, Deserialize)]
pub struct SimulationConfig {
    /// Triggered alarms re-arm after this long
    #[serde(default = "default_security_timeout")]
    pub security_timeout_secs: u64,
    #[serde(default = "default_energy_alert_threshold")]
    pub energy_alert_threshold_kwh: f64,
    #[serde(default = "default_cost_per_kwh")]
    pub cost_per_kwh: f64,
    #[serde(default = "default_seed_devices")]
    pub seed_default_devices: bool,
    /// Fixed RNG seed for reproducible runs
    #[serde(default)]
    pub random_seed: Option<u64>,
}

fn default_security_timeout() -> u64 {
    300
}

fn default_energy_alert_threshold() -> f64 {
    10.0
}

fn default_cost_per_kwh() -> f64 {
    0.12
}

fn default_seed_devices() -> bool {
    true
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            security_timeout_secs: default_security_timeout(),
            energy_alert_threshold_kwh: default_energy_alert_threshold(),
            cost_per_kwh: default_cost_per_kwh(),
            seed_default_devices: default_seed_devices(),
            random_seed: None,
        }
    }
}

impl SimulationConfig {
    /// Re-arm delay, capped at `MAX_PERIOD_SECS`
    pub fn security_timeout(&self) -> chrono::Duration {
        let secs = self.security_timeout_secs.min(MAX_PERIOD_SECS) as i64;
        chrono::Duration::try_seconds(secs).unwrap_or(chrono::Duration::MAX)
    }
}

/// Load configuration from a TOML file
pub fn load_config(path: impl AsRef<Path>) -> Result<HomeConfig> {
    let path = path.as_ref();
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config file {}", path.display()))?;
    let config: HomeConfig = toml::from_str(&contents)
        .with_context(|| format!("failed to parse config file {}", path.display()))?;
    Ok(config)
}

impl HomeConfig {
    /// Reject values the runtime cannot honour
    pub fn validate(&self) -> Result<()> {
        let w = &self.workers;
        for (name, value) in [
            ("workers.weather_interval_secs", w.weather_interval_secs),
            ("workers.device_interval_secs", w.device_interval_secs),
            ("workers.task_interval_secs", w.task_interval_secs),
            ("workers.energy_interval_secs", w.energy_interval_secs),
            ("workers.security_interval_secs", w.security_interval_secs),
            ("workers.health_interval_secs", w.health_interval_secs),
            ("limits.shutdown_timeout_secs", self.limits.shutdown_timeout_secs),
            ("simulation.security_timeout_secs", self.simulation.security_timeout_secs),
        ] {
            ensure!(
                value <= MAX_PERIOD_SECS,
                "{} = {} exceeds the maximum of {} seconds",
                name,
                value,
                MAX_PERIOD_SECS
            );
        }

        for (name, value) in [
            ("limits.energy_log_capacity", self.limits.energy_log_capacity),
            ("limits.event_log_capacity", self.limits.event_log_capacity),
            ("limits.subscriber_buffer", self.limits.subscriber_buffer),
        ] {
            ensure!(
                value <= MAX_CAPACITY,
                "{} = {} exceeds the maximum of {}",
                name,
                value,
                MAX_CAPACITY
            );
        }
        Ok(())
    }
}

/// Load from `path` when given, then apply `HOMESIM_*` environment overrides
pub fn load_with_env(path: Option<&Path>) -> Result<HomeConfig> {
    let mut config = match path {
        Some(p) => load_config(p)?,
        None => HomeConfig::default(),
    };
    config.apply_env_overrides();
    config.validate().context("invalid configuration")?;
    Ok(config)
}

// Wiring of store, simulators and scheduler into one running home

use crate::analytics::{self, AnalyticsSummary, HealthSummary};
use crate::config::HomeConfig;
use crate::device::DeviceSimulator;
use crate::model::SecuritySystem;
use crate::notify::Subscription;
use crate::scheduler::SchedulingEngine;
use crate::security;
use crate::store::WorldStore;
use crate::weather::WeatherSimulator;
use crate::worker::WorkerGroup;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// The simulated home: one world store plus everything that drives it
pub struct SmartHome {
    config: HomeConfig,
    store: Arc<WorldStore>,
    weather: Arc<WeatherSimulator>,
    devices: Arc<DeviceSimulator>,
    scheduler: Arc<SchedulingEngine>,
}

impl SmartHome {
    /// Build every component and seed the default devices when configured
    pub fn new(config: HomeConfig) -> Self {
        let store = Arc::new(WorldStore::with_limits(&config.limits));
        let weather = Arc::new(WeatherSimulator::new(
            Arc::clone(&store),
            config.simulation.random_seed,
        ));
        let devices = Arc::new(DeviceSimulator::new(Arc::clone(&store), &config.simulation));
        let scheduler = Arc::new(SchedulingEngine::new(
            Arc::clone(&store),
            Arc::clone(&devices),
            &config.simulation,
        ));

        if config.simulation.seed_default_devices {
            let added = devices.seed_default_devices();
            info!(added, "Default devices seeded");
        }

        Self {
            config,
            store,
            weather,
            devices,
            scheduler,
        }
    }

    /// Spawn the six periodic workers on the current tokio runtime
    pub fn start(&self) -> WorkerGroup {
        let intervals = &self.config.workers;
        let mut group = WorkerGroup::new();

        let weather = Arc::clone(&self.weather);
        group.spawn_periodic("weather", intervals.weather_interval(), move || {
            let snapshot = weather.tick();
            debug!(
                temperature = snapshot.temperature,
                condition = %snapshot.condition,
                "Weather updated"
            );
        });

        let devices = Arc::clone(&self.devices);
        group.spawn_periodic("devices", intervals.device_interval(), move || {
            let report = devices.tick();
            if let Some(sensor) = report.triggered_by {
                warn!(sensor_id = %sensor, "Alarm triggered during device tick");
            }
        });

        let scheduler = Arc::clone(&self.scheduler);
        group.spawn_periodic("task_runner", intervals.task_interval(), move || {
            scheduler.process_tasks();
        });

        let scheduler = Arc::clone(&self.scheduler);
        group.spawn_periodic("energy_monitor", intervals.energy_interval(), move || {
            scheduler.energy_tick();
        });

        let scheduler = Arc::clone(&self.scheduler);
        group.spawn_periodic("security_monitor", intervals.security_interval(), move || {
            scheduler.security_tick();
        });

        let scheduler = Arc::clone(&self.scheduler);
        group.spawn_periodic("health_monitor", intervals.health_interval(), move || {
            scheduler.health_tick();
        });

        info!(workers = group.len(), "Smart home simulation started");
        group
    }

    pub fn config(&self) -> &HomeConfig {
        &self.config
    }

    /// Shared world state
    pub fn store(&self) -> &Arc<WorldStore> {
        &self.store
    }

    pub fn weather(&self) -> &Arc<WeatherSimulator> {
        &self.weather
    }

    pub fn devices(&self) -> &Arc<DeviceSimulator> {
        &self.devices
    }

    pub fn scheduler(&self) -> &Arc<SchedulingEngine> {
        &self.scheduler
    }

    /// Change events for every later mutation
    pub fn subscribe(&self) -> Subscription {
        self.store.subscribe()
    }

    /// Arm with the currently online sensors
    pub fn arm_security(&self) -> SecuritySystem {
        security::arm(&self.store)
    }

    /// Disarm and clear the sensor snapshot
    pub fn disarm_security(&self) -> SecuritySystem {
        security::disarm(&self.store)
    }

    pub fn analytics(&self) -> AnalyticsSummary {
        analytics::summary(&self.store)
    }

    pub fn health(&self) -> HealthSummary {
        analytics::health(&self.store)
    }
}

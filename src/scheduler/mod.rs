// Scheduling engine: task runner, monitors and automation scenarios

mod monitors;
mod scenario;
mod tasks;

pub use monitors::{EnergyTick, SecurityTick};
pub use scenario::{AutomationScenario, FaultReport, FaultScenario, ScenarioReport, SURGE_FACTOR};

use crate::config::SimulationConfig;
use crate::device::DeviceSimulator;
use crate::error::{HubError, HubResult};
use crate::model::{Schedule, ScheduledTask, TaskAction, TaskUpdate};
use crate::store::WorldStore;
use chrono::Utc;
use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

const SOURCE: &str = "scheduler";

/// Owns task execution, the periodic monitors and automation scenarios
pub struct SchedulingEngine {
    store: Arc<WorldStore>,
    devices: Arc<DeviceSimulator>,
    security_timeout: chrono::Duration,
    energy_alert_threshold: f64,
    /// Tasks already warned about for being skipped; later skips log at debug
    skipped: Mutex<HashSet<String>>,
}

impl SchedulingEngine {
    /// Engine over a shared store and device simulator
    pub fn new(store: Arc<WorldStore>, devices: Arc<DeviceSimulator>, config: &SimulationConfig) -> Self {
        Self {
            store,
            devices,
            security_timeout: config.security_timeout(),
            energy_alert_threshold: config.energy_alert_threshold_kwh,
            skipped: Mutex::new(HashSet::new()),
        }
    }

    /// Validate and register a task; it always starts enabled
    pub fn add_task(&self, mut task: ScheduledTask) -> HubResult<ScheduledTask> {
        task.action
            .parse::<TaskAction>()
            .map_err(|_| HubError::UnknownAction(task.action.clone()))?;
        task.schedule
            .parse::<Schedule>()
            .map_err(|_| HubError::UnknownSchedule(task.schedule.clone()))?;

        if task.id.is_empty() {
            task.id = format!("task_{}", Uuid::now_v7().simple());
        }
        if task.next_run.is_none() {
            task.next_run = Some(Schedule::next_run(&task.schedule, Utc::now()));
        }
        task.enabled = true;

        let task = self.store.add_task(task)?;
        info!(task_id = %task.id, action = %task.action, schedule = %task.schedule, "Task added");
        Ok(task)
    }

    pub fn get_task(&self, id: &str) -> HubResult<ScheduledTask> {
        self.store.get_task(id)
    }

    pub fn list_tasks(&self) -> Vec<ScheduledTask> {
        self.store.list_tasks()
    }

    /// Toggle `enabled` or move run times without touching the rest
    pub fn update_task(&self, id: &str, update: TaskUpdate) -> HubResult<ScheduledTask> {
        self.store.update_task(id, update)
    }

    /// Run a task now regardless of its schedule
    pub fn trigger_task(&self, id: &str) -> HubResult<ScheduledTask> {
        let task = self.store.get_task(id)?;
        self.execute(&task)
    }

    /// Apply a named scenario as one atomic batch
    pub fn trigger_automation_scenario(&self, name: &str) -> HubResult<ScenarioReport> {
        let scenario = name
            .parse::<AutomationScenario>()
            .map_err(|_| HubError::UnknownScenario(name.to_string()))?;
        let report = self.store.apply_batch(|batch| scenario.apply(batch, Utc::now()));
        info!(
            scenario = %scenario,
            devices_updated = report.devices_updated,
            "Automation scenario applied"
        );
        Ok(report)
    }

    /// Inject a named fault: `device_failure` or `power_surge`
    pub fn trigger_fault_scenario(&self, name: &str) -> HubResult<FaultReport> {
        let scenario = name
            .parse::<FaultScenario>()
            .map_err(|_| HubError::UnknownScenario(name.to_string()))?;

        let report = match scenario {
            FaultScenario::DeviceFailure => FaultReport {
                scenario,
                failed_device: self.store.apply_batch(scenario::fail_first_device),
                surge_records: 0,
            },
            FaultScenario::PowerSurge => {
                let records = self.devices.calculate_energy_usage();
                let count = records.len();
                for mut record in records {
                    record.usage_kwh *= SURGE_FACTOR;
                    record.cost_usd *= SURGE_FACTOR;
                    self.store.add_energy_usage(record);
                }
                FaultReport {
                    scenario,
                    failed_device: None,
                    surge_records: count,
                }
            }
        };

        warn!(
            scenario = %scenario,
            failed_device = ?report.failed_device,
            surge_records = report.surge_records,
            "Fault scenario injected"
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests;

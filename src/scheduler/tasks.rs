use super::{SchedulingEngine, SOURCE};
use crate::error::{HubError, HubResult};
use crate::model::{
    attrs, kinds, Attributes, Schedule, ScheduledTask, SystemEvent, TaskAction, TaskUpdate,
};
use crate::security;
use chrono::Utc;
use serde_json::{json, Value};
use tracing::{debug, info, warn};

impl SchedulingEngine {
    /// Execute every enabled task that is due; returns how many ran
    ///
    /// A task that cannot run stays due and is retried every tick. Only its
    /// first skip is logged at warn level, until it runs again.
    pub fn process_tasks(&self) -> usize {
        let now = Utc::now();
        let mut executed = 0;

        for task in self.store.list_tasks() {
            if !task.is_due(now) {
                continue;
            }
            match self.execute(&task) {
                Ok(_) => executed += 1,
                Err(e) => {
                    if self.note_skip(&task.id) {
                        warn!(task_id = %task.id, error = %e, "Task skipped");
                    } else {
                        debug!(task_id = %task.id, error = %e, "Task still skipped");
                    }
                }
            }
        }

        if executed > 0 {
            debug!(executed, "Task runner tick complete");
        }
        executed
    }

    /// Record a skip; true the first time `task_id` is skipped in a row
    pub(super) fn note_skip(&self, task_id: &str) -> bool {
        self.skipped.lock().insert(task_id.to_string())
    }

    /// Dispatch one task, reschedule it and log the execution
    pub(super) fn execute(&self, task: &ScheduledTask) -> HubResult<ScheduledTask> {
        let action = task
            .action
            .parse::<TaskAction>()
            .map_err(|_| HubError::UnknownAction(task.action.clone()))?;

        if action.targets_device() {
            self.store.get_device(&task.device_id)?;
        }

        match action {
            TaskAction::ArmSecurity => {
                security::arm(&self.store);
            }
            TaskAction::DisarmSecurity => {
                security::disarm(&self.store);
            }
            _ => match device_updates(action, &task.parameters) {
                Some(updates) => {
                    self.devices.update_device(&task.device_id, updates)?;
                }
                None => warn!(
                    task_id = %task.id,
                    action = %action,
                    "Task parameter missing or not a number; device left unchanged"
                ),
            },
        }

        let now = Utc::now();
        let updated = self.store.update_task(
            &task.id,
            TaskUpdate {
                enabled: None,
                last_run: Some(now),
                next_run: Some(Schedule::next_run(&task.schedule, now)),
            },
        )?;

        self.store.add_system_event(
            SystemEvent::new(
                kinds::TASK_EXECUTED,
                SOURCE,
                format!("Task {} executed successfully", task.name),
            )
            .with_data(attrs([
                ("task_id", json!(task.id)),
                ("device_id", json!(task.device_id)),
                ("action", json!(task.action)),
            ])),
        );
        self.skipped.lock().remove(&task.id);
        info!(task_id = %task.id, action = %action, "Task executed");
        Ok(updated)
    }
}

/// Property changes for a device-targeting action
///
/// Numeric parameters are clamped into the property's valid range.
fn device_updates(action: TaskAction, parameters: &Attributes) -> Option<Attributes> {
    let number = |key: &str| parameters.get(key).and_then(Value::as_f64);

    let updates = match action {
        TaskAction::TurnOn => attrs([("power", json!(true))]),
        TaskAction::TurnOff => attrs([("power", json!(false))]),
        TaskAction::Lock => attrs([("locked", json!(true))]),
        TaskAction::Unlock => attrs([("locked", json!(false))]),
        TaskAction::SetTemperature => {
            let temp = number("temperature")?.clamp(10.0, 35.0);
            attrs([("target_temp", json!(temp))])
        }
        TaskAction::SetBrightness => {
            let brightness = number("brightness")?.round().clamp(0.0, 100.0) as i64;
            attrs([("brightness", json!(brightness))])
        }
        TaskAction::ArmSecurity | TaskAction::DisarmSecurity => return None,
    };
    Some(updates)
}

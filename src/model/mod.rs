// World data model: devices, weather, security, tasks, log records

mod device;
mod event;
mod security;
mod task;
mod weather;

pub use device::{attrs, Attributes, Device, DeviceStatus, DeviceType};
pub(crate) use device::value_as_int;
pub use event::{kinds, EnergyUsageRecord, Severity, SystemEvent};
pub use security::{SecurityState, SecuritySystem};
pub use task::{Schedule, ScheduledTask, TaskAction, TaskUpdate};
pub use weather::{WeatherCondition, WeatherSnapshot, WindDirection};

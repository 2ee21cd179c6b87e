// Security state machine
//
// Disarmed -> Armed (arm), Armed -> Triggered (sensor motion),
// Triggered -> Armed (timeout), any -> Disarmed (disarm).

use crate::model::{Device, DeviceType, SecurityState, SecuritySystem};
use crate::store::WorldStore;
use chrono::{DateTime, Duration, Utc};
use tracing::info;

/// Arm and snapshot the ids of every Online sensor; valid from any state
pub fn armed<'a>(
    current: &SecuritySystem,
    devices: impl IntoIterator<Item = &'a Device>,
    now: DateTime<Utc>,
) -> SecuritySystem {
    SecuritySystem {
        state: SecurityState::Armed,
        last_armed: Some(now),
        active_sensors: devices
            .into_iter()
            .filter(|d| d.device_type == DeviceType::Sensor && d.is_online())
            .map(|d| d.id.clone())
            .collect(),
        triggered_by: None,
        ..current.clone()
    }
}

/// Disarm from any state; active sensors are cleared
pub fn disarmed(current: &SecuritySystem) -> SecuritySystem {
    SecuritySystem {
        state: SecurityState::Disarmed,
        active_sensors: Default::default(),
        triggered_by: None,
        ..current.clone()
    }
}

/// Motion on `sensor_id`; any sensor trips an armed system
///
/// `active_sensors` is the snapshot taken when arming and does not gate
/// triggering, so sensors added after arming still raise the alarm.
pub fn on_motion(
    current: &SecuritySystem,
    sensor_id: &str,
    now: DateTime<Utc>,
) -> Option<SecuritySystem> {
    if !current.is_armed() {
        return None;
    }
    Some(triggered(current, sensor_id, now))
}

/// Unconditional trigger (security breach scenario)
pub fn triggered(current: &SecuritySystem, source: &str, now: DateTime<Utc>) -> SecuritySystem {
    SecuritySystem {
        state: SecurityState::Triggered,
        last_triggered: Some(now),
        triggered_by: Some(source.to_string()),
        ..current.clone()
    }
}

/// Triggered for at least `timeout` re-arms; sensors stay as snapshotted
pub fn on_timeout(
    current: &SecuritySystem,
    now: DateTime<Utc>,
    timeout: Duration,
) -> Option<SecuritySystem> {
    if current.state != SecurityState::Triggered {
        return None;
    }
    let since = current.last_triggered?;
    if now - since < timeout {
        return None;
    }
    Some(SecuritySystem {
        state: SecurityState::Armed,
        triggered_by: None,
        ..current.clone()
    })
}

/// Arm the house security system
pub fn arm(store: &WorldStore) -> SecuritySystem {
    let now = Utc::now();
    let sys = store
        .transition_security(|current, devices| Some(armed(current, devices.values(), now)))
        .unwrap_or_default();
    info!(sensors = sys.active_sensors.len(), "Security armed");
    sys
}

/// Disarm the house security system
pub fn disarm(store: &WorldStore) -> SecuritySystem {
    let sys = store
        .transition_security(|current, _| Some(disarmed(current)))
        .unwrap_or_default();
    info!("Security disarmed");
    sys
}

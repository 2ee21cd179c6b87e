use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};

#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum WeatherCondition {
    Clear,
    PartlyCloudy,
    Sunny,
    Cloudy,
    Overcast,
    Rainy,
    Stormy,
    Foggy,
}

/// 8-point compass plus `Calm` (fog scenario only)
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, AsRefStr,
)]
pub enum WindDirection {
    N,
    NE,
    E,
    SE,
    S,
    SW,
    W,
    NW,
    Calm,
}

impl WindDirection {
    pub const COMPASS: [WindDirection; 8] = [
        WindDirection::N,
        WindDirection::NE,
        WindDirection::E,
        WindDirection::SE,
        WindDirection::S,
        WindDirection::SW,
        WindDirection::W,
        WindDirection::NW,
    ];

    /// Position on the compass cycle; `Calm` maps to north
    pub fn index(self) -> usize {
        Self::COMPASS.iter().position(|d| *d == self).unwrap_or(0)
    }

    /// Move `delta` points around the compass (wraps)
    pub fn step(self, delta: i32) -> Self {
        let len = Self::COMPASS.len() as i32;
        let idx = (self.index() as i32 + delta).rem_euclid(len);
        Self::COMPASS[idx as usize]
    }
}

/// The single live weather reading
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WeatherSnapshot {
    /// Degrees Celsius
    pub temperature: f64,
    /// Percent, walked within [30, 90]
    pub humidity: f64,
    /// hPa, walked within [980, 1040]
    pub pressure: f64,
    pub condition: WeatherCondition,
    /// km/h, walked within [0, 30]
    pub wind_speed: f64,
    pub wind_direction: WindDirection,
    pub timestamp: DateTime<Utc>,
}

impl Default for WeatherSnapshot {
    fn default() -> Self {
        Self {
            temperature: 20.0,
            humidity: 60.0,
            pressure: 1013.25,
            condition: WeatherCondition::Clear,
            wind_speed: 5.0,
            wind_direction: WindDirection::N,
            timestamp: Utc::now(),
        }
    }
}

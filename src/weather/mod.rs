// Weather simulation: random walk over a seasonal/diurnal base curve

use crate::error::{HubError, HubResult};
use crate::model::{WeatherCondition, WeatherSnapshot, WindDirection};
use crate::rng::sim_rng;
use crate::store::WorldStore;
use chrono::{DateTime, Datelike, Duration, TimeZone, Timelike, Utc};
use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::Rng;
use serde::Serialize;
use std::f64::consts::PI;
use std::sync::Arc;
use strum::{AsRefStr, Display, EnumString};
use tracing::{debug, info};

pub const MAX_FORECAST_DAYS: usize = 30;
pub const MAX_HISTORY_HOURS: usize = 720;

const RNG_STREAM: u64 = 1;

/// Seasonal plus diurnal base temperature (°C)
pub fn base_temperature(at: DateTime<Utc>) -> f64 {
    let day_of_year = at.ordinal() as f64;
    let hour = at.hour() as f64;
    let seasonal = 10.0 * (2.0 * PI * day_of_year / 365.0).sin();
    let diurnal = 5.0 * (2.0 * PI * (hour - 6.0) / 24.0).sin();
    18.0 + seasonal + diurnal
}

/// Condition band for a pressure/humidity pair, picked uniformly within the band
pub fn condition_for(pressure: f64, humidity: f64, rng: &mut impl Rng) -> WeatherCondition {
    use WeatherCondition::*;

    let band: &[WeatherCondition] = if pressure < 1000.0 && humidity > 80.0 {
        &[Rainy, Stormy, Cloudy]
    } else if pressure < 1010.0 {
        &[Cloudy, PartlyCloudy, Overcast]
    } else if humidity < 40.0 {
        &[Clear]
    } else {
        &[Clear, PartlyCloudy, Sunny]
    };
    *band.choose(rng).unwrap_or(&Clear)
}

fn wind_step(from: WindDirection, rng: &mut impl Rng) -> WindDirection {
    from.step(rng.gen_range(-1..=1))
}

/// One random-walk step from `prev`
pub fn next_snapshot(prev: &WeatherSnapshot, now: DateTime<Utc>, rng: &mut impl Rng) -> WeatherSnapshot {
    let temperature = base_temperature(now) + (rng.gen::<f64>() - 0.5) * 4.0;
    let humidity = (prev.humidity + (rng.gen::<f64>() - 0.5) * 10.0).clamp(30.0, 90.0);
    let pressure = (prev.pressure + (rng.gen::<f64>() - 0.5) * 20.0).clamp(980.0, 1040.0);
    let wind_speed = (prev.wind_speed + (rng.gen::<f64>() - 0.5) * 5.0).clamp(0.0, 30.0);

    WeatherSnapshot {
        temperature,
        humidity,
        pressure,
        condition: condition_for(pressure, humidity, rng),
        wind_speed,
        wind_direction: wind_step(prev.wind_direction, rng),
        timestamp: now,
    }
}

/// Named weather presets
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Display, EnumString, AsRefStr)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum WeatherScenario {
    Storm,
    Heatwave,
    ColdSnap,
    Rain,
    Fog,
    /// Mild clear day; also used for unrecognized names
    Default,
}

impl WeatherScenario {
    /// Scenario for `name`, falling back to `Default`
    pub fn from_name(name: &str) -> Self {
        name.parse().unwrap_or(WeatherScenario::Default)
    }

    fn generate(self, now: DateTime<Utc>, rng: &mut impl Rng) -> WeatherSnapshot {
        use WeatherCondition as C;
        use WindDirection as W;

        // (temperature, humidity, pressure, wind) as (base, spread) pairs
        let (t, h, p, w, condition, direction) = match self {
            WeatherScenario::Storm => ((15.0, 5.0), (85.0, 10.0), (980.0, 20.0), (20.0, 10.0), C::Stormy, W::SW),
            WeatherScenario::Heatwave => ((35.0, 10.0), (20.0, 15.0), (1020.0, 10.0), (2.0, 5.0), C::Clear, W::S),
            WeatherScenario::ColdSnap => ((-5.0, 10.0), (40.0, 20.0), (1030.0, 10.0), (15.0, 10.0), C::Clear, W::N),
            WeatherScenario::Rain => ((12.0, 8.0), (80.0, 15.0), (995.0, 15.0), (8.0, 7.0), C::Rainy, W::W),
            WeatherScenario::Fog => ((8.0, 5.0), (95.0, 5.0), (1015.0, 5.0), (1.0, 2.0), C::Foggy, W::Calm),
            WeatherScenario::Default => ((20.0, 10.0), (50.0, 20.0), (1013.0, 10.0), (5.0, 5.0), C::Clear, W::N),
        };
        let mut draw = |(base, spread): (f64, f64)| base + rng.gen::<f64>() * spread;

        WeatherSnapshot {
            temperature: draw(t),
            humidity: draw(h),
            pressure: draw(p),
            condition,
            wind_speed: draw(w),
            wind_direction: direction,
            timestamp: now,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Display, AsRefStr)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum WeatherAlert {
    ExtremeHeat,
    Freezing,
    HighWind,
    Storm,
    LowPressure,
}

impl WeatherAlert {
    pub fn message(self) -> &'static str {
        match self {
            WeatherAlert::ExtremeHeat => "Extreme heat warning - Temperature above 35°C",
            WeatherAlert::Freezing => "Freezing temperature alert - Temperature below 0°C",
            WeatherAlert::HighWind => "High wind warning - Wind speed above 20 km/h",
            WeatherAlert::Storm => "Storm warning - Severe weather conditions",
            WeatherAlert::LowPressure => "Low pressure system - Potential weather instability",
        }
    }
}

/// Highest-priority alert for `weather`, if any holds
pub fn weather_alert(weather: &WeatherSnapshot) -> Option<WeatherAlert> {
    if weather.temperature > 35.0 {
        Some(WeatherAlert::ExtremeHeat)
    } else if weather.temperature < 0.0 {
        Some(WeatherAlert::Freezing)
    } else if weather.wind_speed > 20.0 {
        Some(WeatherAlert::HighWind)
    } else if weather.condition == WeatherCondition::Stormy {
        Some(WeatherAlert::Storm)
    } else if weather.pressure < 990.0 {
        Some(WeatherAlert::LowPressure)
    } else {
        None
    }
}

/// Drives the live weather snapshot held by the world store
pub struct WeatherSimulator {
    store: Arc<WorldStore>,
    rng: Mutex<StdRng>,
}

impl WeatherSimulator {
    pub fn new(store: Arc<WorldStore>, seed: Option<u64>) -> Self {
        Self {
            store,
            rng: Mutex::new(sim_rng(seed, RNG_STREAM)),
        }
    }

    /// Advance the live snapshot one step and persist it
    pub fn tick(&self) -> WeatherSnapshot {
        let now = Utc::now();
        let next = self
            .store
            .update_weather_with(|prev| next_snapshot(prev, now, &mut *self.rng.lock()));
        debug!(
            temperature = next.temperature,
            condition = %next.condition,
            "Weather updated"
        );
        next
    }

    pub fn current(&self) -> WeatherSnapshot {
        self.store.get_weather()
    }

    /// Replace the live snapshot with caller-provided values
    pub fn set_weather(&self, mut weather: WeatherSnapshot) -> WeatherSnapshot {
        weather.timestamp = Utc::now();
        self.store.update_weather(weather.clone());
        weather
    }

    /// Overwrite the live snapshot with a preset; unknown names use the default preset
    pub fn simulate_scenario(&self, name: &str) -> WeatherSnapshot {
        let scenario = WeatherScenario::from_name(name);
        let weather = scenario.generate(Utc::now(), &mut *self.rng.lock());
        self.store.update_weather(weather.clone());
        info!(scenario = %scenario, requested = name, "Weather scenario applied");
        weather
    }

    /// Synthetic daily forecast starting tomorrow; not persisted
    pub fn forecast(&self, days: usize) -> HubResult<Vec<WeatherSnapshot>> {
        if days > MAX_FORECAST_DAYS {
            return Err(HubError::validation(format!(
                "forecast days must be at most {}, got {}",
                MAX_FORECAST_DAYS, days
            )));
        }
        let live = self.store.get_weather().wind_direction;
        let now = Utc::now();
        let mut rng = self.rng.lock();

        Ok((0..days)
            .map(|i| {
                let day = now + Duration::days(i as i64 + 1);
                let noon = Utc
                    .with_ymd_and_hms(day.year(), day.month(), day.day(), 12, 0, 0)
                    .single()
                    .unwrap_or(day);
                let humidity = 40.0 + rng.gen::<f64>() * 40.0;
                let pressure = 1000.0 + rng.gen::<f64>() * 30.0;
                WeatherSnapshot {
                    temperature: base_temperature(noon) + (rng.gen::<f64>() - 0.5) * 8.0,
                    humidity,
                    pressure,
                    condition: condition_for(pressure, humidity, &mut *rng),
                    wind_speed: rng.gen::<f64>() * 20.0,
                    wind_direction: wind_step(live, &mut *rng),
                    timestamp: day,
                }
            })
            .collect())
    }

    /// Synthetic hourly history ending one hour ago; not persisted
    pub fn history(&self, hours: usize) -> HubResult<Vec<WeatherSnapshot>> {
        if hours > MAX_HISTORY_HOURS {
            return Err(HubError::validation(format!(
                "history hours must be at most {}, got {}",
                MAX_HISTORY_HOURS, hours
            )));
        }
        let live = self.store.get_weather().wind_direction;
        let now = Utc::now();
        let mut rng = self.rng.lock();

        Ok((0..hours)
            .map(|i| {
                let at = now - Duration::hours((hours - i) as i64);
                let humidity = 45.0 + rng.gen::<f64>() * 35.0;
                let pressure = 1005.0 + rng.gen::<f64>() * 25.0;
                WeatherSnapshot {
                    temperature: base_temperature(at) + (rng.gen::<f64>() - 0.5) * 6.0,
                    humidity,
                    pressure,
                    condition: condition_for(pressure, humidity, &mut *rng),
                    wind_speed: rng.gen::<f64>() * 15.0,
                    wind_direction: wind_step(live, &mut *rng),
                    timestamp: at,
                }
            })
            .collect())
    }

    pub fn alert(&self) -> Option<WeatherAlert> {
        weather_alert(&self.store.get_weather())
    }

    pub fn is_extreme(&self) -> bool {
        self.alert().is_some()
    }
}

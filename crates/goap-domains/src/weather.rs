//! Tick-driven daily weather state, consulted by the resource domains'
//! season/weather/depth catch filtering (spec §4.5).

use goap_types::WorldTime;
use parking_lot::Mutex;
use rand::Rng;
use rand_chacha::ChaCha8Rng;
use rand_chacha::rand_core::SeedableRng;
use serde::{Deserialize, Serialize};

/// The day's weather condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WeatherKind {
    /// No precipitation.
    Clear,
    /// Light precipitation.
    Rain,
    /// Heavy precipitation; typically closes shallow-water activity.
    Storm,
    /// Winter precipitation.
    Snow,
}

/// One season's weather-kind weights.
#[derive(Debug, Clone)]
pub struct SeasonWeatherWeights {
    /// Relative weight of [`WeatherKind::Clear`].
    pub clear: f64,
    /// Relative weight of [`WeatherKind::Rain`].
    pub rain: f64,
    /// Relative weight of [`WeatherKind::Storm`].
    pub storm: f64,
    /// Relative weight of [`WeatherKind::Snow`].
    pub snow: f64,
}

impl SeasonWeatherWeights {
    fn weighted_pairs(&self) -> [(WeatherKind, f64); 4] {
        [
            (WeatherKind::Clear, self.clear.max(0.0)),
            (WeatherKind::Rain, self.rain.max(0.0)),
            (WeatherKind::Storm, self.storm.max(0.0)),
            (WeatherKind::Snow, self.snow.max(0.0)),
        ]
    }
}

/// Per-season weather weight table, indexed by `WorldTime::season_index`.
#[derive(Debug, Clone)]
pub struct WeatherConfig {
    /// One weight table per season, in season-index order.
    pub seasons: Vec<SeasonWeatherWeights>,
}

struct Inner {
    current: WeatherKind,
    last_rolled_day: Option<u64>,
    rng: ChaCha8Rng,
}

/// The persisted shape of [`WeatherSystem`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeatherState {
    /// The current day's weather.
    pub current: WeatherKind,
    /// The simulated day this weather was last rolled for.
    pub last_rolled_day: Option<u64>,
    /// The system's private RNG state.
    pub rng: ChaCha8Rng,
}

/// Rolls and tracks one weather condition per simulated day.
pub struct WeatherSystem {
    config: WeatherConfig,
    gate: Mutex<Inner>,
}

impl WeatherSystem {
    /// Build a system seeded deterministically from `seed`.
    #[must_use]
    pub fn new(config: WeatherConfig, seed: u64) -> Self {
        Self {
            config,
            gate: Mutex::new(Inner {
                current: WeatherKind::Clear,
                last_rolled_day: None,
                rng: ChaCha8Rng::seed_from_u64(seed),
            }),
        }
    }

    /// The current day's weather condition.
    #[must_use]
    pub fn current(&self) -> WeatherKind {
        self.gate.lock().current
    }

    /// Roll a new weather condition if the simulated day has advanced
    /// since the last roll.
    pub fn tick(&self, world_time: &WorldTime) {
        let mut inner = self.gate.lock();
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let current_day = world_time.total_world_days.max(0.0) as u64;
        if inner.last_rolled_day == Some(current_day) {
            return;
        }
        inner.last_rolled_day = Some(current_day);

        let season_index = world_time.season_index as usize;
        let Some(weights) = self.config.seasons.get(season_index) else {
            return;
        };
        let pairs = weights.weighted_pairs();
        let total: f64 = pairs.iter().map(|(_, w)| w).sum();
        if total <= 0.0 {
            inner.current = WeatherKind::Clear;
            return;
        }
        let mut roll = inner.rng.random_range(0.0..total);
        let mut chosen = WeatherKind::Clear;
        for (kind, weight) in pairs {
            roll -= weight;
            if roll <= 0.0 {
                chosen = kind;
                break;
            }
        }
        inner.current = chosen;
    }

    /// Snapshot this system's state, for persistence.
    #[must_use]
    pub fn capture_state(&self) -> WeatherState {
        let inner = self.gate.lock();
        WeatherState {
            current: inner.current,
            last_rolled_day: inner.last_rolled_day,
            rng: inner.rng.clone(),
        }
    }

    /// Restore this system from a previously captured snapshot.
    pub fn apply_state(&self, state: WeatherState) {
        let mut inner = self.gate.lock();
        inner.current = state.current;
        inner.last_rolled_day = state.last_rolled_day;
        inner.rng = state.rng;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn time(day: f64, season: u32) -> WorldTime {
        WorldTime {
            total_world_seconds: day * 86_400.0,
            total_world_days: day,
            time_scale: 1.0,
            seconds_per_day: 86_400.0,
            time_of_day: 0.0,
            day_of_year: 1,
            day_of_month: 1,
            month: 1,
            season_index: season,
            season_name: "Spring".into(),
            year: 1,
            days_per_month: 28,
            season_length_days: 28,
            days_per_year: 112,
        }
    }

    fn config() -> WeatherConfig {
        WeatherConfig {
            seasons: vec![SeasonWeatherWeights { clear: 1.0, rain: 0.0, storm: 0.0, snow: 0.0 }],
        }
    }

    #[test]
    fn tick_rolls_exactly_once_per_day() {
        let system = WeatherSystem::new(config(), 1);
        system.tick(&time(0.0, 0));
        let first = system.current();
        system.tick(&time(0.3, 0));
        assert_eq!(system.current(), first);
    }

    #[test]
    fn all_clear_weights_always_yield_clear() {
        let system = WeatherSystem::new(config(), 2);
        system.tick(&time(0.0, 0));
        assert_eq!(system.current(), WeatherKind::Clear);
    }

    #[test]
    fn capture_and_apply_state_round_trips() {
        let system = WeatherSystem::new(config(), 5);
        system.tick(&time(0.0, 0));
        let state = system.capture_state();
        let restored = WeatherSystem::new(config(), 99);
        restored.apply_state(state);
        assert_eq!(restored.current(), system.current());
    }
}

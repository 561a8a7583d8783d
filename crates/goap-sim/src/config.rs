//! Typed configuration, loaded from a YAML file (plus `GOAP_SIM__`-prefixed
//! environment overrides) via the `config` crate.

use std::collections::BTreeMap;

use goap_domains::{CalendarEventDef, GiftAffinityTable, QuestDef, ShopListing};
use goap_domains::{CatchDef, ResourceDomainConfig, SeasonWeatherWeights, WeatherConfig};
use serde::Deserialize;

/// Top-level simulation configuration. Every section has a default, so an
/// absent or partial config file is never an error.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SimConfig {
    /// World grid and clock settings.
    #[serde(default)]
    pub world: WorldConfig,
    /// Which actors to run, and their loop tuning.
    #[serde(default)]
    pub actors: ActorsConfig,
    /// Log file locations and rotation size.
    #[serde(default)]
    pub logging: LoggingConfig,
    /// Save/load archive paths.
    #[serde(default)]
    pub persistence: PersistenceConfig,
    /// Bounds on how long the simulation runs before exiting cleanly.
    #[serde(default)]
    pub simulation: SimulationBoundsConfig,
    /// Which domain systems to attach, and their seed content.
    #[serde(default)]
    pub domains: DomainsConfig,
}

impl SimConfig {
    /// Load from `path` if it exists, falling back to defaults otherwise,
    /// then apply any `GOAP_SIM__section__field`-style environment
    /// overrides.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but isn't valid YAML, or an
    /// override's value doesn't match its field's type.
    pub fn load(path: &str) -> Result<Self, config::ConfigError> {
        config::Config::builder()
            .add_source(config::File::with_name(path).required(false))
            .add_source(config::Environment::with_prefix("GOAP_SIM").separator("__"))
            .build()?
            .try_deserialize()
    }
}

/// World grid dimensions and the simulated clock's pace.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct WorldConfig {
    /// Grid width in cells.
    pub width: i32,
    /// Grid height in cells.
    pub height: i32,
    /// Entity-shard count for the world store.
    pub shard_count: usize,
    /// Simulated seconds advanced per real second.
    pub time_scale: f64,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self { width: 64, height: 64, shard_count: 4, time_scale: 60.0 }
    }
}

/// Which actors the simulation runs, and their loop tuning.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ActorsConfig {
    /// Entity ids to spin up an `ActorHost` for. Each must already exist
    /// (or be spawned) in the world.
    pub ids: Vec<String>,
    /// Loop throttle, in Hz, shared by every configured actor.
    #[serde(default = "default_loop_frequency_hz")]
    pub loop_frequency_hz: f64,
    /// Base seed for each actor's private jitter/backoff RNG; actor `i`
    /// gets `rng_seed_base + i`.
    #[serde(default = "default_rng_seed_base")]
    pub rng_seed_base: u64,
}

fn default_loop_frequency_hz() -> f64 {
    10.0
}

fn default_rng_seed_base() -> u64 {
    1
}

/// Log file locations and rotation size.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Directory world and per-actor logs are written under.
    pub log_dir: String,
    /// Rotation threshold, in bytes, for both world and per-actor logs.
    pub max_bytes: u64,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { log_dir: "logs".to_owned(), max_bytes: 10_000_000 }
    }
}

/// Save/load archive paths. Both absent means "start fresh, don't save".
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PersistenceConfig {
    /// Archive to load from at startup, if present on disk.
    pub load_path: Option<String>,
    /// Archive to write at a clean shutdown.
    pub save_path: Option<String>,
}

/// Bounds on how long the simulation runs before requesting a clean
/// shutdown. Mirrors the shape (if not the exact fields) of the teacher's
/// operator-bounds config.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SimulationBoundsConfig {
    /// Stop after this many real seconds. `None` runs until killed.
    pub max_real_time_seconds: Option<f64>,
}

/// Which domain systems to attach, and their seed content.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct DomainsConfig {
    /// Attach the inventory ledger.
    pub inventory: bool,
    /// Attach the currency ledger.
    pub currency: bool,
    /// Attach the shop system, seeded with these listings by shop id.
    pub shops: BTreeMap<String, ShopListing>,
    /// Attach the social system, seeded with this gift-affinity table.
    /// Absent means the social system isn't attached at all.
    pub social: Option<GiftAffinityTable>,
    /// Attach the skill ledger.
    pub skills: bool,
    /// Attach the quest system, seeded with these quest definitions.
    pub quests: BTreeMap<String, QuestDef>,
    /// Attach the calendar system, seeded with these recurring events.
    pub calendar: Vec<CalendarEventDef>,
    /// Attach the weather system with this season weight table. Absent
    /// means no weather system.
    pub weather: Option<WeatherDomainConfig>,
    /// Attach the crop resource domain.
    pub crops: Option<ResourceDomainConfigFile>,
    /// Attach the animal resource domain.
    pub animals: Option<ResourceDomainConfigFile>,
    /// Attach the mining resource domain.
    pub mining: Option<ResourceDomainConfigFile>,
    /// Attach the fishing resource domain.
    pub fishing: Option<ResourceDomainConfigFile>,
    /// Attach the foraging resource domain.
    pub foraging: Option<ResourceDomainConfigFile>,
}

/// Mirrors [`ResourceDomainConfig`], which doesn't derive `Deserialize`
/// itself (it's built programmatically elsewhere too, e.g. in tests).
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ResourceDomainConfigFile {
    /// Catch table for this domain's nodes.
    pub catches: Vec<CatchDef>,
    /// Attempts granted per activation.
    pub attempts_per_activation: u32,
    /// Hours until a depleted node reactivates.
    pub respawn_hours: f64,
    /// Upper bound on simultaneously active nodes.
    pub max_active_nodes: usize,
}

impl Default for ResourceDomainConfigFile {
    fn default() -> Self {
        Self { catches: Vec::new(), attempts_per_activation: 1, respawn_hours: 24.0, max_active_nodes: 8 }
    }
}

impl From<ResourceDomainConfigFile> for ResourceDomainConfig {
    fn from(file: ResourceDomainConfigFile) -> Self {
        Self {
            catches: file.catches,
            attempts_per_activation: file.attempts_per_activation,
            respawn_hours: file.respawn_hours,
            max_active_nodes: file.max_active_nodes,
        }
    }
}

/// Mirrors [`SeasonWeatherWeights`], which doesn't derive `Deserialize`.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SeasonWeatherWeightsFile {
    /// Relative weight of clear weather.
    pub clear: f64,
    /// Relative weight of rain.
    pub rain: f64,
    /// Relative weight of storms.
    pub storm: f64,
    /// Relative weight of snow.
    pub snow: f64,
}

impl Default for SeasonWeatherWeightsFile {
    fn default() -> Self {
        Self { clear: 1.0, rain: 0.0, storm: 0.0, snow: 0.0 }
    }
}

impl From<SeasonWeatherWeightsFile> for SeasonWeatherWeights {
    fn from(file: SeasonWeatherWeightsFile) -> Self {
        Self { clear: file.clear, rain: file.rain, storm: file.storm, snow: file.snow }
    }
}

/// Mirrors [`WeatherConfig`], which doesn't derive `Deserialize`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct WeatherDomainConfig {
    /// One weight table per season, in season-index order.
    pub seasons: Vec<SeasonWeatherWeightsFile>,
}

impl From<WeatherDomainConfig> for WeatherConfig {
    fn from(file: WeatherDomainConfig) -> Self {
        Self { seasons: file.seasons.into_iter().map(SeasonWeatherWeights::from).collect() }
    }
}

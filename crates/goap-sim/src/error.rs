//! Errors surfaced while bootstrapping or running a simulation.

/// Top-level bootstrap/run error.
#[derive(Debug, thiserror::Error)]
pub enum SimError {
    /// The configuration file could not be loaded or didn't match
    /// [`crate::config::SimConfig`]'s shape.
    #[error("configuration error: {0}")]
    Config(#[from] config::ConfigError),
    /// The world store failed to initialize.
    #[error("world store error: {0}")]
    Store(#[from] goap_store::WorldStoreError),
    /// A per-actor or world log file failed to open.
    #[error("logging error: {0}")]
    Logging(#[from] goap_logging::LoggingError),
    /// An actor host's background thread panicked.
    #[error("actor error: {0}")]
    Actor(#[from] goap_actor::ActorError),
    /// A save archive failed to read or write.
    #[error("persistence error: {0}")]
    Persistence(#[from] goap_persistence::PersistenceError),
}

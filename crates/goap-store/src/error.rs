//! Error types for the world store.

/// Errors fatal to the process: invariant violations the store cannot
/// reason its way around (per spec §7, these are distinct from the
/// ordinary `Conflict` return of `tryCommit`).
#[derive(Debug, thiserror::Error)]
pub enum WorldStoreError {
    /// `applyState` was given a grid whose dimensions don't match the
    /// store's configured width/height.
    #[error("persisted world is {found_width}x{found_height}, store is configured for {expected_width}x{expected_height}")]
    DimensionMismatch {
        /// Width recorded in the persisted state.
        found_width: i32,
        /// Height recorded in the persisted state.
        found_height: i32,
        /// Width the store was constructed with.
        expected_width: i32,
        /// Height the store was constructed with.
        expected_height: i32,
    },

    /// The walkability override supplied at construction contains no
    /// walkable cell at all.
    #[error("walkability override contains no walkable cell")]
    NoWalkableCells,

    /// The store was configured with zero shards.
    #[error("shard count must be at least 1")]
    ZeroShards,
}

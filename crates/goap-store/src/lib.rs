//! The sharded, versioned world store.
//!
//! The world is partitioned into `N` shards keyed by a stable hash of each
//! entity's id. Reads take a cheap, lock-free [`Snapshot`] (an array of
//! `Arc` clones); writes go through [`WorldStore::try_commit`], which
//! validates a caller-supplied read-set and, on success, atomically
//! installs new copy-on-write state for every shard the batch touched.
//!
//! No module here interprets `EffectBatch`'s domain-op fields
//! (`inventory_ops`, `shop_txns`, `crop_ops`, ...) — those are read back out
//! of the batch by the post-commit effect dispatch pipeline once
//! `try_commit` returns [`CommitResult::Committed`].

mod commit;
mod effect_batch_ext;
mod error;
mod pathing;
mod shard;
mod sharding;
mod snapshot;
mod walkability;

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use goap_clock::Clock;
use goap_types::{Entity, EffectBatch, Fact};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

pub use commit::CommitResult;
pub use error::WorldStoreError;
pub use shard::ShardState;
pub use snapshot::Snapshot;
pub use walkability::WalkabilityGrid;

use commit::{compute_touched, stage_commit};
use effect_batch_ext::EffectBatchRef;
use shard::Shard;

/// Construction parameters for a [`WorldStore`].
#[derive(Debug, Clone)]
pub struct WorldStoreConfig {
    /// World width in cells.
    pub width: i32,
    /// World height in cells.
    pub height: i32,
    /// Number of shards to partition entities across.
    pub shard_count: usize,
    /// Optional walkability override. When absent, every cell is walkable.
    pub walkable_override: Option<Vec<bool>>,
}

/// The persisted shape of the store's own state: everything needed to
/// rebuild every shard and the walkability grid, independent of the other
/// subsystems bundled alongside it in a save archive.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorldStateChunk {
    /// Global version at the moment this chunk was captured.
    pub global_version: u64,
    /// World width in cells.
    pub width: i32,
    /// World height in cells.
    pub height: i32,
    /// Column-major walkability cells.
    pub walkable: Vec<bool>,
    /// Every entity across every shard.
    pub things: Vec<Entity>,
    /// Every fact across every shard.
    pub facts: Vec<Fact>,
}

/// The sharded world store.
pub struct WorldStore {
    shards: Vec<Arc<Shard>>,
    global_version: AtomicU64,
    walkability: RwLock<Arc<WalkabilityGrid>>,
    configured_width: i32,
    configured_height: i32,
    clock: Arc<dyn Clock>,
}

impl WorldStore {
    /// Build a store from `config`, driven by `clock`.
    ///
    /// # Errors
    ///
    /// Returns [`WorldStoreError::ZeroShards`] if `config.shard_count` is
    /// `0`, or [`WorldStoreError::NoWalkableCells`] if a supplied
    /// `walkable_override` has the wrong length or contains no walkable
    /// cell.
    pub fn new(config: WorldStoreConfig, clock: Arc<dyn Clock>) -> Result<Self, WorldStoreError> {
        if config.shard_count == 0 {
            return Err(WorldStoreError::ZeroShards);
        }
        let walkability = match config.walkable_override {
            Some(cells) => WalkabilityGrid::from_override(config.width, config.height, cells)
                .ok_or(WorldStoreError::NoWalkableCells)?,
            None => WalkabilityGrid::all_walkable(config.width, config.height),
        };
        let shards = (0..config.shard_count).map(Shard::new).map(Arc::new).collect();
        Ok(Self {
            shards,
            global_version: AtomicU64::new(0),
            walkability: RwLock::new(Arc::new(walkability)),
            configured_width: config.width,
            configured_height: config.height,
            clock,
        })
    }

    /// Number of shards the world is partitioned across.
    #[must_use]
    pub fn shard_count(&self) -> usize {
        self.shards.len()
    }

    /// Take a lock-free, internally consistent snapshot of the whole world.
    #[must_use]
    pub fn snapshot(&self) -> Snapshot {
        let shard_states = self.shards.iter().map(|s| s.current()).collect();
        let walkability = (*self.walkability.read()).clone();
        Snapshot::new(
            shard_states,
            self.global_version.load(Ordering::Acquire),
            self.clock.snapshot(),
            walkability,
        )
    }

    /// Validate `batch`'s read-set and, if it still holds, atomically stage
    /// and install its writes.
    ///
    /// Gates for every touched shard are acquired in ascending index order
    /// and released in the reverse order, which keeps concurrent commits
    /// over disjoint or overlapping shard sets deadlock-free.
    #[must_use]
    pub fn try_commit(&self, batch: &EffectBatch) -> CommitResult {
        let shard_count = self.shards.len();
        let reference = EffectBatchRef::from(batch);
        let touched = compute_touched(&reference, shard_count);

        let mut guards = Vec::with_capacity(touched.len());
        for &idx in &touched {
            guards.push(self.shards[idx].gate.lock());
        }

        let walkability = (*self.walkability.read()).clone();
        let staged = stage_commit(
            &reference,
            &touched,
            |idx| self.shards[idx].current(),
            shard_count,
            &walkability,
        );

        let result = match staged {
            Ok(builders) => {
                for (idx, builder) in builders {
                    let next_version = self.shards[idx].current().version.wrapping_add(1);
                    self.shards[idx].install(Arc::new(ShardState {
                        version: next_version,
                        things: builder.things,
                        facts: builder.facts,
                    }));
                }
                self.global_version.fetch_add(1, Ordering::AcqRel);
                CommitResult::Committed
            }
            Err(()) => CommitResult::Conflict,
        };

        while guards.pop().is_some() {}
        result
    }

    /// Capture the store's own persisted state (not the other subsystems a
    /// save archive bundles alongside it).
    #[must_use]
    pub fn capture_state(&self) -> WorldStateChunk {
        let snap = self.snapshot();
        WorldStateChunk {
            global_version: snap.global_version(),
            width: snap.walkability().width(),
            height: snap.walkability().height(),
            walkable: snap.walkability().to_vec(),
            things: snap.all_things().cloned().collect(),
            facts: self.shards.iter().flat_map(|s| s.current().facts.iter().cloned().collect::<Vec<_>>()).collect(),
        }
    }

    /// Restore the store's state from a previously captured chunk.
    ///
    /// # Errors
    ///
    /// Returns [`WorldStoreError::DimensionMismatch`] if the chunk's
    /// dimensions don't match how this store was constructed, or
    /// [`WorldStoreError::NoWalkableCells`] if its walkability override is
    /// invalid.
    pub fn apply_state(&self, chunk: WorldStateChunk) -> Result<(), WorldStoreError> {
        if chunk.width != self.configured_width || chunk.height != self.configured_height {
            return Err(WorldStoreError::DimensionMismatch {
                found_width: chunk.width,
                found_height: chunk.height,
                expected_width: self.configured_width,
                expected_height: self.configured_height,
            });
        }
        let grid = WalkabilityGrid::from_override(chunk.width, chunk.height, chunk.walkable)
            .ok_or(WorldStoreError::NoWalkableCells)?;

        let shard_count = self.shards.len();
        let mut per_shard_things: Vec<im::HashMap<goap_types::EntityId, Entity>> =
            vec![im::HashMap::new(); shard_count];
        let mut per_shard_facts: Vec<im::HashSet<Fact>> = vec![im::HashSet::new(); shard_count];

        for entity in chunk.things {
            let idx = sharding::shard_of(entity.id.as_str(), shard_count);
            per_shard_things[idx] = per_shard_things[idx].update(entity.id.clone(), entity);
        }
        for fact in chunk.facts {
            let idx = sharding::shard_of(fact.subject.as_str(), shard_count);
            per_shard_facts[idx].insert(fact);
        }

        for (idx, shard) in self.shards.iter().enumerate() {
            let _gate = shard.gate.lock();
            shard.install(Arc::new(ShardState {
                version: 0,
                things: std::mem::take(&mut per_shard_things[idx]),
                facts: std::mem::take(&mut per_shard_facts[idx]),
            }));
        }
        *self.walkability.write() = Arc::new(grid);
        self.global_version.store(chunk.global_version, Ordering::Release);
        Ok(())
    }
}

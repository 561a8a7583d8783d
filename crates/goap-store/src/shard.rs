//! A single world shard: an immutable, copy-on-write slice of entities and
//! facts, plus the gate that serializes commits touching it.

use std::sync::Arc;

use goap_types::{Entity, EntityId, Fact};
use im::{HashMap, HashSet};
use parking_lot::{Mutex, RwLock};

/// The copy-on-write content of one shard at a point in time.
#[derive(Debug, Clone)]
pub struct ShardState {
    /// Monotonically increasing per-shard version.
    pub version: u64,
    /// Entities owned by this shard, keyed by id.
    pub things: HashMap<EntityId, Entity>,
    /// Facts whose subject belongs to this shard.
    pub facts: HashSet<Fact>,
}

impl ShardState {
    fn empty() -> Self {
        Self {
            version: 0,
            things: HashMap::new(),
            facts: HashSet::new(),
        }
    }
}

impl Default for ShardState {
    fn default() -> Self {
        Self::empty()
    }
}

/// One of the `N` disjoint partitions of the world.
///
/// Readers clone the current `Arc<ShardState>` under a brief read lock and
/// then never block again — the next writer installs a *new* `Arc` rather
/// than mutating the one a reader might be holding. Writers serialize
/// through `gate`, acquired in ascending shard-index order across the
/// whole store to keep commits deadlock-free.
pub struct Shard {
    /// This shard's index in the store's shard array.
    pub index: usize,
    /// Serializes commits that touch this shard. Held only during the
    /// staging/install window of `WorldStore::try_commit`, never across a
    /// read.
    pub gate: Mutex<()>,
    state: RwLock<Arc<ShardState>>,
}

impl Shard {
    /// Build an empty shard at `index`.
    #[must_use]
    pub fn new(index: usize) -> Self {
        Self {
            index,
            gate: Mutex::new(()),
            state: RwLock::new(Arc::new(ShardState::empty())),
        }
    }

    /// Cheaply clone the current state pointer for a snapshot.
    #[must_use]
    pub fn current(&self) -> Arc<ShardState> {
        Arc::clone(&self.state.read())
    }

    /// Install a new state, used by the commit algorithm while `gate` is
    /// held.
    pub fn install(&self, new_state: Arc<ShardState>) {
        *self.state.write() = new_state;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_shard_has_version_zero() {
        let shard = Shard::new(0);
        assert_eq!(shard.current().version, 0);
    }

    #[test]
    fn install_replaces_state_atomically() {
        let shard = Shard::new(0);
        let mut next = (*shard.current()).clone();
        next.version = 1;
        shard.install(Arc::new(next));
        assert_eq!(shard.current().version, 1);
    }
}

//! A borrowed view over the shard-relevant slices of an `EffectBatch`.
//!
//! Keeps `commit.rs` from having to know about the domain-op fields
//! (`inventory_ops`, `shop_txns`, ...) that `WorldStore` never interprets —
//! those are read back out of the batch by the effect dispatch pipeline
//! after a successful commit.

use goap_types::{EffectBatch, EntityId, FactDelta, ReadEntry, SpawnEntry, WriteEntry};

pub(crate) struct EffectBatchRef<'a> {
    pub reads: &'a [ReadEntry],
    pub writes: &'a [WriteEntry],
    pub fact_deltas: &'a [FactDelta],
    pub spawns: &'a [SpawnEntry],
    pub despawns: &'a [EntityId],
}

impl<'a> From<&'a EffectBatch> for EffectBatchRef<'a> {
    fn from(batch: &'a EffectBatch) -> Self {
        Self {
            reads: &batch.reads,
            writes: &batch.writes,
            fact_deltas: &batch.fact_deltas,
            spawns: &batch.spawns,
            despawns: &batch.despawns,
        }
    }
}

//! The optimistic batch commit algorithm.

use std::collections::BTreeMap;

use goap_types::{
    Entity, EntityId, Fact, TagSet, MOVE_X_ATTRIBUTE, MOVE_Y_ATTRIBUTE, OPEN_ATTRIBUTE,
};
use im::{HashMap, HashSet};

use crate::effect_batch_ext::EffectBatchRef;
use crate::shard::ShardState;
use crate::sharding::shard_of;
use crate::walkability::WalkabilityGrid;

/// The two outcomes of `WorldStore::try_commit`.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum CommitResult {
    /// The batch was validated and applied.
    Committed,
    /// The batch failed read-set validation or staging; no shard mutated.
    Conflict,
}

/// A copy-on-write staging area for one shard during a commit attempt.
pub(crate) struct ShardBuilder {
    pub(crate) things: HashMap<EntityId, Entity>,
    pub(crate) facts: HashSet<Fact>,
}

impl ShardBuilder {
    fn from_state(state: &ShardState) -> Self {
        Self {
            things: state.things.clone(),
            facts: state.facts.clone(),
        }
    }
}

/// Compute the set of shard indices a batch touches.
///
/// Despawns escalate to touch every shard: facts are sharded by subject, so
/// removing an entity that some *other* shard's fact names as object
/// requires scanning every shard's fact set to uphold the "no dangling
/// facts after despawn" invariant. Ordinary reads/writes/fact-deltas/spawns
/// only touch the shard(s) they name.
pub(crate) fn compute_touched(batch: &EffectBatchRef<'_>, shard_count: usize) -> Vec<usize> {
    if shard_count == 0 {
        return Vec::new();
    }
    if !batch.despawns.is_empty() {
        return (0..shard_count).collect();
    }

    let mut touched = std::collections::BTreeSet::new();
    for read in batch.reads {
        touched.insert(shard_of(read.thing.as_str(), shard_count));
    }
    for write in batch.writes {
        touched.insert(shard_of(write.thing.as_str(), shard_count));
    }
    for delta in batch.fact_deltas {
        touched.insert(shard_of(delta.a.as_str(), shard_count));
    }
    for spawn in batch.spawns {
        touched.insert(shard_of(spawn.id.as_str(), shard_count));
    }
    touched.into_iter().collect()
}

/// Run the full stage-and-validate algorithm against copy-on-write
/// builders for the touched shards. Returns `Conflict` (with no caller-
/// visible side effect — the builders are local) on any validation
/// failure.
pub(crate) fn stage_commit(
    batch: &EffectBatchRef<'_>,
    touched: &[usize],
    current: impl Fn(usize) -> std::sync::Arc<ShardState>,
    shard_count: usize,
    grid: &WalkabilityGrid,
) -> Result<BTreeMap<usize, ShardBuilder>, ()> {
    let mut builders: BTreeMap<usize, ShardBuilder> = touched
        .iter()
        .map(|&idx| (idx, ShardBuilder::from_state(&current(idx))))
        .collect();

    // --- Stage 1: read-set validation -------------------------------
    for read in batch.reads {
        let idx = shard_of(read.thing.as_str(), shard_count);
        let builder = builders.get(&idx).ok_or(())?;
        let Some(entity) = builder.things.get(&read.thing) else {
            return Err(());
        };
        if let Some(attr) = &read.expect_attribute {
            let expected = read.expect_value.unwrap_or(0.0);
            let actual = entity.attribute(attr);
            if (actual - expected).abs() >= 1e-9 {
                return Err(());
            }
        }
    }

    // --- Stage 2: spawns ---------------------------------------------
    for spawn in batch.spawns {
        if spawn.id.is_empty() {
            return Err(());
        }
        let idx = shard_of(spawn.id.as_str(), shard_count);
        let builder = builders.get_mut(&idx).ok_or(())?;
        if builder.things.contains_key(&spawn.id) {
            return Err(());
        }
        let position = spawn.position.clamp_into_bounds(grid.width(), grid.height());
        let entity = Entity {
            id: spawn.id.clone(),
            entity_type: spawn.entity_type.clone(),
            tags: TagSet::normalize(spawn.tags.iter().cloned()),
            position,
            attributes: spawn.attributes.clone(),
            building: None,
        };
        builder.things = builder.things.update(spawn.id.clone(), entity);
    }

    // --- Stage 3: writes ----------------------------------------------
    for write in batch.writes {
        let idx = shard_of(write.thing.as_str(), shard_count);
        let builder = builders.get_mut(&idx).ok_or(())?;
        let Some(mut entity) = builder.things.get(&write.thing).cloned() else {
            return Err(());
        };
        apply_write(&mut entity, &write.attribute, write.value, grid);
        builder.things = builder.things.update(write.thing.clone(), entity);
    }

    // --- Stage 4: fact deltas -----------------------------------------
    for delta in batch.fact_deltas {
        let idx = shard_of(delta.a.as_str(), shard_count);
        let builder = builders.get_mut(&idx).ok_or(())?;
        let fact = Fact::new(delta.predicate.clone(), delta.a.clone(), delta.b.clone());
        if delta.add {
            builder.facts.insert(fact);
        } else {
            builder.facts.remove(&fact);
        }
    }

    // --- Stage 5: despawns ----------------------------------------------
    for id in batch.despawns {
        let owning_idx = shard_of(id.as_str(), shard_count);
        let owner = builders.get_mut(&owning_idx).ok_or(())?;
        if owner.things.remove(id).is_none() {
            return Err(());
        }
        for builder in builders.values_mut() {
            builder.facts.retain(|f| !f.mentions(id));
        }
    }

    // --- Stage 6: auto-consume sweep ------------------------------------
    let consumed_ids: Vec<EntityId> = builders
        .values()
        .flat_map(|b| b.things.values())
        .filter(|e| e.is_auto_consumable())
        .map(|e| e.id.clone())
        .collect();
    for id in &consumed_ids {
        let owning_idx = shard_of(id.as_str(), shard_count);
        if let Some(owner) = builders.get_mut(&owning_idx) {
            owner.things.remove(id);
        }
        for builder in builders.values_mut() {
            builder.facts.retain(|f| !f.mentions(id));
        }
    }

    Ok(builders)
}

fn apply_write(entity: &mut Entity, attribute: &str, value: f64, grid: &WalkabilityGrid) {
    if attribute == MOVE_X_ATTRIBUTE {
        let candidate = goap_types::Position::new(
            {
                #[allow(clippy::cast_possible_truncation)]
                let v = value as i32;
                v
            },
            entity.position.y,
        );
        entity.position = candidate.clamp_into_bounds(grid.width(), grid.height());
        return;
    }
    if attribute == MOVE_Y_ATTRIBUTE {
        let candidate = goap_types::Position::new(entity.position.x, {
            #[allow(clippy::cast_possible_truncation)]
            let v = value as i32;
            v
        });
        entity.position = candidate.clamp_into_bounds(grid.width(), grid.height());
        return;
    }

    // Case-insensitive "open" mirrors building.open_flag.
    if attribute.eq_ignore_ascii_case(OPEN_ATTRIBUTE) {
        if let Some(building) = entity.building.as_mut() {
            building.open_flag = value > 0.5;
        }
    }
    entity.attributes.insert(attribute.to_owned(), value);
}

#[cfg(test)]
mod tests {
    use super::*;
    use goap_types::{EffectBatch, ReadEntry, SpawnEntry, WriteEntry};
    use std::collections::BTreeMap as StdBTreeMap;
    use std::sync::Arc;

    fn grid() -> WalkabilityGrid {
        WalkabilityGrid::all_walkable(10, 10)
    }

    fn empty_state() -> Arc<ShardState> {
        Arc::new(ShardState::default())
    }

    #[test]
    fn spawn_with_empty_id_is_rejected() {
        let mut batch = EffectBatch::empty();
        batch.spawns.push(SpawnEntry {
            id: EntityId::new(""),
            entity_type: "item".into(),
            tags: vec![],
            position: goap_types::Position::new(0, 0),
            attributes: StdBTreeMap::new(),
        });
        let reference = EffectBatchRef::from(&batch);
        let touched = compute_touched(&reference, 1);
        let result = stage_commit(&reference, &touched, |_| empty_state(), 1, &grid());
        assert!(result.is_err());
    }

    #[test]
    fn read_missing_entity_conflicts() {
        let mut batch = EffectBatch::empty();
        batch.reads.push(ReadEntry::exists(EntityId::new("ghost")));
        let reference = EffectBatchRef::from(&batch);
        let touched = compute_touched(&reference, 1);
        let result = stage_commit(&reference, &touched, |_| empty_state(), 1, &grid());
        assert!(result.is_err());
    }

    #[test]
    fn write_to_missing_entity_conflicts() {
        let mut batch = EffectBatch::empty();
        batch.writes.push(WriteEntry {
            thing: EntityId::new("ghost"),
            attribute: "hp".into(),
            value: 1.0,
        });
        let reference = EffectBatchRef::from(&batch);
        let touched = compute_touched(&reference, 1);
        let result = stage_commit(&reference, &touched, |_| empty_state(), 1, &grid());
        assert!(result.is_err());
    }

    #[test]
    fn despawns_touch_every_shard() {
        let mut batch = EffectBatch::empty();
        batch.despawns.push(EntityId::new("e1"));
        let reference = EffectBatchRef::from(&batch);
        assert_eq!(compute_touched(&reference, 4), vec![0, 1, 2, 3]);
    }
}

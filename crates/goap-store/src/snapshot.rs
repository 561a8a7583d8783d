//! An immutable, consistent view of the entire world at one global version.

use std::sync::Arc;

use goap_types::{Entity, EntityId, Fact, Position, WorldTime, UNREACHABLE_DISTANCE};

use crate::pathing;
use crate::shard::ShardState;
use crate::sharding::shard_of;
use crate::walkability::WalkabilityGrid;

/// A read-only view of every shard at the instant it was taken, plus the
/// clock reading at that instant.
///
/// Cheap to construct (an array of `Arc` clones) and shares nothing
/// mutable with the store — readers holding a `Snapshot` never block a
/// concurrent writer, and vice versa.
#[derive(Clone)]
pub struct Snapshot {
    shards: Vec<Arc<ShardState>>,
    global_version: u64,
    world_time: WorldTime,
    walkability: WalkabilityGrid,
}

impl Snapshot {
    pub(crate) fn new(
        shards: Vec<Arc<ShardState>>,
        global_version: u64,
        world_time: WorldTime,
        walkability: WalkabilityGrid,
    ) -> Self {
        Self {
            shards,
            global_version,
            world_time,
            walkability,
        }
    }

    /// The global version this snapshot was taken at.
    #[must_use]
    pub const fn global_version(&self) -> u64 {
        self.global_version
    }

    /// The clock reading at the instant this snapshot was taken.
    #[must_use]
    pub const fn world_time(&self) -> &WorldTime {
        &self.world_time
    }

    fn shard_for(&self, id: &EntityId) -> Option<&Arc<ShardState>> {
        let count = self.shards.len();
        if count == 0 {
            return None;
        }
        self.shards.get(shard_of(id.as_str(), count))
    }

    /// Look up one entity by id.
    #[must_use]
    pub fn get_thing(&self, id: &EntityId) -> Option<Entity> {
        self.shard_for(id)?.things.get(id).cloned()
    }

    /// Iterate every entity across all shards.
    pub fn all_things(&self) -> impl Iterator<Item = &Entity> {
        self.shards.iter().flat_map(|s| s.things.values())
    }

    /// Every entity whose tag set contains `tag`.
    pub fn query_by_tag<'a>(&'a self, tag: &'a str) -> impl Iterator<Item = &'a Entity> {
        self.all_things().filter(move |e| e.tags.contains(tag))
    }

    /// Whether `(predicate, a, b)` is a known fact. Fact membership is
    /// sharded by the subject `a`.
    #[must_use]
    pub fn has_fact(&self, predicate: &str, a: &EntityId, b: &EntityId) -> bool {
        let Some(shard) = self.shard_for(a) else {
            return false;
        };
        shard.facts.iter().any(|f| f.predicate == predicate && &f.subject == a && &f.object == b)
    }

    /// Every fact whose subject or object is `entity`, scanning the whole
    /// snapshot (used by despawn-cascade tests and diagnostics; the commit
    /// path itself only ever touches a single shard's facts).
    pub fn facts_mentioning<'a>(&'a self, entity: &'a EntityId) -> impl Iterator<Item = &'a Fact> {
        self.shards.iter().flat_map(move |s| s.facts.iter().filter(|f| f.mentions(entity)))
    }

    /// Manhattan distance between two entities, or [`UNREACHABLE_DISTANCE`]
    /// if either is missing.
    #[must_use]
    pub fn distance(&self, a: &EntityId, b: &EntityId) -> u64 {
        match (self.get_thing(a), self.get_thing(b)) {
            (Some(ea), Some(eb)) => ea.position.manhattan_distance(eb.position),
            _ => UNREACHABLE_DISTANCE,
        }
    }

    /// Whether `(x, y)` is walkable. Always `false` outside the grid.
    #[must_use]
    pub fn is_walkable(&self, x: i32, y: i32) -> bool {
        self.walkability.is_walkable(x, y)
    }

    /// The next step on a shortest 4-connected path from `from` toward
    /// `to`, or `None` if unreachable. See [`pathing::find_next_step`] for
    /// the `from == to` edge case.
    #[must_use]
    pub fn try_find_next_step(&self, from: Position, to: Position) -> Option<Position> {
        pathing::find_next_step(&self.walkability, from, to)
    }

    /// Borrow the walkability grid directly (used by persistence).
    #[must_use]
    pub fn walkability(&self) -> &WalkabilityGrid {
        &self.walkability
    }
}

#[cfg(test)]
mod tests {
    use goap_types::{Entity, TagSet};

    use super::*;
    use crate::shard::ShardState;

    fn entity(id: &str, tag: &str, pos: (i32, i32)) -> Entity {
        Entity {
            id: EntityId::new(id),
            entity_type: "npc".into(),
            tags: TagSet::normalize([tag]),
            position: Position::new(pos.0, pos.1),
            attributes: std::collections::BTreeMap::new(),
            building: None,
        }
    }

    fn snapshot_with(entities: Vec<Entity>) -> Snapshot {
        let mut shard = ShardState::default();
        for e in entities {
            shard.things = shard.things.update(e.id.clone(), e);
        }
        Snapshot::new(
            vec![Arc::new(shard)],
            1,
            WorldTime {
                total_world_seconds: 0.0,
                total_world_days: 0.0,
                time_scale: 1.0,
                seconds_per_day: 86_400.0,
                time_of_day: 0.0,
                day_of_year: 1,
                day_of_month: 1,
                month: 1,
                season_index: 0,
                season_name: "Spring".into(),
                year: 1,
                days_per_month: 28,
                season_length_days: 28,
                days_per_year: 112,
            },
            WalkabilityGrid::all_walkable(10, 10),
        )
    }

    #[test]
    fn get_thing_finds_seeded_entity() {
        let snap = snapshot_with(vec![entity("npc_1", "npc", (1, 1))]);
        assert!(snap.get_thing(&EntityId::new("npc_1")).is_some());
        assert!(snap.get_thing(&EntityId::new("missing")).is_none());
    }

    #[test]
    fn query_by_tag_filters() {
        let snap = snapshot_with(vec![
            entity("npc_1", "npc", (0, 0)),
            entity("apple", "item", (1, 1)),
        ]);
        let npcs: Vec<_> = snap.query_by_tag("npc").collect();
        assert_eq!(npcs.len(), 1);
    }

    #[test]
    fn distance_sentinel_for_missing_entity() {
        let snap = snapshot_with(vec![entity("npc_1", "npc", (0, 0))]);
        let dist = snap.distance(&EntityId::new("npc_1"), &EntityId::new("ghost"));
        assert_eq!(dist, UNREACHABLE_DISTANCE);
    }

    #[test]
    fn distance_between_known_entities() {
        let snap = snapshot_with(vec![
            entity("a", "npc", (0, 0)),
            entity("b", "npc", (3, 4)),
        ]);
        assert_eq!(snap.distance(&EntityId::new("a"), &EntityId::new("b")), 7);
    }
}

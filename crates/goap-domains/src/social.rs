//! Relationship affinity tracking between entities (spec §4.4's
//! relationship ops).

use std::collections::BTreeMap;

use dashmap::DashMap;
use goap_types::{EntityId, RelationshipOp};
use serde::{Deserialize, Serialize};

/// `"relationshipId:delta"` gift-affinity strings attached to an item type
/// (e.g. a bouquet might carry `"romance:8.0"`).
pub type GiftAffinityTable = BTreeMap<String, Vec<(String, f64)>>;

/// One `(from, to)` pair's relationship-id → score ledger.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RelationshipRecord {
    /// The initiating entity.
    pub from: EntityId,
    /// The entity the relationship is tracked toward.
    pub to: EntityId,
    /// Relationship id → accumulated score.
    pub scores: BTreeMap<String, f64>,
}

/// Tracks relationship scores and resolves gift-affinity deltas.
#[derive(Default)]
pub struct SocialSystem {
    scores: DashMap<(EntityId, EntityId), BTreeMap<String, f64>>,
    gift_affinities: GiftAffinityTable,
}

impl SocialSystem {
    /// Build a system with a fixed gift-affinity table (item id → list of
    /// `(relationship_id, delta)` pairs).
    #[must_use]
    pub fn new(gift_affinities: GiftAffinityTable) -> Self {
        Self { scores: DashMap::new(), gift_affinities }
    }

    /// Current score for `relationship_id` between `from` and `to` (`0.0`
    /// if untouched).
    #[must_use]
    pub fn score(&self, from: &EntityId, to: &EntityId, relationship_id: &str) -> f64 {
        self.scores
            .get(&(from.clone(), to.clone()))
            .and_then(|scores| scores.get(relationship_id).copied())
            .unwrap_or(0.0)
    }

    /// Apply a relationship operation: `explicit_delta` if set, else a
    /// gift-affinity lookup on `item_id` for a matching relationship id.
    /// Deltas with magnitude under `1e-6` are ignored.
    pub fn apply(&self, op: &RelationshipOp) -> f64 {
        let delta = op.explicit_delta.unwrap_or_else(|| self.gift_delta(op));
        if delta.abs() < 1e-6 {
            return self.score(&op.from, &op.to, &op.relationship_id);
        }
        let mut entry = self.scores.entry((op.from.clone(), op.to.clone())).or_default();
        let score = entry.entry(op.relationship_id.clone()).or_insert(0.0);
        *score += delta;
        *score
    }

    fn gift_delta(&self, op: &RelationshipOp) -> f64 {
        let Some(item_id) = &op.item_id else {
            return 0.0;
        };
        self.gift_affinities
            .get(item_id)
            .into_iter()
            .flatten()
            .find(|(relationship_id, _)| relationship_id == &op.relationship_id)
            .map_or(0.0, |(_, delta)| *delta)
    }

    /// Snapshot every tracked relationship, for persistence.
    #[must_use]
    pub fn capture_state(&self) -> Vec<RelationshipRecord> {
        self.scores
            .iter()
            .map(|entry| {
                let (from, to) = entry.key().clone();
                RelationshipRecord { from, to, scores: entry.value().clone() }
            })
            .collect()
    }

    /// Replace this system's contents from a previously captured snapshot.
    pub fn apply_state(&self, records: Vec<RelationshipRecord>) {
        self.scores.clear();
        for record in records {
            self.scores.insert((record.from, record.to), record.scores);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_delta_overrides_gift_lookup() {
        let social = SocialSystem::new(GiftAffinityTable::new());
        let from = EntityId::new("alice");
        let to = EntityId::new("bob");
        let score = social.apply(&RelationshipOp {
            from: from.clone(),
            to: to.clone(),
            relationship_id: "friendship".into(),
            item_id: None,
            explicit_delta: Some(5.0),
        });
        assert!((score - 5.0).abs() < 1e-9);
    }

    #[test]
    fn gift_affinity_resolves_when_no_explicit_delta() {
        let mut table = GiftAffinityTable::new();
        table.insert("bouquet".into(), vec![("romance".into(), 8.0)]);
        let social = SocialSystem::new(table);
        let from = EntityId::new("alice");
        let to = EntityId::new("bob");
        let score = social.apply(&RelationshipOp {
            from,
            to,
            relationship_id: "romance".into(),
            item_id: Some("bouquet".into()),
            explicit_delta: None,
        });
        assert!((score - 8.0).abs() < 1e-9);
    }

    #[test]
    fn sub_epsilon_delta_is_ignored() {
        let social = SocialSystem::new(GiftAffinityTable::new());
        let from = EntityId::new("alice");
        let to = EntityId::new("bob");
        social.apply(&RelationshipOp {
            from: from.clone(),
            to: to.clone(),
            relationship_id: "friendship".into(),
            item_id: None,
            explicit_delta: Some(1e-9),
        });
        assert_eq!(social.score(&from, &to, "friendship"), 0.0);
    }
}

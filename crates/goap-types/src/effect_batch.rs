//! The commit unit: [`EffectBatch`] and its constituent entries.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::fact::FactDelta;
use crate::ids::EntityId;
use crate::position::Position;

/// A read precondition checked at commit time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadEntry {
    /// Entity that must exist.
    pub thing: EntityId,
    /// Attribute to compare, if any.
    pub expect_attribute: Option<String>,
    /// Expected attribute value, compared with a `1e-9` epsilon.
    pub expect_value: Option<f64>,
}

impl ReadEntry {
    /// A read that only requires `thing` to exist.
    #[must_use]
    pub fn exists(thing: EntityId) -> Self {
        Self {
            thing,
            expect_attribute: None,
            expect_value: None,
        }
    }

    /// A read that requires `thing.attribute == value` within `1e-9`.
    #[must_use]
    pub fn expect(thing: EntityId, attribute: impl Into<String>, value: f64) -> Self {
        Self {
            thing,
            expect_attribute: Some(attribute.into()),
            expect_value: Some(value),
        }
    }
}

/// The two pseudo-attributes that mutate position instead of the attribute
/// map.
pub const MOVE_X_ATTRIBUTE: &str = "@move.x";
/// See [`MOVE_X_ATTRIBUTE`].
pub const MOVE_Y_ATTRIBUTE: &str = "@move.y";

/// A single attribute write, or a `@move.x`/`@move.y` position mutation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WriteEntry {
    /// Target entity.
    pub thing: EntityId,
    /// Attribute name, or `@move.x` / `@move.y`.
    pub attribute: String,
    /// New value.
    pub value: f64,
}

/// A requested spawn.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpawnEntry {
    /// New entity id. Must be non-empty and not already present.
    pub id: EntityId,
    /// Free-form entity type.
    pub entity_type: String,
    /// Raw tags, normalized at staging time.
    pub tags: Vec<String>,
    /// Requested position, clamped into bounds at staging time.
    pub position: Position,
    /// Initial attribute map.
    pub attributes: BTreeMap<String, f64>,
}

/// A requested plan cooldown registration, applied only after a successful
/// commit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanCooldownRequest {
    /// The cooldown scope entity. Defaults to the step's target when absent.
    pub scope: Option<EntityId>,
    /// Requested cooldown length in seconds.
    pub seconds: f64,
    /// When `true`, the effective cooldown is `max(seconds, step duration)`.
    pub use_step_duration: bool,
}

/// `{owner, itemId, quantity, remove}` inventory operation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InventoryOp {
    /// Owning entity.
    pub owner: EntityId,
    /// Item type identifier.
    pub item_id: String,
    /// Requested quantity. Non-positive quantities are ignored.
    pub quantity: i64,
    /// `true` to remove, `false` to add.
    pub remove: bool,
}

/// `{owner, amount}` currency operation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurrencyOp {
    /// Owning entity.
    pub owner: EntityId,
    /// Signed delta. Ignored if `|amount| < 1e-6`.
    pub amount: f64,
}

/// The two shop transaction kinds.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Serialize, Deserialize)]
pub enum ShopTxnKind {
    /// The actor sells to the shop.
    Sale,
    /// The actor buys from the shop.
    Purchase,
}

/// `{shop, actor, itemId, quantity, kind}` shop transaction request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShopTxn {
    /// The shop entity.
    pub shop: EntityId,
    /// The acting entity.
    pub actor: EntityId,
    /// Item type identifier.
    pub item_id: String,
    /// Requested quantity.
    pub quantity: i64,
    /// Sale or purchase.
    pub kind: ShopTxnKind,
}

/// `{from, to, relationshipId, itemId?, explicitDelta?}` relationship
/// adjustment request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelationshipOp {
    /// The entity whose feelings change.
    pub from: EntityId,
    /// The entity the feeling is about.
    pub to: EntityId,
    /// Relationship dimension identifier (e.g. `"friendship"`).
    pub relationship_id: String,
    /// Optional gift item used to look up affinity deltas.
    pub item_id: Option<String>,
    /// Explicit delta, overriding any item-affinity lookup when present.
    pub explicit_delta: Option<f64>,
}

/// A generic domain operation shared by crop/animal/mining/fishing/foraging,
/// parameterized by the kind of resource node being worked.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceDomainOp {
    /// The acting entity.
    pub actor: EntityId,
    /// The resource-node entity (plot, pen, vein, spot, patch).
    pub target: EntityId,
    /// Free-form op name (e.g. `"harvest"`, `"feed"`, `"cast"`, `"dig"`).
    pub action: String,
    /// Optional item consumed as a cost (seed, bait, feed, tool charge).
    pub consumable_item_id: Option<String>,
}

/// `{status, objectiveId, ...}`-producing quest operation request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuestOp {
    /// The acting entity.
    pub actor: EntityId,
    /// The quest identifier.
    pub quest_id: String,
    /// Free-form op name (e.g. `"progress"`, `"turn_in"`).
    pub action: String,
    /// Optional item associated with the action (turn-in item, proof).
    pub item_id: Option<String>,
    /// Optional quantity associated with the action.
    pub quantity: i64,
}

/// The atomic unit of change proposed against the world.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EffectBatch {
    /// The snapshot version this batch was built against. Informational
    /// only — conflict detection uses the read-set, not this value.
    pub base_version: u64,
    /// Read-set preconditions.
    pub reads: Vec<ReadEntry>,
    /// Attribute/position writes.
    pub writes: Vec<WriteEntry>,
    /// Fact additions/removals.
    pub fact_deltas: Vec<FactDelta>,
    /// Entity spawns.
    pub spawns: Vec<SpawnEntry>,
    /// Entity despawns.
    pub despawns: Vec<EntityId>,
    /// Plan cooldowns to register on successful commit.
    pub plan_cooldowns: Vec<PlanCooldownRequest>,
    /// Inventory operations.
    pub inventory_ops: Vec<InventoryOp>,
    /// Currency operations.
    pub currency_ops: Vec<CurrencyOp>,
    /// Shop transactions.
    pub shop_txns: Vec<ShopTxn>,
    /// Relationship adjustments.
    pub relationship_ops: Vec<RelationshipOp>,
    /// Crop domain operations.
    pub crop_ops: Vec<ResourceDomainOp>,
    /// Animal domain operations.
    pub animal_ops: Vec<ResourceDomainOp>,
    /// Mining domain operations.
    pub mining_ops: Vec<ResourceDomainOp>,
    /// Fishing domain operations.
    pub fishing_ops: Vec<ResourceDomainOp>,
    /// Foraging domain operations.
    pub foraging_ops: Vec<ResourceDomainOp>,
    /// Quest operations.
    pub quest_ops: Vec<QuestOp>,
}

impl EffectBatch {
    /// An empty batch — a valid commit that touches no shards.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_batch_touches_nothing() {
        let batch = EffectBatch::empty();
        assert!(batch.reads.is_empty());
        assert!(batch.writes.is_empty());
        assert!(batch.spawns.is_empty());
    }

    #[test]
    fn read_entry_exists_has_no_expectation() {
        let read = ReadEntry::exists(EntityId::new("e1"));
        assert!(read.expect_attribute.is_none());
        assert!(read.expect_value.is_none());
    }
}

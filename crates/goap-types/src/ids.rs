//! Identifier types for the simulation core.
//!
//! [`EntityId`] is an opaque interned string identifier per the data model:
//! equality and hashing are by value, and the empty string is never a valid
//! identifier for a commit. [`PlanId`] is a UUID stamped onto a plan each
//! time an actor selects one, used to scope reservation ownership and
//! cooldown registration to a single plan instance.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// An opaque, cheaply-clonable entity identifier.
///
/// Backed by `Arc<str>` rather than an owned `String` so that shard maps,
/// reservation tokens, and effect batches can all hold copies of the same
/// identifier without repeated heap allocation. Equality, ordering, and
/// hashing are all by string value, matching the "opaque interned string"
/// contract in the data model.
#[derive(Debug, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(Arc<str>);

impl EntityId {
    /// Build an `EntityId` from any string-like value.
    pub fn new(value: impl Into<Arc<str>>) -> Self {
        Self(value.into())
    }

    /// Borrow the underlying string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// An id is invalid for a commit (spawn, write target, fact endpoint)
    /// if it is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for EntityId {
    fn from(value: &str) -> Self {
        Self(Arc::from(value))
    }
}

impl From<String> for EntityId {
    fn from(value: String) -> Self {
        Self(Arc::from(value.as_str()))
    }
}

/// Identifies a single plan instance chosen by an actor during one loop
/// iteration. Reservation tokens and plan cooldowns are scoped to the
/// `PlanId` that requested them, so a stale plan can never release or
/// refresh reservations it no longer owns.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlanId(Uuid);

impl PlanId {
    /// Mint a fresh plan id.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for PlanId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for PlanId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entity_id_equality_is_by_value() {
        let a = EntityId::new("npc_1");
        let b = EntityId::from("npc_1".to_string());
        assert_eq!(a, b);
    }

    #[test]
    fn empty_entity_id_is_invalid() {
        let id = EntityId::new("");
        assert!(id.is_empty());
    }

    #[test]
    fn plan_ids_are_distinct() {
        assert_ne!(PlanId::new(), PlanId::new());
    }

    #[test]
    fn entity_id_roundtrips_through_json() {
        let id = EntityId::new("well_01");
        let json = serde_json::to_string(&id).unwrap_or_default();
        let back: EntityId = serde_json::from_str(&json).unwrap_or_else(|_| EntityId::new(""));
        assert_eq!(id, back);
    }
}

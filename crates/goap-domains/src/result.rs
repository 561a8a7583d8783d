//! The shared `apply(operation) -> result` return shape every domain system
//! produces.

use goap_types::{CurrencyOp, InventoryOp};

/// The outcome of one domain `apply` call.
///
/// `skill_xp` is only populated by the resource domains that grant it
/// (mining/fishing/foraging, per spec §4.4); other domains leave it `None`.
/// `objective_progress` is only populated by quest turn-in/progress ops.
#[derive(Debug, Clone, Default)]
pub struct DomainApplyResult {
    /// Whether the operation took effect.
    pub success: bool,
    /// Inventory side-effects to forward to `InventorySystem`/effect dispatch.
    pub inventory_changes: Vec<InventoryOp>,
    /// Currency side-effects to forward to `CurrencySystem`/effect dispatch.
    pub currency_changes: Vec<CurrencyOp>,
    /// `(skill_id, xp)` granted by this operation, if any.
    pub skill_xp: Option<(String, f64)>,
    /// `(objective_id, progress, required)` this operation left the quest
    /// objective at, if this was a quest op.
    pub objective_progress: Option<(String, i64, i64)>,
    /// A human-readable outcome message, surfaced in logs.
    pub message: Option<String>,
}

impl DomainApplyResult {
    /// A bare failure with no side effects.
    #[must_use]
    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: Some(message.into()),
            ..Self::default()
        }
    }

    /// A bare success with no side effects.
    #[must_use]
    pub fn succeeded() -> Self {
        Self {
            success: true,
            ..Self::default()
        }
    }
}

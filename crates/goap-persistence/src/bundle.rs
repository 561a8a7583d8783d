//! The save bundle: one optional field per persistable subsystem.
//!
//! This crate has no live reference to a running `WorldStore`,
//! `ReservationService`, or any `goap-domains` system — it only knows the
//! plain chunk types each subsystem's `capture_state`/`apply_state` already
//! produces and consumes. Gathering those chunks from (and restoring them
//! into) the live collaborators is the caller's job: the bootstrap that
//! owns every running system at once is the only place that can do it.

use goap_actor::ActorStateChunk;
use goap_domains::{
    CalendarState, InventoryRecord, QuestRecord, RelationshipRecord, ResourceDomainState,
    ShopListing, SkillRecord, WeatherState,
};
use goap_store::WorldStateChunk;
use goap_types::{EntityId, ReservationToken, WorldTime};
use serde::{Deserialize, Serialize};

/// Every subsystem a save archive can carry. A `None` field is simply
/// skipped on write and left untouched on load.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SaveBundle {
    /// `goap-store`'s entity/fact/version chunk.
    pub world: Option<WorldStateChunk>,
    /// The simulated clock's current time.
    pub clock: Option<WorldTime>,
    /// Every outstanding reservation token.
    pub reservations: Option<Vec<ReservationToken>>,
    /// Per-entity inventory records.
    pub inventory: Option<Vec<InventoryRecord>>,
    /// Per-entity currency balances.
    pub currency: Option<Vec<(EntityId, f64)>>,
    /// Per-shop listing records.
    pub shops: Option<Vec<(EntityId, ShopListing)>>,
    /// Crop resource-domain state.
    pub crops: Option<ResourceDomainState>,
    /// Animal resource-domain state.
    pub animals: Option<ResourceDomainState>,
    /// Mining resource-domain state.
    pub mining: Option<ResourceDomainState>,
    /// Fishing resource-domain state.
    pub fishing: Option<ResourceDomainState>,
    /// Foraging resource-domain state.
    pub foraging: Option<ResourceDomainState>,
    /// Weather state.
    pub weather: Option<WeatherState>,
    /// Calendar state.
    pub calendar: Option<CalendarState>,
    /// Per-entity skill records.
    pub skills: Option<Vec<SkillRecord>>,
    /// Per-pair relationship records.
    pub social: Option<Vec<RelationshipRecord>>,
    /// Per-entity quest progress records.
    pub quests: Option<Vec<QuestRecord>>,
    /// One chunk per actor host.
    pub actors: Option<Vec<ActorStateChunk>>,
}

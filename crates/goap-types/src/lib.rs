//! Shared data model for the GOAP simulation core.
//!
//! This crate has no logic beyond small pure helpers (distance, tag
//! normalization, attribute lookup) — it exists so every other crate in the
//! workspace (`goap-store`, `goap-reservations`, `goap-plan`,
//! `goap-domains`, `goap-effects`, `goap-actor`, `goap-persistence`) can
//! share one definition of `EntityId`, `Position`, `Entity`, `Fact`,
//! `EffectBatch`, `Reservation`, and the other data-model types from the
//! spec's data model section.
//!
//! # Modules
//!
//! - [`ids`] -- `EntityId`, `PlanId`.
//! - [`position`] -- `Position` and the Manhattan distance metric.
//! - [`entity`] -- `Entity`, `TagSet`, `Building`, `OpenHours`.
//! - [`fact`] -- `Fact`, `FactDelta`.
//! - [`effect_batch`] -- `EffectBatch` and all its constituent entry types.
//! - [`reservation`] -- `Reservation`, `ReservationMode`, `ReservationToken`.
//! - [`status`] -- `ActorPlanStatus`, `ActorLoopState`.
//! - [`world_time`] -- `WorldTime`.

pub mod effect_batch;
pub mod entity;
pub mod fact;
pub mod ids;
pub mod position;
pub mod reservation;
pub mod status;
pub mod world_time;

pub use effect_batch::{
    EffectBatch, InventoryOp, PlanCooldownRequest, QuestOp, ReadEntry, RelationshipOp,
    ResourceDomainOp, ShopTxn, ShopTxnKind, SpawnEntry, WriteEntry, CurrencyOp,
    MOVE_X_ATTRIBUTE, MOVE_Y_ATTRIBUTE,
};
pub use entity::{Building, Entity, OpenHours, TagSet, CONSUMED_SUFFIX, OPEN_ATTRIBUTE};
pub use fact::{Fact, FactDelta};
pub use ids::{EntityId, PlanId};
pub use position::{Position, UNREACHABLE_DISTANCE};
pub use reservation::{Reservation, ReservationMode, ReservationToken};
pub use status::{ActorLoopState, ActorPlanStatus};
pub use world_time::WorldTime;

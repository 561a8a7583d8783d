//! Reservation requests and the tokens the reservation service hands out.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::{EntityId, PlanId};

/// Exclusivity mode of a reservation.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Serialize, Deserialize)]
pub enum ReservationMode {
    /// Exclusive: no other actor may hold or observe itself as non-holder.
    Hard,
    /// Pre-emptible by a strictly higher-priority `Soft` request.
    Soft,
}

/// A requested claim over an entity, as carried by a [`Step`](crate) (kept
/// in `goap-plan`, which can't be named from this leaf crate).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Reservation {
    /// The entity being claimed.
    pub thing: EntityId,
    /// Hard or soft.
    pub mode: ReservationMode,
    /// Priority; higher wins soft pre-emption ties.
    pub priority: i32,
}

/// A granted reservation, as stored by the reservation service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReservationToken {
    /// The claimed entity.
    pub thing: EntityId,
    /// The actor holding the claim.
    pub owner: EntityId,
    /// The plan instance the claim was acquired for.
    pub plan_id: PlanId,
    /// Hard or soft.
    pub mode: ReservationMode,
    /// Priority at grant (or refresh) time.
    pub priority: i32,
    /// Wall-clock grant (or refresh) timestamp.
    pub created_utc: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reservation_token_carries_owner_and_plan() {
        let token = ReservationToken {
            thing: EntityId::new("well"),
            owner: EntityId::new("npc_1"),
            plan_id: PlanId::new(),
            mode: ReservationMode::Hard,
            priority: 5,
            created_utc: Utc::now(),
        };
        assert_eq!(token.owner.as_str(), "npc_1");
    }
}

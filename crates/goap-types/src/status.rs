//! `ActorPlanStatus`: the diagnostic snapshot of an actor's current loop
//! iteration, used by observers and tests.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::EntityId;

/// The phase an actor's loop iteration is currently in.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Serialize, Deserialize)]
pub enum ActorLoopState {
    /// The host has not yet run a loop iteration.
    Initializing,
    /// The planner returned no plan this iteration.
    NoPlan,
    /// The planner returned a plan with no steps.
    PlanEmpty,
    /// A plan was selected and a plan summary recorded.
    PlanSelected,
    /// No step's preconditions currently hold.
    WaitingPreconditions,
    /// A cooldown gate is blocking the selected step.
    Cooldown,
    /// The selected step's duration wait is in progress.
    DurationWait,
    /// The selected step is executing.
    ExecutingStep,
    /// Reservation acquisition failed for the selected step.
    ReservationFailed,
    /// An unrecoverable error occurred.
    Error,
    /// The host has finished shutting down.
    Stopped,
}

/// A point-in-time summary of one actor's planning/execution loop, exposed
/// for diagnostics and tests.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActorPlanStatus {
    /// The actor this status describes.
    pub actor_id: EntityId,
    /// The current goal id, if any.
    pub goal_id: Option<String>,
    /// A human-readable summary of the current plan.
    pub plan_summary: Option<String>,
    /// The activity names of the current plan's steps, in order.
    pub steps: Vec<String>,
    /// Index of the step currently being evaluated/executed.
    pub current_step: usize,
    /// The current loop phase.
    pub state: ActorLoopState,
    /// When this status was last updated.
    pub updated_utc: DateTime<Utc>,
}

impl ActorPlanStatus {
    /// The initial status for a freshly-started actor host.
    #[must_use]
    pub fn initializing(actor_id: EntityId) -> Self {
        Self {
            actor_id,
            goal_id: None,
            plan_summary: None,
            steps: Vec::new(),
            current_step: 0,
            state: ActorLoopState::Initializing,
            updated_utc: Utc::now(),
        }
    }
}

//! Plan/step types and the seams `ActorHost` drives a planner and its step
//! executors through.
//!
//! Lives in its own crate (rather than `goap-types`) because a [`Step`]'s
//! precondition/cost fields are pure functions over a [`Snapshot`], and
//! `goap-store` (which owns `Snapshot`) must not depend back on planning
//! types.

use goap_store::Snapshot;
use goap_types::{EffectBatch, EntityId, PlanCooldownRequest, PlanId, Reservation};
use serde::{Deserialize, Serialize};

/// One step of a [`Plan`]: a named action against an optional target entity,
/// with the reservations it needs held and the cooldown it registers on
/// success.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Step {
    /// Free-form action name (e.g. `"harvest_crop"`, `"walk_to"`).
    pub name: String,
    /// The entity this step acts on, if any.
    pub target: Option<EntityId>,
    /// How long executing this step takes, in simulated seconds.
    pub duration_seconds: f64,
    /// Entities (and modes/priorities) this step must hold reservations on
    /// before it may execute.
    pub reservations: Vec<Reservation>,
    /// An optional cooldown to register once this step's batch commits.
    pub plan_cooldown: Option<PlanCooldownRequest>,
}

impl Step {
    /// Whether this step names a target at all.
    #[must_use]
    pub fn has_target(&self) -> bool {
        self.target.is_some()
    }
}

/// An ordered sequence of steps toward one goal, for one actor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Plan {
    /// Unique id for this plan instance.
    pub id: PlanId,
    /// The goal this plan was built to satisfy.
    pub goal_id: String,
    /// Human-readable summary, surfaced in `ActorPlanStatus`.
    pub summary: String,
    /// The steps to execute in order.
    pub steps: Vec<Step>,
}

impl Plan {
    /// Step at `index`, if the plan is that long.
    #[must_use]
    pub fn step(&self, index: usize) -> Option<&Step> {
        self.steps.get(index)
    }

    /// Whether `index` is the last step of this plan.
    #[must_use]
    pub fn is_last_step(&self, index: usize) -> bool {
        index + 1 >= self.steps.len()
    }
}

/// Produces a [`Plan`] for an actor given a read-only view of the world.
///
/// The planner's internal search/heuristic is explicitly out of scope here
/// (an external collaborator per the domain's own non-goals) — this trait is
/// only the seam `ActorHost` calls through.
pub trait Planner: Send + Sync {
    /// Build a plan for `actor`, or `None` if no goal is currently
    /// satisfiable.
    fn plan(&self, actor: &EntityId, snapshot: &Snapshot) -> Option<Plan>;
}

/// Whether a step's execution finished in one call or needs to be resumed.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum ExecutionProgress {
    /// The step is done; its batch (if any) is ready to commit.
    Completed,
    /// The step needs another execution call before it is done (e.g. a
    /// multi-tick channel/duration step driven externally to the duration
    /// wait `ActorHost` already performs).
    InProgress,
}

/// The result of one [`Executor::execute`] call.
#[derive(Debug, Clone)]
pub struct ExecutionOutcome {
    /// Whether the step completed.
    pub progress: ExecutionProgress,
    /// The effect batch to attempt committing, if this call produced one.
    pub batch: Option<EffectBatch>,
}

impl ExecutionOutcome {
    /// A completed step with no batch to commit (e.g. a pure wait step).
    #[must_use]
    pub fn completed_without_batch() -> Self {
        Self {
            progress: ExecutionProgress::Completed,
            batch: None,
        }
    }

    /// A completed step whose batch should be committed.
    #[must_use]
    pub fn completed(batch: EffectBatch) -> Self {
        Self {
            progress: ExecutionProgress::Completed,
            batch: Some(batch),
        }
    }
}

/// Builds the `EffectBatch` for one step, given the actor and a snapshot
/// taken after reservations were acquired and the step's duration elapsed.
pub trait Executor: Send + Sync {
    /// Execute `step` for `actor`.
    fn execute(&self, actor: &EntityId, step: &Step, snapshot: &Snapshot) -> ExecutionOutcome;
}

/// Resolves the [`Executor`] responsible for a named step, so `ActorHost`
/// never hardcodes the mapping from step name to implementation.
pub trait ExecutorRegistry: Send + Sync {
    /// Look up the executor for `step_name`, if one is registered.
    fn executor_for(&self, step_name: &str) -> Option<&dyn Executor>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn step(name: &str) -> Step {
        Step {
            name: name.to_owned(),
            target: None,
            duration_seconds: 0.0,
            reservations: Vec::new(),
            plan_cooldown: None,
        }
    }

    #[test]
    fn is_last_step_detects_final_index() {
        let plan = Plan {
            id: PlanId::new(),
            goal_id: "eat".into(),
            summary: "grab and eat an apple".into(),
            steps: vec![step("walk_to"), step("eat")],
        };
        assert!(!plan.is_last_step(0));
        assert!(plan.is_last_step(1));
    }

    #[test]
    fn step_without_target_reports_so() {
        assert!(!step("wait").has_target());
    }
}

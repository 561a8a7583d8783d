//! A minimal planner/executor pair so a freshly bootstrapped simulation has
//! something runnable to drive through `ActorHost`'s loop.
//!
//! The planning heuristic itself is out of scope here — only the
//! `Planner`/`Executor`/`ExecutorRegistry` contracts matter to the core, and
//! this is the simplest implementation of them: every actor always picks a
//! one-step "idle" plan that completes immediately. A real deployment
//! swaps this crate's planner/executor wiring for its own goal logic
//! without touching anything else in `goap-sim`.

use goap_plan::{Executor, ExecutionOutcome, ExecutorRegistry, Plan, Planner, Step};
use goap_store::Snapshot;
use goap_types::{EntityId, PlanId};

const IDLE_STEP_NAME: &str = "idle";

/// Always returns a single-step plan that idles for `step_duration_seconds`.
pub struct IdlePlanner {
    step_duration_seconds: f64,
}

impl IdlePlanner {
    /// Build a planner whose idle step lasts `step_duration_seconds`.
    #[must_use]
    pub fn new(step_duration_seconds: f64) -> Self {
        Self { step_duration_seconds }
    }
}

impl Planner for IdlePlanner {
    fn plan(&self, _actor: &EntityId, _snapshot: &Snapshot) -> Option<Plan> {
        Some(Plan {
            id: PlanId::new(),
            goal_id: "idle".to_owned(),
            summary: "idle".to_owned(),
            steps: vec![Step {
                name: IDLE_STEP_NAME.to_owned(),
                target: None,
                duration_seconds: self.step_duration_seconds,
                reservations: Vec::new(),
                plan_cooldown: None,
            }],
        })
    }
}

/// Completes the idle step without touching the world.
pub struct IdleExecutor;

impl Executor for IdleExecutor {
    fn execute(&self, _actor: &EntityId, _step: &Step, _snapshot: &Snapshot) -> ExecutionOutcome {
        ExecutionOutcome::completed_without_batch()
    }
}

/// Routes every step name to the one [`IdleExecutor`].
pub struct IdleExecutorRegistry {
    executor: IdleExecutor,
}

impl Default for IdleExecutorRegistry {
    fn default() -> Self {
        Self { executor: IdleExecutor }
    }
}

impl ExecutorRegistry for IdleExecutorRegistry {
    fn executor_for(&self, _step_name: &str) -> Option<&dyn Executor> {
        Some(&self.executor)
    }
}

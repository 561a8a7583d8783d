//! The schedule-evaluation seam (spec §4.3.1).
//!
//! A schedule is not a persisted domain system of its own — it has no
//! `tick`/`captureState` surface, only this read-only query against a
//! snapshot, called once per actor-loop iteration. Its evaluation result is
//! used purely for logging (`SCHEDULE start/end/late`) and for mirroring a
//! target entity's open/closed flag; it never gates step selection.

use goap_store::Snapshot;
use goap_types::EntityId;

/// One actor's schedule state at the instant a snapshot was taken.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduleEvaluation {
    /// Identifier of the active block, if any (e.g. `"work"`, `"sleep"`).
    pub active_block: Option<String>,
    /// The entity this block is anchored to (a workplace, a bed, ...).
    pub target: Option<EntityId>,
    /// The task name this block resolves to, after any event override.
    pub effective_task: Option<String>,
    /// Where the actor should be headed for this block, after any event
    /// override.
    pub effective_goto: Option<EntityId>,
    /// The calendar event currently overriding the nominal schedule, if any.
    pub active_event_id: Option<String>,
    /// Minutes elapsed since this block became active.
    pub minutes_into_block: f64,
}

/// Resolves an actor's current schedule block from a world snapshot.
///
/// Attaching one to an [`crate::ActorHost`] is optional — actors with no
/// schedule service simply skip §4.3.1 entirely.
pub trait ScheduleService: Send + Sync {
    /// Evaluate `actor`'s schedule against `snapshot`, or `None` if no
    /// block is currently active.
    fn evaluate(&self, actor: &EntityId, snapshot: &Snapshot) -> Option<ScheduleEvaluation>;
}

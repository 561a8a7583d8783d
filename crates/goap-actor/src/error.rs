//! Errors fatal to one actor's loop.

use goap_types::EntityId;

/// An error that ends an actor's loop thread.
///
/// Per the failure semantics the loop is built against: an unrecoverable
/// error is fatal only to the actor it occurred on. It is logged with
/// world-time context before the loop returns, and surfaced here so the
/// hosting runtime decides what to do about it (retry the actor, abort the
/// process, ...) rather than the host silently swallowing it.
#[derive(Debug, thiserror::Error)]
pub enum ActorError {
    /// The actor's own loop thread panicked. The panic payload isn't
    /// carried across the `JoinHandle`, so only the actor id is recorded.
    #[error("actor {0} loop thread panicked")]
    ThreadPanicked(EntityId),
}

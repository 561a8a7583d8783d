//! The actor host: one actor's continuous sense-plan-act loop, running on
//! its own background thread (spec §4.3), plus the schedule-evaluation
//! seam (§4.3.1) and cooldown bookkeeping (§4.3.2) it drives.

mod cooldown;
mod error;
mod host;
mod schedule;

pub use cooldown::CooldownSnapshot;
pub use error::ActorError;
pub use host::{ActorHost, ActorHostConfig, ActorStateChunk};
pub use schedule::{ScheduleEvaluation, ScheduleService};

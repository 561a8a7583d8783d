//! Save archive persistence: a ZIP container with a `manifest.json` table
//! of contents and one JSON chunk per subsystem.
//!
//! This crate only knows how to serialize and deserialize the plain chunk
//! types each subsystem's `capture_state`/`apply_state` pair already works
//! with — it holds no reference to any live `WorldStore`, reservation
//! service, or domain system itself. Gathering chunks from (and restoring
//! them into) those live collaborators is the caller's job: whatever
//! bootstrap wires every running system together is the only place that
//! holds all of them at once.

mod archive;
mod bundle;
mod error;
mod manifest;

pub use archive::SaveArchive;
pub use bundle::SaveBundle;
pub use error::PersistenceError;
pub use manifest::{Manifest, MANIFEST_VERSION};

//! The save archive's top-level manifest (`manifest.json`).

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The only manifest format version this crate currently understands.
/// Loading an archive tagged with any other version is an error.
pub const MANIFEST_VERSION: i32 = 1;

/// The archive's table of contents: one entry per persisted subsystem.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Manifest {
    /// Format version. Must equal [`MANIFEST_VERSION`] to load.
    pub version: i32,
    /// Wall-clock time the archive was written.
    pub saved_at_utc: DateTime<Utc>,
    /// The simulated tick this archive was captured at: the clock's
    /// `total_world_seconds` rounded to the nearest whole second, the
    /// closest analog to a discrete tick counter this continuous-time
    /// core has.
    pub tick: u64,
    /// Chunk name (e.g. `"world"`) to archive entry filename (e.g.
    /// `"world.json"`). A name absent here means that chunk was not
    /// present in the bundle at save time.
    pub chunks: BTreeMap<String, String>,
}

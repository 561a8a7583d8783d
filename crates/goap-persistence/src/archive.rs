//! Reads and writes the ZIP-archive save format: a `manifest.json` table of
//! contents plus one JSON chunk per present [`SaveBundle`] field.

use std::collections::BTreeMap;
use std::io::{Read, Write};
use std::path::Path;

use chrono::Utc;
use serde::Serialize;
use serde::de::DeserializeOwned;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use crate::bundle::SaveBundle;
use crate::error::PersistenceError;
use crate::manifest::{Manifest, MANIFEST_VERSION};

/// Reads and writes save archives in the manifest-plus-chunks format.
pub struct SaveArchive;

/// Writes every present field of `bundle` as its own chunk, in the same
/// order [`read_bundle_chunks`] reads them back.
macro_rules! write_bundle_chunks {
    ($zip:expr, $chunks:expr, $options:expr, $bundle:expr, $($field:ident),+ $(,)?) => {
        $(write_chunk($zip, $chunks, $options, stringify!($field), &$bundle.$field)?;)+
    };
}

macro_rules! read_bundle_chunks {
    ($zip:expr, $manifest:expr, $bundle:expr, $($field:ident),+ $(,)?) => {
        $($bundle.$field = read_chunk($zip, $manifest, stringify!($field))?;)+
    };
}

impl SaveArchive {
    /// Write `bundle` to `path` as a fresh ZIP archive, tagging it with
    /// `tick` (see [`Manifest::tick`]).
    pub fn write(path: impl AsRef<Path>, bundle: &SaveBundle, tick: u64) -> Result<(), PersistenceError> {
        let file = std::fs::File::create(path)?;
        let mut zip = ZipWriter::new(file);
        let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
        let mut chunks = BTreeMap::new();

        write_bundle_chunks!(
            &mut zip, &mut chunks, options, bundle,
            world, clock, reservations, inventory, currency, shops, crops, animals,
            mining, fishing, foraging, weather, calendar, skills, social, quests, actors,
        );

        let manifest = Manifest { version: MANIFEST_VERSION, saved_at_utc: Utc::now(), tick, chunks };
        zip.start_file("manifest.json", options)?;
        let manifest_body = serde_json::to_vec_pretty(&manifest)
            .map_err(|source| PersistenceError::Json { chunk: "manifest".to_owned(), source })?;
        zip.write_all(&manifest_body)?;
        zip.finish()?;
        Ok(())
    }

    /// Read an archive back into its manifest and bundle. Fails with
    /// [`PersistenceError::UnsupportedVersion`] if the manifest's version
    /// isn't [`MANIFEST_VERSION`].
    pub fn read(path: impl AsRef<Path>) -> Result<(Manifest, SaveBundle), PersistenceError> {
        let file = std::fs::File::open(path)?;
        let mut zip = ZipArchive::new(file)?;
        let manifest: Manifest = read_entry(&mut zip, "manifest.json")?;
        if manifest.version != MANIFEST_VERSION {
            return Err(PersistenceError::UnsupportedVersion(manifest.version));
        }

        let mut bundle = SaveBundle::default();
        read_bundle_chunks!(
            &mut zip, &manifest, bundle,
            world, clock, reservations, inventory, currency, shops, crops, animals,
            mining, fishing, foraging, weather, calendar, skills, social, quests, actors,
        );

        Ok((manifest, bundle))
    }
}

fn write_chunk<T: Serialize>(
    zip: &mut ZipWriter<std::fs::File>,
    chunks: &mut BTreeMap<String, String>,
    options: SimpleFileOptions,
    name: &str,
    value: &Option<T>,
) -> Result<(), PersistenceError> {
    let Some(value) = value else { return Ok(()) };
    let filename = format!("{name}.json");
    zip.start_file(&filename, options)?;
    let body = serde_json::to_vec_pretty(value)
        .map_err(|source| PersistenceError::Json { chunk: name.to_owned(), source })?;
    zip.write_all(&body)?;
    chunks.insert(name.to_owned(), filename);
    Ok(())
}

fn read_entry<T: DeserializeOwned>(zip: &mut ZipArchive<std::fs::File>, name: &str) -> Result<T, PersistenceError> {
    let mut entry = zip.by_name(name)?;
    let mut body = String::new();
    entry.read_to_string(&mut body)?;
    serde_json::from_str(&body).map_err(|source| PersistenceError::Json { chunk: name.trim_end_matches(".json").to_owned(), source })
}

fn read_chunk<T: DeserializeOwned>(
    zip: &mut ZipArchive<std::fs::File>,
    manifest: &Manifest,
    name: &str,
) -> Result<Option<T>, PersistenceError> {
    let Some(filename) = manifest.chunks.get(name) else { return Ok(None) };
    read_entry(zip, filename).map(Some)
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use goap_types::{EntityId, PlanId, ReservationMode, ReservationToken};
    use tempfile::tempdir;

    use super::*;

    fn sample_bundle() -> SaveBundle {
        SaveBundle {
            reservations: Some(vec![ReservationToken {
                thing: EntityId::from("plot_1"),
                owner: EntityId::from("actor_1"),
                plan_id: PlanId::new(),
                mode: ReservationMode::Hard,
                priority: 0,
                created_utc: Utc::now(),
            }]),
            ..SaveBundle::default()
        }
    }

    #[test]
    fn round_trips_present_chunks_and_omits_absent_ones() -> Result<(), String> {
        let dir = tempdir().map_err(|e| e.to_string())?;
        let path = dir.path().join("save.zip");
        let bundle = sample_bundle();

        SaveArchive::write(&path, &bundle, 42).map_err(|e| e.to_string())?;
        let (manifest, restored) = SaveArchive::read(&path).map_err(|e| e.to_string())?;

        assert_eq!(manifest.version, MANIFEST_VERSION);
        assert_eq!(manifest.tick, 42);
        assert!(manifest.chunks.contains_key("reservations"));
        assert!(!manifest.chunks.contains_key("world"));
        assert!(restored.world.is_none());

        let restored_reservations = restored.reservations.ok_or("expected reservations chunk")?;
        assert_eq!(restored_reservations.len(), 1);
        assert_eq!(restored_reservations[0].thing, EntityId::from("plot_1"));
        Ok(())
    }

    #[test]
    fn rejects_an_archive_from_a_future_manifest_version() -> Result<(), String> {
        let dir = tempdir().map_err(|e| e.to_string())?;
        let path = dir.path().join("save.zip");

        let file = std::fs::File::create(&path).map_err(|e| e.to_string())?;
        let mut zip = ZipWriter::new(file);
        let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
        zip.start_file("manifest.json", options).map_err(|e| e.to_string())?;
        let manifest = Manifest { version: MANIFEST_VERSION + 1, saved_at_utc: Utc::now(), tick: 0, chunks: BTreeMap::new() };
        let body = serde_json::to_vec(&manifest).map_err(|e| e.to_string())?;
        zip.write_all(&body).map_err(|e| e.to_string())?;
        zip.finish().map_err(|e| e.to_string())?;

        match SaveArchive::read(&path) {
            Err(PersistenceError::UnsupportedVersion(v)) => {
                assert_eq!(v, MANIFEST_VERSION + 1);
                Ok(())
            }
            other => Err(format!("expected UnsupportedVersion, got {other:?}")),
        }
    }
}

//! Manifest store: CSV tables keyed by image id.
//!
//! A manifest is loaded whole, updated in memory, and written back whole
//! through an atomic `.tmp` + rename. Row order is preserved: existing rows
//! keep their position, new ids are appended.
//!
//! ## Merge policy
//!
//! Fields that record completed, expensive work (`enhanced_description`,
//! `file_name`) are never replaced once present: the existing value wins and
//! newer data only fills gaps. See [`ManifestRecord::absorb`].

use std::path::Path;

use indexmap::IndexMap;
use serde::de::DeserializeOwned;
use serde::Serialize;

use captionforge_core::{EnhancementRecord, ImageId, RenderRecord, WorkUnit};

use crate::error::{csv_err, PipelineError};
use crate::writer::atomic_write;

/// In-memory manifest: image id → record, in file order.
pub type Manifest<R> = IndexMap<ImageId, R>;

/// A row type that can live in a manifest.
pub trait ManifestRecord: Serialize + DeserializeOwned + Clone {
    /// Column headers, in serialization order.
    const HEADERS: &'static [&'static str];

    fn image_id(&self) -> &ImageId;

    /// Fill absent fields of `self` from `newer`; present fields are kept.
    fn absorb(&mut self, newer: Self);
}

impl ManifestRecord for EnhancementRecord {
    const HEADERS: &'static [&'static str] = &[
        "image_id",
        "context",
        "original_description",
        "enhanced_description",
    ];

    fn image_id(&self) -> &ImageId {
        &self.image_id
    }

    fn absorb(&mut self, newer: Self) {
        if self.enhanced_description.is_none() {
            self.enhanced_description = newer.enhanced_description;
        }
    }
}

impl ManifestRecord for RenderRecord {
    const HEADERS: &'static [&'static str] = &[
        "image_id",
        "context",
        "original_description",
        "enhanced_description",
        "file_name",
    ];

    fn image_id(&self) -> &ImageId {
        &self.image_id
    }

    fn absorb(&mut self, newer: Self) {
        if self.enhanced_description.is_none() {
            self.enhanced_description = newer.enhanced_description;
        }
        if self.file_name.is_none() {
            self.file_name = newer.file_name;
        }
    }
}

// ---------------------------------------------------------------------------
// Load
// ---------------------------------------------------------------------------

/// Load the manifest at `path`.
///
/// Returns an empty manifest if the file does not yet exist. Duplicate ids
/// inside one file are merged with the same existing-wins policy.
pub fn load_at<R: ManifestRecord>(path: &Path) -> Result<Manifest<R>, PipelineError> {
    let mut manifest = Manifest::new();
    if !path.exists() {
        return Ok(manifest);
    }
    let mut reader = csv::Reader::from_path(path).map_err(|e| csv_err(path, e))?;
    for row in reader.deserialize::<R>() {
        let record = row.map_err(|e| csv_err(path, e))?;
        upsert(&mut manifest, record);
    }
    Ok(manifest)
}

/// Load the input table (`image_id, context, description`).
///
/// Rows are normalized (see [`WorkUnit::normalized`]); a repeated id keeps
/// its first row.
pub fn load_work_units(path: &Path) -> Result<Vec<WorkUnit>, PipelineError> {
    if !path.exists() {
        return Err(PipelineError::MissingInput {
            path: path.to_path_buf(),
        });
    }
    let mut reader = csv::Reader::from_path(path).map_err(|e| csv_err(path, e))?;
    let mut seen = std::collections::HashSet::new();
    let mut units = Vec::new();
    for row in reader.deserialize::<WorkUnit>() {
        let unit = row.map_err(|e| csv_err(path, e))?.normalized();
        if !seen.insert(unit.image_id.clone()) {
            tracing::warn!(image_id = %unit.image_id, "duplicate image_id in input, keeping first row");
            continue;
        }
        units.push(unit);
    }
    Ok(units)
}

// ---------------------------------------------------------------------------
// Merge
// ---------------------------------------------------------------------------

/// Insert `record`, or let the existing record with the same id absorb it.
pub fn upsert<R: ManifestRecord>(manifest: &mut Manifest<R>, record: R) {
    match manifest.get_mut(record.image_id()) {
        Some(existing) => existing.absorb(record),
        None => {
            manifest.insert(record.image_id().clone(), record);
        }
    }
}

/// Merge `updated` into `existing`; existing completed fields win.
pub fn merge<R: ManifestRecord>(mut existing: Manifest<R>, updated: Manifest<R>) -> Manifest<R> {
    for (_, record) in updated {
        upsert(&mut existing, record);
    }
    existing
}

// ---------------------------------------------------------------------------
// Save (atomic)
// ---------------------------------------------------------------------------

/// Atomically write `manifest` to `path`, header row included even when empty.
pub fn save_at<R: ManifestRecord>(manifest: &Manifest<R>, path: &Path) -> Result<(), PipelineError> {
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(Vec::new());
    writer
        .write_record(R::HEADERS)
        .map_err(|e| csv_err(path, e))?;
    for record in manifest.values() {
        writer.serialize(record).map_err(|e| csv_err(path, e))?;
    }
    let bytes = writer
        .into_inner()
        .map_err(|e| csv_err(path, csv::Error::from(e.into_error())))?;
    atomic_write(path, &bytes)?;
    tracing::debug!(path = %path.display(), rows = manifest.len(), "saved manifest");
    Ok(())
}

/// Number of rows in the manifest at `path` (0 when absent).
pub fn row_count<R: ManifestRecord>(path: &Path) -> Result<usize, PipelineError> {
    Ok(load_at::<R>(path)?.len())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn enhancement(id: &str, enhanced: Option<&str>) -> EnhancementRecord {
        EnhancementRecord {
            image_id: ImageId::from(id),
            context: "kitchen".to_string(),
            original_description: "a red mug".to_string(),
            enhanced_description: enhanced.map(str::to_string),
        }
    }

    #[test]
    fn empty_manifest_when_file_missing() {
        let tmp = TempDir::new().unwrap();
        let manifest: Manifest<EnhancementRecord> =
            load_at(&tmp.path().join("nonexistent.csv")).unwrap();
        assert!(manifest.is_empty());
    }

    #[test]
    fn roundtrip_save_load_preserves_order() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("enhanced.csv");
        let mut manifest = Manifest::new();
        upsert(&mut manifest, enhancement("002", Some("B")));
        upsert(&mut manifest, enhancement("001", None));

        save_at(&manifest, &path).unwrap();
        let loaded: Manifest<EnhancementRecord> = load_at(&path).unwrap();
        assert_eq!(loaded, manifest);
        assert_eq!(
            loaded.keys().map(ImageId::as_str).collect::<Vec<_>>(),
            vec!["002", "001"]
        );
    }

    #[test]
    fn empty_manifest_still_writes_header() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("images.csv");
        save_at::<RenderRecord>(&Manifest::new(), &path).unwrap();
        assert_eq!(
            fs::read_to_string(&path).unwrap().trim_end(),
            "image_id,context,original_description,enhanced_description,file_name"
        );
    }

    #[test]
    fn existing_enhancement_wins_on_merge() {
        let mut existing = Manifest::new();
        upsert(&mut existing, enhancement("001", Some("A")));
        let mut updated = Manifest::new();
        upsert(&mut updated, enhancement("001", Some("B")));
        upsert(&mut updated, enhancement("002", Some("C")));

        let merged = merge(existing, updated);
        assert_eq!(merged[&ImageId::from("001")].enhanced_description.as_deref(), Some("A"));
        assert_eq!(merged[&ImageId::from("002")].enhanced_description.as_deref(), Some("C"));
    }

    #[test]
    fn merge_fills_gaps() {
        let mut existing = Manifest::new();
        upsert(&mut existing, enhancement("001", None));
        let mut updated = Manifest::new();
        upsert(&mut updated, enhancement("001", Some("B")));

        let merged = merge(existing, updated);
        assert_eq!(merged[&ImageId::from("001")].enhanced_description.as_deref(), Some("B"));
    }

    #[test]
    fn nan_and_blank_cells_load_as_absent() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("images.csv");
        fs::write(
            &path,
            "image_id,context,original_description,enhanced_description,file_name\n\
             001,kitchen,a red mug,NaN,\n\
             002,kitchen,a blue mug,,nan\n",
        )
        .unwrap();

        let loaded: Manifest<RenderRecord> = load_at(&path).unwrap();
        for record in loaded.values() {
            assert_eq!(record.enhanced_description, None);
            assert_eq!(record.file_name, None);
        }
    }

    #[test]
    fn missing_optional_column_loads_as_absent() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("images.csv");
        fs::write(
            &path,
            "image_id,context,original_description,enhanced_description\n001,kitchen,a red mug,A\n",
        )
        .unwrap();

        let loaded: Manifest<RenderRecord> = load_at(&path).unwrap();
        assert_eq!(loaded[&ImageId::from("001")].file_name, None);
    }

    #[test]
    fn work_units_are_normalized_and_deduplicated() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("input.csv");
        fs::write(
            &path,
            "image_id,context,description\n 001 , kitchen ,\"\"\"a red mug\"\"\"\n001,garden,dup\n",
        )
        .unwrap();

        let units = load_work_units(&path).unwrap();
        assert_eq!(units.len(), 1);
        assert_eq!(units[0].image_id, ImageId::from("001"));
        assert_eq!(units[0].context, "kitchen");
        assert_eq!(units[0].description, "a red mug");
    }

    #[test]
    fn missing_input_is_an_error() {
        let tmp = TempDir::new().unwrap();
        let err = load_work_units(&tmp.path().join("input.csv")).unwrap_err();
        assert!(matches!(err, PipelineError::MissingInput { .. }));
    }
}

//! Record store: the canonical JSON snapshot of extracted tyres plus its CSV export

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info};

use super::atomic_write::{write_atomic, write_json_atomic};
use super::config::StorageSettings;
use super::persistence_error::{PersistenceError, PersistenceResult};
use crate::domain::TyreRecord;

pub const EXPORT_COLUMNS: [&str; 17] = [
    "URL",
    "Name",
    "Brand",
    "Size",
    "Width",
    "Aspect Ratio",
    "Rim",
    "Load/Speed Index",
    "Pattern",
    "Price",
    "Discounted Price",
    "Country of Origin",
    "Year",
    "Warranty",
    "Image URL",
    "Specifications",
    "Scraped At",
];

/// Outcome of one merge+flush
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FlushSummary {
    /// Records appended by this merge
    pub added: usize,
    /// Records in the store after the merge
    pub total: usize,
    /// Whether the store file was rewritten
    pub written: bool,
    /// Whether the tabular export was regenerated
    pub exported: bool,
    /// Set when the export was due but could not be written
    pub export_failed: bool,
}

#[derive(Debug, Clone)]
pub struct RecordStore {
    records_path: PathBuf,
    export_path: PathBuf,
    export_interval: usize,
}

impl RecordStore {
    pub fn new(storage: &StorageSettings) -> Self {
        Self {
            records_path: storage.records_path(),
            export_path: storage.export_path(),
            export_interval: storage.export_interval.max(1),
        }
    }

    pub fn records_path(&self) -> &Path {
        &self.records_path
    }

    pub fn export_path(&self) -> &Path {
        &self.export_path
    }

    /// Create an empty store file if none exists
    pub async fn ensure_exists(&self) -> PersistenceResult<()> {
        if tokio::fs::try_exists(&self.records_path)
            .await
            .map_err(|e| PersistenceError::io(&self.records_path, e))?
        {
            return Ok(());
        }
        write_json_atomic(&self.records_path, &Vec::<TyreRecord>::new()).await?;
        debug!("Created record store {:?}", self.records_path);
        Ok(())
    }

    /// Read the persisted snapshot; a missing or blank file is an empty store
    pub async fn load(&self) -> PersistenceResult<Vec<TyreRecord>> {
        match tokio::fs::read_to_string(&self.records_path).await {
            Ok(contents) if contents.trim().is_empty() => Ok(Vec::new()),
            Ok(contents) => serde_json::from_str(&contents)
                .map_err(|e| PersistenceError::json(&self.records_path, e)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Vec::new()),
            Err(e) => Err(PersistenceError::io(&self.records_path, e)),
        }
    }

    /// Merge `new_records` into the persisted store and write it back.
    ///
    /// Records lacking a mandatory field, or whose URL is already stored, are
    /// dropped. Without `force`, a merge that adds nothing touches no files.
    /// The export is regenerated when the store size crosses a multiple of the
    /// export interval, or on every forced flush. A failed export is logged and
    /// flagged in the summary; the store write it follows still counts.
    pub async fn merge_and_flush(
        &self,
        new_records: &[TyreRecord],
        force: bool,
    ) -> PersistenceResult<FlushSummary> {
        let mut records = self.load().await?;
        let before = records.len();
        let mut known: HashSet<String> = records.iter().map(|r| r.url.clone()).collect();

        for record in new_records {
            if !record.is_complete() {
                debug!("Dropping incomplete record for {}", record.url);
                continue;
            }
            if known.insert(record.url.clone()) {
                records.push(record.clone());
            }
        }

        let added = records.len() - before;
        if added == 0 && !force {
            return Ok(FlushSummary {
                added,
                total: before,
                ..FlushSummary::default()
            });
        }

        write_json_atomic(&self.records_path, &records).await?;

        let crossed = before / self.export_interval != records.len() / self.export_interval;
        let due = force || crossed;
        let mut exported = false;
        if due {
            match self.export(&records).await {
                Ok(()) => exported = true,
                Err(e) => error!("Export not regenerated: {}", e),
            }
        }

        info!(
            "Record store flushed: {} new, {} total{}",
            added,
            records.len(),
            if exported { ", export regenerated" } else { "" }
        );

        Ok(FlushSummary {
            added,
            total: records.len(),
            written: true,
            exported,
            export_failed: due && !exported,
        })
    }

    /// Write every record as one CSV row under a header
    pub async fn export(&self, records: &[TyreRecord]) -> PersistenceResult<()> {
        let path = &self.export_path;
        let mut writer = csv::Writer::from_writer(Vec::new());

        writer
            .write_record(EXPORT_COLUMNS)
            .map_err(|e| PersistenceError::csv(path, e))?;
        for record in records {
            writer
                .write_record(export_row(record))
                .map_err(|e| PersistenceError::csv(path, e))?;
        }

        let bytes = writer
            .into_inner()
            .map_err(|e| PersistenceError::io(path, e.into_error()))?;
        write_atomic(path, &bytes).await?;

        debug!("Exported {} records to {:?}", records.len(), path);
        Ok(())
    }
}

fn export_row(record: &TyreRecord) -> [String; 17] {
    let specifications = record
        .specifications
        .iter()
        .map(|pair| format!("{}: {}", pair.label, pair.value))
        .collect::<Vec<_>>()
        .join("; ");

    [
        record.url.clone(),
        record.name.clone(),
        record.brand.clone(),
        record.size.clone(),
        record.width.clone(),
        record.aspect_ratio.clone(),
        record.rim.clone(),
        record.load_speed_index.clone(),
        record.pattern.clone(),
        record.price.clone(),
        record.discounted_price.clone(),
        record.country_of_origin.clone(),
        record.year.clone(),
        record.warranty.clone(),
        record.image_url.clone(),
        specifications,
        record.scraped_at.to_rfc3339(),
    ]
}

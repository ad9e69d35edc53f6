//! URL ledger: three append-only JSON arrays of resolved URLs
//!
//! Each set is read fully at startup and rewritten fully (atomically) when it
//! changes. Membership checks are in memory; the on-disk order is insertion
//! order.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use super::atomic_write::write_json_atomic;
use super::config::StorageSettings;
use super::persistence_error::{PersistenceError, PersistenceResult};
use crate::domain::LedgerKind;

/// One persisted URL set
#[derive(Debug)]
pub struct LedgerSet {
    path: PathBuf,
    urls: Vec<String>,
    members: HashSet<String>,
    dirty: bool,
}

impl LedgerSet {
    /// Read the set at `path`, creating an empty file when it does not exist yet
    pub async fn open(path: &Path) -> PersistenceResult<Self> {
        let urls: Vec<String> = match tokio::fs::read_to_string(path).await {
            Ok(contents) if contents.trim().is_empty() => Vec::new(),
            Ok(contents) => {
                serde_json::from_str(&contents).map_err(|e| PersistenceError::json(path, e))?
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                write_json_atomic(path, &Vec::<String>::new()).await?;
                debug!("Created ledger file {:?}", path);
                Vec::new()
            }
            Err(e) => return Err(PersistenceError::io(path, e)),
        };

        let mut set = Self {
            path: path.to_path_buf(),
            urls: Vec::with_capacity(urls.len()),
            members: HashSet::with_capacity(urls.len()),
            dirty: false,
        };
        for url in urls {
            set.insert(url);
        }
        Ok(set)
    }

    pub fn contains(&self, url: &str) -> bool {
        self.members.contains(url)
    }

    /// Add `url` if absent; returns whether it was added
    pub fn insert(&mut self, url: impl Into<String>) -> bool {
        let url = url.into();
        if self.members.contains(&url) {
            return false;
        }
        self.members.insert(url.clone());
        self.urls.push(url);
        true
    }

    pub fn urls(&self) -> &[String] {
        &self.urls
    }

    async fn persist(&mut self) -> PersistenceResult<bool> {
        if !self.dirty {
            return Ok(false);
        }
        write_json_atomic(&self.path, &self.urls).await?;
        self.dirty = false;
        Ok(true)
    }
}

/// Success, failed and non-matching URL sets
#[derive(Debug)]
pub struct Ledger {
    success: LedgerSet,
    failed: LedgerSet,
    non_matching: LedgerSet,
}

impl Ledger {
    /// Load all three sets, creating missing files
    pub async fn open(storage: &StorageSettings) -> PersistenceResult<Self> {
        let ledger = Self {
            success: LedgerSet::open(&storage.success_path()).await?,
            failed: LedgerSet::open(&storage.failed_path()).await?,
            non_matching: LedgerSet::open(&storage.non_matching_path()).await?,
        };

        info!(
            "Ledger loaded: {} success, {} failed, {} non-matching",
            ledger.len(LedgerKind::Success),
            ledger.len(LedgerKind::Failed),
            ledger.len(LedgerKind::NonMatching)
        );
        Ok(ledger)
    }

    pub const fn set(&self, kind: LedgerKind) -> &LedgerSet {
        match kind {
            LedgerKind::Success => &self.success,
            LedgerKind::Failed => &self.failed,
            LedgerKind::NonMatching => &self.non_matching,
        }
    }

    fn set_mut(&mut self, kind: LedgerKind) -> &mut LedgerSet {
        match kind {
            LedgerKind::Success => &mut self.success,
            LedgerKind::Failed => &mut self.failed,
            LedgerKind::NonMatching => &mut self.non_matching,
        }
    }

    /// Which set already holds `url`, if any
    pub fn classification(&self, url: &str) -> Option<LedgerKind> {
        LedgerKind::ALL
            .into_iter()
            .find(|kind| self.set(*kind).contains(url))
    }

    pub fn contains_any(&self, url: &str) -> bool {
        self.classification(url).is_some()
    }

    /// Mark `url` in the `kind` set in memory; [`Ledger::persist`] writes it out.
    ///
    /// Entries are never removed. Returns whether the set changed.
    pub fn record(&mut self, kind: LedgerKind, url: &str) -> bool {
        let set = self.set_mut(kind);
        let added = set.insert(url);
        if added {
            set.dirty = true;
        }
        added
    }

    /// Rewrite every set that changed since the last persist.
    ///
    /// A set whose write fails stays dirty and is retried on the next call.
    pub async fn persist(&mut self) -> PersistenceResult<usize> {
        let mut written = 0;
        let mut first_error = None;

        for kind in LedgerKind::ALL {
            match self.set_mut(kind).persist().await {
                Ok(true) => written += 1,
                Ok(false) => {}
                Err(e) => {
                    first_error.get_or_insert(e);
                }
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(written),
        }
    }

    pub fn len(&self, kind: LedgerKind) -> usize {
        self.set(kind).urls().len()
    }
}

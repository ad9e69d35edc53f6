//! URL classification vocabulary shared by the ledger files and the scheduler.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::product::TyreRecord;

/// Which ledger set a URL belongs to once it has been resolved
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LedgerKind {
    Success,
    Failed,
    NonMatching,
}

impl LedgerKind {
    pub const ALL: [Self; 3] = [Self::Success, Self::Failed, Self::NonMatching];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Failed => "failed",
            Self::NonMatching => "non_matching",
        }
    }
}

impl fmt::Display for LedgerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Final outcome of one URL's fetch-extract-retry pipeline
#[derive(Debug, Clone)]
pub enum UrlOutcome {
    /// Page fetched and extracted; the record may still lack one mandatory field
    Extracted(Box<TyreRecord>),
    /// Target URL that exhausted its retry budget
    Failed { reason: String, attempts: u32 },
    /// URL outside the target domain (skipped, or failed with the reduced budget)
    NonMatching { reason: String },
}

impl UrlOutcome {
    pub const fn ledger_kind(&self) -> LedgerKind {
        match self {
            Self::Extracted(_) => LedgerKind::Success,
            Self::Failed { .. } => LedgerKind::Failed,
            Self::NonMatching { .. } => LedgerKind::NonMatching,
        }
    }
}

//! Tyre product-detail crawler
//!
//! Walks a flat list of product URLs (spreadsheet column or XML sitemap),
//! extracts tyre attributes from each page, and keeps a resumable on-disk
//! ledger of URL outcomes next to a de-duplicated record store and its CSV
//! export.

pub mod crawling;
pub mod domain;
pub mod infrastructure;

pub use crawling::{Orchestrator, RunReport, RunState};
pub use domain::{LedgerKind, SpecPair, TyreRecord, UrlOutcome};
pub use infrastructure::config::AppConfig;

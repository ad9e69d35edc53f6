//! Run orchestrator
//!
//! Drives one crawl through `Init -> LoadingUrls -> Filtering -> Processing ->
//! FinalFlush -> Reporting -> Done`. Nothing escapes [`Orchestrator::run`]:
//! setup, source and persistence failures are logged and folded into the
//! returned [`RunReport`].

use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{Instrument, debug, error, info, info_span};
use uuid::Uuid;

use super::batch_scheduler::BatchScheduler;
use super::pipeline::UrlPipeline;
use super::scope::TargetScope;
use crate::domain::LedgerKind;
use crate::infrastructure::config::AppConfig;
use crate::infrastructure::http_client::{FetchError, HttpClient, PageFetcher};
use crate::infrastructure::ledger_store::Ledger;
use crate::infrastructure::parsing::TyreDetailParser;
use crate::infrastructure::record_store::RecordStore;
use crate::infrastructure::url_source::UrlSource;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RunState {
    Init,
    LoadingUrls,
    Filtering,
    Processing,
    FinalFlush,
    Reporting,
    Done,
}

/// Aggregate counts of one run
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunReport {
    pub run_id: String,
    /// URLs in the source after de-duplication
    pub universe: usize,
    /// URLs already present in a ledger set
    pub skipped: usize,
    pub pending: usize,
    pub batches: usize,
    pub processed: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub non_matching: usize,
    /// Records appended to the store during this run
    pub new_records: usize,
    pub records_in_store: usize,
    /// The final flush wrote the store but not the export
    pub export_failed: bool,
    pub elapsed: Duration,
    /// Set when the run stopped early
    pub aborted: Option<String>,
}

impl fmt::Display for RunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Run {}", self.run_id)?;
        writeln!(f, "  URLs in source:     {}", self.universe)?;
        writeln!(f, "  Already processed:  {}", self.skipped)?;
        writeln!(f, "  Pending:            {}", self.pending)?;
        writeln!(f, "  Processed:          {} in {} batches", self.processed, self.batches)?;
        writeln!(f, "  Succeeded:          {}", self.succeeded)?;
        writeln!(f, "  Failed:             {}", self.failed)?;
        writeln!(f, "  Non-matching:       {}", self.non_matching)?;
        writeln!(f, "  New records:        {}", self.new_records)?;
        writeln!(f, "  Records in store:   {}", self.records_in_store)?;
        if self.export_failed {
            writeln!(f, "  Export:             not regenerated")?;
        }
        write!(f, "  Elapsed:            {:.1}s", self.elapsed.as_secs_f64())?;
        if let Some(reason) = &self.aborted {
            write!(f, "\n  Aborted:            {reason}")?;
        }
        Ok(())
    }
}

pub struct Orchestrator {
    config: AppConfig,
    fetcher: Arc<dyn PageFetcher>,
    state: RunState,
}

impl Orchestrator {
    pub fn new(config: AppConfig, fetcher: Arc<dyn PageFetcher>) -> Self {
        Self {
            config,
            fetcher,
            state: RunState::Init,
        }
    }

    /// Orchestrator backed by the reqwest [`HttpClient`]
    pub fn from_config(config: AppConfig) -> Result<Self, FetchError> {
        let client = HttpClient::from_settings(&config.crawl)?;
        Ok(Self::new(config, Arc::new(client)))
    }

    pub const fn state(&self) -> RunState {
        self.state
    }

    fn transition(&mut self, next: RunState) {
        debug!("State {:?} -> {:?}", self.state, next);
        self.state = next;
    }

    /// Execute one complete run
    pub async fn run(&mut self) -> RunReport {
        let run_id = Uuid::new_v4().to_string();
        let span = info_span!("run", run_id = %run_id);
        let started = Instant::now();

        let mut report = RunReport {
            run_id,
            ..RunReport::default()
        };

        self.execute(&mut report).instrument(span.clone()).await;

        report.elapsed = started.elapsed();
        span.in_scope(|| {
            self.transition(RunState::Reporting);
            info!(
                universe = report.universe,
                skipped = report.skipped,
                processed = report.processed,
                succeeded = report.succeeded,
                failed = report.failed,
                non_matching = report.non_matching,
                new_records = report.new_records,
                records_in_store = report.records_in_store,
                elapsed_secs = report.elapsed.as_secs_f64(),
                "Run finished"
            );
            self.transition(RunState::Done);
        });

        report
    }

    async fn execute(&mut self, report: &mut RunReport) {
        self.transition(RunState::Init);
        let store = RecordStore::new(&self.config.storage);

        let parser = match TyreDetailParser::with_config(&self.config.extraction) {
            Ok(parser) => parser,
            Err(e) => return abort(report, format!("invalid extraction selectors: {e}")),
        };

        let mut ledger = match Ledger::open(&self.config.storage).await {
            Ok(ledger) => ledger,
            Err(e) => return abort(report, format!("cannot open ledger: {e}")),
        };

        if let Err(e) = store.ensure_exists().await {
            error!("Failed to create record store: {}", e);
        }

        self.transition(RunState::LoadingUrls);
        let universe = match self.load_universe().await {
            Ok(urls) => urls,
            Err(e) => return abort(report, format!("cannot load URLs: {e}")),
        };
        report.universe = universe.len();

        self.transition(RunState::Filtering);
        let pending: Vec<String> = universe
            .into_iter()
            .filter(|url| !ledger.contains_any(url))
            .collect();
        report.pending = pending.len();
        report.skipped = report.universe - report.pending;
        info!(
            "{} URLs pending ({} already in ledger)",
            report.pending, report.skipped
        );

        if pending.is_empty() {
            info!("Nothing left to process");
            report.records_in_store = store.load().await.map(|r| r.len()).unwrap_or_default();
            return;
        }

        self.transition(RunState::Processing);
        let pipeline = UrlPipeline::new(
            Arc::clone(&self.fetcher),
            parser,
            TargetScope::from_settings(&self.config.scope),
            &self.config.retry,
        );
        let scheduler = BatchScheduler::new(pipeline, store.clone(), &self.config.crawl);
        let outcome = scheduler.run(&pending, &mut ledger).await;

        report.batches = outcome.batches;
        report.processed = outcome.processed;
        report.succeeded = outcome.succeeded;
        report.failed = outcome.failed;
        report.non_matching = outcome.non_matching;
        report.new_records = outcome.saved;

        self.transition(RunState::FinalFlush);
        match store.merge_and_flush(&outcome.records, true).await {
            Ok(summary) => {
                report.new_records += summary.added;
                report.records_in_store = summary.total;
                report.export_failed = summary.export_failed;
                for url in &outcome.held_success {
                    ledger.record(LedgerKind::Success, url);
                }
                if let Err(e) = ledger.persist().await {
                    error!("Failed to persist ledger after final flush: {}", e);
                }
            }
            Err(e) => {
                error!(
                    "Final flush failed, {} extracted URLs stay out of the ledger: {}",
                    outcome.held_success.len(),
                    e
                );
                report.records_in_store = store.load().await.map(|r| r.len()).unwrap_or_default();
            }
        }
    }

    async fn load_universe(&self) -> anyhow::Result<Vec<String>> {
        let source = UrlSource::from_settings(&self.config.source)?;
        Ok(source.load(self.fetcher.as_ref()).await?)
    }
}

fn abort(report: &mut RunReport, reason: String) {
    error!("Run aborted: {}", reason);
    report.aborted = Some(reason);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn report_summary_mentions_abort_reason() {
        let report = RunReport {
            run_id: "r1".to_string(),
            aborted: Some("cannot load URLs".to_string()),
            ..RunReport::default()
        };
        let text = report.to_string();
        assert!(text.contains("Run r1"));
        assert!(text.contains("Aborted:            cannot load URLs"));
    }

    #[test]
    fn starts_in_init() {
        let orchestrator = Orchestrator::from_config(AppConfig::default()).unwrap();
        assert_eq!(orchestrator.state(), RunState::Init);
    }
}

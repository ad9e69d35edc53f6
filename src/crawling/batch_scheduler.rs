//! Batch scheduler
//!
//! Splits the pending URLs into consecutive batches, runs every URL of a batch
//! concurrently, and only starts the next batch once all of them settled.
//! Ledger and record store are touched strictly between batches.
//!
//! A success entry reaches the ledger only together with its record: extracted
//! URLs are held back until the save that merges their records succeeds.

use futures::future::join_all;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{error, info};

use super::pipeline::UrlPipeline;
use crate::domain::{LedgerKind, TyreRecord, UrlOutcome};
use crate::infrastructure::config::CrawlSettings;
use crate::infrastructure::ledger_store::Ledger;
use crate::infrastructure::record_store::RecordStore;

/// Consecutive chunks of at most `batch_size` URLs
pub fn plan_batches(urls: &[String], batch_size: usize) -> Vec<&[String]> {
    urls.chunks(batch_size.max(1)).collect()
}

/// Totals of one scheduler run
#[derive(Debug, Clone, Default)]
pub struct SchedulerReport {
    /// Every record extracted this run, in input order
    pub records: Vec<TyreRecord>,
    pub batches: usize,
    pub processed: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub non_matching: usize,
    /// Records appended to the store by interval saves
    pub saved: usize,
    /// Extracted URLs whose records were not saved yet; not in the ledger
    pub held_success: Vec<String>,
}

pub struct BatchScheduler {
    pipeline: UrlPipeline,
    store: RecordStore,
    batch_size: usize,
    batch_delay: Duration,
    save_interval: usize,
}

impl BatchScheduler {
    pub fn new(pipeline: UrlPipeline, store: RecordStore, settings: &CrawlSettings) -> Self {
        Self {
            pipeline,
            store,
            batch_size: settings.batch_size.max(1),
            batch_delay: settings.batch_delay(),
            save_interval: settings.save_interval.max(1),
        }
    }

    pub async fn run(&self, urls: &[String], ledger: &mut Ledger) -> SchedulerReport {
        let batches = plan_batches(urls, self.batch_size);
        let total_batches = batches.len();
        let mut report = SchedulerReport {
            batches: total_batches,
            ..SchedulerReport::default()
        };
        let mut unsaved = Unsaved::default();

        info!(
            "Processing {} URLs in {} batches of up to {}",
            urls.len(),
            total_batches,
            self.batch_size
        );

        for (index, batch) in batches.into_iter().enumerate() {
            info!("Batch {}/{} ({} URLs)", index + 1, total_batches, batch.len());

            let outcomes = join_all(batch.iter().map(|url| self.pipeline.process(url))).await;

            let processed_before = report.processed;
            for (url, outcome) in batch.iter().zip(outcomes) {
                report.processed += 1;
                let kind = outcome.ledger_kind();
                if kind != LedgerKind::Success {
                    ledger.record(kind, url);
                }

                match outcome {
                    UrlOutcome::Extracted(record) => {
                        report.succeeded += 1;
                        unsaved.urls.push(url.clone());
                        unsaved.records.push((*record).clone());
                        report.records.push(*record);
                    }
                    UrlOutcome::Failed { .. } => report.failed += 1,
                    UrlOutcome::NonMatching { .. } => report.non_matching += 1,
                }
            }

            if processed_before / self.save_interval != report.processed / self.save_interval {
                self.save(&mut unsaved, ledger, &mut report).await;
            }

            if let Err(e) = ledger.persist().await {
                error!("Failed to persist ledger after batch {}: {}", index + 1, e);
            }

            info!(
                "Batch {}/{} settled: {} ok, {} failed, {} non-matching so far",
                index + 1,
                total_batches,
                report.succeeded,
                report.failed,
                report.non_matching
            );

            if index + 1 < total_batches && !self.batch_delay.is_zero() {
                sleep(self.batch_delay).await;
            }
        }

        report.held_success = unsaved.urls;
        report
    }

    /// Merge every record not yet saved and release their success entries.
    /// On failure both stay queued for the next save.
    async fn save(
        &self,
        unsaved: &mut Unsaved,
        ledger: &mut Ledger,
        report: &mut SchedulerReport,
    ) {
        if unsaved.urls.is_empty() {
            return;
        }
        match self.store.merge_and_flush(&unsaved.records, false).await {
            Ok(summary) => {
                report.saved += summary.added;
                for url in unsaved.urls.drain(..) {
                    ledger.record(LedgerKind::Success, &url);
                }
                unsaved.records.clear();
            }
            Err(e) => error!(
                "Interval save skipped, {} records stay queued: {}",
                unsaved.records.len(),
                e
            ),
        }
    }
}

/// Extracted records not yet in the store, with the URLs they came from
#[derive(Default)]
struct Unsaved {
    urls: Vec<String>,
    records: Vec<TyreRecord>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn urls(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("https://a.test/{i}")).collect()
    }

    #[test]
    fn twelve_urls_in_batches_of_five() {
        let urls = urls(12);
        let sizes: Vec<_> = plan_batches(&urls, 5).iter().map(|b| b.len()).collect();
        assert_eq!(sizes, vec![5, 5, 2]);
    }

    #[test]
    fn batches_preserve_order() {
        let urls = urls(4);
        let batches = plan_batches(&urls, 3);
        assert_eq!(batches[0][0], "https://a.test/0");
        assert_eq!(batches[1][0], "https://a.test/3");
    }

    #[test]
    fn empty_input_plans_nothing() {
        assert!(plan_batches(&[], 5).is_empty());
    }
}

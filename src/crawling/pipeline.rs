//! Per-URL fetch, extract and retry pipeline

use std::sync::Arc;
use tracing::{debug, info};

use super::retry_policy::{CrawlError, RetryPolicy};
use super::scope::TargetScope;
use crate::domain::{TyreRecord, UrlOutcome};
use crate::infrastructure::config::{NonMatchingPolicy, RetrySettings};
use crate::infrastructure::http_client::PageFetcher;
use crate::infrastructure::parsing::TyreDetailParser;

/// Resolves one URL to a final [`UrlOutcome`]; never fails
pub struct UrlPipeline {
    fetcher: Arc<dyn PageFetcher>,
    parser: TyreDetailParser,
    scope: TargetScope,
    target_policy: RetryPolicy,
    non_target_policy: RetryPolicy,
    non_matching_policy: NonMatchingPolicy,
}

impl UrlPipeline {
    pub fn new(
        fetcher: Arc<dyn PageFetcher>,
        parser: TyreDetailParser,
        scope: TargetScope,
        retry: &RetrySettings,
    ) -> Self {
        Self {
            fetcher,
            parser,
            scope,
            target_policy: RetryPolicy::for_target(retry),
            non_target_policy: RetryPolicy::for_non_target(retry),
            non_matching_policy: retry.non_matching_policy,
        }
    }

    async fn attempt(&self, url: &str) -> Result<TyreRecord, CrawlError> {
        let markup = self.fetcher.fetch(url).await?;
        Ok(self.parser.extract(&markup, url)?)
    }

    pub async fn process(&self, url: &str) -> UrlOutcome {
        let is_target = self.scope.is_target(url);

        if !is_target && self.non_matching_policy == NonMatchingPolicy::Skip {
            debug!("Skipping {} (host outside target scope)", url);
            return UrlOutcome::NonMatching {
                reason: "host outside target scope".to_string(),
            };
        }

        let policy = if is_target {
            &self.target_policy
        } else {
            &self.non_target_policy
        };

        match policy.run(url, |_| self.attempt(url)).await {
            Ok(record) => {
                debug!("Extracted {} ({})", url, record.name);
                UrlOutcome::Extracted(Box::new(record))
            }
            Err(exhausted) if is_target => {
                info!(
                    "Marking {} as failed after {} attempts: {}",
                    url, exhausted.attempts, exhausted.error
                );
                UrlOutcome::Failed {
                    reason: exhausted.error.reason(),
                    attempts: exhausted.attempts,
                }
            }
            Err(exhausted) => {
                info!("Marking {} as non-matching: {}", url, exhausted.error);
                UrlOutcome::NonMatching {
                    reason: exhausted.error.reason(),
                }
            }
        }
    }
}

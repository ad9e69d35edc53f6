//! Crawl job runner: scope predicate, retry policy, per-URL pipeline, batch
//! scheduler and the run orchestrator

pub mod batch_scheduler;
pub mod orchestrator;
pub mod pipeline;
pub mod retry_policy;
pub mod scope;

pub use batch_scheduler::{BatchScheduler, SchedulerReport, plan_batches};
pub use orchestrator::{Orchestrator, RunReport, RunState};
pub use pipeline::UrlPipeline;
pub use retry_policy::{CrawlError, RetryExhausted, RetryPolicy};
pub use scope::TargetScope;

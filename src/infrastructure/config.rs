//! Configuration infrastructure
//!
//! One `AppConfig` value is built at startup and handed by reference to every
//! component. Values are layered with the `config` crate:
//! 1. Built-in defaults (see [`defaults`])
//! 2. An optional config file (TOML, JSON or YAML, picked by extension)
//! 3. Environment variables prefixed with `TYRE_CRAWLER_`, using `__` between
//!    section and key (e.g. `TYRE_CRAWLER_CRAWL__BATCH_SIZE=10`)

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::info;

/// Environment variable prefix for configuration overrides
pub const ENV_PREFIX: &str = "TYRE_CRAWLER";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to load configuration: {source}")]
    Load {
        #[from]
        source: config::ConfigError,
    },

    #[error("Configuration validation failed: {message}")]
    Validation { message: String },
}

impl ConfigError {
    fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }
}

/// Complete application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub crawl: CrawlSettings,
    pub retry: RetrySettings,
    pub scope: ScopeSettings,
    pub source: SourceSettings,
    pub storage: StorageSettings,
    pub extraction: ExtractionSettings,
    pub logging: LoggingConfig,
}

/// Batch scheduling and HTTP settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CrawlSettings {
    /// Number of URLs fetched concurrently per batch
    pub batch_size: usize,

    /// Pause between consecutive batches in milliseconds
    pub batch_delay_ms: u64,

    /// Merge pending records into the store every time this many URLs have
    /// been processed. Success entries reach the ledger with that merge.
    pub save_interval: usize,

    /// Per-request timeout in seconds
    pub request_timeout_secs: u64,

    /// Identification header sent with every request
    pub user_agent: String,
}

/// What to do with URLs outside the target domain
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NonMatchingPolicy {
    /// Fetch with the reduced retry budget; classify non-matching only on failure
    Attempt,
    /// Classify non-matching immediately without any network call
    Skip,
}

/// Retry budgets and backoff base
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrySettings {
    /// Linear backoff unit: attempt `n` waits `base_delay_ms * n`
    pub base_delay_ms: u64,

    /// Extra attempts for URLs on an allowed host
    pub target_max_retries: u32,

    /// Extra attempts for every other URL
    pub non_target_max_retries: u32,

    pub non_matching_policy: NonMatchingPolicy,
}

/// Target-domain allow-list
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScopeSettings {
    /// Exact hostnames accepted as in-scope
    pub allowed_hosts: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    Spreadsheet,
    Sitemap,
}

/// Where the URL universe comes from
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceSettings {
    pub kind: SourceKind,

    /// Spreadsheet path (`.csv` or `.tsv`)
    pub path: Option<PathBuf>,

    /// Column holding the URLs, matched case-insensitively
    pub column: String,

    /// Remote sitemap document
    pub sitemap_url: Option<String>,
}

/// Persistence file locations
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageSettings {
    pub data_dir: PathBuf,
    pub records_file: String,
    pub export_file: String,
    pub success_file: String,
    pub failed_file: String,
    pub non_matching_file: String,

    /// Regenerate the tabular export every time the store grows past a multiple of this
    pub export_interval: usize,
}

/// Extraction tuning and selector fallback chains.
///
/// Each selector string is a CSS selector, optionally followed by `@attr` to
/// read an attribute instead of the element text, or `re:<pattern>` to take
/// the first regex match in the page text.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionSettings {
    /// Fixed amount subtracted from the listed price
    pub discount_offset: f64,
    pub selectors: FieldSelectors,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FieldSelectors {
    pub name: Vec<String>,
    pub size: Vec<String>,
    pub price: Vec<String>,
    pub country: Vec<String>,
    pub load_speed_index: Vec<String>,
    pub pattern: Vec<String>,
    pub year: Vec<String>,
    pub warranty: Vec<String>,
    pub image: Vec<String>,
    /// Containers (tables or definition lists) holding specification rows
    pub spec_rows: Vec<String>,
}

/// Logging configuration settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: "error", "warn", "info", "debug", "trace"
    pub level: String,

    /// Enable JSON formatted file logs
    pub json_format: bool,

    /// Log to stderr
    pub console_output: bool,

    /// Log to `log_dir/file_name`
    pub file_output: bool,

    pub log_dir: PathBuf,
    pub file_name: String,
}

/// Default configuration values
pub mod defaults {
    pub const BATCH_SIZE: usize = 5;
    pub const BATCH_DELAY_MS: u64 = 2000;
    pub const SAVE_INTERVAL: usize = 10;
    pub const REQUEST_TIMEOUT_SECONDS: u64 = 30;
    pub const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36";

    pub const RETRY_BASE_DELAY_MS: u64 = 1000;
    pub const TARGET_MAX_RETRIES: u32 = 3;
    pub const NON_TARGET_MAX_RETRIES: u32 = 0;

    pub const URL_COLUMN: &str = "url";

    pub const DATA_DIR: &str = "data";
    pub const RECORDS_FILE: &str = "records.json";
    pub const EXPORT_FILE: &str = "records.csv";
    pub const SUCCESS_FILE: &str = "success_urls.json";
    pub const FAILED_FILE: &str = "failed_urls.json";
    pub const NON_MATCHING_FILE: &str = "non_matching_urls.json";
    pub const EXPORT_INTERVAL: usize = 50;

    pub const DISCOUNT_OFFSET: f64 = 5.0;

    pub const LOG_LEVEL: &str = "info";
    pub const LOG_JSON_FORMAT: bool = false;
    pub const LOG_CONSOLE_OUTPUT: bool = true;
    pub const LOG_FILE_OUTPUT: bool = true;
    pub const LOG_DIR: &str = "logs";
    pub const LOG_FILE_NAME: &str = "tyre-crawler.log";
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| (*s).to_string()).collect()
}

impl Default for CrawlSettings {
    fn default() -> Self {
        Self {
            batch_size: defaults::BATCH_SIZE,
            batch_delay_ms: defaults::BATCH_DELAY_MS,
            save_interval: defaults::SAVE_INTERVAL,
            request_timeout_secs: defaults::REQUEST_TIMEOUT_SECONDS,
            user_agent: defaults::USER_AGENT.to_string(),
        }
    }
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            base_delay_ms: defaults::RETRY_BASE_DELAY_MS,
            target_max_retries: defaults::TARGET_MAX_RETRIES,
            non_target_max_retries: defaults::NON_TARGET_MAX_RETRIES,
            non_matching_policy: NonMatchingPolicy::Attempt,
        }
    }
}

impl Default for ScopeSettings {
    fn default() -> Self {
        Self {
            allowed_hosts: strings(&["www.tyremarket.ae", "tyremarket.ae"]),
        }
    }
}

impl Default for SourceSettings {
    fn default() -> Self {
        Self {
            kind: SourceKind::Spreadsheet,
            path: Some(PathBuf::from("urls.csv")),
            column: defaults::URL_COLUMN.to_string(),
            sitemap_url: None,
        }
    }
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from(defaults::DATA_DIR),
            records_file: defaults::RECORDS_FILE.to_string(),
            export_file: defaults::EXPORT_FILE.to_string(),
            success_file: defaults::SUCCESS_FILE.to_string(),
            failed_file: defaults::FAILED_FILE.to_string(),
            non_matching_file: defaults::NON_MATCHING_FILE.to_string(),
            export_interval: defaults::EXPORT_INTERVAL,
        }
    }
}

impl Default for ExtractionSettings {
    fn default() -> Self {
        Self {
            discount_offset: defaults::DISCOUNT_OFFSET,
            selectors: FieldSelectors::default(),
        }
    }
}

impl Default for FieldSelectors {
    fn default() -> Self {
        Self {
            name: strings(&[
                "h1.product_title",
                "h1.product-title",
                ".product-name h1",
                "h1",
                "meta[property='og:title']@content",
            ]),
            size: strings(&[
                ".tyre-size",
                ".product-size",
                "[itemprop='size']",
                ".woocommerce-product-attributes-item--attribute_pa_size td",
                "[data-size]@data-size",
            ]),
            price: strings(&[
                ".summary .price ins .amount",
                ".summary .price .amount",
                ".product-price",
                "meta[property='product:price:amount']@content",
                "[itemprop='price']@content",
            ]),
            country: strings(&[
                ".country-of-origin",
                ".woocommerce-product-attributes-item--attribute_pa_country td",
                "[data-country]@data-country",
            ]),
            load_speed_index: strings(&[
                ".load-speed-index",
                ".woocommerce-product-attributes-item--attribute_pa_load-speed-index td",
            ]),
            pattern: strings(&[
                ".tyre-pattern",
                ".woocommerce-product-attributes-item--attribute_pa_pattern td",
            ]),
            year: strings(&[
                ".manufacture-year",
                ".woocommerce-product-attributes-item--attribute_pa_year td",
            ]),
            warranty: strings(&[
                ".warranty",
                ".woocommerce-product-attributes-item--attribute_pa_warranty td",
            ]),
            image: strings(&[
                ".woocommerce-product-gallery__image img@src",
                "img.wp-post-image@src",
                "meta[property='og:image']@content",
            ]),
            spec_rows: strings(&[
                "table.woocommerce-product-attributes",
                "table.specifications",
                ".product-specs table",
                "dl.specifications",
            ]),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: defaults::LOG_LEVEL.to_string(),
            json_format: defaults::LOG_JSON_FORMAT,
            console_output: defaults::LOG_CONSOLE_OUTPUT,
            file_output: defaults::LOG_FILE_OUTPUT,
            log_dir: PathBuf::from(defaults::LOG_DIR),
            file_name: defaults::LOG_FILE_NAME.to_string(),
        }
    }
}

impl CrawlSettings {
    pub const fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub const fn batch_delay(&self) -> Duration {
        Duration::from_millis(self.batch_delay_ms)
    }
}

impl RetrySettings {
    pub const fn base_delay(&self) -> Duration {
        Duration::from_millis(self.base_delay_ms)
    }
}

impl StorageSettings {
    pub fn records_path(&self) -> PathBuf {
        self.data_dir.join(&self.records_file)
    }

    pub fn export_path(&self) -> PathBuf {
        self.data_dir.join(&self.export_file)
    }

    pub fn success_path(&self) -> PathBuf {
        self.data_dir.join(&self.success_file)
    }

    pub fn failed_path(&self) -> PathBuf {
        self.data_dir.join(&self.failed_file)
    }

    pub fn non_matching_path(&self) -> PathBuf {
        self.data_dir.join(&self.non_matching_file)
    }
}

impl AppConfig {
    /// Load defaults, then `path` (if given and present), then environment overrides
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut builder =
            config::Config::builder().add_source(config::Config::try_from(&Self::default())?);

        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path).required(false));
        }

        let settings = builder
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("scope.allowed_hosts")
                    .try_parsing(true),
            )
            .build()?;

        let config: Self = settings.try_deserialize()?;
        config.validate()?;

        if let Some(path) = path {
            info!("Loaded configuration (file: {:?})", path);
        }
        Ok(config)
    }

    /// Reject settings that would make a run meaningless
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.crawl.batch_size == 0 {
            return Err(ConfigError::validation("crawl.batch_size must be greater than 0"));
        }

        if self.crawl.request_timeout_secs == 0 {
            return Err(ConfigError::validation(
                "crawl.request_timeout_secs must be greater than 0",
            ));
        }

        if self.crawl.save_interval == 0 {
            return Err(ConfigError::validation("crawl.save_interval must be greater than 0"));
        }

        if self.storage.export_interval == 0 {
            return Err(ConfigError::validation(
                "storage.export_interval must be greater than 0",
            ));
        }

        if self.scope.allowed_hosts.iter().all(|h| h.trim().is_empty()) {
            return Err(ConfigError::validation(
                "scope.allowed_hosts must name at least one host",
            ));
        }

        match self.source.kind {
            SourceKind::Spreadsheet if self.source.path.is_none() => Err(ConfigError::validation(
                "source.path is required for a spreadsheet source",
            )),
            SourceKind::Sitemap if self.source.sitemap_url.is_none() => Err(
                ConfigError::validation("source.sitemap_url is required for a sitemap source"),
            ),
            _ => Ok(()),
        }
    }
}

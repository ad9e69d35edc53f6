//! Infrastructure layer: configuration, logging, HTTP, HTML extraction,
//! URL sources and file persistence

pub mod atomic_write;
pub mod config;
pub mod http_client;
pub mod ledger_store;
pub mod logging;
pub mod parsing;
pub mod parsing_error;
pub mod persistence_error;
pub mod record_store;
pub mod url_source;

pub use config::{AppConfig, ConfigError};
pub use http_client::{FetchError, HttpClient, PageFetcher};
pub use ledger_store::Ledger;
pub use logging::init_logging;
pub use parsing::{ParsingError, ParsingResult, TyreDetailParser};
pub use persistence_error::{PersistenceError, PersistenceResult};
pub use record_store::{FlushSummary, RecordStore};
pub use url_source::{UrlSource, UrlSourceError};

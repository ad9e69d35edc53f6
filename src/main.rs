use std::path::PathBuf;

use tracing::error;
use tyre_crawler_lib::infrastructure::logging::init_logging;
use tyre_crawler_lib::{AppConfig, Orchestrator};

const DEFAULT_CONFIG_FILE: &str = "crawler.toml";

/// Startup failures are reported; the exit status stays the default success.
#[tokio::main]
async fn main() {
    let config_path = std::env::args()
        .nth(1)
        .map_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE), PathBuf::from);

    let config = match AppConfig::load(Some(&config_path)) {
        Ok(config) => config,
        Err(e) => {
            // logging is not initialized yet
            eprintln!(
                "Failed to load configuration from {}: {e}",
                config_path.display()
            );
            return;
        }
    };

    if let Err(e) = init_logging(&config.logging) {
        eprintln!("Failed to initialize logging: {e}");
    }

    let mut orchestrator = match Orchestrator::from_config(config) {
        Ok(orchestrator) => orchestrator,
        Err(e) => {
            error!("Failed to create HTTP client: {}", e);
            return;
        }
    };

    let report = orchestrator.run().await;
    println!("{report}");
}

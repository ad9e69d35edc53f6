//! Shared fixtures for integration tests: a scripted in-memory fetcher and
//! config builders rooted in a temp directory

#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Mutex;
use std::time::Duration;

use tyre_crawler_lib::infrastructure::config::{AppConfig, SourceKind};
use tyre_crawler_lib::infrastructure::http_client::{FetchError, PageFetcher};

pub const HOST: &str = "shop.test";

pub fn url(path: &str) -> String {
    format!("https://{HOST}/{path}")
}

pub fn product_page(name: &str, size: &str) -> String {
    format!(
        r#"<html><body>
            <h1 class="product_title">{name}</h1>
            <div class="summary"><p class="price"><span class="amount">AED 410.00</span></p></div>
            <table class="woocommerce-product-attributes">
                <tr><th>Size</th><td>{size}</td></tr>
                <tr><th>Country of Origin</th><td>Thailand</td></tr>
            </table>
        </body></html>"#
    )
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchEvent {
    Started(String),
    Finished(String),
}

#[derive(Debug, Clone)]
enum Script {
    Page(String),
    Status(u16),
    /// Fail with 503 this many times, then serve the page
    Flaky(u32, String),
}

#[derive(Default)]
pub struct ScriptedFetcher {
    scripts: HashMap<String, Script>,
    latency: HashMap<String, Duration>,
    calls: Mutex<HashMap<String, u32>>,
    events: Mutex<Vec<FetchEvent>>,
}

impl ScriptedFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn page(mut self, url: &str, html: impl Into<String>) -> Self {
        self.scripts.insert(url.to_string(), Script::Page(html.into()));
        self
    }

    pub fn status(mut self, url: &str, status: u16) -> Self {
        self.scripts.insert(url.to_string(), Script::Status(status));
        self
    }

    pub fn flaky(mut self, url: &str, failures: u32, html: impl Into<String>) -> Self {
        self.scripts
            .insert(url.to_string(), Script::Flaky(failures, html.into()));
        self
    }

    pub fn latency(mut self, url: &str, latency: Duration) -> Self {
        self.latency.insert(url.to_string(), latency);
        self
    }

    pub fn calls(&self, url: &str) -> u32 {
        self.calls.lock().unwrap().get(url).copied().unwrap_or(0)
    }

    pub fn total_calls(&self) -> u32 {
        self.calls.lock().unwrap().values().sum()
    }

    pub fn events(&self) -> Vec<FetchEvent> {
        self.events.lock().unwrap().clone()
    }
}

#[async_trait]
impl PageFetcher for ScriptedFetcher {
    async fn fetch(&self, url: &str) -> Result<String, FetchError> {
        let call = {
            let mut calls = self.calls.lock().unwrap();
            let count = calls.entry(url.to_string()).or_insert(0);
            *count += 1;
            *count
        };
        self.events
            .lock()
            .unwrap()
            .push(FetchEvent::Started(url.to_string()));

        if let Some(latency) = self.latency.get(url) {
            tokio::time::sleep(*latency).await;
        }

        let result = match self.scripts.get(url) {
            Some(Script::Page(html)) => Ok(html.clone()),
            Some(Script::Flaky(failures, html)) if call > *failures => Ok(html.clone()),
            Some(Script::Flaky(..)) => Err(FetchError::Status {
                status: 503,
                url: url.to_string(),
            }),
            Some(Script::Status(status)) => Err(FetchError::Status {
                status: *status,
                url: url.to_string(),
            }),
            None => Err(FetchError::Status {
                status: 404,
                url: url.to_string(),
            }),
        };

        self.events
            .lock()
            .unwrap()
            .push(FetchEvent::Finished(url.to_string()));
        result
    }
}

/// Config with all files under `dir`, reading `urls` from a CSV there
pub fn test_config(dir: &Path, urls: &[String]) -> AppConfig {
    let source = dir.join("urls.csv");
    let mut csv = String::from("Product,URL\n");
    for (i, url) in urls.iter().enumerate() {
        csv.push_str(&format!("item {i},{url}\n"));
    }
    std::fs::write(&source, csv).unwrap();

    let mut config = AppConfig::default();
    config.source.kind = SourceKind::Spreadsheet;
    config.source.path = Some(source);
    config.scope.allowed_hosts = vec![HOST.to_string()];
    config.storage.data_dir = dir.join("data");
    config.crawl.batch_delay_ms = 500;
    config.retry.base_delay_ms = 100;
    config.logging.file_output = false;
    config
}

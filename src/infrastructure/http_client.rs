//! HTTP client for fetching product detail pages
//!
//! One GET per call with a fixed identification header and a per-request
//! timeout. Any non-2xx status, transport failure or timeout becomes a
//! [`FetchError`]; nothing else happens besides the network call.

use async_trait::async_trait;
use reqwest::{
    Client,
    header::{ACCEPT, ACCEPT_LANGUAGE, HeaderMap, HeaderValue, USER_AGENT},
};
use std::time::Duration;
use thiserror::Error;

use crate::infrastructure::config::CrawlSettings;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    #[error("Request timed out: {url}")]
    Timeout { url: String },

    #[error("HTTP request failed with status {status}: {url}")]
    Status { status: u16, url: String },

    #[error("Failed to fetch URL {url}: {message}")]
    Transport { url: String, message: String },

    #[error("Failed to read response body from {url}: {message}")]
    Body { url: String, message: String },

    #[error("HTTP client setup failed: {0}")]
    Setup(String),
}

impl FetchError {
    /// Short reason recorded when a URL ends up classified as failed
    pub fn reason(&self) -> String {
        match self {
            Self::Timeout { .. } => "timeout".to_string(),
            Self::Status { status, .. } => format!("HTTP {status}"),
            Self::Transport { message, .. } | Self::Body { message, .. } => message.clone(),
            Self::Setup(message) => message.clone(),
        }
    }

    fn from_reqwest(url: &str, error: &reqwest::Error) -> Self {
        if error.is_timeout() {
            Self::Timeout {
                url: url.to_string(),
            }
        } else if let Some(status) = error.status() {
            Self::Status {
                status: status.as_u16(),
                url: url.to_string(),
            }
        } else {
            Self::Transport {
                url: url.to_string(),
                message: error.to_string(),
            }
        }
    }
}

/// Fetches raw markup for a URL
#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<String, FetchError>;
}

/// reqwest-backed [`PageFetcher`]
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Client,
    timeout: Duration,
}

impl HttpClient {
    /// Create a client with the given identification header and request timeout
    pub fn new(user_agent: &str, timeout: Duration) -> Result<Self, FetchError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(user_agent)
                .map_err(|e| FetchError::Setup(format!("Invalid user agent: {e}")))?,
        );
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8"),
        );
        headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.9"));

        let client = Client::builder()
            .timeout(timeout)
            .default_headers(headers)
            .redirect(reqwest::redirect::Policy::limited(10))
            .build()
            .map_err(|e| FetchError::Setup(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self { client, timeout })
    }

    pub fn from_settings(settings: &CrawlSettings) -> Result<Self, FetchError> {
        Self::new(&settings.user_agent, settings.request_timeout())
    }

    pub const fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Fetch URL and return the body as text
    pub async fn get_text(&self, url: &str) -> Result<String, FetchError> {
        tracing::debug!("Fetching URL: {}", url);

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| FetchError::from_reqwest(url, &e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        let text = response.text().await.map_err(|e| {
            if e.is_timeout() {
                FetchError::Timeout {
                    url: url.to_string(),
                }
            } else {
                FetchError::Body {
                    url: url.to_string(),
                    message: e.to_string(),
                }
            }
        })?;

        tracing::debug!(
            "Successfully fetched: {} ({}, {} chars)",
            url,
            status,
            text.len()
        );
        Ok(text)
    }
}

#[async_trait]
impl PageFetcher for HttpClient {
    async fn fetch(&self, url: &str) -> Result<String, FetchError> {
        self.get_text(url).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_creation_from_defaults() {
        let client = HttpClient::from_settings(&CrawlSettings::default());
        assert!(client.is_ok());
        assert_eq!(client.unwrap().timeout(), Duration::from_secs(30));
    }

    #[test]
    fn invalid_user_agent_is_rejected() {
        let result = HttpClient::new("bad\nagent", Duration::from_secs(5));
        assert!(matches!(result, Err(FetchError::Setup(_))));
    }

    #[test]
    fn reasons_are_short() {
        let status = FetchError::Status {
            status: 503,
            url: "https://example.com/a".to_string(),
        };
        assert_eq!(status.reason(), "HTTP 503");

        let timeout = FetchError::Timeout {
            url: "https://example.com/b".to_string(),
        };
        assert_eq!(timeout.reason(), "timeout");
    }

    #[tokio::test]
    async fn unreachable_host_is_a_transport_error() {
        let client = HttpClient::new("tyre-crawler-test", Duration::from_secs(2)).unwrap();
        let result = client.fetch("http://127.0.0.1:9/never").await;
        assert!(matches!(
            result,
            Err(FetchError::Transport { .. } | FetchError::Timeout { .. })
        ));
    }
}

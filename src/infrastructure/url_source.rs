//! URL universe loading: a column of a CSV/TSV spreadsheet, or a remote XML sitemap

use quick_xml::Reader;
use quick_xml::events::Event as XmlEvent;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{info, warn};

use super::config::{SourceKind, SourceSettings};
use super::http_client::{FetchError, PageFetcher};

#[derive(Error, Debug)]
pub enum UrlSourceError {
    #[error("Unsupported spreadsheet extension for {path:?} (expected .csv or .tsv)")]
    UnsupportedExtension { path: PathBuf },

    #[error("Column '{column}' not found in {path:?}")]
    MissingColumn { column: String, path: PathBuf },

    #[error("Failed to read URL source {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed spreadsheet {path:?}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("Failed to fetch sitemap: {0}")]
    Fetch(#[from] FetchError),

    #[error("Malformed sitemap {url}: {message}")]
    Xml { url: String, message: String },

    #[error("Source is not configured: {0}")]
    NotConfigured(&'static str),
}

/// Where the URL universe comes from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UrlSource {
    Spreadsheet { path: PathBuf, column: String },
    Sitemap { url: String },
}

impl UrlSource {
    pub fn from_settings(settings: &SourceSettings) -> Result<Self, UrlSourceError> {
        match settings.kind {
            SourceKind::Spreadsheet => Ok(Self::Spreadsheet {
                path: settings
                    .path
                    .clone()
                    .ok_or(UrlSourceError::NotConfigured("source.path"))?,
                column: settings.column.clone(),
            }),
            SourceKind::Sitemap => Ok(Self::Sitemap {
                url: settings
                    .sitemap_url
                    .clone()
                    .ok_or(UrlSourceError::NotConfigured("source.sitemap_url"))?,
            }),
        }
    }

    /// Load every URL, de-duplicated with first occurrence kept
    pub async fn load(&self, fetcher: &dyn PageFetcher) -> Result<Vec<String>, UrlSourceError> {
        let urls = match self {
            Self::Spreadsheet { path, column } => read_spreadsheet(path, column).await?,
            Self::Sitemap { url } => fetch_sitemap(fetcher, url).await?,
        };
        let urls = dedup_preserving_order(urls);
        info!("Loaded {} unique URLs from {}", urls.len(), self);
        Ok(urls)
    }
}

impl std::fmt::Display for UrlSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Spreadsheet { path, column } => {
                write!(f, "{} (column '{}')", path.display(), column)
            }
            Self::Sitemap { url } => write!(f, "sitemap {url}"),
        }
    }
}

/// Read the `column` values of a `.csv` or `.tsv` file that look like HTTP(S) URLs
pub async fn read_spreadsheet(path: &Path, column: &str) -> Result<Vec<String>, UrlSourceError> {
    let delimiter = match path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase)
        .as_deref()
    {
        Some("csv") => b',',
        Some("tsv") => b'\t',
        _ => {
            return Err(UrlSourceError::UnsupportedExtension {
                path: path.to_path_buf(),
            });
        }
    };

    let bytes = tokio::fs::read(path).await.map_err(|source| UrlSourceError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let csv_error = |source| UrlSourceError::Csv {
        path: path.to_path_buf(),
        source,
    };

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .flexible(true)
        .from_reader(bytes.as_slice());

    let index = reader
        .headers()
        .map_err(csv_error)?
        .iter()
        .position(|header| header.trim().eq_ignore_ascii_case(column.trim()))
        .ok_or_else(|| UrlSourceError::MissingColumn {
            column: column.to_string(),
            path: path.to_path_buf(),
        })?;

    let mut urls = Vec::new();
    for row in reader.records() {
        let row = row.map_err(csv_error)?;
        if let Some(value) = row.get(index).map(str::trim) {
            if value.starts_with("http") {
                urls.push(value.to_string());
            }
        }
    }
    Ok(urls)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SitemapKind {
    UrlSet,
    Index,
}

/// `loc` entries of one sitemap document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SitemapDocument {
    pub kind: SitemapKind,
    pub locs: Vec<String>,
}

/// Parse a `<urlset>` or `<sitemapindex>` document
pub fn parse_sitemap(url: &str, xml: &[u8]) -> Result<SitemapDocument, UrlSourceError> {
    let xml_error = |message: String| UrlSourceError::Xml {
        url: url.to_string(),
        message,
    };

    let mut reader = Reader::from_reader(xml);
    reader.trim_text(true);

    let mut buf = Vec::new();
    let mut open: Vec<Vec<u8>> = Vec::new();
    let mut current: Option<String> = None;
    let mut kind = None;
    let mut locs = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(XmlEvent::Start(e)) => {
                let local = e.local_name();
                match local.as_ref() {
                    b"urlset" if open.is_empty() => {
                        kind.get_or_insert(SitemapKind::UrlSet);
                    }
                    b"sitemapindex" if open.is_empty() => {
                        kind.get_or_insert(SitemapKind::Index);
                    }
                    b"loc" if is_entry(open.last()) => current = Some(String::new()),
                    _ => {}
                }
                open.push(local.as_ref().to_vec());
            }
            Ok(XmlEvent::End(_)) => {
                if open.pop().as_deref() == Some(b"loc".as_slice()) {
                    if let Some(loc) = current.take() {
                        let loc = loc.trim();
                        if !loc.is_empty() {
                            locs.push(loc.to_string());
                        }
                    }
                }
            }
            Ok(XmlEvent::Text(t)) => {
                if let Some(loc) = current.as_mut() {
                    loc.push_str(&t.unescape().map_err(|e| xml_error(e.to_string()))?);
                }
            }
            Ok(XmlEvent::CData(c)) => {
                if let Some(loc) = current.as_mut() {
                    loc.push_str(&String::from_utf8_lossy(&c.into_inner()));
                }
            }
            Ok(XmlEvent::Eof) => break,
            Err(e) => {
                return Err(xml_error(format!(
                    "{e} at position {}",
                    reader.buffer_position()
                )));
            }
            _ => {}
        }
        buf.clear();
    }

    let kind = kind.ok_or_else(|| xml_error("no <urlset> or <sitemapindex> element".to_string()))?;
    Ok(SitemapDocument { kind, locs })
}

/// Fetch a sitemap; an index is followed one level deep
pub async fn fetch_sitemap(
    fetcher: &dyn PageFetcher,
    url: &str,
) -> Result<Vec<String>, UrlSourceError> {
    let body = fetcher.fetch(url).await?;
    let document = parse_sitemap(url, body.as_bytes())?;

    match document.kind {
        SitemapKind::UrlSet => Ok(document.locs),
        SitemapKind::Index => {
            info!("Sitemap index {} lists {} child sitemaps", url, document.locs.len());
            let mut urls = Vec::new();
            for child in &document.locs {
                let body = fetcher.fetch(child).await?;
                let child_document = parse_sitemap(child, body.as_bytes())?;
                if child_document.kind == SitemapKind::Index {
                    warn!("Nested sitemap index {} is not followed", child);
                    continue;
                }
                urls.extend(child_document.locs);
            }
            Ok(urls)
        }
    }
}

/// `<loc>` only names a page when it sits directly in a `<url>` or `<sitemap>` entry
fn is_entry(parent: Option<&Vec<u8>>) -> bool {
    matches!(parent.map(Vec::as_slice), Some(b"url" | b"sitemap"))
}

/// Drop repeated URLs, keeping the first occurrence of each
pub fn dedup_preserving_order(urls: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::with_capacity(urls.len());
    urls.into_iter().filter(|url| seen.insert(url.clone())).collect()
}

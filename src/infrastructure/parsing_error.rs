//! Parsing error types for product detail extraction

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParsingError {
    /// Neither product name nor size could be resolved after every fallback
    #[error("Extraction incomplete for {url}: mandatory fields (name, size) are empty")]
    ExtractionIncomplete { url: String },

    #[error("Invalid CSS selector for {field}: {selector} - {reason}")]
    InvalidSelector {
        field: String,
        selector: String,
        reason: String,
    },
}

impl ParsingError {
    pub fn extraction_incomplete(url: &str) -> Self {
        Self::ExtractionIncomplete {
            url: url.to_string(),
        }
    }

    pub fn invalid_selector(field: &str, selector: &str, reason: impl ToString) -> Self {
        Self::InvalidSelector {
            field: field.to_string(),
            selector: selector.to_string(),
            reason: reason.to_string(),
        }
    }
}

pub type ParsingResult<T> = Result<T, ParsingError>;

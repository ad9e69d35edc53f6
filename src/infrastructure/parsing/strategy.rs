//! Ordered extraction strategies for a single field.
//!
//! A strategy is a pure function of the parsed page: it either yields a
//! non-empty, whitespace-normalized value or nothing. A [`FieldChain`] tries
//! its strategies in order and keeps the first hit.

use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use tracing::trace;

use super::{ParsingError, ParsingResult};

#[derive(Debug, Clone)]
pub enum FieldStrategy {
    /// Text content of the first matching element with non-empty text
    Text(Selector),
    /// Attribute of the first matching element carrying a non-empty value
    Attribute(Selector, String),
    /// First match of a pattern in the page's visible text
    Pattern(Regex),
}

impl FieldStrategy {
    /// Parse `css`, `css@attr` or `re:<pattern>` into a strategy
    pub fn parse(field: &str, spec: &str) -> ParsingResult<Self> {
        if let Some(pattern) = spec.strip_prefix("re:") {
            return Regex::new(pattern)
                .map(Self::Pattern)
                .map_err(|e| ParsingError::invalid_selector(field, spec, e));
        }

        let (css, attribute) = match spec.rsplit_once('@') {
            Some((css, attr)) if !attr.is_empty() && !attr.contains([']', ' ']) => {
                (css.trim(), Some(attr.trim()))
            }
            _ => (spec.trim(), None),
        };

        let selector = Selector::parse(css)
            .map_err(|e| ParsingError::invalid_selector(field, spec, format!("{e:?}")))?;

        Ok(match attribute {
            Some(attr) => Self::Attribute(selector, attr.to_string()),
            None => Self::Text(selector),
        })
    }

    pub fn apply(&self, html: &Html) -> Option<String> {
        match self {
            Self::Text(selector) => html
                .select(selector)
                .map(element_text)
                .find(|text| !text.is_empty()),
            Self::Attribute(selector, attr) => html
                .select(selector)
                .filter_map(|element| element.value().attr(attr))
                .map(normalize_whitespace)
                .find(|value| !value.is_empty()),
            Self::Pattern(regex) => {
                let text = element_text(html.root_element());
                regex
                    .find_iter(&text)
                    .map(|m| m.as_str().trim())
                    .find(|value| !value.is_empty())
                    .map(str::to_string)
            }
        }
    }
}

/// Ordered fallback list for one field
#[derive(Debug, Clone)]
pub struct FieldChain {
    field: String,
    strategies: Vec<FieldStrategy>,
}

impl FieldChain {
    pub fn compile(field: &str, specs: &[String]) -> ParsingResult<Self> {
        let strategies = specs
            .iter()
            .map(|spec| FieldStrategy::parse(field, spec))
            .collect::<ParsingResult<Vec<_>>>()?;

        Ok(Self {
            field: field.to_string(),
            strategies,
        })
    }

    /// First non-empty result across the chain
    pub fn resolve(&self, html: &Html) -> Option<String> {
        self.strategies.iter().enumerate().find_map(|(i, strategy)| {
            let value = strategy.apply(html)?;
            trace!("Extracted {} using strategy {}: {}", self.field, i, value);
            Some(value)
        })
    }
}

/// Collapse runs of whitespace into single spaces and trim
pub fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

pub fn element_text(element: ElementRef<'_>) -> String {
    normalize_whitespace(&element.text().collect::<Vec<_>>().join(" "))
}

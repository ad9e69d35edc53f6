//! Product detail parser for tyre pages
//!
//! Every field is resolved through an ordered chain of selector strategies,
//! then through the page's specification rows, and (for size) through a
//! pattern scan of the product name and specification values. Derived fields
//! are computed from the resolved text afterwards.

use scraper::{ElementRef, Html, Selector};
use tracing::{debug, warn};
use url::Url;

use super::strategy::{FieldChain, element_text};
use super::{ParsingError, ParsingResult};
use crate::domain::derived::{brand_from_name, discounted_price, find_size_designator, parse_size};
use crate::domain::{SpecPair, TyreRecord};
use crate::infrastructure::config::{ExtractionSettings, FieldSelectors};

const SIZE_LABELS: &[&str] = &["size", "tyre size", "tire size"];
const COUNTRY_LABELS: &[&str] = &["country of origin", "country", "origin", "made in"];
const LOAD_SPEED_LABELS: &[&str] = &[
    "load/speed index",
    "load speed index",
    "load index",
    "speed rating",
];
const PATTERN_LABELS: &[&str] = &["pattern", "tread pattern", "model"];
const YEAR_LABELS: &[&str] = &[
    "year",
    "year of manufacture",
    "manufacture year",
    "manufacturing year",
];
const WARRANTY_LABELS: &[&str] = &["warranty"];

/// Values shown by shops when an attribute is unknown
const PLACEHOLDER_VALUES: &[&str] = &["-", "--", "n/a", "na", "tbd"];

/// Parser for extracting tyre attributes from product detail pages
#[derive(Debug, Clone)]
pub struct TyreDetailParser {
    name: FieldChain,
    size: FieldChain,
    price: FieldChain,
    country: FieldChain,
    load_speed_index: FieldChain,
    pattern: FieldChain,
    year: FieldChain,
    warranty: FieldChain,
    image: FieldChain,
    spec_containers: Vec<Selector>,
    row_selector: Selector,
    cell_selector: Selector,
    term_selector: Selector,
    definition_selector: Selector,
    discount_offset: f64,
}

impl TyreDetailParser {
    /// Create a new parser with default selectors
    pub fn new() -> ParsingResult<Self> {
        Self::with_config(&ExtractionSettings::default())
    }

    /// Create parser with custom selector configuration
    pub fn with_config(settings: &ExtractionSettings) -> ParsingResult<Self> {
        let selectors: &FieldSelectors = &settings.selectors;

        let spec_containers = selectors
            .spec_rows
            .iter()
            .map(|css| {
                Selector::parse(css)
                    .map_err(|e| ParsingError::invalid_selector("spec_rows", css, format!("{e:?}")))
            })
            .collect::<ParsingResult<Vec<_>>>()?;

        Ok(Self {
            name: FieldChain::compile("name", &selectors.name)?,
            size: FieldChain::compile("size", &selectors.size)?,
            price: FieldChain::compile("price", &selectors.price)?,
            country: FieldChain::compile("country", &selectors.country)?,
            load_speed_index: FieldChain::compile("load_speed_index", &selectors.load_speed_index)?,
            pattern: FieldChain::compile("pattern", &selectors.pattern)?,
            year: FieldChain::compile("year", &selectors.year)?,
            warranty: FieldChain::compile("warranty", &selectors.warranty)?,
            image: FieldChain::compile("image", &selectors.image)?,
            spec_containers,
            row_selector: fixed_selector("tr")?,
            cell_selector: fixed_selector("th, td")?,
            term_selector: fixed_selector("dt")?,
            definition_selector: fixed_selector("dd")?,
            discount_offset: settings.discount_offset,
        })
    }

    /// Map raw markup to a record.
    ///
    /// Fails with [`ParsingError::ExtractionIncomplete`] when both name and
    /// size are empty after every fallback. A record with only one of the two
    /// is returned as-is; the record store filters those out.
    pub fn extract(&self, markup: &str, url: &str) -> ParsingResult<TyreRecord> {
        let html = Html::parse_document(markup);
        let specifications = self.extract_specifications(&html);

        let mut record = TyreRecord::empty(url);
        record.name = self.name.resolve(&html).unwrap_or_default();
        record.size = self
            .size
            .resolve(&html)
            .or_else(|| spec_value(&specifications, SIZE_LABELS))
            .or_else(|| find_size_designator(&record.name))
            .or_else(|| {
                specifications
                    .iter()
                    .find_map(|pair| find_size_designator(&pair.value))
            })
            .unwrap_or_default();

        if record.is_missing_mandatory_fields() {
            warn!("Mandatory fields missing on {}", url);
            return Err(ParsingError::extraction_incomplete(url));
        }

        record.price = self.price.resolve(&html).unwrap_or_default();
        let with_labels = |chain: &FieldChain, labels: &[&str]| {
            chain
                .resolve(&html)
                .or_else(|| spec_value(&specifications, labels))
                .unwrap_or_default()
        };
        record.country_of_origin = with_labels(&self.country, COUNTRY_LABELS);
        record.load_speed_index = with_labels(&self.load_speed_index, LOAD_SPEED_LABELS);
        record.pattern = with_labels(&self.pattern, PATTERN_LABELS);
        record.year = with_labels(&self.year, YEAR_LABELS);
        record.warranty = with_labels(&self.warranty, WARRANTY_LABELS);
        record.image_url = self
            .image
            .resolve(&html)
            .map(|src| absolutize(url, &src))
            .unwrap_or_default();

        record.brand = brand_from_name(&record.name);
        let size = parse_size(&record.size);
        record.width = size.width;
        record.aspect_ratio = size.aspect_ratio;
        record.rim = size.rim;
        record.discounted_price = if record.price.is_empty() {
            String::new()
        } else {
            discounted_price(&record.price, self.discount_offset)
        };
        record.specifications = specifications;

        debug!(
            "Extracted tyre details for {}: name='{}' size='{}' ({} spec rows)",
            url,
            record.name,
            record.size,
            record.specifications.len()
        );
        Ok(record)
    }

    /// Collect `(label, value)` rows from the first container selector that matches
    fn extract_specifications(&self, html: &Html) -> Vec<SpecPair> {
        let mut pairs = Vec::new();

        for container in self.select_from_multiple(html) {
            match container.value().name() {
                "dl" => self.collect_definition_list(container, &mut pairs),
                _ => self.collect_table_rows(container, &mut pairs),
            }
        }

        pairs
    }

    fn collect_table_rows(&self, table: ElementRef<'_>, pairs: &mut Vec<SpecPair>) {
        for row in table.select(&self.row_selector) {
            let cells: Vec<_> = row.select(&self.cell_selector).collect();
            if cells.len() >= 2 {
                push_pair(pairs, &element_text(cells[0]), &element_text(cells[1]));
            }
        }
    }

    fn collect_definition_list(&self, list: ElementRef<'_>, pairs: &mut Vec<SpecPair>) {
        let terms = list.select(&self.term_selector);
        let definitions = list.select(&self.definition_selector);

        for (term, definition) in terms.zip(definitions) {
            push_pair(pairs, &element_text(term), &element_text(definition));
        }
    }

    /// Select elements using multiple selectors, returning those of the first that matches
    fn select_from_multiple<'a>(&self, html: &'a Html) -> Vec<ElementRef<'a>> {
        for selector in &self.spec_containers {
            let elements: Vec<_> = html.select(selector).collect();
            if !elements.is_empty() {
                return elements;
            }
        }
        Vec::new()
    }
}

fn fixed_selector(css: &str) -> ParsingResult<Selector> {
    Selector::parse(css).map_err(|e| ParsingError::invalid_selector("fixed", css, format!("{e:?}")))
}

fn push_pair(pairs: &mut Vec<SpecPair>, label: &str, value: &str) {
    let label = label.trim_end_matches(':').trim();
    if label.is_empty() || value.is_empty() {
        return;
    }
    if PLACEHOLDER_VALUES.contains(&value.to_lowercase().as_str()) {
        return;
    }
    pairs.push(SpecPair::new(label, value));
}

fn spec_value(pairs: &[SpecPair], labels: &[&str]) -> Option<String> {
    labels.iter().find_map(|label| {
        pairs
            .iter()
            .find(|pair| pair.label.eq_ignore_ascii_case(label))
            .map(|pair| pair.value.clone())
    })
}

/// Resolve relative image paths against the page URL
fn absolutize(page_url: &str, src: &str) -> String {
    Url::parse(page_url)
        .and_then(|base| base.join(src))
        .map_or_else(|_| src.to_string(), String::from)
}

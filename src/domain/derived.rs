//! Derived tyre fields computed from already-extracted text.
//!
//! Every function here is total: input that does not match the expected
//! shape yields empty (or unchanged) output instead of an error.

use once_cell::sync::Lazy;
use regex::Regex;

static SIZE_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(\d+(?:\.\d+)?)\s*/\s*(\d+(?:\.\d+)?)\s*Z?R\s*(\d+(?:\.\d+)?)")
        .expect("size pattern is a valid regex")
});

static PRICE_NUMBER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\d[\d,]*(?:\.\d+)?").expect("price pattern is a valid regex"));

/// Width / aspect ratio / rim parsed from a `<width>/<ratio>R<rim>` designator
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TyreSize {
    pub width: String,
    pub aspect_ratio: String,
    /// Rim diameter, prefixed with `R` (e.g. `R16`)
    pub rim: String,
}

/// Parse `205/55R16` (also `205/55 ZR16`, `205 / 55 R 16`) into its components.
pub fn parse_size(size: &str) -> TyreSize {
    SIZE_PATTERN
        .captures(size)
        .map(|caps| TyreSize {
            width: caps[1].to_string(),
            aspect_ratio: caps[2].to_string(),
            rim: format!("R{}", &caps[3]),
        })
        .unwrap_or_default()
}

/// Locate a size designator anywhere inside free text
pub fn find_size_designator(text: &str) -> Option<String> {
    SIZE_PATTERN
        .find(text)
        .map(|m| m.as_str().split_whitespace().collect::<String>().to_uppercase())
}

/// Brand is the first whitespace-separated token of the product name
pub fn brand_from_name(name: &str) -> String {
    name.split_whitespace().next().unwrap_or_default().to_string()
}

/// Subtract `offset` from the first number in `price`, keeping its surrounding text.
///
/// `"AED 100.00"` with offset `5.0` becomes `"AED 95.00"`. Thousands
/// separators are dropped from the rewritten number. A price without any
/// numeric component is returned unchanged.
pub fn discounted_price(price: &str, offset: f64) -> String {
    let Some(number) = PRICE_NUMBER.find(price) else {
        return price.to_string();
    };

    let Ok(value) = number.as_str().replace(',', "").parse::<f64>() else {
        return price.to_string();
    };

    format!(
        "{}{:.2}{}",
        &price[..number.start()],
        value - offset,
        &price[number.end()..]
    )
}

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One labelled row from a product specification table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpecPair {
    pub label: String,
    pub value: String,
}

impl SpecPair {
    pub fn new(label: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            value: value.into(),
        }
    }
}

/// Structured attributes extracted from one tyre product detail page.
///
/// Records are keyed by their source `url`. Scalar fields that could not be
/// resolved are kept as empty strings rather than `None` so the tabular
/// export always has a value for every column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TyreRecord {
    pub url: String,
    pub name: String,
    pub brand: String,
    pub size: String,
    pub width: String,
    #[serde(rename = "aspectRatio")]
    pub aspect_ratio: String,
    pub rim: String,
    #[serde(rename = "loadSpeedIndex", default)]
    pub load_speed_index: String,
    pub pattern: String,
    pub price: String,
    #[serde(rename = "discountedPrice")]
    pub discounted_price: String,
    #[serde(rename = "countryOfOrigin")]
    pub country_of_origin: String,
    pub year: String,
    pub warranty: String,
    #[serde(rename = "imageUrl")]
    pub image_url: String,
    #[serde(default)]
    pub specifications: Vec<SpecPair>,
    #[serde(rename = "scrapedAt")]
    pub scraped_at: DateTime<Utc>,
}

impl TyreRecord {
    /// Empty record for `url`, stamped with the current time
    pub fn empty(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            name: String::new(),
            brand: String::new(),
            size: String::new(),
            width: String::new(),
            aspect_ratio: String::new(),
            rim: String::new(),
            load_speed_index: String::new(),
            pattern: String::new(),
            price: String::new(),
            discounted_price: String::new(),
            country_of_origin: String::new(),
            year: String::new(),
            warranty: String::new(),
            image_url: String::new(),
            specifications: Vec::new(),
            scraped_at: Utc::now(),
        }
    }

    /// Both mandatory fields (name and size) carry a value.
    ///
    /// Only complete records are ever written to the record store.
    pub fn is_complete(&self) -> bool {
        !self.name.trim().is_empty() && !self.size.trim().is_empty()
    }

    /// Neither mandatory field could be resolved
    pub fn is_missing_mandatory_fields(&self) -> bool {
        self.name.trim().is_empty() && self.size.trim().is_empty()
    }
}

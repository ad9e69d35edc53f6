//! Domain module - tyre records, ledger vocabulary and derived-field rules
//!
//! Nothing in here performs I/O.

pub mod derived;
pub mod ledger;
pub mod product;

// Re-export commonly used items
pub use derived::{TyreSize, brand_from_name, discounted_price, parse_size};
pub use ledger::{LedgerKind, UrlOutcome};
pub use product::{SpecPair, TyreRecord};

//! HTML parsing for product detail pages

pub mod product_detail_parser;
pub mod strategy;

pub use crate::infrastructure::parsing_error::{ParsingError, ParsingResult};
pub use product_detail_parser::TyreDetailParser;
pub use strategy::{FieldChain, FieldStrategy};

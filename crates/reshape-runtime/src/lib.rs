//! Runtime implementation for `reshape`: parse tables, the shift-reduce
//! engine and the document scanner.

pub mod definition;
pub mod engine;
pub mod format;
pub mod position;
pub mod template;
pub mod types;

pub use crate::{
    definition::ParseTable,
    format::{format, Config, FormatError},
};

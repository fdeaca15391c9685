//! XGBoost JSON dump support.
//!
//! This module provides parsing of XGBoost's per-tree JSON dump and its
//! decomposition into leaf boxes.

mod convert;
mod dump;

pub use convert::{extract_leaves, ConversionError};
pub use dump::{DumpNode, XgbDump};

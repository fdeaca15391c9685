//! External model format loaders.
//!
//! This module provides loaders for tree ensembles trained in external
//! frameworks and converts them to the leaf-box [`Ensemble`](crate::repr::Ensemble)
//! understood by the certification engine.

pub mod xgboost;

pub use xgboost::{ConversionError, XgbDump};

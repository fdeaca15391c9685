//! Shared error types for dataset I/O.

use std::io;

use crate::data::DatasetError;

/// Errors that can occur when loading a dataset.
#[derive(Debug, thiserror::Error)]
pub enum DatasetLoadError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("line {line}: {message}")]
    Parse { line: usize, message: String },

    #[error("line {line}: feature {feature} is below the first feature index {feature_start}")]
    FeatureBelowStart {
        line: usize,
        feature: u32,
        feature_start: u32,
    },

    #[error("line {line}: feature {feature} exceeds the declared feature count {n_features}")]
    FeatureOutOfRange {
        line: usize,
        feature: u32,
        n_features: usize,
    },

    #[error(transparent)]
    Dataset(#[from] DatasetError),
}

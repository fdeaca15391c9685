//! Labeled input points for certification.
//!
//! - [`LabeledDataset`]: dense `ndarray` feature matrix plus integer labels
//! - [`io`]: loaders (sparse LIBSVM text)

mod dataset;
pub mod io;

pub use dataset::{DatasetError, LabeledDataset};
pub use io::{load_libsvm, read_libsvm, DatasetLoadError};

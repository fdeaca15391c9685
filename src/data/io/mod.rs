//! Dataset file loaders.

mod error;
pub mod libsvm;

pub use error::DatasetLoadError;
pub use libsvm::{load_libsvm, read_libsvm};

//! treecert: robustness certification for tree ensembles.
//!
//! Computes, for each input point, the largest max-norm perturbation radius
//! under which a gradient boosted tree ensemble provably keeps its prediction.
//! Trees are decomposed into leaf boxes, the leaves an adversary can reach are
//! combined by bounded clique search, and the radius is found by bisection.
//!
//! # Key Types
//!
//! - [`Ensemble`] - Trees decomposed into leaf boxes
//! - [`Certifier`] - Robustness verdicts, per-point certificates and batches
//! - [`CertifyConfig`] - Configuration builder
//! - [`LabeledDataset`] - Points to certify
//!
//! # Loading XGBoost Models
//!
//! Use [`compat::XgbDump`] to read a JSON tree dump and
//! [`XgbDump::to_ensemble`](compat::XgbDump::to_ensemble) to decompose it.
//! See the [`compat`] module for details.

pub mod certify;
pub mod compat;
pub mod data;
pub mod repr;
pub mod testing;
pub mod utils;

// =============================================================================
// Convenience Re-exports
// =============================================================================

// Certification
pub use certify::{
    BatchSummary, Certifier, CertifyConfig, CertifyError, ConfigError, Direction,
    PointCertificate, RunFile, Verdict,
};

// Representations
pub use repr::{Ensemble, FeatureBox, Interval, Leaf};

// Data types
pub use data::{DatasetLoadError, LabeledDataset};

// Shared utilities
pub use utils::{run_with_threads, Parallelism};

//! Robustness certification of tree ensembles.
//!
//! For a point `x` with label `y` and a radius `ε`, the certifier bounds the
//! ensemble output over every input within max-norm distance `ε` of `x`:
//!
//! 1. [`reach`]: per tree, the leaves whose region lies within `ε`.
//! 2. [`clique`]: per group of trees, every jointly feasible leaf combination.
//! 3. [`aggregate`]: group bounds combined over one or more levels.
//! 4. [`search`]: bisection over `ε` using the robust/not-robust verdicts.
//!
//! [`Certifier`] drives these steps for single points and dataset ranges.

pub mod aggregate;
pub mod clique;
mod config;
mod direction;
mod driver;
mod error;
pub mod reach;
pub mod search;

pub use aggregate::{AggregateParams, LevelBounds};
pub use config::{CertifyConfig, ConfigError, RunFile};
pub use direction::Direction;
pub use driver::{AbortedPoint, BatchSummary, Certifier, PointCertificate, TargetBound, Verdict};
pub use error::CertifyError;
pub use search::{SearchHistory, SearchStep};

//! Canonical representations used by the certification engine.
//!
//! - [`region`]: interval boxes and point-to-box distances
//! - [`leaf`]: leaves, decomposed trees and ensembles

pub mod leaf;
pub mod region;

pub use leaf::{Ensemble, Leaf, LeafOrigin, LeafTree};
pub use region::{DimensionError, FeatureBox, FeatureId, Interval, Norm};

//! Certification error taxonomy.

use crate::repr::DimensionError;

/// Errors that abort the evaluation of one (point, ε) test.
///
/// Running out of bisection steps without a robust ε is not an error; it is
/// reported through [`PointCertificate`](super::PointCertificate).
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CertifyError {
    #[error(transparent)]
    Dimension(#[from] DimensionError),

    #[error("tree {tree} has no leaf within epsilon {epsilon} of the point")]
    NoReachableLeaves { tree: u32, epsilon: f64 },

    #[error("multi-class target label and true label cannot be the same (label {label})")]
    TargetEqualsLabel { label: i32 },

    #[error("label {label} is out of range for a model with {n_classes} classes")]
    LabelOutOfRange { label: i32, n_classes: usize },

    #[error("single feature {index} is out of range for {n_features} point features")]
    SingleFeatureOutOfRange { index: usize, n_features: usize },

    #[error("level {level}, partition {partition}: no feasible leaf combination")]
    NoFeasibleCombination { level: usize, partition: usize },
}

//! Leaves an adversary can reach within a perturbation budget.

use tracing::debug;

use crate::repr::{Ensemble, Leaf, LeafTree, Norm};

use super::CertifyError;

/// The perturbation scenario around one input point.
#[derive(Debug, Clone, Copy)]
pub struct ReachQuery<'a> {
    /// Unperturbed feature values; `point[j]` is model feature `feature_start + j`.
    pub point: &'a [f64],
    /// Max-norm perturbation budget.
    pub epsilon: f64,
    /// True label of the point.
    pub label: i32,
    /// Multiclass target label whose score is compared against `label`.
    pub target: Option<u32>,
    pub feature_start: u32,
    /// Only this dense feature index may be perturbed.
    pub single_feature: Option<usize>,
}

impl ReachQuery<'_> {
    /// Whether `tree` takes part in the margin being bounded.
    fn uses_tree(&self, ensemble: &Ensemble, tree: &LeafTree) -> bool {
        if !ensemble.is_multiclass() {
            return true;
        }
        match (self.target, tree.class()) {
            (Some(target), Some(class)) => class as i32 == self.label || class == target,
            _ => true,
        }
    }
}

/// Per relevant tree, the feasible leaves within `epsilon` of the point.
///
/// Binary models use every tree. Multiclass models with a target use only the
/// trees of the true label and the target label. Fails if any used tree has no
/// reachable leaf, or if a multiclass target equals the true label.
pub fn reachable_leaves(
    ensemble: &Ensemble,
    query: &ReachQuery<'_>,
) -> Result<Vec<Vec<Leaf>>, CertifyError> {
    if ensemble.is_multiclass() && query.target.is_some_and(|t| t as i32 == query.label) {
        return Err(CertifyError::TargetEqualsLabel { label: query.label });
    }

    let mut reachable = Vec::new();
    for tree in ensemble.trees() {
        if !query.uses_tree(ensemble, tree) {
            continue;
        }

        let mut kept = Vec::new();
        for leaf in tree.leaves() {
            if leaf.region.is_infeasible() {
                continue;
            }
            let d = leaf.region.distance(
                query.point,
                Norm::Linf,
                query.feature_start,
                query.single_feature,
            )?;
            if d <= query.epsilon {
                kept.push(leaf.clone());
            }
        }

        if kept.is_empty() {
            return Err(CertifyError::NoReachableLeaves {
                tree: tree.id(),
                epsilon: query.epsilon,
            });
        }
        reachable.push(kept);
    }

    debug!(
        trees = reachable.len(),
        leaves = reachable.iter().map(Vec::len).sum::<usize>(),
        epsilon = query.epsilon,
        "reachable leaves"
    );
    Ok(reachable)
}

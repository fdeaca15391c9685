//! Multi-level aggregation of partition bounds.
//!
//! Trees are grouped into consecutive partitions of at most `max_clique`
//! trees. Each partition is searched exhaustively (see [`clique`](super::clique))
//! and the partition results are combined into one bound for the level:
//!
//! - **independent**: the sum of the partition bests. Valid but loose, since
//!   the best combinations of two partitions may be jointly infeasible.
//! - **DP chaining**: a running table of `(box, best-so-far)` entries is
//!   extended partition by partition, only through intersecting boxes.
//!
//! Each partition's cliques become one pseudo-tree of the next level, so a
//! level with `P` partitions feeds `P` trees into the following one. The
//! process stops at a single remaining partition (the root) or after
//! `max_level` levels. DP chaining applies to the last level only.

use tracing::debug;

use crate::repr::Leaf;
use crate::utils::Parallelism;

use super::clique::{search_partition, Clique, PartitionBound};
use super::{CertifyError, Direction};

/// Shape of the aggregation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AggregateParams {
    /// Maximum number of trees per partition (clamped to at least 1).
    pub max_clique: usize,
    /// Maximum number of levels (clamped to at least 1).
    pub max_level: usize,
    /// Chain partitions by box compatibility on the last level.
    pub dp: bool,
}

impl Default for AggregateParams {
    fn default() -> Self {
        Self {
            max_clique: 2,
            max_level: 1,
            dp: false,
        }
    }
}

/// Best score found at every aggregation level.
#[derive(Debug, Clone, PartialEq)]
pub struct LevelBounds {
    /// One entry per completed level; never empty.
    pub per_level: Vec<f64>,
    /// Pseudo-leaves of the single remaining partition, when the root was reached.
    pub root: Option<Vec<Leaf>>,
    pub direction: Direction,
}

impl LevelBounds {
    /// The bound of the last completed level.
    pub fn bound(&self) -> f64 {
        self.per_level.last().copied().unwrap_or(f64::NAN)
    }

    /// Number of levels actually run.
    pub fn n_levels(&self) -> usize {
        self.per_level.len()
    }

    /// The root pseudo-leaf with the most adversarial score.
    pub fn worst_root_leaf(&self) -> Option<&Leaf> {
        let root = self.root.as_ref()?;
        let best = self.direction.best(root.iter().map(|l| l.value));
        root.iter().find(|l| l.value == best)
    }
}

// =============================================================================
// Level combination
// =============================================================================

fn independent_sum(partitions: &[PartitionBound]) -> f64 {
    partitions.iter().map(|p| p.best).sum()
}

/// Chain partitions left to right, keeping per clique the best compatible
/// running total. Cliques without any compatible entry are dropped.
fn dp_chain(
    partitions: &[PartitionBound],
    direction: Direction,
    level: usize,
) -> Result<f64, CertifyError> {
    let Some((first, rest)) = partitions.split_first() else {
        return Ok(direction.identity());
    };

    let mut table: Vec<Clique> = first.cliques.clone();
    for (offset, partition) in rest.iter().enumerate() {
        let mut next = Vec::with_capacity(partition.cliques.len());
        for clique in &partition.cliques {
            let chained = direction.best(
                table
                    .iter()
                    .filter(|entry| entry.region.intersects(&clique.region))
                    .map(|entry| clique.score + entry.score),
            );
            if chained.is_finite() {
                next.push(Clique {
                    region: clique.region.clone(),
                    score: chained,
                });
            }
        }
        if next.is_empty() {
            return Err(CertifyError::NoFeasibleCombination {
                level,
                partition: offset + 1,
            });
        }
        table = next;
    }

    Ok(direction.best(table.iter().map(|c| c.score)))
}

// =============================================================================
// Aggregator
// =============================================================================

/// Run the multi-level aggregation over per-tree reachable leaves.
///
/// `target` flips the sign of the target label's leaves; it only affects the
/// first level since pseudo-leaves carry no class.
///
/// # Errors
///
/// [`CertifyError::NoFeasibleCombination`] if a partition (or the DP table)
/// ends up without any feasible combination.
pub fn multi_level_bound(
    reachable: Vec<Vec<Leaf>>,
    target: Option<u32>,
    direction: Direction,
    params: AggregateParams,
    parallelism: Parallelism,
) -> Result<LevelBounds, CertifyError> {
    let max_clique = params.max_clique.max(1);
    let max_level = params.max_level.max(1);

    let mut per_level = Vec::with_capacity(max_level);
    let mut current = reachable;
    let mut root = None;

    for level in 0..max_level {
        let use_dp = params.dp && level + 1 == max_level;
        let level_target = if level == 0 { target } else { None };

        let groups: Vec<&[Vec<Leaf>]> = current.chunks(max_clique).collect();
        let partitions = parallelism.maybe_par_map(groups, |trees| {
            search_partition(trees, level_target, direction)
        });

        if let Some(partition) = partitions.iter().position(|p| p.cliques.is_empty()) {
            return Err(CertifyError::NoFeasibleCombination { level, partition });
        }

        let bound = if use_dp {
            dp_chain(&partitions, direction, level)?
        } else {
            independent_sum(&partitions)
        };
        debug!(
            level,
            trees = current.len(),
            partitions = partitions.len(),
            cliques = partitions.iter().map(|p| p.cliques.len()).sum::<usize>(),
            dp = use_dp,
            bound,
            "aggregation level"
        );
        per_level.push(bound);

        let n_partitions = partitions.len();
        current = partitions
            .into_iter()
            .map(|p| p.cliques.into_iter().map(Clique::into_leaf).collect())
            .collect();

        if n_partitions <= 1 {
            root = current.pop();
            break;
        }
    }

    Ok(LevelBounds {
        per_level,
        root,
        direction,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repr::{FeatureBox, Interval};
    use approx::assert_abs_diff_eq;

    fn leaf(tree: u32, node: u32, feature: u32, lower: f64, upper: f64, value: f64) -> Leaf {
        let region = FeatureBox::from_interval(feature, Interval::new(lower, upper));
        Leaf::new(tree, node, region, value, None)
    }

    /// Three single-split trees on one feature with conflicting extremes.
    fn three_trees() -> Vec<Vec<Leaf>> {
        let inf = f64::INFINITY;
        vec![
            vec![leaf(0, 1, 0, -inf, 0.5, -1.0), leaf(0, 2, 0, 0.5, inf, 1.0)],
            vec![leaf(1, 1, 0, -inf, 0.4, 0.5), leaf(1, 2, 0, 0.4, inf, -0.5)],
            vec![leaf(2, 1, 0, -inf, 0.6, 2.0), leaf(2, 2, 0, 0.6, inf, -2.0)],
        ]
    }

    fn params(max_clique: usize, max_level: usize, dp: bool) -> AggregateParams {
        AggregateParams {
            max_clique,
            max_level,
            dp,
        }
    }

    #[test]
    fn single_partition_reaches_root() {
        let bounds = multi_level_bound(
            three_trees(),
            None,
            Direction::Minimize,
            params(3, 4, false),
            Parallelism::Sequential,
        )
        .unwrap();
        assert_eq!(bounds.n_levels(), 1);
        // x < 0.4: -1 + 0.5 + 2 = 1.5, [0.4, 0.5): 0.5, [0.5, 0.6): 2.5, x >= 0.6: -1.5
        assert_abs_diff_eq!(bounds.bound(), -1.5, epsilon = 1e-12);
        let root = bounds.root.as_ref().unwrap();
        assert_eq!(root.len(), 4);
        assert!(root.iter().all(Leaf::is_pseudo));
        let worst = bounds.worst_root_leaf().unwrap();
        assert_eq!(worst.region.interval(0), Some(Interval::new(0.6, f64::INFINITY)));
    }

    #[test]
    fn independent_sum_is_looser_than_exact() {
        let bounds = multi_level_bound(
            three_trees(),
            None,
            Direction::Minimize,
            params(1, 1, false),
            Parallelism::Sequential,
        )
        .unwrap();
        // -1 + -0.5 + -2 ignores that x < 0.4 and x >= 0.5 are exclusive
        assert_abs_diff_eq!(bounds.bound(), -3.5, epsilon = 1e-12);
        assert!(bounds.root.is_none());
    }

    #[test]
    fn dp_is_at_least_as_tight_as_independent() {
        for direction in [Direction::Minimize, Direction::Maximize] {
            let independent = multi_level_bound(
                three_trees(),
                None,
                direction,
                params(1, 1, false),
                Parallelism::Sequential,
            )
            .unwrap()
            .bound();
            let chained = multi_level_bound(
                three_trees(),
                None,
                direction,
                params(1, 1, true),
                Parallelism::Sequential,
            )
            .unwrap()
            .bound();
            assert!(direction.at_least_as_tight(chained, independent));
        }
    }

    #[test]
    fn dp_prunes_incompatible_chains() {
        let chained = multi_level_bound(
            three_trees(),
            None,
            Direction::Maximize,
            params(1, 1, true),
            Parallelism::Sequential,
        )
        .unwrap();
        // Independent: 1 + 0.5 + 2. The chain cannot pair x >= 0.5 with x < 0.4.
        assert_abs_diff_eq!(chained.bound(), 2.5, epsilon = 1e-12);

        let exact = multi_level_bound(
            three_trees(),
            None,
            Direction::Maximize,
            params(3, 1, false),
            Parallelism::Sequential,
        )
        .unwrap();
        assert!(Direction::Maximize.at_least_as_tight(exact.bound(), chained.bound()));
    }

    #[test]
    fn two_levels_with_and_without_dp() {
        let independent = multi_level_bound(
            three_trees(),
            None,
            Direction::Minimize,
            params(2, 2, false),
            Parallelism::Sequential,
        )
        .unwrap();
        let chained = multi_level_bound(
            three_trees(),
            None,
            Direction::Minimize,
            params(2, 2, true),
            Parallelism::Sequential,
        )
        .unwrap();
        assert_eq!(independent.n_levels(), 2);
        assert_eq!(chained.n_levels(), 2);
        // Level 0: partitions {t0, t1} (best -1.5) and {t2} (best -2).
        assert_abs_diff_eq!(independent.per_level[0], -3.5, epsilon = 1e-12);
        assert_abs_diff_eq!(chained.per_level[0], -3.5, epsilon = 1e-12);
        // Level 1 has a single partition, so both modes see the exact bound.
        assert_abs_diff_eq!(independent.bound(), -1.5, epsilon = 1e-12);
        assert!(chained.bound() >= independent.bound());
    }

    #[test]
    fn parallel_matches_sequential() {
        let seq = multi_level_bound(
            three_trees(),
            None,
            Direction::Maximize,
            params(1, 3, false),
            Parallelism::Sequential,
        )
        .unwrap();
        let par = multi_level_bound(
            three_trees(),
            None,
            Direction::Maximize,
            params(1, 3, false),
            Parallelism::Parallel,
        )
        .unwrap();
        assert_eq!(seq, par);
    }

    #[test]
    fn empty_partition_is_an_error() {
        let trees = vec![
            vec![leaf(0, 1, 0, 0.0, 1.0, 1.0)],
            vec![leaf(1, 1, 0, 2.0, 3.0, 1.0)],
        ];
        let err = multi_level_bound(
            trees,
            None,
            Direction::Minimize,
            params(2, 1, false),
            Parallelism::Sequential,
        )
        .unwrap_err();
        assert_eq!(err, CertifyError::NoFeasibleCombination { level: 0, partition: 0 });
    }

    #[test]
    fn zero_widths_are_clamped() {
        let bounds = multi_level_bound(
            three_trees(),
            None,
            Direction::Minimize,
            params(0, 0, false),
            Parallelism::Sequential,
        )
        .unwrap();
        assert_eq!(bounds.n_levels(), 1);
    }
}

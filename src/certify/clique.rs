//! K-partite clique search over the reachable leaves of a tree group.
//!
//! A clique picks one leaf per tree such that all picked boxes intersect; its
//! region is that intersection and its score the sum of the picked values.
//! Enumeration is an incremental join: the cliques over the first `i` trees
//! are consumed to produce the cliques over the first `i + 1`.
//!
//! The number of cliques is exponential in the number of trees, so callers
//! bound the group width (see [`aggregate`](super::aggregate)).

use crate::repr::{FeatureBox, Leaf};

use super::Direction;

/// A feasible combination of one leaf per tree.
#[derive(Debug, Clone, PartialEq)]
pub struct Clique {
    pub region: FeatureBox,
    pub score: f64,
}

impl Clique {
    /// Convert into a pseudo-leaf for the next aggregation level.
    pub fn into_leaf(self) -> Leaf {
        Leaf::pseudo(self.region, self.score)
    }
}

/// Contribution of `leaf` to the margin being bounded.
///
/// Leaves of the target label's trees enter with a flipped sign so that the
/// summed score is `score(label) - score(target)`.
#[inline]
pub fn signed_value(leaf: &Leaf, target: Option<u32>) -> f64 {
    match (leaf.class, target) {
        (Some(class), Some(target)) if class == target => -leaf.value,
        _ => leaf.value,
    }
}

/// All feasible cliques across `trees`, in join order.
///
/// Returns an empty list if `trees` is empty or no feasible combination exists.
pub fn enumerate_cliques(trees: &[Vec<Leaf>], target: Option<u32>) -> Vec<Clique> {
    let Some((first, rest)) = trees.split_first() else {
        return Vec::new();
    };

    let mut current: Vec<Clique> = first
        .iter()
        .filter(|leaf| !leaf.region.is_infeasible())
        .map(|leaf| Clique {
            region: leaf.region.clone(),
            score: signed_value(leaf, target),
        })
        .collect();

    for tree in rest {
        let mut next = Vec::with_capacity(current.len());
        for clique in &current {
            for leaf in tree {
                if !leaf.region.intersects(&clique.region) {
                    continue;
                }
                next.push(Clique {
                    region: leaf.region.intersect(&clique.region),
                    score: clique.score + signed_value(leaf, target),
                });
            }
        }
        current = next;
        if current.is_empty() {
            break;
        }
    }

    current
}

/// Cliques of one partition and the most adversarial clique score.
#[derive(Debug, Clone)]
pub struct PartitionBound {
    pub cliques: Vec<Clique>,
    pub best: f64,
}

impl PartitionBound {
    /// The clique achieving [`best`](Self::best), if any.
    pub fn best_clique(&self) -> Option<&Clique> {
        self.cliques.iter().find(|c| c.score == self.best)
    }
}

/// Enumerate the cliques of one partition and pick the worst-case score.
pub fn search_partition(
    trees: &[Vec<Leaf>],
    target: Option<u32>,
    direction: Direction,
) -> PartitionBound {
    let cliques = enumerate_cliques(trees, target);
    let best = direction.best(cliques.iter().map(|c| c.score));
    PartitionBound { cliques, best }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repr::Interval;
    use approx::assert_abs_diff_eq;

    fn leaf(
        tree: u32,
        node: u32,
        constraints: &[(u32, f64, f64)],
        value: f64,
        class: Option<u32>,
    ) -> Leaf {
        let region = FeatureBox::from_constraints(
            constraints.iter().map(|&(f, l, u)| (f, Interval::new(l, u))),
        );
        Leaf::new(tree, node, region, value, class)
    }

    #[test]
    fn overlapping_leaves_form_one_clique() {
        let trees = vec![
            vec![leaf(0, 1, &[(2, 0.0, 1.0)], 0.4, None)],
            vec![leaf(1, 1, &[(2, 0.5, 2.0)], 0.3, None)],
        ];
        let cliques = enumerate_cliques(&trees, None);
        assert_eq!(cliques.len(), 1);
        assert_abs_diff_eq!(cliques[0].score, 0.7, epsilon = 1e-12);
        assert_eq!(cliques[0].region.interval(2), Some(Interval::new(0.5, 1.0)));
    }

    #[test]
    fn disjoint_leaves_are_not_joined() {
        let trees = vec![
            vec![
                leaf(0, 1, &[(0, f64::NEG_INFINITY, 0.5)], -1.0, None),
                leaf(0, 2, &[(0, 0.5, f64::INFINITY)], 1.0, None),
            ],
            vec![
                leaf(1, 1, &[(0, f64::NEG_INFINITY, 0.3)], -2.0, None),
                leaf(1, 2, &[(0, 0.3, f64::INFINITY)], 2.0, None),
            ],
        ];
        let cliques = enumerate_cliques(&trees, None);
        let mut scores: Vec<f64> = cliques.iter().map(|c| c.score).collect();
        scores.sort_by(f64::total_cmp);
        // (x<0.5, x>=0.5) x (x<0.3, x>=0.3) minus the infeasible (x>=0.5, x<0.3)
        assert_eq!(scores, vec![-3.0, 1.0, 3.0]);

        let bound = search_partition(&trees, None, Direction::Maximize);
        assert_eq!(bound.best, 3.0);
        let bound = search_partition(&trees, None, Direction::Minimize);
        assert_eq!(bound.best, -3.0);
        assert_eq!(
            bound.best_clique().unwrap().region.interval(0),
            Some(Interval::new(f64::NEG_INFINITY, 0.3))
        );
    }

    #[test]
    fn target_leaves_are_subtracted() {
        let trees = vec![
            vec![leaf(0, 1, &[], 2.0, Some(0))],
            vec![leaf(1, 1, &[], 0.5, Some(1))],
        ];
        let cliques = enumerate_cliques(&trees, Some(1));
        assert_eq!(cliques[0].score, 1.5);
        let cliques = enumerate_cliques(&trees, None);
        assert_eq!(cliques[0].score, 2.5);
    }

    #[test]
    fn empty_input_has_no_cliques() {
        assert!(enumerate_cliques(&[], None).is_empty());
        let bound = search_partition(&[], None, Direction::Minimize);
        assert!(bound.best.is_infinite());
        assert!(bound.best_clique().is_none());
    }

    #[test]
    fn clique_becomes_pseudo_leaf() {
        let leaf = Clique { region: FeatureBox::unbounded(), score: 1.25 }.into_leaf();
        assert!(leaf.is_pseudo());
        assert_eq!(leaf.value, 1.25);
    }
}

//! Conversion from XGBoost dump trees to decomposed leaf lists.

use tracing::debug;

use crate::repr::{Ensemble, FeatureBox, Interval, Leaf, LeafTree};

use super::dump::{DumpNode, XgbDump};

/// Error type for XGBoost dump loading and conversion.
#[derive(Debug, thiserror::Error)]
pub enum ConversionError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid dump JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("tree {tree}: node {node} is missing required field '{field}'")]
    MissingField {
        tree: u32,
        node: u32,
        field: &'static str,
    },
    #[error("tree {tree}: node {node} has {count} children, expected 2")]
    WrongChildCount { tree: u32, node: u32, count: usize },
    #[error(
        "tree {tree}: node id not match at node {node}: children {children:?} vs yes={yes}, no={no}"
    )]
    ChildMismatch {
        tree: u32,
        node: u32,
        yes: u32,
        no: u32,
        children: Vec<u32>,
    },
}

/// Split parameters of an internal node, after validation.
struct Split<'a> {
    feature: u32,
    threshold: f64,
    below: &'a DumpNode,
    at_or_above: &'a DumpNode,
}

fn require<T: Copy>(
    value: Option<T>,
    tree: u32,
    node: u32,
    field: &'static str,
) -> Result<T, ConversionError> {
    value.ok_or(ConversionError::MissingField { tree, node, field })
}

impl DumpNode {
    /// Validate a split node and order its children as (yes, no).
    fn as_split(&self, tree: u32) -> Result<Split<'_>, ConversionError> {
        let node = self.nodeid;
        let feature = require(self.split, tree, node, "split")?;
        let threshold = require(self.split_condition, tree, node, "split_condition")?;
        let yes = require(self.yes, tree, node, "yes")?;
        let no = require(self.no, tree, node, "no")?;

        let [first, second] = self.children.as_slice() else {
            return Err(ConversionError::WrongChildCount {
                tree,
                node,
                count: self.children.len(),
            });
        };

        let (below, at_or_above) = if first.nodeid == yes && second.nodeid == no {
            (first, second)
        } else if second.nodeid == yes && first.nodeid == no {
            (second, first)
        } else {
            return Err(ConversionError::ChildMismatch {
                tree,
                node,
                yes,
                no,
                children: vec![first.nodeid, second.nodeid],
            });
        };

        Ok(Split {
            feature,
            threshold,
            below,
            at_or_above,
        })
    }
}

/// Decompose one dumped tree into its leaves.
///
/// Walks the split structure with an explicit stack; each frame owns the box
/// accumulated along its path. The `yes` child is reached by
/// `feature < threshold` and gets `(-inf, threshold)`, the `no` child gets
/// `[threshold, +inf)`. Once a path's box is infeasible it stays infeasible.
/// Leaves are emitted in depth-first, `yes`-first order.
pub fn extract_leaves(
    root: &DumpNode,
    tree_id: u32,
    class: Option<u32>,
) -> Result<Vec<Leaf>, ConversionError> {
    let mut leaves = Vec::new();
    let mut stack: Vec<(&DumpNode, FeatureBox)> = vec![(root, FeatureBox::unbounded())];

    while let Some((node, region)) = stack.pop() {
        if let Some(value) = node.leaf {
            leaves.push(Leaf::new(tree_id, node.nodeid, region, value, class));
            continue;
        }

        let split = node.as_split(tree_id)?;
        let (below_region, above_region) = if region.is_infeasible() {
            (FeatureBox::Empty, FeatureBox::Empty)
        } else {
            (
                region.intersect(&FeatureBox::from_interval(
                    split.feature,
                    Interval::below(split.threshold),
                )),
                region.intersect(&FeatureBox::from_interval(
                    split.feature,
                    Interval::at_or_above(split.threshold),
                )),
            )
        };

        stack.push((split.at_or_above, above_region));
        stack.push((split.below, below_region));
    }

    Ok(leaves)
}

impl XgbDump {
    /// Decompose every tree of the dump into an [`Ensemble`].
    ///
    /// With `n_classes > 2`, tree `i` is assigned class `i mod n_classes`;
    /// otherwise the model is treated as binary and leaves carry no class.
    pub fn to_ensemble(&self, n_classes: usize) -> Result<Ensemble, ConversionError> {
        let n_classes = n_classes.max(2);
        let trees = self
            .trees
            .iter()
            .enumerate()
            .map(|(i, root)| {
                let tree_id = i as u32;
                let class = Ensemble::class_of_tree(n_classes, i);
                let leaves = extract_leaves(root, tree_id, class)?;
                debug!(tree = tree_id, leaves = leaves.len(), "decomposed tree");
                Ok(LeafTree::new(tree_id, class, leaves))
            })
            .collect::<Result<Vec<_>, ConversionError>>()?;
        Ok(Ensemble::new(trees, n_classes))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{node, stump};

    #[test]
    fn stump_yields_two_half_spaces() {
        let leaves = extract_leaves(&stump(1, 0.5, -1.0, 1.0), 0, None).unwrap();
        assert_eq!(leaves.len(), 2);
        assert_eq!(leaves[0].region, FeatureBox::from_interval(1, Interval::below(0.5)));
        assert_eq!(leaves[0].value, -1.0);
        assert_eq!(leaves[1].region, FeatureBox::from_interval(1, Interval::at_or_above(0.5)));
        assert_eq!(leaves[1].origin.unwrap().node_id, 2);
    }

    #[test]
    fn swapped_children_follow_yes_no() {
        let mut root = stump(1, 0.5, -1.0, 1.0);
        root.children.swap(0, 1);
        let leaves = extract_leaves(&root, 0, None).unwrap();
        // The `yes` leaf (value -1.0) is still below the threshold.
        assert_eq!(leaves[0].value, -1.0);
        assert_eq!(leaves[0].region, FeatureBox::from_interval(1, Interval::below(0.5)));
    }

    #[test]
    fn mismatched_children_are_rejected() {
        let mut root = stump(1, 0.5, -1.0, 1.0);
        root.yes = Some(7);
        let err = extract_leaves(&root, 3, None).unwrap_err();
        assert!(matches!(
            err,
            ConversionError::ChildMismatch { tree: 3, node: 0, yes: 7, no: 2, .. }
        ));
    }

    #[test]
    fn wrong_child_count_is_rejected() {
        let mut root = stump(1, 0.5, -1.0, 1.0);
        root.children.pop();
        assert!(matches!(
            extract_leaves(&root, 0, None),
            Err(ConversionError::WrongChildCount { count: 1, .. })
        ));
    }

    #[test]
    fn nested_boxes_narrow_with_depth() {
        // x1 < 0.5 ? (x1 < 0.2 ? a : b) : (x2 < 3 ? c : d)
        let root = node(
            0,
            1,
            0.5,
            node(1, 1, 0.2, DumpNode::leaf(3, 1.0), DumpNode::leaf(4, 2.0)),
            node(2, 2, 3.0, DumpNode::leaf(5, 3.0), DumpNode::leaf(6, 4.0)),
        );
        let leaves = extract_leaves(&root, 0, Some(1)).unwrap();
        let ids: Vec<u32> = leaves.iter().map(|l| l.origin.unwrap().node_id).collect();
        assert_eq!(ids, vec![3, 4, 5, 6]);
        assert!(leaves.iter().all(|l| l.class == Some(1)));

        assert_eq!(leaves[1].region.interval(1), Some(Interval::new(0.2, 0.5)));
        let parent = FeatureBox::from_interval(1, Interval::at_or_above(0.5));
        assert!(leaves[2].region.is_subset_of(&parent));
        assert!(leaves[3].region.is_subset_of(&parent));
        assert_eq!(leaves[3].region.interval(2), Some(Interval::at_or_above(3.0)));
    }

    #[test]
    fn contradictory_path_is_infeasible() {
        // x1 < 0.5 ? (x1 < 0.7 ? a : b) : c   -- `b` needs x1 >= 0.7 and x1 < 0.5
        let root = node(
            0,
            1,
            0.5,
            node(1, 1, 0.7, DumpNode::leaf(3, 1.0), DumpNode::leaf(4, 2.0)),
            DumpNode::leaf(2, 0.0),
        );
        let leaves = extract_leaves(&root, 0, None).unwrap();
        assert_eq!(leaves.len(), 3);
        assert!(!leaves[0].region.is_infeasible());
        assert!(leaves[1].region.is_infeasible());
    }

    #[test]
    fn ensemble_assigns_classes_round_robin() {
        let dump = XgbDump::new((0..6).map(|_| stump(0, 0.0, -1.0, 1.0)).collect());
        let ens = dump.to_ensemble(3).unwrap();
        let classes: Vec<_> = ens.trees().iter().map(|t| t.class()).collect();
        assert_eq!(classes, vec![Some(0), Some(1), Some(2), Some(0), Some(1), Some(2)]);

        let binary = dump.to_ensemble(1).unwrap();
        assert_eq!(binary.n_classes(), 2);
        assert!(binary.trees().iter().all(|t| t.class().is_none()));
    }
}

//! Decomposed tree ensembles: trees as flat lists of leaf boxes.

use super::region::FeatureBox;

/// Where a leaf came from in the original model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LeafOrigin {
    pub tree_id: u32,
    pub node_id: u32,
}

/// A decision-tree outcome together with the region of inputs that reach it.
///
/// Leaves produced by the clique search ("pseudo-leaves") carry no origin and
/// no class: their region is the intersection of several real leaves and
/// their value is the (sign-adjusted) sum of those leaves' values.
#[derive(Debug, Clone, PartialEq)]
pub struct Leaf {
    pub origin: Option<LeafOrigin>,
    pub region: FeatureBox,
    pub value: f64,
    /// Class this leaf's tree contributes to; `None` for binary models.
    pub class: Option<u32>,
}

impl Leaf {
    /// A leaf of a real tree.
    pub fn new(
        tree_id: u32,
        node_id: u32,
        region: FeatureBox,
        value: f64,
        class: Option<u32>,
    ) -> Self {
        Self {
            origin: Some(LeafOrigin { tree_id, node_id }),
            region,
            value,
            class,
        }
    }

    /// A synthetic leaf combining several real leaves.
    pub fn pseudo(region: FeatureBox, value: f64) -> Self {
        Self {
            origin: None,
            region,
            value,
            class: None,
        }
    }

    #[inline]
    pub fn is_pseudo(&self) -> bool {
        self.origin.is_none()
    }
}

/// One decision tree, flattened into its leaves.
///
/// For trees derived from a well-formed split structure the leaf regions
/// partition the feature space.
#[derive(Debug, Clone, PartialEq)]
pub struct LeafTree {
    id: u32,
    class: Option<u32>,
    leaves: Vec<Leaf>,
}

impl LeafTree {
    pub fn new(id: u32, class: Option<u32>, leaves: Vec<Leaf>) -> Self {
        debug_assert!(leaves
            .iter()
            .all(|l| l.origin.is_some_and(|o| o.tree_id == id)));
        Self { id, class, leaves }
    }

    #[inline]
    pub fn id(&self) -> u32 {
        self.id
    }

    #[inline]
    pub fn class(&self) -> Option<u32> {
        self.class
    }

    #[inline]
    pub fn leaves(&self) -> &[Leaf] {
        &self.leaves
    }

    #[inline]
    pub fn n_leaves(&self) -> usize {
        self.leaves.len()
    }
}

/// An ordered collection of decomposed trees.
///
/// For multiclass models tree `i` contributes to class `i mod n_classes`;
/// for binary models every tree contributes to the single score.
#[derive(Debug, Clone, PartialEq)]
pub struct Ensemble {
    trees: Vec<LeafTree>,
    n_classes: usize,
}

impl Ensemble {
    pub fn new(trees: Vec<LeafTree>, n_classes: usize) -> Self {
        Self {
            trees,
            n_classes: n_classes.max(2),
        }
    }

    #[inline]
    pub fn trees(&self) -> &[LeafTree] {
        &self.trees
    }

    #[inline]
    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    #[inline]
    pub fn n_classes(&self) -> usize {
        self.n_classes
    }

    #[inline]
    pub fn is_multiclass(&self) -> bool {
        self.n_classes > 2
    }

    /// Class assigned to tree `index` under this ensemble's class count.
    #[inline]
    pub fn class_of_tree(n_classes: usize, index: usize) -> Option<u32> {
        (n_classes > 2).then(|| (index % n_classes) as u32)
    }

    /// Total number of leaves across all trees.
    pub fn n_leaves(&self) -> usize {
        self.trees.iter().map(LeafTree::n_leaves).sum()
    }

    /// Raw ensemble score of `point` per class (one entry for binary models).
    ///
    /// Each tree contributes the value of the leaf the point is routed to, with
    /// `feature < threshold` taking the `yes` branch.
    pub fn score(
        &self,
        point: &[f64],
        feature_start: u32,
    ) -> Result<Vec<f64>, super::region::DimensionError> {
        let n_out = if self.is_multiclass() { self.n_classes } else { 1 };
        let mut scores = vec![0.0; n_out];
        for tree in &self.trees {
            for leaf in tree.leaves() {
                if leaf.region.contains(point, feature_start)? {
                    let slot = tree.class().map_or(0, |c| c as usize);
                    scores[slot] += leaf.value;
                    break;
                }
            }
        }
        Ok(scores)
    }
}

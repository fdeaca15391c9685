//! Testing utilities for treecert.
//!
//! Small builders for dumped trees, shared by unit tests, integration tests
//! and benches. Inputs with `feature < threshold` take the `yes` branch.
//!
//! ```
//! use treecert::testing::stump;
//! use treecert::compat::XgbDump;
//!
//! let ensemble = XgbDump::new(vec![stump(1, 0.5, -1.0, 1.0)]).to_ensemble(2).unwrap();
//! assert_eq!(ensemble.n_leaves(), 2);
//! ```

use crate::compat::xgboost::DumpNode;

// =============================================================================
// Tree builders
// =============================================================================

/// Split node `nodeid` on `feature < threshold`.
pub fn node(nodeid: u32, feature: u32, threshold: f64, yes: DumpNode, no: DumpNode) -> DumpNode {
    DumpNode::split(nodeid, feature, threshold, yes, no)
}

/// Single split with leaf `1` (value `left`) below the threshold and leaf `2`
/// (value `right`) at or above it.
pub fn stump(feature: u32, threshold: f64, left: f64, right: f64) -> DumpNode {
    node(
        0,
        feature,
        threshold,
        DumpNode::leaf(1, left),
        DumpNode::leaf(2, right),
    )
}

/// Tree scoring `inside` for `low <= feature < high` and `outside` elsewhere.
pub fn band(feature: u32, low: f64, high: f64, inside: f64, outside: f64) -> DumpNode {
    node(
        0,
        feature,
        low,
        DumpNode::leaf(1, outside),
        node(
            2,
            feature,
            high,
            DumpNode::leaf(3, inside),
            DumpNode::leaf(4, outside),
        ),
    )
}

/// Complete tree of `depth` splits on `features` (cycled per level) with
/// thresholds halving `[0, 1)` and leaf values alternating in sign.
///
/// Node ids follow the breadth-first numbering of XGBoost dumps.
pub fn balanced(depth: u32, features: &[u32], scale: f64) -> DumpNode {
    fn build(
        id: u32,
        level: u32,
        depth: u32,
        lo: f64,
        hi: f64,
        features: &[u32],
        scale: f64,
    ) -> DumpNode {
        if level == depth {
            let sign = if id % 2 == 0 { 1.0 } else { -1.0 };
            return DumpNode::leaf(id, sign * scale * (1.0 + f64::from(id % 5) / 10.0));
        }
        let feature = features[level as usize % features.len()];
        let mid = 0.5 * (lo + hi);
        let yes = build(2 * id + 1, level + 1, depth, lo, mid, features, scale);
        let no = build(2 * id + 2, level + 1, depth, mid, hi, features, scale);
        node(id, feature, mid, yes, no)
    }
    build(0, 0, depth, 0.0, 1.0, features, scale)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn band_has_three_leaves() {
        let tree = band(1, 0.2, 0.4, 1.0, 0.0);
        assert_eq!(tree.n_nodes(), 5);
        assert_eq!(tree.children[1].children[0].leaf, Some(1.0));
    }

    #[test]
    fn balanced_tree_size() {
        let tree = balanced(3, &[1, 2], 0.5);
        assert_eq!(tree.n_nodes(), 15);
        assert_eq!(tree.split, Some(1));
        assert_eq!(tree.children[0].split, Some(2));
    }
}

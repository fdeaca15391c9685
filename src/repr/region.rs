//! Interval boxes over feature space.
//!
//! A [`FeatureBox`] is the conjunction of per-feature interval constraints that
//! every input reaching a given decision-tree leaf must satisfy. Features that
//! carry no constraint are unbounded. The infeasible region is a distinct
//! variant ([`FeatureBox::Empty`]) and absorbs every intersection.
//!
//! Constraints are kept sorted by feature id so that intersection is a linear
//! merge of the two constraint lists.

use std::cmp::Ordering;
use std::fmt;

/// Model-level feature identifier as it appears in split conditions.
pub type FeatureId = u32;

// =============================================================================
// Interval
// =============================================================================

/// A bounded or half-bounded real interval `(lower, upper)`.
///
/// Inside a feasible [`FeatureBox`] every interval satisfies `lower < upper`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Interval {
    pub lower: f64,
    pub upper: f64,
}

impl Interval {
    /// Create a new interval.
    #[inline]
    pub fn new(lower: f64, upper: f64) -> Self {
        debug_assert!(!lower.is_nan() && !upper.is_nan(), "NaN interval bound");
        Self { lower, upper }
    }

    /// The interval reached by the "below threshold" branch of a split.
    #[inline]
    pub fn below(threshold: f64) -> Self {
        Self::new(f64::NEG_INFINITY, threshold)
    }

    /// The interval reached by the "at or above threshold" branch of a split.
    #[inline]
    pub fn at_or_above(threshold: f64) -> Self {
        Self::new(threshold, f64::INFINITY)
    }

    /// Whether `lower <= value < upper`, the side a split sends `value` to.
    #[inline]
    pub fn contains(&self, value: f64) -> bool {
        self.lower <= value && value < self.upper
    }

    /// Whether `lower >= upper`.
    #[inline]
    pub fn is_degenerate(&self) -> bool {
        self.lower >= self.upper
    }

    /// Overlap of two intervals, or `None` if it is degenerate.
    #[inline]
    pub fn intersect(&self, other: &Interval) -> Option<Interval> {
        let lower = self.lower.max(other.lower);
        let upper = self.upper.min(other.upper);
        if lower < upper {
            Some(Interval { lower, upper })
        } else {
            None
        }
    }

    /// Distance from `value` to the interval (0 when inside).
    #[inline]
    pub fn gap(&self, value: f64) -> f64 {
        if value > self.upper {
            value - self.upper
        } else if value < self.lower {
            self.lower - value
        } else {
            0.0
        }
    }

    /// Whether `self` lies within `other`.
    #[inline]
    pub fn is_within(&self, other: &Interval) -> bool {
        self.lower >= other.lower && self.upper <= other.upper
    }
}

// =============================================================================
// Norm
// =============================================================================

/// Norm used to aggregate per-feature gaps into a point-to-box distance.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum Norm {
    /// Max-norm: the largest per-feature gap. Used for reachability.
    #[default]
    Linf,
    /// Number of features on which the point lies outside the box.
    L0,
    /// `(sum gap^p)^(1/p)` for `p > 0`.
    Lp(f64),
}

impl Norm {
    /// Map a numeric order to a norm: negative is max-norm, zero counts
    /// violated features, positive is the corresponding p-norm.
    pub fn from_order(order: f64) -> Self {
        if order < 0.0 {
            Norm::Linf
        } else if order == 0.0 {
            Norm::L0
        } else {
            Norm::Lp(order)
        }
    }

    #[inline]
    fn feature_term(self, gap: f64) -> f64 {
        if gap <= 0.0 {
            return 0.0;
        }
        match self {
            Norm::Linf => gap,
            Norm::L0 => 1.0,
            Norm::Lp(p) => gap.powf(p),
        }
    }

    #[inline]
    fn accumulate(self, acc: f64, term: f64) -> f64 {
        match self {
            Norm::Linf => acc.max(term),
            Norm::L0 | Norm::Lp(_) => acc + term,
        }
    }

    #[inline]
    fn finish(self, acc: f64) -> f64 {
        match self {
            Norm::Linf => acc,
            Norm::L0 => acc.trunc(),
            Norm::Lp(p) => acc.powf(1.0 / p),
        }
    }
}

// =============================================================================
// Errors
// =============================================================================

/// A box constrains a feature the point does not have.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum DimensionError {
    #[error("box constrains feature {feature} but point features start at {feature_start}")]
    BelowStart {
        feature: FeatureId,
        feature_start: FeatureId,
    },
    #[error("point dimension is {dims} but box constrains feature {feature} (index {index})")]
    OutOfRange {
        feature: FeatureId,
        index: usize,
        dims: usize,
    },
}

#[inline]
fn point_index(
    feature: FeatureId,
    feature_start: FeatureId,
    dims: usize,
) -> Result<usize, DimensionError> {
    let index = feature
        .checked_sub(feature_start)
        .ok_or(DimensionError::BelowStart {
            feature,
            feature_start,
        })? as usize;
    if index >= dims {
        return Err(DimensionError::OutOfRange {
            feature,
            index,
            dims,
        });
    }
    Ok(index)
}

// =============================================================================
// FeatureBox
// =============================================================================

/// Conjunction of per-feature interval constraints, or the infeasible region.
#[derive(Debug, Clone, PartialEq)]
pub enum FeatureBox {
    /// Feasible region. Constraints are sorted by feature and never degenerate.
    Region(Vec<(FeatureId, Interval)>),
    /// No input satisfies the constraints.
    Empty,
}

impl Default for FeatureBox {
    fn default() -> Self {
        FeatureBox::unbounded()
    }
}

impl FeatureBox {
    /// The whole feature space (no constraints).
    #[inline]
    pub fn unbounded() -> Self {
        FeatureBox::Region(Vec::new())
    }

    /// A box constraining a single feature.
    pub fn from_interval(feature: FeatureId, interval: Interval) -> Self {
        if interval.is_degenerate() {
            FeatureBox::Empty
        } else {
            FeatureBox::Region(vec![(feature, interval)])
        }
    }

    /// Build a box from unordered constraints, intersecting repeated features.
    pub fn from_constraints<I>(constraints: I) -> Self
    where
        I: IntoIterator<Item = (FeatureId, Interval)>,
    {
        constraints
            .into_iter()
            .fold(FeatureBox::unbounded(), |acc, (feature, interval)| {
                acc.intersect(&FeatureBox::from_interval(feature, interval))
            })
    }

    /// Whether this is the infeasible region.
    #[inline]
    pub fn is_infeasible(&self) -> bool {
        matches!(self, FeatureBox::Empty)
    }

    /// Sorted constraints of a feasible box; empty for [`FeatureBox::Empty`].
    #[inline]
    pub fn constraints(&self) -> &[(FeatureId, Interval)] {
        match self {
            FeatureBox::Region(c) => c,
            FeatureBox::Empty => &[],
        }
    }

    /// Constraint on `feature`, if any.
    pub fn interval(&self, feature: FeatureId) -> Option<Interval> {
        let constraints = self.constraints();
        constraints
            .binary_search_by_key(&feature, |&(f, _)| f)
            .ok()
            .map(|i| constraints[i].1)
    }

    /// Intersect two boxes.
    ///
    /// All-or-nothing: if any shared feature ends up degenerate, or either
    /// input is [`FeatureBox::Empty`], the result is [`FeatureBox::Empty`].
    pub fn intersect(&self, other: &FeatureBox) -> FeatureBox {
        let (a, b) = match (self, other) {
            (FeatureBox::Region(a), FeatureBox::Region(b)) => (a, b),
            _ => return FeatureBox::Empty,
        };

        let mut merged = Vec::with_capacity(a.len() + b.len());
        let (mut i, mut j) = (0, 0);
        while i < a.len() && j < b.len() {
            let (fa, ia) = a[i];
            let (fb, ib) = b[j];
            match fa.cmp(&fb) {
                Ordering::Less => {
                    merged.push((fa, ia));
                    i += 1;
                }
                Ordering::Greater => {
                    merged.push((fb, ib));
                    j += 1;
                }
                Ordering::Equal => {
                    match ia.intersect(&ib) {
                        Some(iv) => merged.push((fa, iv)),
                        None => return FeatureBox::Empty,
                    }
                    i += 1;
                    j += 1;
                }
            }
        }
        merged.extend_from_slice(&a[i..]);
        merged.extend_from_slice(&b[j..]);
        FeatureBox::Region(merged)
    }

    /// Whether `self ∩ other` is feasible, without building the intersection.
    pub fn intersects(&self, other: &FeatureBox) -> bool {
        let (a, b) = match (self, other) {
            (FeatureBox::Region(a), FeatureBox::Region(b)) => (a, b),
            _ => return false,
        };
        let (mut i, mut j) = (0, 0);
        while i < a.len() && j < b.len() {
            match a[i].0.cmp(&b[j].0) {
                Ordering::Less => i += 1,
                Ordering::Greater => j += 1,
                Ordering::Equal => {
                    if a[i].1.intersect(&b[j].1).is_none() {
                        return false;
                    }
                    i += 1;
                    j += 1;
                }
            }
        }
        true
    }

    /// Whether every input in `self` is also in `other`.
    pub fn is_subset_of(&self, other: &FeatureBox) -> bool {
        match (self, other) {
            (FeatureBox::Empty, _) => true,
            (FeatureBox::Region(_), FeatureBox::Empty) => false,
            (FeatureBox::Region(_), FeatureBox::Region(outer)) => {
                outer.iter().all(|&(feature, bound)| {
                    let own = self
                        .interval(feature)
                        .unwrap_or(Interval::new(f64::NEG_INFINITY, f64::INFINITY));
                    own.is_within(&bound)
                })
            }
        }
    }

    /// Distance from `point` to this box under `norm`.
    ///
    /// Box feature `f` corresponds to `point[f - feature_start]`. When
    /// `single_feature` is set, a nonzero gap on any other feature makes the
    /// box unreachable and the distance is `+inf`. The infeasible region is
    /// always at infinite distance.
    pub fn distance(
        &self,
        point: &[f64],
        norm: Norm,
        feature_start: FeatureId,
        single_feature: Option<usize>,
    ) -> Result<f64, DimensionError> {
        let constraints = match self {
            FeatureBox::Region(c) => c,
            FeatureBox::Empty => return Ok(f64::INFINITY),
        };

        let mut acc = 0.0;
        for &(feature, interval) in constraints {
            let index = point_index(feature, feature_start, point.len())?;
            let gap = interval.gap(point[index]);
            if gap > 0.0 && single_feature.is_some_and(|only| only != index) {
                return Ok(f64::INFINITY);
            }
            acc = norm.accumulate(acc, norm.feature_term(gap));
        }
        Ok(norm.finish(acc))
    }

    /// Whether the model routes `point` into this box.
    ///
    /// Uses half-open containment, so a value equal to a split threshold
    /// belongs to the `[threshold, +inf)` side.
    pub fn contains(
        &self,
        point: &[f64],
        feature_start: FeatureId,
    ) -> Result<bool, DimensionError> {
        let constraints = match self {
            FeatureBox::Region(c) => c,
            FeatureBox::Empty => return Ok(false),
        };
        for &(feature, interval) in constraints {
            let index = point_index(feature, feature_start, point.len())?;
            if !interval.contains(point[index]) {
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// Closest point to `point` inside this box.
    ///
    /// Features that already lie strictly inside their interval keep their
    /// value; others are moved `margin` inside the violated bound (at most
    /// half the interval width). Returns `None` for the infeasible region.
    pub fn closest_point(
        &self,
        point: &[f64],
        feature_start: FeatureId,
        margin: f64,
    ) -> Result<Option<Vec<f64>>, DimensionError> {
        let constraints = match self {
            FeatureBox::Region(c) => c,
            FeatureBox::Empty => return Ok(None),
        };

        let mut witness = point.to_vec();
        for &(feature, interval) in constraints {
            let index = point_index(feature, feature_start, point.len())?;
            let value = point[index];
            let step = margin.min((interval.upper - interval.lower) / 2.0);
            if value >= interval.upper {
                witness[index] = interval.upper - step;
            } else if value < interval.lower {
                witness[index] = interval.lower + step;
            }
        }
        Ok(Some(witness))
    }
}

impl fmt::Display for FeatureBox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FeatureBox::Empty => write!(f, "{{empty}}"),
            FeatureBox::Region(constraints) => {
                write!(f, "{{")?;
                for (i, (feature, iv)) in constraints.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}: [{}, {}]", feature, iv.lower, iv.upper)?;
                }
                write!(f, "}}")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn bounded(constraints: &[(FeatureId, f64, f64)]) -> FeatureBox {
        FeatureBox::from_constraints(
            constraints
                .iter()
                .map(|&(f, l, u)| (f, Interval::new(l, u))),
        )
    }

    #[test]
    fn wildcard_intersection_is_identity() {
        let b = bounded(&[(1, 0.0, 1.0), (3, -2.0, 2.0)]);
        assert_eq!(FeatureBox::unbounded().intersect(&b), b);
        assert_eq!(b.intersect(&FeatureBox::unbounded()), b);
    }

    #[test]
    fn intersection_narrows_shared_features() {
        let a = bounded(&[(1, 0.0, 1.0), (2, 0.0, 5.0)]);
        let b = bounded(&[(2, 1.0, 10.0), (4, 3.0, 4.0)]);
        let c = a.intersect(&b);
        assert_eq!(c, bounded(&[(1, 0.0, 1.0), (2, 1.0, 5.0), (4, 3.0, 4.0)]));
        assert!(a.intersects(&b));
    }

    #[test]
    fn touching_intervals_are_infeasible() {
        let a = FeatureBox::from_interval(1, Interval::below(0.5));
        let b = FeatureBox::from_interval(1, Interval::at_or_above(0.5));
        assert!(a.intersect(&b).is_infeasible());
        assert!(!a.intersects(&b));
    }

    #[test]
    fn empty_absorbs() {
        let b = bounded(&[(1, 0.0, 1.0)]);
        assert!(FeatureBox::Empty.intersect(&b).is_infeasible());
        assert!(b.intersect(&FeatureBox::Empty).is_infeasible());
        assert!(FeatureBox::Empty.intersect(&FeatureBox::unbounded()).is_infeasible());
    }

    #[test]
    fn from_constraints_collapses_to_empty() {
        let b = bounded(&[(0, 0.0, 1.0), (0, 2.0, 3.0)]);
        assert!(b.is_infeasible());
    }

    #[test]
    fn subset_relation() {
        let outer = bounded(&[(1, 0.0, 10.0)]);
        let inner = bounded(&[(1, 2.0, 3.0), (2, 0.0, 1.0)]);
        assert!(inner.is_subset_of(&outer));
        assert!(!outer.is_subset_of(&inner));
        assert!(!FeatureBox::unbounded().is_subset_of(&outer));
        assert!(FeatureBox::Empty.is_subset_of(&inner));
    }

    #[test]
    fn linf_distance_takes_largest_gap() {
        let b = bounded(&[(1, 0.0, 1.0), (2, 0.0, 1.0)]);
        let d = b.distance(&[1.5, -0.25], Norm::Linf, 1, None).unwrap();
        assert_abs_diff_eq!(d, 0.5, epsilon = 1e-12);
    }

    #[test]
    fn l2_and_l0_distances() {
        let b = bounded(&[(0, 0.0, 1.0), (1, 0.0, 1.0)]);
        let p = [4.0, -3.0 + 0.0];
        let l2 = b.distance(&p, Norm::Lp(2.0), 0, None).unwrap();
        assert_abs_diff_eq!(l2, (9.0f64 + 9.0).sqrt(), epsilon = 1e-12);
        let l0 = b.distance(&p, Norm::L0, 0, None).unwrap();
        assert_abs_diff_eq!(l0, 2.0);
        let l1 = b.distance(&p, Norm::from_order(1.0), 0, None).unwrap();
        assert_abs_diff_eq!(l1, 6.0, epsilon = 1e-12);
    }

    #[test]
    fn distance_zero_inside() {
        let b = bounded(&[(1, 0.0, 1.0)]);
        for norm in [Norm::Linf, Norm::L0, Norm::Lp(2.0)] {
            assert_eq!(b.distance(&[0.5], norm, 1, None).unwrap(), 0.0);
        }
    }

    #[test]
    fn single_feature_restriction() {
        let b = bounded(&[(1, 0.0, 1.0), (2, 0.0, 1.0)]);
        // Only index 0 may move; index 1 is outside its interval.
        let d = b.distance(&[2.0, 3.0], Norm::Linf, 1, Some(0)).unwrap();
        assert!(d.is_infinite());
        let d = b.distance(&[2.0, 0.5], Norm::Linf, 1, Some(0)).unwrap();
        assert_abs_diff_eq!(d, 1.0);
    }

    #[test]
    fn distance_rejects_foreign_features() {
        let b = bounded(&[(5, 0.0, 1.0)]);
        assert_eq!(
            b.distance(&[0.0, 0.0], Norm::Linf, 1, None),
            Err(DimensionError::OutOfRange {
                feature: 5,
                index: 4,
                dims: 2
            })
        );
        let b = bounded(&[(0, 0.0, 1.0)]);
        assert!(matches!(
            b.distance(&[0.0], Norm::Linf, 1, None),
            Err(DimensionError::BelowStart { .. })
        ));
    }

    #[test]
    fn closest_point_clamps_into_box() {
        let b = bounded(&[(0, 0.0, 1.0), (1, 2.0, f64::INFINITY)]);
        let w = b.closest_point(&[1.5, 0.0], 0, 1e-5).unwrap().unwrap();
        assert_abs_diff_eq!(w[0], 1.0 - 1e-5);
        assert_abs_diff_eq!(w[1], 2.0 + 1e-5);
        assert_eq!(b.distance(&w, Norm::Linf, 0, None).unwrap(), 0.0);
        assert!(FeatureBox::Empty.closest_point(&[0.0], 0, 1e-5).unwrap().is_none());
    }

    #[test]
    fn containment_is_half_open() {
        let b = bounded(&[(0, 0.0, 1.0), (1, 2.0, f64::INFINITY)]);
        assert!(b.contains(&[0.0, 2.0], 0).unwrap());
        assert!(!b.contains(&[1.0, 2.0], 0).unwrap());
        assert!(!b.contains(&[0.5, 1.999], 0).unwrap());
        assert!(!FeatureBox::Empty.contains(&[0.5, 3.0], 0).unwrap());
        assert!(b.contains(&[0.5], 0).is_err());
    }

    #[test]
    fn display_lists_constraints() {
        let b = bounded(&[(2, 0.0, 1.5)]);
        assert_eq!(b.to_string(), "{2: [0, 1.5]}");
        assert_eq!(FeatureBox::Empty.to_string(), "{empty}");
    }
}

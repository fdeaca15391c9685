//! Which way the adversary pushes the ensemble score.

/// Optimization direction of the worst-case search.
///
/// Derived once per certification call from the true label and the model
/// kind, then used for every score combination:
///
/// - binary model, true label is the low class (`label < 1`): the adversary
///   wants the score positive, so the search maximizes and the point is robust
///   while the bound stays below zero;
/// - binary model, high class, or any multiclass margin: the search minimizes
///   and the point is robust while the bound stays above zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Maximize,
    Minimize,
}

impl Direction {
    pub fn for_label(label: i32, n_classes: usize) -> Self {
        if n_classes <= 2 && label < 1 {
            Direction::Maximize
        } else {
            Direction::Minimize
        }
    }

    /// The more adversarial of two scores.
    #[inline]
    pub fn pick(self, a: f64, b: f64) -> f64 {
        match self {
            Direction::Maximize => a.max(b),
            Direction::Minimize => a.min(b),
        }
    }

    /// Neutral start value for folding with [`pick`](Self::pick).
    #[inline]
    pub fn identity(self) -> f64 {
        match self {
            Direction::Maximize => f64::NEG_INFINITY,
            Direction::Minimize => f64::INFINITY,
        }
    }

    /// Most adversarial score in `scores`, or the identity if empty.
    #[inline]
    pub fn best<I: IntoIterator<Item = f64>>(self, scores: I) -> f64 {
        scores
            .into_iter()
            .fold(self.identity(), |acc, s| self.pick(acc, s))
    }

    /// Whether `a` is at least as favorable to the verifier as `b`.
    #[inline]
    pub fn at_least_as_tight(self, a: f64, b: f64) -> bool {
        match self {
            Direction::Maximize => a <= b,
            Direction::Minimize => a >= b,
        }
    }

    /// Whether a worst-case bound proves the prediction cannot change.
    #[inline]
    pub fn is_robust(self, bound: f64) -> bool {
        match self {
            Direction::Maximize => bound < 0.0,
            Direction::Minimize => bound > 0.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(0, 2, Direction::Maximize)]
    #[case(-1, 2, Direction::Maximize)]
    #[case(1, 2, Direction::Minimize)]
    #[case(0, 3, Direction::Minimize)]
    #[case(2, 5, Direction::Minimize)]
    fn direction_from_label(
        #[case] label: i32,
        #[case] n_classes: usize,
        #[case] expected: Direction,
    ) {
        assert_eq!(Direction::for_label(label, n_classes), expected);
    }

    #[test]
    fn best_folds_in_direction() {
        let scores = [1.0, -2.0, 3.5];
        assert_eq!(Direction::Maximize.best(scores), 3.5);
        assert_eq!(Direction::Minimize.best(scores), -2.0);
        assert_eq!(Direction::Maximize.best([]), f64::NEG_INFINITY);
    }

    #[test]
    fn robustness_sign() {
        assert!(Direction::Maximize.is_robust(-0.1));
        assert!(!Direction::Maximize.is_robust(0.0));
        assert!(Direction::Minimize.is_robust(0.1));
        assert!(!Direction::Minimize.is_robust(-0.1));
    }

    #[test]
    fn tightness_ordering() {
        assert!(Direction::Minimize.at_least_as_tight(2.0, 1.0));
        assert!(Direction::Maximize.at_least_as_tight(1.0, 2.0));
    }
}

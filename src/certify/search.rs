//! Bisection over the perturbation radius.
//!
//! The history of tested radii drives the next radius:
//!
//! - no robust radius yet: halve the last one;
//! - robust radii only: double the last one, capped at 1, and stop once the
//!   last tested radius is already at least 1;
//! - both outcomes seen: the midpoint of the latest robust and latest refuted radius.

/// One tested radius and its outcome.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SearchStep {
    pub epsilon: f64,
    pub robust: bool,
}

/// Ordered record of the tested radii of one point.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchHistory {
    steps: Vec<SearchStep>,
    last_robust: Option<usize>,
    last_refuted: Option<usize>,
}

impl SearchHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append the outcome of testing `epsilon`.
    pub fn record(&mut self, epsilon: f64, robust: bool) {
        let idx = self.steps.len();
        self.steps.push(SearchStep { epsilon, robust });
        if robust {
            self.last_robust = Some(idx);
        } else {
            self.last_refuted = Some(idx);
        }
    }

    pub fn steps(&self) -> &[SearchStep] {
        &self.steps
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Radius of the most recent robust test.
    pub fn certified(&self) -> Option<f64> {
        self.last_robust.map(|i| self.steps[i].epsilon)
    }

    /// Radius of the most recent refuted test.
    pub fn refuted(&self) -> Option<f64> {
        self.last_refuted.map(|i| self.steps[i].epsilon)
    }

    /// Whether the first tested radius was robust.
    pub fn initially_robust(&self) -> bool {
        self.steps.first().is_some_and(|s| s.robust)
    }

    /// The next radius to test, or `None` when the search is over.
    ///
    /// Returns `None` before the first step has been recorded.
    pub fn next_epsilon(&self) -> Option<f64> {
        let last = self.steps.last()?.epsilon;
        match (self.certified(), self.refuted()) {
            (None, _) => Some(last * 0.5),
            (Some(_), None) if last >= 1.0 => None,
            (Some(_), None) => Some((last * 2.0).min(1.0)),
            (Some(robust), Some(refuted)) => Some(0.5 * (robust + refuted)),
        }
    }
}

/// Run a bisection of at most `max_search` tests starting at `epsilon_init`.
///
/// `test` returns whether the model is robust at the given radius; its first
/// error aborts the search.
pub fn bisect<E, F>(epsilon_init: f64, max_search: usize, mut test: F) -> Result<SearchHistory, E>
where
    F: FnMut(f64) -> Result<bool, E>,
{
    let mut history = SearchHistory::new();
    let mut epsilon = epsilon_init;
    for _ in 0..max_search {
        let robust = test(epsilon)?;
        history.record(epsilon, robust);
        match history.next_epsilon() {
            Some(next) => epsilon = next,
            None => break,
        }
    }
    Ok(history)
}

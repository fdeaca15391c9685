//! Certification driver: verdicts, per-point bisection, and batches.

use std::ops::Range;
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use crate::data::LabeledDataset;
use crate::repr::Ensemble;
use crate::utils::{run_with_threads, Parallelism};

use super::aggregate::{multi_level_bound, LevelBounds};
use super::reach::{reachable_leaves, ReachQuery};
use super::search::{bisect, SearchHistory};
use super::{CertifyConfig, CertifyError, ConfigError, Direction};

/// Distance the witness is moved inside a violated bound.
const WITNESS_MARGIN: f64 = 1e-6;

// =============================================================================
// Results
// =============================================================================

/// Level bounds of the margin against one target label.
#[derive(Debug, Clone, PartialEq)]
pub struct TargetBound {
    /// `None` for binary models.
    pub target: Option<u32>,
    pub levels: LevelBounds,
}

/// Outcome of testing one point at one radius.
#[derive(Debug, Clone, PartialEq)]
pub struct Verdict {
    pub epsilon: f64,
    pub direction: Direction,
    /// Whether every bound proves the prediction stable.
    pub robust: bool,
    pub bounds: Vec<TargetBound>,
    /// A point inside the worst root clique, for binary models whose
    /// aggregation reached a single root.
    ///
    /// Coordinates outside the clique are moved just inside its bounds, so the
    /// witness may lie up to `epsilon + 1e-6` from the tested point.
    pub witness: Option<Vec<f64>>,
}

impl Verdict {
    /// The least favorable final bound across targets.
    pub fn worst_bound(&self) -> f64 {
        self.direction
            .best(self.bounds.iter().map(|b| b.levels.bound()))
    }
}

/// Bisection result of one point.
#[derive(Debug, Clone, PartialEq)]
pub struct PointCertificate {
    /// Row of the point in its dataset.
    pub index: usize,
    pub label: i32,
    pub history: SearchHistory,
    /// Largest radius proven robust; `None` if no tested radius was.
    pub certified: Option<f64>,
    pub elapsed: Duration,
}

impl PointCertificate {
    /// Certified radius, reported as 0 when none was found.
    pub fn bound(&self) -> f64 {
        self.certified.unwrap_or(0.0)
    }

    pub fn initially_robust(&self) -> bool {
        self.history.initially_robust()
    }
}

/// A point whose certification stopped on an error.
#[derive(Debug, Clone, PartialEq)]
pub struct AbortedPoint {
    pub index: usize,
    pub error: CertifyError,
}

/// Accumulated results of a batch of points.
#[derive(Debug, Clone, Default)]
pub struct BatchSummary {
    pub certificates: Vec<PointCertificate>,
    pub aborted: Vec<AbortedPoint>,
    /// Number of points requested, including aborted ones.
    pub n_points: usize,
    /// Points robust at the initial radius.
    pub initially_robust: usize,
    /// Fraction of points not proven robust at the initial radius.
    pub verified_error: f64,
    /// Mean certified radius; points without one count as 0.
    pub average_bound: f64,
    pub elapsed: Duration,
}

impl BatchSummary {
    fn finish(mut self, elapsed: Duration) -> Self {
        self.elapsed = elapsed;
        if self.n_points > 0 {
            let n = self.n_points as f64;
            self.verified_error = 1.0 - self.initially_robust as f64 / n;
            self.average_bound = self
                .certificates
                .iter()
                .map(PointCertificate::bound)
                .sum::<f64>()
                / n;
        }
        self
    }
}

// =============================================================================
// Certifier
// =============================================================================

/// Robustness certifier of a tree ensemble.
///
/// # Example
///
/// ```
/// use treecert::compat::XgbDump;
/// use treecert::{Certifier, CertifyConfig};
///
/// let dump = XgbDump::from_json_str(r#"[{
///     "nodeid": 0, "split": 1, "split_condition": 0.5, "yes": 1, "no": 2,
///     "children": [{"nodeid": 1, "leaf": -1.0}, {"nodeid": 2, "leaf": 1.0}]
/// }]"#).unwrap();
/// let ensemble = dump.to_ensemble(2).unwrap();
/// let config = CertifyConfig::builder().epsilon_init(0.1).build().unwrap();
/// let certifier = Certifier::new(&ensemble, config).unwrap();
///
/// assert!(certifier.verdict(&[0.3], 0, 0.1).unwrap().robust);
/// assert!(!certifier.verdict(&[0.3], 0, 0.25).unwrap().robust);
/// ```
#[derive(Debug, Clone)]
pub struct Certifier<'a> {
    ensemble: &'a Ensemble,
    config: CertifyConfig,
    parallelism: Parallelism,
}

impl<'a> Certifier<'a> {
    /// Fails if the configuration is invalid or disagrees with the model's
    /// class count.
    pub fn new(ensemble: &'a Ensemble, config: CertifyConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        config.validate_for_ensemble(ensemble)?;
        let parallelism = Parallelism::from_threads(config.n_threads);
        Ok(Self {
            ensemble,
            config,
            parallelism,
        })
    }

    /// Override the parallelism derived from `n_threads`.
    pub fn with_parallelism(mut self, parallelism: Parallelism) -> Self {
        self.parallelism = parallelism;
        self
    }

    pub fn ensemble(&self) -> &Ensemble {
        self.ensemble
    }

    pub fn config(&self) -> &CertifyConfig {
        &self.config
    }

    fn check_point(&self, point: &[f64]) -> Result<(), CertifyError> {
        match self.config.single_feature {
            Some(index) if index >= point.len() => Err(CertifyError::SingleFeatureOutOfRange {
                index,
                n_features: point.len(),
            }),
            _ => Ok(()),
        }
    }

    fn check_label(&self, label: i32) -> Result<(), CertifyError> {
        let n_classes = self.ensemble.n_classes();
        if self.ensemble.is_multiclass() && !(0..n_classes as i32).contains(&label) {
            return Err(CertifyError::LabelOutOfRange { label, n_classes });
        }
        Ok(())
    }

    /// Target labels to check for a multi-class `label`.
    fn targets(&self, label: i32) -> Vec<Option<u32>> {
        if !self.ensemble.is_multiclass() {
            return vec![None];
        }
        match self.config.target {
            Some(target) => vec![Some(target)],
            None => (0..self.ensemble.n_classes() as u32)
                .filter(|&t| t as i32 != label)
                .map(Some)
                .collect(),
        }
    }

    fn target_bound(
        &self,
        point: &[f64],
        label: i32,
        target: Option<u32>,
        epsilon: f64,
        direction: Direction,
    ) -> Result<TargetBound, CertifyError> {
        let query = ReachQuery {
            point,
            epsilon,
            label,
            target,
            feature_start: self.config.feature_start,
            single_feature: self.config.single_feature,
        };
        let reachable = reachable_leaves(self.ensemble, &query)?;
        let levels = multi_level_bound(
            reachable,
            target,
            direction,
            self.config.aggregate_params(),
            self.parallelism,
        )?;
        debug!(?target, per_level = ?levels.per_level, "target bound");
        Ok(TargetBound { target, levels })
    }

    /// Test whether `point` keeps its prediction within `epsilon`.
    ///
    /// Binary models are robust when the worst-case score stays on the side of
    /// zero that matches `label`. Multi-class models are robust when the margin
    /// against every checked target label stays positive.
    pub fn verdict(
        &self,
        point: &[f64],
        label: i32,
        epsilon: f64,
    ) -> Result<Verdict, CertifyError> {
        self.check_label(label)?;
        self.check_point(point)?;
        let direction = Direction::for_label(label, self.ensemble.n_classes());

        let bounds = self
            .parallelism
            .maybe_par_map(self.targets(label), |target| {
                self.target_bound(point, label, target, epsilon, direction)
            })
            .into_iter()
            .collect::<Result<Vec<_>, _>>()?;

        let robust = bounds
            .iter()
            .all(|b| direction.is_robust(b.levels.bound()));

        let witness = match bounds.as_slice() {
            [only] if only.target.is_none() => match only.levels.worst_root_leaf() {
                Some(leaf) => leaf.region.closest_point(
                    point,
                    self.config.feature_start,
                    WITNESS_MARGIN,
                )?,
                None => None,
            },
            _ => None,
        };

        Ok(Verdict {
            epsilon,
            direction,
            robust,
            bounds,
            witness,
        })
    }

    /// Bisect the largest robust radius of one point.
    ///
    /// Failing to find any robust radius is not an error: the certificate then
    /// has `certified == None` and reports a bound of 0.
    pub fn certify_point(
        &self,
        index: usize,
        point: &[f64],
        label: i32,
    ) -> Result<PointCertificate, CertifyError> {
        let start = Instant::now();
        self.check_label(label)?;

        let history = bisect::<CertifyError, _>(
            self.config.epsilon_init,
            self.config.max_search,
            |epsilon| {
                let verdict = self.verdict(point, label, epsilon)?;
                info!(
                    index,
                    epsilon,
                    robust = verdict.robust,
                    bound = verdict.worst_bound(),
                    "tested radius"
                );
                Ok(verdict.robust)
            },
        )?;

        let certified = history.certified();
        let elapsed = start.elapsed();
        match certified {
            Some(bound) => info!(index, label, bound, ?elapsed, "point certified"),
            None => warn!(index, label, "no robust radius found, reporting bound 0"),
        }

        Ok(PointCertificate {
            index,
            label,
            history,
            certified,
            elapsed,
        })
    }

    /// Certify the points of `dataset` in `range`.
    ///
    /// Indices past the end of the dataset are skipped. Points whose
    /// certification fails are recorded in [`BatchSummary::aborted`] and the
    /// batch continues.
    pub fn certify_range(&self, dataset: &LabeledDataset, range: Range<usize>) -> BatchSummary {
        let start = Instant::now();
        let range = range.start.min(dataset.n_points())..range.end.min(dataset.n_points());

        let summary = run_with_threads(self.config.n_threads, |_| {
            let mut summary = BatchSummary {
                n_points: range.len(),
                ..Default::default()
            };
            for index in range.clone() {
                match self.certify_point(index, dataset.point(index), dataset.label(index)) {
                    Ok(certificate) => {
                        if certificate.initially_robust() {
                            summary.initially_robust += 1;
                        }
                        summary.certificates.push(certificate);
                    }
                    Err(error) => {
                        warn!(index, %error, "point aborted");
                        summary.aborted.push(AbortedPoint { index, error });
                    }
                }
            }
            summary
        });

        let summary = summary.finish(start.elapsed());
        info!(
            points = summary.n_points,
            aborted = summary.aborted.len(),
            initially_robust = summary.initially_robust,
            verified_error = summary.verified_error,
            average_bound = summary.average_bound,
            elapsed = ?summary.elapsed,
            "batch finished"
        );
        summary
    }
}

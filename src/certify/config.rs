//! Certification configuration with builder pattern.
//!
//! [`CertifyConfig`] holds the knobs of the bisection and of the clique
//! aggregation. It can be built in code via the `bon` builder or read from a
//! JSON run file, whose keys follow the historical names (`eps_init`,
//! `one_attr`).
//!
//! # Example
//!
//! ```
//! use treecert::CertifyConfig;
//!
//! let config = CertifyConfig::builder()
//!     .epsilon_init(0.1)
//!     .max_clique(4)
//!     .max_level(2)
//!     .dp(true)
//!     .build()
//!     .unwrap();
//! assert_eq!(config.max_search, 10);
//! ```

use std::fs::File;
use std::io::{BufReader, Read};
use std::ops::Range;
use std::path::{Path, PathBuf};

use bon::Builder;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

use crate::repr::Ensemble;

use super::aggregate::AggregateParams;

// =============================================================================
// ConfigError
// =============================================================================

/// Errors that can occur while reading or validating a configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("epsilon_init must be positive and finite, got {0}")]
    InvalidEpsilon(f64),

    #[error("{field} must be at least 1")]
    ZeroCount { field: &'static str },

    #[error("target label {target} is out of range for {n_classes} classes")]
    InvalidTarget { target: u32, n_classes: usize },

    #[error("a target label requires a multi-class model")]
    TargetRequiresMulticlass,

    #[error("config declares {config} classes but the model has {model}")]
    ClassCountMismatch { config: usize, model: usize },

    #[error("single feature index {index} is out of range for {n_features} features")]
    SingleFeatureOutOfRange { index: usize, n_features: usize },

    #[error("failed to read run file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse run file: {0}")]
    Json(#[from] serde_json::Error),
}

// =============================================================================
// Serde helpers
// =============================================================================

/// Accept `true`/`false`, numbers, and their string spellings.
fn deserialize_bool_any<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error as SerdeError;

    let value = Value::deserialize(deserializer)?;
    match value {
        Value::Bool(b) => Ok(b),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                return Ok(i != 0);
            }
            if let Some(f) = n.as_f64() {
                return Ok(f != 0.0);
            }
            Err(SerdeError::custom("invalid number for bool"))
        }
        Value::String(s) => {
            let t = s.trim();
            if t.eq_ignore_ascii_case("true") || t == "1" {
                return Ok(true);
            }
            if t.eq_ignore_ascii_case("false") || t == "0" {
                return Ok(false);
            }
            Err(SerdeError::custom(format!("cannot parse bool from string: {s}")))
        }
        _ => Err(SerdeError::custom("unsupported type for bool")),
    }
}

const DEFAULT_EPSILON_INIT: f64 = 0.3;
const DEFAULT_MAX_SEARCH: usize = 10;
const DEFAULT_MAX_CLIQUE: usize = 2;
const DEFAULT_MAX_LEVEL: usize = 1;
const DEFAULT_NUM_CLASSES: usize = 2;
const DEFAULT_FEATURE_START: u32 = 1;
const DEFAULT_N_THREADS: usize = 1;

fn default_epsilon_init() -> f64 {
    DEFAULT_EPSILON_INIT
}

fn default_max_search() -> usize {
    DEFAULT_MAX_SEARCH
}

fn default_max_clique() -> usize {
    DEFAULT_MAX_CLIQUE
}

fn default_max_level() -> usize {
    DEFAULT_MAX_LEVEL
}

fn default_num_classes() -> usize {
    DEFAULT_NUM_CLASSES
}

fn default_feature_start() -> u32 {
    DEFAULT_FEATURE_START
}

fn default_n_threads() -> usize {
    DEFAULT_N_THREADS
}

// =============================================================================
// CertifyConfig
// =============================================================================

/// Configuration of a robustness certification run.
#[derive(Debug, Clone, PartialEq, Builder, Deserialize)]
#[builder(
    derive(Clone, Debug),
    finish_fn(vis = "", name = __build_internal)
)]
pub struct CertifyConfig {
    // === Bisection ===
    /// First radius tested for every point. Default: 0.3.
    #[builder(default = DEFAULT_EPSILON_INIT)]
    #[serde(rename = "eps_init", default = "default_epsilon_init")]
    pub epsilon_init: f64,

    /// Maximum number of radii tested per point. Default: 10.
    #[builder(default = DEFAULT_MAX_SEARCH)]
    #[serde(default = "default_max_search")]
    pub max_search: usize,

    // === Aggregation ===
    /// Maximum number of trees searched jointly. Default: 2.
    #[builder(default = DEFAULT_MAX_CLIQUE)]
    #[serde(default = "default_max_clique")]
    pub max_clique: usize,

    /// Maximum number of aggregation levels. Default: 1.
    #[builder(default = DEFAULT_MAX_LEVEL)]
    #[serde(default = "default_max_level")]
    pub max_level: usize,

    /// Chain the partitions of the last level by box compatibility.
    #[builder(default)]
    #[serde(default, deserialize_with = "deserialize_bool_any")]
    pub dp: bool,

    // === Model and data layout ===
    /// Number of classes; values below 2 mean a binary model. Default: 2.
    #[builder(default = DEFAULT_NUM_CLASSES)]
    #[serde(default = "default_num_classes")]
    pub num_classes: usize,

    /// Model feature id of the first dense column. Default: 1.
    #[builder(default = DEFAULT_FEATURE_START)]
    #[serde(default = "default_feature_start")]
    pub feature_start: u32,

    /// Dense index of the only feature the adversary may change.
    #[serde(rename = "one_attr", default)]
    pub single_feature: Option<usize>,

    /// Multi-class only: check this target label instead of every other label.
    #[serde(default)]
    pub target: Option<u32>,

    // === Resource control ===
    /// Number of threads: 0 = auto, 1 = sequential. Default: 1.
    #[builder(default = DEFAULT_N_THREADS)]
    #[serde(default = "default_n_threads")]
    pub n_threads: usize,
}

impl Default for CertifyConfig {
    fn default() -> Self {
        Self {
            epsilon_init: DEFAULT_EPSILON_INIT,
            max_search: DEFAULT_MAX_SEARCH,
            max_clique: DEFAULT_MAX_CLIQUE,
            max_level: DEFAULT_MAX_LEVEL,
            dp: false,
            num_classes: DEFAULT_NUM_CLASSES,
            feature_start: DEFAULT_FEATURE_START,
            single_feature: None,
            target: None,
            n_threads: DEFAULT_N_THREADS,
        }
    }
}

/// Custom finishing function that validates the config.
impl<S: certify_config_builder::IsComplete> CertifyConfigBuilder<S> {
    /// Build and validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if any parameter is invalid (see
    /// [`CertifyConfig::validate`]).
    pub fn build(self) -> Result<CertifyConfig, ConfigError> {
        let config = self.__build_internal();
        config.validate()?;
        Ok(config)
    }
}

impl CertifyConfig {
    /// Validate the configuration.
    ///
    /// Rejects a non-positive `epsilon_init`, zero `max_search`, `max_clique`
    /// or `max_level`, and a target label that does not fit the class count.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.epsilon_init.is_finite() && self.epsilon_init > 0.0) {
            return Err(ConfigError::InvalidEpsilon(self.epsilon_init));
        }
        for (field, value) in [
            ("max_search", self.max_search),
            ("max_clique", self.max_clique),
            ("max_level", self.max_level),
        ] {
            if value == 0 {
                return Err(ConfigError::ZeroCount { field });
            }
        }
        if let Some(target) = self.target {
            let n_classes = self.n_classes();
            if n_classes <= 2 {
                return Err(ConfigError::TargetRequiresMulticlass);
            }
            if target as usize >= n_classes {
                return Err(ConfigError::InvalidTarget { target, n_classes });
            }
        }
        Ok(())
    }

    /// Check the single-feature restriction against the dataset width.
    pub fn validate_for_features(&self, n_features: usize) -> Result<(), ConfigError> {
        match self.single_feature {
            Some(index) if index >= n_features => {
                Err(ConfigError::SingleFeatureOutOfRange { index, n_features })
            }
            _ => Ok(()),
        }
    }

    /// Check the class count and target label against a loaded model.
    pub fn validate_for_ensemble(&self, ensemble: &Ensemble) -> Result<(), ConfigError> {
        let n_classes = ensemble.n_classes();
        if self.n_classes() != n_classes {
            return Err(ConfigError::ClassCountMismatch {
                config: self.n_classes(),
                model: n_classes,
            });
        }
        if let Some(target) = self.target {
            if !ensemble.is_multiclass() {
                return Err(ConfigError::TargetRequiresMulticlass);
            }
            if target as usize >= n_classes {
                return Err(ConfigError::InvalidTarget { target, n_classes });
            }
        }
        Ok(())
    }

    /// Effective number of classes (at least 2).
    #[inline]
    pub fn n_classes(&self) -> usize {
        self.num_classes.max(2)
    }

    pub fn aggregate_params(&self) -> AggregateParams {
        AggregateParams {
            max_clique: self.max_clique,
            max_level: self.max_level,
            dp: self.dp,
        }
    }
}

// =============================================================================
// RunFile
// =============================================================================

/// A complete command-line run: inputs plus certification settings.
///
/// ```json
/// {
///   "inputs": "data/test.libsvm",
///   "model": "models/model.json",
///   "start_idx": 0,
///   "num_attack": 100,
///   "eps_init": 0.3,
///   "max_clique": 2,
///   "max_search": 10,
///   "max_level": 1,
///   "num_classes": 2
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RunFile {
    /// LIBSVM dataset.
    pub inputs: PathBuf,
    /// XGBoost JSON dump.
    pub model: PathBuf,
    /// Index of the first point to certify.
    #[serde(default)]
    pub start_idx: usize,
    /// Number of points to certify; all remaining points when absent.
    #[serde(default)]
    pub num_attack: Option<usize>,
    /// Fixed dataset width; inferred from the data when absent.
    #[serde(default)]
    pub n_features: Option<usize>,
    #[serde(flatten)]
    pub certify: CertifyConfig,
}

impl RunFile {
    /// Parse and validate a run file.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self, ConfigError> {
        let run: RunFile = serde_json::from_reader(reader)?;
        run.certify.validate()?;
        Ok(run)
    }

    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        Self::from_reader(json.as_bytes())
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let file = File::open(path.as_ref())?;
        Self::from_reader(BufReader::new(file))
    }

    /// The point indices to certify, clamped to a dataset of `n_points`.
    pub fn point_range(&self, n_points: usize) -> Range<usize> {
        let start = self.start_idx.min(n_points);
        let available = n_points - start;
        let count = self.num_attack.map_or(available, |n| n.min(available));
        start..start + count
    }
}

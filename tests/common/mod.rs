//! Shared test-case loading for integration tests.
//!
//! A case named `{name}` lives in `tests/test-cases/certify/` as
//! `{name}.model.json` (XGBoost JSON dump), `{name}.data.libsvm` (points) and
//! `{name}.expected.json` ([`Expected`]).

#![allow(dead_code)]

use std::fs::File;
use std::path::PathBuf;

use serde::Deserialize;

use treecert::compat::XgbDump;
use treecert::data::load_libsvm;
use treecert::{CertifyConfig, Ensemble, LabeledDataset};

/// Tolerance for bound comparisons.
pub const DEFAULT_TOLERANCE: f64 = 1e-9;

/// Expected verdicts and certificates of a case.
#[derive(Debug, Deserialize)]
pub struct Expected {
    pub num_classes: usize,
    pub checks: Vec<VerdictCheck>,
    #[serde(default)]
    pub certified: Vec<CertifiedCheck>,
}

/// One `(point, epsilon)` test with optional config overrides.
#[derive(Debug, Deserialize)]
pub struct VerdictCheck {
    pub point: usize,
    pub epsilon: f64,
    pub robust: bool,
    /// Per checked target (ascending), the per-level bounds.
    pub bounds: Vec<Vec<f64>>,
    pub max_clique: Option<usize>,
    pub max_level: Option<usize>,
    pub dp: Option<bool>,
    pub target: Option<u32>,
}

impl VerdictCheck {
    pub fn config(&self, num_classes: usize) -> CertifyConfig {
        let defaults = CertifyConfig::default();
        CertifyConfig::builder()
            .num_classes(num_classes)
            .max_clique(self.max_clique.unwrap_or(defaults.max_clique))
            .max_level(self.max_level.unwrap_or(defaults.max_level))
            .dp(self.dp.unwrap_or(defaults.dp))
            .maybe_target(self.target)
            .build()
            .expect("valid check config")
    }
}

/// Expected bisection result of one point.
#[derive(Debug, Deserialize)]
pub struct CertifiedCheck {
    pub point: usize,
    pub epsilon_init: f64,
    pub max_search: usize,
    pub value: f64,
}

pub fn cases_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/test-cases/certify")
}

pub struct Case {
    pub dump: XgbDump,
    pub ensemble: Ensemble,
    pub dataset: LabeledDataset,
    pub expected: Expected,
}

pub fn load_case(name: &str) -> Case {
    let dir = cases_dir();
    let expected: Expected = serde_json::from_reader(
        File::open(dir.join(format!("{name}.expected.json"))).expect("expected file"),
    )
    .expect("parse expected");
    let dump = XgbDump::load(dir.join(format!("{name}.model.json"))).expect("model file");
    let ensemble = dump
        .to_ensemble(expected.num_classes)
        .expect("convert model");
    let dataset =
        load_libsvm(dir.join(format!("{name}.data.libsvm")), 1, None).expect("data file");
    Case {
        dump,
        ensemble,
        dataset,
        expected,
    }
}

//! Certify the robustness of an XGBoost tree dump on a LIBSVM dataset.
//!
//! Examples:
//! - Run the settings of a run file:
//!   `cargo run --release --bin treecert -- run.json`
//!
//! - Override the point range and threads, and write a JSON report:
//!   `cargo run --release --bin treecert -- run.json --start-idx 10 --num-attack 5 --threads 0 --out report.json`
//!
//! Logging is controlled by `RUST_LOG` (default `info`).

use std::fs::File;
use std::io::BufWriter;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use serde::Serialize;
use tracing::info;
use tracing_subscriber::EnvFilter;

use treecert::compat::XgbDump;
use treecert::data::load_libsvm;
use treecert::{BatchSummary, Certifier, RunFile};

#[derive(Debug, Parser)]
#[command(name = "treecert", version, about = "Robustness certification for tree ensembles")]
struct Cli {
    /// JSON run file (inputs, model, and certification settings).
    run_file: PathBuf,

    /// Override the index of the first point.
    #[arg(long)]
    start_idx: Option<usize>,

    /// Override the number of points to certify.
    #[arg(long)]
    num_attack: Option<usize>,

    /// Number of threads (0 = all cores, 1 = sequential).
    #[arg(long)]
    threads: Option<usize>,

    /// Write a JSON report of every point to this file.
    #[arg(long)]
    out: Option<PathBuf>,
}

#[derive(Debug, Serialize)]
struct PointReport {
    index: usize,
    label: i32,
    tested: Vec<(f64, bool)>,
    certified: Option<f64>,
    seconds: f64,
}

#[derive(Debug, Serialize)]
struct Report {
    points: usize,
    aborted: Vec<(usize, String)>,
    initially_robust: usize,
    verified_error: f64,
    average_bound: f64,
    seconds: f64,
    per_point: Vec<PointReport>,
}

impl From<&BatchSummary> for Report {
    fn from(summary: &BatchSummary) -> Self {
        Self {
            points: summary.n_points,
            aborted: summary
                .aborted
                .iter()
                .map(|a| (a.index, a.error.to_string()))
                .collect(),
            initially_robust: summary.initially_robust,
            verified_error: summary.verified_error,
            average_bound: summary.average_bound,
            seconds: summary.elapsed.as_secs_f64(),
            per_point: summary
                .certificates
                .iter()
                .map(|c| PointReport {
                    index: c.index,
                    label: c.label,
                    tested: c.history.steps().iter().map(|s| (s.epsilon, s.robust)).collect(),
                    certified: c.certified,
                    seconds: c.elapsed.as_secs_f64(),
                })
                .collect(),
        }
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let mut run = RunFile::load(&cli.run_file)
        .with_context(|| format!("reading run file {}", cli.run_file.display()))?;
    if let Some(start_idx) = cli.start_idx {
        run.start_idx = start_idx;
    }
    if cli.num_attack.is_some() {
        run.num_attack = cli.num_attack;
    }
    if let Some(threads) = cli.threads {
        run.certify.n_threads = threads;
    }
    info!(config = ?run.certify, "loaded run file");

    let dataset = load_libsvm(&run.inputs, run.certify.feature_start, run.n_features)
        .with_context(|| format!("loading dataset {}", run.inputs.display()))?;
    run.certify
        .validate_for_features(dataset.n_features())
        .context("checking single-feature restriction")?;
    info!(
        points = dataset.n_points(),
        features = dataset.n_features(),
        "loaded dataset"
    );

    let ensemble = XgbDump::load(&run.model)
        .and_then(|dump| dump.to_ensemble(run.certify.n_classes()))
        .with_context(|| format!("loading model {}", run.model.display()))?;
    info!(
        trees = ensemble.n_trees(),
        leaves = ensemble.n_leaves(),
        classes = ensemble.n_classes(),
        "loaded model"
    );

    let range = run.point_range(dataset.n_points());
    let certifier = Certifier::new(&ensemble, run.certify.clone())
        .context("checking settings against the model")?;
    let summary = certifier.certify_range(&dataset, range);

    println!("points: {}", summary.n_points);
    println!("aborted: {}", summary.aborted.len());
    println!("average bound: {}", summary.average_bound);
    println!(
        "verified error at epsilon {} = {}",
        run.certify.epsilon_init, summary.verified_error
    );
    println!("total running time: {:.3} seconds", summary.elapsed.as_secs_f64());
    if summary.n_points > 0 {
        println!(
            "per point running time: {:.3} seconds",
            summary.elapsed.as_secs_f64() / summary.n_points as f64
        );
    }

    if let Some(path) = cli.out {
        let file = File::create(&path)
            .with_context(|| format!("creating report {}", path.display()))?;
        serde_json::to_writer_pretty(BufWriter::new(file), &Report::from(&summary))
            .with_context(|| format!("writing report {}", path.display()))?;
        info!(path = %path.display(), "report written");
    }

    Ok(())
}

//! qtune CLI: staged hyperparameter search over a feature/label CSV.
//!
//! Runs every stage of a TOML plan (or the built-in four-stage default),
//! scores the resolved configuration on the validation rows and prints it as
//! JSON on stdout. Logs and the summary table go to stderr.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{ArgAction, Parser};
use tracing::info;
use tracing_subscriber::EnvFilter;

use qtune_core::booster::GradientBooster;
use qtune_core::metrics::ClassificationReport;
use qtune_runner::{load_csv, score_report, StagingController, TrialHistory, TuneConfig, TuneReport};

#[derive(Parser)]
#[command(name = "qtune", about = "qtune: staged TPE tuning for the native gradient booster")]
struct Cli {
    /// CSV with a group column, a label column and numeric features.
    input: PathBuf,

    /// Increase log verbosity (-v info, -vv debug). RUST_LOG wins when set.
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,

    /// TOML stage plan. Defaults to the built-in four-stage plan.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Override every stage budget.
    #[arg(long)]
    max_evals: Option<usize>,

    /// Override the validation fraction.
    #[arg(long)]
    validation_fraction: Option<f64>,

    /// Append every trial to this JSONL file.
    #[arg(long)]
    history: Option<PathBuf>,

    /// Write the full run report (stages, scores, timings) as JSON.
    #[arg(long)]
    report: Option<PathBuf>,

    /// Skip the final validation scoring pass.
    #[arg(long, default_value_t = false)]
    no_score: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    run_tune(cli)
}

fn init_tracing(verbose: u8) {
    let fallback = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| fallback.into()))
        .with_writer(std::io::stderr)
        .init();
}

fn run_tune(cli: Cli) -> Result<()> {
    let mut config = match cli.config.as_deref() {
        Some(path) => TuneConfig::from_file(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => TuneConfig::default(),
    };
    if let Some(budget) = cli.max_evals {
        config = config.with_budget_override(budget);
    }
    if let Some(fraction) = cli.validation_fraction {
        config.validation_fraction = fraction;
    }
    let plan = config.to_plan().context("building stage plan")?;
    let fraction = plan.validation_fraction;

    let input = cli.input.as_path();
    let data = load_csv(input, &config.data)
        .with_context(|| format!("loading dataset {}", input.display()))?;
    info!(rows = data.len(), features = data.features().n_cols(), "dataset loaded");

    let mut history = cli
        .history
        .map(|path| {
            TrialHistory::create(&path)
                .with_context(|| format!("opening history {}", path.display()))
        })
        .transpose()?;

    let controller = StagingController::new(GradientBooster, plan);
    let mut report = controller.run(&data, &mut history)?;

    if let Some(history) = history {
        let path = history.path().to_path_buf();
        let written = history
            .finish()
            .with_context(|| format!("writing history {}", path.display()))?;
        info!(entries = written, path = %path.display(), "history written");
    }

    if !cli.no_score {
        score_report(&GradientBooster, &data, fraction, &mut report)?;
        if let Some(scores) = &report.validation {
            print_scores(&report, scores);
        }
    }

    if let Some(path) = cli.report.as_deref() {
        report
            .write_json(path)
            .with_context(|| format!("writing report {}", path.display()))?;
        eprintln!("Report saved to: {}", path.display());
    }

    println!("{}", serde_json::to_string_pretty(&report.final_config)?);
    Ok(())
}

fn print_scores(report: &TuneReport, scores: &ClassificationReport) {
    eprintln!("=== Tuning Summary ===");
    for stage in &report.stages {
        eprintln!(
            "  stage {} {:<16} best loss {:>8.4} (trial {})",
            stage.stage_index, stage.stage_name, stage.best.loss, stage.best.index
        );
    }
    eprintln!("Evaluations:  {}", report.total_evaluations);
    eprintln!("Validation:   {} rows", scores.rows);
    eprintln!("Accuracy:     {:.4}", scores.accuracy);
    eprintln!("Macro F1:     {:.4}", scores.macro_f1());
    eprintln!();
    eprintln!("  class  precision  recall     f1  support");
    for c in &scores.classes {
        eprintln!(
            "  {:>5}  {:>9.4}  {:>6.4}  {:>5.4}  {:>7}",
            c.class, c.precision, c.recall, c.f1, c.support
        );
    }
}

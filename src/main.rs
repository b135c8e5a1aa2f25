//! Site Profit CLI
//!
//! Train a profit model on labeled locations, then rank candidate
//! locations with it.
//!
//! ```bash
//! site-profit train --train data/locations_train.csv --outdir outputs
//! site-profit score --candidates data/locations_candidates.csv --model outputs/model.json
//! ```

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use site_profit::{
    run_scoring, run_training, CsvSource, DirectorySink, FittedModel, PipelineConfig, Selection,
    TrainingConfig,
};
use std::path::PathBuf;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser)]
#[command(name = "site-profit")]
#[command(about = "Coffee shop location profit regression", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Verbosity level
    #[arg(short, long, default_value = "info")]
    log_level: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Train an elastic-net model on labeled locations
    Train {
        /// Path to the labeled locations CSV
        #[arg(long)]
        train: PathBuf,

        /// Output directory
        #[arg(short, long, default_value = "outputs")]
        outdir: PathBuf,

        /// Regularization strength
        #[arg(long, default_value = "0.05")]
        alpha: f64,

        /// Share of the L1 penalty
        #[arg(long, default_value = "0.2")]
        l1_ratio: f64,

        /// Maximum coordinate descent iterations
        #[arg(long, default_value = "1000")]
        max_iter: usize,

        /// Convergence tolerance
        #[arg(long, default_value = "0.0001")]
        tolerance: f64,

        /// Random seed for the split and coordinate selection
        #[arg(long, default_value = "42")]
        seed: u64,

        /// Share of rows held out for evaluation
        #[arg(long, default_value = "0.25")]
        test_size: f64,

        /// Update coordinates in a seeded random order
        #[arg(long)]
        random_selection: bool,
    },

    /// Score candidate locations with a trained model
    Score {
        /// Path to the candidate locations CSV
        #[arg(long)]
        candidates: PathBuf,

        /// Path to the fitted model
        #[arg(short, long, default_value = "outputs/model.json")]
        model: PathBuf,

        /// Output directory
        #[arg(short, long, default_value = "outputs")]
        outdir: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = match cli.log_level.as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder().with_max_level(level).finish();
    tracing::subscriber::set_global_default(subscriber)?;

    match cli.command {
        Commands::Train {
            train,
            outdir,
            alpha,
            l1_ratio,
            max_iter,
            tolerance,
            seed,
            test_size,
            random_selection,
        } => {
            let selection = if random_selection {
                Selection::Random
            } else {
                Selection::Cyclic
            };
            let config = TrainingConfig::default()
                .pipeline(
                    PipelineConfig::default()
                        .alpha(alpha)
                        .l1_ratio(l1_ratio)
                        .max_iter(max_iter)
                        .tolerance(tolerance)
                        .seed(seed)
                        .selection(selection),
                )
                .test_size(test_size)
                .split_seed(seed);

            let source = CsvSource::new().with_training(&train);
            let mut sink = DirectorySink::create(&outdir).with_context(|| {
                format!("Failed to prepare output directory {:?}", outdir)
            })?;

            let report = run_training(&source, &mut sink, &config)
                .with_context(|| format!("Training on {:?} failed", train))?;

            println!("\n{}", report.model.summary());
            println!("{}", report.metrics.report());
            println!(
                "Train rows: {}, holdout rows: {}",
                report.n_train, report.n_holdout
            );
            info!("Artifacts saved to {:?}", sink.outdir());
        }

        Commands::Score {
            candidates,
            model,
            outdir,
        } => {
            let fitted = FittedModel::load(&model)
                .with_context(|| format!("Failed to load model from {:?}", model))?;
            info!(
                "Loaded model trained at {} on {} rows",
                fitted.trained_at(),
                fitted.n_training_rows()
            );

            let source = CsvSource::new().with_candidates(&candidates);
            let mut sink = DirectorySink::create(&outdir).with_context(|| {
                format!("Failed to prepare output directory {:?}", outdir)
            })?;

            let scored = run_scoring(&source, &mut sink, &fitted)
                .with_context(|| format!("Scoring {:?} failed", candidates))?;

            println!("\nTop candidate locations");
            println!("{:-<52}", "");
            println!(
                "{:>5} {:>12} {:>12} {:>18}",
                "Rank", "Lat", "Lon", "Predicted profit"
            );
            println!("{:-<52}", "");
            for candidate in scored.iter().take(10) {
                println!(
                    "{:>5} {:>12.5} {:>12.5} {:>18.2}",
                    candidate.rank, candidate.lat, candidate.lon, candidate.predicted_profit
                );
            }
            info!(
                "Scored {} candidates. Saved to {:?}",
                scored.len(),
                sink.outdir()
            );
        }
    }

    Ok(())
}

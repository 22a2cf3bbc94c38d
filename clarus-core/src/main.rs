//! Clarus Score - score a local traffic CSV without the job pipeline

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use serde::Serialize;

use clarus_core::constants::get_model_dir;
use clarus_core::logic::ingest::scored_file_name;
use clarus_core::{read_csv_robust, write_csv, BundlePaths, FeatureBundle, ScoreSummary};

#[derive(Debug, Parser)]
#[command(name = "clarus-score", version, about = "Score a traffic CSV with the model bundle")]
struct Args {
    /// CSV file to score
    file: PathBuf,

    /// Directory holding the model artifacts
    #[arg(long, env = "MODEL_DIR")]
    model_dir: Option<PathBuf>,

    /// Where to write the scored CSV (default: next to the input)
    #[arg(long, short)]
    output: Option<PathBuf>,

    /// Only print the summary
    #[arg(long)]
    no_write: bool,
}

#[derive(Debug, Serialize)]
struct Report {
    #[serde(flatten)]
    summary: ScoreSummary,
    detected_delimiter: String,
    parsed_columns: usize,
    scored_path: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let model_dir = args.model_dir.unwrap_or_else(get_model_dir);

    let bundle = FeatureBundle::load(&BundlePaths::from_env(&model_dir))
        .with_context(|| format!("Failed to load model bundle from {}", model_dir.display()))?;

    let (table, delimiter) = read_csv_robust(&args.file, Some(bundle.binary_features()))
        .with_context(|| format!("Failed to read CSV: {}", args.file.display()))?;
    log::info!(
        "Parsed {} rows, {} columns (sep='{}')",
        table.n_rows(),
        table.n_cols(),
        delimiter
    );

    bundle.check_schema(&table, delimiter)?;

    let scored = bundle.predict_rows(&table)?;
    let summary = scored.summary()?;

    let scored_path = if args.no_write {
        None
    } else {
        let path = args
            .output
            .unwrap_or_else(|| args.file.with_file_name(scored_file_name(&args.file)));
        write_csv(&scored.table, &path)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        log::info!("Scored file written to {}", path.display());
        Some(path)
    };

    let report = Report {
        summary,
        detected_delimiter: delimiter.to_string(),
        parsed_columns: table.n_cols(),
        scored_path,
    };
    println!("{}", serde_json::to_string_pretty(&report)?);

    Ok(())
}

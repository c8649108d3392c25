// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2024 Hyperpolymath

//! Agreement and metrics CLI for human-evaluation responses
//!
//! Usage:
//!   analyze-responses --responses responses.csv --samples human_eval_samples.csv
//!   analyze-responses -r responses.csv -s samples.csv --evaluators alice,bob --format json

use anyhow::Result;
use clap::Parser;
use human_eval::latex::LatexTable;
use human_eval::pipeline::{AnalysisConfig, AnalysisPipeline};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "analyze-responses")]
#[command(about = "Compute inter-rater agreement and per-condition statistics")]
#[command(version)]
struct Args {
    /// Evaluator response table (eval_id, evaluator_id, fluency, coherence, detection)
    #[arg(short, long)]
    responses: PathBuf,

    /// Sample metadata table written by select-samples
    #[arg(short, long)]
    samples: PathBuf,

    /// The two evaluator ids to compare (comma-separated)
    #[arg(short, long, default_value = "Evaluator_1,Evaluator_2")]
    evaluators: String,

    /// Output directory for results
    #[arg(short, long, default_value = ".")]
    output: PathBuf,

    /// Output format (json, latex, both)
    #[arg(short, long, default_value = "both")]
    format: String,
}

fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    let evaluators: Vec<String> = args.evaluators.split(',').map(|s| s.trim().to_string()).collect();
    let evaluators: [String; 2] = match evaluators.try_into() {
        Ok(pair) => pair,
        Err(given) => anyhow::bail!("Expected exactly two evaluators, got {:?}", given),
    };
    if !matches!(args.format.as_str(), "json" | "latex" | "both") {
        anyhow::bail!("Unknown output format '{}' (expected json, latex or both)", args.format);
    }

    tracing::info!("Human Evaluation Analysis");
    tracing::info!("=========================");
    tracing::info!("Responses: {}", args.responses.display());
    tracing::info!("Samples: {}", args.samples.display());
    tracing::info!("Evaluators: {} / {}", evaluators[0], evaluators[1]);

    let config = AnalysisConfig {
        responses_path: args.responses.to_string_lossy().to_string(),
        samples_path: args.samples.to_string_lossy().to_string(),
        evaluators,
        output_dir: args.output.to_string_lossy().to_string(),
    };

    let mut pipeline = AnalysisPipeline::new(config);
    let results = pipeline.run()?;

    println!("{}", AnalysisPipeline::generate_report(&results));

    let table = LatexTable::from_results(&results);
    println!("\n{}", "=".repeat(60));
    println!("LATEX TABLE:");
    println!("{}", "=".repeat(60));
    println!("{}", table.render());

    if args.format == "json" || args.format == "both" {
        let json_path = pipeline.results_path();
        AnalysisPipeline::save_results(&results, &json_path)?;
        println!("Results saved to {}", json_path.display());
    }

    if args.format == "latex" || args.format == "both" {
        let tex_path = pipeline.latex_path();
        table.save(&tex_path)?;
        println!("LaTeX table saved to {}", tex_path.display());
    }

    Ok(())
}

// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2024 Hyperpolymath

//! Stratified sample selection CLI
//!
//! Usage:
//!   select-samples --data-dir ./storage --seed 42
//!   select-samples --data-dir ./storage --quotas quotas.json --shortfall take-available

use anyhow::Result;
use clap::Parser;
use human_eval::selection::{QuotaTable, SampleSelector, SelectionConfig, ShortfallPolicy};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "select-samples")]
#[command(about = "Select a stratified human-evaluation sample")]
#[command(version)]
struct Args {
    /// Directory with strategy{1..4}_results.csv and Data/dev_{lang}_{domain}.csv
    #[arg(short, long)]
    data_dir: PathBuf,

    /// Output directory for the sample tables
    #[arg(short, long, default_value = ".")]
    output: PathBuf,

    /// Random seed for reproducibility
    #[arg(short, long, default_value_t = 42)]
    seed: u64,

    /// JSON quota table (defaults to the 100-item design)
    #[arg(short, long)]
    quotas: Option<PathBuf>,

    /// Behaviour when a category has too few rows (fail, take-available)
    #[arg(long, default_value = "fail")]
    shortfall: String,

    /// Original-text languages (comma-separated)
    #[arg(long, default_value = "en,nl")]
    languages: String,

    /// Original-text domains (comma-separated)
    #[arg(long, default_value = "news,reviews,twitter")]
    domains: String,
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    let quotas = match &args.quotas {
        Some(path) => {
            tracing::info!("Loading quota table from {}", path.display());
            QuotaTable::load(path)?
        }
        None => QuotaTable::default(),
    };
    let shortfall: ShortfallPolicy = args.shortfall.parse()?;

    tracing::info!("Human Evaluation Sample Selector");
    tracing::info!("================================");
    tracing::info!("Data: {}", args.data_dir.display());
    tracing::info!("Seed: {}", args.seed);
    tracing::info!("Quota total: {} ({} entries)", quotas.total(), quotas.entries.len());
    tracing::info!("Shortfall policy: {}", shortfall);

    let config = SelectionConfig {
        seed: args.seed,
        data_dir: args.data_dir.to_string_lossy().to_string(),
        output_dir: args.output.to_string_lossy().to_string(),
        languages: split_list(&args.languages),
        domains: split_list(&args.domains),
        quotas,
        shortfall,
    };

    let mut selector = SampleSelector::new(config);
    let selection = selector.run()?;

    let (full_path, texts_path) = selector.save(&selection)?;
    println!("Saved {} samples to {}", selection.samples.len(), full_path.display());
    println!("Saved texts to {}", texts_path.display());

    println!("\n{}", selection.summary.format());

    Ok(())
}

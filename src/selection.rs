// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2024 Hyperpolymath

//! Stratified selection of the human-evaluation sample
//!
//! Draws a fixed number of items per category from the strategy result
//! tables and original texts, using a single seeded RNG so that the same
//! seed and inputs always yield the same sample. Items are shuffled for
//! blind evaluation and re-identified `TEXT_001`, `TEXT_002`, ...

use crate::datasets::{
    write_table, Condition, SampleRecord, SourceTables, Strategy, StrategyResult, TextOnlyRecord,
};
use crate::error::EvalError;
use anyhow::{Context, Result};
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Where the rows of a quota entry are drawn from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Pool {
    /// AI texts the detector missed after rewriting with `strategy`
    Flipped { strategy: Strategy },
    /// AI texts the detector still caught after rewriting with `strategy`
    Detected { strategy: Strategy },
    /// Unmodified AI-generated originals
    OriginalAi,
    /// Human-written originals
    Human,
}

impl Pool {
    pub fn condition(&self) -> Condition {
        match self {
            Pool::Flipped { .. } => Condition::RewrittenFlipped,
            Pool::Detected { .. } => Condition::RewrittenDetected,
            Pool::OriginalAi => Condition::OriginalAi,
            Pool::Human => Condition::Human,
        }
    }

    /// Strategy column value for items drawn from this pool
    pub fn strategy_name(&self) -> &'static str {
        match self {
            Pool::Flipped { strategy } | Pool::Detected { strategy } => strategy.name(),
            Pool::OriginalAi | Pool::Human => "None",
        }
    }

    /// Eligible rows, in source order
    fn candidates<'a>(&self, tables: &'a SourceTables) -> Vec<Candidate<'a>> {
        match self {
            Pool::Flipped { strategy } => tables
                .results(*strategy)
                .iter()
                .filter(|r| r.is_flipped())
                .map(Candidate::rewritten)
                .collect(),
            Pool::Detected { strategy } => tables
                .results(*strategy)
                .iter()
                .filter(|r| r.is_detected())
                .map(Candidate::rewritten)
                .collect(),
            Pool::OriginalAi => tables
                .originals
                .iter()
                .filter(|o| o.label == 1)
                .map(|o| Candidate::original(&o.text))
                .collect(),
            Pool::Human => tables
                .originals
                .iter()
                .filter(|o| o.label == 0)
                .map(|o| Candidate::original(&o.text))
                .collect(),
        }
    }
}

/// One `category -> quota` line of the selection policy
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuotaEntry {
    pub category: String,
    pub pool: Pool,
    pub quota: usize,
}

impl QuotaEntry {
    pub fn new(category: &str, pool: Pool, quota: usize) -> Self {
        Self {
            category: category.to_string(),
            pool,
            quota,
        }
    }
}

/// Ordered quota table; entries are drawn in table order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuotaTable {
    pub entries: Vec<QuotaEntry>,
}

impl Default for QuotaTable {
    /// The 100-item study design
    fn default() -> Self {
        let mut entries = vec![
            QuotaEntry::new("hsr_flipped", Pool::Flipped { strategy: Strategy::Hsr }, 18),
            QuotaEntry::new("psr_flipped", Pool::Flipped { strategy: Strategy::Psr }, 14),
            QuotaEntry::new("gpt_flipped", Pool::Flipped { strategy: Strategy::Gpt }, 14),
            QuotaEntry::new("gptgenre_flipped", Pool::Flipped { strategy: Strategy::GptGenre }, 12),
        ];
        for (strategy, quota) in [
            (Strategy::Hsr, 4),
            (Strategy::Psr, 3),
            (Strategy::Gpt, 3),
            (Strategy::GptGenre, 2),
        ] {
            entries.push(QuotaEntry::new("detected", Pool::Detected { strategy }, quota));
        }
        entries.push(QuotaEntry::new("original_ai", Pool::OriginalAi, 15));
        entries.push(QuotaEntry::new("human", Pool::Human, 15));
        Self { entries }
    }
}

impl QuotaTable {
    /// Load a quota table from JSON
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read quota table: {}", path.display()))?;
        let table: Self = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse quota table: {}", path.display()))?;
        Ok(table)
    }

    pub fn total(&self) -> usize {
        self.entries.iter().map(|e| e.quota).sum()
    }
}

/// What to do when a pool holds fewer rows than its quota
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ShortfallPolicy {
    /// Abort the selection
    #[default]
    Fail,
    /// Take every eligible row and record the deficit
    TakeAvailable,
}

impl FromStr for ShortfallPolicy {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "fail" => Ok(ShortfallPolicy::Fail),
            "take-available" => Ok(ShortfallPolicy::TakeAvailable),
            other => anyhow::bail!("Unknown shortfall policy '{}' (expected fail or take-available)", other),
        }
    }
}

impl fmt::Display for ShortfallPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShortfallPolicy::Fail => f.write_str("fail"),
            ShortfallPolicy::TakeAvailable => f.write_str("take-available"),
        }
    }
}

/// Configuration for the sample selector
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelectionConfig {
    /// Random seed for reproducibility
    pub seed: u64,
    /// Directory holding `strategy{i}_results.csv` and `Data/`
    pub data_dir: String,
    /// Output directory for the sample tables
    pub output_dir: String,
    pub languages: Vec<String>,
    pub domains: Vec<String>,
    pub quotas: QuotaTable,
    pub shortfall: ShortfallPolicy,
}

impl Default for SelectionConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            data_dir: "data".to_string(),
            output_dir: ".".to_string(),
            languages: vec!["en".to_string(), "nl".to_string()],
            domains: vec!["news".to_string(), "reviews".to_string(), "twitter".to_string()],
            quotas: QuotaTable::default(),
            shortfall: ShortfallPolicy::Fail,
        }
    }
}

/// A quota that could not be met
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Shortfall {
    pub category: String,
    pub requested: usize,
    pub available: usize,
}

/// Counts describing a finished selection
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SelectionSummary {
    pub seed: u64,
    pub total: usize,
    pub by_category: BTreeMap<String, usize>,
    pub by_condition: BTreeMap<Condition, usize>,
    pub shortfalls: Vec<Shortfall>,
}

impl SelectionSummary {
    pub fn format(&self) -> String {
        let mut output = String::from("Sample Distribution:\n");
        for (category, count) in &self.by_category {
            output.push_str(&format!("  {:<20} {:>4}\n", category, count));
        }
        output.push_str(&format!("\nTotal: {} samples\n", self.total));

        output.push_str("\nCondition Distribution:\n");
        for (condition, count) in &self.by_condition {
            output.push_str(&format!("  {:<20} {:>4}\n", condition.as_str(), count));
        }

        if !self.shortfalls.is_empty() {
            output.push_str("\nQuota Shortfalls:\n");
            for s in &self.shortfalls {
                output.push_str(&format!(
                    "  {}: requested {}, selected {}\n",
                    s.category, s.requested, s.available
                ));
            }
        }
        output
    }
}

/// The selected sample, shuffled and re-identified
#[derive(Debug, Clone)]
pub struct Selection {
    pub samples: Vec<SampleRecord>,
    pub summary: SelectionSummary,
}

/// Borrowed view of an eligible source row
#[derive(Debug, Clone, Copy)]
struct Candidate<'a> {
    text: &'a str,
    original_text: &'a str,
    replacements: &'a str,
}

impl<'a> Candidate<'a> {
    fn rewritten(row: &'a StrategyResult) -> Self {
        Self {
            text: &row.modified_text,
            original_text: &row.original_text,
            replacements: &row.replacements,
        }
    }

    fn original(text: &'a str) -> Self {
        Self {
            text,
            original_text: text,
            replacements: "{}",
        }
    }
}

/// Format the sequential item identifier
pub fn eval_id(index: usize) -> String {
    format!("TEXT_{:03}", index + 1)
}

/// Stratified sample selector
pub struct SampleSelector {
    config: SelectionConfig,
    tables: Option<SourceTables>,
}

impl SampleSelector {
    pub fn new(config: SelectionConfig) -> Self {
        Self { config, tables: None }
    }

    /// Use already-loaded source tables instead of reading `data_dir`
    pub fn with_tables(mut self, tables: SourceTables) -> Self {
        self.tables = Some(tables);
        self
    }

    pub fn load_tables(&mut self) -> Result<()> {
        let data_dir = Path::new(&self.config.data_dir);
        tracing::info!("Loading source tables from {}", data_dir.display());
        let tables = SourceTables::load(data_dir, &self.config.languages, &self.config.domains)?;
        self.tables = Some(tables);
        Ok(())
    }

    /// Draw every quota, shuffle, and assign identifiers
    pub fn run(&mut self) -> Result<Selection> {
        if self.tables.is_none() {
            self.load_tables()?;
        }
        let tables = self.tables.as_ref().context("Source tables not loaded")?;

        let mut rng = ChaCha8Rng::seed_from_u64(self.config.seed);
        let mut samples = Vec::with_capacity(self.config.quotas.total());
        let mut shortfalls = Vec::new();

        for entry in &self.config.quotas.entries {
            let candidates = entry.pool.candidates(tables);
            let available = candidates.len();

            let take = if available < entry.quota {
                match self.config.shortfall {
                    ShortfallPolicy::Fail => {
                        return Err(EvalError::QuotaShortfall {
                            category: entry.category.clone(),
                            requested: entry.quota,
                            available,
                        }
                        .into());
                    }
                    ShortfallPolicy::TakeAvailable => {
                        tracing::warn!(
                            "Category {} ({}) short: requested {}, only {} eligible",
                            entry.category,
                            entry.pool.strategy_name(),
                            entry.quota,
                            available
                        );
                        shortfalls.push(Shortfall {
                            category: entry.category.clone(),
                            requested: entry.quota,
                            available,
                        });
                        available
                    }
                }
            } else {
                entry.quota
            };

            tracing::debug!("Drawing {} of {} rows for {}", take, available, entry.category);

            for candidate in candidates.choose_multiple(&mut rng, take) {
                samples.push(SampleRecord {
                    eval_id: String::new(),
                    text: candidate.text.to_string(),
                    original_text: candidate.original_text.to_string(),
                    replacements: candidate.replacements.to_string(),
                    category: entry.category.clone(),
                    strategy: entry.pool.strategy_name().to_string(),
                    condition: entry.pool.condition(),
                });
            }
        }

        // Blind the order before assigning identifiers
        samples.shuffle(&mut rng);
        for (i, sample) in samples.iter_mut().enumerate() {
            sample.eval_id = eval_id(i);
        }

        let mut summary = SelectionSummary {
            seed: self.config.seed,
            total: samples.len(),
            shortfalls,
            ..Default::default()
        };
        for sample in &samples {
            *summary.by_category.entry(sample.category.clone()).or_insert(0) += 1;
            *summary.by_condition.entry(sample.condition).or_insert(0) += 1;
        }

        tracing::info!("Selected {} samples (seed {})", summary.total, summary.seed);
        Ok(Selection { samples, summary })
    }

    /// Write the full-metadata table and the texts-only table to `output_dir`
    pub fn save(&self, selection: &Selection) -> Result<(PathBuf, PathBuf)> {
        let output_dir = Path::new(&self.config.output_dir);
        std::fs::create_dir_all(output_dir)
            .with_context(|| format!("Failed to create {}", output_dir.display()))?;

        let full_path = output_dir.join("human_eval_samples.csv");
        write_table(&full_path, &selection.samples)?;
        tracing::info!("Saved {} samples to {}", selection.samples.len(), full_path.display());

        let texts: Vec<TextOnlyRecord> = selection.samples.iter().map(TextOnlyRecord::from).collect();
        let texts_path = output_dir.join("human_eval_texts_only.csv");
        write_table(&texts_path, &texts)?;
        tracing::info!("Saved texts to {}", texts_path.display());

        Ok((full_path, texts_path))
    }
}

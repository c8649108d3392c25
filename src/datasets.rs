// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2024 Hyperpolymath

//! Table loading for the human-evaluation study
//!
//! Covers the rewriting-strategy result tables and original labeled texts
//! consumed by the sample selector, and the sample metadata table it writes
//! (which the agreement analysis reads back).

use crate::error::EvalError;
use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::fs::File;
use std::path::Path;

/// Rewriting strategy that produced a result table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Strategy {
    #[serde(rename = "HSR")]
    Hsr,
    #[serde(rename = "PSR")]
    Psr,
    #[serde(rename = "GPT")]
    Gpt,
    #[serde(rename = "GPT+Genre")]
    GptGenre,
}

impl Strategy {
    pub const ALL: [Strategy; 4] = [Strategy::Hsr, Strategy::Psr, Strategy::Gpt, Strategy::GptGenre];

    /// 1-based index used in result file names
    pub fn index(&self) -> usize {
        match self {
            Strategy::Hsr => 1,
            Strategy::Psr => 2,
            Strategy::Gpt => 3,
            Strategy::GptGenre => 4,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Strategy::Hsr => "HSR",
            Strategy::Psr => "PSR",
            Strategy::Gpt => "GPT",
            Strategy::GptGenre => "GPT+Genre",
        }
    }

    /// Lowercase tag used in category names (`hsr_flipped`, ...)
    pub fn tag(&self) -> &'static str {
        match self {
            Strategy::Hsr => "hsr",
            Strategy::Psr => "psr",
            Strategy::Gpt => "gpt",
            Strategy::GptGenre => "gptgenre",
        }
    }

    pub fn results_file(&self) -> String {
        format!("strategy{}_results.csv", self.index())
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Evaluation stratum an item belongs to
///
/// Variant order is the order conditions appear in reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Condition {
    /// Human-written control texts
    Human,
    /// Unmodified AI-generated texts
    OriginalAi,
    /// Rewritten texts the detector no longer flags
    RewrittenFlipped,
    /// Rewritten texts the detector still flags
    RewrittenDetected,
    /// Rewritten texts without a flipped/detected split
    Rewritten,
}

impl Condition {
    pub const ALL: [Condition; 5] = [
        Condition::Human,
        Condition::OriginalAi,
        Condition::RewrittenFlipped,
        Condition::RewrittenDetected,
        Condition::Rewritten,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Condition::Human => "human",
            Condition::OriginalAi => "original_ai",
            Condition::RewrittenFlipped => "rewritten_flipped",
            Condition::RewrittenDetected => "rewritten_detected",
            Condition::Rewritten => "rewritten",
        }
    }

    /// Ground truth is "human" only for the control condition
    pub fn is_human(&self) -> bool {
        matches!(self, Condition::Human)
    }

    /// Row label used in the LaTeX table
    pub fn display_name(&self) -> &'static str {
        match self {
            Condition::Human => "Human Control",
            Condition::OriginalAi => "Original AI",
            Condition::RewrittenFlipped => "Rewritten (Flipped)",
            Condition::RewrittenDetected => "Rewritten (Detected)",
            Condition::Rewritten => "Rewritten",
        }
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One row of a `strategy{i}_results.csv` table
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StrategyResult {
    /// Ground truth (1 = AI-generated)
    pub true_label: u8,
    /// Detector prediction after rewriting (1 = AI-generated)
    pub pred_label: u8,
    pub original_text: String,
    pub modified_text: String,
    /// Serialized record of the replacements applied
    pub replacements: String,
}

impl StrategyResult {
    /// AI text the detector missed after rewriting
    pub fn is_flipped(&self) -> bool {
        self.true_label == 1 && self.pred_label == 0
    }

    /// AI text the detector still caught after rewriting
    pub fn is_detected(&self) -> bool {
        self.true_label == 1 && self.pred_label == 1
    }
}

/// One row of an original `dev_{lang}_{domain}.csv` table
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OriginalText {
    pub text: String,
    /// 1 = AI-generated, 0 = human-written
    pub label: u8,
}

/// One selected item with full metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SampleRecord {
    pub eval_id: String,
    pub text: String,
    pub original_text: String,
    pub replacements: String,
    pub category: String,
    /// Strategy name, or `None` for unmodified texts
    pub strategy: String,
    pub condition: Condition,
}

/// Reduced row distributed to raters
#[derive(Debug, Clone, Serialize)]
pub struct TextOnlyRecord<'a> {
    pub eval_id: &'a str,
    pub text: &'a str,
}

impl<'a> From<&'a SampleRecord> for TextOnlyRecord<'a> {
    fn from(record: &'a SampleRecord) -> Self {
        Self {
            eval_id: &record.eval_id,
            text: &record.text,
        }
    }
}

/// Read every row of a headed CSV table
pub fn read_table<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
    let file = File::open(path).with_context(|| format!("Failed to open table: {}", path.display()))?;
    let mut reader = csv::ReaderBuilder::new().has_headers(true).from_reader(file);

    let mut rows = Vec::new();
    for (idx, result) in reader.deserialize().enumerate() {
        let row: T = result.with_context(|| format!("Failed to read record {} in {}", idx + 1, path.display()))?;
        rows.push(row);
    }

    tracing::debug!("Read {} rows from {}", rows.len(), path.display());
    Ok(rows)
}

/// Write rows as a headed CSV table, creating parent directories
pub fn write_table<T: Serialize>(path: &Path, rows: &[T]) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let mut writer =
        csv::Writer::from_path(path).with_context(|| format!("Failed to create table: {}", path.display()))?;
    for row in rows {
        writer
            .serialize(row)
            .with_context(|| format!("Failed to write record to {}", path.display()))?;
    }
    writer.flush()?;
    Ok(())
}

/// All selector inputs, loaded once
#[derive(Debug, Clone, Default)]
pub struct SourceTables {
    pub strategies: BTreeMap<Strategy, Vec<StrategyResult>>,
    pub originals: Vec<OriginalText>,
}

impl SourceTables {
    /// Load the four strategy tables and every existing original partition
    ///
    /// Strategy tables are mandatory. Original partitions are sparse, so a
    /// missing `Data/dev_{lang}_{domain}.csv` is skipped, but at least one
    /// must exist.
    pub fn load(data_dir: &Path, languages: &[String], domains: &[String]) -> Result<Self> {
        let mut strategies = BTreeMap::new();
        for strategy in Strategy::ALL {
            let path = data_dir.join(strategy.results_file());
            let rows: Vec<StrategyResult> = read_table(&path)
                .with_context(|| format!("Failed to load {} results", strategy))?;
            tracing::info!("Loaded {} {} results from {}", rows.len(), strategy, path.display());
            strategies.insert(strategy, rows);
        }

        let mut originals = Vec::new();
        let mut partitions = 0;
        for lang in languages {
            for domain in domains {
                let path = data_dir.join("Data").join(format!("dev_{}_{}.csv", lang, domain));
                if !path.exists() {
                    tracing::debug!("Skipping absent original partition {}", path.display());
                    continue;
                }
                let rows: Vec<OriginalText> = read_table(&path)?;
                tracing::debug!("Loaded {} {}/{} original texts", rows.len(), lang, domain);
                partitions += 1;
                originals.extend(rows);
            }
        }

        if partitions == 0 {
            return Err(EvalError::NoOriginalTables(data_dir.join("Data").display().to_string()).into());
        }
        tracing::info!("Loaded {} original texts from {} partitions", originals.len(), partitions);

        Ok(Self { strategies, originals })
    }

    pub fn results(&self, strategy: Strategy) -> &[StrategyResult] {
        self.strategies.get(&strategy).map(Vec::as_slice).unwrap_or(&[])
    }
}

// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2024 Hyperpolymath

//! Agreement and metrics pipeline for human-evaluation responses
//!
//! Orchestrates:
//! - Loading evaluator responses and sample metadata
//! - Joining responses to item conditions
//! - Pairing the two evaluators on shared items
//! - Kappa and per-condition statistics
//! - Results serialization and the console report

use crate::datasets::{read_table, Condition, SampleRecord};
use crate::error::EvalError;
use crate::metrics::{aggregate_by_condition, overall_detection_accuracy, round2, Agreement, ConditionStats};
use crate::responses::{join_with_samples, load_responses, RatedResponse, Response};
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};

/// Configuration for the analysis pipeline
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisConfig {
    /// Evaluator response export
    pub responses_path: String,
    /// Sample metadata written by the selector
    pub samples_path: String,
    /// The two evaluators whose ratings are compared
    pub evaluators: [String; 2],
    /// Output directory for results
    pub output_dir: String,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            responses_path: "responses.csv".to_string(),
            samples_path: "human_eval_samples.csv".to_string(),
            evaluators: ["Evaluator_1".to_string(), "Evaluator_2".to_string()],
            output_dir: ".".to_string(),
        }
    }
}

/// Complete analysis results
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisResults {
    /// Rows in the sample metadata table
    pub n_samples: usize,
    pub n_evaluators: usize,
    pub evaluators: [String; 2],
    pub agreement: Agreement,
    pub conditions: BTreeMap<Condition, ConditionStats>,
    pub overall_detection_accuracy: f64,
    pub timestamp: DateTime<Utc>,
    pub version: String,
}

impl AnalysisResults {
    /// Flat key-value record with values rounded to two decimals
    ///
    /// Keys follow `{condition}_{metric}`; an undefined standard deviation
    /// is written as `null`.
    pub fn to_record(&self) -> Map<String, Value> {
        let mut record = Map::new();
        record.insert("n_samples".to_string(), self.n_samples.into());
        record.insert("n_evaluators".to_string(), self.n_evaluators.into());
        record.insert("kappa_fluency".to_string(), round2(self.agreement.fluency).into());
        record.insert("kappa_coherence".to_string(), round2(self.agreement.coherence).into());
        record.insert("kappa_detection".to_string(), round2(self.agreement.detection).into());

        for (condition, stats) in &self.conditions {
            let key = |metric: &str| format!("{}_{}", condition.as_str(), metric);
            record.insert(key("n"), stats.n.into());
            record.insert(key("fluency_mean"), round2(stats.fluency_mean).into());
            record.insert(key("fluency_std"), stats.fluency_std.map(round2).into());
            record.insert(key("coherence_mean"), round2(stats.coherence_mean).into());
            record.insert(key("coherence_std"), stats.coherence_std.map(round2).into());
            record.insert(key("detection_accuracy"), round2(stats.detection_accuracy).into());
        }

        record.insert(
            "overall_detection_accuracy".to_string(),
            round2(self.overall_detection_accuracy).into(),
        );
        record
    }
}

/// Format an optional standard deviation
pub fn format_std(std: Option<f64>) -> String {
    std.map_or("n/a".to_string(), |v| format!("{:.2}", round2(v)))
}

/// Pair the two evaluators' responses on items both rated, ordered by id
///
/// Responses from any other evaluator, and repeated responses to one item,
/// are rejected.
pub fn pair_evaluators<'a>(
    rated: &'a [RatedResponse],
    evaluators: &[String; 2],
) -> Result<Vec<(&'a Response, &'a Response)>, EvalError> {
    let mut first: BTreeMap<&str, &Response> = BTreeMap::new();
    let mut second: BTreeMap<&str, &Response> = BTreeMap::new();

    for row in rated {
        let response = &row.response;
        let side = if response.evaluator_id == evaluators[0] {
            &mut first
        } else if response.evaluator_id == evaluators[1] {
            &mut second
        } else {
            return Err(EvalError::UnknownEvaluator {
                evaluator_id: response.evaluator_id.clone(),
                eval_id: response.eval_id.clone(),
            });
        };
        if side.insert(response.eval_id.as_str(), response).is_some() {
            return Err(EvalError::DuplicateResponse {
                evaluator_id: response.evaluator_id.clone(),
                eval_id: response.eval_id.clone(),
            });
        }
    }

    let pairs: Vec<_> = first
        .iter()
        .filter_map(|(id, a)| second.get(id).map(|b| (*a, *b)))
        .collect();

    let unpaired = first.len() + second.len() - 2 * pairs.len();
    if unpaired > 0 {
        tracing::warn!("{} items were rated by only one evaluator", unpaired);
    }
    if pairs.is_empty() {
        return Err(EvalError::NoSharedItems {
            first: evaluators[0].clone(),
            second: evaluators[1].clone(),
        });
    }
    Ok(pairs)
}

/// Main analysis pipeline
pub struct AnalysisPipeline {
    config: AnalysisConfig,
    samples: Option<Vec<SampleRecord>>,
    responses: Option<Vec<Response>>,
}

impl AnalysisPipeline {
    pub fn new(config: AnalysisConfig) -> Self {
        Self {
            config,
            samples: None,
            responses: None,
        }
    }

    /// Use in-memory inputs instead of reading the configured files
    pub fn with_data(mut self, samples: Vec<SampleRecord>, responses: Vec<Response>) -> Self {
        self.samples = Some(samples);
        self.responses = Some(responses);
        self
    }

    /// Load responses and sample metadata from the configured paths
    pub fn load_data(&mut self) -> Result<()> {
        let samples_path = Path::new(&self.config.samples_path);
        let samples: Vec<SampleRecord> = read_table(samples_path)
            .with_context(|| format!("Failed to load sample metadata from {}", samples_path.display()))?;
        tracing::info!("Loaded {} samples from {}", samples.len(), samples_path.display());

        let responses_path = Path::new(&self.config.responses_path);
        let responses = load_responses(responses_path)?;
        tracing::info!("Loaded {} responses from {}", responses.len(), responses_path.display());

        let unique: HashSet<&str> = samples.iter().map(|s| s.eval_id.as_str()).collect();
        if unique.len() != samples.len() {
            anyhow::bail!("Sample metadata {} repeats eval_id values", samples_path.display());
        }

        self.samples = Some(samples);
        self.responses = Some(responses);
        Ok(())
    }

    /// Run the full analysis
    pub fn run(&mut self) -> Result<AnalysisResults> {
        if self.samples.is_none() || self.responses.is_none() {
            self.load_data()?;
        }
        let samples = self.samples.as_deref().context("Sample metadata not loaded")?;
        let responses = self.responses.clone().context("Responses not loaded")?;

        let rated = join_with_samples(responses, samples);
        if rated.is_empty() {
            return Err(EvalError::NoMatchedResponses.into());
        }

        let evaluators = &self.config.evaluators;
        let pairs = pair_evaluators(&rated, evaluators)?;
        let agreement = Agreement::from_pairs(&pairs)?;
        tracing::info!(
            "Agreement over {} shared items: fluency={:.2}, coherence={:.2}, detection={:.2}",
            agreement.shared_items,
            agreement.fluency,
            agreement.coherence,
            agreement.detection
        );

        let conditions = aggregate_by_condition(&rated, evaluators.len())?;
        for stats in conditions.values() {
            tracing::debug!(
                "  {} - n={}, fluency={:.2}, coherence={:.2}, accuracy={:.2}",
                stats.condition,
                stats.n,
                stats.fluency_mean,
                stats.coherence_mean,
                stats.detection_accuracy
            );
        }

        let overall = overall_detection_accuracy(&rated).ok_or(EvalError::NoMatchedResponses)?;

        Ok(AnalysisResults {
            n_samples: samples.len(),
            n_evaluators: evaluators.len(),
            evaluators: evaluators.clone(),
            agreement,
            conditions,
            overall_detection_accuracy: overall,
            timestamp: Utc::now(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        })
    }

    /// Where the JSON results record is written
    pub fn results_path(&self) -> PathBuf {
        Path::new(&self.config.output_dir).join("human_eval_results.json")
    }

    /// Where the LaTeX table is written
    pub fn latex_path(&self) -> PathBuf {
        Path::new(&self.config.output_dir).join("human_eval_latex_table.tex")
    }

    /// Save the flat results record as JSON
    pub fn save_results(results: &AnalysisResults, output_path: &Path) -> Result<()> {
        std::fs::create_dir_all(output_path.parent().unwrap_or(Path::new(".")))?;
        let json = serde_json::to_string_pretty(&results.to_record())?;
        std::fs::write(output_path, json)
            .with_context(|| format!("Failed to write results to {}", output_path.display()))?;
        tracing::info!("Results saved to {}", output_path.display());
        Ok(())
    }

    /// Human-readable console report
    pub fn generate_report(results: &AnalysisResults) -> String {
        let rule = "=".repeat(60);
        let mut report = String::new();

        report.push_str(&format!("\n{}\nHUMAN EVALUATION RESULTS\n{}\n", rule, rule));
        report.push_str(&format!(
            "Generated: {}\n",
            results.timestamp.format("%Y-%m-%d %H:%M:%S UTC")
        ));
        report.push_str(&format!("Total samples: {}\n", results.n_samples));
        report.push_str(&format!(
            "Evaluators: {} ({})\n",
            results.n_evaluators,
            results.evaluators.join(", ")
        ));
        report.push_str(&format!(
            "Shared items: {}\n",
            results.agreement.shared_items
        ));

        report.push_str("\nInter-rater Reliability (Cohen's kappa):\n");
        report.push_str(&format!("  Fluency: {:.2}\n", round2(results.agreement.fluency)));
        report.push_str(&format!("  Coherence: {:.2}\n", round2(results.agreement.coherence)));
        report.push_str(&format!("  Detection: {:.2}\n", round2(results.agreement.detection)));
        report.push_str(&format!(
            "\nOverall detection accuracy: {:.1}%\n",
            round2(results.overall_detection_accuracy) * 100.0
        ));

        report.push_str(&format!("\n{}\nBY CONDITION:\n{}\n", rule, rule));
        for stats in results.conditions.values() {
            report.push_str(&format!("\n{}:\n", stats.condition.as_str().to_uppercase()));
            report.push_str(&format!("  N = {}\n", stats.n));
            report.push_str(&format!(
                "  Fluency: {:.2} (±{})\n",
                round2(stats.fluency_mean),
                format_std(stats.fluency_std)
            ));
            report.push_str(&format!(
                "  Coherence: {:.2} (±{})\n",
                round2(stats.coherence_mean),
                format_std(stats.coherence_std)
            ));
            report.push_str(&format!(
                "  Detection Accuracy: {:.1}%\n",
                round2(stats.detection_accuracy) * 100.0
            ));
        }

        report
    }
}

// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2024 Hyperpolymath

//! LaTeX table fragment summarising results by condition
//!
//! Produces a `table` environment using booktabs rules, ready to `\input`
//! into a paper. Rows appear only for conditions present in the data.

use crate::datasets::Condition;
use crate::metrics::round2;
use crate::pipeline::{format_std, AnalysisResults};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Order of rows in the table
const ROW_ORDER: [Condition; 5] = [
    Condition::OriginalAi,
    Condition::Human,
    Condition::RewrittenFlipped,
    Condition::RewrittenDetected,
    Condition::Rewritten,
];

/// One condition row of the table
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableRow {
    pub label: String,
    pub n: usize,
    pub fluency: String,
    pub coherence: String,
    pub detection_percent: f64,
}

/// Summary table of a finished analysis
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LatexTable {
    pub caption: String,
    pub label: String,
    pub rows: Vec<TableRow>,
    pub total_samples: usize,
    pub overall_detection_percent: f64,
    pub generator: String,
}

fn mean_with_std(mean: f64, std: Option<f64>) -> String {
    format!("{:.2} ($\\pm${})", round2(mean), format_std(std))
}

impl LatexTable {
    pub fn from_results(results: &AnalysisResults) -> Self {
        let caption = format!(
            "Human Evaluation Results (N={} samples, {} evaluators). \
             Fluency and Coherence are rated on 1--5 scales. \
             Detection shows the percentage of correct AI/human classifications by human evaluators. \
             Cohen's $\\kappa$ for inter-rater reliability: Fluency={:.2}, Coherence={:.2}, Detection={:.2}.",
            results.n_samples,
            results.n_evaluators,
            round2(results.agreement.fluency),
            round2(results.agreement.coherence),
            round2(results.agreement.detection),
        );

        let rows = ROW_ORDER
            .iter()
            .filter_map(|condition| results.conditions.get(condition))
            .map(|stats| TableRow {
                label: stats.condition.display_name().to_string(),
                n: stats.n,
                fluency: mean_with_std(stats.fluency_mean, stats.fluency_std),
                coherence: mean_with_std(stats.coherence_mean, stats.coherence_std),
                detection_percent: round2(stats.detection_accuracy) * 100.0,
            })
            .collect();

        Self {
            caption,
            label: "tab:human_eval".to_string(),
            rows,
            total_samples: results.n_samples,
            overall_detection_percent: round2(results.overall_detection_accuracy) * 100.0,
            generator: format!(
                "human-eval v{} on {}",
                results.version,
                results.timestamp.format("%Y-%m-%d %H:%M:%S UTC")
            ),
        }
    }

    /// Render the fragment
    pub fn render(&self) -> String {
        let mut tex = String::new();

        tex.push_str(&format!("% Generated by {}\n", self.generator));
        tex.push_str("\\begin{table}[ht]\n");
        tex.push_str("\\centering\n");
        tex.push_str(&format!("\\caption{{{}}}\n", self.caption));
        tex.push_str(&format!("\\label{{{}}}\n", self.label));
        tex.push_str("\\begin{tabular}{lcccc}\n");
        tex.push_str("\\toprule\n");
        tex.push_str(
            "\\textbf{Condition} & \\textbf{N} & \\textbf{Fluency} & \\textbf{Coherence} & \\textbf{Detection} \\\\\n",
        );
        tex.push_str(" & & (1-5) & (1-5) & (\\% Correct) \\\\\n");
        tex.push_str("\\midrule\n");

        for row in &self.rows {
            tex.push_str(&format!(
                "{} & {} & {} & {} & {:.1}\\% \\\\\n",
                row.label, row.n, row.fluency, row.coherence, row.detection_percent
            ));
        }

        tex.push_str("\\midrule\n");
        tex.push_str(&format!(
            "\\textit{{Overall}} & {} & --- & --- & {:.1}\\% \\\\\n",
            self.total_samples, self.overall_detection_percent
        ));
        tex.push_str("\\bottomrule\n");
        tex.push_str("\\end{tabular}\n");
        tex.push_str("\\end{table}\n");

        tex
    }

    /// Save the rendered fragment
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, self.render())
            .with_context(|| format!("Failed to write LaTeX table to {}", path.display()))?;
        tracing::info!("LaTeX table saved to {}", path.display());
        Ok(())
    }
}

// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2024 Hyperpolymath

//! Human evaluation of detector-evasion rewriting strategies
//!
//! This crate provides:
//! - Loading of strategy result tables and original labeled texts
//! - Seeded, quota-driven stratified selection of the evaluation sample
//! - Validation of evaluator responses and the detection-judgment scale
//! - Inter-rater agreement (Cohen's kappa) and per-condition statistics
//! - Console, JSON and LaTeX summaries of the results

pub mod datasets;
pub mod error;
pub mod latex;
pub mod metrics;
pub mod pipeline;
pub mod responses;
pub mod selection;

pub use datasets::{Condition, SampleRecord, SourceTables, Strategy};
pub use error::EvalError;
pub use latex::LatexTable;
pub use metrics::{cohen_kappa, Agreement, ConditionStats};
pub use pipeline::{AnalysisConfig, AnalysisPipeline, AnalysisResults};
pub use responses::{convert_detection_to_binary, DetectionJudgment, Response};
pub use selection::{QuotaTable, SampleSelector, Selection, SelectionConfig, ShortfallPolicy};

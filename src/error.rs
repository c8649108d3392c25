// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2024 Hyperpolymath

//! Domain errors for sample selection and agreement analysis
//!
//! I/O and parsing failures travel as `anyhow::Error` with file context;
//! the variants here are the conditions callers may want to match on.

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum EvalError {
    /// Detection judgment outside the four-point scale
    #[error("unrecognized detection judgment: {label:?}")]
    UnknownDetection { label: String },

    /// Fluency or coherence score outside 1-5
    #[error("{field} score {value} is outside the 1-5 scale")]
    ScoreOutOfRange { field: &'static str, value: u8 },

    /// Kappa needs at least one paired rating
    #[error("cannot compute agreement over zero ratings")]
    EmptyRatings,

    /// Kappa inputs must be paired position by position
    #[error("rating sequences differ in length ({left} vs {right})")]
    LengthMismatch { left: usize, right: usize },

    /// Response from an evaluator outside the configured pair
    #[error("response from unexpected evaluator {evaluator_id:?} for {eval_id}")]
    UnknownEvaluator { evaluator_id: String, eval_id: String },

    /// Same evaluator rated the same item twice
    #[error("duplicate response from {evaluator_id} for {eval_id}")]
    DuplicateResponse { evaluator_id: String, eval_id: String },

    /// Row count of a condition is not a multiple of the evaluator count
    #[error("condition {condition} has {rows} rows, not divisible by {evaluators} evaluators")]
    UnevenConditionRows {
        condition: String,
        rows: usize,
        evaluators: usize,
    },

    /// No response joined against the sample metadata
    #[error("no responses matched any sample in the metadata table")]
    NoMatchedResponses,

    /// The two evaluators share no rated item
    #[error("evaluators {first} and {second} rated no common items")]
    NoSharedItems { first: String, second: String },

    /// A quota category has fewer eligible rows than requested
    #[error("category {category} requested {requested} rows but only {available} are eligible")]
    QuotaShortfall {
        category: String,
        requested: usize,
        available: usize,
    },

    /// None of the original labeled-text partitions exist
    #[error("no original labeled-text tables found under {0}")]
    NoOriginalTables(String),
}

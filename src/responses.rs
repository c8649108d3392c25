// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2024 Hyperpolymath

//! Evaluator responses and the detection-judgment scale

use crate::datasets::{read_table, Condition, SampleRecord};
use crate::error::EvalError;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

/// Four-point AI-likelihood scale used by raters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum DetectionJudgment {
    #[serde(rename = "Definitely Human")]
    DefinitelyHuman,
    #[serde(rename = "Probably Human")]
    ProbablyHuman,
    #[serde(rename = "Probably AI")]
    ProbablyAi,
    #[serde(rename = "Definitely AI")]
    DefinitelyAi,
}

impl DetectionJudgment {
    pub const ALL: [DetectionJudgment; 4] = [
        DetectionJudgment::DefinitelyHuman,
        DetectionJudgment::ProbablyHuman,
        DetectionJudgment::ProbablyAi,
        DetectionJudgment::DefinitelyAi,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            DetectionJudgment::DefinitelyHuman => "Definitely Human",
            DetectionJudgment::ProbablyHuman => "Probably Human",
            DetectionJudgment::ProbablyAi => "Probably AI",
            DetectionJudgment::DefinitelyAi => "Definitely AI",
        }
    }

    /// AI = 1, human = 0, split at the midpoint of the scale
    pub fn to_binary(&self) -> u8 {
        match self {
            DetectionJudgment::ProbablyAi | DetectionJudgment::DefinitelyAi => 1,
            DetectionJudgment::DefinitelyHuman | DetectionJudgment::ProbablyHuman => 0,
        }
    }
}

impl FromStr for DetectionJudgment {
    type Err = EvalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        Self::ALL
            .into_iter()
            .find(|j| j.label() == trimmed)
            .ok_or_else(|| EvalError::UnknownDetection { label: s.to_string() })
    }
}

impl fmt::Display for DetectionJudgment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Map a raw detection label to AI = 1, human = 0
pub fn convert_detection_to_binary(label: &str) -> Result<u8, EvalError> {
    label.parse::<DetectionJudgment>().map(|j| j.to_binary())
}

/// Row as it appears in the response export
#[derive(Debug, Clone, Deserialize)]
struct RawResponse {
    eval_id: String,
    evaluator_id: String,
    fluency: u8,
    coherence: u8,
    detection: String,
}

/// A validated rating of one item by one evaluator
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Response {
    pub eval_id: String,
    pub evaluator_id: String,
    /// Ordinal 1-5
    pub fluency: u8,
    /// Ordinal 1-5
    pub coherence: u8,
    pub detection: DetectionJudgment,
}

fn check_score(field: &'static str, value: u8) -> Result<u8, EvalError> {
    if (1..=5).contains(&value) {
        Ok(value)
    } else {
        Err(EvalError::ScoreOutOfRange { field, value })
    }
}

impl Response {
    pub fn new(
        eval_id: &str,
        evaluator_id: &str,
        fluency: u8,
        coherence: u8,
        detection: &str,
    ) -> Result<Self, EvalError> {
        Ok(Self {
            eval_id: eval_id.to_string(),
            evaluator_id: evaluator_id.to_string(),
            fluency: check_score("fluency", fluency)?,
            coherence: check_score("coherence", coherence)?,
            detection: detection.parse()?,
        })
    }

    /// 1 when the rater judged the text AI-generated
    pub fn judged_ai(&self) -> u8 {
        self.detection.to_binary()
    }
}

impl TryFrom<RawResponse> for Response {
    type Error = EvalError;

    fn try_from(raw: RawResponse) -> Result<Self, Self::Error> {
        Self::new(&raw.eval_id, &raw.evaluator_id, raw.fluency, raw.coherence, &raw.detection)
    }
}

/// Load and validate every response; any invalid row fails the load
pub fn load_responses(path: &Path) -> Result<Vec<Response>> {
    let raw: Vec<RawResponse> = read_table(path)?;
    raw.into_iter()
        .enumerate()
        .map(|(idx, row)| {
            // +2: header line and 1-based numbering
            Response::try_from(row)
                .with_context(|| format!("Rejected response on line {} of {}", idx + 2, path.display()))
        })
        .collect()
}

/// A response joined with the condition of the item it rates
#[derive(Debug, Clone, PartialEq)]
pub struct RatedResponse {
    pub response: Response,
    pub condition: Condition,
}

/// Inner join of responses with sample metadata on `eval_id`
///
/// Responses naming an item absent from the metadata are dropped.
pub fn join_with_samples(responses: Vec<Response>, samples: &[SampleRecord]) -> Vec<RatedResponse> {
    let conditions: HashMap<&str, Condition> =
        samples.iter().map(|s| (s.eval_id.as_str(), s.condition)).collect();

    let total = responses.len();
    let joined: Vec<RatedResponse> = responses
        .into_iter()
        .filter_map(|response| {
            let condition = *conditions.get(response.eval_id.as_str())?;
            Some(RatedResponse { response, condition })
        })
        .collect();

    if joined.len() < total {
        tracing::warn!(
            "Dropped {} responses with no matching sample metadata",
            total - joined.len()
        );
    }
    joined
}

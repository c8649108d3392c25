// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2024 Hyperpolymath

//! Agreement and descriptive statistics for human evaluation
//!
//! Implements:
//! - Cohen's kappa over paired categorical ratings
//! - Mean and sample standard deviation
//! - Per-condition fluency, coherence and detection accuracy
//! - Overall detection accuracy weighted by pool size

use crate::datasets::Condition;
use crate::error::EvalError;
use crate::responses::{RatedResponse, Response};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Cohen's kappa for two raters over the same ordered items
///
/// The label universe is the union of both sequences. Returns exactly 1.0
/// when expected agreement is 1 (both raters used one identical label
/// throughout). The result is not clamped.
pub fn cohen_kappa<T: Ord>(first: &[T], second: &[T]) -> Result<f64, EvalError> {
    if first.len() != second.len() {
        return Err(EvalError::LengthMismatch {
            left: first.len(),
            right: second.len(),
        });
    }
    if first.is_empty() {
        return Err(EvalError::EmptyRatings);
    }

    let n = first.len() as f64;
    let observed = first.iter().zip(second).filter(|(a, b)| a == b).count() as f64 / n;

    let labels: BTreeSet<&T> = first.iter().chain(second).collect();
    let expected: f64 = labels
        .into_iter()
        .map(|label| {
            let p1 = first.iter().filter(|v| *v == label).count() as f64 / n;
            let p2 = second.iter().filter(|v| *v == label).count() as f64 / n;
            p1 * p2
        })
        .sum();

    if expected == 1.0 {
        return Ok(1.0);
    }
    Ok((observed - expected) / (1.0 - expected))
}

/// Arithmetic mean; undefined for an empty slice
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Standard deviation with Bessel's correction; undefined below two values
pub fn sample_std(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    let m = mean(values)?;
    let n = values.len() as f64;
    let variance = values.iter().map(|x| (x - m).powi(2)).sum::<f64>() / (n - 1.0);
    Some(variance.sqrt())
}

/// Round to two decimals, exact ties to even
///
/// Works on the exact binary value, so `3.125` gives `3.12` while `0.925`
/// (stored slightly above the tie) gives `0.93`.
pub fn round2(value: f64) -> f64 {
    format!("{:.2}", value).parse().unwrap_or(value)
}

/// Inter-rater agreement on the three rated dimensions
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Agreement {
    pub fluency: f64,
    pub coherence: f64,
    pub detection: f64,
    /// Items rated by both evaluators
    pub shared_items: usize,
}

impl Agreement {
    /// Kappas over responses paired by item
    ///
    /// Fluency and coherence are compared as categorical labels; detection
    /// is compared after collapsing to AI/human.
    pub fn from_pairs(pairs: &[(&Response, &Response)]) -> Result<Self, EvalError> {
        let fluency_a: Vec<u8> = pairs.iter().map(|(a, _)| a.fluency).collect();
        let fluency_b: Vec<u8> = pairs.iter().map(|(_, b)| b.fluency).collect();
        let coherence_a: Vec<u8> = pairs.iter().map(|(a, _)| a.coherence).collect();
        let coherence_b: Vec<u8> = pairs.iter().map(|(_, b)| b.coherence).collect();
        let detection_a: Vec<u8> = pairs.iter().map(|(a, _)| a.judged_ai()).collect();
        let detection_b: Vec<u8> = pairs.iter().map(|(_, b)| b.judged_ai()).collect();

        Ok(Self {
            fluency: cohen_kappa(&fluency_a, &fluency_b)?,
            coherence: cohen_kappa(&coherence_a, &coherence_b)?,
            detection: cohen_kappa(&detection_a, &detection_b)?,
            shared_items: pairs.len(),
        })
    }
}

/// Fraction of ratings matching ground truth for a condition
///
/// Human texts are correct when judged human, every other condition when
/// judged AI.
pub fn detection_accuracy(condition: Condition, judged_ai: &[f64]) -> Option<f64> {
    let ai_rate = mean(judged_ai)?;
    if condition.is_human() {
        Some(1.0 - ai_rate)
    } else {
        Some(ai_rate)
    }
}

/// Descriptive statistics for one condition, pooled over evaluators
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConditionStats {
    pub condition: Condition,
    /// Response rows (one per evaluator per item)
    pub rows: usize,
    /// Unique items: rows / evaluators
    pub n: usize,
    pub fluency_mean: f64,
    pub fluency_std: Option<f64>,
    pub coherence_mean: f64,
    pub coherence_std: Option<f64>,
    pub detection_accuracy: f64,
}

impl ConditionStats {
    pub fn from_responses(
        condition: Condition,
        responses: &[&Response],
        evaluators: usize,
    ) -> Result<Self, EvalError> {
        let rows = responses.len();
        if rows == 0 || evaluators == 0 || rows % evaluators != 0 {
            return Err(EvalError::UnevenConditionRows {
                condition: condition.to_string(),
                rows,
                evaluators,
            });
        }

        let fluency: Vec<f64> = responses.iter().map(|r| r.fluency as f64).collect();
        let coherence: Vec<f64> = responses.iter().map(|r| r.coherence as f64).collect();
        let judged_ai: Vec<f64> = responses.iter().map(|r| r.judged_ai() as f64).collect();

        // rows > 0, so every mean below is defined
        Ok(Self {
            condition,
            rows,
            n: rows / evaluators,
            fluency_mean: mean(&fluency).unwrap_or_default(),
            fluency_std: sample_std(&fluency),
            coherence_mean: mean(&coherence).unwrap_or_default(),
            coherence_std: sample_std(&coherence),
            detection_accuracy: detection_accuracy(condition, &judged_ai).unwrap_or_default(),
        })
    }
}

/// Group joined responses by condition and summarise each group
pub fn aggregate_by_condition(
    rated: &[RatedResponse],
    evaluators: usize,
) -> Result<BTreeMap<Condition, ConditionStats>, EvalError> {
    let mut groups: BTreeMap<Condition, Vec<&Response>> = BTreeMap::new();
    for row in rated {
        groups.entry(row.condition).or_default().push(&row.response);
    }

    groups
        .into_iter()
        .map(|(condition, responses)| {
            let stats = ConditionStats::from_responses(condition, &responses, evaluators)?;
            Ok((condition, stats))
        })
        .collect()
}

/// Detection accuracy over every rating
///
/// Weighted average of the pooled AI-side accuracy and the human-side
/// accuracy, weighted by their row counts.
pub fn overall_detection_accuracy(rated: &[RatedResponse]) -> Option<f64> {
    let (human, ai): (Vec<&RatedResponse>, Vec<&RatedResponse>) =
        rated.iter().partition(|r| r.condition.is_human());

    let judged = |pool: &[&RatedResponse]| -> Vec<f64> {
        pool.iter().map(|r| r.response.judged_ai() as f64).collect()
    };

    let ai_accuracy = mean(&judged(&ai[..])).unwrap_or_default();
    let human_accuracy = mean(&judged(&human[..])).map(|m| 1.0 - m).unwrap_or_default();

    let total = ai.len() + human.len();
    if total == 0 {
        return None;
    }
    Some((ai_accuracy * ai.len() as f64 + human_accuracy * human.len() as f64) / total as f64)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response(id: &str, evaluator: &str, fluency: u8, coherence: u8, detection: &str) -> Response {
        Response::new(id, evaluator, fluency, coherence, detection).unwrap()
    }

    fn rated_row(condition: Condition, detection: &str) -> RatedResponse {
        RatedResponse {
            response: response("TEXT_001", "Evaluator_1", 3, 3, detection),
            condition,
        }
    }

    #[test]
    fn test_kappa_identical() {
        let a = vec![1, 2, 3, 2, 1];
        assert!((cohen_kappa(&a, &a).unwrap() - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_kappa_single_shared_label() {
        // pe == 1: defined as perfect agreement
        let a = vec![4, 4, 4];
        assert_eq!(cohen_kappa(&a, &a).unwrap(), 1.0);
    }

    #[test]
    fn test_kappa_disjoint_constant_labels() {
        let a = vec![1, 1, 1, 1];
        let b = vec![0, 0, 0, 0];
        assert!(cohen_kappa(&a, &b).unwrap().abs() < 1e-6);
    }

    #[test]
    fn test_kappa_chance_level() {
        // Balanced 50/50 marginals, agreement exactly at chance
        let a = vec![1, 1, 0, 0];
        let b = vec![1, 0, 1, 0];
        assert!(cohen_kappa(&a, &b).unwrap().abs() < 1e-6);
    }

    #[test]
    fn test_kappa_complete_disagreement() {
        // po = 0, pe = 0.5
        let a = vec![1, 0, 1, 0];
        let b = vec![0, 1, 0, 1];
        assert!((cohen_kappa(&a, &b).unwrap() - (-1.0)).abs() < 1e-6);
    }

    #[test]
    fn test_kappa_known_value() {
        // po = 0.8, pe = 0.6*0.6 + 0.4*0.4 = 0.52
        let a = vec![1, 1, 1, 0, 0, 1, 1, 0, 0, 1];
        let b = vec![1, 1, 0, 0, 0, 1, 1, 1, 0, 1];
        let expected = (0.8 - 0.52) / (1.0 - 0.52);
        assert!((cohen_kappa(&a, &b).unwrap() - expected).abs() < 1e-6);
    }

    #[test]
    fn test_kappa_is_deterministic() {
        let a = [1, 2, 3, 4, 5, 3, 2, 4, 1, 5, 3];
        let b = [2, 2, 3, 5, 4, 3, 1, 4, 1, 5, 2];
        let first = cohen_kappa(&a, &b).unwrap();
        for _ in 0..20 {
            assert_eq!(cohen_kappa(&a, &b).unwrap().to_bits(), first.to_bits());
        }
    }

    #[test]
    fn test_kappa_invalid_input() {
        let empty: Vec<u8> = vec![];
        assert_eq!(cohen_kappa(&empty, &empty), Err(EvalError::EmptyRatings));
        assert_eq!(
            cohen_kappa(&[1, 2], &[1]),
            Err(EvalError::LengthMismatch { left: 2, right: 1 })
        );
    }

    #[test]
    fn test_mean_and_std() {
        let values = vec![2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        assert!((mean(&values).unwrap() - 5.0).abs() < 1e-6);
        assert!((sample_std(&values).unwrap() - 2.138089935).abs() < 1e-6);
        assert_eq!(sample_std(&[3.0]), None);
        assert_eq!(mean(&[]), None);
    }

    #[test]
    fn test_round2() {
        assert_eq!(round2(2.0 / 3.0), 0.67);
        assert_eq!(round2(-0.333), -0.33);
        assert_eq!(round2(0.925), 0.93);
    }

    #[test]
    fn test_round2_ties_to_even() {
        assert_eq!(round2(3.125), 3.12);
        assert_eq!(round2(0.625), 0.62);
        assert_eq!(round2(0.375), 0.38);
        assert_eq!(round2(3.0 / 24.0), 0.12);
        // agrees with the two-decimal display
        for v in [3.125, 0.625, 0.875, 2.0 / 3.0] {
            assert_eq!(format!("{:.2}", round2(v)), format!("{:.2}", v));
        }
    }

    #[test]
    fn test_human_condition_accuracy() {
        let judged: Vec<f64> = ["Probably Human", "Definitely Human", "Probably AI"]
            .iter()
            .map(|l| crate::responses::convert_detection_to_binary(l).unwrap() as f64)
            .collect();
        let accuracy = detection_accuracy(Condition::Human, &judged).unwrap();
        assert_eq!(round2(accuracy), 0.67);

        let ai_accuracy = detection_accuracy(Condition::OriginalAi, &judged).unwrap();
        assert_eq!(round2(ai_accuracy), 0.33);
    }

    #[test]
    fn test_condition_stats() {
        let rows = vec![
            response("TEXT_001", "Evaluator_1", 4, 5, "Probably AI"),
            response("TEXT_001", "Evaluator_2", 5, 4, "Definitely AI"),
            response("TEXT_002", "Evaluator_1", 3, 3, "Probably Human"),
            response("TEXT_002", "Evaluator_2", 4, 4, "Probably AI"),
        ];
        let refs: Vec<&Response> = rows.iter().collect();

        let stats = ConditionStats::from_responses(Condition::OriginalAi, &refs, 2).unwrap();
        assert_eq!(stats.rows, 4);
        assert_eq!(stats.n, 2);
        assert!((stats.fluency_mean - 4.0).abs() < 1e-6);
        assert!((stats.coherence_mean - 4.0).abs() < 1e-6);
        assert!((stats.fluency_std.unwrap() - (2.0f64 / 3.0).sqrt()).abs() < 1e-6);
        assert!((stats.detection_accuracy - 0.75).abs() < 1e-6);
    }

    #[test]
    fn test_condition_stats_uneven_rows() {
        let rows = vec![
            response("TEXT_001", "Evaluator_1", 4, 5, "Probably AI"),
            response("TEXT_001", "Evaluator_2", 5, 4, "Definitely AI"),
            response("TEXT_002", "Evaluator_1", 3, 3, "Probably Human"),
        ];
        let refs: Vec<&Response> = rows.iter().collect();

        let err = ConditionStats::from_responses(Condition::Human, &refs, 2).unwrap_err();
        assert_eq!(
            err,
            EvalError::UnevenConditionRows {
                condition: "human".to_string(),
                rows: 3,
                evaluators: 2
            }
        );
    }

    #[test]
    fn test_aggregate_by_condition_order() {
        let rated = vec![
            rated_row(Condition::RewrittenFlipped, "Probably Human"),
            rated_row(Condition::RewrittenFlipped, "Probably Human"),
            rated_row(Condition::Human, "Probably Human"),
            rated_row(Condition::Human, "Probably AI"),
        ];

        let stats = aggregate_by_condition(&rated, 2).unwrap();
        let order: Vec<Condition> = stats.keys().copied().collect();
        assert_eq!(order, vec![Condition::Human, Condition::RewrittenFlipped]);
        assert!((stats[&Condition::Human].detection_accuracy - 0.5).abs() < 1e-6);
        assert!(stats[&Condition::RewrittenFlipped].detection_accuracy.abs() < 1e-6);
    }

    #[test]
    fn test_overall_accuracy_is_weighted() {
        // AI pool: 3 of 4 judged AI; human pool: 1 of 2 judged human
        let rated = vec![
            rated_row(Condition::OriginalAi, "Probably AI"),
            rated_row(Condition::OriginalAi, "Definitely AI"),
            rated_row(Condition::RewrittenFlipped, "Probably AI"),
            rated_row(Condition::RewrittenFlipped, "Probably Human"),
            rated_row(Condition::Human, "Definitely Human"),
            rated_row(Condition::Human, "Probably AI"),
        ];

        let overall = overall_detection_accuracy(&rated).unwrap();
        assert!((overall - 4.0 / 6.0).abs() < 1e-6);
        // An unweighted mean of the pools would give 0.625
        assert!((overall - 0.625).abs() > 1e-3);
    }

    #[test]
    fn test_overall_accuracy_single_pool() {
        let rated = vec![rated_row(Condition::Human, "Probably Human")];
        assert!((overall_detection_accuracy(&rated).unwrap() - 1.0).abs() < 1e-6);
        assert_eq!(overall_detection_accuracy(&[]), None);
    }

    #[test]
    fn test_agreement_from_pairs() {
        let first = vec![
            response("TEXT_001", "Evaluator_1", 4, 4, "Probably AI"),
            response("TEXT_002", "Evaluator_1", 3, 2, "Definitely Human"),
        ];
        let second = vec![
            response("TEXT_001", "Evaluator_2", 4, 4, "Definitely AI"),
            response("TEXT_002", "Evaluator_2", 3, 2, "Probably Human"),
        ];
        let pairs: Vec<(&Response, &Response)> = first.iter().zip(second.iter()).collect();

        let agreement = Agreement::from_pairs(&pairs).unwrap();
        assert_eq!(agreement.shared_items, 2);
        assert!((agreement.fluency - 1.0).abs() < 1e-6);
        assert!((agreement.coherence - 1.0).abs() < 1e-6);
        // Different labels, same binary judgment
        assert!((agreement.detection - 1.0).abs() < 1e-6);
    }
}

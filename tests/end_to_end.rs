// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2024 Hyperpolymath

//! Selector output feeding the agreement analysis, through files on disk

use human_eval::datasets::{read_table, Strategy};
use human_eval::latex::LatexTable;
use human_eval::pipeline::{AnalysisConfig, AnalysisPipeline};
use human_eval::selection::{SampleSelector, SelectionConfig};
use human_eval::{Condition, SampleRecord};
use std::fmt::Write as _;
use std::path::Path;

fn write_source_tables(dir: &Path) {
    for strategy in Strategy::ALL {
        let mut csv = String::from("true_label,pred_label,original_text,modified_text,replacements\n");
        for i in 0..25 {
            writeln!(csv, "1,0,{s} source {i},{s} flipped {i},\"{{'a': 'b'}}\"", s = strategy.tag(), i = i).unwrap();
        }
        for i in 0..6 {
            writeln!(csv, "1,1,{s} source d{i},{s} detected {i},{{}}", s = strategy.tag(), i = i).unwrap();
        }
        writeln!(csv, "0,0,human row,human row,{{}}").unwrap();
        std::fs::write(dir.join(strategy.results_file()), csv).unwrap();
    }

    std::fs::create_dir_all(dir.join("Data")).unwrap();
    for (lang, domain) in [("en", "news"), ("nl", "twitter")] {
        let mut csv = String::from("text,label\n");
        for i in 0..10 {
            writeln!(csv, "{lang} {domain} ai {i},1", lang = lang, domain = domain, i = i).unwrap();
            writeln!(csv, "{lang} {domain} human {i},0", lang = lang, domain = domain, i = i).unwrap();
        }
        std::fs::write(dir.join("Data").join(format!("dev_{}_{}.csv", lang, domain)), csv).unwrap();
    }
}

/// Evaluator 1 always judges correctly; evaluator 2 calls everything AI
fn write_responses(path: &Path, samples: &[SampleRecord]) {
    let mut csv = String::from("eval_id,evaluator_id,fluency,coherence,detection,timestamp\n");
    for sample in samples {
        let correct = if sample.condition.is_human() { "Probably Human" } else { "Definitely AI" };
        writeln!(csv, "{},Evaluator_1,4,4,{},2024-05-01", sample.eval_id, correct).unwrap();
        writeln!(csv, "{},Evaluator_2,4,3,Probably AI,2024-05-01", sample.eval_id).unwrap();
    }
    std::fs::write(path, csv).unwrap();
}

#[test]
fn test_select_then_analyze() {
    let data = tempfile::tempdir().unwrap();
    let out = tempfile::tempdir().unwrap();
    write_source_tables(data.path());

    let config = SelectionConfig {
        data_dir: data.path().to_string_lossy().to_string(),
        output_dir: out.path().to_string_lossy().to_string(),
        ..Default::default()
    };
    let mut selector = SampleSelector::new(config);
    let selection = selector.run().expect("selection should succeed");
    assert_eq!(selection.samples.len(), 100);

    let (samples_path, texts_path) = selector.save(&selection).unwrap();
    let saved: Vec<SampleRecord> = read_table(&samples_path).unwrap();
    assert_eq!(saved, selection.samples);
    assert!(texts_path.exists());

    let responses_path = out.path().join("responses.csv");
    write_responses(&responses_path, &saved);

    let config = AnalysisConfig {
        responses_path: responses_path.to_string_lossy().to_string(),
        samples_path: samples_path.to_string_lossy().to_string(),
        output_dir: out.path().to_string_lossy().to_string(),
        ..Default::default()
    };
    let results = AnalysisPipeline::new(config).run().expect("analysis should succeed");

    assert_eq!(results.n_samples, 100);
    assert_eq!(results.agreement.shared_items, 100);
    assert_eq!(results.conditions[&Condition::Human].n, 15);
    assert_eq!(results.conditions[&Condition::OriginalAi].n, 15);
    assert_eq!(results.conditions[&Condition::RewrittenFlipped].n, 58);
    assert_eq!(results.conditions[&Condition::RewrittenDetected].n, 12);

    // Evaluator 2 misjudges the 15 human items, 185 of 200 ratings are correct
    assert!((results.overall_detection_accuracy - 185.0 / 200.0).abs() < 1e-6);
    assert!((results.conditions[&Condition::Human].detection_accuracy - 0.5).abs() < 1e-6);
    assert!((results.conditions[&Condition::OriginalAi].detection_accuracy - 1.0).abs() < 1e-6);

    // Fluency: both raters always give 4, so pe == 1
    assert_eq!(results.agreement.fluency, 1.0);
    // Coherence: disjoint constant labels
    assert!(results.agreement.coherence.abs() < 1e-6);
    // Detection: po = 0.85, pe = 0.85 * 1.0
    assert!(results.agreement.detection.abs() < 1e-6);

    let json_path = out.path().join("human_eval_results.json");
    AnalysisPipeline::save_results(&results, &json_path).unwrap();
    let record: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(&json_path).unwrap()).unwrap();
    assert_eq!(record["kappa_fluency"], 1.0);
    assert_eq!(record["rewritten_flipped_n"], 58);
    assert_eq!(record["overall_detection_accuracy"], 0.93);

    let tex = LatexTable::from_results(&results).render();
    assert!(tex.contains("Rewritten (Detected) & 12 &"));
    assert!(tex.contains("\\textit{Overall} & 100 & --- & --- & 93.0\\%"));
}

#[test]
fn test_selection_is_reproducible_from_disk() {
    let data = tempfile::tempdir().unwrap();
    write_source_tables(data.path());

    let run = || {
        let config = SelectionConfig {
            data_dir: data.path().to_string_lossy().to_string(),
            seed: 1234,
            ..Default::default()
        };
        SampleSelector::new(config).run().unwrap().samples
    };

    assert_eq!(run(), run());
}

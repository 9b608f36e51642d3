//! End-to-end tests with a native C compiler

use std::time::{Duration, Instant};

use adjudicator::{Judge, JudgingConfiguration, Stage};

use super::{fixture_source, scratch_is_empty, toolchain};

fn c_judge(root: &std::path::Path) -> Judge {
    Judge::new(toolchain("c")).with_scratch_root(root)
}

#[tokio::test]
async fn test_c_correct_output_scores_maximum() {
    let root = tempfile::tempdir().unwrap();
    let config = JudgingConfiguration::default().with_quality_review(false);

    let result = c_judge(root.path())
        .judge(&fixture_source("multiply.c"), "2 3", "6", &config)
        .await;

    assert!(result.success);
    assert_eq!(result.stage, Stage::Scored);
    assert_eq!(result.final_score, config.max_score);
    assert!(scratch_is_empty(root.path()));
}

#[tokio::test]
async fn test_c_syntax_error_partitions_diagnostics() {
    let root = tempfile::tempdir().unwrap();
    let config = JudgingConfiguration::default();

    let result = c_judge(root.path())
        .judge(&fixture_source("syntax_error.c"), "", "", &config)
        .await;

    assert!(result.success);
    assert_eq!(result.stage, Stage::Compiling);
    assert_eq!(result.final_score, 0.0);

    let compilation = result.compilation.unwrap();
    assert!(!compilation.errors.is_empty());
    assert!(compilation.errors.iter().all(|e| e.contains("error")));
    assert!(compilation.warnings.iter().all(|w| w.contains("warning")));
    assert!(scratch_is_empty(root.path()));
}

#[tokio::test]
async fn test_c_infinite_loop_times_out() {
    let root = tempfile::tempdir().unwrap();
    let config = JudgingConfiguration::default().with_timeout(2.0);

    let start = Instant::now();
    let result = c_judge(root.path())
        .judge(&fixture_source("infinite_loop.c"), "", "", &config)
        .await;

    // Compilation time counts too, so the margin is generous
    assert!(start.elapsed() < Duration::from_secs(20));
    assert_eq!(result.stage, Stage::Executing);
    assert!(result.execution.unwrap().timed_out);
    assert_eq!(result.final_score, 0.0);
    assert!(scratch_is_empty(root.path()));
}

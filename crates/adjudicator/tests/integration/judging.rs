use std::time::{Duration, Instant};

use adjudicator::{JudgingConfiguration, ReviewerSettings, Stage};
use tokio::task::JoinSet;

use super::{fixture_source, scratch_is_empty, sh_judge};

fn unreachable_reviewer() -> ReviewerSettings {
    ReviewerSettings {
        // Discard port; nothing listens there
        endpoint: "http://127.0.0.1:9/v1".to_owned(),
        api_key: Some("test-key".to_owned()),
        request_timeout: 5.0,
        ..Default::default()
    }
}

#[tokio::test]
async fn test_correct_output_without_review_scores_maximum() {
    let root = tempfile::tempdir().unwrap();
    let judge = sh_judge(root.path());
    let config = JudgingConfiguration::default().with_quality_review(false);

    let result = judge
        .judge(&fixture_source("multiply.sh"), "2 3", "6", &config)
        .await;

    assert!(result.success);
    assert_eq!(result.stage, Stage::Scored);
    assert_eq!(result.final_score, config.max_score);
    assert!(result.output_matched);
    assert!(result.compilation.unwrap().success);
    assert_eq!(result.execution.unwrap().stdout, "6\n");
    assert!(scratch_is_empty(root.path()));
}

#[tokio::test]
async fn test_syntax_error_scores_zero() {
    let root = tempfile::tempdir().unwrap();
    let judge = sh_judge(root.path());
    let config = JudgingConfiguration::default();

    let result = judge
        .judge(&fixture_source("syntax_error.sh"), "", "", &config)
        .await;

    assert!(result.success);
    assert_eq!(result.stage, Stage::Compiling);
    assert_eq!(result.final_score, 0.0);
    assert!(!result.compilation.unwrap().errors.is_empty());
    assert!(result.execution.is_none());
    assert_eq!(result.error_message.as_deref(), Some("compilation failed"));
    assert!(scratch_is_empty(root.path()));
}

#[tokio::test]
async fn test_infinite_loop_times_out() {
    let root = tempfile::tempdir().unwrap();
    let judge = sh_judge(root.path());
    let config = JudgingConfiguration::default().with_timeout(2.0);

    let start = Instant::now();
    let result = judge
        .judge(&fixture_source("infinite_loop.sh"), "", "", &config)
        .await;
    let elapsed = start.elapsed();

    assert!(elapsed >= Duration::from_secs(2));
    assert!(elapsed < Duration::from_secs(6), "took {elapsed:?}");
    assert!(result.success);
    assert_eq!(result.stage, Stage::Executing);
    assert_eq!(result.final_score, 0.0);
    assert!(result.execution.unwrap().timed_out);
    assert_eq!(result.error_message.as_deref(), Some("execution timed out"));
    assert!(scratch_is_empty(root.path()));
}

#[tokio::test]
async fn test_unreachable_reviewer_uses_fallback_score() {
    let root = tempfile::tempdir().unwrap();
    let judge = sh_judge(root.path());
    let config = JudgingConfiguration::default().with_reviewer(unreachable_reviewer());

    let result = judge
        .judge(&fixture_source("multiply.sh"), "2 3", "6", &config)
        .await;

    assert!(result.success);
    assert_eq!(result.stage, Stage::Scored);
    assert!((result.final_score - 0.8 * config.max_score).abs() < 1e-9);
    assert!(result.quality.is_none());
    assert!(scratch_is_empty(root.path()));
}

#[tokio::test]
async fn test_missing_api_key_uses_fallback_score() {
    let root = tempfile::tempdir().unwrap();
    let judge = sh_judge(root.path());
    let config = JudgingConfiguration::default();

    let result = judge
        .judge(&fixture_source("multiply.sh"), "2 3", "6", &config)
        .await;

    assert!(result.success);
    assert!((result.final_score - 24.0).abs() < 1e-9);
    assert!(result.error_message.unwrap().contains("API key not configured"));
}

#[tokio::test]
async fn test_comparison_flags() {
    let root = tempfile::tempdir().unwrap();
    let judge = sh_judge(root.path());
    let source = "echo '  Hello World  '\n";

    let lenient = JudgingConfiguration::default().with_quality_review(false);
    let result = judge.judge(source, "", "hello world", &lenient).await;
    assert!(result.output_matched);
    assert_eq!(result.final_score, 30.0);

    let exact = lenient
        .clone()
        .with_ignore_case(false)
        .with_ignore_whitespace(false);
    let result = judge.judge(source, "", "hello world", &exact).await;
    assert!(!result.output_matched);
    assert_eq!(result.stage, Stage::Comparing);
    assert_eq!(result.final_score, 0.0);
}

#[tokio::test]
async fn test_concurrent_calls_are_independent() {
    let root = tempfile::tempdir().unwrap();
    let judge = sh_judge(root.path());
    let config = JudgingConfiguration::default().with_quality_review(false);
    let source = fixture_source("multiply.sh");

    let mut tasks = JoinSet::new();
    for n in 1..=8u32 {
        let judge = judge.clone();
        let config = config.clone();
        let source = source.clone();
        tasks.spawn(async move {
            let expected = (n * 7).to_string();
            let result = judge
                .judge(&source, &format!("{n} 7"), &expected, &config)
                .await;
            (n, result)
        });
    }

    while let Some(joined) = tasks.join_next().await {
        let (n, result) = joined.unwrap();
        assert!(result.success, "call {n} failed");
        assert_eq!(result.final_score, 30.0, "call {n} scored wrong");
    }

    assert!(scratch_is_empty(root.path()));
}

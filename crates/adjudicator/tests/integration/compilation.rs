use adjudicator::config::Config;
use adjudicator::runner::Runner;
use adjudicator::scratch::ScratchDir;

use super::{fixture_source, toolchain};

fn custom_runner(compile: &str, output_name: Option<&str>, time_limit: f64) -> Runner {
    let output = output_name
        .map(|name| format!("output_name = \"{name}\"\n"))
        .unwrap_or_default();
    let toml = format!(
        r#"
[toolchains.custom]
name = "Custom"
extension = "txt"

[toolchains.custom.compile]
command = {compile}
source_name = "main.txt"
{output}time_limit = {time_limit}

[toolchains.custom.run]
command = ["cat", "{{binary}}"]
"#
    );
    let config = Config::parse_toml(&toml).expect("Failed to parse toolchain");
    Runner::new(config.get_toolchain("custom").unwrap().clone())
}

#[tokio::test]
async fn test_compile_success_produces_artifact() {
    let root = tempfile::tempdir().unwrap();
    let mut scratch = ScratchDir::create(Some(root.path())).unwrap();
    let runner = Runner::new(toolchain("sh"));

    let result = runner.compile(&scratch, &fixture_source("multiply.sh")).await;

    assert!(result.is_success());
    assert!(result.errors.is_empty());
    let artifact = result.artifact.expect("artifact missing");
    assert!(artifact.starts_with(scratch.path()));
    assert!(artifact.exists());
    assert!(result.time >= 0.0);

    scratch.cleanup().unwrap();
}

#[tokio::test]
async fn test_compile_syntax_error_reports_errors() {
    let root = tempfile::tempdir().unwrap();
    let mut scratch = ScratchDir::create(Some(root.path())).unwrap();
    let runner = Runner::new(toolchain("sh"));

    let result = runner
        .compile(&scratch, &fixture_source("syntax_error.sh"))
        .await;

    assert!(!result.is_success());
    assert!(result.artifact.is_none());
    assert!(!result.errors.is_empty());

    scratch.cleanup().unwrap();
}

#[tokio::test]
async fn test_compile_missing_compiler_is_single_error() {
    let root = tempfile::tempdir().unwrap();
    let mut scratch = ScratchDir::create(Some(root.path())).unwrap();
    let runner = custom_runner(r#"["adjudicator-no-such-compiler", "{source}"]"#, None, 5.0);

    let result = runner.compile(&scratch, "anything").await;

    assert!(!result.success);
    assert_eq!(result.errors.len(), 1);
    assert!(result.errors[0].contains("adjudicator-no-such-compiler"));

    scratch.cleanup().unwrap();
}

#[tokio::test]
async fn test_compile_without_artifact_fails() {
    let root = tempfile::tempdir().unwrap();
    let mut scratch = ScratchDir::create(Some(root.path())).unwrap();
    let runner = custom_runner(r#"["true"]"#, Some("main"), 5.0);

    let result = runner.compile(&scratch, "anything").await;

    assert!(!result.success);
    assert!(result.artifact.is_none());
    assert!(result.errors[0].contains("produced no artifact"));

    scratch.cleanup().unwrap();
}

#[tokio::test]
async fn test_compile_failure_without_diagnostics_reports_exit_code() {
    let root = tempfile::tempdir().unwrap();
    let mut scratch = ScratchDir::create(Some(root.path())).unwrap();
    let runner = custom_runner(r#"["false"]"#, None, 5.0);

    let result = runner.compile(&scratch, "anything").await;

    assert!(!result.success);
    assert_eq!(result.errors, vec!["compiler exited with code 1"]);

    scratch.cleanup().unwrap();
}

#[tokio::test]
async fn test_compile_time_limit() {
    let root = tempfile::tempdir().unwrap();
    let mut scratch = ScratchDir::create(Some(root.path())).unwrap();
    let runner = custom_runner(r#"["sleep", "10"]"#, None, 0.5);

    let start = std::time::Instant::now();
    let result = runner.compile(&scratch, "anything").await;

    assert!(start.elapsed().as_secs_f64() < 5.0);
    assert!(!result.success);
    assert!(result.errors.iter().any(|e| e.contains("timed out")));

    scratch.cleanup().unwrap();
}

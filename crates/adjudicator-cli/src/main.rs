//! Adjudicator CLI
//!
//! A command-line tool for judging a single submission against an expected output.

use std::path::{Path, PathBuf};

use adjudicator::{Config, EXAMPLE_CONFIG, Judge};
use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing::{Level, debug, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "adjudicator")]
#[command(about = "A tool for compiling, running and scoring submitted programs")]
#[command(version)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize a new configuration file
    Init {
        /// Output path (default: adjudicator.toml)
        #[arg(short, long, default_value = "adjudicator.toml")]
        output: PathBuf,

        /// Overwrite existing file
        #[arg(short, long)]
        force: bool,
    },

    /// Judge a submission and print the result as JSON
    Judge(JudgeArgs),

    /// List available toolchains
    Toolchains,

    /// Show the effective configuration
    ShowConfig,
}

#[derive(Args)]
struct JudgeArgs {
    /// Source file to judge
    #[arg(value_name = "FILE")]
    source: PathBuf,

    /// Toolchain ID (e.g., c, cpp17, python3)
    #[arg(short, long)]
    toolchain: String,

    /// Input file fed to the program (default: empty input)
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// File with the expected output
    #[arg(short, long)]
    expected: PathBuf,

    /// Execution timeout in seconds
    #[arg(long, value_parser = parse_positive_seconds)]
    timeout: Option<f64>,

    /// Skip the quality review
    #[arg(long)]
    no_review: bool,

    /// Maximum score
    #[arg(long, value_parser = parse_max_score)]
    max_score: Option<f64>,

    /// API key for the quality reviewer
    #[arg(long)]
    api_key: Option<String>,

    /// Compare outputs exactly (case and surrounding whitespace matter)
    #[arg(long)]
    exact: bool,
}

fn parse_positive_seconds(s: &str) -> Result<f64, String> {
    let value: f64 = s.parse().map_err(|e| format!("{e}"))?;
    if value.is_finite() && value > 0.0 {
        Ok(value)
    } else {
        Err(format!("expected a positive number of seconds, got {s}"))
    }
}

fn parse_max_score(s: &str) -> Result<f64, String> {
    let value: f64 = s.parse().map_err(|e| format!("{e}"))?;
    if value.is_finite() && value >= 0.0 {
        Ok(value)
    } else {
        Err(format!("expected a non-negative score, got {s}"))
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::from_default_env().add_directive(Level::DEBUG.into())
    } else {
        EnvFilter::from_default_env().add_directive(Level::INFO.into())
    };

    // Logs go to stderr so stdout stays machine-readable
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let config = if let Some(ref path) = cli.config {
        info!(?path, "loading configuration");
        Config::from_file(path).context("failed to load configuration")?
    } else {
        debug!("using default configuration");
        Config::default()
    };

    match cli.command {
        Commands::Init { output, force } => init_config(&output, force).await,
        Commands::Judge(args) => run_judge(&config, args).await,
        Commands::Toolchains => {
            list_toolchains(&config);
            Ok(())
        }
        Commands::ShowConfig => {
            show_config(&config);
            Ok(())
        }
    }
}

async fn run_judge(config: &Config, args: JudgeArgs) -> Result<()> {
    let judge = Judge::from_config(config, &args.toolchain).context("unknown toolchain")?;

    let source = read_text(&args.source, "source").await?;
    let expected = read_text(&args.expected, "expected output").await?;
    let input = match args.input {
        Some(ref path) => read_text(path, "input").await?,
        None => String::new(),
    };

    let mut settings = config.judging.clone();
    if let Some(timeout) = args.timeout {
        settings = settings.with_timeout(timeout);
    }
    if let Some(max_score) = args.max_score {
        settings = settings.with_max_score(max_score);
    }
    if args.no_review {
        settings = settings.with_quality_review(false);
    }
    if args.exact {
        settings = settings.with_ignore_case(false).with_ignore_whitespace(false);
    }
    if let Some(api_key) = args.api_key {
        settings.reviewer.api_key = Some(api_key);
    }

    info!(toolchain = %judge.toolchain().name, "judging submission");

    let result = judge.judge(&source, &input, &expected, &settings).await;

    println!(
        "{}",
        serde_json::to_string_pretty(&result).context("failed to serialize result")?
    );

    if result.success {
        Ok(())
    } else {
        std::process::exit(2);
    }
}

async fn read_text(path: &Path, what: &str) -> Result<String> {
    tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("failed to read {what} file '{}'", path.display()))
}

fn list_toolchains(config: &Config) {
    println!("Available toolchains:\n");

    let mut toolchains: Vec<_> = config.toolchains.iter().collect();
    toolchains.sort_by_key(|(id, _)| *id);

    for (id, toolchain) in toolchains {
        println!("  {:<15} {} (.{})", id, toolchain.name, toolchain.extension);
    }
}

fn show_config(config: &Config) {
    let judging = &config.judging;
    println!("Judging defaults:");
    println!("  Timeout: {}s", judging.timeout);
    println!("  Ignore case: {}", judging.ignore_case);
    println!("  Ignore whitespace: {}", judging.ignore_whitespace);
    println!("  Quality review: {}", judging.quality_review);
    println!("  Max score: {}", judging.max_score);
    println!("  Max output: {} bytes", judging.max_output_bytes);
    println!();
    println!("Reviewer:");
    println!("  Endpoint: {}", judging.reviewer.endpoint);
    println!("  Model: {}", judging.reviewer.model);
    println!(
        "  API key: {}",
        if judging.reviewer.api_key.is_some() {
            "configured"
        } else {
            "not configured"
        }
    );
    println!();
    match config.scratch_root {
        Some(ref root) => println!("Scratch root: {}", root.display()),
        None => println!("Scratch root: {}", std::env::temp_dir().display()),
    }
    println!();
    println!("Toolchains configured: {}", config.toolchains.len());
}

async fn init_config(output: &PathBuf, force: bool) -> Result<()> {
    if output.exists() && !force {
        anyhow::bail!(
            "Configuration file already exists at '{}'. Use --force to overwrite.",
            output.display()
        );
    }

    tokio::fs::write(output, EXAMPLE_CONFIG)
        .await
        .context("failed to write configuration file")?;

    println!("Created configuration file at '{}'", output.display());
    Ok(())
}

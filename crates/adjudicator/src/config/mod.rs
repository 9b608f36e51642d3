use std::collections::HashMap;
use std::path::PathBuf;

use serde::Deserialize;
use thiserror::Error;

pub use crate::config::toolchain::{
    CompileConfig, DEFAULT_SANDBOX_PATH, FileExtension, RunConfig, Toolchain,
};
use crate::types::JudgingConfiguration;

mod loader;
pub mod toolchain;

/// Example configuration embedded at compile time.
///
/// Library users can access this to generate a starter config file.
pub const EXAMPLE_CONFIG: &str = include_str!("../../adjudicator.example.toml");

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid characters in file extension")]
    InvalidFileExtChars,

    #[error("failed to parse config: {0}")]
    Parse(#[from] config::ConfigError),

    #[error("toolchain '{0}' not found in configuration")]
    ToolchainNotFound(String),

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Config for Adjudicator
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Directory under which per-session scratch directories are created.
    /// Uses the system temporary directory when unset.
    #[serde(default)]
    pub scratch_root: Option<PathBuf>,

    /// Default judging parameters
    #[serde(default)]
    pub judging: JudgingConfiguration,

    /// Toolchain configurations keyed by toolchain ID
    #[serde(default)]
    pub toolchains: HashMap<String, Toolchain>,
}

impl Config {
    /// Create a new config with embedded default toolchains
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty config with no toolchains
    pub fn empty() -> Self {
        Self {
            scratch_root: None,
            judging: JudgingConfiguration::default(),
            toolchains: HashMap::new(),
        }
    }

    /// Get a toolchain by ID
    pub fn get_toolchain(&self, id: &str) -> Result<&Toolchain, ConfigError> {
        self.toolchains
            .get(id)
            .ok_or_else(|| ConfigError::ToolchainNotFound(id.to_string()))
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::parse_toml(EXAMPLE_CONFIG).expect("embedded default config should be valid")
    }
}

//! Configuration file loading for Adjudicator
//!
//! Handles loading and parsing configuration files using the config crate.

use std::path::Path;

use config::{Config as ConfigBuilder, File, FileFormat};

use crate::config::{Config, ConfigError};

impl Config {
    /// Load configuration from a file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let config = ConfigBuilder::builder()
            .add_source(File::from(path))
            .build()?;

        let config: Config = config.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Parse configuration from a TOML string
    pub fn parse_toml(content: &str) -> Result<Self, ConfigError> {
        let config = ConfigBuilder::builder()
            .add_source(File::from_str(content, FileFormat::Toml))
            .build()?;

        let config: Config = config.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    fn validate(&self) -> Result<(), ConfigError> {
        let judging = &self.judging;
        if !judging.timeout.is_finite() || judging.timeout <= 0.0 {
            return Err(ConfigError::Invalid(format!(
                "judging timeout must be positive, got {}",
                judging.timeout
            )));
        }
        if !judging.max_score.is_finite() || judging.max_score < 0.0 {
            return Err(ConfigError::Invalid(format!(
                "judging max_score must be non-negative, got {}",
                judging.max_score
            )));
        }

        for (id, toolchain) in &self.toolchains {
            if toolchain.name.is_empty() {
                return Err(ConfigError::Invalid(format!(
                    "toolchain '{id}' has empty name"
                )));
            }
            if toolchain.compile.command.is_empty() {
                return Err(ConfigError::Invalid(format!(
                    "toolchain '{id}' has empty compile command"
                )));
            }
            if toolchain.run.command.is_empty() {
                return Err(ConfigError::Invalid(format!(
                    "toolchain '{id}' has empty run command"
                )));
            }
            if !is_plain_file_name(&toolchain.compile.source_name) {
                return Err(ConfigError::Invalid(format!(
                    "toolchain '{id}' has invalid source_name '{}'",
                    toolchain.compile.source_name
                )));
            }
            if let Some(ref output) = toolchain.compile.output_name
                && !is_plain_file_name(output)
            {
                return Err(ConfigError::Invalid(format!(
                    "toolchain '{id}' has invalid output_name '{output}'"
                )));
            }
            if !toolchain.compile.time_limit.is_finite() || toolchain.compile.time_limit <= 0.0 {
                return Err(ConfigError::Invalid(format!(
                    "toolchain '{id}' has non-positive compile time_limit"
                )));
            }
        }

        Ok(())
    }
}

/// A bare file name that stays inside the scratch directory
fn is_plain_file_name(name: &str) -> bool {
    !name.is_empty() && !name.contains('/') && !name.contains("..")
}

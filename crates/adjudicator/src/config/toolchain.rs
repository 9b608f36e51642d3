use std::collections::HashMap;
use std::time::Duration;

use serde::{Deserialize, Deserializer, Serialize, de};

use crate::config::ConfigError;
use crate::types::seconds_to_duration;

const INVALID_FILE_EXT_CHARS: [char; 2] = ['/', '.'];

/// How submissions of one language are built and started
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Toolchain {
    /// Human-readable name (e.g., "C++ 17 (GCC)")
    pub name: String,

    /// File extension
    pub extension: FileExtension,

    /// Build step
    pub compile: CompileConfig,

    /// Run step
    pub run: RunConfig,
}

impl Toolchain {
    /// Name of the artifact produced by the build step.
    ///
    /// Toolchains whose build step only checks the source (`sh -n`,
    /// `python3 -m py_compile`) run the source file itself.
    pub fn artifact_name(&self) -> &str {
        self.compile
            .output_name
            .as_deref()
            .unwrap_or(&self.compile.source_name)
    }

    /// Expand placeholders in the given command
    pub fn expand_command(command: &[String], source: &str, binary: &str) -> Vec<String> {
        command
            .iter()
            .map(|arg| {
                arg.replace("{source}", source)
                    .replace("{output}", binary)
                    .replace("{binary}", binary)
            })
            .collect()
    }

    /// Compile command with placeholders filled in
    pub fn compile_command(&self) -> Vec<String> {
        Self::expand_command(
            &self.compile.command,
            &self.compile.source_name,
            self.artifact_name(),
        )
    }

    /// Run command for the artifact named `binary`, placeholders filled in
    pub fn run_command(&self, binary: &str) -> Vec<String> {
        Self::expand_command(&self.run.command, &self.compile.source_name, binary)
    }
}

/// File extension without dot (e.g., "cpp")
#[derive(Debug, Clone, Serialize)]
pub struct FileExtension(String);

impl FileExtension {
    pub fn new(extension: &str) -> Result<Self, ConfigError> {
        let contains_invalid = extension
            .chars()
            .any(|c| INVALID_FILE_EXT_CHARS.contains(&c));
        if contains_invalid {
            return Err(ConfigError::InvalidFileExtChars);
        }
        Ok(Self(extension.to_owned()))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<'de> Deserialize<'de> for FileExtension {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        FileExtension::new(&s).map_err(|_| {
            de::Error::invalid_value(
                de::Unexpected::Str(&s),
                &"a file extension without '/' or '.' characters",
            )
        })
    }
}

impl std::fmt::Display for FileExtension {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Configuration for the build step
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompileConfig {
    /// Command and arguments with placeholders
    /// Placeholders: {source}, {output}, {binary}
    pub command: Vec<String>,

    /// Source file name in the scratch directory (e.g., "main.cpp")
    pub source_name: String,

    /// Artifact name (e.g., "main"); the source itself when absent
    #[serde(default)]
    pub output_name: Option<String>,

    /// Environment variables to set during compilation
    #[serde(default)]
    pub env: HashMap<String, String>,

    /// Wall clock limit for the compiler in seconds
    #[serde(default = "default_compile_time_limit")]
    pub time_limit: f64,
}

impl CompileConfig {
    pub fn time_limit_duration(&self) -> Duration {
        seconds_to_duration(self.time_limit)
    }
}

/// Default PATH for submitted programs
pub const DEFAULT_SANDBOX_PATH: &str = "/usr/bin:/bin";

/// Configuration for the run step
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    /// Command and arguments with placeholders
    /// Placeholders: {source}, {binary}
    pub command: Vec<String>,

    /// Environment variables to set
    #[serde(default)]
    pub env: HashMap<String, String>,

    /// PATH environment variable for the program
    ///
    /// Defaults to "/usr/bin:/bin" if not specified.
    #[serde(default = "default_sandbox_path")]
    pub path: String,
}

fn default_sandbox_path() -> String {
    DEFAULT_SANDBOX_PATH.to_owned()
}

fn default_compile_time_limit() -> f64 {
    30.0
}

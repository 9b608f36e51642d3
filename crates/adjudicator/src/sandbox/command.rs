//! Command builder for sandboxed children
//!
//! Collects program, arguments, environment and working directory, and turns
//! them into a `tokio::process::Command` with all three standard streams piped.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use tokio::process::Command;

/// Builder for a sandboxed child process
#[derive(Debug, Clone)]
pub struct SandboxCommand {
    /// Program followed by its arguments
    command: Vec<String>,
    env: BTreeMap<String, String>,
    /// Keep the parent's environment instead of starting empty
    full_env: bool,
    working_dir: Option<PathBuf>,
}

impl SandboxCommand {
    /// Create a new builder for the given argv
    pub fn new(command: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            command: command.into_iter().map(Into::into).collect(),
            env: BTreeMap::new(),
            full_env: false,
            working_dir: None,
        }
    }

    /// Set an environment variable
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    /// Set several environment variables
    pub fn envs<K, V>(mut self, vars: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.env
            .extend(vars.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    /// Inherit the full environment of the current process
    pub fn full_env(mut self, enable: bool) -> Self {
        self.full_env = enable;
        self
    }

    /// Set the working directory
    pub fn working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    /// Program and arguments
    pub fn argv(&self) -> &[String] {
        &self.command
    }

    /// Explicitly set environment variables
    pub fn env_vars(&self) -> &BTreeMap<String, String> {
        &self.env
    }

    pub fn working_dir_path(&self) -> Option<&Path> {
        self.working_dir.as_deref()
    }

    /// Build the tokio command
    ///
    /// On Unix the child becomes leader of a new process group so the whole
    /// tree can be signalled at once.
    pub(crate) fn build(&self) -> Option<Command> {
        let (program, args) = self.command.split_first()?;

        let mut cmd = Command::new(program);
        cmd.args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        if !self.full_env {
            cmd.env_clear();
        }
        cmd.envs(&self.env);

        if let Some(ref dir) = self.working_dir {
            cmd.current_dir(dir);
        }

        #[cfg(unix)]
        cmd.process_group(0);

        Some(cmd)
    }
}

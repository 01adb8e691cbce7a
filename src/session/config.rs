//! Session configuration structures and validation.
//!
//! This module defines [`SessionConfig`] for the SSH transport settings,
//! along with associated error types. Configuration is loaded via
//! `ortho-config` which merges defaults, configuration files, and
//! environment variables.

use camino::Utf8PathBuf;
use ortho_config::OrthoConfig;
use serde::Deserialize;
use thiserror::Error;

/// Default remote user for provisioning sessions.
pub const DEFAULT_SSH_USER: &str = "root";

/// Default SSH port on the managed host.
pub const DEFAULT_SSH_PORT: u16 = 22;

/// SSH transport settings for one managed host, loaded via `ortho-config`.
#[derive(Clone, Debug, Deserialize, OrthoConfig, PartialEq, Eq)]
#[ortho_config(
    prefix = "STEWARD",
    discovery(
        app_name = "steward",
        env_var = "STEWARD_CONFIG_PATH",
        config_file_name = "steward.toml",
        dotfile_name = ".steward.toml",
        project_file_name = "steward.toml"
    )
)]
#[expect(
    clippy::struct_excessive_bools,
    reason = "configuration struct with user-facing toggle settings that are naturally expressed as booleans"
)]
pub struct SessionConfig {
    /// Hostname or address of the managed host. Required.
    pub host: String,
    /// Remote user to connect as.
    #[ortho_config(default = DEFAULT_SSH_USER.to_owned())]
    pub ssh_user: String,
    /// SSH port on the managed host.
    #[ortho_config(default = DEFAULT_SSH_PORT)]
    pub ssh_port: u16,
    /// Path to the `ssh` executable.
    #[ortho_config(default = "ssh".to_owned())]
    pub ssh_bin: String,
    /// Path to the `scp` executable, used for file uploads.
    #[ortho_config(default = "scp".to_owned())]
    pub scp_bin: String,
    /// Whether to force batch mode for SSH to avoid password prompts.
    #[ortho_config(default = true)]
    pub ssh_batch_mode: bool,
    /// Whether to enforce host key checking; defaults to disabling to smooth
    /// freshly provisioned hosts.
    #[ortho_config(default = false)]
    pub ssh_strict_host_key_checking: bool,
    /// Known hosts file override; defaults to `/dev/null` for fresh hosts.
    #[ortho_config(default = "/dev/null".to_owned())]
    pub ssh_known_hosts_file: String,
    /// Path to the SSH private key file for remote authentication. Supports
    /// tilde expansion (`~/.ssh/id_ed25519`). Optional; when not provided,
    /// SSH falls back to its default key locations. Validation rejects empty
    /// or whitespace-only values.
    pub ssh_identity_file: Option<String>,
    /// Whether to echo each remote command line to stderr before it runs.
    #[ortho_config(default = false)]
    pub echo_commands: bool,
}

/// Errors raised when loading the session configuration from layered sources.
#[derive(Debug, Error, Eq, PartialEq)]
pub enum SessionConfigLoadError {
    /// Indicates that parsing or merging configuration layers failed.
    #[error("session configuration parsing failed: {0}")]
    Parse(String),
}

impl SessionConfig {
    /// Ensures configuration values are present after trimming whitespace.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::InvalidConfig`] when any required field is
    /// empty.
    pub fn validate(&self) -> Result<(), SessionError> {
        Self::require_value(&self.host, "host")?;
        Self::require_value(&self.ssh_user, "ssh_user")?;
        Self::require_value(&self.ssh_bin, "ssh_bin")?;
        Self::require_value(&self.scp_bin, "scp_bin")?;
        Self::require_optional_value(self.ssh_identity_file.as_deref(), "ssh_identity_file")?;
        Ok(())
    }

    fn require_optional_value(value: Option<&str>, field: &str) -> Result<(), SessionError> {
        match value {
            None => Ok(()), // Not configured; SSH uses defaults
            Some(v) if !v.trim().is_empty() => Ok(()),
            Some(_) => Err(SessionError::InvalidConfig {
                field: field.to_owned(),
            }),
        }
    }

    /// Loads configuration using defaults, configuration files, and
    /// environment variables, without attempting to parse CLI arguments.
    ///
    /// # Errors
    ///
    /// Returns [`SessionConfigLoadError::Parse`] when merging sources fails.
    pub fn load_without_cli_args() -> Result<Self, SessionConfigLoadError> {
        Self::load_from_iter([std::ffi::OsString::from("steward")])
            .map_err(|err| SessionConfigLoadError::Parse(err.to_string()))
    }

    /// Loads configuration using the default argument iterator.
    ///
    /// # Errors
    ///
    /// Returns [`SessionConfigLoadError::Parse`] when merging sources fails.
    pub fn load_from_sources() -> Result<Self, SessionConfigLoadError> {
        Self::load().map_err(|err| SessionConfigLoadError::Parse(err.to_string()))
    }

    fn require_value(value: &str, field: &str) -> Result<(), SessionError> {
        Self::require_optional_value(Some(value), field)
    }
}

/// Errors surfaced while executing commands on the managed host.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum SessionError {
    /// Raised when configuration is missing required values. The error
    /// message includes guidance on how to provide the value via environment
    /// variable or configuration file.
    #[error("missing {field}: set STEWARD_{env_suffix} or add {field} to steward.toml", env_suffix = field.to_uppercase())]
    InvalidConfig {
        /// Configuration field that failed validation.
        field: String,
    },
    /// Raised when a transport command cannot be spawned locally.
    #[error("failed to spawn {program}: {message}")]
    Spawn {
        /// Command that failed to start.
        program: String,
        /// Operating system error string.
        message: String,
    },
    /// Raised when a checked remote command completes with a non-zero exit
    /// code.
    #[error("remote command `{command}` exited with status {status_text}: {stderr}")]
    CommandFailure {
        /// Remote command line that was attempted.
        command: String,
        /// Exit status as reported by the remote shell.
        status: Option<i32>,
        /// Human readable representation of the exit status.
        status_text: String,
        /// Stderr captured from the remote command.
        stderr: String,
    },
    /// Raised when a local file cannot be staged for upload.
    #[error("cannot upload {path}: {message}")]
    Upload {
        /// Local path that failed to upload.
        path: Utf8PathBuf,
        /// Description of the failure.
        message: String,
    },
}

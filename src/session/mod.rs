//! Remote-execution session for one managed host.
//!
//! Every provisioning helper in this crate operates through a [`Session`],
//! which wraps an SSH client invocation per remote command and hands back the
//! captured exit code and output. Commands come in checked flavours
//! ([`Session::run`], [`Session::sudo`]) that treat a non-zero remote exit as
//! an error, and unchecked flavours ([`Session::run_unchecked`],
//! [`Session::sudo_unchecked`]) that return the output as-is so call sites
//! can probe for state ("is this mounted", "does psql exist") without
//! aborting.

use std::ffi::OsString;
use std::io::{self, Write};

use camino::Utf8Path;
use shell_escape::unix::escape;

mod config;
mod types;
mod util;

pub use config::{
    DEFAULT_SSH_PORT, DEFAULT_SSH_USER, SessionConfig, SessionConfigLoadError, SessionError,
};
pub use types::{CommandOutput, CommandRunner, ProcessCommandRunner, RemoteOutput};
pub use util::expand_tilde;

/// Executes commands on one remote host over SSH.
#[derive(Clone, Debug)]
pub struct Session<R: CommandRunner> {
    config: SessionConfig,
    runner: R,
}

impl Session<ProcessCommandRunner> {
    /// Convenience constructor that wires the real process runner.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::InvalidConfig`] when validation fails.
    pub fn with_process_runner(config: SessionConfig) -> Result<Self, SessionError> {
        Self::new(config, ProcessCommandRunner)
    }
}

impl<R: CommandRunner> Session<R> {
    /// Creates a new session using the provided runner and configuration.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::InvalidConfig`] when configuration validation
    /// fails.
    pub fn new(config: SessionConfig, runner: R) -> Result<Self, SessionError> {
        config.validate()?;
        Ok(Self { config, runner })
    }

    /// Returns a reference to the underlying configuration.
    #[must_use]
    pub const fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Executes `command` on the remote host as the SSH user.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::CommandFailure`] when the remote command exits
    /// non-zero, or [`SessionError::Spawn`] when the SSH client cannot be
    /// started.
    pub fn run(&self, command: &str) -> Result<RemoteOutput, SessionError> {
        let output = self.execute_ssh(command)?;
        Self::ensure_success(command, output)
    }

    /// Executes `command` on the remote host, returning the output whatever
    /// the remote exit code was.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Spawn`] when the SSH client cannot be started.
    /// A non-zero remote exit is not an error here; inspect
    /// [`RemoteOutput::is_success`].
    pub fn run_unchecked(&self, command: &str) -> Result<RemoteOutput, SessionError> {
        self.execute_ssh(command)
    }

    /// Executes `command` on the remote host with elevated privileges.
    ///
    /// The whole command line runs under `sudo sh -c`, so pipelines and
    /// redirections apply with privileges intact.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::CommandFailure`] when the remote command exits
    /// non-zero, or [`SessionError::Spawn`] when the SSH client cannot be
    /// started.
    pub fn sudo(&self, command: &str) -> Result<RemoteOutput, SessionError> {
        let wrapped = Self::wrap_sudo(command);
        let output = self.execute_ssh(&wrapped)?;
        Self::ensure_success(command, output)
    }

    /// Executes `command` with elevated privileges, returning the output
    /// whatever the remote exit code was.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Spawn`] when the SSH client cannot be started.
    pub fn sudo_unchecked(&self, command: &str) -> Result<RemoteOutput, SessionError> {
        let wrapped = Self::wrap_sudo(command);
        self.execute_ssh(&wrapped)
    }

    /// Probes whether `path` exists on the remote host.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Spawn`] when the SSH client cannot be started.
    pub fn exists(&self, path: &str) -> Result<bool, SessionError> {
        let quoted = escape(path.into());
        let output = self.run_unchecked(&format!("test -e {quoted}"))?;
        Ok(output.is_success())
    }

    /// Uploads a local file to `remote` via `scp`.
    ///
    /// With `use_sudo`, the file is staged under `/tmp` as the SSH user and
    /// moved into place with elevated privileges, so uploads can land in
    /// root-owned directories.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Upload`] when the local path has no file name,
    /// [`SessionError::CommandFailure`] when the transfer or the privileged
    /// move fails, or [`SessionError::Spawn`] when a transport command cannot
    /// be started.
    pub fn put(&self, local: &Utf8Path, remote: &str, use_sudo: bool) -> Result<(), SessionError> {
        if use_sudo {
            let file_name = local.file_name().ok_or_else(|| SessionError::Upload {
                path: local.to_owned(),
                message: String::from("local path has no file name component"),
            })?;
            let staging = format!("/tmp/{file_name}");
            self.scp(local, &staging)?;
            self.sudo(&format!(
                "mv {} {}",
                escape(staging.as_str().into()),
                escape(remote.into())
            ))?;
        } else {
            self.scp(local, remote)?;
        }
        Ok(())
    }

    fn scp(&self, local: &Utf8Path, remote: &str) -> Result<(), SessionError> {
        let args = self.build_scp_args(local, remote);
        self.echo(&format!("scp {local} -> {remote}"));
        let output = self.runner.run(&self.config.scp_bin, &args)?;
        if output.is_success() {
            return Ok(());
        }

        let command = format!("scp {local} {remote}");
        Err(Self::failure(&command, output.code, output.stderr))
    }

    fn execute_ssh(&self, command: &str) -> Result<RemoteOutput, SessionError> {
        self.echo(command);
        let args = self.build_ssh_args(command);
        let output = self.runner.run(&self.config.ssh_bin, &args)?;

        Ok(RemoteOutput {
            exit_code: output.code,
            stdout: output.stdout,
            stderr: output.stderr,
        })
    }

    fn ensure_success(command: &str, output: RemoteOutput) -> Result<RemoteOutput, SessionError> {
        if output.is_success() {
            return Ok(output);
        }
        Err(Self::failure(command, output.exit_code, output.stderr))
    }

    fn failure(command: &str, status: Option<i32>, stderr: String) -> SessionError {
        let status_text = status.map_or_else(|| String::from("unknown"), |code| code.to_string());
        SessionError::CommandFailure {
            command: command.to_owned(),
            status,
            status_text,
            stderr,
        }
    }

    fn wrap_sudo(command: &str) -> String {
        format!("sudo sh -c {}", escape(command.into()))
    }

    fn echo(&self, command: &str) {
        if self.config.echo_commands {
            writeln!(io::stderr(), "[{}] {command}", self.config.host).ok();
        }
    }

    fn build_ssh_args(&self, command: &str) -> Vec<OsString> {
        let mut args = vec![
            OsString::from("-p"),
            OsString::from(self.config.ssh_port.to_string()),
        ];
        args.extend(self.common_options());
        args.push(OsString::from(format!(
            "{}@{}",
            self.config.ssh_user, self.config.host
        )));
        args.push(OsString::from(command));
        args
    }

    fn build_scp_args(&self, local: &Utf8Path, remote: &str) -> Vec<OsString> {
        let mut args = vec![
            OsString::from("-P"),
            OsString::from(self.config.ssh_port.to_string()),
        ];
        args.extend(self.common_options());
        args.push(OsString::from(local.as_str()));
        args.push(OsString::from(format!(
            "{}@{}:{}",
            self.config.ssh_user, self.config.host, remote
        )));
        args
    }

    fn common_options(&self) -> Vec<OsString> {
        let mut args = Vec::new();

        if let Some(ref identity_file) = self.config.ssh_identity_file {
            let expanded = expand_tilde(identity_file);
            args.push(OsString::from("-i"));
            args.push(OsString::from(expanded));
        }

        if self.config.ssh_batch_mode {
            args.push(OsString::from("-o"));
            args.push(OsString::from("BatchMode=yes"));
        }

        if !self.config.ssh_strict_host_key_checking {
            args.push(OsString::from("-o"));
            args.push(OsString::from("StrictHostKeyChecking=no"));
        }

        if !self.config.ssh_known_hosts_file.trim().is_empty() {
            args.push(OsString::from("-o"));
            args.push(OsString::from(format!(
                "UserKnownHostsFile={}",
                self.config.ssh_known_hosts_file
            )));
        }

        args
    }
}

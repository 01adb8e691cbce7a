//! Test support utilities shared across unit and integration tests.

use std::ffi::OsString;

/// Scripted command runner that returns pre-seeded outputs in FIFO order.
///
/// Used to drive deterministic remote command outcomes without spawning SSH
/// processes.
#[derive(Clone, Debug, Default)]
pub struct ScriptedRunner {
    responses:
        std::rc::Rc<std::cell::RefCell<std::collections::VecDeque<crate::session::CommandOutput>>>,
    invocations: std::rc::Rc<std::cell::RefCell<Vec<CommandInvocation>>>,
}

/// Records a single invocation made through [`ScriptedRunner`].
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CommandInvocation {
    /// Program name as passed to the runner.
    pub program: String,
    /// Arguments passed to the program.
    pub args: Vec<OsString>,
}

impl CommandInvocation {
    /// Returns a shell-like command string for assertions.
    #[must_use]
    pub fn command_string(&self) -> String {
        let mut parts = Vec::with_capacity(self.args.len() + 1);
        parts.push(self.program.clone());
        parts.extend(
            self.args
                .iter()
                .map(|arg| arg.to_string_lossy().into_owned()),
        );
        parts.join(" ")
    }
}

impl ScriptedRunner {
    /// Creates a new runner with no queued responses.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a snapshot of all invocations recorded so far.
    #[must_use]
    pub fn invocations(&self) -> Vec<CommandInvocation> {
        self.invocations.borrow().clone()
    }

    /// Returns the recorded invocations rendered as command strings.
    #[must_use]
    pub fn command_strings(&self) -> Vec<String> {
        self.invocations
            .borrow()
            .iter()
            .map(CommandInvocation::command_string)
            .collect()
    }

    /// Pushes a successful exit status.
    pub fn push_success(&self) {
        self.push_exit_code(0);
    }

    /// Pushes `count` successful exit statuses.
    pub fn push_successes(&self, count: usize) {
        for _ in 0..count {
            self.push_success();
        }
    }

    /// Pushes a specific exit code.
    pub fn push_exit_code(&self, code: i32) {
        self.responses
            .borrow_mut()
            .push_back(crate::session::CommandOutput {
                code: Some(code),
                stdout: String::new(),
                stderr: String::new(),
            });
    }

    /// Pushes a failing exit code with stderr text.
    pub fn push_failure(&self, code: i32) {
        self.responses
            .borrow_mut()
            .push_back(crate::session::CommandOutput {
                code: Some(code),
                stdout: String::new(),
                stderr: String::from("simulated failure"),
            });
    }

    /// Pushes a response with no exit code to simulate abnormal termination.
    pub fn push_missing_exit_code(&self) {
        self.responses
            .borrow_mut()
            .push_back(crate::session::CommandOutput {
                code: None,
                stdout: String::new(),
                stderr: String::new(),
            });
    }

    /// Pushes an explicit command output response.
    pub fn push_output(
        &self,
        code: Option<i32>,
        stdout: impl Into<String>,
        stderr: impl Into<String>,
    ) {
        self.responses
            .borrow_mut()
            .push_back(crate::session::CommandOutput {
                code,
                stdout: stdout.into(),
                stderr: stderr.into(),
            });
    }
}

impl crate::session::CommandRunner for ScriptedRunner {
    fn run(
        &self,
        program: &str,
        args: &[OsString],
    ) -> Result<crate::session::CommandOutput, crate::session::SessionError> {
        self.invocations.borrow_mut().push(CommandInvocation {
            program: program.to_owned(),
            args: args.to_vec(),
        });
        self.responses
            .borrow_mut()
            .pop_front()
            .ok_or_else(|| crate::session::SessionError::Spawn {
                program: program.to_owned(),
                message: String::from("no scripted response available"),
            })
    }
}

/// Builds a session configuration suitable for scripted tests.
#[must_use]
pub fn test_session_config() -> crate::session::SessionConfig {
    crate::session::SessionConfig {
        host: String::from("db1.example.net"),
        ssh_user: String::from("ubuntu"),
        ssh_port: 22,
        ssh_bin: String::from("ssh"),
        scp_bin: String::from("scp"),
        ssh_batch_mode: true,
        ssh_strict_host_key_checking: false,
        ssh_known_hosts_file: String::from("/dev/null"),
        ssh_identity_file: None,
        echo_commands: false,
    }
}

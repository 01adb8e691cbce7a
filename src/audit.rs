//! Audit trail for host mutations.
//!
//! Managed hosts keep `/etc` under git. After any state-changing operation
//! the provisioning helpers record what happened by committing the directory
//! with a human-readable message. The commit itself is best-effort: a
//! mutation that left `/etc` untouched produces "nothing to commit", which is
//! a normal outcome, so only transport failures surface.

use shell_escape::unix::escape;

use crate::session::{CommandRunner, Session, SessionError};

/// Directory on the managed host that is kept under version control.
pub const AUDIT_DIR: &str = "/etc";

/// Records `message` against the current state of the audited directory.
///
/// # Errors
///
/// Returns [`SessionError::Spawn`] when the SSH client cannot be started.
/// Git failures (including an empty commit) are tolerated.
pub fn commit<R: CommandRunner>(
    session: &Session<R>,
    message: &str,
) -> Result<(), SessionError> {
    session.sudo_unchecked(&format!("git -C {AUDIT_DIR} add -A"))?;
    session.sudo_unchecked(&format!(
        "git -C {AUDIT_DIR} commit -m {}",
        escape(message.into())
    ))?;
    Ok(())
}

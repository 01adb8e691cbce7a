//! Core library for the steward provisioning tool.
//!
//! The crate provisions a single managed host over SSH: installing
//! PostgreSQL, creating and configuring clusters, managing roles and
//! databases, taking compressed dumps, and formatting and mounting block
//! devices. Every helper operates through an explicit [`Session`] so tests
//! can substitute a scripted command runner for the SSH transport.

pub mod audit;
pub mod mount;
pub mod postgres;
pub mod session;
pub mod test_support;

pub use mount::MountError;
pub use postgres::ProvisionError;
pub use session::{
    CommandOutput, CommandRunner, ProcessCommandRunner, RemoteOutput, Session, SessionConfig,
    SessionConfigLoadError, SessionError,
};

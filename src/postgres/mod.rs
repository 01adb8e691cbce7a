//! PostgreSQL provisioning on the managed host.
//!
//! The lifecycle is a sequence over a (version, cluster) pair: install the
//! packages for a version, create a cluster (tearing down any existing one
//! of the same name first), push access rules, and adjust the main
//! configuration file. Version arguments are optional throughout; when
//! omitted, the helpers resolve a version from the host (installed psql
//! first where that makes sense, otherwise the package index).

use std::io::Write;

use camino::{Utf8Path, Utf8PathBuf};
use thiserror::Error;

use crate::audit;
use crate::session::{CommandRunner, Session, SessionError};

pub mod access;
pub mod dump;
pub mod version;

pub use access::{
    RESERVED_SUPERUSER, create_adminpack, create_database, create_user, delete_database,
    delete_user, list_databases, list_users, set_postgres_password,
};
pub use dump::{PG_DUMP_PATH, dump_database, dump_filename};
pub use version::{default_installed_version, latest_version};

/// Default cluster name.
pub const DEFAULT_CLUSTER: &str = "main";

/// Default cluster encoding.
pub const DEFAULT_ENCODING: &str = "UTF-8";

/// Base directory for cluster data directories.
pub const DEFAULT_DATA_DIR: &str = "/var/lib/postgresql";

/// System account the database service runs as.
pub const SERVICE_ACCOUNT: &str = "postgres";

/// Unix socket directory written into the cluster configuration.
pub const SOCKET_DIR: &str = "/var/run/postgresql";

/// Access rules template shipped with the tool and uploaded by
/// [`set_access_rules`].
pub const DEFAULT_ACCESS_RULES: &str = include_str!("../../cfg/postgresql/pg_hba.conf");

/// Errors raised while provisioning PostgreSQL.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum ProvisionError {
    /// Raised when no version was supplied and none could be resolved from
    /// the host.
    #[error("no postgresql version could be resolved on the host")]
    NoVersion,
    /// Raised when an operation targets a role that must not be touched.
    #[error("refusing to drop reserved role '{role}'")]
    ReservedRole {
        /// Role name that was refused.
        role: String,
    },
    /// Raised when a local file cannot be staged for upload.
    #[error("failed to stage upload: {message}")]
    Staging {
        /// Description of the local I/O failure.
        message: String,
    },
    /// Transport or remote command failure.
    #[error(transparent)]
    Session(#[from] SessionError),
}

/// Installs the PostgreSQL packages for a version.
///
/// Installs the server, client, contrib, server-dev, and client-common
/// packages, then records an audit commit. Returns the version that was
/// installed.
///
/// # Errors
///
/// Returns [`ProvisionError::NoVersion`] when no version was supplied and
/// none could be resolved, or [`ProvisionError::Session`] when installation
/// fails remotely.
pub fn install<R: CommandRunner>(
    session: &Session<R>,
    requested: Option<&str>,
) -> Result<String, ProvisionError> {
    let resolved = resolve_or_latest(session, requested)?;
    let packages = [
        format!("postgresql-{resolved}"),
        format!("postgresql-client-{resolved}"),
        format!("postgresql-contrib-{resolved}"),
        format!("postgresql-server-dev-{resolved}"),
        String::from("postgresql-client-common"),
    ]
    .join(" ");
    session.sudo(&format!("apt-get -y install {packages}"))?;
    audit::commit(session, &format!("Installed postgres ({resolved})"))?;
    Ok(resolved)
}

/// Creates the data directory for a cluster version and returns its path.
///
/// # Errors
///
/// Returns [`ProvisionError::NoVersion`] when no version was supplied and
/// none could be resolved, or [`ProvisionError::Session`] when directory
/// creation fails remotely.
pub fn make_data_dir<R: CommandRunner>(
    session: &Session<R>,
    requested: Option<&str>,
    base: &Utf8Path,
) -> Result<Utf8PathBuf, ProvisionError> {
    let resolved = resolve_or_latest(session, requested)?;
    let data_dir = base.join(resolved);
    session.sudo(&format!("mkdir -p {data_dir}"))?;
    Ok(data_dir)
}

/// Stops and drops a cluster if it exists, then records an audit commit.
///
/// # Errors
///
/// Returns [`ProvisionError::Session`] when the SSH client cannot be
/// started. A cluster that does not exist is the normal first-run case, so
/// the drop itself is unchecked.
pub fn remove_cluster<R: CommandRunner>(
    session: &Session<R>,
    pg_version: &str,
    cluster: &str,
) -> Result<(), ProvisionError> {
    session.sudo_unchecked(&format!("pg_dropcluster --stop {pg_version} {cluster}"))?;
    audit::commit(
        session,
        &format!("Removed postgres cluster ({pg_version} {cluster})"),
    )?;
    Ok(())
}

/// Creates a cluster, replacing any existing cluster of the same name.
///
/// Removes the old cluster, creates and chowns the data directory, runs the
/// cluster-creation tool with the requested encoding, and starts the
/// service. Returns the version the cluster was created for.
///
/// # Errors
///
/// Returns [`ProvisionError::NoVersion`] when no version was supplied and
/// none could be resolved, or [`ProvisionError::Session`] when a step fails
/// remotely.
pub fn create_cluster<R: CommandRunner>(
    session: &Session<R>,
    requested: Option<&str>,
    cluster: &str,
    encoding: &str,
    base: &Utf8Path,
) -> Result<String, ProvisionError> {
    let resolved = resolve_installed_or_latest(session, requested)?;

    remove_cluster(session, &resolved, cluster)?;

    let data_dir = make_data_dir(session, Some(&resolved), base)?;
    session.sudo(&format!("chown -R {SERVICE_ACCOUNT} {data_dir}"))?;
    session.sudo(&format!(
        "pg_createcluster --start -e {encoding} {resolved} {cluster} -d {data_dir}"
    ))?;
    session.sudo("service postgresql start")?;
    audit::commit(
        session,
        &format!("Created new postgres cluster ({resolved} {cluster})"),
    )?;
    Ok(resolved)
}

/// Uploads the packaged access rules over the cluster's `pg_hba.conf` and
/// restarts the service.
///
/// # Errors
///
/// Returns [`ProvisionError::NoVersion`] when no version was supplied and
/// none is installed, [`ProvisionError::Staging`] when the template cannot
/// be staged locally, or [`ProvisionError::Session`] when upload or
/// restart fails remotely.
pub fn set_access_rules<R: CommandRunner>(
    session: &Session<R>,
    requested: Option<&str>,
    cluster: &str,
) -> Result<(), ProvisionError> {
    set_access_rules_from(session, requested, cluster, DEFAULT_ACCESS_RULES)
}

/// Uploads the given access rules over the cluster's `pg_hba.conf` and
/// restarts the service.
///
/// # Errors
///
/// See [`set_access_rules`].
pub fn set_access_rules_from<R: CommandRunner>(
    session: &Session<R>,
    requested: Option<&str>,
    cluster: &str,
    rules: &str,
) -> Result<(), ProvisionError> {
    let resolved = resolve_installed(session, requested)?;
    let remote = format!("/etc/postgresql/{resolved}/{cluster}/pg_hba.conf");

    let staged = stage_rules(rules)?;
    let local = Utf8Path::from_path(staged.path()).ok_or_else(|| ProvisionError::Staging {
        message: String::from("staging path is not valid UTF-8"),
    })?;

    session.sudo(&format!("rm -rf {remote}"))?;
    session.put(local, &remote, true)?;
    session.sudo(&format!("chown postgres:postgres {remote}"))?;
    session.sudo(&format!("chmod 644 {remote}"))?;
    session.sudo("service postgresql start")?;
    audit::commit(
        session,
        &format!("Set default postgres access for cluster ({resolved} {cluster})"),
    )?;
    Ok(())
}

/// Rewrites the listen address and unix-socket directory in the cluster's
/// `postgresql.conf`, optionally restarting the service.
///
/// # Errors
///
/// Returns [`ProvisionError::NoVersion`] when no version was supplied and
/// none is installed, or [`ProvisionError::Session`] when an edit fails
/// remotely.
pub fn configure<R: CommandRunner>(
    session: &Session<R>,
    requested: Option<&str>,
    cluster: &str,
    interface: &str,
    restart: bool,
) -> Result<(), ProvisionError> {
    let resolved = resolve_installed(session, requested)?;
    let conf = format!("/etc/postgresql/{resolved}/{cluster}/postgresql.conf");

    session.sudo(&format!(
        r#"sed -i "s/#listen_addresses\s\+=\s\+'localhost'/listen_addresses = '{interface}'/g" {conf}"#
    ))?;
    session.sudo(&format!(
        r"sed -i '/\s*unix_socket_directory\s*.*/d' {conf}"
    ))?;
    session.sudo(&format!(
        r#"sed -i "1iunix_socket_directory = '{SOCKET_DIR}'" {conf}"#
    ))?;
    audit::commit(
        session,
        &format!("Configured postgres cluster ({resolved} {cluster})"),
    )?;
    if restart {
        session.sudo("service postgresql start")?;
    }
    Ok(())
}

/// Explicit version, else the newest the package index offers.
fn resolve_or_latest<R: CommandRunner>(
    session: &Session<R>,
    requested: Option<&str>,
) -> Result<String, ProvisionError> {
    if let Some(explicit) = non_empty(requested) {
        return Ok(explicit.to_owned());
    }
    version::latest_version(session)?.ok_or(ProvisionError::NoVersion)
}

/// Explicit version, else the installed psql version, else the package
/// index.
fn resolve_installed_or_latest<R: CommandRunner>(
    session: &Session<R>,
    requested: Option<&str>,
) -> Result<String, ProvisionError> {
    if let Some(explicit) = non_empty(requested) {
        return Ok(explicit.to_owned());
    }
    if let Some(installed) = version::default_installed_version(session)? {
        return Ok(installed);
    }
    version::latest_version(session)?.ok_or(ProvisionError::NoVersion)
}

/// Explicit version, else the installed psql version.
fn resolve_installed<R: CommandRunner>(
    session: &Session<R>,
    requested: Option<&str>,
) -> Result<String, ProvisionError> {
    if let Some(explicit) = non_empty(requested) {
        return Ok(explicit.to_owned());
    }
    version::default_installed_version(session)?.ok_or(ProvisionError::NoVersion)
}

fn non_empty(requested: Option<&str>) -> Option<&str> {
    requested.filter(|value| !value.trim().is_empty())
}

fn stage_rules(rules: &str) -> Result<tempfile::NamedTempFile, ProvisionError> {
    let staging = |message: String| ProvisionError::Staging { message };
    let mut staged = tempfile::Builder::new()
        .prefix("pg_hba-")
        .suffix(".conf")
        .tempfile()
        .map_err(|err| staging(err.to_string()))?;
    staged
        .write_all(rules.as_bytes())
        .map_err(|err| staging(err.to_string()))?;
    staged.flush().map_err(|err| staging(err.to_string()))?;
    Ok(staged)
}

#[cfg(test)]
mod tests;

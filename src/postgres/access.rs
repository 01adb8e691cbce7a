//! Role and database management.
//!
//! Each operation is a single privileged statement piped into the database
//! CLI on the managed host. There are no retries; a SQL error surfaces as a
//! non-zero remote exit.

use shell_escape::unix::escape;

use crate::postgres::ProvisionError;
use crate::session::{CommandRunner, Session};

/// Superuser role that must never be dropped.
pub const RESERVED_SUPERUSER: &str = "postgres";

/// Installs the adminpack extension into the default database.
///
/// # Errors
///
/// Returns [`ProvisionError::Session`] when the statement fails remotely.
pub fn create_adminpack<R: CommandRunner>(session: &Session<R>) -> Result<(), ProvisionError> {
    psql_statement(session, "CREATE EXTENSION adminpack;")
}

/// Changes the password of the `postgres` superuser.
///
/// # Errors
///
/// Returns [`ProvisionError::Session`] when the statement fails remotely.
pub fn set_postgres_password<R: CommandRunner>(
    session: &Session<R>,
    password: &str,
) -> Result<(), ProvisionError> {
    psql_statement(
        session,
        &format!("ALTER USER postgres WITH ENCRYPTED PASSWORD '{password}';"),
    )
}

/// Creates a login role with an encrypted password.
///
/// # Errors
///
/// Returns [`ProvisionError::Session`] when the statement fails remotely.
pub fn create_user<R: CommandRunner>(
    session: &Session<R>,
    username: &str,
    password: &str,
) -> Result<(), ProvisionError> {
    psql_statement(
        session,
        &format!("CREATE ROLE {username} WITH LOGIN ENCRYPTED PASSWORD '{password}';"),
    )
}

/// Drops a role.
///
/// # Errors
///
/// Returns [`ProvisionError::ReservedRole`] for the `postgres` superuser
/// without issuing any remote command, or [`ProvisionError::Session`] when
/// the statement fails remotely.
pub fn delete_user<R: CommandRunner>(
    session: &Session<R>,
    username: &str,
) -> Result<(), ProvisionError> {
    if username == RESERVED_SUPERUSER {
        return Err(ProvisionError::ReservedRole {
            role: username.to_owned(),
        });
    }
    psql_statement(session, &format!("DROP ROLE {username};"))
}

/// Lists all roles known to the server.
///
/// # Errors
///
/// Returns [`ProvisionError::Session`] when the query fails remotely.
pub fn list_users<R: CommandRunner>(session: &Session<R>) -> Result<String, ProvisionError> {
    let output = session.sudo(r#"sudo -u postgres psql -d template1 -c "SELECT * from pg_user;""#)?;
    Ok(output.stdout)
}

/// Lists all databases on the server.
///
/// # Errors
///
/// Returns [`ProvisionError::Session`] when the query fails remotely.
pub fn list_databases<R: CommandRunner>(session: &Session<R>) -> Result<String, ProvisionError> {
    let output = session.sudo("sudo -u postgres psql -l")?;
    Ok(output.stdout)
}

/// Creates a database owned by an existing role, optionally from the GIS
/// template.
///
/// # Errors
///
/// Returns [`ProvisionError::Session`] when `createdb` fails remotely.
pub fn create_database<R: CommandRunner>(
    session: &Session<R>,
    dbname: &str,
    owner: &str,
    gis: bool,
) -> Result<(), ProvisionError> {
    let template = if gis { "-T template_postgis " } else { "" };
    session.sudo(&format!(
        "sudo -u postgres createdb {template}-O {owner} {dbname}"
    ))?;
    Ok(())
}

/// Drops a database.
///
/// # Errors
///
/// Returns [`ProvisionError::Session`] when the statement fails remotely.
pub fn delete_database<R: CommandRunner>(
    session: &Session<R>,
    dbname: &str,
) -> Result<(), ProvisionError> {
    psql_statement(session, &format!("DROP DATABASE {dbname};"))
}

fn psql_statement<R: CommandRunner>(
    session: &Session<R>,
    sql: &str,
) -> Result<(), ProvisionError> {
    session.sudo(&format!(
        "echo {} | sudo -u postgres psql",
        escape(sql.into())
    ))?;
    Ok(())
}

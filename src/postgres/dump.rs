//! Logical database backups.

use camino::{Utf8Path, Utf8PathBuf};
use chrono::{Datelike, Local, NaiveDateTime, Timelike};

use crate::postgres::ProvisionError;
use crate::session::{CommandRunner, Session};

/// Preferred location of the dump binary on the managed host.
pub const PG_DUMP_PATH: &str = "/usr/bin/pg_dump";

/// Builds the default dump file name for a database at a point in time.
///
/// Field order is year, month, day, hour, second; the name format carries no
/// minute field.
#[must_use]
pub fn dump_filename(db_name: &str, now: &NaiveDateTime) -> String {
    format!(
        "{db_name}_{}_{}_{}_{}_{}.psql.gz",
        now.year(),
        now.month(),
        now.day(),
        now.hour(),
        now.second()
    )
}

/// Dumps a database into `dump_dir`, compressed with gzip.
///
/// The directory is created when missing, and the file name defaults to a
/// timestamped [`dump_filename`]. When no dump binary can be located on the
/// host — neither at [`PG_DUMP_PATH`] nor via `which` — the dump is skipped
/// and `Ok(None)` is returned.
///
/// # Errors
///
/// Returns [`ProvisionError::Session`] when directory creation or the dump
/// pipeline fails remotely.
pub fn dump_database<R: CommandRunner>(
    session: &Session<R>,
    dump_dir: &Utf8Path,
    db_name: &str,
    dump_name: Option<&str>,
) -> Result<Option<Utf8PathBuf>, ProvisionError> {
    if !session.exists(dump_dir.as_str())? {
        session.sudo(&format!("mkdir -p {dump_dir}"))?;
    }

    let name = dump_name.map_or_else(
        || dump_filename(db_name, &Local::now().naive_local()),
        ToOwned::to_owned,
    );
    let destination = dump_dir.join(name);

    let Some(pg_dump) = locate_pg_dump(session)? else {
        return Ok(None);
    };

    // The pipeline dumps the postgres user's default database; the requested
    // database name shapes the destination file only.
    session.sudo(&format!(
        "sudo -u postgres {pg_dump} -h localhost | gzip > {destination}"
    ))?;
    Ok(Some(destination))
}

fn locate_pg_dump<R: CommandRunner>(
    session: &Session<R>,
) -> Result<Option<String>, ProvisionError> {
    if session.exists(PG_DUMP_PATH)? {
        return Ok(Some(PG_DUMP_PATH.to_owned()));
    }

    let lookup = session.run_unchecked("which pg_dump")?;
    let candidate = lookup.stdout.trim().to_owned();
    if candidate.is_empty() || !session.exists(&candidate)? {
        return Ok(None);
    }
    Ok(Some(candidate))
}

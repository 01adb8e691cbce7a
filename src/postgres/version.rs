//! PostgreSQL version resolution from remote tool output.
//!
//! Both probes are best-effort: command failures and unparseable output
//! degrade to `None`, and callers fall back to the next resolution strategy.

use std::sync::LazyLock;

use regex::Regex;

use crate::session::{CommandRunner, Session, SessionError};

#[expect(clippy::expect_used, reason = "the pattern is a valid literal")]
static CLIENT_PACKAGE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"postgresql-client-([0-9.]+)\s-").expect("literal pattern"));

#[expect(clippy::expect_used, reason = "the pattern is a valid literal")]
static PSQL_BANNER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(.*)\s([0-9.]+)").expect("literal pattern"));

/// Resolves the newest PostgreSQL version offered by the package index.
///
/// Runs `apt-cache search postgresql-client` and picks from the
/// `postgresql-client-<version>` package names.
///
/// # Errors
///
/// Returns [`SessionError::Spawn`] when the SSH client cannot be started. A
/// failed or empty search degrades to `Ok(None)`.
pub fn latest_version<R: CommandRunner>(
    session: &Session<R>,
) -> Result<Option<String>, SessionError> {
    let output = session.run_unchecked("apt-cache search postgresql-client")?;
    Ok(parse_latest(&output.stdout))
}

/// Resolves the version of the psql binary installed on the host.
///
/// # Errors
///
/// Returns [`SessionError::Spawn`] when the SSH client cannot be started. An
/// absent binary or unexpected banner degrades to `Ok(None)`.
pub fn default_installed_version<R: CommandRunner>(
    session: &Session<R>,
) -> Result<Option<String>, SessionError> {
    let output = session.run_unchecked("psql --version | head -1")?;
    Ok(parse_installed(&output.stdout))
}

/// Picks a version out of `apt-cache search postgresql-client` output.
///
/// The sort key is the version's second dot-segment, ascending, and the
/// lowest wins. That key predates semantic ordering and is kept as-is so the
/// selection matches what existing hosts were provisioned with.
pub(crate) fn parse_latest(listing: &str) -> Option<String> {
    let mut versions: Vec<String> = listing
        .lines()
        .filter_map(|line| {
            let lower = line.to_lowercase();
            CLIENT_PACKAGE
                .captures(&lower)
                .and_then(|caps| caps.get(1))
                .map(|found| found.as_str().to_owned())
        })
        .collect();

    versions.sort_by(|a, b| second_segment(a).cmp(second_segment(b)));
    versions.into_iter().next()
}

/// Extracts a truncated version from a `psql --version` banner.
///
/// The trailing version is clipped to its first three characters, so
/// `psql (PostgreSQL) 9.3.4` yields `9.3`.
pub(crate) fn parse_installed(banner: &str) -> Option<String> {
    let lower = banner.to_lowercase();
    let caps = PSQL_BANNER.captures(lower.trim())?;
    let full = caps.get(2)?.as_str();
    let truncated: String = full.chars().take(3).collect();
    (!truncated.is_empty()).then_some(truncated)
}

fn second_segment(version: &str) -> &str {
    version.split('.').nth(1).unwrap_or("")
}

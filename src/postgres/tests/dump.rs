//! Tests for database dumps.

use camino::Utf8Path;
use chrono::NaiveDate;
use rstest::rstest;

use super::fixtures::session_with;
use crate::postgres::dump::{dump_database, dump_filename};
use crate::test_support::ScriptedRunner;

const DUMP_DIR: &str = "/srv/backups";

#[rstest]
fn dump_filename_is_timestamped_without_minutes() {
    let now = NaiveDate::from_ymd_opt(2014, 3, 5)
        .and_then(|date| date.and_hms_opt(14, 30, 9))
        .expect("fixed timestamp should be valid");

    assert_eq!(dump_filename("app", &now), "app_2014_3_5_14_9.psql.gz");
}

#[rstest]
fn dump_is_skipped_when_no_binary_can_be_located() {
    let runner = ScriptedRunner::new();
    runner.push_success(); // dump dir exists
    runner.push_exit_code(1); // /usr/bin/pg_dump missing
    runner.push_output(Some(1), "", ""); // which finds nothing
    let session = session_with(&runner);

    let result = dump_database(&session, Utf8Path::new(DUMP_DIR), "app", None)
        .expect("a missing binary is not an error");

    assert_eq!(result, None);
    let commands = runner.command_strings();
    assert!(
        !commands.iter().any(|cmd| cmd.contains("gzip")),
        "no compression pipeline may run without a dump binary, got: {commands:#?}"
    );
}

#[rstest]
fn dump_creates_the_directory_and_pipes_through_gzip() {
    let runner = ScriptedRunner::new();
    runner.push_exit_code(1); // dump dir missing
    runner.push_success(); // mkdir -p
    runner.push_success(); // /usr/bin/pg_dump exists
    runner.push_success(); // dump pipeline
    let session = session_with(&runner);

    let result = dump_database(&session, Utf8Path::new(DUMP_DIR), "app", Some("app.psql.gz"))
        .expect("dump should succeed");

    assert_eq!(
        result.as_deref(),
        Some(Utf8Path::new("/srv/backups/app.psql.gz"))
    );
    let commands = runner.command_strings();
    assert!(
        commands.iter().any(|cmd| cmd.contains("mkdir -p /srv/backups")),
        "expected the directory to be created, got: {commands:#?}"
    );
    assert!(
        commands.iter().any(|cmd| {
            cmd.contains("sudo -u postgres /usr/bin/pg_dump -h localhost | gzip > /srv/backups/app.psql.gz")
        }),
        "expected the compression pipeline, got: {commands:#?}"
    );
}

#[rstest]
fn dump_falls_back_to_a_path_lookup() {
    let runner = ScriptedRunner::new();
    runner.push_success(); // dump dir exists
    runner.push_exit_code(1); // /usr/bin/pg_dump missing
    runner.push_output(Some(0), "/usr/local/bin/pg_dump\n", ""); // which
    runner.push_success(); // candidate exists
    runner.push_success(); // dump pipeline
    let session = session_with(&runner);

    let result = dump_database(&session, Utf8Path::new(DUMP_DIR), "app", Some("app.psql.gz"))
        .expect("dump should succeed");

    assert!(result.is_some());
    let commands = runner.command_strings();
    assert!(
        commands
            .iter()
            .any(|cmd| cmd.contains("/usr/local/bin/pg_dump -h localhost")),
        "expected the located binary to be used, got: {commands:#?}"
    );
}

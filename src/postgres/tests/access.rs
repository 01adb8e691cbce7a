//! Tests for role and database statements.

use rstest::rstest;

use super::fixtures::session_with;
use crate::postgres::{
    ProvisionError, create_database, create_user, delete_database, delete_user, list_databases,
    list_users,
};
use crate::test_support::ScriptedRunner;

#[rstest]
fn delete_user_refuses_the_reserved_superuser() {
    let runner = ScriptedRunner::new();
    let session = session_with(&runner);

    let err = delete_user(&session, "postgres").expect_err("postgres must not be dropped");

    assert_eq!(
        err,
        ProvisionError::ReservedRole {
            role: String::from("postgres")
        }
    );
    assert!(
        runner.invocations().is_empty(),
        "no remote command may be issued for a reserved role"
    );
}

#[rstest]
fn delete_user_issues_exactly_one_drop() {
    let runner = ScriptedRunner::new();
    runner.push_success();
    let session = session_with(&runner);

    delete_user(&session, "alice").expect("drop should succeed");

    let commands = runner.command_strings();
    assert_eq!(
        commands
            .iter()
            .filter(|cmd| cmd.contains("DROP ROLE alice;"))
            .count(),
        1,
        "expected exactly one drop statement, got: {commands:#?}"
    );
}

#[rstest]
fn create_user_pipes_the_statement_into_psql() {
    let runner = ScriptedRunner::new();
    runner.push_success();
    let session = session_with(&runner);

    create_user(&session, "alice", "s3cret").expect("create should succeed");

    let commands = runner.command_strings();
    let statement = commands.first().expect("statement should be recorded");
    assert!(
        statement.contains("CREATE ROLE alice WITH LOGIN ENCRYPTED PASSWORD"),
        "unexpected statement: {statement}"
    );
    assert!(
        statement.contains("sudo -u postgres psql"),
        "statement must run as the service account: {statement}"
    );
}

#[rstest]
fn list_users_returns_the_query_output() {
    let runner = ScriptedRunner::new();
    runner.push_output(Some(0), " usename | usesysid \n postgres | 10\n", "");
    let session = session_with(&runner);

    let listing = list_users(&session).expect("query should succeed");

    assert!(listing.contains("postgres"), "unexpected listing: {listing}");
}

#[rstest]
fn list_databases_uses_the_psql_listing() {
    let runner = ScriptedRunner::new();
    runner.push_output(Some(0), "List of databases\n", "");
    let session = session_with(&runner);

    let listing = list_databases(&session).expect("query should succeed");

    assert_eq!(listing, "List of databases\n");
    let commands = runner.command_strings();
    assert!(
        commands.iter().any(|cmd| cmd.contains("psql -l")),
        "expected a psql -l, got: {commands:#?}"
    );
}

#[rstest]
#[case(false, "createdb -O alice appdb")]
#[case(true, "createdb -T template_postgis -O alice appdb")]
fn create_database_optionally_uses_the_gis_template(
    #[case] gis: bool,
    #[case] expected: &str,
) {
    let runner = ScriptedRunner::new();
    runner.push_success();
    let session = session_with(&runner);

    create_database(&session, "appdb", "alice", gis).expect("createdb should succeed");

    let commands = runner.command_strings();
    assert!(
        commands.iter().any(|cmd| cmd.contains(expected)),
        "expected '{expected}', got: {commands:#?}"
    );
}

#[rstest]
fn delete_database_issues_a_drop_statement() {
    let runner = ScriptedRunner::new();
    runner.push_success();
    let session = session_with(&runner);

    delete_database(&session, "appdb").expect("drop should succeed");

    let commands = runner.command_strings();
    assert!(
        commands.iter().any(|cmd| cmd.contains("DROP DATABASE appdb;")),
        "expected a drop statement, got: {commands:#?}"
    );
}

//! Binary entry point for the steward CLI.

use std::io::{self, Write};
use std::process;

use camino::Utf8Path;
use clap::Parser;
use thiserror::Error;

use steward::{
    MountError, ProcessCommandRunner, ProvisionError, Session, SessionConfig,
    SessionConfigLoadError, SessionError, mount, postgres,
};

mod cli;

use cli::{Cli, Command, MountArgs, MountCommand, PsqlCommand};

#[derive(Debug, Error)]
enum CliError {
    #[error("configuration error: {0}")]
    Config(#[from] SessionConfigLoadError),
    #[error(transparent)]
    Session(#[from] SessionError),
    #[error(transparent)]
    Provision(#[from] ProvisionError),
    #[error(transparent)]
    Mount(#[from] MountError),
}

fn main() {
    let cli = Cli::parse();
    let exit_code = match dispatch(cli) {
        Ok(code) => code,
        Err(err) => {
            report_error(&err);
            1
        }
    };

    process::exit(exit_code);
}

fn dispatch(cli: Cli) -> Result<i32, CliError> {
    let mut config = SessionConfig::load_without_cli_args()?;
    if let Some(host) = cli.host {
        config.host = host;
    }
    let session = Session::with_process_runner(config)?;

    match cli.command {
        Command::Psql(command) => run_psql(&session, command),
        Command::Mount(command) => run_mount(&session, command),
    }
}

fn run_psql(
    session: &Session<ProcessCommandRunner>,
    command: PsqlCommand,
) -> Result<i32, CliError> {
    match command {
        PsqlCommand::LatestVersion => {
            report_version(postgres::latest_version(session)?.as_deref(), "package index")
        }
        PsqlCommand::InstalledVersion => report_version(
            postgres::default_installed_version(session)?.as_deref(),
            "installed psql",
        ),
        PsqlCommand::Install { version } => {
            let installed = postgres::install(session, version.as_deref())?;
            emit(&installed);
            Ok(0)
        }
        PsqlCommand::MakeDataDir { version, base } => {
            let data_dir =
                postgres::make_data_dir(session, version.as_deref(), Utf8Path::new(&base))?;
            emit(data_dir.as_str());
            Ok(0)
        }
        PsqlCommand::CreateCluster {
            version,
            cluster,
            encoding,
            base,
        } => {
            let created = postgres::create_cluster(
                session,
                version.as_deref(),
                &cluster,
                &encoding,
                Utf8Path::new(&base),
            )?;
            emit(&created);
            Ok(0)
        }
        PsqlCommand::RemoveCluster { version, cluster } => {
            postgres::remove_cluster(session, &version, &cluster)?;
            Ok(0)
        }
        PsqlCommand::SetAccess { version, cluster } => {
            postgres::set_access_rules(session, version.as_deref(), &cluster)?;
            Ok(0)
        }
        PsqlCommand::Configure {
            version,
            cluster,
            interface,
            restart,
        } => {
            postgres::configure(session, version.as_deref(), &cluster, &interface, restart)?;
            Ok(0)
        }
        PsqlCommand::Adminpack => {
            postgres::create_adminpack(session)?;
            Ok(0)
        }
        PsqlCommand::SetPassword { password } => {
            postgres::set_postgres_password(session, &password)?;
            Ok(0)
        }
        PsqlCommand::CreateUser { username, password } => {
            postgres::create_user(session, &username, &password)?;
            Ok(0)
        }
        PsqlCommand::DropUser { username } => {
            postgres::delete_user(session, &username)?;
            Ok(0)
        }
        PsqlCommand::ListUsers => {
            emit_raw(&postgres::list_users(session)?);
            Ok(0)
        }
        PsqlCommand::ListDatabases => {
            emit_raw(&postgres::list_databases(session)?);
            Ok(0)
        }
        PsqlCommand::CreateDatabase { dbname, owner, gis } => {
            postgres::create_database(session, &dbname, &owner, gis)?;
            Ok(0)
        }
        PsqlCommand::DropDatabase { dbname } => {
            postgres::delete_database(session, &dbname)?;
            Ok(0)
        }
        PsqlCommand::Dump {
            dump_dir,
            db_name,
            name,
        } => {
            let destination = postgres::dump_database(
                session,
                Utf8Path::new(&dump_dir),
                &db_name,
                name.as_deref(),
            )?;
            match destination {
                Some(path) => emit(path.as_str()),
                None => warn("pg_dump not found on the remote host; dump skipped"),
            }
            Ok(0)
        }
    }
}

fn run_mount(
    session: &Session<ProcessCommandRunner>,
    command: MountCommand,
) -> Result<i32, CliError> {
    match command {
        MountCommand::FormatDevice(MountArgs {
            device,
            mount_point,
            filesystem,
        }) => {
            mount::format_and_mount(session, &device, &mount_point, &filesystem)?;
            Ok(0)
        }
        MountCommand::Device(MountArgs {
            device,
            mount_point,
            filesystem,
        }) => {
            mount::mount_device(session, &device, &mount_point, &filesystem)?;
            Ok(0)
        }
        MountCommand::FstabAdd(MountArgs {
            device,
            mount_point,
            filesystem,
        }) => {
            mount::fstab_add(session, &device, &mount_point, &filesystem)?;
            Ok(0)
        }
    }
}

fn report_version(found: Option<&str>, source: &str) -> Result<i32, CliError> {
    match found {
        Some(version) => {
            emit(version);
            Ok(0)
        }
        None => {
            warn(&format!("no postgresql version found via {source}"));
            Ok(1)
        }
    }
}

fn emit(text: &str) {
    writeln!(io::stdout(), "{text}").ok();
}

fn emit_raw(text: &str) {
    write!(io::stdout(), "{text}").ok();
}

fn warn(text: &str) {
    writeln!(io::stderr(), "{text}").ok();
}

fn report_error(err: &CliError) {
    write_error(io::stderr(), err);
}

fn write_error(mut target: impl Write, err: &CliError) {
    writeln!(target, "{err}").ok();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_parses_a_psql_subcommand() {
        let cli = Cli::try_parse_from([
            "steward",
            "--host",
            "db1.example.net",
            "psql",
            "create-cluster",
            "--version",
            "9.3",
        ])
        .expect("arguments should parse");

        assert_eq!(cli.host.as_deref(), Some("db1.example.net"));
        assert!(matches!(
            cli.command,
            Command::Psql(PsqlCommand::CreateCluster {
                ref version,
                ref cluster,
                ref encoding,
                ..
            }) if version.as_deref() == Some("9.3") && cluster == "main" && encoding == "UTF-8"
        ));
    }

    #[test]
    fn cli_mount_defaults_to_xfs() {
        let cli = Cli::try_parse_from(["steward", "mount", "format-device", "/dev/xvdf", "/data"])
            .expect("arguments should parse");

        assert!(matches!(
            cli.command,
            Command::Mount(MountCommand::FormatDevice(MountArgs {
                ref device,
                ref mount_point,
                ref filesystem,
            })) if device == "/dev/xvdf" && mount_point == "/data" && filesystem == "xfs"
        ));
    }

    #[test]
    fn cli_rejects_a_dump_without_a_database() {
        let parsed = Cli::try_parse_from(["steward", "psql", "dump", "/srv/backups"]);
        assert!(parsed.is_err(), "dump requires a database name");
    }

    #[test]
    fn write_error_writes_cli_error() {
        let mut buf = Vec::new();
        let err = CliError::Mount(MountError::AlreadyMounted {
            device: String::from("/dev/xvdf"),
        });
        write_error(&mut buf, &err);
        let rendered = String::from_utf8(buf).expect("utf8");
        assert!(
            rendered.contains("device (/dev/xvdf) is already mounted"),
            "rendered: {rendered}"
        );
    }
}

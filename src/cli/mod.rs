//! Command-line interface definitions for the `steward` binary.
//!
//! This module centralises the clap parser structures so both the main
//! binary and the build script can reuse them when generating the manual
//! page.

use clap::{Args, Parser, Subcommand};

/// Top-level CLI for the `steward` binary.
#[derive(Debug, Parser)]
#[command(
    name = "steward",
    about = "Provision PostgreSQL and block storage on a remote host over SSH",
    arg_required_else_help = true
)]
pub(crate) struct Cli {
    /// Managed host to connect to, overriding the configured value.
    #[arg(long, value_name = "HOST", global = true)]
    pub(crate) host: Option<String>,
    /// Operation to perform on the managed host.
    #[command(subcommand)]
    pub(crate) command: Command,
}

/// Operation families exposed by the CLI.
#[derive(Debug, Subcommand)]
pub(crate) enum Command {
    /// PostgreSQL provisioning operations.
    #[command(subcommand)]
    Psql(PsqlCommand),
    /// Device formatting and mounting operations.
    #[command(subcommand)]
    Mount(MountCommand),
}

/// PostgreSQL provisioning subcommands.
#[derive(Debug, Subcommand)]
pub(crate) enum PsqlCommand {
    /// Print the newest version offered by the host's package index.
    LatestVersion,
    /// Print the version of the psql binary installed on the host.
    InstalledVersion,
    /// Install the PostgreSQL packages for a version.
    Install {
        /// Version to install; resolved from the package index when omitted.
        #[arg(long, value_name = "VERSION")]
        version: Option<String>,
    },
    /// Create the data directory for a cluster version and print its path.
    MakeDataDir {
        /// Version the directory is for; resolved when omitted.
        #[arg(long, value_name = "VERSION")]
        version: Option<String>,
        /// Base directory holding per-version data directories.
        #[arg(long, value_name = "DIR", default_value = "/var/lib/postgresql")]
        base: String,
    },
    /// Create a cluster, replacing any existing cluster of the same name.
    CreateCluster {
        /// Version to create the cluster for; resolved when omitted.
        #[arg(long, value_name = "VERSION")]
        version: Option<String>,
        /// Cluster name.
        #[arg(long, value_name = "NAME", default_value = "main")]
        cluster: String,
        /// Cluster encoding.
        #[arg(long, value_name = "ENCODING", default_value = "UTF-8")]
        encoding: String,
        /// Base directory holding per-version data directories.
        #[arg(long, value_name = "DIR", default_value = "/var/lib/postgresql")]
        base: String,
    },
    /// Stop and drop a cluster if it exists.
    RemoveCluster {
        /// Version of the cluster to remove.
        #[arg(value_name = "VERSION")]
        version: String,
        /// Cluster name.
        #[arg(long, value_name = "NAME", default_value = "main")]
        cluster: String,
    },
    /// Upload the packaged access rules over the cluster's pg_hba.conf.
    SetAccess {
        /// Version of the cluster; the installed version when omitted.
        #[arg(long, value_name = "VERSION")]
        version: Option<String>,
        /// Cluster name.
        #[arg(long, value_name = "NAME", default_value = "main")]
        cluster: String,
    },
    /// Rewrite the listen address and socket directory of a cluster.
    Configure {
        /// Version of the cluster; the installed version when omitted.
        #[arg(long, value_name = "VERSION")]
        version: Option<String>,
        /// Cluster name.
        #[arg(long, value_name = "NAME", default_value = "main")]
        cluster: String,
        /// Address the server listens on.
        #[arg(long, value_name = "ADDR", default_value = "*")]
        interface: String,
        /// Restart the service after rewriting the configuration.
        #[arg(long)]
        restart: bool,
    },
    /// Install the adminpack extension.
    Adminpack,
    /// Change the password of the postgres superuser.
    SetPassword {
        /// New password.
        #[arg(value_name = "PASSWORD")]
        password: String,
    },
    /// Create a login role with an encrypted password.
    CreateUser {
        /// Role name.
        #[arg(value_name = "USERNAME")]
        username: String,
        /// Role password.
        #[arg(value_name = "PASSWORD")]
        password: String,
    },
    /// Drop a role. The postgres superuser is refused.
    DropUser {
        /// Role name.
        #[arg(value_name = "USERNAME")]
        username: String,
    },
    /// List all roles known to the server.
    ListUsers,
    /// List all databases on the server.
    ListDatabases,
    /// Create a database owned by an existing role.
    CreateDatabase {
        /// Database name.
        #[arg(value_name = "DBNAME")]
        dbname: String,
        /// Owning role.
        #[arg(long, value_name = "ROLE")]
        owner: String,
        /// Create from the GIS template.
        #[arg(long)]
        gis: bool,
    },
    /// Drop a database.
    DropDatabase {
        /// Database name.
        #[arg(value_name = "DBNAME")]
        dbname: String,
    },
    /// Dump a database into a directory, compressed with gzip.
    Dump {
        /// Directory on the host to receive the dump.
        #[arg(value_name = "DIR")]
        dump_dir: String,
        /// Database name.
        #[arg(value_name = "DBNAME")]
        db_name: String,
        /// Dump file name; a timestamped name is generated when omitted.
        #[arg(long, value_name = "NAME")]
        name: Option<String>,
    },
}

/// Device formatting and mounting subcommands.
#[derive(Debug, Subcommand)]
pub(crate) enum MountCommand {
    /// Format a device, mount it, and persist the mount across reboots.
    FormatDevice(MountArgs),
    /// Mount a device without formatting or persisting it.
    Device(MountArgs),
    /// Append a mount record to the boot-time mount table.
    FstabAdd(MountArgs),
}

/// Arguments shared by the mount-family subcommands.
#[derive(Args, Debug)]
pub(crate) struct MountArgs {
    /// Block device path (for example /dev/xvdf).
    #[arg(value_name = "DEVICE")]
    pub(crate) device: String,
    /// Directory to mount the device on.
    #[arg(value_name = "MOUNT_POINT")]
    pub(crate) mount_point: String,
    /// Filesystem to format or mount with.
    #[arg(long, value_name = "FS", default_value = "xfs")]
    pub(crate) filesystem: String,
}

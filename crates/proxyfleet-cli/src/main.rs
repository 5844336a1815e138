//! proxyfleet — nginx fleet configuration control plane.
//!
//! ```text
//! proxyfleet add-group edge 3
//! proxyfleet create-version ./nginx.conf v1 --publish
//! proxyfleet publish v2 --gradual
//! proxyfleet list-versions
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};

use proxyfleet_control::{PublishCoordinator, PublishError};
use proxyfleet_core::FleetConfig;
use proxyfleet_store::{FsBlobStore, VersionStore};

mod commands;
mod console;

#[derive(Parser)]
#[command(
    name = "proxyfleet",
    about = "Version and roll out nginx configurations across server groups",
    version,
    propagate_version = true,
)]
struct Cli {
    /// Data directory backing the blob store.
    #[arg(long, default_value = "/var/lib/proxyfleet")]
    data_dir: PathBuf,

    /// Fleet configuration file (toml). Defaults apply when omitted.
    #[arg(long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a new nginx configuration version from a file.
    CreateVersion {
        /// Path to the nginx configuration file.
        file: PathBuf,
        /// Version label to record.
        version: String,
        /// Publish the version to the running fleet right away.
        #[arg(long)]
        publish: bool,
        /// Roll out group by group instead of all groups at once.
        #[arg(long)]
        gradual: bool,
    },
    /// Publish an existing configuration version to the fleet.
    Publish {
        version: String,
        /// Republish even if the version is already current.
        #[arg(long)]
        force: bool,
        /// Roll out group by group instead of all groups at once.
        #[arg(long)]
        gradual: bool,
    },
    /// List versions available for publishing.
    ListVersions,
    /// Register a server group (or resize an existing one).
    AddGroup {
        name: String,
        /// Number of nginx servers in the group.
        count: u32,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn,proxyfleet=info".parse().unwrap()),
        )
        .init();

    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => FleetConfig::from_file(path)?,
        None => FleetConfig::default(),
    };

    let store = Arc::new(FsBlobStore::new(&cli.data_dir));
    let versions = VersionStore::load(store, config).await?;
    let coordinator = PublishCoordinator::new(versions)
        .with_confirm(Arc::new(console::TerminalConfirm))
        .with_observer(Arc::new(console::ConsoleProgress));

    let result = match cli.command {
        Commands::CreateVersion {
            file,
            version,
            publish,
            gradual,
        } => commands::create_version(coordinator, &file, &version, publish, gradual).await,
        Commands::Publish {
            version,
            force,
            gradual,
        } => commands::publish(coordinator, &version, force, gradual).await,
        Commands::ListVersions => commands::list_versions(&coordinator),
        Commands::AddGroup { name, count } => commands::add_group(coordinator, &name, count).await,
    };

    // Expected aborts are conversation, not failures; anything else is
    // reported generically, matching the operator-facing contract.
    if let Err(e) = result {
        match e {
            PublishError::Abort(message) => println!("Aborting. {message}"),
            PublishError::Timeout => println!("Aborting. Publish timeout has been reached!"),
            other => eprintln!("An error has occurred: {other}"),
        }
    }

    Ok(())
}

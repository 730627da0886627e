//! dronectl — operator CLI for the drone registry.
//!
//! # Usage
//!
//! ```text
//! dronectl init --scaffold registry.toml
//! dronectl --config registry.toml init
//! dronectl --config registry.toml notify BootingState mysite-07af52405e
//! dronectl --config registry.toml resources --site MySite --format json
//! ```

use std::path::PathBuf;

use clap::{Parser, Subcommand};

mod commands;

use commands::OutputFormat;

#[derive(Parser)]
#[command(
    name = "dronectl",
    about = "Inspect and maintain the drone resource registry",
    version,
    propagate_version = true,
)]
struct Cli {
    /// Registry configuration file.
    #[arg(short, long, global = true, default_value = "registry.toml")]
    config: PathBuf,

    /// Registry database file; overrides [registry].db_file from the config.
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Deploy the schema and register every configured site and machine type.
    Init {
        /// Write a starter config to this path instead.
        #[arg(long)]
        scaffold: Option<PathBuf>,
    },
    /// Register a site.
    AddSite { site_name: String },
    /// Register a machine type offered by a site.
    AddMachineType {
        site_name: String,
        machine_type: String,
    },
    /// List registered sites and their machine types.
    Sites,
    /// Register a newly discovered drone.
    Insert {
        /// Initial state (catalog name).
        #[arg(long, default_value = "RequestState")]
        state: String,
        #[arg(long)]
        site: String,
        #[arg(long)]
        machine_type: String,
        /// Drone uuid; generated from the site name when omitted.
        #[arg(long)]
        drone_uuid: Option<String>,
        #[arg(long)]
        remote_uuid: Option<String>,
    },
    /// Record a drone's transition to a new state.
    ///
    /// Site and machine type default to the drone's stored values.
    Notify {
        state: String,
        drone_uuid: String,
        #[arg(long)]
        site: Option<String>,
        #[arg(long)]
        machine_type: Option<String>,
        #[arg(long)]
        remote_uuid: Option<String>,
    },
    /// List tracked drones.
    Resources {
        #[arg(long)]
        site: Option<String>,
        #[arg(long)]
        machine_type: Option<String>,
        #[arg(short, long, value_enum, default_value = "text")]
        format: OutputFormat,
    },
    /// Show a drone's current state.
    State {
        drone_uuid: String,
        #[arg(short, long, value_enum, default_value = "text")]
        format: OutputFormat,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,dronectl=debug,drone_registry=debug".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    if let Commands::Init {
        scaffold: Some(path),
    } = &cli.command
    {
        return commands::catalog::scaffold(path);
    }

    let registry = commands::open_registry(&cli.config, cli.db.as_deref()).await?;

    match cli.command {
        Commands::Init { .. } => commands::catalog::init(&registry).await,
        Commands::AddSite { site_name } => commands::catalog::add_site(&registry, &site_name).await,
        Commands::AddMachineType {
            site_name,
            machine_type,
        } => commands::catalog::add_machine_type(&registry, &site_name, &machine_type).await,
        Commands::Sites => commands::catalog::sites(&registry).await,
        Commands::Insert {
            state,
            site,
            machine_type,
            drone_uuid,
            remote_uuid,
        } => {
            commands::resources::insert(
                &registry,
                &state,
                site,
                machine_type,
                drone_uuid.as_deref(),
                remote_uuid,
            )
            .await
        }
        Commands::Notify {
            state,
            drone_uuid,
            site,
            machine_type,
            remote_uuid,
        } => {
            commands::resources::notify(
                &registry,
                &state,
                &drone_uuid,
                site,
                machine_type,
                remote_uuid,
            )
            .await
        }
        Commands::Resources {
            site,
            machine_type,
            format,
        } => commands::resources::list(&registry, site, machine_type, format).await,
        Commands::State { drone_uuid, format } => {
            commands::resources::state(&registry, &drone_uuid, format).await
        }
    }
}

//! replica-relay - binary forwarder for replica canister calls

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use replica_relay::agent::ConnectionRegistry;
use replica_relay::config::Config;
use replica_relay::error::Result;
use replica_relay::proxy::RelayServer;

/// replica-relay - forwards binary replica requests and manages agent clients
#[derive(Parser)]
#[command(name = "replica-relay")]
#[command(about = "Binary relay for replica canister calls")]
#[command(version)]
pub struct Cli {
    /// Path to config file
    #[arg(long, short = 'c', global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Start the relay server (default command)
    #[command(name = "serve")]
    Serve,

    /// Fetch the replica status through the agent layer
    #[command(name = "status")]
    Status,
}

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    init_logging();

    let cli = Cli::parse();
    let config = Config::load(cli.config.as_deref())?;
    tracing::debug!("Config loaded: {:?}", config);

    match cli.command {
        None | Some(Command::Serve) => serve(config).await,
        Some(Command::Status) => status(config).await,
    }
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,replica_relay=debug"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

async fn serve(config: Config) -> Result<()> {
    tracing::info!("Starting replica-relay ({:?} mode)", config.mode);

    RelayServer::new(config).serve().await?;

    tracing::info!("replica-relay stopped");
    Ok(())
}

async fn status(config: Config) -> Result<()> {
    let registry = ConnectionRegistry::from_config(&config)?;
    let client = registry.get_client(None).await;

    let payload = registry
        .with_call_timeout(async move { client.status().await })
        .await?;

    println!("host:    {}", registry.host());
    println!("mode:    {:?}", registry.mode());
    println!("status:  {} bytes (application/cbor)", payload.len());
    Ok(())
}

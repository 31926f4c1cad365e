use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use metaplane::{create_raft_router, create_router, NodeConfig, PlaneDaemon};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "metaplane")]
#[command(about = "Replicated metadata control plane node")]
struct Cli {
    #[arg(short, long, global = true, default_value = "metaplane.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the node
    Run,
    /// Write a default config file
    Init {
        #[arg(long)]
        force: bool,
    },
    /// Validate the config file and print the settings the node would use
    Check,
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "metaplane=info,openraft=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    match cli.command {
        Commands::Run => run_node(load_config(&cli.config)?).await,
        Commands::Init { force } => write_default_config(&cli.config, force),
        Commands::Check => check_config(&cli.config),
    }
}

fn load_config(path: &PathBuf) -> Result<NodeConfig> {
    if !path.exists() {
        warn!("{:?} not found, running with defaults", path);
        return Ok(NodeConfig::default());
    }
    NodeConfig::load(path).with_context(|| format!("invalid config {:?}", path))
}

async fn run_node(config: NodeConfig) -> Result<()> {
    info!(
        node_id = config.node_id,
        advertise = %config.effective_advertise_addr(),
        peers = config.peers.len(),
        on_decode_error = ?config.on_decode_error,
        "starting metaplane node"
    );

    let daemon = Arc::new(PlaneDaemon::new(config.clone()).await?);
    let router = create_router(daemon.clone()).merge(create_raft_router(daemon.replicator().clone()));

    let listener = TcpListener::bind(config.listen_addr())
        .await
        .with_context(|| format!("cannot bind {}", config.listen_addr()))?;
    info!("Listening on {}", config.listen_addr());

    let node = tokio::spawn({
        let daemon = daemon.clone();
        async move { daemon.run().await }
    });

    let shutdown_daemon = daemon.clone();
    axum::serve(listener, router)
        .with_graceful_shutdown(async move {
            let _ = tokio::signal::ctrl_c().await;
            info!("Shutting down");
            shutdown_daemon.shutdown();
        })
        .await?;

    match tokio::time::timeout(Duration::from_secs(5), node).await {
        Ok(Ok(result)) => result,
        Ok(Err(e)) => Err(e.into()),
        Err(_) => {
            warn!("Raft did not stop within 5s");
            Ok(())
        }
    }
}

fn write_default_config(path: &PathBuf, force: bool) -> Result<()> {
    if path.exists() && !force {
        anyhow::bail!("{:?} already exists, pass --force to overwrite", path);
    }
    NodeConfig::default().save(path)?;
    println!("Wrote {:?}", path);
    println!("Set a unique node_id, list the other nodes under [[peers]] and mark one node bootstrap = true.");
    Ok(())
}

fn check_config(path: &PathBuf) -> Result<()> {
    let config = NodeConfig::load(path).with_context(|| format!("invalid config {:?}", path))?;

    println!("node_id:         {}", config.node_id);
    println!("listen:          {}", config.listen_addr());
    println!("advertise:       {}", config.effective_advertise_addr());
    println!("data_dir:        {:?}", config.data_dir);
    println!("on_decode_error: {:?}", config.on_decode_error);
    for peer in config.peer_infos() {
        let role = if peer.is_voter { "voter" } else { "learner" };
        println!("peer:            {} {} ({})", peer.node_id, peer.addr, role);
    }
    Ok(())
}

use std::net::{IpAddr, SocketAddr};

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt};
use vacuum_world_core::session::{Session, SessionConfig};
use vacuum_world_server::{router, shared};

const DEFAULT_LOG_FILTER: &str = "vacuum_world_core=info,vacuum_world_server=info,tower_http=info";

#[derive(Parser, Debug)]
#[command(version, about = "HTTP API for the vacuum world simulation", long_about = None)]
struct Args {
    /// Address to bind
    #[arg(long, env = "VACUUM_HOST", default_value = "0.0.0.0")]
    host: IpAddr,

    /// Port to listen on
    #[arg(short, long, env = "VACUUM_PORT", default_value_t = 5001)]
    port: u16,

    /// Side length of the square room
    #[arg(long, env = "VACUUM_GRID_SIZE", default_value_t = 10)]
    size: usize,

    /// Dirt placed at startup and on resets without a count
    #[arg(long, env = "VACUUM_DIRT_COUNT", default_value_t = 10)]
    dirt: usize,

    /// Seed for reproducible dirt placement
    #[arg(long, env = "VACUUM_SEED")]
    seed: Option<u64>,
}

fn init_logging() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    fmt().with_env_filter(filter).init();
}

#[tokio::main]
async fn main() -> Result<()> {
    init_logging();
    let args = Args::parse();

    let config = SessionConfig {
        size: args.size,
        dirt_count: args.dirt,
        seed: args.seed,
    };
    let session = Session::new(&config).context("Failed to create session")?;
    let app = router(shared(session));

    let addr = SocketAddr::new(args.host, args.port);
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    info!(%addr, "Vacuum world API listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_err() {
        // Without a signal handler the server runs until killed.
        std::future::pending::<()>().await;
    }
}

//! Standalone Plaza server.
//!
//! ```text
//! plaza-server --bind 0.0.0.0:8000 --grace-secs 5 --log-level debug
//! ```
//!
//! `RUST_LOG`, when set, takes precedence over `--log-level`.

use std::time::Duration;

use clap::Parser;
use plaza::prelude::*;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Real-time presence and relay server for shared 2D rooms.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Address to listen on, as "IP:PORT".
    #[arg(short, long, default_value = plaza::DEFAULT_BIND_ADDR)]
    bind: String,

    /// Seconds a dropped client keeps its room and position.
    #[arg(long, default_value_t = 5)]
    grace_secs: u64,

    /// Log filter used when `RUST_LOG` is unset.
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Emit logs as JSON lines.
    #[arg(long)]
    json_logs: bool,
}

fn setup_logging(level: &str, json: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level));
    let registry = tracing_subscriber::registry().with(filter);

    if json {
        registry
            .with(fmt::layer().json().with_thread_ids(true))
            .init();
    } else {
        registry.with(fmt::layer().with_target(false)).init();
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    setup_logging(&cli.log_level, cli.json_logs);

    let server = PlazaServer::builder()
        .bind(&cli.bind)
        .reconnect_grace(Duration::from_secs(cli.grace_secs))
        .build()
        .await?;

    server
        .run_until(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "failed to listen for ctrl-c");
                std::future::pending::<()>().await;
            }
        })
        .await?;

    tracing::info!("plaza server stopped");
    Ok(())
}

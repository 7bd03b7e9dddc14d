mod application;
mod config;
mod domain;
mod infrastructure;

use clap::Parser;
use config::RuntimeSettings;
use config::params::ParameterStoreClient;
use infrastructure::server::{self, GatewayContext};
use std::error::Error;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt};

#[derive(Parser, Debug)]
#[command(
    name = "x402-gateway",
    version,
    about = "Invocation gateway between an orchestrator, an MCP tool provider, and LLM backends"
)]
struct Cli {
    /// Bind address (overrides the PORT environment variable)
    #[arg(long)]
    addr: Option<SocketAddr>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    init_tracing();
    info!("Starting x402-gateway");
    let cli = Cli::parse();

    let mut settings = RuntimeSettings::from_env();
    if settings.is_managed() {
        match settings.parameter_store_url.clone() {
            Some(store_url) => {
                info!("Managed deployment detected; consulting parameter store");
                let store = ParameterStoreClient::new(store_url);
                settings.resolve_remote(&store).await;
            }
            None => {
                warn!("Managed deployment without a parameter store URL; skipping remote resolution");
            }
        }
    }
    settings.log_summary();

    let addr = cli
        .addr
        .unwrap_or_else(|| SocketAddr::from(([0, 0, 0, 0], settings.port)));
    let ctx = Arc::new(GatewayContext::new());

    // The listener goes up immediately; readiness is reported through /ping
    // once this task resolves.
    let init_ctx = Arc::clone(&ctx);
    tokio::spawn(async move {
        match application::build_agent(&settings).await {
            Ok(agent) => init_ctx.set_ready(Arc::new(agent)).await,
            Err(error) => init_ctx.set_failed(error.to_string()).await,
        }
    });

    tokio::select! {
        result = server::serve(ctx, addr) => result?,
        _ = shutdown_signal() => info!("Shutdown signal received; exiting"),
    }
    Ok(())
}

fn init_tracing() {
    static INIT: std::sync::Once = std::sync::Once::new();
    INIT.call_once(|| {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
        fmt()
            .with_env_filter(filter)
            .with_target(false)
            .with_level(true)
            .init();
    });
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("install SIGINT handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("SIGINT received"),
        _ = terminate => info!("SIGTERM received"),
    }
}

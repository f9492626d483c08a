use std::error::Error;
use std::sync::Arc;

use agentgate_core::{Core, Gateway, MemoryInitStore, UpstreamClientConfig, WreqUpstreamClient};
use clap::Parser;
use tracing::{info, warn};

mod cli;

use crate::cli::Cli;

#[tokio::main]
async fn main() {
    init_tracing();
    if let Err(err) = run().await {
        eprintln!("agentgate failed: {err}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), Box<dyn Error + Send + Sync>> {
    let config = Cli::parse().into_patch().into_config()?;
    info!(
        host = %config.host,
        port = config.port,
        backend_url = %config.backend_url.as_deref().unwrap_or(""),
        production = config.production,
        proxy = %config.proxy.as_deref().unwrap_or(""),
        "config loaded"
    );
    if config.backend_url.is_none() {
        warn!("backend url is not configured; chat requests will fail until it is set");
    }

    let client = WreqUpstreamClient::new(UpstreamClientConfig::from_global(&config))?;
    let gateway = Gateway::new(&config, Arc::new(client), Arc::new(MemoryInitStore::new()))?;
    let core = Core::new(gateway);

    let bind = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&bind).await?;
    info!(addr = %bind, "listening");
    axum::serve(listener, core.router())
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await?;

    Ok(())
}

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        tracing_subscriber::EnvFilter::new("agentgate=info,agentgate_core=info")
    });
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

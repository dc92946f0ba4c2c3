// Main entry point for the binder server

use std::sync::Arc;

use anyhow::{Context, Result};
use extraction::HttpBrowserLauncher;
use server_core::kernel::{ServerDeps, TraceForwardLayer, TraceRegistry};
use server_core::{server::build_app, Config};
use tracing::Level;
use tracing_subscriber::{
    filter::Targets, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer,
};

#[tokio::main]
async fn main() -> Result<()> {
    // Log lines of traced jobs are also forwarded to the client watching them
    let traces = TraceRegistry::new();
    let forwarded = Targets::new()
        .with_target("server_core", Level::DEBUG)
        .with_target("extraction", Level::DEBUG);

    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer().with_filter(
                EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| "info,server_core=debug,extraction=debug".into()),
            ),
        )
        .with(TraceForwardLayer::new(traces.clone()).with_filter(forwarded))
        .init();

    tracing::info!("Starting serial binder");

    // Load configuration
    let config = Config::from_env().context("Failed to load configuration")?;
    tracing::info!(data_dir = %config.data_dir.display(), "Configuration loaded");

    tokio::fs::create_dir_all(&config.data_dir)
        .await
        .with_context(|| format!("Failed to create data dir {}", config.data_dir.display()))?;

    let mut launcher = HttpBrowserLauncher::new();
    if let Some(user_agent) = &config.user_agent {
        launcher = launcher.with_user_agent(user_agent.clone());
    }

    let port = config.port;
    let deps = ServerDeps::new(config, Arc::new(launcher)).with_traces(traces);

    // Build application
    let app = build_app(deps);

    // Start server
    let addr = format!("0.0.0.0:{}", port);
    tracing::info!("Starting server on {}", addr);
    tracing::info!("Health check: http://localhost:{}/health", port);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .context("Failed to bind to address")?;

    axum::serve(listener, app).await.context("Server error")?;

    Ok(())
}

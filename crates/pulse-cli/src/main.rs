use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use pulse_ingest::FsSource;
use tokio::net::TcpListener;

#[tokio::main]
async fn main() -> Result<()> {
    // Observability
    pulse_obs::init("pulse");

    // Config
    let cfg = pulse_config::AppConfig::load().unwrap_or_else(|e| {
        tracing::warn!(error = %e, "config unreadable, using defaults");
        pulse_config::AppConfig::default()
    });
    let http_bind = cfg.http_bind();
    let data_dir = cfg.data_dir();
    let settings = pulse_cli::DashboardSettings::from_config(&cfg)?;

    // Build app and state
    let source = Arc::new(FsSource::new(&data_dir));
    let (app, state) = pulse_cli::build_app(source, settings)?;
    tracing::info!(data_dir = %data_dir.display(), "serving logs");

    // Start HTTP server
    let addr: SocketAddr = http_bind
        .parse()
        .with_context(|| format!("Invalid HTTP bind address: {http_bind}"))?;
    let listener = TcpListener::bind(addr)
        .await
        .context("failed to bind TCP listener")?;

    // Mark ready just before serving
    pulse_cli::set_ready(&state, true);

    tracing::info!(%addr, "HTTP server listening");
    axum::serve(listener, app).await.context("server error")?;
    Ok(())
}

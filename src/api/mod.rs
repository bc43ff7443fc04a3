//! Desktop audio routing companion service.
//!
//! Discovers applications playing audio (PulseAudio/PipeWire sink-inputs),
//! matches them with Hyprland window titles by PID, and reroutes a selected
//! stream into a virtual null sink whose monitor source the bot can record
//! from. All system interaction is subprocess-based (`pactl`, `hyprctl`).

pub mod discovery;
pub mod hyprctl;
pub mod models;
pub mod pactl;
pub mod routes;
pub mod sink;

use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::info;

use crate::config::Config;
use discovery::{DiscoveryService, SharedSink};
use hyprctl::HyprctlService;
use pactl::PactlService;
use sink::SinkManager;

const SUBPROCESS_TIMEOUT: Duration = Duration::from_secs(5);

/// Runs the routing API until ctrl-c, owning the virtual sink's lifecycle.
pub async fn serve(config: &Config) -> Result<()> {
    let sink = Arc::new(Mutex::new(SinkManager::new(
        config.sink_name.clone(),
        config.sink_sample_rate,
        config.sink_channels,
    )));
    sink.lock().await.create().await?;
    info!(
        "🔈 Virtual sink ready (monitor source: {})",
        sink.lock().await.monitor_source()
    );

    let discovery = Arc::new(DiscoveryService::new(
        Arc::new(PactlService::new(SUBPROCESS_TIMEOUT)),
        Arc::new(HyprctlService::new(SUBPROCESS_TIMEOUT)),
        Arc::new(SharedSink(sink.clone())),
    ));

    let app = routes::router(routes::ApiState { discovery });
    let addr = format!("{}:{}", config.api_host, config.api_port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("🚀 Routing API listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("⚠️ Shutdown signal received, closing...");
        })
        .await?;

    sink.lock().await.destroy().await;
    Ok(())
}

//! Driver Guard - Main Entry Point

use anyhow::Context;
use api::{init_logging, run_server, AppState, Settings};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::sync::Arc;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config_path = std::env::args().nth(1);
    let settings = Settings::load(config_path.as_deref()).context("loading settings")?;

    init_logging(&settings.logging.level, settings.logging.json)
        .context("installing tracing subscriber")?;

    info!("=== Driver Guard v{} ===", env!("CARGO_PKG_VERSION"));
    info!(
        "Cooldown {}s, countdown {}s, eye threshold {}, closure {}ms",
        settings.alerts.cooldown_seconds,
        settings.alerts.countdown_seconds,
        settings.dms.eye_closed_threshold,
        settings.dms.fatigue_duration_ms
    );

    let metrics = match PrometheusBuilder::new().install_recorder() {
        Ok(handle) => Some(handle),
        Err(e) => {
            warn!("Metrics disabled: {}", e);
            None
        }
    };

    let state = Arc::new(AppState::start(&settings, metrics).context("starting alert pipeline")?);
    if settings.contact.is_none() {
        warn!("No emergency contact configured; alerts will not be dispatched");
    }

    run_server(state, &settings.server.addr).await
}

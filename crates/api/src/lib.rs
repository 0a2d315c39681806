//! Driver Guard API Server
//!
//! HTTP surface over the alert pipeline: detector ingest, driver status,
//! alert cancellation, emergency contact settings and dispatch history.

use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use metrics_exporter_prometheus::PrometheusHandle;
use serde::Serialize;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

pub mod collaborators;
pub mod error;
mod routes;
pub mod settings;

use alerting::{AlertHandle, AlertService, Collaborators, InMemoryContactStore};
use event_fusion::EventFusion;

pub use collaborators::{LoggingAlarm, LoggingDispatcher, StaticLocation, StatusBoard};
pub use error::ApiError;
pub use settings::{Settings, SettingsError};

/// Application state shared across handlers
pub struct AppState {
    /// Handle to the alert orchestrator task
    pub alerts: AlertHandle,
    /// Detector pipelines
    pub fusion: EventFusion,
    pub contacts: Arc<InMemoryContactStore>,
    pub status: Arc<StatusBoard>,
    pub dispatcher: Arc<LoggingDispatcher>,
    pub alarm: Arc<LoggingAlarm>,
    /// Prometheus exporter, when a recorder is installed
    pub metrics: Option<PrometheusHandle>,
    /// Version string
    pub version: String,
    /// Start time
    pub start_time: std::time::Instant,
}

impl AppState {
    /// Wire collaborators and spawn the alert service and detector pipelines
    pub fn start(settings: &Settings, metrics: Option<PrometheusHandle>) -> Result<Self, ApiError> {
        let contacts = Arc::new(match settings.contact.clone() {
            Some(contact) => InMemoryContactStore::with_contact(contact)?,
            None => InMemoryContactStore::new(),
        });
        let status = Arc::new(StatusBoard::new());
        let dispatcher = Arc::new(LoggingDispatcher::new());
        let alarm = Arc::new(LoggingAlarm::default());

        let sinks = Collaborators {
            contacts: contacts.clone(),
            location: Arc::new(StaticLocation(settings.location)),
            dispatch: dispatcher.clone(),
            status: status.clone(),
            alarm: alarm.clone(),
        };

        let (alerts, _service) = AlertService::spawn(settings.alerts.clone(), sinks);
        let fusion = EventFusion::spawn(
            settings.fusion.clone(),
            settings.dms.clone(),
            settings.motion.clone(),
            alerts.clone(),
        );

        Ok(Self {
            alerts,
            fusion,
            contacts,
            status,
            dispatcher,
            alarm,
            metrics,
            version: env!("CARGO_PKG_VERSION").to_string(),
            start_time: std::time::Instant::now(),
        })
    }

    /// Drain the detector pipelines, then stop the alert service
    pub async fn shutdown(self) {
        self.fusion.shutdown().await;
        if let Err(e) = self.alerts.shutdown().await {
            warn!("Alert service already stopped: {}", e);
        }
    }
}

/// Health response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: u64,
    pub version: String,
    pub uptime_seconds: u64,
    pub contact_configured: bool,
    pub components: ComponentStatus,
}

/// Component status
#[derive(Debug, Serialize)]
pub struct ComponentStatus {
    pub alerting: ComponentHealth,
    pub camera: SourceHealth,
    pub imu: SourceHealth,
}

/// Individual component health
#[derive(Debug, Serialize)]
pub struct ComponentHealth {
    pub status: String,
}

/// Detector source counters
#[derive(Debug, Serialize)]
pub struct SourceHealth {
    pub processed: u64,
    pub events: u64,
    pub dropped: u64,
}

/// Create the application router
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/v1/health", get(health_handler))
        .route("/api/v1/status", get(routes::status::get_status))
        .route("/api/v1/alerts", get(routes::alerts::get_alerts))
        .route("/api/v1/alerts/cancel", post(routes::alerts::cancel_alert))
        .route(
            "/api/v1/contact",
            get(routes::contact::get_contact).put(routes::contact::put_contact),
        )
        .route("/api/v1/observations/face", post(routes::observations::post_face))
        .route("/api/v1/observations/motion", post(routes::observations::post_motion))
        .route("/metrics", get(metrics_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Health check handler
async fn health_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let timestamp = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);

    let alerting_up = !state.alerts.is_closed();
    let stats = state.fusion.stats();
    let source = |s: &event_fusion::SourceStats| SourceHealth {
        processed: s.processed(),
        events: s.events(),
        dropped: s.dropped(),
    };

    let response = HealthResponse {
        status: if alerting_up { "healthy" } else { "degraded" }.to_string(),
        timestamp,
        version: state.version.clone(),
        uptime_seconds: state.start_time.elapsed().as_secs(),
        contact_configured: state.contacts.load().is_some(),
        components: ComponentStatus {
            alerting: ComponentHealth {
                status: if alerting_up { "ok" } else { "stopped" }.to_string(),
            },
            camera: source(&stats.camera),
            imu: source(&stats.imu),
        },
    };

    Json(response)
}

/// Prometheus scrape endpoint
async fn metrics_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    match &state.metrics {
        Some(handle) => (StatusCode::OK, handle.render()),
        None => (StatusCode::NOT_FOUND, "metrics recorder not installed".to_string()),
    }
}

/// Initialize logging
pub fn init_logging(
    level: &str,
    json: bool,
) -> Result<(), tracing::subscriber::SetGlobalDefaultError> {
    let parsed = level.parse::<Level>().ok();
    let max_level = parsed.unwrap_or(Level::INFO);

    let result = if json {
        let subscriber = FmtSubscriber::builder()
            .with_max_level(max_level)
            .with_target(true)
            .json()
            .finish();
        tracing::subscriber::set_global_default(subscriber)
    } else {
        let subscriber = FmtSubscriber::builder()
            .with_max_level(max_level)
            .with_target(true)
            .finish();
        tracing::subscriber::set_global_default(subscriber)
    };

    if parsed.is_none() {
        warn!("Unknown log level '{}', using info", level);
    }
    result
}

/// Run the server until ctrl-c, then cancel any pending countdown
pub async fn run_server(state: Arc<AppState>, addr: &str) -> anyhow::Result<()> {
    let app = create_router(state.clone());

    info!("Starting API server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped, shutting down pipelines");
    match Arc::try_unwrap(state) {
        Ok(state) => state.shutdown().await,
        Err(state) => {
            warn!("Application state still shared, stopping alert service only");
            if let Err(e) = state.alerts.shutdown().await {
                warn!("Alert service already stopped: {}", e);
            }
        }
    }
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for ctrl-c: {}", e);
        std::future::pending::<()>().await;
    }
}

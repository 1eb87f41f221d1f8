//! HTTP front end for the signal array.
//!
//! This module provides an HTTP server that:
//! - Accepts sensor readings pushed by platform adapters via POST /readings
//! - Starts and stops scans and ticks the controller in the background
//! - Serves anomalies, interpretations, transmissions and the activity log
//!
//! # Architecture
//!
//! ```text
//! Sensor adapter ──→ POST /readings ──→ feeds ──→ ScanController ──→ anomalies
//!                                                     ↑
//!                                             [tick every 500 ms]
//! ```

use crate::activity::{ActivityEntry, EntryKind};
use crate::config::Config;
use crate::core::{Anomaly, AnomalyId};
use crate::interpret::{
    fallback_interpretation, Interpretation, InterpretationSource, MessagesClient,
};
use crate::sensor::{Reading, SensorArray, SensorFeeds};
use crate::session::{ScanController, ScanError, StatusReport};
use crate::transmit::{preview, Encoding, TransmitError};
use axum::{
    extract::{Path, Query, State},
    http::{HeaderValue, StatusCode},
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::Mutex;
use tower_http::cors::{Any, CorsLayer};

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Port to bind to (0 for random)
    pub port: u16,
    /// Array configuration
    pub app: Config,
}

impl ServerConfig {
    pub fn new(port: u16, app: Config) -> Self {
        Self { port, app }
    }
}

/// Shared server state
pub struct ServerState {
    controller: Mutex<ScanController>,
    /// Push side of every enabled sensor
    feeds: SensorFeeds,
    /// Remote interpreter, when an API key is configured
    interpreter: Option<MessagesClient>,
    check_interval: Duration,
}

impl ServerState {
    pub fn new(config: &ServerConfig) -> Self {
        let (array, feeds) = SensorArray::channel_backed(&config.app.sensors);
        let interpreter = match MessagesClient::new(config.app.interpreter.clone()) {
            Ok(client) => {
                tracing::info!("Remote interpreter enabled at {}", client.endpoint());
                Some(client)
            }
            Err(e) => {
                tracing::warn!("Remote interpreter disabled: {}", e);
                None
            }
        };

        Self {
            controller: Mutex::new(ScanController::new(config.app.clone(), array)),
            feeds,
            interpreter,
            check_interval: config.app.detection.check_interval,
        }
    }
}

/// Health check response
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

/// Error response
#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

type ApiError = (StatusCode, Json<ErrorResponse>);

fn api_error(status: StatusCode, code: &str, error: impl ToString) -> ApiError {
    (
        status,
        Json(ErrorResponse {
            error: error.to_string(),
            code: code.to_string(),
        }),
    )
}

fn scan_error(e: ScanError) -> ApiError {
    match e {
        ScanError::AlreadyScanning => api_error(StatusCode::CONFLICT, "ALREADY_SCANNING", e),
        ScanError::NotScanning => api_error(StatusCode::CONFLICT, "NOT_SCANNING", e),
        ScanError::UnknownAnomaly(_) => api_error(StatusCode::NOT_FOUND, "UNKNOWN_ANOMALY", e),
    }
}

/// Response to scan start/stop
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanResponse {
    pub scanning: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_secs: Option<u64>,
}

/// Batch of pushed readings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadingsRequest {
    pub readings: Vec<Reading>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReadingsResponse {
    /// Delivered to a running sensor
    pub accepted: usize,
    /// Dropped because the sensor is not running
    pub ignored: usize,
    /// Dropped because the sensor is disabled or the feed failed
    pub rejected: usize,
}

/// An anomaly with its latest interpretation
#[derive(Debug, Clone, Serialize)]
pub struct AnomalyView {
    #[serde(flatten)]
    pub anomaly: Anomaly,
    pub signal_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub interpretation: Option<Interpretation>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransmitRequest {
    pub message: String,
    #[serde(default)]
    pub encoding: Encoding,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransmitResponse {
    pub encoding: Encoding,
    pub symbols: String,
    pub duration_ms: u64,
    pub tones: usize,
    pub preview: Vec<f64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LogQuery {
    pub kind: Option<String>,
}

/// GET /health
async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// GET /status
async fn status(State(state): State<Arc<ServerState>>) -> Json<StatusReport> {
    let mut controller = state.controller.lock().await;
    Json(controller.status(Utc::now()))
}

/// POST /scan/start
async fn start_scan(
    State(state): State<Arc<ServerState>>,
) -> Result<Json<ScanResponse>, ApiError> {
    let mut controller = state.controller.lock().await;
    controller.start_scan(Utc::now()).map_err(scan_error)?;
    Ok(Json(ScanResponse {
        scanning: true,
        duration_secs: None,
    }))
}

/// POST /scan/stop
async fn stop_scan(
    State(state): State<Arc<ServerState>>,
) -> Result<Json<ScanResponse>, ApiError> {
    let mut controller = state.controller.lock().await;
    let elapsed = controller.stop_scan(Utc::now()).map_err(scan_error)?;
    Ok(Json(ScanResponse {
        scanning: false,
        duration_secs: Some(elapsed.as_secs()),
    }))
}

/// POST /readings
///
/// Readings for sensors that are not running are dropped, matching what a
/// platform callback would do between scans.
async fn push_readings(
    State(state): State<Arc<ServerState>>,
    Json(request): Json<ReadingsRequest>,
) -> Json<ReadingsResponse> {
    let mut response = ReadingsResponse::default();
    for reading in request.readings {
        let kind = reading.kind();
        match state.feeds.get(&kind).map(|feed| feed.push(reading)) {
            Some(Ok(true)) => response.accepted += 1,
            Some(Ok(false)) => response.ignored += 1,
            Some(Err(e)) => {
                tracing::debug!("Reading rejected: {}", e);
                response.rejected += 1;
            }
            None => {
                tracing::debug!("Reading for disabled {} sensor rejected", kind);
                response.rejected += 1;
            }
        }
    }
    Json(response)
}

/// GET /anomalies
async fn list_anomalies(State(state): State<Arc<ServerState>>) -> Json<Vec<AnomalyView>> {
    let controller = state.controller.lock().await;
    let views = controller
        .anomalies()
        .iter()
        .map(|a| AnomalyView {
            anomaly: a.clone(),
            signal_id: a.id.to_string(),
            interpretation: controller.interpretation(a.id).cloned(),
        })
        .collect();
    Json(views)
}

/// POST /anomalies/:id/interpret
///
/// The remote call runs without holding the controller lock. The result is
/// recorded only if the anomaly is still in the log.
async fn interpret_anomaly(
    State(state): State<Arc<ServerState>>,
    Path(id): Path<String>,
) -> Result<Json<Interpretation>, ApiError> {
    let id: AnomalyId = id.parse().map_err(|_| {
        api_error(
            StatusCode::BAD_REQUEST,
            "INVALID_ID",
            format!("Invalid signal id '{id}'"),
        )
    })?;

    let summary = {
        let mut controller = state.controller.lock().await;
        controller
            .begin_interpretation(id, Utc::now())
            .map_err(scan_error)?
    };

    let interpretation = match &state.interpreter {
        Some(client) => match client.interpret(&summary).await {
            Ok(text) => Interpretation::new(id, InterpretationSource::Remote, text),
            Err(e) => {
                tracing::warn!("Interpretation of {} failed, using local analysis: {}", id, e);
                fallback_interpretation(&summary)
            }
        },
        None => fallback_interpretation(&summary),
    };

    let mut controller = state.controller.lock().await;
    controller.record_interpretation(interpretation.clone(), Utc::now());
    Ok(Json(interpretation))
}

/// POST /transmit
///
/// Responds as soon as the message is encoded; completion is logged once
/// the tone plan would have finished playing.
async fn transmit(
    State(state): State<Arc<ServerState>>,
    Json(request): Json<TransmitRequest>,
) -> Result<Json<TransmitResponse>, ApiError> {
    let tx = {
        let mut controller = state.controller.lock().await;
        controller
            .begin_transmission(&request.message, request.encoding, Utc::now())
            .map_err(|e| match e {
                TransmitError::EmptyMessage => {
                    api_error(StatusCode::BAD_REQUEST, "EMPTY_MESSAGE", e)
                }
                other => api_error(StatusCode::INTERNAL_SERVER_ERROR, "TRANSMIT_ERROR", other),
            })?
    };

    let duration = tx.duration();
    let completion = Arc::clone(&state);
    tokio::spawn(async move {
        tokio::time::sleep(duration).await;
        completion
            .controller
            .lock()
            .await
            .complete_transmission(Utc::now());
    });

    Ok(Json(TransmitResponse {
        encoding: tx.encoding(),
        symbols: tx.encoded.symbols(),
        duration_ms: duration.as_millis() as u64,
        tones: tx.plan.tone_count(),
        preview: preview(&tx.message, tx.encoding()),
    }))
}

/// GET /log
async fn get_log(
    State(state): State<Arc<ServerState>>,
    Query(query): Query<LogQuery>,
) -> Result<Json<Vec<ActivityEntry>>, ApiError> {
    let kind = match query.kind.as_deref() {
        None | Some("all") => None,
        Some(k) => Some(
            k.parse::<EntryKind>()
                .map_err(|e| api_error(StatusCode::BAD_REQUEST, "INVALID_KIND", e))?,
        ),
    };
    let controller = state.controller.lock().await;
    Ok(Json(
        controller
            .activity()
            .filter(kind)
            .into_iter()
            .cloned()
            .collect(),
    ))
}

/// DELETE /log
async fn clear_log(State(state): State<Arc<ServerState>>) -> Json<Vec<ActivityEntry>> {
    let mut controller = state.controller.lock().await;
    controller.clear_log(Utc::now());
    Json(controller.activity().to_vec())
}

/// Tick the controller while a scan runs.
async fn tick_loop(state: Arc<ServerState>) {
    let mut interval = tokio::time::interval(state.check_interval);
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
    loop {
        interval.tick().await;
        let mut controller = state.controller.lock().await;
        if controller.is_scanning() {
            let flagged = controller.tick(Utc::now());
            if !flagged.is_empty() {
                tracing::debug!("Tick flagged {} anomalies", flagged.len());
            }
        }
    }
}

/// Build the router for `state`.
pub fn router(state: Arc<ServerState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/status", get(status))
        .route("/scan/start", post(start_scan))
        .route("/scan/stop", post(stop_scan))
        .route("/readings", post(push_readings))
        .route("/anomalies", get(list_anomalies))
        .route("/anomalies/:id/interpret", post(interpret_anomaly))
        .route("/transmit", post(transmit))
        .route("/log", get(get_log).delete(clear_log))
        .layer(
            CorsLayer::new()
                .allow_origin([
                    HeaderValue::from_static("http://localhost"),
                    HeaderValue::from_static("http://127.0.0.1"),
                ])
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}

/// Run the HTTP server
pub async fn run(
    config: ServerConfig,
) -> anyhow::Result<(SocketAddr, tokio::sync::oneshot::Sender<()>)> {
    let state = Arc::new(ServerState::new(&config));
    let app = router(Arc::clone(&state));

    let addr = SocketAddr::from(([127, 0, 0, 1], config.port));
    let listener = TcpListener::bind(addr).await?;
    let actual_addr = listener.local_addr()?;

    tracing::info!("CosmicLink server listening on http://{}", actual_addr);

    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();

    tokio::spawn(async move {
        let ticker = tokio::spawn(tick_loop(state));
        if let Err(e) = axum::serve(listener, app)
            .with_graceful_shutdown(async {
                let _ = shutdown_rx.await;
                tracing::info!("Server shutdown signal received");
            })
            .await
        {
            tracing::error!("Server error: {}", e);
        }
        ticker.abort();
    });

    Ok((actual_addr, shutdown_tx))
}

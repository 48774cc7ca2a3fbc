//! ---
//! fao_section: "05-networking-external-interfaces"
//! fao_subsection: "module"
//! fao_type: "source"
//! fao_scope: "code"
//! fao_description: "HTTP surface exposing the factory services."
//! fao_version: "v0.1.0"
//! fao_owner: "tbd"
//! ---

use std::fmt;
use std::net::{SocketAddr, TcpListener as StdTcpListener};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, get_service, post};
use axum::{Json, Router};
use fao_common::config::FactoryLayout;
use fao_core::{AnalyzedInsight, CostBenefitLookup, DigitalTwinSnapshot, DroneStatus, FactoryState, InspectionResult};
use fao_sim::SimulationReport;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

pub const BANNER: &str = "FactoryAIOptimize System is Running!";
const DEFAULT_SIMULATION_HOURS: f64 = 8.0;
const DEFAULT_SIMULATION_SPEED: f64 = 1.0;

/// Shared API state exposed to handlers.
pub struct ApiState {
    factory: Arc<FactoryState>,
    start: Instant,
}

impl ApiState {
    pub fn new(factory: Arc<FactoryState>) -> Self {
        Self {
            factory,
            start: Instant::now(),
        }
    }

    pub fn factory(&self) -> &FactoryState {
        &self.factory
    }

    fn config_summary(&self) -> ConfigSummary {
        let config = self.factory.config();
        ConfigSummary {
            cameras: config.cameras.iter().map(|camera| camera.id.clone()).collect(),
            drones: config.drones.iter().map(|drone| drone.id.clone()).collect(),
            ai_model: config.ai.model.clone(),
        }
    }
}

impl fmt::Debug for ApiState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiState")
            .field("uptime_seconds", &self.start.elapsed().as_secs())
            .finish_non_exhaustive()
    }
}

/// Handle to the running API server.
#[derive(Debug)]
pub struct ApiServer {
    addr: SocketAddr,
    shutdown: Option<oneshot::Sender<()>>,
    task: JoinHandle<Result<()>>,
}

impl ApiServer {
    /// Bound address; differs from the requested one when port 0 was asked for.
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub async fn shutdown(mut self) -> Result<()> {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        match self.task.await {
            Ok(result) => result,
            Err(err) => Err(err.into()),
        }
    }
}

pub fn build_router(state: Arc<ApiState>, static_dir: Option<PathBuf>) -> Router {
    let api_routes = Router::new()
        .route("/health", get(get_health))
        .route("/analyze", post(post_analyze))
        .route("/digital-twin", get(get_digital_twin))
        .route("/digital-twin/photogrammetry", post(post_photogrammetry))
        .route("/drone-inspect", post(post_drone_inspect))
        .route("/drones", get(get_drones))
        .route("/simulate-production", post(post_simulate_production))
        .route("/cost-benefit/:suggestion_id", get(get_cost_benefit))
        .route("/config", get(get_config))
        .route("/factory-layout", get(get_factory_layout))
        .with_state(state);

    let router = match static_dir {
        Some(dir) => {
            let service = get_service(ServeDir::new(dir).append_index_html_on_directories(true));
            Router::new().merge(api_routes).fallback_service(service)
        }
        None => api_routes.route("/", get(get_banner)),
    };
    router.layer(TraceLayer::new_for_http())
}

/// Spawn the HTTP API with optional static dashboard hosting.
pub fn spawn_api_server(
    state: Arc<ApiState>,
    addr: SocketAddr,
    static_dir: Option<PathBuf>,
) -> Result<ApiServer> {
    let router = build_router(state, static_dir);

    let listener = StdTcpListener::bind(addr)
        .with_context(|| format!("failed to bind API listener {addr}"))?;
    listener
        .set_nonblocking(true)
        .context("failed to configure API listener as non-blocking")?;
    let addr = listener
        .local_addr()
        .context("failed to read bound API address")?;
    let tcp_listener =
        TcpListener::from_std(listener).context("failed to create tokio listener")?;

    let (shutdown_tx, shutdown_rx) = oneshot::channel();
    let handle: JoinHandle<Result<()>> = tokio::spawn(async move {
        info!(address = %addr, "api server listening");
        if let Err(err) = axum::serve(tcp_listener, router)
            .with_graceful_shutdown(async move {
                let _ = shutdown_rx.await;
            })
            .await
        {
            error!(address = %addr, error = %err, "api server exited with error");
            return Err(err.into());
        }
        Ok(())
    });

    Ok(ApiServer {
        addr,
        shutdown: Some(shutdown_tx),
        task: handle,
    })
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    uptime_seconds: u64,
}

#[derive(Debug, Serialize)]
struct AnalyzeResponse {
    status: &'static str,
    insights: Vec<AnalyzedInsight>,
}

#[derive(Debug, Serialize)]
struct AppliedResponse {
    applied: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ConfigSummary {
    cameras: Vec<String>,
    drones: Vec<String>,
    ai_model: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InspectRequest {
    area: String,
    #[serde(default)]
    drone_id: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct SimulateRequest {
    #[serde(default)]
    hours: Option<f64>,
    #[serde(default)]
    speed: Option<f64>,
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

/// Every failure is reported as a 500 with `"<context>: <message>"`.
#[derive(Debug)]
struct ApiError {
    message: String,
}

impl ApiError {
    fn new(context: &str, err: impl fmt::Display) -> Self {
        Self {
            message: format!("{context}: {err}"),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        warn!(error = %self.message, "request failed");
        let body = Json(ErrorResponse {
            error: self.message,
        });
        (StatusCode::INTERNAL_SERVER_ERROR, body).into_response()
    }
}

async fn get_banner() -> &'static str {
    BANNER
}

async fn get_health(State(state): State<Arc<ApiState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        uptime_seconds: state.start.elapsed().as_secs(),
    })
}

async fn post_analyze(State(state): State<Arc<ApiState>>) -> Json<AnalyzeResponse> {
    let insights = state.factory.analyze_factory().await;
    Json(AnalyzeResponse {
        status: "success",
        insights,
    })
}

async fn get_digital_twin(State(state): State<Arc<ApiState>>) -> Json<DigitalTwinSnapshot> {
    Json(state.factory.digital_twin())
}

async fn post_photogrammetry(
    State(state): State<Arc<ApiState>>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Json<AppliedResponse>, ApiError> {
    let Json(payload) = payload
        .map_err(|err| ApiError::new("Photogrammetry integration failed", err.body_text()))?;
    state.factory.integrate_photogrammetry(payload);
    Ok(Json(AppliedResponse { applied: true }))
}

async fn post_drone_inspect(
    State(state): State<Arc<ApiState>>,
    payload: Result<Json<InspectRequest>, JsonRejection>,
) -> Result<Json<InspectionResult>, ApiError> {
    let Json(request) =
        payload.map_err(|err| ApiError::new("Drone inspection failed", err.body_text()))?;
    state
        .factory
        .inspect_area(&request.area, request.drone_id.as_deref())
        .await
        .map(Json)
        .map_err(|err| ApiError::new("Drone inspection failed", err))
}

async fn get_drones(State(state): State<Arc<ApiState>>) -> Json<Vec<DroneStatus>> {
    Json(state.factory.fleet_status())
}

async fn post_simulate_production(
    State(state): State<Arc<ApiState>>,
    payload: Option<Json<SimulateRequest>>,
) -> Json<SimulationReport> {
    let request = payload.map(|Json(request)| request).unwrap_or_default();
    let hours = request.hours.unwrap_or(DEFAULT_SIMULATION_HOURS);
    let speed = request.speed.unwrap_or(DEFAULT_SIMULATION_SPEED);
    Json(state.factory.simulate_production(hours, speed))
}

async fn get_cost_benefit(
    State(state): State<Arc<ApiState>>,
    Path(suggestion_id): Path<String>,
) -> Result<Json<CostBenefitLookup>, ApiError> {
    state
        .factory
        .cost_benefit(&suggestion_id)
        .map(Json)
        .map_err(|err| ApiError::new("Cost analysis failed", err))
}

async fn get_config(State(state): State<Arc<ApiState>>) -> Json<ConfigSummary> {
    Json(state.config_summary())
}

async fn get_factory_layout(State(state): State<Arc<ApiState>>) -> Json<FactoryLayout> {
    Json(state.factory.config().factory_layout.clone())
}

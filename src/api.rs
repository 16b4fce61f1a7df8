//! HTTP configuration API
//!
//! Lets tests steer the simulator at runtime: replace a kind's lifecycle
//! configuration, force failures, delays or success on individual resources,
//! and read aggregate status.
//!
//! # Routes
//!
//! All routes live under `/api/v1`:
//!
//! - `GET /config` - full configuration
//! - `POST /config/{kind}` - replace one kind's configuration
//! - `POST /overrides/{kind}/{namespace}/{name}/failure` - force a failure
//! - `POST /overrides/{kind}/{namespace}/{name}/delay` - force a delay
//! - `POST /overrides/{kind}/{namespace}/{name}/success` - force success
//! - `DELETE /overrides/{kind}/{namespace}/{name}` - clear one override
//! - `GET /overrides` - list overrides
//! - `POST /reset` - clear every override
//! - `GET /status` - health, uptime and resource counts
//!
//! Every mutation goes through [`BehaviorEngine`]; the API holds no state of
//! its own besides its start time.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::json;
use thiserror::Error;
use tracing::{debug, info};

use crate::behavior::{BehaviorEngine, OverrideEntry};
use crate::config::{FailureScenario, KindConfig, SimulatorConfig};
use crate::controller::{KindCounts, ResourceTracker};
use crate::error::ErrorClass;
use crate::kind::{ResourceKey, ResourceKind};

/// Configuration API errors
#[derive(Debug, Error)]
pub enum ApiError {
    /// Path named a kind the simulator does not know
    #[error("unknown resource kind: {0}")]
    UnknownKind(String),

    /// Request body could not be decoded
    #[error("invalid request body: {0}")]
    InvalidBody(String),

    /// Error raised by the simulator core
    #[error(transparent)]
    Simulator(#[from] crate::Error),
}

impl ApiError {
    fn class(&self) -> ErrorClass {
        match self {
            ApiError::UnknownKind(_) => ErrorClass::NotFound,
            ApiError::InvalidBody(_) => ErrorClass::InvalidConfiguration,
            ApiError::Simulator(e) => e.class(),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::InvalidBody(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let class = self.class();
        let status = match class {
            ErrorClass::InvalidConfiguration => StatusCode::BAD_REQUEST,
            ErrorClass::NotFound => StatusCode::NOT_FOUND,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };

        (
            status,
            Json(json!({"error": self.to_string(), "class": class.as_str()})),
        )
            .into_response()
    }
}

/// State shared by all handlers
pub struct ApiState {
    engine: Arc<BehaviorEngine>,
    tracker: Arc<ResourceTracker>,
    started: Instant,
}

impl ApiState {
    /// Create API state over the engine and tracker the controllers use
    pub fn new(engine: Arc<BehaviorEngine>, tracker: Arc<ResourceTracker>) -> Self {
        Self {
            engine,
            tracker,
            started: Instant::now(),
        }
    }
}

/// Body of the delay override route
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DelayRequest {
    /// Delay to force, in seconds
    pub delay_seconds: u64,
}

/// Response of `GET /status`
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusResponse {
    /// Always true while the process serves requests
    pub healthy: bool,
    /// Uptime, e.g. `1h2m3s`
    pub uptime: String,
    /// Uptime in whole seconds
    pub uptime_seconds: u64,
    /// Number of active overrides
    pub overrides: usize,
    /// Tracked resources per kind
    pub resources: BTreeMap<String, KindCounts>,
}

type ApiResult<T> = Result<Json<T>, ApiError>;

fn parse_kind(kind: &str) -> Result<ResourceKind, ApiError> {
    kind.parse()
        .map_err(|_| ApiError::UnknownKind(kind.to_string()))
}

fn resource_key(kind: &str, namespace: String, name: String) -> Result<ResourceKey, ApiError> {
    Ok(ResourceKey::new(parse_kind(kind)?, namespace, name))
}

fn ack(status: &str) -> Json<serde_json::Value> {
    Json(json!({ "status": status }))
}

/// Render `d` like `1h2m3s`, omitting leading zero units
pub fn format_uptime(d: Duration) -> String {
    let secs = d.as_secs();
    let (h, m, s) = (secs / 3600, (secs % 3600) / 60, secs % 60);
    match (h, m) {
        (0, 0) => format!("{s}s"),
        (0, _) => format!("{m}m{s}s"),
        _ => format!("{h}h{m}m{s}s"),
    }
}

async fn get_config(State(state): State<Arc<ApiState>>) -> Json<SimulatorConfig> {
    Json(state.engine.config().as_ref().clone())
}

async fn update_config(
    State(state): State<Arc<ApiState>>,
    Path(kind): Path<String>,
    payload: Result<Json<KindConfig>, JsonRejection>,
) -> ApiResult<serde_json::Value> {
    let kind = parse_kind(&kind)?;
    let Json(config) = payload?;
    debug!(%kind, states = config.states.len(), "configuration update requested");

    state.engine.update_config(kind, config)?;
    Ok(ack("updated"))
}

async fn set_failure(
    State(state): State<Arc<ApiState>>,
    Path((kind, namespace, name)): Path<(String, String, String)>,
    payload: Result<Json<FailureScenario>, JsonRejection>,
) -> ApiResult<serde_json::Value> {
    let key = resource_key(&kind, namespace, name)?;
    let Json(scenario) = payload?;

    state
        .engine
        .amend_override(key, |o| o.force_fail = Some(scenario));
    Ok(ack("failure set"))
}

async fn set_delay(
    State(state): State<Arc<ApiState>>,
    Path((kind, namespace, name)): Path<(String, String, String)>,
    payload: Result<Json<DelayRequest>, JsonRejection>,
) -> ApiResult<serde_json::Value> {
    let key = resource_key(&kind, namespace, name)?;
    let Json(request) = payload?;

    state
        .engine
        .amend_override(key, |o| o.delay_seconds = Some(request.delay_seconds));
    Ok(ack("delay set"))
}

async fn set_success(
    State(state): State<Arc<ApiState>>,
    Path((kind, namespace, name)): Path<(String, String, String)>,
) -> ApiResult<serde_json::Value> {
    let key = resource_key(&kind, namespace, name)?;
    state.engine.amend_override(key, |o| o.force_success = true);
    Ok(ack("forced success set"))
}

async fn clear_override(
    State(state): State<Arc<ApiState>>,
    Path((kind, namespace, name)): Path<(String, String, String)>,
) -> ApiResult<serde_json::Value> {
    let key = resource_key(&kind, namespace, name)?;
    state.engine.clear_override(&key);
    Ok(ack("override cleared"))
}

async fn list_overrides(State(state): State<Arc<ApiState>>) -> Json<Vec<OverrideEntry>> {
    Json(state.engine.overrides())
}

async fn reset(State(state): State<Arc<ApiState>>) -> Json<serde_json::Value> {
    let cleared = state.engine.clear_all_overrides();
    info!(cleared, "overrides reset");
    ack("all overrides cleared")
}

async fn status(State(state): State<Arc<ApiState>>) -> Json<StatusResponse> {
    let uptime = state.started.elapsed();
    let resources = state
        .tracker
        .counts()
        .into_iter()
        .map(|(kind, counts)| (kind.path_segment().to_string(), counts))
        .collect();

    Json(StatusResponse {
        healthy: true,
        uptime: format_uptime(uptime),
        uptime_seconds: uptime.as_secs(),
        overrides: state.engine.override_count(),
        resources,
    })
}

/// Create the configuration API router
pub fn api_router(state: Arc<ApiState>) -> Router {
    Router::new()
        .route("/api/v1/config", get(get_config))
        .route("/api/v1/config/{kind}", post(update_config))
        .route("/api/v1/overrides", get(list_overrides))
        .route(
            "/api/v1/overrides/{kind}/{namespace}/{name}",
            axum::routing::delete(clear_override),
        )
        .route(
            "/api/v1/overrides/{kind}/{namespace}/{name}/failure",
            post(set_failure),
        )
        .route(
            "/api/v1/overrides/{kind}/{namespace}/{name}/delay",
            post(set_delay),
        )
        .route(
            "/api/v1/overrides/{kind}/{namespace}/{name}/success",
            post(set_success),
        )
        .route("/api/v1/reset", post(reset))
        .route("/api/v1/status", get(status))
        .with_state(state)
}

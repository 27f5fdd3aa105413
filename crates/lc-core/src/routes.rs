//! HTTP transport for the Stateless Core Service (§4.9). A thin axum
//! façade over [`crate::service`] — every handler's body is "deserialize,
//! call the pure service function, serialize" with no orchestration logic
//! of its own, per SPEC_FULL §9's "collapse the adapter layer" note.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use axum::routing::post;
use axum::Router;

use lc_domain::error::Error as CoreError;
use lc_providers::registry::ModelRegistry;

use crate::contracts::{AnalyzeRequest, DiscussRequest, ReEvaluateRequest};
use crate::service;

#[derive(Clone)]
pub struct CoreState {
    pub registry: Arc<ModelRegistry>,
}

/// Wraps [`lc_domain::error::Error`] for the HTTP boundary, mapping the
/// taxonomy in SPEC_FULL §7 onto status codes: `ValidationError` -> 400,
/// everything else (provider/transport/coordination failures) -> the
/// matching 5xx so the Platform client's retry-with-backoff policy kicks in.
struct ApiError(CoreError);

impl From<CoreError> for ApiError {
    fn from(e: CoreError) -> Self {
        ApiError(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self.0 {
            CoreError::Validation(_) => (StatusCode::BAD_REQUEST, self.0.to_string()),
            CoreError::Coordination { .. } => (StatusCode::BAD_GATEWAY, self.0.to_string()),
            CoreError::Timeout(_) => (StatusCode::GATEWAY_TIMEOUT, self.0.to_string()),
            CoreError::Provider { .. } | CoreError::Http(_) => (StatusCode::BAD_GATEWAY, self.0.to_string()),
            _ => (StatusCode::INTERNAL_SERVER_ERROR, self.0.to_string()),
        };
        (status, Json(serde_json::json!({ "error": message }))).into_response()
    }
}

pub fn router(registry: Arc<ModelRegistry>) -> Router {
    Router::new()
        .route("/v1/analyze", post(analyze))
        .route("/v1/discuss", post(discuss))
        .route("/v1/re-evaluate-finding", post(re_evaluate_finding))
        .with_state(CoreState { registry })
}

async fn analyze(State(state): State<CoreState>, Json(req): Json<AnalyzeRequest>) -> Result<impl IntoResponse, ApiError> {
    let resp = service::analyze(&state.registry, req).await?;
    Ok(Json(resp))
}

async fn discuss(State(state): State<CoreState>, Json(req): Json<DiscussRequest>) -> Result<impl IntoResponse, ApiError> {
    let resp = service::discuss(&state.registry, req).await?;
    Ok(Json(resp))
}

async fn re_evaluate_finding(
    State(state): State<CoreState>,
    Json(req): Json<ReEvaluateRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let resp = service::re_evaluate(&state.registry, req).await?;
    Ok(Json(resp))
}

// REST handlers: machines, selection, test input, chart

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Deserialize;

use super::AppState;
use crate::aggregator::AggregatorError;
use crate::models::{Axis, FaultScenario, MachineDraft};
use crate::version::{NAME, VERSION};

/// Maps aggregator errors to status codes with a `{"error": ...}` body.
pub(super) struct ApiError(AggregatorError);

impl From<AggregatorError> for ApiError {
    fn from(e: AggregatorError) -> Self {
        Self(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match self.0 {
            AggregatorError::EmptyName => StatusCode::BAD_REQUEST,
            AggregatorError::UnknownMachine(_) => StatusCode::NOT_FOUND,
            AggregatorError::NoSelection => StatusCode::CONFLICT,
        };
        (
            status,
            Json(serde_json::json!({ "error": self.0.to_string() })),
        )
            .into_response()
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct SelectRequest {
    machine_id: String,
    #[serde(default)]
    axis: Axis,
}

#[derive(Debug, Deserialize)]
pub(super) struct AxisRequest {
    axis: Axis,
}

#[derive(Debug, Deserialize)]
pub(super) struct TestInputRequest {
    scenario: FaultScenario,
}

/// GET /version: returns service name and version (from Cargo.toml at build time).
pub(super) async fn version_handler() -> impl IntoResponse {
    Json(serde_json::json!({
        "name": NAME,
        "version": VERSION,
    }))
}

/// GET /api/machines: every machine with status and history, plus the selection.
pub(super) async fn list_machines(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.service.view().await)
}

pub(super) async fn get_machine(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    state
        .service
        .machine(&id)
        .await
        .map(Json)
        .ok_or_else(|| AggregatorError::UnknownMachine(id).into())
}

/// POST /api/machines: registers upstream first, bounded by
/// `feed.registration_timeout_ms`; on timeout or failure the machine is added with a local id.
pub(super) async fn add_machine(
    State(state): State<AppState>,
    Json(draft): Json<MachineDraft>,
) -> Result<impl IntoResponse, ApiError> {
    let machine = state.service.add_machine(draft).await?;
    Ok((StatusCode::CREATED, Json(machine)))
}

pub(super) async fn remove_machine(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    state.service.remove_machine(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// PUT /api/selection: focus a machine; its chart restarts from an empty window.
pub(super) async fn select_machine(
    State(state): State<AppState>,
    Json(req): Json<SelectRequest>,
) -> Result<StatusCode, ApiError> {
    state.service.select(&req.machine_id, req.axis).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub(super) async fn clear_selection(State(state): State<AppState>) -> StatusCode {
    state.service.clear_selection().await;
    StatusCode::NO_CONTENT
}

pub(super) async fn set_axis(
    State(state): State<AppState>,
    Json(req): Json<AxisRequest>,
) -> Result<StatusCode, ApiError> {
    state.service.set_axis(req.axis).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/test-input: switch the simulated fault for the selected machine.
/// Upstream delivery is best-effort; the response does not wait for it.
pub(super) async fn set_test_input(
    State(state): State<AppState>,
    Json(req): Json<TestInputRequest>,
) -> Result<StatusCode, ApiError> {
    state.service.set_test_input(req.scenario).await?;
    Ok(StatusCode::ACCEPTED)
}

pub(super) async fn chart_handler(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.service.chart_view().await)
}

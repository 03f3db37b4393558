// HTTP + WebSocket routes

mod http;
mod ws;

use axum::{
    Router,
    routing::{get, post, put},
};
use std::sync::Arc;
use std::sync::atomic::AtomicUsize;
use tower_http::cors::{Any, CorsLayer};

use crate::service::MonitorService;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) service: Arc<MonitorService>,
    pub(crate) ws_connections: Arc<AtomicUsize>,
}

pub fn app(service: Arc<MonitorService>, ws_connections: Arc<AtomicUsize>) -> Router {
    let state = AppState {
        service,
        ws_connections,
    };
    Router::new()
        .route("/", get(|| async { "machine-monitor: vibration dashboard feed" })) // GET /
        .route("/version", get(http::version_handler)) // GET /version
        .route(
            "/api/machines",
            get(http::list_machines).post(http::add_machine),
        ) // GET, POST /api/machines
        .route(
            "/api/machines/{id}",
            get(http::get_machine).delete(http::remove_machine),
        ) // GET, DELETE /api/machines/{id}
        .route(
            "/api/selection",
            put(http::select_machine).delete(http::clear_selection),
        ) // PUT, DELETE /api/selection
        .route("/api/selection/axis", put(http::set_axis)) // PUT /api/selection/axis
        .route("/api/test-input", post(http::set_test_input)) // POST /api/test-input
        .route("/api/chart", get(http::chart_handler)) // GET /api/chart
        .route("/ws/machines", get(ws::ws_machines)) // WS /ws/machines
        .route("/ws/chart", get(ws::ws_chart)) // WS /ws/chart
        .layer(CorsLayer::new().allow_origin(Any))
        .with_state(state)
}

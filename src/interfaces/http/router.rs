//! API router

use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use metrics_exporter_prometheus::PrometheusHandle;
use sea_orm::DatabaseConnection;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::commands::SharedCommandDispatcher;
use crate::dispatch::outbound::SharedCommandSender;
use crate::domain::RepositoryProvider;
use crate::services::Services;
use crate::session::ConnectionRegistry;

use super::modules::{commands, health, stations, transactions, users};

/// Shared state for all REST handlers.
#[derive(Clone)]
pub struct ApiState {
    pub repos: Arc<dyn RepositoryProvider>,
    pub registry: Arc<ConnectionRegistry>,
    pub services: Services,
    pub command_dispatcher: SharedCommandDispatcher,
    pub command_sender: SharedCommandSender,
    pub db: DatabaseConnection,
    pub prometheus: PrometheusHandle,
}

/// Build the operator REST router.
pub fn create_api_router(state: ApiState) -> Router {
    Router::new()
        // Stations
        .route(
            "/api/stations",
            get(stations::list_stations).post(stations::register_station),
        )
        .route("/api/stations/{id}", get(stations::get_station))
        .route("/api/stations/{id}/block", post(stations::block_station))
        .route("/api/stations/{id}/unblock", post(stations::unblock_station))
        // Commands
        .route("/api/stations/{id}/commands", post(commands::send_command))
        .route("/api/commands/broadcast", post(commands::broadcast_command))
        // Transactions
        .route("/api/transactions", get(transactions::list_transactions))
        .route("/api/transactions/{key}", get(transactions::get_transaction))
        // Users
        .route("/api/users", get(users::list_users).post(users::create_user))
        // Health & metrics
        .route("/api/health", get(health::health_check))
        .route("/metrics", get(health::metrics))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

//! Ampwatt CSMS entry point
//!
//! Central System for OCPP 1.6J / 2.0.1 charging stations. All
//! configuration comes from environment variables; the process exits
//! non-zero when a listener cannot bind or the database is unreachable
//! at startup.

use std::sync::Arc;

use sea_orm_migration::MigratorTrait;
use tracing::{error, info, warn};

use ampwatt_csms::commands::create_command_dispatcher;
use ampwatt_csms::config::AppConfig;
use ampwatt_csms::dispatch::outbound::create_command_sender;
use ampwatt_csms::dispatch::InboundDispatcher;
use ampwatt_csms::infrastructure::database::migrator::Migrator;
use ampwatt_csms::infrastructure::{init_database, DatabaseConfig, SeaOrmRepositoryProvider};
use ampwatt_csms::interfaces::http::{create_api_router, ApiState};
use ampwatt_csms::interfaces::ws::OcppServer;
use ampwatt_csms::services::{LivenessConfig, LivenessSupervisor, Services};
use ampwatt_csms::session::ConnectionRegistry;
use ampwatt_csms::shared::ShutdownCoordinator;
use ampwatt_csms::{create_event_bus, domain::RepositoryProvider};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // ── Configuration & logging ────────────────────────────────
    let config = AppConfig::from_env();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.log_level)),
        )
        .init();

    info!("Starting Ampwatt CSMS...");

    // ── Prometheus recorder (before any metrics calls) ─────────
    let prometheus = metrics_exporter_prometheus::PrometheusBuilder::new()
        .install_recorder()
        .expect("Failed to install Prometheus metrics recorder");

    // ── Database ───────────────────────────────────────────────
    let db_config = DatabaseConfig {
        url: config.database_url.clone(),
    };
    let db = match init_database(&db_config).await {
        Ok(db) => db,
        Err(e) => {
            error!("Failed to connect to database: {}", e);
            return Err(e.into());
        }
    };

    info!("Running database migrations...");
    if let Err(e) = Migrator::up(&db, None).await {
        error!("Failed to run migrations: {}", e);
        return Err(e.into());
    }
    info!("Migrations completed");

    let repos: Arc<dyn RepositoryProvider> = Arc::new(SeaOrmRepositoryProvider::new(db.clone()));

    // ── Core wiring ────────────────────────────────────────────
    let events = create_event_bus();
    let services = Services::new(repos.clone(), events.clone(), config.heartbeat_interval);

    let registry = ConnectionRegistry::shared();
    let command_sender = create_command_sender(registry.clone(), config.command_timeout);
    let command_dispatcher = create_command_dispatcher(
        command_sender.clone(),
        registry.clone(),
        services.stations.clone(),
    );
    let inbound_dispatcher = Arc::new(InboundDispatcher::new(services.clone(), events.clone()));

    // ── Shutdown coordination ──────────────────────────────────
    let shutdown = ShutdownCoordinator::new(config.shutdown_timeout);
    let shutdown_signal = shutdown.signal();
    shutdown.start_signal_listener();

    // ── Liveness supervisor ────────────────────────────────────
    let liveness = Arc::new(LivenessSupervisor::new(
        repos.clone(),
        registry.clone(),
        LivenessConfig {
            tick: std::time::Duration::from_secs(30),
            grace_factor: config.heartbeat_grace,
        },
    ));
    liveness.start(shutdown_signal.clone());

    // ── OCPP WebSocket server ──────────────────────────────────
    let ocpp_server = OcppServer::new(
        config.clone(),
        registry.clone(),
        inbound_dispatcher,
        services.clone(),
        events.clone(),
    )
    .with_shutdown(shutdown_signal.clone());

    // ── REST API server ────────────────────────────────────────
    let api_state = ApiState {
        repos,
        registry: registry.clone(),
        services,
        command_dispatcher,
        command_sender,
        db: db.clone(),
        prometheus,
    };
    let api_router = create_api_router(api_state);

    let api_addr = config.api_address();
    let listener = match tokio::net::TcpListener::bind(&api_addr).await {
        Ok(listener) => listener,
        Err(e) => {
            error!("Failed to bind REST listener on {}: {}", api_addr, e);
            return Err(e.into());
        }
    };
    info!("REST API listening on http://{}", api_addr);

    let api_shutdown = shutdown_signal.clone();
    let api_server = axum::serve(listener, api_router).with_graceful_shutdown(async move {
        api_shutdown.wait().await;
        info!("REST API server received shutdown signal");
    });

    info!("All servers started");

    let ws_task = tokio::spawn(async move { ocpp_server.run().await });
    let api_task = tokio::spawn(async move { api_server.await });

    let mut exit: Result<(), Box<dyn std::error::Error>> = Ok(());
    tokio::select! {
        result = ws_task => {
            match result {
                Ok(Ok(())) => info!("WebSocket server stopped"),
                Ok(Err(e)) => {
                    error!("WebSocket server error: {}", e);
                    exit = Err(e.to_string().into());
                }
                Err(e) => {
                    error!("WebSocket server task panicked: {}", e);
                    exit = Err(e.into());
                }
            }
        }
        result = api_task => {
            match result {
                Ok(Ok(())) => info!("REST API server stopped"),
                Ok(Err(e)) => {
                    error!("REST API server error: {}", e);
                    exit = Err(e.into());
                }
                Err(e) => {
                    error!("REST API server task panicked: {}", e);
                    exit = Err(e.into());
                }
            }
        }
    }

    // ── Cleanup ────────────────────────────────────────────────
    registry.drain_all();

    if let Err(e) = db.close().await {
        warn!("Error closing database connection: {}", e);
    } else {
        info!("Database connection closed");
    }

    info!("Ampwatt CSMS shutdown complete");
    exit
}

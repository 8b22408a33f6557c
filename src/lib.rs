//! # Ampwatt CSMS
//!
//! Central System (CSMS) for OCPP 1.6J and 2.0.1 charging stations.
//!
//! ## Architecture
//!
//! - **shared**: Cross-cutting utilities (shutdown coordination)
//! - **domain**: Core business entities, repository traits, value objects
//! - **ocpp**: OCPP-J wire framing, protocol error codes, message registry
//! - **session**: Per-connection sessions, pending calls, connection registry
//! - **dispatch**: Inbound CALL routing and outbound command transport
//! - **handlers**: Per-version inbound action handlers (CP -> CSMS)
//! - **commands**: Per-version typed outbound commands (CSMS -> CP)
//! - **services**: Domain services and the liveness supervisor
//! - **events**: Broadcast event bus for lifecycle notifications
//! - **infrastructure**: SeaORM entities, migrations, repositories
//! - **interfaces**: WebSocket endpoint and operator REST surface
//! - **config**: Environment-based configuration

pub mod commands;
pub mod config;
pub mod dispatch;
pub mod domain;
pub mod events;
pub mod handlers;
pub mod infrastructure;
pub mod interfaces;
pub mod ocpp;
pub mod services;
pub mod session;
pub mod shared;

// Re-export commonly used types at crate root
pub use config::AppConfig;
pub use events::{create_event_bus, Event, EventBus};
pub use infrastructure::{init_database, DatabaseConfig, SeaOrmRepositoryProvider};
pub use interfaces::http::create_api_router;
pub use interfaces::ws::OcppServer;
pub use session::ConnectionRegistry;

//! OCPP WebSocket endpoint

pub mod negotiator;
pub mod server;

pub use negotiator::ProtocolNegotiator;
pub use server::OcppServer;

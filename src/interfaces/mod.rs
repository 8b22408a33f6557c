//! Delivery mechanisms: the OCPP WebSocket endpoint and the operator
//! REST surface.

pub mod http;
pub mod ws;

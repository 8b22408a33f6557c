//! Message dispatch
//!
//! - `inbound`: routes a decoded CALL to the action handler for the
//!   session's negotiated protocol version.
//! - `outbound`: the API the control plane uses to send a CALL to a
//!   named station and await its CALLRESULT.

pub mod inbound;
pub mod outbound;

pub use inbound::InboundDispatcher;
pub use outbound::{CommandError, CommandSender};

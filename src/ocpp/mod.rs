//! OCPP-J transport: wire framing, protocol error codes, and the
//! per-version message registry.

pub mod error_code;
pub mod frame;
pub mod registry;

pub use error_code::{CallFault, OcppErrorCode};
pub use frame::{FrameError, OcppFrame};
pub use registry::{Direction, MessageDef, MessageRegistry};

//! Operator REST surface

pub mod error;
pub mod modules;
pub mod router;

pub use error::ApiError;
pub use router::{create_api_router, ApiState};

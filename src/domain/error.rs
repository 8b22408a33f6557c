//! Domain errors

use thiserror::Error;

/// Domain-level error types
#[derive(Debug, Clone, Error)]
pub enum DomainError {
    #[error("station not found: {0}")]
    StationNotFound(String),

    #[error("transaction not found: {0}")]
    TransactionNotFound(String),

    #[error("connector {1} not found on station {0}")]
    ConnectorNotFound(String, u32),

    /// The connector already has an open transaction.
    #[error("connector {1} on station {0} is busy")]
    ConnectorBusy(String, u32),

    #[error("id token not recognized: {0}")]
    UnknownIdToken(String),

    #[error("user already exists for id token: {0}")]
    UserAlreadyExists(String),

    #[error("station already exists: {0}")]
    StationAlreadyExists(String),

    #[error("storage error: {0}")]
    Storage(String),
}

/// Result type for domain operations
pub type DomainResult<T> = Result<T, DomainError>;

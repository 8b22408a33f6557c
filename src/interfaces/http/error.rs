//! REST error mapping
//!
//! Domain and command failures cross the HTTP boundary as structured
//! JSON, never as raw strings or panics.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::dispatch::CommandError;
use crate::domain::DomainError;

#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(StatusCode::CONFLICT, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(ErrorBody {
            error: self.message,
        });
        (self.status, body).into_response()
    }
}

impl From<DomainError> for ApiError {
    fn from(e: DomainError) -> Self {
        match &e {
            DomainError::StationNotFound(_)
            | DomainError::TransactionNotFound(_)
            | DomainError::ConnectorNotFound(_, _)
            | DomainError::UnknownIdToken(_) => Self::not_found(e.to_string()),
            DomainError::ConnectorBusy(_, _)
            | DomainError::UserAlreadyExists(_)
            | DomainError::StationAlreadyExists(_) => Self::conflict(e.to_string()),
            DomainError::Storage(_) => Self::internal(e.to_string()),
        }
    }
}

impl From<CommandError> for ApiError {
    fn from(e: CommandError) -> Self {
        match &e {
            CommandError::StationNotConnected(_) => Self::not_found(e.to_string()),
            CommandError::NotSupported(_) | CommandError::ValidationError(_) => {
                Self::bad_request(e.to_string())
            }
            CommandError::Timeout => Self::new(StatusCode::GATEWAY_TIMEOUT, e.to_string()),
            CommandError::Disconnected | CommandError::SendFailed(_) => {
                Self::new(StatusCode::BAD_GATEWAY, e.to_string())
            }
            CommandError::CallError { .. } | CommandError::InvalidResponse(_) => {
                Self::new(StatusCode::BAD_GATEWAY, e.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn domain_errors_map_to_statuses() {
        let e: ApiError = DomainError::StationNotFound("CP-001".into()).into();
        assert_eq!(e.status, StatusCode::NOT_FOUND);

        let e: ApiError = DomainError::ConnectorBusy("CP-001".into(), 1).into();
        assert_eq!(e.status, StatusCode::CONFLICT);

        let e: ApiError = DomainError::Storage("boom".into()).into();
        assert_eq!(e.status, StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn command_errors_map_to_statuses() {
        let e: ApiError = CommandError::Timeout.into();
        assert_eq!(e.status, StatusCode::GATEWAY_TIMEOUT);

        let e: ApiError = CommandError::StationNotConnected("CP-001".into()).into();
        assert_eq!(e.status, StatusCode::NOT_FOUND);
    }
}

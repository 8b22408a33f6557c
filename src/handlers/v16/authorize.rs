//! Authorize handler

use chrono::Utc;
use rust_ocpp::v1_6::messages::authorize::{AuthorizeRequest, AuthorizeResponse};
use rust_ocpp::v1_6::types::{AuthorizationStatus, IdTagInfo};
use serde_json::Value;
use tracing::{error, info};

use crate::domain::AuthStatus;
use crate::ocpp::CallFault;

use super::V16Handler;

pub(super) fn auth_status_to_wire(status: AuthStatus) -> AuthorizationStatus {
    match status {
        AuthStatus::Accepted => AuthorizationStatus::Accepted,
        AuthStatus::Invalid => AuthorizationStatus::Invalid,
        AuthStatus::Blocked => AuthorizationStatus::Blocked,
        AuthStatus::Expired => AuthorizationStatus::Expired,
        AuthStatus::ConcurrentTx => AuthorizationStatus::ConcurrentTx,
    }
}

pub async fn handle(handler: &V16Handler<'_>, payload: &Value) -> Result<Value, CallFault> {
    let req: AuthorizeRequest = serde_json::from_value(payload.clone())
        .map_err(|e| CallFault::formation(format!("Invalid Authorize payload: {}", e)))?;

    let status = handler
        .services
        .authorization
        .authorize(&req.id_tag, Utc::now())
        .await
        .map_err(|e| {
            error!(station_id = handler.station_id, error = %e, "Authorize lookup failed");
            CallFault::internal("Authorization lookup failed")
        })?;

    info!(
        station_id = handler.station_id,
        id_tag = req.id_tag.as_str(),
        status = %status,
        "Authorize"
    );

    let response = AuthorizeResponse {
        id_tag_info: IdTagInfo {
            status: auth_status_to_wire(status),
            expiry_date: None,
            parent_id_tag: None,
        },
    };
    Ok(serde_json::to_value(&response).unwrap_or_default())
}

//! Authorize handler (2.0.1)

use chrono::Utc;
use rust_ocpp::v2_0_1::datatypes::id_token_info_type::IdTokenInfoType;
use rust_ocpp::v2_0_1::enumerations::authorization_status_enum_type::AuthorizationStatusEnumType;
use rust_ocpp::v2_0_1::messages::authorize::{AuthorizeRequest, AuthorizeResponse};
use serde_json::Value;
use tracing::{error, info};

use crate::domain::AuthStatus;
use crate::ocpp::CallFault;

use super::V201Handler;

pub(super) fn auth_status_to_wire(status: AuthStatus) -> AuthorizationStatusEnumType {
    match status {
        AuthStatus::Accepted => AuthorizationStatusEnumType::Accepted,
        AuthStatus::Invalid => AuthorizationStatusEnumType::Invalid,
        AuthStatus::Blocked => AuthorizationStatusEnumType::Blocked,
        AuthStatus::Expired => AuthorizationStatusEnumType::Expired,
        AuthStatus::ConcurrentTx => AuthorizationStatusEnumType::ConcurrentTx,
    }
}

pub(super) fn id_token_info(status: AuthorizationStatusEnumType) -> IdTokenInfoType {
    IdTokenInfoType {
        status,
        cache_expiry_date_time: None,
        charging_priority: None,
        language1: None,
        evse_id: None,
        language2: None,
        group_id_token: None,
        personal_message: None,
    }
}

pub async fn handle(handler: &V201Handler<'_>, payload: &Value) -> Result<Value, CallFault> {
    let req: AuthorizeRequest = serde_json::from_value(payload.clone())
        .map_err(|e| CallFault::formation(format!("Invalid Authorize payload: {}", e)))?;

    let token = &req.id_token.id_token;

    let status = handler
        .services
        .authorization
        .authorize(token, Utc::now())
        .await
        .map_err(|e| {
            error!(station_id = handler.station_id, error = %e, "Authorize lookup failed");
            CallFault::internal("Authorization lookup failed")
        })?;

    info!(
        station_id = handler.station_id,
        id_token = token.as_str(),
        status = %status,
        "Authorize"
    );

    let response = AuthorizeResponse {
        id_token_info: id_token_info(auth_status_to_wire(status)),
        certificate_status: None,
    };
    Ok(serde_json::to_value(&response).unwrap_or_default())
}

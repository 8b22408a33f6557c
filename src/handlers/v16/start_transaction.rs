//! StartTransaction handler
//!
//! Creates the transaction and binds it to the connector. Duplicate
//! retries (same connector, tag, and timestamp) get the original
//! transaction id back; a genuinely busy connector answers
//! `ConcurrentTx` so the station backs off.

use rust_ocpp::v1_6::messages::start_transaction::{
    StartTransactionRequest, StartTransactionResponse,
};
use rust_ocpp::v1_6::types::IdTagInfo;
use serde_json::Value;
use tracing::{error, info, warn};

use crate::domain::{AuthStatus, DomainError};
use crate::ocpp::CallFault;

use super::authorize::auth_status_to_wire;
use super::V16Handler;

fn rejection(status: AuthStatus) -> Value {
    let response = StartTransactionResponse {
        transaction_id: 0,
        id_tag_info: IdTagInfo {
            status: auth_status_to_wire(status),
            expiry_date: None,
            parent_id_tag: None,
        },
    };
    serde_json::to_value(&response).unwrap_or_default()
}

pub async fn handle(handler: &V16Handler<'_>, payload: &Value) -> Result<Value, CallFault> {
    let req: StartTransactionRequest = serde_json::from_value(payload.clone())
        .map_err(|e| CallFault::formation(format!("Invalid StartTransaction payload: {}", e)))?;

    info!(
        station_id = handler.station_id,
        connector_id = req.connector_id,
        id_tag = req.id_tag.as_str(),
        meter_start = req.meter_start,
        "StartTransaction"
    );

    let auth = handler
        .services
        .authorization
        .authorize_for_start(&req.id_tag, req.timestamp)
        .await
        .map_err(|e| {
            error!(station_id = handler.station_id, error = %e, "StartTransaction auth lookup failed");
            CallFault::internal("Authorization lookup failed")
        })?;

    if !auth.is_accepted() {
        warn!(
            station_id = handler.station_id,
            id_tag = req.id_tag.as_str(),
            status = %auth,
            "StartTransaction refused"
        );
        return Ok(rejection(auth));
    }

    match handler
        .services
        .transactions
        .open_transaction_v16(
            handler.station_id,
            req.connector_id,
            &req.id_tag,
            req.meter_start,
            req.timestamp,
        )
        .await
    {
        Ok(tx) => {
            let response = StartTransactionResponse {
                transaction_id: tx.wire_id_v16.unwrap_or(0),
                id_tag_info: IdTagInfo {
                    status: auth_status_to_wire(AuthStatus::Accepted),
                    expiry_date: None,
                    parent_id_tag: None,
                },
            };
            Ok(serde_json::to_value(&response).unwrap_or_default())
        }
        Err(DomainError::ConnectorBusy(_, connector_id)) => {
            warn!(
                station_id = handler.station_id,
                connector_id, "StartTransaction on busy connector"
            );
            Ok(rejection(AuthStatus::ConcurrentTx))
        }
        Err(e) => {
            // Start must fail loudly so the station retries.
            error!(station_id = handler.station_id, error = %e, "Failed to open transaction");
            Err(CallFault::internal("Failed to open transaction"))
        }
    }
}

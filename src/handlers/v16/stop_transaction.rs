//! StopTransaction handler
//!
//! Closes the transaction named by the on-wire id. Duplicate stops and
//! stops for ids the CSMS never issued are accepted without effect, so
//! a retrying station always converges.

use rust_ocpp::v1_6::messages::stop_transaction::{
    StopTransactionRequest, StopTransactionResponse,
};
use rust_ocpp::v1_6::types::{AuthorizationStatus, IdTagInfo};
use serde_json::Value;
use tracing::{error, info};

use crate::ocpp::CallFault;

use super::V16Handler;

pub async fn handle(handler: &V16Handler<'_>, payload: &Value) -> Result<Value, CallFault> {
    let req: StopTransactionRequest = serde_json::from_value(payload.clone())
        .map_err(|e| CallFault::formation(format!("Invalid StopTransaction payload: {}", e)))?;

    info!(
        station_id = handler.station_id,
        transaction_id = req.transaction_id,
        meter_stop = req.meter_stop,
        reason = ?req.reason,
        "StopTransaction"
    );

    let reason = req.reason.as_ref().map(|r| format!("{:?}", r));

    handler
        .services
        .transactions
        .close_transaction_v16(
            handler.station_id,
            req.transaction_id,
            req.meter_stop,
            reason,
            req.timestamp,
        )
        .await
        .map_err(|e| {
            // Stop must fail loudly so the station retries.
            error!(
                station_id = handler.station_id,
                transaction_id = req.transaction_id,
                error = %e,
                "Failed to close transaction"
            );
            CallFault::internal("Failed to close transaction")
        })?;

    let response = StopTransactionResponse {
        id_tag_info: Some(IdTagInfo {
            status: AuthorizationStatus::Accepted,
            expiry_date: None,
            parent_id_tag: None,
        }),
    };
    Ok(serde_json::to_value(&response).unwrap_or_default())
}

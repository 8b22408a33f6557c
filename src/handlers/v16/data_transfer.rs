//! DataTransfer handler

use rust_ocpp::v1_6::messages::data_transfer::{DataTransferRequest, DataTransferResponse};
use rust_ocpp::v1_6::types::DataTransferStatus;
use serde_json::Value;
use tracing::info;

use crate::ocpp::CallFault;
use crate::services::DataTransferOutcome;

use super::V16Handler;

pub async fn handle(handler: &V16Handler<'_>, payload: &Value) -> Result<Value, CallFault> {
    let req: DataTransferRequest = serde_json::from_value(payload.clone())
        .map_err(|e| CallFault::formation(format!("Invalid DataTransfer payload: {}", e)))?;

    info!(
        station_id = handler.station_id,
        vendor_id = req.vendor_string.as_str(),
        message_id = ?req.message_id,
        "DataTransfer"
    );

    let outcome = handler
        .services
        .data_transfer
        .dispatch(
            handler.station_id,
            &req.vendor_string,
            req.message_id.as_deref(),
            req.data.as_deref(),
        )
        .await;

    let response = match outcome {
        DataTransferOutcome::Accepted { data } => DataTransferResponse {
            status: DataTransferStatus::Accepted,
            data,
        },
        DataTransferOutcome::Rejected => DataTransferResponse {
            status: DataTransferStatus::Rejected,
            data: None,
        },
        DataTransferOutcome::UnknownMessageId => DataTransferResponse {
            status: DataTransferStatus::UnknownMessageId,
            data: None,
        },
        DataTransferOutcome::UnknownVendorId => DataTransferResponse {
            status: DataTransferStatus::UnknownVendorId,
            data: None,
        },
    };

    Ok(serde_json::to_value(&response).unwrap_or_default())
}

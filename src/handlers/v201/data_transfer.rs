//! DataTransfer handler (2.0.1)

use rust_ocpp::v2_0_1::enumerations::data_transfer_status_enum_type::DataTransferStatusEnumType;
use rust_ocpp::v2_0_1::messages::datatransfer::{DataTransferRequest, DataTransferResponse};
use serde_json::Value;
use tracing::info;

use crate::ocpp::CallFault;
use crate::services::DataTransferOutcome;

use super::V201Handler;

pub async fn handle(handler: &V201Handler<'_>, payload: &Value) -> Result<Value, CallFault> {
    let req: DataTransferRequest = serde_json::from_value(payload.clone())
        .map_err(|e| CallFault::formation(format!("Invalid DataTransfer payload: {}", e)))?;

    info!(
        station_id = handler.station_id,
        vendor_id = req.vendor_id.as_str(),
        message_id = ?req.message_id,
        "DataTransfer"
    );

    let outcome = handler
        .services
        .data_transfer
        .dispatch(
            handler.station_id,
            &req.vendor_id,
            req.message_id.as_deref(),
            req.data.as_deref(),
        )
        .await;

    let (status, data) = match outcome {
        DataTransferOutcome::Accepted { data } => (DataTransferStatusEnumType::Accepted, data),
        DataTransferOutcome::Rejected => (DataTransferStatusEnumType::Rejected, None),
        DataTransferOutcome::UnknownMessageId => {
            (DataTransferStatusEnumType::UnknownMessageId, None)
        }
        DataTransferOutcome::UnknownVendorId => {
            (DataTransferStatusEnumType::UnknownVendorId, None)
        }
    };

    let response = DataTransferResponse {
        status,
        data,
        status_info: None,
    };
    Ok(serde_json::to_value(&response).unwrap_or_default())
}

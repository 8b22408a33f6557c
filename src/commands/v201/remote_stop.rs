//! v2.0.1 RequestStopTransaction command

use rust_ocpp::v2_0_1::messages::request_stop_transaction::{
    RequestStopTransactionRequest, RequestStopTransactionResponse,
};
use tracing::info;

use crate::dispatch::outbound::{CommandError, SharedCommandSender};

/// In v2.0.1 the transaction id is the station-chosen string.
pub async fn remote_stop_transaction(
    command_sender: &SharedCommandSender,
    station_id: &str,
    transaction_id: &str,
) -> Result<String, CommandError> {
    info!(station_id, transaction_id, "v2.0.1 RequestStopTransaction");

    let request = RequestStopTransactionRequest {
        transaction_id: transaction_id.to_string(),
    };
    let payload = serde_json::to_value(&request)
        .map_err(|e| CommandError::SendFailed(format!("Serialization failed: {}", e)))?;

    let result = command_sender
        .send_command(station_id, "RequestStopTransaction", payload)
        .await?;

    let response: RequestStopTransactionResponse = serde_json::from_value(result)
        .map_err(|e| CommandError::InvalidResponse(format!("Failed to parse response: {}", e)))?;

    Ok(format!("{:?}", response.status))
}

//! v1.6 ClearCache command

use rust_ocpp::v1_6::messages::clear_cache::{ClearCacheRequest, ClearCacheResponse};
use tracing::info;

use crate::dispatch::outbound::{CommandError, SharedCommandSender};

pub async fn clear_cache(
    command_sender: &SharedCommandSender,
    station_id: &str,
) -> Result<String, CommandError> {
    info!(station_id, "v1.6 ClearCache");

    let request = ClearCacheRequest {};
    let payload = serde_json::to_value(&request)
        .map_err(|e| CommandError::SendFailed(format!("Serialization failed: {}", e)))?;

    let result = command_sender
        .send_command(station_id, "ClearCache", payload)
        .await?;

    let response: ClearCacheResponse = serde_json::from_value(result)
        .map_err(|e| CommandError::InvalidResponse(format!("Failed to parse response: {}", e)))?;

    Ok(format!("{:?}", response.status))
}

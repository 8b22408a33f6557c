//! v1.6 ChangeConfiguration command

use rust_ocpp::v1_6::messages::change_configuration::{
    ChangeConfigurationRequest, ChangeConfigurationResponse,
};
use tracing::info;

use crate::dispatch::outbound::{CommandError, SharedCommandSender};

pub async fn change_configuration(
    command_sender: &SharedCommandSender,
    station_id: &str,
    key: String,
    value: String,
) -> Result<String, CommandError> {
    info!(station_id, key = key.as_str(), "v1.6 ChangeConfiguration");

    let request = ChangeConfigurationRequest { key, value };
    let payload = serde_json::to_value(&request)
        .map_err(|e| CommandError::SendFailed(format!("Serialization failed: {}", e)))?;

    let result = command_sender
        .send_command(station_id, "ChangeConfiguration", payload)
        .await?;

    let response: ChangeConfigurationResponse = serde_json::from_value(result)
        .map_err(|e| CommandError::InvalidResponse(format!("Failed to parse response: {}", e)))?;

    Ok(format!("{:?}", response.status))
}

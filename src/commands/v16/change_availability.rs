//! v1.6 ChangeAvailability command
//!
//! Connector id 0 changes availability of the entire station.

use rust_ocpp::v1_6::messages::change_availability::{
    ChangeAvailabilityRequest, ChangeAvailabilityResponse,
};
use rust_ocpp::v1_6::types::AvailabilityType;
use tracing::info;

use crate::commands::Availability;
use crate::dispatch::outbound::{CommandError, SharedCommandSender};

pub async fn change_availability(
    command_sender: &SharedCommandSender,
    station_id: &str,
    connector_id: u32,
    availability: Availability,
) -> Result<String, CommandError> {
    info!(station_id, connector_id, ?availability, "v1.6 ChangeAvailability");

    let kind = match availability {
        Availability::Operative => AvailabilityType::Operative,
        Availability::Inoperative => AvailabilityType::Inoperative,
    };

    let request = ChangeAvailabilityRequest { connector_id, kind };
    let payload = serde_json::to_value(&request)
        .map_err(|e| CommandError::SendFailed(format!("Serialization failed: {}", e)))?;

    let result = command_sender
        .send_command(station_id, "ChangeAvailability", payload)
        .await?;

    let response: ChangeAvailabilityResponse = serde_json::from_value(result)
        .map_err(|e| CommandError::InvalidResponse(format!("Failed to parse response: {}", e)))?;

    Ok(format!("{:?}", response.status))
}

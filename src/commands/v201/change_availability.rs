//! v2.0.1 ChangeAvailability command
//!
//! The identifier is EVSE-based; evse id 0 applies to the entire
//! station.

use rust_ocpp::v2_0_1::datatypes::evse_type::EVSEType;
use rust_ocpp::v2_0_1::enumerations::operational_status_enum_type::OperationalStatusEnumType;
use rust_ocpp::v2_0_1::messages::change_availability::{
    ChangeAvailabilityRequest, ChangeAvailabilityResponse,
};
use tracing::info;

use crate::commands::Availability;
use crate::dispatch::outbound::{CommandError, SharedCommandSender};

pub async fn change_availability(
    command_sender: &SharedCommandSender,
    station_id: &str,
    evse_id: i32,
    availability: Availability,
) -> Result<String, CommandError> {
    info!(station_id, evse_id, ?availability, "v2.0.1 ChangeAvailability");

    let operational_status = match availability {
        Availability::Operative => OperationalStatusEnumType::Operative,
        Availability::Inoperative => OperationalStatusEnumType::Inoperative,
    };

    let evse = if evse_id > 0 {
        Some(EVSEType {
            id: evse_id,
            connector_id: None,
        })
    } else {
        None // Applies to the entire station
    };

    let request = ChangeAvailabilityRequest {
        operational_status,
        evse,
    };
    let payload = serde_json::to_value(&request)
        .map_err(|e| CommandError::SendFailed(format!("Serialization failed: {}", e)))?;

    let result = command_sender
        .send_command(station_id, "ChangeAvailability", payload)
        .await?;

    let response: ChangeAvailabilityResponse = serde_json::from_value(result)
        .map_err(|e| CommandError::InvalidResponse(format!("Failed to parse response: {}", e)))?;

    Ok(format!("{:?}", response.status))
}

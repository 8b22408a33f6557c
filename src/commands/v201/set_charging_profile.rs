//! v2.0.1 SetChargingProfile command
//!
//! Pass-through: the profile JSON is validated against the 2.0.1
//! `ChargingProfileType` shape and forwarded; only the last-sent
//! profile id is recorded per station.

use rust_ocpp::v2_0_1::datatypes::charging_profile_type::ChargingProfileType;
use rust_ocpp::v2_0_1::messages::set_charging_profile::{
    SetChargingProfileRequest, SetChargingProfileResponse,
};
use tracing::info;

use crate::dispatch::outbound::{CommandError, SharedCommandSender};

/// Returns (status, profile id) so the caller can record the id.
pub async fn set_charging_profile(
    command_sender: &SharedCommandSender,
    station_id: &str,
    evse_id: i32,
    charging_profile_json: serde_json::Value,
) -> Result<(String, i32), CommandError> {
    let charging_profile: ChargingProfileType = serde_json::from_value(charging_profile_json)
        .map_err(|e| {
            CommandError::ValidationError(format!("Invalid v2.0.1 ChargingProfile JSON: {}", e))
        })?;

    let profile_id = charging_profile.id;
    info!(station_id, evse_id, profile_id, "v2.0.1 SetChargingProfile");

    let request = SetChargingProfileRequest {
        evse_id,
        charging_profile,
    };
    let payload = serde_json::to_value(&request)
        .map_err(|e| CommandError::SendFailed(format!("Serialization failed: {}", e)))?;

    let result = command_sender
        .send_command(station_id, "SetChargingProfile", payload)
        .await?;

    let response: SetChargingProfileResponse = serde_json::from_value(result)
        .map_err(|e| CommandError::InvalidResponse(format!("Failed to parse response: {}", e)))?;

    Ok((format!("{:?}", response.status), profile_id))
}

//! v1.6 SetChargingProfile command
//!
//! Pass-through: the profile JSON is validated against the 1.6
//! `ChargingProfile` shape and forwarded; only the last-sent profile id
//! is recorded per station.

use rust_ocpp::v1_6::messages::set_charging_profile::{
    SetChargingProfileRequest, SetChargingProfileResponse,
};
use rust_ocpp::v1_6::types::ChargingProfile;
use tracing::info;

use crate::dispatch::outbound::{CommandError, SharedCommandSender};

/// Returns (status, profile id) so the caller can record the id.
pub async fn set_charging_profile(
    command_sender: &SharedCommandSender,
    station_id: &str,
    connector_id: i32,
    charging_profile_json: serde_json::Value,
) -> Result<(String, i32), CommandError> {
    let charging_profile: ChargingProfile = serde_json::from_value(charging_profile_json)
        .map_err(|e| {
            CommandError::ValidationError(format!("Invalid v1.6 ChargingProfile JSON: {}", e))
        })?;

    let profile_id = charging_profile.charging_profile_id;
    info!(station_id, connector_id, profile_id, "v1.6 SetChargingProfile");

    let request = SetChargingProfileRequest {
        connector_id,
        cs_charging_profiles: charging_profile,
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

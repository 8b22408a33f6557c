//! BootNotification handler (2.0.1)

use chrono::Utc;
use rust_ocpp::v2_0_1::enumerations::registration_status_enum_type::RegistrationStatusEnumType;
use rust_ocpp::v2_0_1::messages::boot_notification::{
    BootNotificationRequest, BootNotificationResponse,
};
use serde_json::Value;
use tracing::{error, info};

use crate::domain::OcppVersion;
use crate::events::{BootReceivedEvent, Event};
use crate::ocpp::CallFault;

use super::V201Handler;

pub async fn handle(handler: &V201Handler<'_>, payload: &Value) -> Result<Value, CallFault> {
    let req: BootNotificationRequest = serde_json::from_value(payload.clone())
        .map_err(|e| CallFault::formation(format!("Invalid BootNotification payload: {}", e)))?;

    let cs = &req.charging_station;
    info!(
        station_id = handler.station_id,
        vendor = cs.vendor_name.as_str(),
        model = cs.model.as_str(),
        reason = ?req.reason,
        "BootNotification"
    );

    let now = Utc::now();
    let outcome = handler
        .services
        .stations
        .upsert_station_on_boot(
            handler.station_id,
            &cs.vendor_name,
            &cs.model,
            cs.firmware_version.as_deref(),
            OcppVersion::V201,
            now,
        )
        .await
        .map_err(|e| {
            error!(station_id = handler.station_id, error = %e, "Boot upsert failed");
            CallFault::internal("Failed to persist boot notification")
        })?;

    handler.events.publish(Event::BootReceived(BootReceivedEvent {
        station_id: handler.station_id.to_string(),
        vendor: cs.vendor_name.clone(),
        model: cs.model.clone(),
        firmware_version: cs.firmware_version.clone(),
        accepted: outcome.accepted,
        timestamp: now,
    }));

    let response = BootNotificationResponse {
        current_time: now,
        interval: outcome.interval as _,
        status: if outcome.accepted {
            RegistrationStatusEnumType::Accepted
        } else {
            RegistrationStatusEnumType::Rejected
        },
        status_info: None,
    };

    Ok(serde_json::to_value(&response).unwrap_or_default())
}

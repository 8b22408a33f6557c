//! BootNotification handler

use chrono::Utc;
use rust_ocpp::v1_6::messages::boot_notification::{
    BootNotificationRequest, BootNotificationResponse,
};
use rust_ocpp::v1_6::types::RegistrationStatus;
use serde_json::Value;
use tracing::{error, info};

use crate::domain::OcppVersion;
use crate::events::{BootReceivedEvent, Event};
use crate::ocpp::CallFault;

use super::V16Handler;

pub async fn handle(handler: &V16Handler<'_>, payload: &Value) -> Result<Value, CallFault> {
    let req: BootNotificationRequest = serde_json::from_value(payload.clone())
        .map_err(|e| CallFault::formation(format!("Invalid BootNotification payload: {}", e)))?;

    info!(
        station_id = handler.station_id,
        vendor = req.charge_point_vendor.as_str(),
        model = req.charge_point_model.as_str(),
        "BootNotification"
    );

    let now = Utc::now();
    let outcome = handler
        .services
        .stations
        .upsert_station_on_boot(
            handler.station_id,
            &req.charge_point_vendor,
            &req.charge_point_model,
            req.firmware_version.as_deref(),
            OcppVersion::V16,
            now,
        )
        .await
        .map_err(|e| {
            error!(station_id = handler.station_id, error = %e, "Boot upsert failed");
            CallFault::internal("Failed to persist boot notification")
        })?;

    handler.events.publish(Event::BootReceived(BootReceivedEvent {
        station_id: handler.station_id.to_string(),
        vendor: req.charge_point_vendor.clone(),
        model: req.charge_point_model.clone(),
        firmware_version: req.firmware_version.clone(),
        accepted: outcome.accepted,
        timestamp: now,
    }));

    let response = BootNotificationResponse {
        current_time: now,
        interval: outcome.interval as _,
        status: if outcome.accepted {
            RegistrationStatus::Accepted
        } else {
            RegistrationStatus::Rejected
        },
    };

    Ok(serde_json::to_value(&response).unwrap_or_default())
}

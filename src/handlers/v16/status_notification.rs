//! StatusNotification handler
//!
//! The station is the authority on physical connector state; this
//! handler records what it reports. Connector id 0 refers to the
//! station itself.

use chrono::Utc;
use rust_ocpp::v1_6::messages::status_notification::{
    StatusNotificationRequest, StatusNotificationResponse,
};
use rust_ocpp::v1_6::types::{ChargePointErrorCode, ChargePointStatus};
use serde_json::Value;
use tracing::{info, warn};

use crate::domain::ConnectorStatus;
use crate::ocpp::CallFault;

use super::V16Handler;

pub async fn handle(handler: &V16Handler<'_>, payload: &Value) -> Result<Value, CallFault> {
    let req: StatusNotificationRequest = serde_json::from_value(payload.clone())
        .map_err(|e| CallFault::formation(format!("Invalid StatusNotification payload: {}", e)))?;

    info!(
        station_id = handler.station_id,
        connector_id = req.connector_id,
        status = ?req.status,
        error_code = ?req.error_code,
        "StatusNotification"
    );

    let status = match req.status {
        ChargePointStatus::Available => ConnectorStatus::Available,
        ChargePointStatus::Preparing => ConnectorStatus::Preparing,
        ChargePointStatus::Charging => ConnectorStatus::Charging,
        ChargePointStatus::SuspendedEV => ConnectorStatus::SuspendedEV,
        ChargePointStatus::SuspendedEVSE => ConnectorStatus::SuspendedEVSE,
        ChargePointStatus::Finishing => ConnectorStatus::Finishing,
        ChargePointStatus::Reserved => ConnectorStatus::Reserved,
        ChargePointStatus::Unavailable => ConnectorStatus::Unavailable,
        ChargePointStatus::Faulted => ConnectorStatus::Faulted,
    };

    let error_code = match req.error_code {
        ChargePointErrorCode::NoError => None,
        other => Some(format!("{:?}", other)),
    };

    // Idempotent notification: a failed write is logged, the station
    // still gets its empty confirmation.
    if let Err(e) = handler
        .services
        .stations
        .update_connector_status(
            handler.station_id,
            req.connector_id,
            status,
            error_code,
            req.timestamp.unwrap_or_else(Utc::now),
        )
        .await
    {
        warn!(
            station_id = handler.station_id,
            connector_id = req.connector_id,
            error = %e,
            "Failed to record connector status"
        );
    }

    Ok(serde_json::to_value(&StatusNotificationResponse {}).unwrap_or_default())
}

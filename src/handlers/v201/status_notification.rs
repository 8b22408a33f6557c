//! StatusNotification handler (2.0.1)
//!
//! 2.0.1 reports per-(evse, connector) with a coarser status set. The
//! EVSE id maps onto the domain connector id (one connector per EVSE);
//! evse id 0 refers to the whole station, matching the 1.6 convention.

use rust_ocpp::v2_0_1::enumerations::connector_status_enum_type::ConnectorStatusEnumType;
use rust_ocpp::v2_0_1::messages::status_notification::{
    StatusNotificationRequest, StatusNotificationResponse,
};
use serde_json::Value;
use tracing::{info, warn};

use crate::domain::ConnectorStatus;
use crate::ocpp::CallFault;

use super::V201Handler;

pub async fn handle(handler: &V201Handler<'_>, payload: &Value) -> Result<Value, CallFault> {
    let req: StatusNotificationRequest = serde_json::from_value(payload.clone())
        .map_err(|e| CallFault::formation(format!("Invalid StatusNotification payload: {}", e)))?;

    info!(
        station_id = handler.station_id,
        evse_id = req.evse_id,
        connector_id = req.connector_id,
        status = ?req.connector_status,
        "StatusNotification"
    );

    let connector_id = req.evse_id.max(0) as u32;

    let status = match req.connector_status {
        ConnectorStatusEnumType::Available => ConnectorStatus::Available,
        // Occupied covers the whole transaction family in 2.0.1; the
        // transaction-driven state (Charging/Suspended) is refined by
        // TransactionEvent, so only upgrade when nothing finer is known.
        ConnectorStatusEnumType::Occupied => {
            match handler
                .services
                .transactions
                .find_active_for_connector(handler.station_id, connector_id)
                .await
            {
                Ok(Some(_)) => ConnectorStatus::Charging,
                _ => ConnectorStatus::Preparing,
            }
        }
        ConnectorStatusEnumType::Reserved => ConnectorStatus::Reserved,
        ConnectorStatusEnumType::Unavailable => ConnectorStatus::Unavailable,
        ConnectorStatusEnumType::Faulted => ConnectorStatus::Faulted,
    };

    if let Err(e) = handler
        .services
        .stations
        .update_connector_status(handler.station_id, connector_id, status, None, req.timestamp)
        .await
    {
        warn!(
            station_id = handler.station_id,
            connector_id,
            error = %e,
            "Failed to record connector status"
        );
    }

    Ok(serde_json::to_value(&StatusNotificationResponse {}).unwrap_or_default())
}

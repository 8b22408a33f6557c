//! Heartbeat handler

use chrono::Utc;
use rust_ocpp::v1_6::messages::heart_beat::HeartbeatResponse;
use serde_json::Value;
use tracing::{info, warn};

use crate::events::{Event, HeartbeatReceivedEvent};
use crate::ocpp::CallFault;

use super::V16Handler;

pub async fn handle(handler: &V16Handler<'_>, _payload: &Value) -> Result<Value, CallFault> {
    info!(station_id = handler.station_id, "Heartbeat");

    let now = Utc::now();

    // Protocol liveness beats durability here: a failed write is logged
    // and the station still gets its currentTime.
    if let Err(e) = handler
        .services
        .stations
        .record_heartbeat(handler.station_id, now)
        .await
    {
        warn!(station_id = handler.station_id, error = %e, "Failed to record heartbeat");
    }

    handler
        .events
        .publish(Event::HeartbeatReceived(HeartbeatReceivedEvent {
            station_id: handler.station_id.to_string(),
            timestamp: now,
        }));

    let response = HeartbeatResponse { current_time: now };
    Ok(serde_json::to_value(&response).unwrap_or_default())
}

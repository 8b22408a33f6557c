//! Heartbeat handler (2.0.1)

use chrono::Utc;
use rust_ocpp::v2_0_1::messages::heartbeat::HeartbeatResponse;
use serde_json::Value;
use tracing::{info, warn};

use crate::events::{Event, HeartbeatReceivedEvent};
use crate::ocpp::CallFault;

use super::V201Handler;

pub async fn handle(handler: &V201Handler<'_>, _payload: &Value) -> Result<Value, CallFault> {
    info!(station_id = handler.station_id, "Heartbeat");

    let now = Utc::now();

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

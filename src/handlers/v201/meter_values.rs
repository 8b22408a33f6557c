//! MeterValues handler (2.0.1)
//!
//! Stations normally report meter data inside TransactionEvent; the
//! standalone MeterValues message still exists (e.g. for idle EVSE
//! readings) and is appended to the EVSE's active transaction when one
//! is open. Never fails the station.

use chrono::Utc;
use rust_ocpp::v2_0_1::messages::meter_values::{MeterValuesRequest, MeterValuesResponse};
use serde_json::Value;
use tracing::{info, warn};

use crate::events::{Event, MeterValuesEvent};
use crate::ocpp::CallFault;

use super::transaction_event::samples_from;
use super::V201Handler;

pub async fn handle(handler: &V201Handler<'_>, payload: &Value) -> Result<Value, CallFault> {
    let req: MeterValuesRequest = serde_json::from_value(payload.clone())
        .map_err(|e| CallFault::formation(format!("Invalid MeterValues payload: {}", e)))?;

    let connector_id = req.evse_id.max(0) as u32;

    info!(
        station_id = handler.station_id,
        evse_id = req.evse_id,
        values = req.meter_value.len(),
        "MeterValues"
    );

    let samples = samples_from(&Some(req.meter_value.clone())).unwrap_or_default();

    let tx = handler
        .services
        .transactions
        .find_active_for_connector(handler.station_id, connector_id)
        .await
        .ok()
        .flatten();

    let transaction_key = match &tx {
        Some(tx) => {
            if let Err(e) = handler
                .services
                .transactions
                .append_meter(&tx.key, &samples)
                .await
            {
                warn!(
                    station_id = handler.station_id,
                    transaction_key = tx.key.as_str(),
                    error = %e,
                    "Failed to append meter samples"
                );
            }
            Some(tx.key.clone())
        }
        None => None,
    };

    let latest = samples.last();
    handler
        .events
        .publish(Event::MeterValuesReceived(MeterValuesEvent {
            station_id: handler.station_id.to_string(),
            connector_id,
            transaction_key,
            energy_wh: latest.and_then(|s| s.energy_wh),
            power_w: latest.and_then(|s| s.power_w),
            soc: latest.and_then(|s| s.soc),
            timestamp: latest.map(|s| s.timestamp).unwrap_or_else(Utc::now),
        }));

    Ok(serde_json::to_value(&MeterValuesResponse {}).unwrap_or_default())
}

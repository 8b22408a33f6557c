//! MeterValues handler
//!
//! Appends time-series samples to the owning transaction. This path
//! never fails the station: bad samples are skipped, a missing
//! transaction is logged, storage errors are swallowed.

use chrono::Utc;
use rust_ocpp::v1_6::messages::meter_values::{MeterValuesRequest, MeterValuesResponse};
use rust_ocpp::v1_6::types::{Measurand, MeterValue, UnitOfMeasure};
use serde_json::Value;
use tracing::{info, warn};

use crate::domain::MeterSample;
use crate::events::{Event, MeterValuesEvent};
use crate::ocpp::CallFault;

use super::V16Handler;

fn sample_from(meter_value: &MeterValue) -> MeterSample {
    let mut sample = MeterSample {
        timestamp: meter_value.timestamp,
        energy_wh: None,
        power_w: None,
        soc: None,
    };

    for sampled in &meter_value.sampled_value {
        let value: f64 = match sampled.value.parse() {
            Ok(v) => v,
            Err(_) => continue,
        };

        let measurand = sampled
            .measurand
            .clone()
            .unwrap_or(Measurand::EnergyActiveImportRegister);

        match measurand {
            Measurand::EnergyActiveImportRegister => {
                let wh = match sampled.unit.as_ref() {
                    Some(UnitOfMeasure::KWh) => value * 1000.0,
                    _ => value,
                };
                sample.energy_wh = Some(wh);
            }
            Measurand::PowerActiveImport => {
                let w = match sampled.unit.as_ref() {
                    Some(UnitOfMeasure::Kw) => value * 1000.0,
                    _ => value,
                };
                sample.power_w = Some(w);
            }
            Measurand::SoC => {
                sample.soc = Some(value as i32);
            }
            _ => {}
        }
    }

    sample
}

pub async fn handle(handler: &V16Handler<'_>, payload: &Value) -> Result<Value, CallFault> {
    let req: MeterValuesRequest = serde_json::from_value(payload.clone())
        .map_err(|e| CallFault::formation(format!("Invalid MeterValues payload: {}", e)))?;

    info!(
        station_id = handler.station_id,
        connector_id = req.connector_id,
        transaction_id = ?req.transaction_id,
        values = req.meter_value.len(),
        "MeterValues"
    );

    let samples: Vec<MeterSample> = req.meter_value.iter().map(sample_from).collect();

    // Resolve the owning transaction: by wire id when given, else the
    // connector's active transaction.
    let tx = match req.transaction_id {
        Some(wire_id) => handler
            .services
            .transactions
            .get_by_wire_id_v16(handler.station_id, wire_id)
            .await
            .ok()
            .flatten(),
        None => handler
            .services
            .transactions
            .find_active_for_connector(handler.station_id, req.connector_id)
            .await
            .ok()
            .flatten(),
    };

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
        None => {
            warn!(
                station_id = handler.station_id,
                connector_id = req.connector_id,
                "MeterValues without a matching transaction"
            );
            None
        }
    };

    let latest = samples.last();
    handler
        .events
        .publish(Event::MeterValuesReceived(MeterValuesEvent {
            station_id: handler.station_id.to_string(),
            connector_id: req.connector_id,
            transaction_key,
            energy_wh: latest.and_then(|s| s.energy_wh),
            power_w: latest.and_then(|s| s.power_w),
            soc: latest.and_then(|s| s.soc),
            timestamp: latest.map(|s| s.timestamp).unwrap_or_else(Utc::now),
        }));

    Ok(serde_json::to_value(&MeterValuesResponse {}).unwrap_or_default())
}

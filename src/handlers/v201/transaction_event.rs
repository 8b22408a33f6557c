//! TransactionEvent handler (2.0.1)
//!
//! `TransactionEvent` replaces the 1.6 StartTransaction/StopTransaction
//! pair; `event_type` selects the phase:
//!
//! - **Started**: opens the transaction under the station-chosen id
//! - **Updated**: appends meter samples
//! - **Ended**: closes the transaction and derives delivered energy

use rust_ocpp::v2_0_1::datatypes::meter_value_type::MeterValueType;
use rust_ocpp::v2_0_1::enumerations::authorization_status_enum_type::AuthorizationStatusEnumType;
use rust_ocpp::v2_0_1::enumerations::measurand_enum_type::MeasurandEnumType;
use rust_ocpp::v2_0_1::enumerations::transaction_event_enum_type::TransactionEventEnumType;
use rust_ocpp::v2_0_1::messages::transaction_event::{
    TransactionEventRequest, TransactionEventResponse,
};
use rust_decimal::prelude::ToPrimitive;
use serde_json::Value;
use tracing::{error, info, warn};

use crate::domain::{AuthStatus, DomainError, MeterSample};
use crate::ocpp::CallFault;

use super::authorize::{auth_status_to_wire, id_token_info};
use super::V201Handler;

pub async fn handle(handler: &V201Handler<'_>, payload: &Value) -> Result<Value, CallFault> {
    let req: TransactionEventRequest = serde_json::from_value(payload.clone())
        .map_err(|e| CallFault::formation(format!("Invalid TransactionEvent payload: {}", e)))?;

    let wire_id = req.transaction_info.transaction_id.clone();
    let connector_id = req.evse.as_ref().map(|e| e.id.max(0) as u32).unwrap_or(1);
    let id_token = req
        .id_token
        .as_ref()
        .map(|t| t.id_token.clone())
        .unwrap_or_default();

    info!(
        station_id = handler.station_id,
        event_type = ?req.event_type,
        transaction_id = wire_id.as_str(),
        trigger_reason = ?req.trigger_reason,
        connector_id,
        "TransactionEvent"
    );

    match req.event_type {
        TransactionEventEnumType::Started => {
            handle_started(handler, &req, connector_id, &id_token, &wire_id).await
        }
        TransactionEventEnumType::Updated => {
            handle_updated(handler, &req, connector_id, &wire_id).await
        }
        TransactionEventEnumType::Ended => {
            handle_ended(handler, &req, connector_id, &wire_id).await
        }
    }
}

async fn handle_started(
    handler: &V201Handler<'_>,
    req: &TransactionEventRequest,
    connector_id: u32,
    id_token: &str,
    wire_id: &str,
) -> Result<Value, CallFault> {
    // An absent id token means the start was remote or externally
    // authorized; the station is not challenged for it.
    let auth = if id_token.is_empty() {
        AuthStatus::Accepted
    } else {
        handler
            .services
            .authorization
            .authorize_for_start(id_token, req.timestamp)
            .await
            .map_err(|e| {
                error!(station_id = handler.station_id, error = %e, "TransactionEvent auth lookup failed");
                CallFault::internal("Authorization lookup failed")
            })?
    };

    if !auth.is_accepted() {
        warn!(
            station_id = handler.station_id,
            id_token,
            status = %auth,
            "TransactionEvent(Started) refused"
        );
        return Ok(response_with(Some(auth_status_to_wire(auth))));
    }

    let meter_start = first_energy_wh(&req.meter_value).unwrap_or(0.0) as i32;

    match handler
        .services
        .transactions
        .open_transaction_v201(
            handler.station_id,
            connector_id,
            if id_token.is_empty() { "unknown" } else { id_token },
            meter_start,
            req.timestamp,
            wire_id,
        )
        .await
    {
        Ok(tx) => {
            if let Some(samples) = samples_from(&req.meter_value) {
                let _ = handler.services.transactions.append_meter(&tx.key, &samples).await;
            }
            Ok(response_with(Some(AuthorizationStatusEnumType::Accepted)))
        }
        Err(DomainError::ConnectorBusy(_, connector_id)) => {
            warn!(
                station_id = handler.station_id,
                connector_id, "TransactionEvent(Started) on busy connector"
            );
            Ok(response_with(Some(AuthorizationStatusEnumType::ConcurrentTx)))
        }
        Err(e) => {
            error!(station_id = handler.station_id, error = %e, "Failed to open transaction");
            Err(CallFault::internal("Failed to open transaction"))
        }
    }
}

async fn handle_updated(
    handler: &V201Handler<'_>,
    req: &TransactionEventRequest,
    connector_id: u32,
    wire_id: &str,
) -> Result<Value, CallFault> {
    // Update is an idempotent append; it never fails the station.
    match handler
        .services
        .transactions
        .get_by_wire_id_v201(handler.station_id, wire_id)
        .await
    {
        Ok(Some(tx)) => {
            if let Some(samples) = samples_from(&req.meter_value) {
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
            }
        }
        Ok(None) => {
            warn!(
                station_id = handler.station_id,
                wire_id,
                connector_id,
                "TransactionEvent(Updated) for unknown transaction"
            );
        }
        Err(e) => {
            warn!(station_id = handler.station_id, error = %e, "Transaction lookup failed");
        }
    }

    Ok(response_with(None))
}

async fn handle_ended(
    handler: &V201Handler<'_>,
    req: &TransactionEventRequest,
    connector_id: u32,
    wire_id: &str,
) -> Result<Value, CallFault> {
    let reason = req
        .transaction_info
        .stopped_reason
        .as_ref()
        .map(|r| format!("{:?}", r));

    let existing = handler
        .services
        .transactions
        .get_by_wire_id_v201(handler.station_id, wire_id)
        .await
        .map_err(|e| {
            error!(station_id = handler.station_id, error = %e, "Transaction lookup failed");
            CallFault::internal("Failed to close transaction")
        })?;

    let Some(existing) = existing else {
        warn!(
            station_id = handler.station_id,
            wire_id, connector_id, "TransactionEvent(Ended) for unknown transaction"
        );
        return Ok(response_with(None));
    };

    // With no final register reading the stop meter defaults to the
    // start meter (zero delivered energy).
    let meter_stop = first_energy_wh(&req.meter_value)
        .map(|wh| wh as i32)
        .unwrap_or(existing.meter_start);

    handler
        .services
        .transactions
        .close_transaction_v201(handler.station_id, wire_id, meter_stop, reason, req.timestamp)
        .await
        .map_err(|e| {
            error!(station_id = handler.station_id, error = %e, "Failed to close transaction");
            CallFault::internal("Failed to close transaction")
        })?;

    Ok(response_with(None))
}

fn response_with(status: Option<AuthorizationStatusEnumType>) -> Value {
    let response = TransactionEventResponse {
        total_cost: None,
        charging_priority: None,
        id_token_info: status.map(id_token_info),
        updated_personal_message: None,
    };
    serde_json::to_value(&response).unwrap_or_default()
}

/// Latest Energy.Active.Import.Register reading in Wh, if any.
fn first_energy_wh(meter_values: &Option<Vec<MeterValueType>>) -> Option<f64> {
    samples_from(meter_values)?
        .iter()
        .rev()
        .find_map(|s| s.energy_wh)
}

/// Convert 2.0.1 meter values into domain samples.
pub(super) fn samples_from(meter_values: &Option<Vec<MeterValueType>>) -> Option<Vec<MeterSample>> {
    let meter_values = meter_values.as_ref()?;
    if meter_values.is_empty() {
        return None;
    }

    let samples = meter_values
        .iter()
        .map(|mv| {
            let mut sample = MeterSample {
                timestamp: mv.timestamp,
                energy_wh: None,
                power_w: None,
                soc: None,
            };

            for sampled in &mv.sampled_value {
                let value: f64 = match sampled.value.to_f64() {
                    Some(v) => v,
                    None => continue,
                };

                let measurand = sampled
                    .measurand
                    .clone()
                    .unwrap_or(MeasurandEnumType::EnergyActiveImportRegister);

                let unit_is = |name: &str| {
                    sampled
                        .unit_of_measure
                        .as_ref()
                        .and_then(|u| u.unit.as_ref())
                        .map(|u| u.eq_ignore_ascii_case(name))
                        .unwrap_or(false)
                };

                match measurand {
                    MeasurandEnumType::EnergyActiveImportRegister => {
                        sample.energy_wh =
                            Some(if unit_is("kWh") { value * 1000.0 } else { value });
                    }
                    MeasurandEnumType::PowerActiveImport => {
                        sample.power_w = Some(if unit_is("kW") { value * 1000.0 } else { value });
                    }
                    MeasurandEnumType::SoC => {
                        sample.soc = Some(value as i32);
                    }
                    _ => {}
                }
            }

            sample
        })
        .collect();

    Some(samples)
}

//! Command REST handlers
//!
//! `POST /api/stations/{id}/commands` with `{action, payload}`. Known
//! operator commands go through the typed, version-aware dispatcher;
//! anything else is passed through the raw command sender, which still
//! validates direction and payload against the message registry.

use axum::extract::{Path, State};
use axum::Json;
use serde_json::{json, Value};
use validator::Validate;

use crate::commands::{Availability, ResetKind, TriggerType};
use crate::interfaces::http::error::ApiError;
use crate::interfaces::http::router::ApiState;

use super::dto::{
    BroadcastCommandRequest, BroadcastResultEntry, CommandResponse, SendCommandRequest,
};

fn field_str<'a>(payload: &'a Value, key: &str) -> Option<&'a str> {
    payload.get(key).and_then(|v| v.as_str())
}

fn field_u32(payload: &Value, key: &str) -> Option<u32> {
    payload.get(key).and_then(|v| v.as_u64()).map(|v| v as u32)
}

fn require_str<'a>(payload: &'a Value, key: &str) -> Result<&'a str, ApiError> {
    field_str(payload, key)
        .ok_or_else(|| ApiError::bad_request(format!("missing string field '{}'", key)))
}

pub async fn send_command(
    State(state): State<ApiState>,
    Path(station_id): Path<String>,
    Json(body): Json<SendCommandRequest>,
) -> Result<Json<CommandResponse>, ApiError> {
    body.validate()
        .map_err(|e| ApiError::bad_request(e.to_string()))?;

    let dispatcher = &state.command_dispatcher;
    let payload = &body.payload;

    let result = match body.action.as_str() {
        "RemoteStartTransaction" | "RequestStartTransaction" => {
            let id_tag = require_str(payload, "idTag")?;
            let connector_id = field_u32(payload, "connectorId");
            dispatcher
                .remote_start(&station_id, id_tag, connector_id)
                .await
                .map(status_only)?
        }
        "RemoteStopTransaction" | "RequestStopTransaction" => {
            let transaction_id = payload
                .get("transactionId")
                .map(|v| match v {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                })
                .ok_or_else(|| ApiError::bad_request("missing field 'transactionId'"))?;
            dispatcher
                .remote_stop(&station_id, &transaction_id)
                .await
                .map(status_only)?
        }
        "Reset" => {
            let kind = require_str(payload, "type")?;
            let kind = ResetKind::parse(kind)
                .ok_or_else(|| ApiError::bad_request("type must be 'Hard' or 'Soft'"))?;
            dispatcher.reset(&station_id, kind).await.map(status_only)?
        }
        "ChangeAvailability" => {
            let connector_id = field_u32(payload, "connectorId")
                .ok_or_else(|| ApiError::bad_request("missing field 'connectorId'"))?;
            let kind = require_str(payload, "type")?;
            let availability = Availability::parse(kind)
                .ok_or_else(|| ApiError::bad_request("type must be 'Operative' or 'Inoperative'"))?;
            dispatcher
                .change_availability(&station_id, connector_id, availability)
                .await
                .map(status_only)?
        }
        "UnlockConnector" => {
            let connector_id = field_u32(payload, "connectorId")
                .ok_or_else(|| ApiError::bad_request("missing field 'connectorId'"))?;
            dispatcher
                .unlock_connector(&station_id, connector_id)
                .await
                .map(status_only)?
        }
        "ClearCache" => dispatcher.clear_cache(&station_id).await.map(status_only)?,
        "TriggerMessage" => {
            let requested = require_str(payload, "requestedMessage")?;
            let trigger = TriggerType::parse(requested)
                .ok_or_else(|| ApiError::bad_request("unknown requestedMessage"))?;
            let connector_id = field_u32(payload, "connectorId");
            dispatcher
                .trigger_message(&station_id, trigger, connector_id)
                .await
                .map(status_only)?
        }
        "SetChargingProfile" => {
            let target = payload
                .get("connectorId")
                .or_else(|| payload.get("evseId"))
                .and_then(|v| v.as_i64())
                .unwrap_or(0) as i32;
            let profile = payload
                .get("csChargingProfiles")
                .or_else(|| payload.get("chargingProfile"))
                .cloned()
                .ok_or_else(|| ApiError::bad_request("missing charging profile body"))?;
            dispatcher
                .set_charging_profile(&station_id, target, profile)
                .await
                .map(status_only)?
        }
        "GetConfiguration" => {
            let keys = payload.get("key").and_then(|v| {
                v.as_array().map(|arr| {
                    arr.iter()
                        .filter_map(|k| k.as_str().map(String::from))
                        .collect::<Vec<_>>()
                })
            });
            let result = dispatcher.get_configuration(&station_id, keys).await?;
            CommandResponse {
                status: "Accepted".to_string(),
                response: Some(json!({
                    "configurationKey": result
                        .configuration_key
                        .iter()
                        .map(|kv| json!({"key": kv.key, "readonly": kv.readonly, "value": kv.value}))
                        .collect::<Vec<_>>(),
                    "unknownKey": result.unknown_key,
                })),
            }
        }
        "ChangeConfiguration" => {
            let key = require_str(payload, "key")?.to_string();
            let value = require_str(payload, "value")?.to_string();
            dispatcher
                .change_configuration(&station_id, key, value)
                .await
                .map(status_only)?
        }
        "GetVariables" => {
            let variables = parse_variable_pairs(payload)?;
            let result = dispatcher.get_variables(&station_id, variables).await?;
            CommandResponse {
                status: "Accepted".to_string(),
                response: Some(json!({
                    "results": result
                        .results
                        .iter()
                        .map(|r| json!({
                            "component": r.component,
                            "variable": r.variable,
                            "attributeStatus": r.attribute_status,
                            "attributeValue": r.attribute_value,
                        }))
                        .collect::<Vec<_>>(),
                })),
            }
        }
        "SetVariables" => {
            let variables = parse_variable_triples(payload)?;
            let result = dispatcher.set_variables(&station_id, variables).await?;
            CommandResponse {
                status: "Accepted".to_string(),
                response: Some(json!({
                    "results": result
                        .results
                        .iter()
                        .map(|r| json!({
                            "component": r.component,
                            "variable": r.variable,
                            "status": r.status,
                        }))
                        .collect::<Vec<_>>(),
                })),
            }
        }
        "DataTransfer" => {
            let vendor_id = require_str(payload, "vendorId")?.to_string();
            let message_id = field_str(payload, "messageId").map(String::from);
            let data = field_str(payload, "data").map(String::from);
            let result = dispatcher
                .data_transfer(&station_id, vendor_id, message_id, data)
                .await?;
            CommandResponse {
                status: result.status,
                response: result.data.map(Value::String),
            }
        }
        // Anything else goes through the raw sender; the message
        // registry still gates direction and payload shape.
        _ => {
            let response = state
                .command_sender
                .send_command(&station_id, &body.action, payload.clone())
                .await?;
            CommandResponse {
                status: "Accepted".to_string(),
                response: Some(response),
            }
        }
    };

    Ok(Json(result))
}

fn status_only(status: String) -> CommandResponse {
    CommandResponse {
        status,
        response: None,
    }
}

fn parse_variable_pairs(payload: &Value) -> Result<Vec<(String, String)>, ApiError> {
    payload
        .get("variables")
        .and_then(|v| v.as_array())
        .ok_or_else(|| ApiError::bad_request("missing array field 'variables'"))?
        .iter()
        .map(|entry| {
            let component = field_str(entry, "component")
                .ok_or_else(|| ApiError::bad_request("variable entry missing 'component'"))?;
            let variable = field_str(entry, "variable")
                .ok_or_else(|| ApiError::bad_request("variable entry missing 'variable'"))?;
            Ok((component.to_string(), variable.to_string()))
        })
        .collect()
}

fn parse_variable_triples(payload: &Value) -> Result<Vec<(String, String, String)>, ApiError> {
    payload
        .get("variables")
        .and_then(|v| v.as_array())
        .ok_or_else(|| ApiError::bad_request("missing array field 'variables'"))?
        .iter()
        .map(|entry| {
            let component = field_str(entry, "component")
                .ok_or_else(|| ApiError::bad_request("variable entry missing 'component'"))?;
            let variable = field_str(entry, "variable")
                .ok_or_else(|| ApiError::bad_request("variable entry missing 'variable'"))?;
            let value = field_str(entry, "value")
                .ok_or_else(|| ApiError::bad_request("variable entry missing 'value'"))?;
            Ok((
                component.to_string(),
                variable.to_string(),
                value.to_string(),
            ))
        })
        .collect()
}

pub async fn broadcast_command(
    State(state): State<ApiState>,
    Json(body): Json<BroadcastCommandRequest>,
) -> Result<Json<Vec<BroadcastResultEntry>>, ApiError> {
    body.validate()
        .map_err(|e| ApiError::bad_request(e.to_string()))?;

    let results = state
        .command_sender
        .broadcast(
            &body.action,
            body.payload,
            state.command_sender.default_timeout(),
        )
        .await;

    let mut entries: Vec<BroadcastResultEntry> = results
        .into_iter()
        .map(|(station_id, outcome)| match outcome {
            Ok(response) => BroadcastResultEntry {
                station_id,
                ok: true,
                response: Some(response),
                error: None,
            },
            Err(e) => BroadcastResultEntry {
                station_id,
                ok: false,
                response: None,
                error: Some(e.to_string()),
            },
        })
        .collect();
    entries.sort_by(|a, b| a.station_id.cmp(&b.station_id));

    Ok(Json(entries))
}

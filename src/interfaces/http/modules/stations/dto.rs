//! Station DTOs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::domain::{Connector, Station};

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RegisterStationRequest {
    #[validate(length(min = 1, max = 128))]
    pub station_id: String,
    #[validate(length(max = 256))]
    pub location: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectorDto {
    pub connector_id: u32,
    pub status: String,
    pub error_code: Option<String>,
    pub current_transaction: Option<String>,
    pub updated_at: DateTime<Utc>,
}

impl From<&Connector> for ConnectorDto {
    fn from(c: &Connector) -> Self {
        Self {
            connector_id: c.id,
            status: c.status.as_str().to_string(),
            error_code: c.error_code.clone(),
            current_transaction: c.current_transaction.clone(),
            updated_at: c.updated_at,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StationDto {
    pub id: String,
    pub vendor: Option<String>,
    pub model: Option<String>,
    pub firmware_version: Option<String>,
    pub ocpp_version: Option<String>,
    pub status: String,
    pub connected: bool,
    pub heartbeat_interval: u32,
    pub is_blocked: bool,
    pub location: Option<String>,
    pub last_boot_at: Option<DateTime<Utc>>,
    pub last_heartbeat: Option<DateTime<Utc>>,
    pub registered_at: DateTime<Utc>,
    pub connectors: Vec<ConnectorDto>,
}

impl StationDto {
    pub fn from_station(station: &Station, connected: bool) -> Self {
        Self {
            id: station.id.clone(),
            vendor: station.vendor.clone(),
            model: station.model.clone(),
            firmware_version: station.firmware_version.clone(),
            ocpp_version: station.ocpp_version.map(|v| v.version_string().to_string()),
            status: station.status.as_str().to_string(),
            connected,
            heartbeat_interval: station.heartbeat_interval,
            is_blocked: station.is_blocked,
            location: station.location.clone(),
            last_boot_at: station.last_boot_at,
            last_heartbeat: station.last_heartbeat,
            registered_at: station.registered_at,
            connectors: station.connectors.iter().map(ConnectorDto::from).collect(),
        }
    }
}

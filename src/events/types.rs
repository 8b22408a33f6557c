//! Event types published on the bus
//!
//! Everything that changes station, connector, or transaction state is
//! observable here; the liveness supervisor and metrics are the
//! in-process consumers.

use chrono::{DateTime, Utc};

use crate::domain::OcppVersion;

#[derive(Debug, Clone)]
pub struct StationConnectedEvent {
    pub station_id: String,
    pub version: OcppVersion,
    pub remote_addr: Option<String>,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct StationDisconnectedEvent {
    pub station_id: String,
    pub reason: Option<String>,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct BootReceivedEvent {
    pub station_id: String,
    pub vendor: String,
    pub model: String,
    pub firmware_version: Option<String>,
    pub accepted: bool,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct HeartbeatReceivedEvent {
    pub station_id: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct ConnectorStatusChangedEvent {
    pub station_id: String,
    pub connector_id: u32,
    pub status: String,
    pub error_code: Option<String>,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct TransactionStartedEvent {
    pub station_id: String,
    pub connector_id: u32,
    pub transaction_key: String,
    pub id_token: String,
    pub meter_start: i32,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct TransactionStoppedEvent {
    pub station_id: String,
    pub transaction_key: String,
    pub meter_stop: Option<i32>,
    pub energy_wh: Option<i32>,
    pub reason: Option<String>,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct MeterValuesEvent {
    pub station_id: String,
    pub connector_id: u32,
    pub transaction_key: Option<String>,
    pub energy_wh: Option<f64>,
    pub power_w: Option<f64>,
    pub soc: Option<i32>,
    pub timestamp: DateTime<Utc>,
}

/// All events the CSMS publishes.
#[derive(Debug, Clone)]
pub enum Event {
    StationConnected(StationConnectedEvent),
    StationDisconnected(StationDisconnectedEvent),
    BootReceived(BootReceivedEvent),
    HeartbeatReceived(HeartbeatReceivedEvent),
    ConnectorStatusChanged(ConnectorStatusChangedEvent),
    TransactionStarted(TransactionStartedEvent),
    TransactionStopped(TransactionStoppedEvent),
    MeterValuesReceived(MeterValuesEvent),
}

impl Event {
    /// Stable type label, used for metrics and logging.
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::StationConnected(_) => "station_connected",
            Self::StationDisconnected(_) => "station_disconnected",
            Self::BootReceived(_) => "boot_received",
            Self::HeartbeatReceived(_) => "heartbeat_received",
            Self::ConnectorStatusChanged(_) => "connector_status_changed",
            Self::TransactionStarted(_) => "transaction_started",
            Self::TransactionStopped(_) => "transaction_stopped",
            Self::MeterValuesReceived(_) => "meter_values_received",
        }
    }

    /// The station the event concerns.
    pub fn station_id(&self) -> &str {
        match self {
            Self::StationConnected(e) => &e.station_id,
            Self::StationDisconnected(e) => &e.station_id,
            Self::BootReceived(e) => &e.station_id,
            Self::HeartbeatReceived(e) => &e.station_id,
            Self::ConnectorStatusChanged(e) => &e.station_id,
            Self::TransactionStarted(e) => &e.station_id,
            Self::TransactionStopped(e) => &e.station_id,
            Self::MeterValuesReceived(e) => &e.station_id,
        }
    }
}

//! Transaction DTOs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{MeterSample, Transaction};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListTransactionsQuery {
    pub station_id: Option<String>,
    /// Active, Completed, Aborted
    pub status: Option<String>,
    pub limit: Option<u64>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionDto {
    pub key: String,
    pub station_id: String,
    pub connector_id: u32,
    pub transaction_id_v16: Option<i32>,
    pub transaction_id_v201: Option<String>,
    pub id_token: String,
    pub meter_start: i32,
    pub meter_stop: Option<i32>,
    pub energy_wh: Option<i32>,
    pub started_at: DateTime<Utc>,
    pub stopped_at: Option<DateTime<Utc>>,
    pub stop_reason: Option<String>,
    pub status: String,
}

impl From<&Transaction> for TransactionDto {
    fn from(tx: &Transaction) -> Self {
        Self {
            key: tx.key.clone(),
            station_id: tx.station_id.clone(),
            connector_id: tx.connector_id,
            transaction_id_v16: tx.wire_id_v16,
            transaction_id_v201: tx.wire_id_v201.clone(),
            id_token: tx.id_token.clone(),
            meter_start: tx.meter_start,
            meter_stop: tx.meter_stop,
            energy_wh: tx.energy_delivered(),
            started_at: tx.started_at,
            stopped_at: tx.stopped_at,
            stop_reason: tx.stop_reason.clone(),
            status: tx.status.as_str().to_string(),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MeterSampleDto {
    pub timestamp: DateTime<Utc>,
    pub energy_wh: Option<f64>,
    pub power_w: Option<f64>,
    pub soc: Option<i32>,
}

impl From<&MeterSample> for MeterSampleDto {
    fn from(s: &MeterSample) -> Self {
        Self {
            timestamp: s.timestamp,
            energy_wh: s.energy_wh,
            power_w: s.power_w,
            soc: s.soc,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionDetailDto {
    #[serde(flatten)]
    pub transaction: TransactionDto,
    pub samples: Vec<MeterSampleDto>,
}

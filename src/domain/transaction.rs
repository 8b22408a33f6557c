//! Transaction domain entity
//!
//! A transaction has two identities that must stay consistent: the
//! internal globally-unique `key` and the on-wire id the protocol uses
//! (an integer allocated by the CSMS in 1.6, an opaque string chosen by
//! the station in 2.0.1).

use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Transaction status
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionStatus {
    /// Energy is being delivered (or the session is open)
    Active,
    /// Stopped normally via StopTransaction / TransactionEvent Ended
    Completed,
    /// Ended abnormally (fault, connector force-released)
    Aborted,
}

impl TransactionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "Active",
            Self::Completed => "Completed",
            Self::Aborted => "Aborted",
        }
    }
}

impl From<&str> for TransactionStatus {
    fn from(s: &str) -> Self {
        match s {
            "Completed" => Self::Completed,
            "Aborted" => Self::Aborted,
            _ => Self::Active,
        }
    }
}

/// One time-series meter reading attached to a transaction.
#[derive(Debug, Clone, PartialEq)]
pub struct MeterSample {
    pub timestamp: DateTime<Utc>,
    /// Energy.Active.Import.Register in Wh
    pub energy_wh: Option<f64>,
    /// Power.Active.Import in W
    pub power_w: Option<f64>,
    /// State of charge in percent
    pub soc: Option<i32>,
}

/// Charging transaction
#[derive(Debug, Clone)]
pub struct Transaction {
    /// Internal globally-unique key
    pub key: String,
    pub station_id: String,
    pub connector_id: u32,
    /// On-wire id for OCPP 1.6 (CSMS-allocated, monotonic per station)
    pub wire_id_v16: Option<i32>,
    /// On-wire id for OCPP 2.0.1 (station-chosen opaque string)
    pub wire_id_v201: Option<String>,
    /// Credential that started the session
    pub id_token: String,
    /// Meter reading at start (Wh)
    pub meter_start: i32,
    /// Meter reading at stop (Wh)
    pub meter_stop: Option<i32>,
    pub started_at: DateTime<Utc>,
    pub stopped_at: Option<DateTime<Utc>>,
    pub stop_reason: Option<String>,
    pub status: TransactionStatus,
}

impl Transaction {
    fn new(
        station_id: impl Into<String>,
        connector_id: u32,
        id_token: impl Into<String>,
        meter_start: i32,
        started_at: DateTime<Utc>,
    ) -> Self {
        Self {
            key: Uuid::new_v4().to_string(),
            station_id: station_id.into(),
            connector_id,
            wire_id_v16: None,
            wire_id_v201: None,
            id_token: id_token.into(),
            meter_start,
            meter_stop: None,
            started_at,
            stopped_at: None,
            stop_reason: None,
            status: TransactionStatus::Active,
        }
    }

    /// New 1.6 transaction with a CSMS-allocated integer wire id.
    pub fn new_v16(
        station_id: impl Into<String>,
        connector_id: u32,
        id_token: impl Into<String>,
        meter_start: i32,
        started_at: DateTime<Utc>,
        wire_id: i32,
    ) -> Self {
        let mut tx = Self::new(station_id, connector_id, id_token, meter_start, started_at);
        tx.wire_id_v16 = Some(wire_id);
        tx
    }

    /// New 2.0.1 transaction with the station-chosen string wire id.
    pub fn new_v201(
        station_id: impl Into<String>,
        connector_id: u32,
        id_token: impl Into<String>,
        meter_start: i32,
        started_at: DateTime<Utc>,
        wire_id: impl Into<String>,
    ) -> Self {
        let mut tx = Self::new(station_id, connector_id, id_token, meter_start, started_at);
        tx.wire_id_v201 = Some(wire_id.into());
        tx
    }

    /// Close the transaction. A stop meter below the start meter is
    /// clamped so the completed invariant `meter_stop >= meter_start`
    /// always holds; the caller is told via the returned flag so it can
    /// log the bogus reading.
    pub fn complete(
        &mut self,
        meter_stop: i32,
        reason: Option<String>,
        now: DateTime<Utc>,
    ) -> bool {
        let clamped = meter_stop < self.meter_start;
        self.meter_stop = Some(meter_stop.max(self.meter_start));
        self.stopped_at = Some(now.max(self.started_at));
        self.stop_reason = reason;
        self.status = TransactionStatus::Completed;
        clamped
    }

    /// End the transaction abnormally (connector fault, takeover cleanup).
    pub fn abort(&mut self, reason: impl Into<String>, now: DateTime<Utc>) {
        self.stopped_at = Some(now.max(self.started_at));
        self.stop_reason = Some(reason.into());
        self.status = TransactionStatus::Aborted;
    }

    /// Energy delivered in Wh, defined once the transaction closed.
    pub fn energy_delivered(&self) -> Option<i32> {
        self.meter_stop.map(|stop| stop - self.meter_start)
    }

    pub fn is_active(&self) -> bool {
        self.status == TransactionStatus::Active
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_tx() -> Transaction {
        Transaction::new_v16("CP-001", 1, "TAG-1", 1000, Utc::now(), 1)
    }

    #[test]
    fn new_transaction_is_active() {
        let tx = sample_tx();
        assert!(tx.is_active());
        assert_eq!(tx.wire_id_v16, Some(1));
        assert!(tx.wire_id_v201.is_none());
        assert!(tx.meter_stop.is_none());
        assert!(tx.energy_delivered().is_none());
    }

    #[test]
    fn v201_transaction_keeps_station_chosen_id() {
        let tx = Transaction::new_v201("CP-001", 1, "TAG-1", 0, Utc::now(), "tx-abc");
        assert!(tx.wire_id_v16.is_none());
        assert_eq!(tx.wire_id_v201.as_deref(), Some("tx-abc"));
    }

    #[test]
    fn complete_sets_energy() {
        let mut tx = sample_tx();
        let clamped = tx.complete(2000, Some("Local".into()), Utc::now());
        assert!(!clamped);
        assert_eq!(tx.status, TransactionStatus::Completed);
        assert_eq!(tx.energy_delivered(), Some(1000));
        assert!(tx.stopped_at.unwrap() >= tx.started_at);
    }

    #[test]
    fn negative_delta_is_clamped() {
        let mut tx = sample_tx();
        let clamped = tx.complete(500, None, Utc::now());
        assert!(clamped);
        assert_eq!(tx.meter_stop, Some(1000));
        assert_eq!(tx.energy_delivered(), Some(0));
    }

    #[test]
    fn abort_keeps_meter_open() {
        let mut tx = sample_tx();
        tx.abort("ConnectorFaulted", Utc::now());
        assert_eq!(tx.status, TransactionStatus::Aborted);
        assert!(tx.meter_stop.is_none());
        assert_eq!(tx.stop_reason.as_deref(), Some("ConnectorFaulted"));
    }

    #[test]
    fn keys_are_unique() {
        assert_ne!(sample_tx().key, sample_tx().key);
    }
}

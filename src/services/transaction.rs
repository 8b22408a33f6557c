//! Transaction lifecycle
//!
//! Opening and closing charging sessions while holding the connector
//! lock, so a connector never carries two live transactions. Duplicate
//! station retries are answered idempotently; duplicate stops are
//! accepted no-ops.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{info, warn};

use crate::domain::{
    Connector, ConnectorStatus, DomainError, DomainResult, MeterSample, RepositoryProvider,
    Transaction, TransactionFilter,
};
use crate::events::{Event, EventBus, TransactionStartedEvent, TransactionStoppedEvent};

use super::connector_lock::ConnectorLockMap;

/// Per-transaction cap on buffered meter samples; oldest rows drop
/// first once reached.
pub const METER_SAMPLE_CAP: usize = 1000;

pub struct TransactionService {
    repos: Arc<dyn RepositoryProvider>,
    locks: Arc<ConnectorLockMap>,
    events: EventBus,
}

impl TransactionService {
    pub fn new(
        repos: Arc<dyn RepositoryProvider>,
        locks: Arc<ConnectorLockMap>,
        events: EventBus,
    ) -> Self {
        Self {
            repos,
            locks,
            events,
        }
    }

    /// Open a 1.6 transaction. The wire id is allocated by the CSMS,
    /// monotonically per station.
    ///
    /// A retry of the same start (same connector, token, and timestamp,
    /// transaction still active) returns the existing transaction. Any
    /// other start on a busy connector fails with `ConnectorBusy`.
    pub async fn open_transaction_v16(
        &self,
        station_id: &str,
        connector_id: u32,
        id_token: &str,
        meter_start: i32,
        timestamp: DateTime<Utc>,
    ) -> DomainResult<Transaction> {
        let _guard = self.locks.lock(station_id, connector_id).await;

        if let Some(existing) = self
            .repos
            .transactions()
            .find_active_for_connector(station_id, connector_id)
            .await?
        {
            if existing.id_token == id_token && existing.started_at == timestamp {
                info!(
                    station_id,
                    connector_id,
                    transaction_key = existing.key.as_str(),
                    "Duplicate StartTransaction retry, returning existing transaction"
                );
                return Ok(existing);
            }
            return Err(DomainError::ConnectorBusy(
                station_id.to_string(),
                connector_id,
            ));
        }

        let wire_id = self.repos.transactions().next_wire_id(station_id).await?;
        let tx = Transaction::new_v16(
            station_id,
            connector_id,
            id_token,
            meter_start,
            timestamp,
            wire_id,
        );
        self.install_open_transaction(&tx).await?;
        Ok(tx)
    }

    /// Open a 2.0.1 transaction. The wire id is the station-chosen
    /// opaque string; receiving the same id again while active is the
    /// idempotent retry case.
    pub async fn open_transaction_v201(
        &self,
        station_id: &str,
        connector_id: u32,
        id_token: &str,
        meter_start: i32,
        timestamp: DateTime<Utc>,
        wire_id: &str,
    ) -> DomainResult<Transaction> {
        let _guard = self.locks.lock(station_id, connector_id).await;

        if let Some(existing) = self
            .repos
            .transactions()
            .find_by_wire_id_v201(station_id, wire_id)
            .await?
        {
            if existing.is_active() {
                info!(
                    station_id,
                    wire_id,
                    transaction_key = existing.key.as_str(),
                    "Duplicate TransactionEvent(Started) retry, returning existing transaction"
                );
                return Ok(existing);
            }
        }

        if self
            .repos
            .transactions()
            .find_active_for_connector(station_id, connector_id)
            .await?
            .is_some()
        {
            return Err(DomainError::ConnectorBusy(
                station_id.to_string(),
                connector_id,
            ));
        }

        let tx = Transaction::new_v201(
            station_id,
            connector_id,
            id_token,
            meter_start,
            timestamp,
            wire_id,
        );
        self.install_open_transaction(&tx).await?;
        Ok(tx)
    }

    async fn install_open_transaction(&self, tx: &Transaction) -> DomainResult<()> {
        self.repos.transactions().insert(tx.clone()).await?;

        let mut connector = self
            .repos
            .stations()
            .find_connector(&tx.station_id, tx.connector_id)
            .await?
            .unwrap_or_else(|| Connector::new(tx.connector_id));
        connector.status = ConnectorStatus::Charging;
        connector.current_transaction = Some(tx.key.clone());
        connector.error_code = None;
        connector.updated_at = tx.started_at;
        self.repos
            .stations()
            .upsert_connector(&tx.station_id, connector)
            .await?;

        info!(
            station_id = tx.station_id.as_str(),
            connector_id = tx.connector_id,
            transaction_key = tx.key.as_str(),
            id_token = tx.id_token.as_str(),
            meter_start = tx.meter_start,
            "Transaction opened"
        );

        self.events
            .publish(Event::TransactionStarted(TransactionStartedEvent {
                station_id: tx.station_id.clone(),
                connector_id: tx.connector_id,
                transaction_key: tx.key.clone(),
                id_token: tx.id_token.clone(),
                meter_start: tx.meter_start,
                timestamp: tx.started_at,
            }));
        Ok(())
    }

    /// Close a 1.6 transaction by its integer wire id. `Ok(None)` means
    /// the id is unknown; the handler accepts anyway so the station
    /// stops retrying a stop that can never match.
    pub async fn close_transaction_v16(
        &self,
        station_id: &str,
        wire_id: i32,
        meter_stop: i32,
        reason: Option<String>,
        now: DateTime<Utc>,
    ) -> DomainResult<Option<Transaction>> {
        let tx = self
            .repos
            .transactions()
            .find_by_wire_id_v16(station_id, wire_id)
            .await?;
        match tx {
            Some(tx) => self.close(tx, meter_stop, reason, now).await.map(Some),
            None => {
                warn!(station_id, wire_id, "StopTransaction for unknown transaction id");
                Ok(None)
            }
        }
    }

    /// Close a 2.0.1 transaction by its string wire id.
    pub async fn close_transaction_v201(
        &self,
        station_id: &str,
        wire_id: &str,
        meter_stop: i32,
        reason: Option<String>,
        now: DateTime<Utc>,
    ) -> DomainResult<Option<Transaction>> {
        let tx = self
            .repos
            .transactions()
            .find_by_wire_id_v201(station_id, wire_id)
            .await?;
        match tx {
            Some(tx) => self.close(tx, meter_stop, reason, now).await.map(Some),
            None => {
                warn!(station_id, wire_id, "TransactionEvent(Ended) for unknown transaction id");
                Ok(None)
            }
        }
    }

    async fn close(
        &self,
        mut tx: Transaction,
        meter_stop: i32,
        reason: Option<String>,
        now: DateTime<Utc>,
    ) -> DomainResult<Transaction> {
        let _guard = self.locks.lock(&tx.station_id, tx.connector_id).await;

        if !tx.is_active() {
            info!(
                station_id = tx.station_id.as_str(),
                transaction_key = tx.key.as_str(),
                "Duplicate stop for closed transaction, accepting as no-op"
            );
            return Ok(tx);
        }

        let clamped = tx.complete(meter_stop, reason, now);
        if clamped {
            warn!(
                station_id = tx.station_id.as_str(),
                transaction_key = tx.key.as_str(),
                meter_start = tx.meter_start,
                meter_stop,
                "Stop meter below start meter, energy clamped to 0"
            );
        }
        self.repos.transactions().update(tx.clone()).await?;

        // The connector enters Finishing and stays bound to the closed
        // transaction until the station reports it free again.
        if let Some(mut connector) = self
            .repos
            .stations()
            .find_connector(&tx.station_id, tx.connector_id)
            .await?
        {
            if connector.current_transaction.as_deref() == Some(tx.key.as_str()) {
                connector.status = ConnectorStatus::Finishing;
                connector.updated_at = now;
                self.repos
                    .stations()
                    .upsert_connector(&tx.station_id, connector)
                    .await?;
            }
        }

        info!(
            station_id = tx.station_id.as_str(),
            transaction_key = tx.key.as_str(),
            energy_wh = ?tx.energy_delivered(),
            "Transaction closed"
        );

        self.events
            .publish(Event::TransactionStopped(TransactionStoppedEvent {
                station_id: tx.station_id.clone(),
                transaction_key: tx.key.clone(),
                meter_stop: tx.meter_stop,
                energy_wh: tx.energy_delivered(),
                reason: tx.stop_reason.clone(),
                timestamp: now,
            }));

        Ok(tx)
    }

    /// Append meter samples to a transaction's time series. Bounded:
    /// the oldest rows are dropped past [`METER_SAMPLE_CAP`].
    pub async fn append_meter(
        &self,
        transaction_key: &str,
        samples: &[MeterSample],
    ) -> DomainResult<()> {
        if samples.is_empty() {
            return Ok(());
        }
        self.repos
            .transactions()
            .append_samples(transaction_key, samples, METER_SAMPLE_CAP)
            .await
    }

    pub async fn find_active_for_connector(
        &self,
        station_id: &str,
        connector_id: u32,
    ) -> DomainResult<Option<Transaction>> {
        self.repos
            .transactions()
            .find_active_for_connector(station_id, connector_id)
            .await
    }

    pub async fn get_by_key(&self, key: &str) -> DomainResult<Option<Transaction>> {
        self.repos.transactions().find_by_key(key).await
    }

    pub async fn get_by_wire_id_v16(
        &self,
        station_id: &str,
        wire_id: i32,
    ) -> DomainResult<Option<Transaction>> {
        self.repos
            .transactions()
            .find_by_wire_id_v16(station_id, wire_id)
            .await
    }

    pub async fn get_by_wire_id_v201(
        &self,
        station_id: &str,
        wire_id: &str,
    ) -> DomainResult<Option<Transaction>> {
        self.repos
            .transactions()
            .find_by_wire_id_v201(station_id, wire_id)
            .await
    }

    pub async fn list(&self, filter: TransactionFilter) -> DomainResult<Vec<Transaction>> {
        self.repos.transactions().list(filter).await
    }

    pub async fn samples_for(&self, key: &str) -> DomainResult<Vec<MeterSample>> {
        self.repos.transactions().samples_for(key).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::TransactionStatus;
    use crate::infrastructure::memory::InMemoryRepositoryProvider;

    fn service() -> (TransactionService, Arc<InMemoryRepositoryProvider>) {
        let repos = Arc::new(InMemoryRepositoryProvider::new());
        let svc = TransactionService::new(
            repos.clone(),
            Arc::new(ConnectorLockMap::new()),
            EventBus::new(),
        );
        (svc, repos)
    }

    #[tokio::test]
    async fn open_assigns_monotonic_wire_ids_per_station() {
        let (svc, _) = service();
        let now = Utc::now();

        let tx1 = svc
            .open_transaction_v16("CP-001", 1, "TAG-1", 0, now)
            .await
            .unwrap();
        let tx2 = svc
            .open_transaction_v16("CP-001", 2, "TAG-2", 0, now)
            .await
            .unwrap();
        let other = svc
            .open_transaction_v16("CP-002", 1, "TAG-3", 0, now)
            .await
            .unwrap();

        assert_eq!(tx1.wire_id_v16, Some(1));
        assert_eq!(tx2.wire_id_v16, Some(2));
        // The counter is per station, not global.
        assert_eq!(other.wire_id_v16, Some(1));
    }

    #[tokio::test]
    async fn open_sets_connector_charging_with_ref() {
        let (svc, repos) = service();
        let tx = svc
            .open_transaction_v16("CP-001", 1, "TAG-1", 100, Utc::now())
            .await
            .unwrap();

        let connector = repos
            .stations()
            .find_connector("CP-001", 1)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(connector.status, ConnectorStatus::Charging);
        assert_eq!(connector.current_transaction.as_deref(), Some(tx.key.as_str()));
    }

    #[tokio::test]
    async fn busy_connector_rejects_second_start() {
        let (svc, _) = service();
        let now = Utc::now();
        svc.open_transaction_v16("CP-001", 1, "TAG-1", 0, now)
            .await
            .unwrap();

        let err = svc
            .open_transaction_v16("CP-001", 1, "TAG-2", 0, now + chrono::Duration::seconds(5))
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::ConnectorBusy(_, 1)));
    }

    #[tokio::test]
    async fn duplicate_v16_retry_is_idempotent() {
        let (svc, _) = service();
        let now = Utc::now();
        let first = svc
            .open_transaction_v16("CP-001", 1, "TAG-1", 0, now)
            .await
            .unwrap();
        let retry = svc
            .open_transaction_v16("CP-001", 1, "TAG-1", 0, now)
            .await
            .unwrap();
        assert_eq!(first.key, retry.key);
        assert_eq!(first.wire_id_v16, retry.wire_id_v16);
    }

    #[tokio::test]
    async fn duplicate_v201_start_returns_same_transaction() {
        let (svc, _) = service();
        let now = Utc::now();
        let first = svc
            .open_transaction_v201("CP-001", 1, "TAG-1", 0, now, "tx-1")
            .await
            .unwrap();
        let retry = svc
            .open_transaction_v201("CP-001", 1, "TAG-1", 0, now, "tx-1")
            .await
            .unwrap();
        assert_eq!(first.key, retry.key);
    }

    #[tokio::test]
    async fn close_completes_and_sets_finishing() {
        let (svc, repos) = service();
        let tx = svc
            .open_transaction_v16("CP-001", 1, "TAG-1", 1000, Utc::now())
            .await
            .unwrap();

        let closed = svc
            .close_transaction_v16("CP-001", tx.wire_id_v16.unwrap(), 2000, Some("Local".into()), Utc::now())
            .await
            .unwrap()
            .unwrap();

        assert_eq!(closed.status, TransactionStatus::Completed);
        assert_eq!(closed.energy_delivered(), Some(1000));

        // Finishing keeps the transaction bound until the station
        // reports the connector free.
        let connector = repos
            .stations()
            .find_connector("CP-001", 1)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(connector.status, ConnectorStatus::Finishing);
        assert_eq!(connector.current_transaction.as_deref(), Some(tx.key.as_str()));
    }

    #[tokio::test]
    async fn duplicate_stop_is_noop() {
        let (svc, _) = service();
        let tx = svc
            .open_transaction_v16("CP-001", 1, "TAG-1", 1000, Utc::now())
            .await
            .unwrap();
        let wire_id = tx.wire_id_v16.unwrap();

        let first = svc
            .close_transaction_v16("CP-001", wire_id, 2000, None, Utc::now())
            .await
            .unwrap()
            .unwrap();
        let second = svc
            .close_transaction_v16("CP-001", wire_id, 9999, Some("Retry".into()), Utc::now())
            .await
            .unwrap()
            .unwrap();

        // Unchanged by the duplicate.
        assert_eq!(second.meter_stop, first.meter_stop);
        assert_eq!(second.stop_reason, first.stop_reason);
    }

    #[tokio::test]
    async fn unknown_stop_id_returns_none() {
        let (svc, _) = service();
        let outcome = svc
            .close_transaction_v16("CP-001", 42, 2000, None, Utc::now())
            .await
            .unwrap();
        assert!(outcome.is_none());
    }

    #[tokio::test]
    async fn negative_delta_clamps_energy_to_zero() {
        let (svc, _) = service();
        let tx = svc
            .open_transaction_v16("CP-001", 1, "TAG-1", 1000, Utc::now())
            .await
            .unwrap();

        let closed = svc
            .close_transaction_v16("CP-001", tx.wire_id_v16.unwrap(), 500, None, Utc::now())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(closed.energy_delivered(), Some(0));
        assert_eq!(closed.meter_stop, Some(1000));
    }

    #[tokio::test]
    async fn meter_samples_are_capped() {
        let (svc, _) = service();
        let tx = svc
            .open_transaction_v16("CP-001", 1, "TAG-1", 0, Utc::now())
            .await
            .unwrap();

        let sample = |wh: f64| MeterSample {
            timestamp: Utc::now(),
            energy_wh: Some(wh),
            power_w: None,
            soc: None,
        };
        for i in 0..(METER_SAMPLE_CAP + 10) {
            svc.append_meter(&tx.key, &[sample(i as f64)]).await.unwrap();
        }

        let samples = svc.samples_for(&tx.key).await.unwrap();
        assert_eq!(samples.len(), METER_SAMPLE_CAP);
        // Oldest rows were dropped, newest survive.
        assert_eq!(samples.last().unwrap().energy_wh, Some((METER_SAMPLE_CAP + 9) as f64));
    }
}

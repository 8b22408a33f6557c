//! Station business logic
//!
//! Boot upsert, heartbeat bookkeeping, and authoritative status
//! reconciliation. The CSMS records what the station reports; what it
//! enforces are the cross-entity invariants: a connector that leaves
//! the occupied family releases (and if necessary aborts) its
//! transaction.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{info, warn};

use crate::domain::{
    Connector, ConnectorStatus, DomainError, DomainResult, OcppVersion, RepositoryProvider,
    Station, StationStatus,
};
use crate::events::{ConnectorStatusChangedEvent, Event, EventBus, TransactionStoppedEvent};

use super::connector_lock::ConnectorLockMap;

/// Result of a BootNotification upsert.
#[derive(Debug, Clone)]
pub struct BootOutcome {
    pub station: Station,
    /// False when the station is administratively blocked.
    pub accepted: bool,
    /// Heartbeat interval (or retry delay when rejected), seconds.
    pub interval: u32,
}

pub struct StationService {
    repos: Arc<dyn RepositoryProvider>,
    locks: Arc<ConnectorLockMap>,
    events: EventBus,
    /// Interval granted to stations at boot (seconds).
    heartbeat_interval: u32,
}

impl StationService {
    pub fn new(
        repos: Arc<dyn RepositoryProvider>,
        locks: Arc<ConnectorLockMap>,
        events: EventBus,
        heartbeat_interval: u32,
    ) -> Self {
        Self {
            repos,
            locks,
            events,
            heartbeat_interval,
        }
    }

    /// Create or update a station from a BootNotification. Blocked
    /// stations are rejected but their reported identity is still
    /// recorded.
    pub async fn upsert_station_on_boot(
        &self,
        id: &str,
        vendor: &str,
        model: &str,
        firmware_version: Option<&str>,
        version: OcppVersion,
        now: DateTime<Utc>,
    ) -> DomainResult<BootOutcome> {
        let mut station = self
            .repos
            .stations()
            .find_by_id(id)
            .await?
            .unwrap_or_else(|| Station::new(id));

        station.vendor = Some(vendor.to_string());
        station.model = Some(model.to_string());
        station.firmware_version = firmware_version.map(String::from);
        station.ocpp_version = Some(version);
        station.last_boot_at = Some(now);
        station.heartbeat_interval = self.heartbeat_interval;

        let accepted = !station.is_blocked;
        if accepted {
            station.set_online(now);
        } else {
            warn!(station_id = id, "Blocked station attempted to boot");
        }

        self.repos.stations().save(station.clone()).await?;

        // Connector 0 is the station itself; outlets appear lazily via
        // StatusNotification, but every station has at least one.
        for connector_id in 0..=1 {
            if self
                .repos
                .stations()
                .find_connector(id, connector_id)
                .await?
                .is_none()
            {
                self.repos
                    .stations()
                    .upsert_connector(id, Connector::new(connector_id))
                    .await?;
            }
        }

        info!(
            station_id = id,
            vendor,
            model,
            %version,
            accepted,
            "BootNotification processed"
        );

        Ok(BootOutcome {
            station,
            accepted,
            interval: self.heartbeat_interval,
        })
    }

    /// Record a heartbeat; brings the station Online.
    pub async fn record_heartbeat(&self, id: &str, now: DateTime<Utc>) -> DomainResult<()> {
        self.repos.stations().record_heartbeat(id, now).await
    }

    /// Apply a station-reported connector status. For connector 0 this
    /// updates the station itself.
    pub async fn update_connector_status(
        &self,
        station_id: &str,
        connector_id: u32,
        status: ConnectorStatus,
        error_code: Option<String>,
        now: DateTime<Utc>,
    ) -> DomainResult<()> {
        if connector_id == 0 {
            let station_status = match status {
                ConnectorStatus::Faulted => StationStatus::Faulted,
                ConnectorStatus::Unavailable => StationStatus::Offline,
                _ => StationStatus::Online,
            };
            self.update_station_status(station_id, station_status).await?;
        }

        let _guard = self.locks.lock(station_id, connector_id).await;

        let mut connector = self
            .repos
            .stations()
            .find_connector(station_id, connector_id)
            .await?
            .unwrap_or_else(|| Connector::new(connector_id));

        // A connector leaving the occupied family releases its
        // transaction; if that transaction is still active the station
        // has dropped it without a Stop, so it is aborted.
        if !status.is_occupied() {
            if let Some(tx_key) = connector.current_transaction.take() {
                self.release_transaction(station_id, &tx_key, status, now).await?;
            }
        }

        connector.status = status;
        connector.error_code = error_code.clone();
        connector.updated_at = now;

        self.repos
            .stations()
            .upsert_connector(station_id, connector)
            .await?;

        self.events
            .publish(Event::ConnectorStatusChanged(ConnectorStatusChangedEvent {
                station_id: station_id.to_string(),
                connector_id,
                status: status.as_str().to_string(),
                error_code,
                timestamp: now,
            }));

        Ok(())
    }

    async fn release_transaction(
        &self,
        station_id: &str,
        tx_key: &str,
        reported: ConnectorStatus,
        now: DateTime<Utc>,
    ) -> DomainResult<()> {
        let Some(mut tx) = self.repos.transactions().find_by_key(tx_key).await? else {
            return Ok(());
        };
        if !tx.is_active() {
            return Ok(());
        }

        warn!(
            station_id,
            transaction_key = tx_key,
            reported_status = reported.as_str(),
            "Connector left occupied state with an active transaction, aborting it"
        );
        tx.abort(format!("Connector{}", reported.as_str()), now);
        self.repos.transactions().update(tx.clone()).await?;

        self.events
            .publish(Event::TransactionStopped(TransactionStoppedEvent {
                station_id: station_id.to_string(),
                transaction_key: tx.key,
                meter_stop: tx.meter_stop,
                energy_wh: None,
                reason: tx.stop_reason,
                timestamp: now,
            }));
        Ok(())
    }

    pub async fn update_station_status(
        &self,
        id: &str,
        status: StationStatus,
    ) -> DomainResult<()> {
        self.repos.stations().update_status(id, status).await
    }

    /// Mark a silent or disconnected station Offline.
    pub async fn mark_offline(&self, id: &str) -> DomainResult<()> {
        self.update_station_status(id, StationStatus::Offline).await
    }

    /// Operator registration of a station before its first boot.
    pub async fn register_station(
        &self,
        id: &str,
        location: Option<String>,
    ) -> DomainResult<Station> {
        if self.repos.stations().find_by_id(id).await?.is_some() {
            return Err(DomainError::StationAlreadyExists(id.to_string()));
        }
        let mut station = Station::new(id);
        station.location = location;
        self.repos.stations().save(station.clone()).await?;
        info!(station_id = id, "Station registered");
        Ok(station)
    }

    pub async fn set_blocked(&self, id: &str, blocked: bool) -> DomainResult<()> {
        if self.repos.stations().find_by_id(id).await?.is_none() {
            return Err(DomainError::StationNotFound(id.to_string()));
        }
        self.repos.stations().set_blocked(id, blocked).await
    }

    /// Remember the last charging profile pushed to a station.
    pub async fn record_charging_profile(&self, id: &str, profile_id: i32) -> DomainResult<()> {
        self.repos
            .stations()
            .set_last_charging_profile(id, profile_id)
            .await
    }

    pub async fn get_station(&self, id: &str) -> DomainResult<Option<Station>> {
        self.repos.stations().find_by_id(id).await
    }

    pub async fn list_stations(&self) -> DomainResult<Vec<Station>> {
        self.repos.stations().find_all().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Transaction;
    use crate::infrastructure::memory::InMemoryRepositoryProvider;

    fn service() -> (StationService, Arc<InMemoryRepositoryProvider>) {
        let repos = Arc::new(InMemoryRepositoryProvider::new());
        let svc = StationService::new(
            repos.clone(),
            Arc::new(ConnectorLockMap::new()),
            EventBus::new(),
            300,
        );
        (svc, repos)
    }

    #[tokio::test]
    async fn boot_creates_station_and_connectors() {
        let (svc, repos) = service();
        let outcome = svc
            .upsert_station_on_boot("CP-001", "V", "M", Some("1.0"), OcppVersion::V16, Utc::now())
            .await
            .unwrap();

        assert!(outcome.accepted);
        assert_eq!(outcome.interval, 300);
        assert_eq!(outcome.station.status, StationStatus::Online);

        let station = repos.stations().find_by_id("CP-001").await.unwrap().unwrap();
        assert_eq!(station.vendor.as_deref(), Some("V"));
        assert_eq!(station.ocpp_version, Some(OcppVersion::V16));
        assert!(repos
            .stations()
            .find_connector("CP-001", 0)
            .await
            .unwrap()
            .is_some());
        assert!(repos
            .stations()
            .find_connector("CP-001", 1)
            .await
            .unwrap()
            .is_some());
    }

    #[tokio::test]
    async fn blocked_station_boot_is_rejected_but_recorded() {
        let (svc, repos) = service();
        svc.register_station("CP-001", None).await.unwrap();
        repos.stations().set_blocked("CP-001", true).await.unwrap();

        let outcome = svc
            .upsert_station_on_boot("CP-001", "V", "M", None, OcppVersion::V16, Utc::now())
            .await
            .unwrap();

        assert!(!outcome.accepted);
        let station = repos.stations().find_by_id("CP-001").await.unwrap().unwrap();
        assert_eq!(station.vendor.as_deref(), Some("V"));
        assert_ne!(station.status, StationStatus::Online);
    }

    #[tokio::test]
    async fn connector_zero_updates_station_status() {
        let (svc, repos) = service();
        svc.upsert_station_on_boot("CP-001", "V", "M", None, OcppVersion::V16, Utc::now())
            .await
            .unwrap();

        svc.update_connector_status("CP-001", 0, ConnectorStatus::Faulted, Some("GroundFailure".into()), Utc::now())
            .await
            .unwrap();

        let station = repos.stations().find_by_id("CP-001").await.unwrap().unwrap();
        assert_eq!(station.status, StationStatus::Faulted);
    }

    #[tokio::test]
    async fn status_update_creates_unknown_connector() {
        let (svc, repos) = service();
        svc.upsert_station_on_boot("CP-001", "V", "M", None, OcppVersion::V16, Utc::now())
            .await
            .unwrap();

        svc.update_connector_status("CP-001", 2, ConnectorStatus::Preparing, None, Utc::now())
            .await
            .unwrap();

        let connector = repos
            .stations()
            .find_connector("CP-001", 2)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(connector.status, ConnectorStatus::Preparing);
    }

    #[tokio::test]
    async fn leaving_occupied_family_aborts_active_transaction() {
        let (svc, repos) = service();
        svc.upsert_station_on_boot("CP-001", "V", "M", None, OcppVersion::V16, Utc::now())
            .await
            .unwrap();

        // Install an active transaction bound to connector 1.
        let tx = Transaction::new_v16("CP-001", 1, "TAG-1", 100, Utc::now(), 1);
        let key = tx.key.clone();
        repos.transactions().insert(tx).await.unwrap();
        let mut connector = Connector::new(1);
        connector.status = ConnectorStatus::Charging;
        connector.current_transaction = Some(key.clone());
        repos
            .stations()
            .upsert_connector("CP-001", connector)
            .await
            .unwrap();

        svc.update_connector_status("CP-001", 1, ConnectorStatus::Faulted, Some("OverCurrentFailure".into()), Utc::now())
            .await
            .unwrap();

        let connector = repos
            .stations()
            .find_connector("CP-001", 1)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(connector.status, ConnectorStatus::Faulted);
        assert!(connector.current_transaction.is_none());

        let tx = repos.transactions().find_by_key(&key).await.unwrap().unwrap();
        assert!(!tx.is_active());
        assert_eq!(tx.stop_reason.as_deref(), Some("ConnectorFaulted"));
    }

    #[tokio::test]
    async fn suspended_keeps_transaction_bound() {
        let (svc, repos) = service();
        svc.upsert_station_on_boot("CP-001", "V", "M", None, OcppVersion::V16, Utc::now())
            .await
            .unwrap();

        let tx = Transaction::new_v16("CP-001", 1, "TAG-1", 100, Utc::now(), 1);
        let key = tx.key.clone();
        repos.transactions().insert(tx).await.unwrap();
        let mut connector = Connector::new(1);
        connector.status = ConnectorStatus::Charging;
        connector.current_transaction = Some(key.clone());
        repos
            .stations()
            .upsert_connector("CP-001", connector)
            .await
            .unwrap();

        svc.update_connector_status("CP-001", 1, ConnectorStatus::SuspendedEV, None, Utc::now())
            .await
            .unwrap();

        let connector = repos
            .stations()
            .find_connector("CP-001", 1)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(connector.status, ConnectorStatus::SuspendedEV);
        assert_eq!(connector.current_transaction.as_deref(), Some(key.as_str()));
    }

    #[tokio::test]
    async fn register_twice_fails() {
        let (svc, _) = service();
        svc.register_station("CP-001", None).await.unwrap();
        assert!(matches!(
            svc.register_station("CP-001", None).await,
            Err(DomainError::StationAlreadyExists(_))
        ));
    }
}

//! Repository interfaces
//!
//! The persistence port for the service layer. Implementations live in
//! `infrastructure::database`; tests substitute in-memory fakes.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::error::DomainResult;
use super::station::{Connector, Station, StationStatus};
use super::transaction::{MeterSample, Transaction, TransactionStatus};
use super::user::User;

#[async_trait]
pub trait StationRepository: Send + Sync {
    /// Insert or fully replace a station row (connectors excluded).
    async fn save(&self, station: Station) -> DomainResult<()>;
    async fn find_by_id(&self, id: &str) -> DomainResult<Option<Station>>;
    async fn find_all(&self) -> DomainResult<Vec<Station>>;
    async fn update_status(&self, id: &str, status: StationStatus) -> DomainResult<()>;
    async fn record_heartbeat(&self, id: &str, now: DateTime<Utc>) -> DomainResult<()>;
    async fn set_blocked(&self, id: &str, blocked: bool) -> DomainResult<()>;
    async fn set_last_charging_profile(&self, id: &str, profile_id: i32) -> DomainResult<()>;
    async fn delete(&self, id: &str) -> DomainResult<()>;

    /// Insert or update a connector row keyed by (station, connector id).
    async fn upsert_connector(&self, station_id: &str, connector: Connector) -> DomainResult<()>;
    async fn find_connector(
        &self,
        station_id: &str,
        connector_id: u32,
    ) -> DomainResult<Option<Connector>>;
}

/// Filter for transaction listings on the REST surface.
#[derive(Debug, Clone, Default)]
pub struct TransactionFilter {
    pub station_id: Option<String>,
    pub status: Option<TransactionStatus>,
    pub limit: Option<u64>,
}

#[async_trait]
pub trait TransactionRepository: Send + Sync {
    async fn insert(&self, tx: Transaction) -> DomainResult<()>;
    async fn update(&self, tx: Transaction) -> DomainResult<()>;
    async fn find_by_key(&self, key: &str) -> DomainResult<Option<Transaction>>;
    async fn find_by_wire_id_v16(
        &self,
        station_id: &str,
        wire_id: i32,
    ) -> DomainResult<Option<Transaction>>;
    async fn find_by_wire_id_v201(
        &self,
        station_id: &str,
        wire_id: &str,
    ) -> DomainResult<Option<Transaction>>;
    async fn find_active_for_connector(
        &self,
        station_id: &str,
        connector_id: u32,
    ) -> DomainResult<Option<Transaction>>;
    async fn find_active_for_token(&self, id_token: &str) -> DomainResult<Option<Transaction>>;
    /// Allocate the next 1.6 wire id for a station (monotonic, starts at 1).
    async fn next_wire_id(&self, station_id: &str) -> DomainResult<i32>;
    async fn list(&self, filter: TransactionFilter) -> DomainResult<Vec<Transaction>>;

    /// Append meter samples, dropping the oldest rows beyond `cap`.
    async fn append_samples(
        &self,
        transaction_key: &str,
        samples: &[MeterSample],
        cap: usize,
    ) -> DomainResult<()>;
    async fn samples_for(&self, transaction_key: &str) -> DomainResult<Vec<MeterSample>>;
}

#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn insert(&self, user: User) -> DomainResult<()>;
    async fn find_by_token(&self, id_token: &str) -> DomainResult<Option<User>>;
    async fn find_all(&self) -> DomainResult<Vec<User>>;
}

/// Bundle of repositories handed to the service layer.
pub trait RepositoryProvider: Send + Sync {
    fn stations(&self) -> &dyn StationRepository;
    fn transactions(&self) -> &dyn TransactionRepository;
    fn users(&self) -> &dyn UserRepository;
}

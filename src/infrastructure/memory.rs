//! In-memory repository provider
//!
//! Backs the service layer without a database: unit tests and local
//! experiments. Same contract as the SeaORM implementation.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::{
    Connector, DomainResult, MeterSample, RepositoryProvider, Station, StationRepository,
    StationStatus, Transaction, TransactionFilter, TransactionRepository, TransactionStatus,
    User, UserRepository,
};

#[derive(Default)]
struct Stores {
    stations: HashMap<String, Station>,
    connectors: HashMap<(String, u32), Connector>,
    transactions: HashMap<String, Transaction>,
    samples: HashMap<String, Vec<MeterSample>>,
    users: HashMap<String, User>,
}

/// All five entity stores behind one mutex; contention is irrelevant at
/// test scale.
pub struct InMemoryRepositoryProvider {
    stores: Mutex<Stores>,
}

impl InMemoryRepositoryProvider {
    pub fn new() -> Self {
        Self {
            stores: Mutex::new(Stores::default()),
        }
    }
}

impl Default for InMemoryRepositoryProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl RepositoryProvider for InMemoryRepositoryProvider {
    fn stations(&self) -> &dyn StationRepository {
        self
    }

    fn transactions(&self) -> &dyn TransactionRepository {
        self
    }

    fn users(&self) -> &dyn UserRepository {
        self
    }
}

#[async_trait]
impl StationRepository for InMemoryRepositoryProvider {
    async fn save(&self, station: Station) -> DomainResult<()> {
        let mut stores = self.stores.lock().unwrap();
        stores.stations.insert(station.id.clone(), station);
        Ok(())
    }

    async fn find_by_id(&self, id: &str) -> DomainResult<Option<Station>> {
        let stores = self.stores.lock().unwrap();
        Ok(stores.stations.get(id).map(|s| {
            let mut station = s.clone();
            let mut connectors: Vec<Connector> = stores
                .connectors
                .iter()
                .filter(|((sid, _), _)| sid == id)
                .map(|(_, c)| c.clone())
                .collect();
            connectors.sort_by_key(|c| c.id);
            station.connectors = connectors;
            station
        }))
    }

    async fn find_all(&self) -> DomainResult<Vec<Station>> {
        let ids: Vec<String> = {
            let stores = self.stores.lock().unwrap();
            stores.stations.keys().cloned().collect()
        };
        let mut out = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(station) = self.find_by_id(&id).await? {
                out.push(station);
            }
        }
        out.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(out)
    }

    async fn update_status(&self, id: &str, status: StationStatus) -> DomainResult<()> {
        let mut stores = self.stores.lock().unwrap();
        if let Some(station) = stores.stations.get_mut(id) {
            station.status = status;
        }
        Ok(())
    }

    async fn record_heartbeat(&self, id: &str, now: DateTime<Utc>) -> DomainResult<()> {
        let mut stores = self.stores.lock().unwrap();
        if let Some(station) = stores.stations.get_mut(id) {
            station.record_heartbeat(now);
        }
        Ok(())
    }

    async fn set_blocked(&self, id: &str, blocked: bool) -> DomainResult<()> {
        let mut stores = self.stores.lock().unwrap();
        if let Some(station) = stores.stations.get_mut(id) {
            station.is_blocked = blocked;
        }
        Ok(())
    }

    async fn set_last_charging_profile(&self, id: &str, profile_id: i32) -> DomainResult<()> {
        let mut stores = self.stores.lock().unwrap();
        if let Some(station) = stores.stations.get_mut(id) {
            station.last_charging_profile_id = Some(profile_id);
        }
        Ok(())
    }

    async fn delete(&self, id: &str) -> DomainResult<()> {
        let mut stores = self.stores.lock().unwrap();
        stores.stations.remove(id);
        stores.connectors.retain(|(sid, _), _| sid != id);
        let keys: Vec<String> = stores
            .transactions
            .iter()
            .filter(|(_, tx)| tx.station_id == id)
            .map(|(k, _)| k.clone())
            .collect();
        for key in keys {
            stores.transactions.remove(&key);
            stores.samples.remove(&key);
        }
        Ok(())
    }

    async fn upsert_connector(&self, station_id: &str, connector: Connector) -> DomainResult<()> {
        let mut stores = self.stores.lock().unwrap();
        stores
            .connectors
            .insert((station_id.to_string(), connector.id), connector);
        Ok(())
    }

    async fn find_connector(
        &self,
        station_id: &str,
        connector_id: u32,
    ) -> DomainResult<Option<Connector>> {
        let stores = self.stores.lock().unwrap();
        Ok(stores
            .connectors
            .get(&(station_id.to_string(), connector_id))
            .cloned())
    }
}

#[async_trait]
impl TransactionRepository for InMemoryRepositoryProvider {
    async fn insert(&self, tx: Transaction) -> DomainResult<()> {
        let mut stores = self.stores.lock().unwrap();
        stores.transactions.insert(tx.key.clone(), tx);
        Ok(())
    }

    async fn update(&self, tx: Transaction) -> DomainResult<()> {
        let mut stores = self.stores.lock().unwrap();
        stores.transactions.insert(tx.key.clone(), tx);
        Ok(())
    }

    async fn find_by_key(&self, key: &str) -> DomainResult<Option<Transaction>> {
        let stores = self.stores.lock().unwrap();
        Ok(stores.transactions.get(key).cloned())
    }

    async fn find_by_wire_id_v16(
        &self,
        station_id: &str,
        wire_id: i32,
    ) -> DomainResult<Option<Transaction>> {
        let stores = self.stores.lock().unwrap();
        Ok(stores
            .transactions
            .values()
            .find(|tx| tx.station_id == station_id && tx.wire_id_v16 == Some(wire_id))
            .cloned())
    }

    async fn find_by_wire_id_v201(
        &self,
        station_id: &str,
        wire_id: &str,
    ) -> DomainResult<Option<Transaction>> {
        let stores = self.stores.lock().unwrap();
        Ok(stores
            .transactions
            .values()
            .find(|tx| {
                tx.station_id == station_id && tx.wire_id_v201.as_deref() == Some(wire_id)
            })
            .cloned())
    }

    async fn find_active_for_connector(
        &self,
        station_id: &str,
        connector_id: u32,
    ) -> DomainResult<Option<Transaction>> {
        let stores = self.stores.lock().unwrap();
        Ok(stores
            .transactions
            .values()
            .find(|tx| {
                tx.station_id == station_id
                    && tx.connector_id == connector_id
                    && tx.status == TransactionStatus::Active
            })
            .cloned())
    }

    async fn find_active_for_token(&self, id_token: &str) -> DomainResult<Option<Transaction>> {
        let stores = self.stores.lock().unwrap();
        Ok(stores
            .transactions
            .values()
            .find(|tx| tx.id_token == id_token && tx.status == TransactionStatus::Active)
            .cloned())
    }

    async fn next_wire_id(&self, station_id: &str) -> DomainResult<i32> {
        let stores = self.stores.lock().unwrap();
        let max = stores
            .transactions
            .values()
            .filter(|tx| tx.station_id == station_id)
            .filter_map(|tx| tx.wire_id_v16)
            .max()
            .unwrap_or(0);
        Ok(max + 1)
    }

    async fn list(&self, filter: TransactionFilter) -> DomainResult<Vec<Transaction>> {
        let stores = self.stores.lock().unwrap();
        let mut out: Vec<Transaction> = stores
            .transactions
            .values()
            .filter(|tx| {
                filter
                    .station_id
                    .as_deref()
                    .map(|id| tx.station_id == id)
                    .unwrap_or(true)
                    && filter.status.map(|s| tx.status == s).unwrap_or(true)
            })
            .cloned()
            .collect();
        out.sort_by(|a, b| b.started_at.cmp(&a.started_at));
        if let Some(limit) = filter.limit {
            out.truncate(limit as usize);
        }
        Ok(out)
    }

    async fn append_samples(
        &self,
        transaction_key: &str,
        samples: &[MeterSample],
        cap: usize,
    ) -> DomainResult<()> {
        let mut stores = self.stores.lock().unwrap();
        let series = stores
            .samples
            .entry(transaction_key.to_string())
            .or_default();
        series.extend_from_slice(samples);
        if series.len() > cap {
            let excess = series.len() - cap;
            series.drain(0..excess);
        }
        Ok(())
    }

    async fn samples_for(&self, transaction_key: &str) -> DomainResult<Vec<MeterSample>> {
        let stores = self.stores.lock().unwrap();
        Ok(stores
            .samples
            .get(transaction_key)
            .cloned()
            .unwrap_or_default())
    }
}

#[async_trait]
impl UserRepository for InMemoryRepositoryProvider {
    async fn insert(&self, user: User) -> DomainResult<()> {
        let mut stores = self.stores.lock().unwrap();
        if stores.users.contains_key(&user.id_token) {
            return Err(crate::domain::DomainError::UserAlreadyExists(
                user.id_token.clone(),
            ));
        }
        stores.users.insert(user.id_token.clone(), user);
        Ok(())
    }

    async fn find_by_token(&self, id_token: &str) -> DomainResult<Option<User>> {
        let stores = self.stores.lock().unwrap();
        Ok(stores.users.get(id_token).cloned())
    }

    async fn find_all(&self) -> DomainResult<Vec<User>> {
        let stores = self.stores.lock().unwrap();
        let mut out: Vec<User> = stores.users.values().cloned().collect();
        out.sort_by(|a, b| a.username.cmp(&b.username));
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn station_roundtrip_includes_connectors() {
        let repos = InMemoryRepositoryProvider::new();
        repos.save(Station::new("CP-001")).await.unwrap();
        repos
            .upsert_connector("CP-001", Connector::new(1))
            .await
            .unwrap();

        let station = repos.find_by_id("CP-001").await.unwrap().unwrap();
        assert_eq!(station.connectors.len(), 1);
        assert_eq!(station.connectors[0].id, 1);
    }

    #[tokio::test]
    async fn delete_cascades() {
        let repos = InMemoryRepositoryProvider::new();
        repos.save(Station::new("CP-001")).await.unwrap();
        repos
            .upsert_connector("CP-001", Connector::new(1))
            .await
            .unwrap();
        let tx = Transaction::new_v16("CP-001", 1, "TAG-1", 0, Utc::now(), 1);
        let key = tx.key.clone();
        TransactionRepository::insert(&repos, tx).await.unwrap();

        StationRepository::delete(&repos, "CP-001").await.unwrap();
        assert!(repos.find_by_id("CP-001").await.unwrap().is_none());
        assert!(repos.find_by_key(&key).await.unwrap().is_none());
        assert!(repos.find_connector("CP-001", 1).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn duplicate_token_rejected() {
        let repos = InMemoryRepositoryProvider::new();
        UserRepository::insert(&repos, User::new("alice", "TAG-1"))
            .await
            .unwrap();
        assert!(UserRepository::insert(&repos, User::new("bob", "TAG-1"))
            .await
            .is_err());
    }
}

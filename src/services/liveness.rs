//! Liveness supervisor
//!
//! Periodically sweeps all stations last seen online and compares the
//! time since their last heartbeat against `interval * grace`. Silent
//! stations are marked Offline; a still-registered session is asked to
//! drain to recover from half-open TCP connections.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tracing::{debug, info, warn};

use crate::domain::{RepositoryProvider, StationStatus};
use crate::session::ConnectionRegistry;
use crate::shared::ShutdownSignal;

/// Supervisor tuning.
#[derive(Debug, Clone)]
pub struct LivenessConfig {
    /// Sweep period
    pub tick: Duration,
    /// Multiplier on the station's granted heartbeat interval
    pub grace_factor: f64,
}

impl Default for LivenessConfig {
    fn default() -> Self {
        Self {
            tick: Duration::from_secs(30),
            grace_factor: 2.5,
        }
    }
}

pub struct LivenessSupervisor {
    repos: Arc<dyn RepositoryProvider>,
    registry: Arc<ConnectionRegistry>,
    config: LivenessConfig,
}

impl LivenessSupervisor {
    pub fn new(
        repos: Arc<dyn RepositoryProvider>,
        registry: Arc<ConnectionRegistry>,
        config: LivenessConfig,
    ) -> Self {
        Self {
            repos,
            registry,
            config,
        }
    }

    /// Spawn the background sweep loop; stops on shutdown.
    pub fn start(self: Arc<Self>, shutdown: ShutdownSignal) {
        tokio::spawn(async move {
            info!(
                tick = ?self.config.tick,
                grace = self.config.grace_factor,
                "Liveness supervisor started"
            );
            let mut interval = tokio::time::interval(self.config.tick);
            loop {
                tokio::select! {
                    _ = interval.tick() => {
                        if let Err(e) = self.sweep().await {
                            warn!(error = %e, "Liveness sweep failed");
                        }
                    }
                    _ = shutdown.notified().wait() => {
                        info!("Liveness supervisor shutting down");
                        break;
                    }
                }
            }
        });
    }

    /// One sweep over all stations.
    pub async fn sweep(&self) -> crate::domain::DomainResult<()> {
        let stations = self.repos.stations().find_all().await?;
        let now = Utc::now();

        debug!(count = stations.len(), "Liveness sweep");

        for station in stations {
            if station.status != StationStatus::Online {
                continue;
            }
            if !station.is_silent(now, self.config.grace_factor) {
                continue;
            }

            warn!(
                station_id = station.id.as_str(),
                last_heartbeat = ?station.last_heartbeat,
                interval = station.heartbeat_interval,
                "Station silent past grace, marking Offline"
            );

            if let Err(e) = self
                .repos
                .stations()
                .update_status(&station.id, StationStatus::Offline)
                .await
            {
                warn!(station_id = station.id.as_str(), error = %e, "Failed to mark station offline");
                continue;
            }

            // Half-open recovery: the socket may still look connected.
            if let Some(session) = self.registry.get(&station.id) {
                info!(
                    station_id = station.id.as_str(),
                    "Draining half-open session for silent station"
                );
                session.request_drain();
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Station;
    use crate::infrastructure::memory::InMemoryRepositoryProvider;

    fn supervisor(
        repos: Arc<InMemoryRepositoryProvider>,
        registry: Arc<ConnectionRegistry>,
    ) -> LivenessSupervisor {
        LivenessSupervisor::new(repos, registry, LivenessConfig::default())
    }

    #[tokio::test]
    async fn silent_station_goes_offline() {
        let repos = Arc::new(InMemoryRepositoryProvider::new());
        let registry = ConnectionRegistry::shared();

        let mut station = Station::new("CP-003");
        station.heartbeat_interval = 60;
        station.status = StationStatus::Online;
        station.last_heartbeat = Some(Utc::now() - chrono::Duration::seconds(200));
        repos.stations().save(station).await.unwrap();

        supervisor(repos.clone(), registry).sweep().await.unwrap();

        let station = repos.stations().find_by_id("CP-003").await.unwrap().unwrap();
        assert_eq!(station.status, StationStatus::Offline);
    }

    #[tokio::test]
    async fn fresh_station_stays_online() {
        let repos = Arc::new(InMemoryRepositoryProvider::new());
        let registry = ConnectionRegistry::shared();

        let mut station = Station::new("CP-001");
        station.heartbeat_interval = 60;
        station.status = StationStatus::Online;
        station.last_heartbeat = Some(Utc::now() - chrono::Duration::seconds(30));
        repos.stations().save(station).await.unwrap();

        supervisor(repos.clone(), registry).sweep().await.unwrap();

        let station = repos.stations().find_by_id("CP-001").await.unwrap().unwrap();
        assert_eq!(station.status, StationStatus::Online);
    }

    #[tokio::test]
    async fn offline_station_is_ignored() {
        let repos = Arc::new(InMemoryRepositoryProvider::new());
        let registry = ConnectionRegistry::shared();

        let mut station = Station::new("CP-002");
        station.heartbeat_interval = 60;
        station.status = StationStatus::Offline;
        station.last_heartbeat = Some(Utc::now() - chrono::Duration::days(1));
        repos.stations().save(station).await.unwrap();

        supervisor(repos.clone(), registry).sweep().await.unwrap();

        let station = repos.stations().find_by_id("CP-002").await.unwrap().unwrap();
        assert_eq!(station.status, StationStatus::Offline);
    }

    #[tokio::test]
    async fn silent_station_session_is_drained() {
        use crate::domain::OcppVersion;
        use crate::session::Session;
        use tokio::sync::mpsc;

        let repos = Arc::new(InMemoryRepositoryProvider::new());
        let registry = ConnectionRegistry::shared();

        let mut station = Station::new("CP-003");
        station.heartbeat_interval = 60;
        station.status = StationStatus::Online;
        station.last_heartbeat = Some(Utc::now() - chrono::Duration::seconds(500));
        repos.stations().save(station).await.unwrap();

        let (tx, _rx) = mpsc::channel(8);
        let session = Session::new("CP-003", OcppVersion::V16, tx, None);
        registry.register(session.clone()).await;

        supervisor(repos, registry).sweep().await.unwrap();

        assert_eq!(session.state(), crate::session::SessionState::Draining);
    }
}

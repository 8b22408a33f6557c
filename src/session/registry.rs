//! Connection registry
//!
//! Process-wide map from station id to the live [`Session`]. At most
//! one session per station id: registering over an existing entry
//! performs a takeover — the old session is asked to drain and the new
//! one is installed once it acknowledges (or a bounded grace passes).

use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use tracing::{info, warn};

use crate::domain::OcppVersion;

use super::connection::Session;

/// How long a replaced session gets to acknowledge the drain before the
/// new one is installed anyway.
const TAKEOVER_GRACE: Duration = Duration::from_secs(1);

/// Outcome of a registration attempt.
#[derive(Debug)]
pub enum RegisterOutcome {
    /// Fresh connection, no previous session existed
    New,
    /// Replaced an existing session for the same station id
    TookOver {
        /// Whether the old session closed within the grace window
        drained_in_time: bool,
    },
}

/// Thread-safe registry of live station sessions.
pub struct ConnectionRegistry {
    sessions: DashMap<String, Arc<Session>>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self {
            sessions: DashMap::new(),
        }
    }

    pub fn shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Install `session` under its station id, evicting any previous
    /// session first. The evicted session is asked to drain and we wait
    /// (bounded) for it to close so its teardown cannot race the new
    /// connection's setup.
    pub async fn register(&self, session: Arc<Session>) -> RegisterOutcome {
        let station_id = session.station_id().to_string();

        let evicted = self.sessions.remove(&station_id).map(|(_, old)| old);

        let outcome = match evicted {
            Some(old) => {
                warn!(
                    station_id = station_id.as_str(),
                    old_version = %old.version(),
                    connected_since = %old.connected_at(),
                    "Evicting existing session, new connection takes over"
                );
                old.request_drain();
                let drained_in_time =
                    tokio::time::timeout(TAKEOVER_GRACE, old.wait_closed()).await.is_ok();
                if !drained_in_time {
                    warn!(
                        station_id = station_id.as_str(),
                        "Old session did not close within grace, forcing"
                    );
                    old.mark_closed();
                }
                RegisterOutcome::TookOver { drained_in_time }
            }
            None => RegisterOutcome::New,
        };

        info!(station_id = station_id.as_str(), version = %session.version(), "Session registered");
        self.sessions.insert(station_id, session);
        metrics::gauge!("csms_connected_stations").set(self.sessions.len() as f64);

        outcome
    }

    /// Remove the session, but only if the mapped entry is this exact
    /// session object — a replaced session must not evict its
    /// replacement. Returns whether an entry was removed.
    pub fn unregister(&self, session: &Arc<Session>) -> bool {
        let station_id = session.station_id();
        let removed = self
            .sessions
            .remove_if(station_id, |_, current| Arc::ptr_eq(current, session))
            .is_some();

        if removed {
            metrics::gauge!("csms_connected_stations").set(self.sessions.len() as f64);
            info!(station_id, "Session unregistered");
        }
        removed
    }

    pub fn get(&self, station_id: &str) -> Option<Arc<Session>> {
        self.sessions.get(station_id).map(|e| e.value().clone())
    }

    /// Whether `session` is still the registered session for its id.
    /// A session that observes `false` here has been replaced and must
    /// terminate itself.
    pub fn is_current(&self, session: &Arc<Session>) -> bool {
        self.sessions
            .get(session.station_id())
            .map(|current| Arc::ptr_eq(current.value(), session))
            .unwrap_or(false)
    }

    pub fn is_connected(&self, station_id: &str) -> bool {
        self.sessions.contains_key(station_id)
    }

    pub fn get_version(&self, station_id: &str) -> Option<OcppVersion> {
        self.sessions.get(station_id).map(|e| e.version())
    }

    pub fn connected_ids(&self) -> Vec<String> {
        self.sessions.iter().map(|e| e.key().clone()).collect()
    }

    pub fn list(&self) -> Vec<Arc<Session>> {
        self.sessions.iter().map(|e| e.value().clone()).collect()
    }

    pub fn count(&self) -> usize {
        self.sessions.len()
    }

    /// Update the last-activity stamp for a station, if connected.
    pub fn touch(&self, station_id: &str) {
        if let Some(session) = self.sessions.get(station_id) {
            session.touch();
        }
    }

    /// Ask every session to drain (graceful shutdown path).
    pub fn drain_all(&self) {
        for entry in self.sessions.iter() {
            entry.value().request_drain();
        }
    }
}

impl Default for ConnectionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::connection::OUTBOUND_QUEUE_CAPACITY;
    use tokio::sync::mpsc;

    fn make_session(id: &str) -> Arc<Session> {
        let (tx, _rx) = mpsc::channel(OUTBOUND_QUEUE_CAPACITY);
        Session::new(id, OcppVersion::V16, tx, None)
    }

    #[tokio::test]
    async fn register_and_lookup() {
        let registry = ConnectionRegistry::new();
        let session = make_session("CP-001");

        match registry.register(session.clone()).await {
            RegisterOutcome::New => {}
            other => panic!("expected New, got {:?}", other),
        }

        assert!(registry.is_connected("CP-001"));
        assert_eq!(registry.count(), 1);
        assert!(registry.is_current(&session));
        assert_eq!(registry.get_version("CP-001"), Some(OcppVersion::V16));
    }

    #[tokio::test]
    async fn takeover_evicts_and_closes_old_session() {
        let registry = ConnectionRegistry::new();
        let first = make_session("CP-001");
        let second = make_session("CP-001");

        registry.register(first.clone()).await;
        let outcome = registry.register(second.clone()).await;

        match outcome {
            RegisterOutcome::TookOver { .. } => {}
            other => panic!("expected TookOver, got {:?}", other),
        }

        // The first session is closed and no longer current.
        assert_eq!(first.state(), crate::session::SessionState::Closed);
        assert!(!registry.is_current(&first));
        assert!(registry.is_current(&second));
        assert_eq!(registry.count(), 1);
    }

    #[tokio::test]
    async fn replaced_session_cannot_unregister_replacement() {
        let registry = ConnectionRegistry::new();
        let first = make_session("CP-001");
        let second = make_session("CP-001");

        registry.register(first.clone()).await;
        registry.register(second.clone()).await;

        // The replaced session's teardown runs late; it must be a no-op.
        assert!(!registry.unregister(&first));
        assert!(registry.is_connected("CP-001"));

        assert!(registry.unregister(&second));
        assert!(!registry.is_connected("CP-001"));
    }

    #[tokio::test]
    async fn drain_all_requests_drain() {
        let registry = ConnectionRegistry::new();
        let session = make_session("CP-001");
        registry.register(session.clone()).await;

        registry.drain_all();
        assert_eq!(session.state(), crate::session::SessionState::Draining);
    }
}

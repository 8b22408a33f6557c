//! Per-connection session
//!
//! One `Session` wraps one live WebSocket. It owns the outbound write
//! queue and the pending-call table; the reader/writer tasks live in
//! `interfaces::ws` and drive it. Lifecycle: Active -> Draining ->
//! Closed. In Draining no new outbound CALLs are accepted; Closed fails
//! every pending call with `Disconnected`.

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde_json::Value;
use tokio::sync::{mpsc, Notify};
use tracing::debug;
use uuid::Uuid;

use crate::domain::OcppVersion;
use crate::ocpp::OcppFrame;

use super::pending::{CallFailure, PendingCallTable};

/// Capacity of the bounded outbound write queue.
pub const OUTBOUND_QUEUE_CAPACITY: usize = 64;

/// Session lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum SessionState {
    /// Servicing traffic in both directions
    Active = 0,
    /// Close requested; no new outbound CALLs accepted
    Draining = 1,
    /// Socket gone; all pending calls failed
    Closed = 2,
}

/// A live station connection.
pub struct Session {
    station_id: String,
    version: OcppVersion,
    remote_addr: Option<String>,
    state: AtomicU8,
    outbound: mpsc::Sender<String>,
    pending: PendingCallTable,
    drain_notify: Notify,
    closed_notify: Notify,
    connected_at: DateTime<Utc>,
    last_activity: std::sync::Mutex<DateTime<Utc>>,
}

impl Session {
    pub fn new(
        station_id: impl Into<String>,
        version: OcppVersion,
        outbound: mpsc::Sender<String>,
        remote_addr: Option<String>,
    ) -> Arc<Self> {
        let now = Utc::now();
        Arc::new(Self {
            station_id: station_id.into(),
            version,
            remote_addr,
            state: AtomicU8::new(SessionState::Active as u8),
            outbound,
            pending: PendingCallTable::new(),
            drain_notify: Notify::new(),
            closed_notify: Notify::new(),
            connected_at: now,
            last_activity: std::sync::Mutex::new(now),
        })
    }

    pub fn station_id(&self) -> &str {
        &self.station_id
    }

    pub fn version(&self) -> OcppVersion {
        self.version
    }

    pub fn remote_addr(&self) -> Option<&str> {
        self.remote_addr.as_deref()
    }

    pub fn connected_at(&self) -> DateTime<Utc> {
        self.connected_at
    }

    pub fn state(&self) -> SessionState {
        match self.state.load(Ordering::SeqCst) {
            0 => SessionState::Active,
            1 => SessionState::Draining,
            _ => SessionState::Closed,
        }
    }

    pub fn is_active(&self) -> bool {
        self.state() == SessionState::Active
    }

    /// Record inbound traffic (any frame counts as liveness).
    pub fn touch(&self) {
        *self.last_activity.lock().unwrap() = Utc::now();
    }

    pub fn last_activity(&self) -> DateTime<Utc> {
        *self.last_activity.lock().unwrap()
    }

    // ── Outbound path ──────────────────────────────────────

    /// Queue a frame for the writer task. Fails when the session is no
    /// longer active or the bounded queue is gone.
    pub async fn enqueue_frame(&self, frame: &OcppFrame) -> Result<(), CallFailure> {
        if self.state() == SessionState::Closed {
            return Err(CallFailure::Disconnected);
        }
        self.outbound
            .send(frame.serialize())
            .await
            .map_err(|_| CallFailure::Disconnected)
    }

    /// Issue an outbound CALL and await its completion.
    ///
    /// Assigns a fresh messageId, registers a pending call, enqueues
    /// the frame, and resolves with the CALLRESULT payload — or rejects
    /// with the CALLERROR, `Timeout` after `deadline`, or
    /// `Disconnected`.
    pub async fn send_call(
        &self,
        action: &str,
        payload: Value,
        deadline: Duration,
    ) -> Result<Value, CallFailure> {
        if self.state() != SessionState::Active {
            return Err(CallFailure::Disconnected);
        }

        let message_id = Uuid::new_v4().to_string();
        let frame = OcppFrame::Call {
            message_id: message_id.clone(),
            action: action.to_string(),
            payload,
        };

        let rx = self.pending.insert(message_id.clone(), action);

        if let Err(e) = self.enqueue_frame(&frame).await {
            self.pending.complete(&message_id, Err(e.clone()));
            return Err(e);
        }

        debug!(
            station_id = self.station_id.as_str(),
            action,
            message_id = message_id.as_str(),
            "Outbound call queued"
        );

        match tokio::time::timeout(deadline, rx).await {
            Ok(Ok(outcome)) => outcome,
            // Sender dropped without completing: the table was torn down.
            Ok(Err(_)) => Err(CallFailure::Disconnected),
            Err(_) => {
                self.pending.expire(&message_id);
                Err(CallFailure::Timeout)
            }
        }
    }

    /// Route a CALLRESULT/CALLERROR from the reader to its caller.
    /// Returns the action name when a pending call matched.
    pub fn complete_call(
        &self,
        message_id: &str,
        outcome: Result<Value, CallFailure>,
    ) -> Option<String> {
        self.pending.complete(message_id, outcome)
    }

    pub fn pending_calls(&self) -> usize {
        self.pending.len()
    }

    // ── Lifecycle ──────────────────────────────────────────

    /// Ask the session to stop: no new outbound CALLs, reader winds
    /// down. Idempotent; does nothing once closed.
    pub fn request_drain(&self) {
        let _ = self.state.compare_exchange(
            SessionState::Active as u8,
            SessionState::Draining as u8,
            Ordering::SeqCst,
            Ordering::SeqCst,
        );
        self.drain_notify.notify_waiters();
        self.drain_notify.notify_one();
    }

    /// Resolve once a drain has been requested (or immediately if the
    /// session already left the Active state).
    pub async fn drain_requested(&self) {
        loop {
            if self.state() != SessionState::Active {
                return;
            }
            self.drain_notify.notified().await;
        }
    }

    /// Terminal transition: fail all pending calls and wake
    /// `wait_closed` waiters. Idempotent.
    pub fn mark_closed(&self) {
        let prev = self.state.swap(SessionState::Closed as u8, Ordering::SeqCst);
        if prev != SessionState::Closed as u8 {
            self.pending.fail_all(CallFailure::Disconnected);
            self.closed_notify.notify_waiters();
            self.closed_notify.notify_one();
        }
    }

    /// Resolve once the session reaches Closed.
    pub async fn wait_closed(&self) {
        loop {
            if self.state() == SessionState::Closed {
                return;
            }
            self.closed_notify.notified().await;
        }
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("station_id", &self.station_id)
            .field("version", &self.version)
            .field("state", &self.state())
            .field("pending_calls", &self.pending_calls())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn test_session() -> (Arc<Session>, mpsc::Receiver<String>) {
        let (tx, rx) = mpsc::channel(OUTBOUND_QUEUE_CAPACITY);
        let session = Session::new("CP-001", OcppVersion::V16, tx, None);
        (session, rx)
    }

    #[tokio::test]
    async fn send_call_enqueues_frame_and_resolves() {
        let (session, mut rx) = test_session();

        let call = {
            let session = session.clone();
            tokio::spawn(async move {
                session
                    .send_call("Reset", json!({"type": "Soft"}), Duration::from_secs(5))
                    .await
            })
        };

        // Observe the outbound frame and answer it.
        let raw = rx.recv().await.unwrap();
        let frame = OcppFrame::parse(&raw).unwrap();
        let message_id = frame.message_id().to_string();
        assert!(frame.is_call());

        session.complete_call(&message_id, Ok(json!({"status": "Accepted"})));

        let payload = call.await.unwrap().unwrap();
        assert_eq!(payload["status"], "Accepted");
    }

    #[tokio::test]
    async fn send_call_times_out() {
        let (session, mut rx) = test_session();

        let result = session
            .send_call("Reset", json!({"type": "Soft"}), Duration::from_millis(20))
            .await;
        assert_eq!(result, Err(CallFailure::Timeout));

        // The frame did go out.
        assert!(rx.recv().await.is_some());
        // A late answer is discarded, not mis-routed.
        let raw_none = session.complete_call("unknown", Ok(json!({})));
        assert!(raw_none.is_none());
    }

    #[tokio::test]
    async fn draining_session_rejects_new_calls() {
        let (session, _rx) = test_session();
        session.request_drain();
        assert_eq!(session.state(), SessionState::Draining);

        let result = session
            .send_call("Reset", json!({}), Duration::from_secs(1))
            .await;
        assert_eq!(result, Err(CallFailure::Disconnected));
    }

    #[tokio::test]
    async fn close_fails_pending_calls() {
        let (session, mut rx) = test_session();

        let call = {
            let session = session.clone();
            tokio::spawn(async move {
                session
                    .send_call("Reset", json!({}), Duration::from_secs(5))
                    .await
            })
        };
        // Make sure the call is in flight before closing.
        let _ = rx.recv().await.unwrap();

        session.mark_closed();
        assert_eq!(call.await.unwrap(), Err(CallFailure::Disconnected));
    }

    #[tokio::test]
    async fn wait_closed_resolves_after_close() {
        let (session, _rx) = test_session();
        let waiter = {
            let session = session.clone();
            tokio::spawn(async move { session.wait_closed().await })
        };
        session.mark_closed();
        waiter.await.unwrap();
        assert_eq!(session.state(), SessionState::Closed);
    }

    #[tokio::test]
    async fn message_ids_are_unique_per_call() {
        let (session, mut rx) = test_session();

        for _ in 0..2 {
            let session = session.clone();
            tokio::spawn(async move {
                let _ = session
                    .send_call("ClearCache", json!({}), Duration::from_millis(50))
                    .await;
            });
        }

        let first = OcppFrame::parse(&rx.recv().await.unwrap()).unwrap();
        let second = OcppFrame::parse(&rx.recv().await.unwrap()).unwrap();
        assert_ne!(first.message_id(), second.message_id());
    }
}

//! Pending outbound calls
//!
//! Every outbound CALL gets an entry here until its CALLRESULT or
//! CALLERROR arrives, its deadline passes, or the connection dies. A
//! deadline that fires moves the messageId into a lapsed set for a
//! grace window, so a late CALLRESULT is recognized, logged, and
//! discarded instead of being treated as an unknown message.

use std::time::{Duration, Instant};

use dashmap::DashMap;
use serde_json::Value;
use tokio::sync::oneshot;
use tracing::{debug, warn};

/// How long an expired messageId is remembered.
const LAPSED_GRACE: Duration = Duration::from_secs(60);

/// Why an outbound call did not produce a CALLRESULT payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallFailure {
    /// The station answered with a CALLERROR.
    CallError { code: String, description: String },
    /// The deadline passed with no answer.
    Timeout,
    /// The connection closed before an answer arrived.
    Disconnected,
}

impl std::fmt::Display for CallFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::CallError { code, description } => {
                write!(f, "CallError {}: {}", code, description)
            }
            Self::Timeout => write!(f, "response timeout"),
            Self::Disconnected => write!(f, "connection lost"),
        }
    }
}

struct PendingEntry {
    action: String,
    sender: oneshot::Sender<Result<Value, CallFailure>>,
}

struct LapsedEntry {
    action: String,
    expired_at: Instant,
}

/// Table of outbound CALLs awaiting completion, keyed by messageId.
pub struct PendingCallTable {
    pending: DashMap<String, PendingEntry>,
    lapsed: DashMap<String, LapsedEntry>,
}

impl PendingCallTable {
    pub fn new() -> Self {
        Self {
            pending: DashMap::new(),
            lapsed: DashMap::new(),
        }
    }

    /// Register a fresh CALL. The returned receiver resolves with the
    /// CALLRESULT payload or a [`CallFailure`].
    pub fn insert(
        &self,
        message_id: impl Into<String>,
        action: impl Into<String>,
    ) -> oneshot::Receiver<Result<Value, CallFailure>> {
        self.prune_lapsed();
        let (tx, rx) = oneshot::channel();
        self.pending.insert(
            message_id.into(),
            PendingEntry {
                action: action.into(),
                sender: tx,
            },
        );
        rx
    }

    /// Complete a call with the station's answer. Returns the action
    /// name when a pending entry matched; `None` for unknown or lapsed
    /// ids (the latter are logged and dropped here).
    pub fn complete(
        &self,
        message_id: &str,
        outcome: Result<Value, CallFailure>,
    ) -> Option<String> {
        if let Some((_, entry)) = self.pending.remove(message_id) {
            let _ = entry.sender.send(outcome);
            return Some(entry.action);
        }

        if let Some((_, lapsed)) = self.lapsed.remove(message_id) {
            warn!(
                message_id,
                action = lapsed.action.as_str(),
                lapsed_for = ?lapsed.expired_at.elapsed(),
                "Late response for expired call, discarding"
            );
            return None;
        }

        warn!(message_id, "Response for unknown messageId, discarding");
        None
    }

    /// Expire a call whose deadline passed. The id is remembered for a
    /// grace window so a late answer is not mistaken for a stray frame.
    pub fn expire(&self, message_id: &str) {
        if let Some((id, entry)) = self.pending.remove(message_id) {
            debug!(message_id = id.as_str(), action = entry.action.as_str(), "Call expired");
            self.lapsed.insert(
                id,
                LapsedEntry {
                    action: entry.action.clone(),
                    expired_at: Instant::now(),
                },
            );
            let _ = entry.sender.send(Err(CallFailure::Timeout));
        }
    }

    /// Fail every pending call; used when the connection closes.
    pub fn fail_all(&self, failure: CallFailure) {
        let ids: Vec<String> = self.pending.iter().map(|e| e.key().clone()).collect();
        for id in ids {
            if let Some((_, entry)) = self.pending.remove(&id) {
                let _ = entry.sender.send(Err(failure.clone()));
            }
        }
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    fn prune_lapsed(&self) {
        self.lapsed
            .retain(|_, entry| entry.expired_at.elapsed() < LAPSED_GRACE);
    }
}

impl Default for PendingCallTable {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn complete_resolves_receiver() {
        let table = PendingCallTable::new();
        let rx = table.insert("m1", "Reset");

        let action = table.complete("m1", Ok(json!({"status": "Accepted"})));
        assert_eq!(action.as_deref(), Some("Reset"));

        let payload = rx.await.unwrap().unwrap();
        assert_eq!(payload["status"], "Accepted");
        assert!(table.is_empty());
    }

    #[tokio::test]
    async fn call_error_rejects_receiver() {
        let table = PendingCallTable::new();
        let rx = table.insert("m1", "Reset");

        table.complete(
            "m1",
            Err(CallFailure::CallError {
                code: "NotSupported".into(),
                description: "nope".into(),
            }),
        );

        match rx.await.unwrap() {
            Err(CallFailure::CallError { code, .. }) => assert_eq!(code, "NotSupported"),
            other => panic!("unexpected outcome: {:?}", other),
        }
    }

    #[tokio::test]
    async fn expire_rejects_with_timeout_and_remembers_id() {
        let table = PendingCallTable::new();
        let rx = table.insert("m1", "Reset");

        table.expire("m1");
        assert_eq!(rx.await.unwrap(), Err(CallFailure::Timeout));

        // A late answer matches the lapsed set and is discarded.
        assert_eq!(table.complete("m1", Ok(json!({"status": "Accepted"}))), None);
        // A second answer no longer matches anything.
        assert_eq!(table.complete("m1", Ok(json!({}))), None);
    }

    #[tokio::test]
    async fn unknown_id_is_discarded() {
        let table = PendingCallTable::new();
        assert_eq!(table.complete("nope", Ok(json!({}))), None);
    }

    #[tokio::test]
    async fn fail_all_rejects_every_pending_call() {
        let table = PendingCallTable::new();
        let rx1 = table.insert("m1", "Reset");
        let rx2 = table.insert("m2", "ClearCache");

        table.fail_all(CallFailure::Disconnected);

        assert_eq!(rx1.await.unwrap(), Err(CallFailure::Disconnected));
        assert_eq!(rx2.await.unwrap(), Err(CallFailure::Disconnected));
        assert!(table.is_empty());
    }
}

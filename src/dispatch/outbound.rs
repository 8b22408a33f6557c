//! Outbound command transport
//!
//! `CommandSender` is the control plane's door into the WebSocket
//! layer: resolve the session, check the action against the message
//! registry (direction + payload schema), delegate to the session's
//! outbound path, and await the correlated answer.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use thiserror::Error;
use tracing::{info, warn};

use crate::ocpp::MessageRegistry;
use crate::session::{CallFailure, ConnectionRegistry};

/// Why an outbound command failed.
#[derive(Debug, Clone, Error)]
pub enum CommandError {
    #[error("station not connected: {0}")]
    StationNotConnected(String),

    #[error("action not supported: {0}")]
    NotSupported(String),

    #[error("invalid payload: {0}")]
    ValidationError(String),

    #[error("failed to send: {0}")]
    SendFailed(String),

    #[error("response timeout")]
    Timeout,

    #[error("connection lost")]
    Disconnected,

    #[error("CallError {code}: {description}")]
    CallError { code: String, description: String },

    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

impl From<CallFailure> for CommandError {
    fn from(failure: CallFailure) -> Self {
        match failure {
            CallFailure::CallError { code, description } => {
                Self::CallError { code, description }
            }
            CallFailure::Timeout => Self::Timeout,
            CallFailure::Disconnected => Self::Disconnected,
        }
    }
}

/// Sends CSMS -> CP calls over registered sessions.
pub struct CommandSender {
    registry: Arc<ConnectionRegistry>,
    default_timeout: Duration,
}

impl CommandSender {
    pub fn new(registry: Arc<ConnectionRegistry>, default_timeout: Duration) -> Self {
        Self {
            registry,
            default_timeout,
        }
    }

    /// Send a command with the default deadline.
    pub async fn send_command(
        &self,
        station_id: &str,
        action: &str,
        payload: Value,
    ) -> Result<Value, CommandError> {
        self.send_command_with_deadline(station_id, action, payload, self.default_timeout)
            .await
    }

    /// Send a command and await its CALLRESULT payload.
    pub async fn send_command_with_deadline(
        &self,
        station_id: &str,
        action: &str,
        payload: Value,
        deadline: Duration,
    ) -> Result<Value, CommandError> {
        let session = self
            .registry
            .get(station_id)
            .ok_or_else(|| CommandError::StationNotConnected(station_id.to_string()))?;

        let message_registry = MessageRegistry::for_version(session.version());
        let def = message_registry
            .lookup(action)
            .filter(|def| def.direction.accepts_outbound())
            .ok_or_else(|| {
                CommandError::NotSupported(format!(
                    "'{}' is not a CSMS-to-station action for {}",
                    action,
                    session.version()
                ))
            })?;

        if let Err(e) = (def.validate_request)(&payload) {
            return Err(CommandError::ValidationError(format!(
                "{} request: {}",
                action, e
            )));
        }

        info!(station_id, action, "Sending command");
        metrics::counter!("csms_commands_total", "action" => action.to_string()).increment(1);
        let started = std::time::Instant::now();

        let result = session.send_call(action, payload, deadline).await;

        metrics::histogram!("csms_command_latency_seconds", "action" => action.to_string())
            .record(started.elapsed().as_secs_f64());

        match result {
            Ok(payload) => {
                if let Err(e) = (def.validate_response)(&payload) {
                    warn!(station_id, action, error = e.as_str(), "Malformed CALLRESULT payload");
                    return Err(CommandError::InvalidResponse(format!(
                        "{} response: {}",
                        action, e
                    )));
                }
                Ok(payload)
            }
            Err(failure) => {
                warn!(station_id, action, error = %failure, "Command failed");
                Err(failure.into())
            }
        }
    }

    /// Fan a command out to every connected station whose registry
    /// accepts it; results are keyed by station id.
    pub async fn broadcast(
        &self,
        action: &str,
        payload: Value,
        deadline: Duration,
    ) -> HashMap<String, Result<Value, CommandError>> {
        let sessions = self.registry.list();
        let mut tasks = Vec::with_capacity(sessions.len());

        let mut results = HashMap::new();

        for session in sessions {
            let station_id = session.station_id().to_string();
            let def = MessageRegistry::for_version(session.version())
                .lookup(action)
                .filter(|def| def.direction.accepts_outbound());
            let Some(def) = def else {
                // This station's protocol has no such outbound action.
                continue;
            };
            if let Err(e) = (def.validate_request)(&payload) {
                results.insert(
                    station_id,
                    Err(CommandError::ValidationError(format!("{} request: {}", action, e))),
                );
                continue;
            }
            let payload = payload.clone();
            let action = action.to_string();
            tasks.push(tokio::spawn(async move {
                let outcome = session
                    .send_call(&action, payload, deadline)
                    .await
                    .map_err(CommandError::from);
                (station_id, outcome)
            }));
        }

        for task in tasks {
            if let Ok((station_id, outcome)) = task.await {
                results.insert(station_id, outcome);
            }
        }
        results
    }

    pub fn default_timeout(&self) -> Duration {
        self.default_timeout
    }

    pub fn registry(&self) -> &Arc<ConnectionRegistry> {
        &self.registry
    }
}

/// Shared, reference-counted command sender.
pub type SharedCommandSender = Arc<CommandSender>;

pub fn create_command_sender(
    registry: Arc<ConnectionRegistry>,
    default_timeout: Duration,
) -> SharedCommandSender {
    Arc::new(CommandSender::new(registry, default_timeout))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::OcppVersion;
    use crate::ocpp::OcppFrame;
    use crate::session::Session;
    use serde_json::json;
    use tokio::sync::mpsc;

    async fn sender_with_session() -> (CommandSender, mpsc::Receiver<String>, Arc<Session>) {
        let registry = ConnectionRegistry::shared();
        let (tx, rx) = mpsc::channel(64);
        let session = Session::new("CP-001", OcppVersion::V16, tx, None);
        registry.register(session.clone()).await;
        (
            CommandSender::new(registry, Duration::from_secs(5)),
            rx,
            session,
        )
    }

    #[tokio::test]
    async fn absent_station_is_not_connected() {
        let registry = ConnectionRegistry::shared();
        let sender = CommandSender::new(registry, Duration::from_secs(1));
        let err = sender
            .send_command("CP-404", "Reset", json!({"type": "Soft"}))
            .await
            .unwrap_err();
        assert!(matches!(err, CommandError::StationNotConnected(_)));
    }

    #[tokio::test]
    async fn inbound_only_action_is_rejected() {
        let (sender, _rx, _session) = sender_with_session().await;
        let err = sender
            .send_command("CP-001", "BootNotification", json!({}))
            .await
            .unwrap_err();
        assert!(matches!(err, CommandError::NotSupported(_)));
    }

    #[tokio::test]
    async fn invalid_payload_is_rejected_before_send() {
        let (sender, mut rx, _session) = sender_with_session().await;
        let err = sender
            .send_command("CP-001", "RemoteStopTransaction", json!({"transactionId": "one"}))
            .await
            .unwrap_err();
        assert!(matches!(err, CommandError::ValidationError(_)));
        // Nothing hit the wire.
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn command_resolves_with_call_result() {
        let (sender, mut rx, session) = sender_with_session().await;

        let answerer = tokio::spawn(async move {
            let raw = rx.recv().await.unwrap();
            let frame = OcppFrame::parse(&raw).unwrap();
            session.complete_call(frame.message_id(), Ok(json!({"status": "Accepted"})));
        });

        let payload = sender
            .send_command("CP-001", "RemoteStopTransaction", json!({"transactionId": 7}))
            .await
            .unwrap();
        assert_eq!(payload["status"], "Accepted");
        answerer.await.unwrap();
    }

    #[tokio::test]
    async fn silent_station_times_out() {
        let (sender, _rx, _session) = sender_with_session().await;
        let err = sender
            .send_command_with_deadline(
                "CP-001",
                "Reset",
                json!({"type": "Soft"}),
                Duration::from_millis(30),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, CommandError::Timeout));
    }
}

//! Inbound CALL dispatcher
//!
//! Stateless routing from (protocol version, action) to the handler.
//! The message registry is consulted first, so unknown actions, wrong
//! directions, and malformed payloads are refused before any handler
//! runs. Handlers return a response payload or a [`CallFault`]; they
//! never leak errors past this boundary.

use serde_json::Value;
use tracing::debug;

use crate::domain::OcppVersion;
use crate::events::EventBus;
use crate::handlers;
use crate::ocpp::{CallFault, MessageRegistry};
use crate::services::Services;

pub struct InboundDispatcher {
    services: Services,
    events: EventBus,
}

impl InboundDispatcher {
    pub fn new(services: Services, events: EventBus) -> Self {
        Self { services, events }
    }

    /// Route one CALL. Exactly one of CALLRESULT payload or
    /// [`CallFault`] comes back; the session turns either into a frame.
    pub async fn dispatch(
        &self,
        station_id: &str,
        version: OcppVersion,
        action: &str,
        payload: &Value,
    ) -> Result<Value, CallFault> {
        let registry = MessageRegistry::for_version(version);

        let def = match registry.lookup(action) {
            Some(def) => def,
            None => return Err(CallFault::not_implemented(action)),
        };
        if !def.direction.accepts_inbound() {
            return Err(CallFault::not_supported(action));
        }
        if let Err(e) = (def.validate_request)(payload) {
            return Err(CallFault::formation(format!(
                "Invalid {} payload: {}",
                action, e
            )));
        }

        debug!(station_id, %version, action, "Dispatching inbound call");
        metrics::counter!("csms_inbound_calls_total", "action" => action.to_string())
            .increment(1);

        match version {
            OcppVersion::V16 => {
                let handler =
                    handlers::v16::V16Handler::new(station_id, &self.services, &self.events);
                handler.dispatch(action, payload).await
            }
            OcppVersion::V201 => {
                let handler =
                    handlers::v201::V201Handler::new(station_id, &self.services, &self.events);
                handler.dispatch(action, payload).await
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::memory::InMemoryRepositoryProvider;
    use crate::ocpp::OcppErrorCode;
    use serde_json::json;
    use std::sync::Arc;

    fn dispatcher() -> InboundDispatcher {
        let events = EventBus::new();
        let services = Services::new(
            Arc::new(InMemoryRepositoryProvider::new()),
            events.clone(),
            300,
        );
        InboundDispatcher::new(services, events)
    }

    #[tokio::test]
    async fn unknown_action_is_not_implemented() {
        let d = dispatcher();
        let err = d
            .dispatch("CP-001", OcppVersion::V16, "MadeUp", &json!({}))
            .await
            .unwrap_err();
        assert_eq!(err.code, OcppErrorCode::NotImplemented);
    }

    #[tokio::test]
    async fn outbound_only_action_is_not_supported_inbound() {
        let d = dispatcher();
        let err = d
            .dispatch(
                "CP-001",
                OcppVersion::V16,
                "RemoteStartTransaction",
                &json!({"idTag": "TAG-1"}),
            )
            .await
            .unwrap_err();
        assert_eq!(err.code, OcppErrorCode::NotSupported);
    }

    #[tokio::test]
    async fn invalid_payload_is_formation_violation() {
        let d = dispatcher();
        let err = d
            .dispatch(
                "CP-001",
                OcppVersion::V16,
                "BootNotification",
                &json!({"chargePointVendor": 42}),
            )
            .await
            .unwrap_err();
        assert_eq!(err.code, OcppErrorCode::FormationViolation);
    }

    #[tokio::test]
    async fn heartbeat_round_trips() {
        let d = dispatcher();
        let response = d
            .dispatch("CP-001", OcppVersion::V16, "Heartbeat", &json!({}))
            .await
            .unwrap();
        assert!(response["currentTime"].is_string());
    }

    #[tokio::test]
    async fn v201_action_name_not_visible_in_v16() {
        let d = dispatcher();
        let err = d
            .dispatch("CP-001", OcppVersion::V16, "TransactionEvent", &json!({}))
            .await
            .unwrap_err();
        assert_eq!(err.code, OcppErrorCode::NotImplemented);
    }

    // ── Station lifecycle scenarios ────────────────────────────

    fn dispatcher_with_repos() -> (InboundDispatcher, Arc<InMemoryRepositoryProvider>) {
        let repos = Arc::new(InMemoryRepositoryProvider::new());
        let events = EventBus::new();
        let services = Services::new(repos.clone(), events.clone(), 300);
        (InboundDispatcher::new(services, events), repos)
    }

    async fn seed_user(repos: &Arc<InMemoryRepositoryProvider>, token: &str) {
        use crate::domain::{User, UserRepository};
        UserRepository::insert(repos.as_ref(), User::new("driver", token))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn fresh_boot_creates_online_station() {
        let (d, repos) = dispatcher_with_repos();

        let response = d
            .dispatch(
                "CP-001",
                OcppVersion::V16,
                "BootNotification",
                &json!({"chargePointVendor": "V", "chargePointModel": "M"}),
            )
            .await
            .unwrap();

        assert_eq!(response["status"], "Accepted");
        assert_eq!(response["interval"], 300);
        assert!(response["currentTime"].is_string());

        use crate::domain::{RepositoryProvider, StationStatus};
        let station = repos.stations().find_by_id("CP-001").await.unwrap().unwrap();
        assert_eq!(station.status, StationStatus::Online);
        assert!(station.last_boot_at.is_some());
    }

    #[tokio::test]
    async fn start_meter_stop_lifecycle() {
        use crate::domain::{ConnectorStatus, RepositoryProvider, TransactionStatus};

        let (d, repos) = dispatcher_with_repos();
        seed_user(&repos, "TAG-1").await;

        d.dispatch(
            "CP-001",
            OcppVersion::V16,
            "BootNotification",
            &json!({"chargePointVendor": "V", "chargePointModel": "M"}),
        )
        .await
        .unwrap();

        // Start: transaction id >= 1, connector goes Charging.
        let start = d
            .dispatch(
                "CP-001",
                OcppVersion::V16,
                "StartTransaction",
                &json!({
                    "connectorId": 1,
                    "idTag": "TAG-1",
                    "meterStart": 1000,
                    "timestamp": "2026-01-01T10:00:00Z"
                }),
            )
            .await
            .unwrap();
        let tx_id = start["transactionId"].as_i64().unwrap();
        assert!(tx_id >= 1);
        assert_eq!(start["idTagInfo"]["status"], "Accepted");

        let connector = repos
            .stations()
            .find_connector("CP-001", 1)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(connector.status, ConnectorStatus::Charging);
        assert!(connector.current_transaction.is_some());

        // Meter sample lands on the transaction.
        d.dispatch(
            "CP-001",
            OcppVersion::V16,
            "MeterValues",
            &json!({
                "connectorId": 1,
                "transactionId": tx_id,
                "meterValue": [{
                    "timestamp": "2026-01-01T10:10:00Z",
                    "sampledValue": [{"value": "1500"}]
                }]
            }),
        )
        .await
        .unwrap();

        // Stop: energy derived, connector Finishing until freed.
        let stop = d
            .dispatch(
                "CP-001",
                OcppVersion::V16,
                "StopTransaction",
                &json!({
                    "transactionId": tx_id,
                    "meterStop": 2000,
                    "timestamp": "2026-01-01T10:20:00Z"
                }),
            )
            .await
            .unwrap();
        assert_eq!(stop["idTagInfo"]["status"], "Accepted");

        let tx = repos
            .transactions()
            .find_by_wire_id_v16("CP-001", tx_id as i32)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(tx.status, TransactionStatus::Completed);
        assert_eq!(tx.energy_delivered(), Some(1000));

        let samples = repos.transactions().samples_for(&tx.key).await.unwrap();
        assert_eq!(samples.len(), 1);
        assert_eq!(samples[0].energy_wh, Some(1500.0));

        let connector = repos
            .stations()
            .find_connector("CP-001", 1)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(connector.status, ConnectorStatus::Finishing);

        // StatusNotification(Available) frees the connector.
        d.dispatch(
            "CP-001",
            OcppVersion::V16,
            "StatusNotification",
            &json!({
                "connectorId": 1,
                "status": "Available",
                "errorCode": "NoError"
            }),
        )
        .await
        .unwrap();

        let connector = repos
            .stations()
            .find_connector("CP-001", 1)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(connector.status, ConnectorStatus::Available);
        assert!(connector.current_transaction.is_none());
    }

    #[tokio::test]
    async fn duplicate_stop_replays_as_noop() {
        use crate::domain::{RepositoryProvider, TransactionStatus};

        let (d, repos) = dispatcher_with_repos();
        seed_user(&repos, "TAG-1").await;

        let start = d
            .dispatch(
                "CP-001",
                OcppVersion::V16,
                "StartTransaction",
                &json!({
                    "connectorId": 1,
                    "idTag": "TAG-1",
                    "meterStart": 0,
                    "timestamp": "2026-01-01T10:00:00Z"
                }),
            )
            .await
            .unwrap();
        let tx_id = start["transactionId"].as_i64().unwrap() as i32;

        for _ in 0..2 {
            let stop = d
                .dispatch(
                    "CP-001",
                    OcppVersion::V16,
                    "StopTransaction",
                    &json!({
                        "transactionId": tx_id,
                        "meterStop": 700,
                        "timestamp": "2026-01-01T10:20:00Z"
                    }),
                )
                .await
                .unwrap();
            assert_eq!(stop["idTagInfo"]["status"], "Accepted");
        }

        let tx = repos
            .transactions()
            .find_by_wire_id_v16("CP-001", tx_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(tx.status, TransactionStatus::Completed);
        assert_eq!(tx.meter_stop, Some(700));
    }

    #[tokio::test]
    async fn unknown_id_tag_start_is_refused_without_transaction() {
        use crate::domain::RepositoryProvider;

        let (d, repos) = dispatcher_with_repos();

        let start = d
            .dispatch(
                "CP-001",
                OcppVersion::V16,
                "StartTransaction",
                &json!({
                    "connectorId": 1,
                    "idTag": "UNKNOWN",
                    "meterStart": 0,
                    "timestamp": "2026-01-01T10:00:00Z"
                }),
            )
            .await
            .unwrap();

        assert_eq!(start["idTagInfo"]["status"], "Invalid");
        assert_eq!(start["transactionId"], 0);
        assert!(repos
            .transactions()
            .find_active_for_connector("CP-001", 1)
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn v201_transaction_event_lifecycle() {
        use crate::domain::{RepositoryProvider, TransactionStatus};

        let (d, repos) = dispatcher_with_repos();
        seed_user(&repos, "TAG-9").await;

        d.dispatch(
            "CP-201",
            OcppVersion::V201,
            "BootNotification",
            &json!({
                "chargingStation": {"model": "M", "vendorName": "V"},
                "reason": "PowerUp"
            }),
        )
        .await
        .unwrap();

        let started = d
            .dispatch(
                "CP-201",
                OcppVersion::V201,
                "TransactionEvent",
                &json!({
                    "eventType": "Started",
                    "timestamp": "2026-01-01T10:00:00Z",
                    "triggerReason": "Authorized",
                    "seqNo": 0,
                    "transactionInfo": {"transactionId": "tx-abc"},
                    "idToken": {"idToken": "TAG-9", "type": "ISO14443"},
                    "evse": {"id": 1}
                }),
            )
            .await
            .unwrap();
        assert_eq!(started["idTokenInfo"]["status"], "Accepted");

        let tx = repos
            .transactions()
            .find_by_wire_id_v201("CP-201", "tx-abc")
            .await
            .unwrap()
            .unwrap();
        assert!(tx.is_active());

        d.dispatch(
            "CP-201",
            OcppVersion::V201,
            "TransactionEvent",
            &json!({
                "eventType": "Ended",
                "timestamp": "2026-01-01T11:00:00Z",
                "triggerReason": "StopAuthorized",
                "seqNo": 2,
                "transactionInfo": {"transactionId": "tx-abc", "stoppedReason": "Local"},
                "evse": {"id": 1}
            }),
        )
        .await
        .unwrap();

        let tx = repos
            .transactions()
            .find_by_wire_id_v201("CP-201", "tx-abc")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(tx.status, TransactionStatus::Completed);
    }
}

//! Message registry
//!
//! Static tables mapping, per protocol version, an action name to its
//! direction and payload validators. The typed `rust-ocpp` structs act
//! as the schemas: a payload is valid iff it deserializes into the
//! registered message type.
//!
//! The registry is the single place that knows which actions exist; the
//! inbound dispatcher and the outbound command sender both consult it,
//! so there is no dispatch-by-reflection anywhere.

use std::collections::HashMap;
use std::sync::OnceLock;

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::domain::OcppVersion;

/// Who may initiate a CALL with this action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Station-initiated (CP -> CSMS)
    CpToCsms,
    /// Operator-initiated (CSMS -> CP)
    CsmsToCp,
    /// Either side may initiate (DataTransfer)
    Both,
}

impl Direction {
    /// May a station send this action to us?
    pub fn accepts_inbound(&self) -> bool {
        matches!(self, Self::CpToCsms | Self::Both)
    }

    /// May we send this action to a station?
    pub fn accepts_outbound(&self) -> bool {
        matches!(self, Self::CsmsToCp | Self::Both)
    }
}

type Validator = fn(&Value) -> Result<(), String>;

/// One registered action.
pub struct MessageDef {
    pub action: &'static str,
    pub direction: Direction,
    /// Validates the CALL payload.
    pub validate_request: Validator,
    /// Validates the CALLRESULT payload.
    pub validate_response: Validator,
}

/// Per-version action table.
pub struct MessageRegistry {
    version: OcppVersion,
    actions: HashMap<&'static str, MessageDef>,
}

impl MessageRegistry {
    /// The registry for a protocol version. Tables are built once and
    /// shared for the process lifetime.
    pub fn for_version(version: OcppVersion) -> &'static MessageRegistry {
        static V16: OnceLock<MessageRegistry> = OnceLock::new();
        static V201: OnceLock<MessageRegistry> = OnceLock::new();
        match version {
            OcppVersion::V16 => V16.get_or_init(build_v16),
            OcppVersion::V201 => V201.get_or_init(build_v201),
        }
    }

    pub fn version(&self) -> OcppVersion {
        self.version
    }

    pub fn lookup(&self, action: &str) -> Option<&MessageDef> {
        self.actions.get(action)
    }

    pub fn actions(&self) -> impl Iterator<Item = &MessageDef> {
        self.actions.values()
    }

    fn insert(&mut self, def: MessageDef) {
        self.actions.insert(def.action, def);
    }
}

/// Attempt a typed deserialization; the error message carries the serde
/// path so the CALLERROR description is actionable.
fn validate_as<T: DeserializeOwned>(value: &Value) -> Result<(), String> {
    serde_json::from_value::<T>(value.clone())
        .map(|_| ())
        .map_err(|e| e.to_string())
}

macro_rules! def {
    ($action:literal, $direction:expr, $req:ty, $resp:ty) => {
        MessageDef {
            action: $action,
            direction: $direction,
            validate_request: validate_as::<$req>,
            validate_response: validate_as::<$resp>,
        }
    };
}

fn build_v16() -> MessageRegistry {
    use rust_ocpp::v1_6::messages::authorize::{AuthorizeRequest, AuthorizeResponse};
    use rust_ocpp::v1_6::messages::boot_notification::{
        BootNotificationRequest, BootNotificationResponse,
    };
    use rust_ocpp::v1_6::messages::change_availability::{
        ChangeAvailabilityRequest, ChangeAvailabilityResponse,
    };
    use rust_ocpp::v1_6::messages::change_configuration::{
        ChangeConfigurationRequest, ChangeConfigurationResponse,
    };
    use rust_ocpp::v1_6::messages::clear_cache::{ClearCacheRequest, ClearCacheResponse};
    use rust_ocpp::v1_6::messages::data_transfer::{DataTransferRequest, DataTransferResponse};
    use rust_ocpp::v1_6::messages::get_configuration::{
        GetConfigurationRequest, GetConfigurationResponse,
    };
    use rust_ocpp::v1_6::messages::heart_beat::{HeartbeatRequest, HeartbeatResponse};
    use rust_ocpp::v1_6::messages::meter_values::{MeterValuesRequest, MeterValuesResponse};
    use rust_ocpp::v1_6::messages::remote_start_transaction::{
        RemoteStartTransactionRequest, RemoteStartTransactionResponse,
    };
    use rust_ocpp::v1_6::messages::remote_stop_transaction::{
        RemoteStopTransactionRequest, RemoteStopTransactionResponse,
    };
    use rust_ocpp::v1_6::messages::reset::{ResetRequest, ResetResponse};
    use rust_ocpp::v1_6::messages::set_charging_profile::{
        SetChargingProfileRequest, SetChargingProfileResponse,
    };
    use rust_ocpp::v1_6::messages::start_transaction::{
        StartTransactionRequest, StartTransactionResponse,
    };
    use rust_ocpp::v1_6::messages::status_notification::{
        StatusNotificationRequest, StatusNotificationResponse,
    };
    use rust_ocpp::v1_6::messages::stop_transaction::{
        StopTransactionRequest, StopTransactionResponse,
    };
    use rust_ocpp::v1_6::messages::trigger_message::{
        TriggerMessageRequest, TriggerMessageResponse,
    };
    use rust_ocpp::v1_6::messages::unlock_connector::{
        UnlockConnectorRequest, UnlockConnectorResponse,
    };

    let mut registry = MessageRegistry {
        version: OcppVersion::V16,
        actions: HashMap::new(),
    };

    // Station-initiated
    registry.insert(def!(
        "BootNotification",
        Direction::CpToCsms,
        BootNotificationRequest,
        BootNotificationResponse
    ));
    registry.insert(def!(
        "Heartbeat",
        Direction::CpToCsms,
        HeartbeatRequest,
        HeartbeatResponse
    ));
    registry.insert(def!(
        "StatusNotification",
        Direction::CpToCsms,
        StatusNotificationRequest,
        StatusNotificationResponse
    ));
    registry.insert(def!(
        "Authorize",
        Direction::CpToCsms,
        AuthorizeRequest,
        AuthorizeResponse
    ));
    registry.insert(def!(
        "StartTransaction",
        Direction::CpToCsms,
        StartTransactionRequest,
        StartTransactionResponse
    ));
    registry.insert(def!(
        "StopTransaction",
        Direction::CpToCsms,
        StopTransactionRequest,
        StopTransactionResponse
    ));
    registry.insert(def!(
        "MeterValues",
        Direction::CpToCsms,
        MeterValuesRequest,
        MeterValuesResponse
    ));
    registry.insert(def!(
        "DataTransfer",
        Direction::Both,
        DataTransferRequest,
        DataTransferResponse
    ));

    // Operator-initiated
    registry.insert(def!(
        "RemoteStartTransaction",
        Direction::CsmsToCp,
        RemoteStartTransactionRequest,
        RemoteStartTransactionResponse
    ));
    registry.insert(def!(
        "RemoteStopTransaction",
        Direction::CsmsToCp,
        RemoteStopTransactionRequest,
        RemoteStopTransactionResponse
    ));
    registry.insert(def!("Reset", Direction::CsmsToCp, ResetRequest, ResetResponse));
    registry.insert(def!(
        "ChangeAvailability",
        Direction::CsmsToCp,
        ChangeAvailabilityRequest,
        ChangeAvailabilityResponse
    ));
    registry.insert(def!(
        "UnlockConnector",
        Direction::CsmsToCp,
        UnlockConnectorRequest,
        UnlockConnectorResponse
    ));
    registry.insert(def!(
        "ClearCache",
        Direction::CsmsToCp,
        ClearCacheRequest,
        ClearCacheResponse
    ));
    registry.insert(def!(
        "TriggerMessage",
        Direction::CsmsToCp,
        TriggerMessageRequest,
        TriggerMessageResponse
    ));
    registry.insert(def!(
        "GetConfiguration",
        Direction::CsmsToCp,
        GetConfigurationRequest,
        GetConfigurationResponse
    ));
    registry.insert(def!(
        "ChangeConfiguration",
        Direction::CsmsToCp,
        ChangeConfigurationRequest,
        ChangeConfigurationResponse
    ));
    registry.insert(def!(
        "SetChargingProfile",
        Direction::CsmsToCp,
        SetChargingProfileRequest,
        SetChargingProfileResponse
    ));

    registry
}

fn build_v201() -> MessageRegistry {
    use rust_ocpp::v2_0_1::messages::authorize::{AuthorizeRequest, AuthorizeResponse};
    use rust_ocpp::v2_0_1::messages::boot_notification::{
        BootNotificationRequest, BootNotificationResponse,
    };
    use rust_ocpp::v2_0_1::messages::change_availability::{
        ChangeAvailabilityRequest, ChangeAvailabilityResponse,
    };
    use rust_ocpp::v2_0_1::messages::clear_cache::{ClearCacheRequest, ClearCacheResponse};
    use rust_ocpp::v2_0_1::messages::datatransfer::{DataTransferRequest, DataTransferResponse};
    use rust_ocpp::v2_0_1::messages::get_variables::{GetVariablesRequest, GetVariablesResponse};
    use rust_ocpp::v2_0_1::messages::heartbeat::{HeartbeatRequest, HeartbeatResponse};
    use rust_ocpp::v2_0_1::messages::meter_values::{MeterValuesRequest, MeterValuesResponse};
    use rust_ocpp::v2_0_1::messages::request_start_transaction::{
        RequestStartTransactionRequest, RequestStartTransactionResponse,
    };
    use rust_ocpp::v2_0_1::messages::request_stop_transaction::{
        RequestStopTransactionRequest, RequestStopTransactionResponse,
    };
    use rust_ocpp::v2_0_1::messages::reset::{ResetRequest, ResetResponse};
    use rust_ocpp::v2_0_1::messages::set_charging_profile::{
        SetChargingProfileRequest, SetChargingProfileResponse,
    };
    use rust_ocpp::v2_0_1::messages::set_variables::{SetVariablesRequest, SetVariablesResponse};
    use rust_ocpp::v2_0_1::messages::status_notification::{
        StatusNotificationRequest, StatusNotificationResponse,
    };
    use rust_ocpp::v2_0_1::messages::transaction_event::{
        TransactionEventRequest, TransactionEventResponse,
    };
    use rust_ocpp::v2_0_1::messages::trigger_message::{
        TriggerMessageRequest, TriggerMessageResponse,
    };
    use rust_ocpp::v2_0_1::messages::unlock_connector::{
        UnlockConnectorRequest, UnlockConnectorResponse,
    };

    let mut registry = MessageRegistry {
        version: OcppVersion::V201,
        actions: HashMap::new(),
    };

    // Station-initiated
    registry.insert(def!(
        "BootNotification",
        Direction::CpToCsms,
        BootNotificationRequest,
        BootNotificationResponse
    ));
    registry.insert(def!(
        "Heartbeat",
        Direction::CpToCsms,
        HeartbeatRequest,
        HeartbeatResponse
    ));
    registry.insert(def!(
        "StatusNotification",
        Direction::CpToCsms,
        StatusNotificationRequest,
        StatusNotificationResponse
    ));
    registry.insert(def!(
        "Authorize",
        Direction::CpToCsms,
        AuthorizeRequest,
        AuthorizeResponse
    ));
    registry.insert(def!(
        "TransactionEvent",
        Direction::CpToCsms,
        TransactionEventRequest,
        TransactionEventResponse
    ));
    registry.insert(def!(
        "MeterValues",
        Direction::CpToCsms,
        MeterValuesRequest,
        MeterValuesResponse
    ));
    registry.insert(def!(
        "DataTransfer",
        Direction::Both,
        DataTransferRequest,
        DataTransferResponse
    ));

    // Operator-initiated
    registry.insert(def!(
        "RequestStartTransaction",
        Direction::CsmsToCp,
        RequestStartTransactionRequest,
        RequestStartTransactionResponse
    ));
    registry.insert(def!(
        "RequestStopTransaction",
        Direction::CsmsToCp,
        RequestStopTransactionRequest,
        RequestStopTransactionResponse
    ));
    registry.insert(def!("Reset", Direction::CsmsToCp, ResetRequest, ResetResponse));
    registry.insert(def!(
        "ChangeAvailability",
        Direction::CsmsToCp,
        ChangeAvailabilityRequest,
        ChangeAvailabilityResponse
    ));
    registry.insert(def!(
        "UnlockConnector",
        Direction::CsmsToCp,
        UnlockConnectorRequest,
        UnlockConnectorResponse
    ));
    registry.insert(def!(
        "ClearCache",
        Direction::CsmsToCp,
        ClearCacheRequest,
        ClearCacheResponse
    ));
    registry.insert(def!(
        "TriggerMessage",
        Direction::CsmsToCp,
        TriggerMessageRequest,
        TriggerMessageResponse
    ));
    registry.insert(def!(
        "GetVariables",
        Direction::CsmsToCp,
        GetVariablesRequest,
        GetVariablesResponse
    ));
    registry.insert(def!(
        "SetVariables",
        Direction::CsmsToCp,
        SetVariablesRequest,
        SetVariablesResponse
    ));
    registry.insert(def!(
        "SetChargingProfile",
        Direction::CsmsToCp,
        SetChargingProfileRequest,
        SetChargingProfileResponse
    ));

    registry
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn v16_knows_boot_notification() {
        let registry = MessageRegistry::for_version(OcppVersion::V16);
        let def = registry.lookup("BootNotification").unwrap();
        assert!(def.direction.accepts_inbound());
        assert!(!def.direction.accepts_outbound());
    }

    #[test]
    fn unknown_action_is_absent() {
        let registry = MessageRegistry::for_version(OcppVersion::V16);
        assert!(registry.lookup("MadeUpAction").is_none());
        // 2.0.1 action names do not leak into the 1.6 table
        assert!(registry.lookup("TransactionEvent").is_none());
    }

    #[test]
    fn v16_boot_payload_validates() {
        let registry = MessageRegistry::for_version(OcppVersion::V16);
        let def = registry.lookup("BootNotification").unwrap();
        let ok = json!({"chargePointVendor": "V", "chargePointModel": "M"});
        assert!((def.validate_request)(&ok).is_ok());
        let missing = json!({"chargePointVendor": "V"});
        assert!((def.validate_request)(&missing).is_err());
    }

    #[test]
    fn v16_start_transaction_payload_validates() {
        let registry = MessageRegistry::for_version(OcppVersion::V16);
        let def = registry.lookup("StartTransaction").unwrap();
        let ok = json!({
            "connectorId": 1,
            "idTag": "TAG-1",
            "meterStart": 1000,
            "timestamp": "2024-01-01T00:00:00Z"
        });
        assert!((def.validate_request)(&ok).is_ok());
        let bad = json!({"connectorId": "one", "idTag": "TAG-1"});
        assert!((def.validate_request)(&bad).is_err());
    }

    #[test]
    fn data_transfer_is_bidirectional() {
        for version in OcppVersion::ALL {
            let def = MessageRegistry::for_version(*version)
                .lookup("DataTransfer")
                .unwrap();
            assert!(def.direction.accepts_inbound());
            assert!(def.direction.accepts_outbound());
        }
    }

    #[test]
    fn remote_start_is_outbound_only() {
        let registry = MessageRegistry::for_version(OcppVersion::V16);
        let def = registry.lookup("RemoteStartTransaction").unwrap();
        assert!(!def.direction.accepts_inbound());
        assert!(def.direction.accepts_outbound());
    }

    #[test]
    fn v201_transaction_event_registered() {
        let registry = MessageRegistry::for_version(OcppVersion::V201);
        let def = registry.lookup("TransactionEvent").unwrap();
        assert!(def.direction.accepts_inbound());
        // RequestStartTransaction replaces RemoteStartTransaction in 2.0.1
        assert!(registry.lookup("RemoteStartTransaction").is_none());
        assert!(registry.lookup("RequestStartTransaction").is_some());
    }
}

//! OCPP-J message framing
//!
//! Implements the OCPP-J (JSON over WebSocket) transport framing, which
//! is identical across protocol versions:
//!
//! - **Call**       `[2, "<messageId>", "<action>", {<payload>}]`
//! - **CallResult** `[3, "<messageId>", {<payload>}]`
//! - **CallError**  `[4, "<messageId>", "<errorCode>", "<errorDescription>", {<errorDetails>}]`
//!
//! Parsing is strict: a frame with the wrong element count, a
//! non-integer message type, or a non-string messageId/action is
//! rejected. When the messageId is still readable the caller can answer
//! with a `FormationViolation` CALLERROR; otherwise the frame is
//! dropped and logged.

use serde_json::Value;
use std::fmt;

use super::error_code::OcppErrorCode;

// ── Message-type constants ─────────────────────────────────────

const MSG_TYPE_CALL: u64 = 2;
const MSG_TYPE_CALL_RESULT: u64 = 3;
const MSG_TYPE_CALL_ERROR: u64 = 4;

// ── OcppFrame ──────────────────────────────────────────────────

/// A parsed OCPP-J frame (version-agnostic transport envelope).
#[derive(Debug, Clone, PartialEq)]
pub enum OcppFrame {
    /// `[2, messageId, action, payload]`
    Call {
        message_id: String,
        action: String,
        payload: Value,
    },
    /// `[3, messageId, payload]`
    CallResult { message_id: String, payload: Value },
    /// `[4, messageId, errorCode, errorDescription, errorDetails]`
    CallError {
        message_id: String,
        error_code: String,
        error_description: String,
        error_details: Value,
    },
}

impl OcppFrame {
    // ── Parsing ────────────────────────────────────────────

    /// Parse a raw JSON text into an `OcppFrame`.
    pub fn parse(text: &str) -> Result<Self, FrameError> {
        let value: Value =
            serde_json::from_str(text).map_err(|e| FrameError::bare(FrameErrorKind::InvalidJson(e.to_string())))?;

        let arr = match value.as_array() {
            Some(arr) => arr,
            None => return Err(FrameError::bare(FrameErrorKind::NotAnArray)),
        };

        if arr.is_empty() {
            return Err(FrameError::bare(FrameErrorKind::EmptyArray));
        }

        // The messageId (element 1) is recoverable whenever it is a
        // string, regardless of what else is wrong with the frame.
        let recovered_id = arr.get(1).and_then(|v| v.as_str()).map(str::to_string);

        let msg_type = match arr[0].as_u64() {
            Some(t) => t,
            None => {
                return Err(FrameError::with_id(
                    FrameErrorKind::MessageTypeNotInteger,
                    recovered_id,
                ))
            }
        };

        match msg_type {
            MSG_TYPE_CALL => Self::parse_call(arr, recovered_id),
            MSG_TYPE_CALL_RESULT => Self::parse_call_result(arr, recovered_id),
            MSG_TYPE_CALL_ERROR => Self::parse_call_error(arr, recovered_id),
            other => Err(FrameError::with_id(
                FrameErrorKind::UnknownMessageType(other),
                recovered_id,
            )),
        }
    }

    fn parse_call(arr: &[Value], recovered_id: Option<String>) -> Result<Self, FrameError> {
        if arr.len() != 4 {
            return Err(FrameError::with_id(
                FrameErrorKind::WrongLength {
                    expected: 4,
                    got: arr.len(),
                },
                recovered_id,
            ));
        }

        let message_id = match arr[1].as_str() {
            Some(id) => id.to_string(),
            None => {
                return Err(FrameError::bare(FrameErrorKind::FieldType(
                    "messageId must be a string",
                )))
            }
        };
        let action = match arr[2].as_str() {
            Some(a) => a.to_string(),
            None => {
                return Err(FrameError::with_id(
                    FrameErrorKind::FieldType("action must be a string"),
                    Some(message_id),
                ))
            }
        };

        Ok(Self::Call {
            message_id,
            action,
            payload: arr[3].clone(),
        })
    }

    fn parse_call_result(arr: &[Value], recovered_id: Option<String>) -> Result<Self, FrameError> {
        if arr.len() != 3 {
            return Err(FrameError::with_id(
                FrameErrorKind::WrongLength {
                    expected: 3,
                    got: arr.len(),
                },
                recovered_id,
            ));
        }

        let message_id = match arr[1].as_str() {
            Some(id) => id.to_string(),
            None => {
                return Err(FrameError::bare(FrameErrorKind::FieldType(
                    "messageId must be a string",
                )))
            }
        };

        Ok(Self::CallResult {
            message_id,
            payload: arr[2].clone(),
        })
    }

    fn parse_call_error(arr: &[Value], recovered_id: Option<String>) -> Result<Self, FrameError> {
        if arr.len() != 5 {
            return Err(FrameError::with_id(
                FrameErrorKind::WrongLength {
                    expected: 5,
                    got: arr.len(),
                },
                recovered_id,
            ));
        }

        let message_id = match arr[1].as_str() {
            Some(id) => id.to_string(),
            None => {
                return Err(FrameError::bare(FrameErrorKind::FieldType(
                    "messageId must be a string",
                )))
            }
        };
        let error_code = match arr[2].as_str() {
            Some(c) => c.to_string(),
            None => {
                return Err(FrameError::with_id(
                    FrameErrorKind::FieldType("errorCode must be a string"),
                    Some(message_id),
                ))
            }
        };
        let error_description = match arr[3].as_str() {
            Some(d) => d.to_string(),
            None => {
                return Err(FrameError::with_id(
                    FrameErrorKind::FieldType("errorDescription must be a string"),
                    Some(message_id),
                ))
            }
        };

        Ok(Self::CallError {
            message_id,
            error_code,
            error_description,
            error_details: arr[4].clone(),
        })
    }

    // ── Serialization ──────────────────────────────────────

    /// Serialize this frame to a JSON string.
    pub fn serialize(&self) -> String {
        let arr: Value = match self {
            Self::Call {
                message_id,
                action,
                payload,
            } => Value::Array(vec![
                Value::Number(MSG_TYPE_CALL.into()),
                Value::String(message_id.clone()),
                Value::String(action.clone()),
                payload.clone(),
            ]),

            Self::CallResult {
                message_id,
                payload,
            } => Value::Array(vec![
                Value::Number(MSG_TYPE_CALL_RESULT.into()),
                Value::String(message_id.clone()),
                payload.clone(),
            ]),

            Self::CallError {
                message_id,
                error_code,
                error_description,
                error_details,
            } => Value::Array(vec![
                Value::Number(MSG_TYPE_CALL_ERROR.into()),
                Value::String(message_id.clone()),
                Value::String(error_code.clone()),
                Value::String(error_description.clone()),
                error_details.clone(),
            ]),
        };

        // serde_json::to_string on a Value never fails
        serde_json::to_string(&arr).unwrap()
    }

    // ── Helpers ────────────────────────────────────────────

    /// Get the message ID of the frame.
    pub fn message_id(&self) -> &str {
        match self {
            Self::Call { message_id, .. }
            | Self::CallResult { message_id, .. }
            | Self::CallError { message_id, .. } => message_id,
        }
    }

    /// Build a CALLERROR replying to `message_id`.
    pub fn error_response(
        message_id: impl Into<String>,
        error_code: OcppErrorCode,
        error_description: impl Into<String>,
    ) -> Self {
        Self::CallError {
            message_id: message_id.into(),
            error_code: error_code.as_str().to_string(),
            error_description: error_description.into(),
            error_details: Value::Object(Default::default()),
        }
    }

    /// Build a CALLRESULT replying to `message_id`.
    pub fn result_response(message_id: impl Into<String>, payload: Value) -> Self {
        Self::CallResult {
            message_id: message_id.into(),
            payload,
        }
    }

    pub fn is_call(&self) -> bool {
        matches!(self, Self::Call { .. })
    }
}

// ── Errors ─────────────────────────────────────────────────────

/// Why a frame was rejected, plus the messageId when it could still be
/// read (the session uses it to reply `FormationViolation`).
#[derive(Debug)]
pub struct FrameError {
    pub kind: FrameErrorKind,
    message_id: Option<String>,
}

#[derive(Debug, PartialEq)]
pub enum FrameErrorKind {
    InvalidJson(String),
    NotAnArray,
    EmptyArray,
    MessageTypeNotInteger,
    UnknownMessageType(u64),
    WrongLength { expected: usize, got: usize },
    FieldType(&'static str),
}

impl FrameError {
    fn bare(kind: FrameErrorKind) -> Self {
        Self {
            kind,
            message_id: None,
        }
    }

    fn with_id(kind: FrameErrorKind, message_id: Option<String>) -> Self {
        Self { kind, message_id }
    }

    /// The messageId of the offending frame, when recoverable.
    pub fn message_id(&self) -> Option<&str> {
        self.message_id.as_deref()
    }
}

impl fmt::Display for FrameError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            FrameErrorKind::InvalidJson(msg) => write!(f, "invalid JSON: {}", msg),
            FrameErrorKind::NotAnArray => write!(f, "frame is not a JSON array"),
            FrameErrorKind::EmptyArray => write!(f, "empty frame array"),
            FrameErrorKind::MessageTypeNotInteger => write!(f, "message type is not an integer"),
            FrameErrorKind::UnknownMessageType(t) => write!(f, "unknown message type: {}", t),
            FrameErrorKind::WrongLength { expected, got } => {
                write!(f, "expected {} elements, got {}", expected, got)
            }
            FrameErrorKind::FieldType(msg) => write!(f, "field type mismatch: {}", msg),
        }
    }
}

impl std::error::Error for FrameError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_call() {
        let text = r#"[2,"m1","BootNotification",{"chargePointVendor":"V","chargePointModel":"M"}]"#;
        let frame = OcppFrame::parse(text).unwrap();
        match frame {
            OcppFrame::Call {
                message_id,
                action,
                payload,
            } => {
                assert_eq!(message_id, "m1");
                assert_eq!(action, "BootNotification");
                assert_eq!(payload["chargePointVendor"], "V");
            }
            _ => panic!("Expected Call frame"),
        }
    }

    #[test]
    fn parse_call_result() {
        let text = r#"[3,"m1",{"status":"Accepted","currentTime":"2024-01-01T00:00:00Z","interval":300}]"#;
        let frame = OcppFrame::parse(text).unwrap();
        match frame {
            OcppFrame::CallResult {
                message_id,
                payload,
            } => {
                assert_eq!(message_id, "m1");
                assert_eq!(payload["status"], "Accepted");
            }
            _ => panic!("Expected CallResult frame"),
        }
    }

    #[test]
    fn parse_call_error() {
        let text = r#"[4,"m1","NotImplemented","Action not supported",{}]"#;
        let frame = OcppFrame::parse(text).unwrap();
        match frame {
            OcppFrame::CallError {
                message_id,
                error_code,
                error_description,
                ..
            } => {
                assert_eq!(message_id, "m1");
                assert_eq!(error_code, "NotImplemented");
                assert_eq!(error_description, "Action not supported");
            }
            _ => panic!("Expected CallError frame"),
        }
    }

    #[test]
    fn roundtrip_all_frame_kinds() {
        let frames = [
            OcppFrame::Call {
                message_id: "id1".into(),
                action: "Heartbeat".into(),
                payload: serde_json::json!({}),
            },
            OcppFrame::CallResult {
                message_id: "id2".into(),
                payload: serde_json::json!({"currentTime": "2024-01-01T00:00:00Z"}),
            },
            OcppFrame::error_response("id3", OcppErrorCode::GenericError, "Something went wrong"),
        ];
        for frame in frames {
            let parsed = OcppFrame::parse(&frame.serialize()).unwrap();
            assert_eq!(parsed, frame);
        }
    }

    #[test]
    fn rejects_non_json() {
        assert!(OcppFrame::parse("not json").is_err());
    }

    #[test]
    fn rejects_non_array() {
        let err = OcppFrame::parse(r#"{"messageType":2}"#).unwrap_err();
        assert_eq!(err.kind, FrameErrorKind::NotAnArray);
        assert!(err.message_id().is_none());
    }

    #[test]
    fn rejects_unknown_message_type_but_recovers_id() {
        let err = OcppFrame::parse(r#"[5,"m9","Foo",{}]"#).unwrap_err();
        assert_eq!(err.kind, FrameErrorKind::UnknownMessageType(5));
        assert_eq!(err.message_id(), Some("m9"));
    }

    #[test]
    fn rejects_non_integer_message_type() {
        let err = OcppFrame::parse(r#"["2","m1","Heartbeat",{}]"#).unwrap_err();
        assert_eq!(err.kind, FrameErrorKind::MessageTypeNotInteger);
        assert_eq!(err.message_id(), Some("m1"));
        // A float is not an integer either
        let err = OcppFrame::parse(r#"[2.5,"m1","Heartbeat",{}]"#).unwrap_err();
        assert_eq!(err.kind, FrameErrorKind::MessageTypeNotInteger);
    }

    #[test]
    fn rejects_wrong_element_count() {
        let err = OcppFrame::parse(r#"[2,"m1","Heartbeat"]"#).unwrap_err();
        assert_eq!(
            err.kind,
            FrameErrorKind::WrongLength {
                expected: 4,
                got: 3
            }
        );
        assert_eq!(err.message_id(), Some("m1"));
    }

    #[test]
    fn rejects_non_string_message_id_without_recovery() {
        let err = OcppFrame::parse(r#"[2,42,"Heartbeat",{}]"#).unwrap_err();
        assert_eq!(
            err.kind,
            FrameErrorKind::FieldType("messageId must be a string")
        );
        assert!(err.message_id().is_none());
    }

    #[test]
    fn rejects_non_string_action_with_recovery() {
        let err = OcppFrame::parse(r#"[2,"m1",42,{}]"#).unwrap_err();
        assert_eq!(err.kind, FrameErrorKind::FieldType("action must be a string"));
        assert_eq!(err.message_id(), Some("m1"));
    }
}

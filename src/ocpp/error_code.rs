//! OCPP-J call error codes
//!
//! The error vocabulary shared by both protocol versions. These travel
//! in element 2 of a CALLERROR frame.

use std::fmt;

/// Error codes defined by the OCPP-J framing layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OcppErrorCode {
    NotImplemented,
    NotSupported,
    InternalError,
    ProtocolError,
    SecurityError,
    FormationViolation,
    PropertyConstraintViolation,
    OccurrenceConstraintViolation,
    TypeConstraintViolation,
    GenericError,
}

impl OcppErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NotImplemented => "NotImplemented",
            Self::NotSupported => "NotSupported",
            Self::InternalError => "InternalError",
            Self::ProtocolError => "ProtocolError",
            Self::SecurityError => "SecurityError",
            Self::FormationViolation => "FormationViolation",
            Self::PropertyConstraintViolation => "PropertyConstraintViolation",
            Self::OccurrenceConstraintViolation => "OccurrenceConstraintViolation",
            Self::TypeConstraintViolation => "TypeConstraintViolation",
            Self::GenericError => "GenericError",
        }
    }
}

impl fmt::Display for OcppErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A protocol-level failure produced while handling a CALL. Becomes a
/// CALLERROR frame on the wire.
#[derive(Debug, Clone)]
pub struct CallFault {
    pub code: OcppErrorCode,
    pub description: String,
}

impl CallFault {
    pub fn new(code: OcppErrorCode, description: impl Into<String>) -> Self {
        Self {
            code,
            description: description.into(),
        }
    }

    pub fn not_implemented(action: &str) -> Self {
        Self::new(
            OcppErrorCode::NotImplemented,
            format!("Action '{}' is not recognized", action),
        )
    }

    pub fn not_supported(action: &str) -> Self {
        Self::new(
            OcppErrorCode::NotSupported,
            format!("Action '{}' is not supported in this direction", action),
        )
    }

    pub fn formation(description: impl Into<String>) -> Self {
        Self::new(OcppErrorCode::FormationViolation, description)
    }

    pub fn internal(description: impl Into<String>) -> Self {
        Self::new(OcppErrorCode::InternalError, description)
    }
}

impl fmt::Display for CallFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code, self.description)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_render_as_wire_strings() {
        assert_eq!(OcppErrorCode::FormationViolation.as_str(), "FormationViolation");
        assert_eq!(OcppErrorCode::NotImplemented.to_string(), "NotImplemented");
    }

    #[test]
    fn fault_constructors_pick_codes() {
        assert_eq!(
            CallFault::not_implemented("Foo").code,
            OcppErrorCode::NotImplemented
        );
        assert_eq!(CallFault::internal("db down").code, OcppErrorCode::InternalError);
    }
}

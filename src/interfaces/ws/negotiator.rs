//! OCPP protocol version negotiation
//!
//! During the WebSocket handshake the station advertises the OCPP
//! sub-protocols it supports via `Sec-WebSocket-Protocol`. The
//! negotiator picks the best mutually-supported version; with no match
//! the handshake is refused (HTTP 400).

use crate::domain::OcppVersion;

/// Negotiates the OCPP version during the WebSocket handshake.
pub struct ProtocolNegotiator {
    /// Versions the CSMS supports, in preference order (highest first).
    supported_versions: Vec<OcppVersion>,
}

impl ProtocolNegotiator {
    pub fn new(supported_versions: Vec<OcppVersion>) -> Self {
        Self { supported_versions }
    }

    /// All supported versions, newest first.
    pub fn all() -> Self {
        Self::new(OcppVersion::ALL.to_vec())
    }

    /// Negotiate from the raw `Sec-WebSocket-Protocol` header value.
    ///
    /// Returns the best mutually-supported version, or `None` when no
    /// offered subprotocol matches.
    pub fn negotiate(&self, requested_protocols: &str) -> Option<OcppVersion> {
        let requested: Vec<&str> = requested_protocols.split(',').map(|s| s.trim()).collect();

        for version in &self.supported_versions {
            if requested.iter().any(|p| *p == version.subprotocol()) {
                return Some(*version);
            }
        }

        None
    }

    pub fn supported_versions(&self) -> &[OcppVersion] {
        &self.supported_versions
    }

    /// Subprotocols to advertise (server info / logging).
    pub fn supported_subprotocols(&self) -> Vec<&'static str> {
        self.supported_versions
            .iter()
            .map(|v| v.subprotocol())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn negotiate_single_match() {
        let negotiator = ProtocolNegotiator::new(vec![OcppVersion::V16]);
        assert_eq!(negotiator.negotiate("ocpp1.6"), Some(OcppVersion::V16));
    }

    #[test]
    fn negotiate_multiple_prefers_highest() {
        let negotiator = ProtocolNegotiator::all();
        // Station supports both; CSMS picks 2.0.1 (highest mutual).
        assert_eq!(
            negotiator.negotiate("ocpp1.6, ocpp2.0.1"),
            Some(OcppVersion::V201)
        );
    }

    #[test]
    fn negotiate_no_match() {
        let negotiator = ProtocolNegotiator::all();
        assert_eq!(negotiator.negotiate("ocpp2.1"), None);
    }

    #[test]
    fn negotiate_empty_header() {
        let negotiator = ProtocolNegotiator::all();
        assert_eq!(negotiator.negotiate(""), None);
    }
}

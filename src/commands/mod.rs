//! Typed CSMS -> CP commands
//!
//! ## Architecture
//!
//! ```text
//! HTTP handler ──► CommandDispatcher ──► v16::* / v201::*
//!                        │                     │
//!                  resolve version       build typed request
//!                  from the registry     call CommandSender
//!                                              │
//!                                     ─────────┘
//!                              CommandSender (version-agnostic transport)
//! ```
//!
//! - `v16` / `v201` — one file per action with concrete `rust-ocpp`
//!   types: build the request, send, parse the typed response.
//! - [`CommandDispatcher`] — version-aware facade: resolves the
//!   station's negotiated OCPP version and delegates.

pub mod dispatcher;
pub mod v16;
pub mod v201;

pub use dispatcher::{create_command_dispatcher, CommandDispatcher, SharedCommandDispatcher};

// ── Common types used by both v16 and v201 implementations ─────────

/// Availability state for ChangeAvailability (version-agnostic).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Availability {
    Operative,
    Inoperative,
}

impl Availability {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "Operative" => Some(Self::Operative),
            "Inoperative" => Some(Self::Inoperative),
            _ => None,
        }
    }
}

/// Reset kind (version-agnostic).
///
/// Maps to: v1.6 `Hard`/`Soft`, v2.0.1 `Immediate`/`OnIdle`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResetKind {
    Soft,
    Hard,
}

impl ResetKind {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "Soft" => Some(Self::Soft),
            "Hard" => Some(Self::Hard),
            _ => None,
        }
    }
}

/// Trigger message type (version-agnostic).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerType {
    BootNotification,
    Heartbeat,
    MeterValues,
    StatusNotification,
}

impl TriggerType {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "BootNotification" => Some(Self::BootNotification),
            "Heartbeat" => Some(Self::Heartbeat),
            "MeterValues" => Some(Self::MeterValues),
            "StatusNotification" => Some(Self::StatusNotification),
            _ => None,
        }
    }
}

/// Result of a DataTransfer command.
#[derive(Debug)]
pub struct DataTransferResult {
    pub status: String,
    pub data: Option<String>,
}

/// A configuration key-value pair returned by GetConfiguration (v1.6).
#[derive(Debug, Clone)]
pub struct KeyValue {
    pub key: String,
    pub readonly: bool,
    pub value: Option<String>,
}

/// GetConfiguration result (v1.6).
#[derive(Debug)]
pub struct ConfigurationResult {
    pub configuration_key: Vec<KeyValue>,
    pub unknown_key: Vec<String>,
}

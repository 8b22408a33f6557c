//! Station and connector domain entities

use chrono::{DateTime, Utc};

use super::version::OcppVersion;

/// Connector status as reported by the station.
///
/// Connector id 0 refers to the station itself (OCPP 1.6 convention);
/// ids >= 1 are physical outlets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectorStatus {
    Available,
    Preparing,
    Charging,
    SuspendedEV,
    SuspendedEVSE,
    Finishing,
    Reserved,
    Unavailable,
    Faulted,
}

impl ConnectorStatus {
    /// True for the states in which a connector is bound to a
    /// transaction (`current_transaction` must be set exactly then).
    pub fn is_occupied(&self) -> bool {
        matches!(
            self,
            Self::Charging | Self::SuspendedEV | Self::SuspendedEVSE | Self::Finishing
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Available => "Available",
            Self::Preparing => "Preparing",
            Self::Charging => "Charging",
            Self::SuspendedEV => "SuspendedEV",
            Self::SuspendedEVSE => "SuspendedEVSE",
            Self::Finishing => "Finishing",
            Self::Reserved => "Reserved",
            Self::Unavailable => "Unavailable",
            Self::Faulted => "Faulted",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "Available" => Some(Self::Available),
            "Preparing" => Some(Self::Preparing),
            "Charging" => Some(Self::Charging),
            "SuspendedEV" => Some(Self::SuspendedEV),
            "SuspendedEVSE" => Some(Self::SuspendedEVSE),
            "Finishing" => Some(Self::Finishing),
            "Reserved" => Some(Self::Reserved),
            "Unavailable" => Some(Self::Unavailable),
            "Faulted" => Some(Self::Faulted),
            _ => None,
        }
    }
}

impl Default for ConnectorStatus {
    fn default() -> Self {
        Self::Available
    }
}

impl std::fmt::Display for ConnectorStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Station operational status
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StationStatus {
    /// Connected and communicating
    Online,
    /// Not currently connected
    Offline,
    /// Station reported a fault on connector 0
    Faulted,
    /// Never seen (registered but never booted)
    Unknown,
}

impl StationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Online => "Online",
            Self::Offline => "Offline",
            Self::Faulted => "Faulted",
            Self::Unknown => "Unknown",
        }
    }
}

impl Default for StationStatus {
    fn default() -> Self {
        Self::Unknown
    }
}

impl std::fmt::Display for StationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&str> for StationStatus {
    fn from(s: &str) -> Self {
        match s {
            "Online" => Self::Online,
            "Offline" => Self::Offline,
            "Faulted" => Self::Faulted,
            _ => Self::Unknown,
        }
    }
}

/// Connector on a station
#[derive(Debug, Clone)]
pub struct Connector {
    pub id: u32,
    pub status: ConnectorStatus,
    pub error_code: Option<String>,
    /// Internal key of the transaction currently bound to this
    /// connector. Set exactly while `status.is_occupied()`.
    pub current_transaction: Option<String>,
    pub updated_at: DateTime<Utc>,
}

impl Connector {
    pub fn new(id: u32) -> Self {
        Self {
            id,
            status: ConnectorStatus::default(),
            error_code: None,
            current_transaction: None,
            updated_at: Utc::now(),
        }
    }
}

/// Charging station entity
#[derive(Debug, Clone)]
pub struct Station {
    /// Externally assigned opaque identifier (URL path segment)
    pub id: String,
    /// Negotiated OCPP protocol version (set on connect/boot)
    pub ocpp_version: Option<OcppVersion>,
    pub vendor: Option<String>,
    pub model: Option<String>,
    pub firmware_version: Option<String>,
    pub status: StationStatus,
    /// Heartbeat interval granted at boot (seconds)
    pub heartbeat_interval: u32,
    /// Blocked stations get `Rejected` at boot
    pub is_blocked: bool,
    /// Free-form geographic hint
    pub location: Option<String>,
    pub last_boot_at: Option<DateTime<Utc>>,
    pub last_heartbeat: Option<DateTime<Utc>>,
    /// Id of the last charging profile pushed to this station
    pub last_charging_profile_id: Option<i32>,
    pub registered_at: DateTime<Utc>,
    pub connectors: Vec<Connector>,
}

impl Station {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ocpp_version: None,
            vendor: None,
            model: None,
            firmware_version: None,
            status: StationStatus::Unknown,
            heartbeat_interval: 300,
            is_blocked: false,
            location: None,
            last_boot_at: None,
            last_heartbeat: None,
            last_charging_profile_id: None,
            registered_at: Utc::now(),
            connectors: Vec::new(),
        }
    }

    pub fn set_online(&mut self, now: DateTime<Utc>) {
        self.status = StationStatus::Online;
        self.last_heartbeat = Some(now);
    }

    pub fn set_offline(&mut self) {
        self.status = StationStatus::Offline;
    }

    pub fn record_heartbeat(&mut self, now: DateTime<Utc>) {
        self.last_heartbeat = Some(now);
        if self.status != StationStatus::Online {
            self.status = StationStatus::Online;
        }
    }

    pub fn connector(&self, id: u32) -> Option<&Connector> {
        self.connectors.iter().find(|c| c.id == id)
    }

    pub fn connector_mut(&mut self, id: u32) -> Option<&mut Connector> {
        self.connectors.iter_mut().find(|c| c.id == id)
    }

    /// Seconds since the last heartbeat, if any was ever received.
    pub fn seconds_since_heartbeat(&self, now: DateTime<Utc>) -> Option<i64> {
        self.last_heartbeat
            .map(|hb| now.signed_duration_since(hb).num_seconds())
    }

    /// Whether the station has been silent longer than its granted
    /// interval times the given grace factor.
    pub fn is_silent(&self, now: DateTime<Utc>, grace: f64) -> bool {
        match self.seconds_since_heartbeat(now) {
            Some(elapsed) => elapsed as f64 > self.heartbeat_interval as f64 * grace,
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_station_is_unknown() {
        let st = Station::new("CP-001");
        assert_eq!(st.status, StationStatus::Unknown);
        assert!(st.last_heartbeat.is_none());
        assert!(!st.is_blocked);
    }

    #[test]
    fn heartbeat_brings_station_online() {
        let mut st = Station::new("CP-001");
        st.set_offline();
        st.record_heartbeat(Utc::now());
        assert_eq!(st.status, StationStatus::Online);
        assert!(st.last_heartbeat.is_some());
    }

    #[test]
    fn silence_detection_uses_grace_factor() {
        let mut st = Station::new("CP-001");
        st.heartbeat_interval = 60;
        let now = Utc::now();
        st.last_heartbeat = Some(now - chrono::Duration::seconds(149));
        assert!(!st.is_silent(now, 2.5));
        st.last_heartbeat = Some(now - chrono::Duration::seconds(151));
        assert!(st.is_silent(now, 2.5));
    }

    #[test]
    fn never_seen_station_is_not_silent() {
        let st = Station::new("CP-001");
        assert!(!st.is_silent(Utc::now(), 2.5));
    }

    #[test]
    fn occupied_states_match_transaction_family() {
        use ConnectorStatus::*;
        for s in [Charging, SuspendedEV, SuspendedEVSE, Finishing] {
            assert!(s.is_occupied());
        }
        for s in [Available, Preparing, Reserved, Unavailable, Faulted] {
            assert!(!s.is_occupied());
        }
    }

    #[test]
    fn connector_status_roundtrip() {
        use ConnectorStatus::*;
        for s in [
            Available,
            Preparing,
            Charging,
            SuspendedEV,
            SuspendedEVSE,
            Finishing,
            Reserved,
            Unavailable,
            Faulted,
        ] {
            assert_eq!(ConnectorStatus::parse(s.as_str()), Some(s));
        }
        assert_eq!(ConnectorStatus::parse("Occupied"), None);
    }
}

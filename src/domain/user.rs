//! Users and id tokens
//!
//! An id token (RFID UID, contract id) resolves to at most one user.
//! Authorization is a pure function of (token, current time, user state).

use chrono::{DateTime, Utc};
use uuid::Uuid;

/// A user holding one id token.
#[derive(Debug, Clone)]
pub struct User {
    pub id: String,
    pub username: String,
    /// Opaque credential presented by the vehicle/driver. Unique.
    pub id_token: String,
    pub is_active: bool,
    /// Token validity end, if bounded
    pub token_expiry: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn new(username: impl Into<String>, id_token: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            username: username.into(),
            id_token: id_token.into(),
            is_active: true,
            token_expiry: None,
            created_at: Utc::now(),
        }
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.token_expiry.map(|e| e < now).unwrap_or(false)
    }
}

/// Outcome of an authorization decision, aligned with the OCPP
/// `idTagInfo.status` values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthStatus {
    Accepted,
    /// Token unknown
    Invalid,
    /// Token known but its user is deactivated
    Blocked,
    /// Token known but past its expiry date
    Expired,
    /// Token already owns an active transaction
    ConcurrentTx,
}

impl AuthStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Accepted => "Accepted",
            Self::Invalid => "Invalid",
            Self::Blocked => "Blocked",
            Self::Expired => "Expired",
            Self::ConcurrentTx => "ConcurrentTx",
        }
    }

    pub fn is_accepted(&self) -> bool {
        matches!(self, Self::Accepted)
    }
}

impl std::fmt::Display for AuthStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_user_is_active_and_unexpired() {
        let u = User::new("alice", "TAG-1");
        assert!(u.is_active);
        assert!(!u.is_expired(Utc::now()));
    }

    #[test]
    fn expiry_is_checked_against_now() {
        let mut u = User::new("alice", "TAG-1");
        u.token_expiry = Some(Utc::now() - chrono::Duration::days(1));
        assert!(u.is_expired(Utc::now()));
    }
}

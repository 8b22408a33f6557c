//! Authorization decisions
//!
//! Resolves an id token to a user and decides the OCPP authorization
//! status. The decision is a pure function of (token, now, user state,
//! concurrent transactions); policy beyond that lives here when it
//! arrives.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::domain::{AuthStatus, DomainResult, RepositoryProvider};

pub struct AuthorizationService {
    repos: Arc<dyn RepositoryProvider>,
}

impl AuthorizationService {
    pub fn new(repos: Arc<dyn RepositoryProvider>) -> Self {
        Self { repos }
    }

    /// Decide the authorization status for an id token.
    pub async fn authorize(&self, id_token: &str, now: DateTime<Utc>) -> DomainResult<AuthStatus> {
        let user = match self.repos.users().find_by_token(id_token).await? {
            Some(user) => user,
            None => {
                debug!(id_token, "Unknown id token");
                return Ok(AuthStatus::Invalid);
            }
        };

        if !user.is_active {
            return Ok(AuthStatus::Blocked);
        }
        if user.is_expired(now) {
            return Ok(AuthStatus::Expired);
        }

        if self
            .repos
            .transactions()
            .find_active_for_token(id_token)
            .await?
            .is_some()
        {
            return Ok(AuthStatus::ConcurrentTx);
        }

        Ok(AuthStatus::Accepted)
    }

    /// Authorization for StartTransaction: the token may already own
    /// the transaction being retried, so the concurrency check is
    /// performed by the transaction service instead.
    pub async fn authorize_for_start(
        &self,
        id_token: &str,
        now: DateTime<Utc>,
    ) -> DomainResult<AuthStatus> {
        let user = match self.repos.users().find_by_token(id_token).await? {
            Some(user) => user,
            None => return Ok(AuthStatus::Invalid),
        };
        if !user.is_active {
            return Ok(AuthStatus::Blocked);
        }
        if user.is_expired(now) {
            return Ok(AuthStatus::Expired);
        }
        Ok(AuthStatus::Accepted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Transaction, User};
    use crate::infrastructure::memory::InMemoryRepositoryProvider;

    async fn service_with_user(user: User) -> AuthorizationService {
        let repos = Arc::new(InMemoryRepositoryProvider::new());
        repos.users().insert(user).await.unwrap();
        AuthorizationService::new(repos)
    }

    #[tokio::test]
    async fn unknown_token_is_invalid() {
        let repos = Arc::new(InMemoryRepositoryProvider::new());
        let svc = AuthorizationService::new(repos);
        assert_eq!(
            svc.authorize("NOPE", Utc::now()).await.unwrap(),
            AuthStatus::Invalid
        );
    }

    #[tokio::test]
    async fn active_user_is_accepted() {
        let svc = service_with_user(User::new("alice", "TAG-1")).await;
        assert_eq!(
            svc.authorize("TAG-1", Utc::now()).await.unwrap(),
            AuthStatus::Accepted
        );
    }

    #[tokio::test]
    async fn inactive_user_is_blocked() {
        let mut user = User::new("alice", "TAG-1");
        user.is_active = false;
        let svc = service_with_user(user).await;
        assert_eq!(
            svc.authorize("TAG-1", Utc::now()).await.unwrap(),
            AuthStatus::Blocked
        );
    }

    #[tokio::test]
    async fn expired_token_is_expired() {
        let mut user = User::new("alice", "TAG-1");
        user.token_expiry = Some(Utc::now() - chrono::Duration::hours(1));
        let svc = service_with_user(user).await;
        assert_eq!(
            svc.authorize("TAG-1", Utc::now()).await.unwrap(),
            AuthStatus::Expired
        );
    }

    #[tokio::test]
    async fn token_with_active_transaction_is_concurrent() {
        let repos = Arc::new(InMemoryRepositoryProvider::new());
        repos.users().insert(User::new("alice", "TAG-1")).await.unwrap();
        repos
            .transactions()
            .insert(Transaction::new_v16("CP-001", 1, "TAG-1", 0, Utc::now(), 1))
            .await
            .unwrap();

        let svc = AuthorizationService::new(repos);
        assert_eq!(
            svc.authorize("TAG-1", Utc::now()).await.unwrap(),
            AuthStatus::ConcurrentTx
        );
        // The start-path check skips the concurrency test.
        assert_eq!(
            svc.authorize_for_start("TAG-1", Utc::now()).await.unwrap(),
            AuthStatus::Accepted
        );
    }
}

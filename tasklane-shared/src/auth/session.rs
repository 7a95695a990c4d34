/// Session ledger: server-side record of issued refresh tokens
///
/// A refresh token is only honoured while its session row exists and has
/// not expired, which is what makes logout (revocation) possible on top of
/// otherwise stateless JWTs. Rows are keyed by the SHA-256 hex digest of the
/// token; the token itself is never stored.
///
/// One session is recorded per login. Refreshing an access token does not
/// create a new session.
///
/// # Example
///
/// ```
/// use tasklane_shared::auth::session::SessionLedger;
/// use tasklane_shared::store::{MemoryStore, Store};
/// use tasklane_shared::models::user::CreateUser;
/// use chrono::Duration;
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), tasklane_shared::store::StoreError> {
/// let store = MemoryStore::new();
/// let user = store.create_user(CreateUser {
///     email: "ada@example.com".into(),
///     password_hash: "x".into(),
///     name: None,
/// }).await?;
///
/// let ledger = SessionLedger::new(&store);
/// ledger.record_session(user.id, "refresh-token", Duration::days(7)).await?;
/// assert!(ledger.is_active("refresh-token").await?);
///
/// ledger.revoke("refresh-token").await?;
/// assert!(!ledger.is_active("refresh-token").await?);
/// # Ok(())
/// # }
/// ```

use std::sync::Arc;

use chrono::{Duration, Utc};
use sha2::{Digest, Sha256};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::models::session::{CreateSession, Session};
use crate::store::{Store, StoreResult};

/// Lowercase hex SHA-256 of a refresh token
pub fn hash_token(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}

pub struct SessionLedger<'a> {
    store: &'a dyn Store,
}

impl<'a> SessionLedger<'a> {
    pub fn new(store: &'a dyn Store) -> Self {
        SessionLedger { store }
    }

    /// Persists a session expiring `ttl` from now
    pub async fn record_session(
        &self,
        user_id: Uuid,
        refresh_token: &str,
        ttl: Duration,
    ) -> StoreResult<Session> {
        let session = self
            .store
            .create_session(CreateSession {
                user_id,
                token_hash: hash_token(refresh_token),
                expires_at: Utc::now() + ttl,
            })
            .await?;

        debug!(user_id = %user_id, expires_at = %session.expires_at, "Session recorded");
        Ok(session)
    }

    /// True if the token has a session row that has not expired
    pub async fn is_active(&self, refresh_token: &str) -> StoreResult<bool> {
        let session = self.store.find_session(&hash_token(refresh_token)).await?;
        Ok(session.map_or(false, |s| !s.is_expired_at(Utc::now())))
    }

    /// Deletes the session for this token. Revoking twice is not an error;
    /// the return value says whether a row was removed.
    pub async fn revoke(&self, refresh_token: &str) -> StoreResult<bool> {
        let removed = self.store.delete_session(&hash_token(refresh_token)).await?;
        if removed {
            debug!("Session revoked");
        }
        Ok(removed)
    }

    /// Drops every expired session, returning how many were removed
    pub async fn purge_expired(&self) -> StoreResult<u64> {
        let purged = self.store.delete_expired_sessions(Utc::now()).await?;
        if purged > 0 {
            info!(purged, "Purged expired sessions");
        }
        Ok(purged)
    }
}

/// Runs [`SessionLedger::purge_expired`] every `period` until the handle is
/// aborted. The first sweep happens immediately.
pub fn spawn_session_sweeper(store: Arc<dyn Store>, period: std::time::Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            if let Err(e) = SessionLedger::new(store.as_ref()).purge_expired().await {
                warn!(error = %e, "Session sweep failed");
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::user::CreateUser;
    use crate::store::MemoryStore;

    async fn user_id(store: &MemoryStore) -> Uuid {
        store
            .create_user(CreateUser {
                email: "ada@example.com".to_string(),
                password_hash: "x".to_string(),
                name: None,
            })
            .await
            .unwrap()
            .id
    }

    #[test]
    fn test_hash_token_is_sha256_hex() {
        let digest = hash_token("abc");
        assert_eq!(
            digest,
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[tokio::test]
    async fn test_token_is_stored_hashed() {
        let store = MemoryStore::new();
        let uid = user_id(&store).await;
        let ledger = SessionLedger::new(&store);

        let session = ledger
            .record_session(uid, "plain-token", Duration::days(7))
            .await
            .unwrap();

        assert_ne!(session.token_hash, "plain-token");
        assert_eq!(session.token_hash, hash_token("plain-token"));
    }

    #[tokio::test]
    async fn test_unknown_token_is_inactive() {
        let store = MemoryStore::new();
        let ledger = SessionLedger::new(&store);
        assert!(!ledger.is_active("never-issued").await.unwrap());
        assert!(!ledger.revoke("never-issued").await.unwrap());
    }

    #[tokio::test]
    async fn test_expired_session_is_inactive_and_purged() {
        let store = MemoryStore::new();
        let uid = user_id(&store).await;
        let ledger = SessionLedger::new(&store);

        ledger
            .record_session(uid, "stale", Duration::seconds(-1))
            .await
            .unwrap();
        ledger
            .record_session(uid, "fresh", Duration::days(7))
            .await
            .unwrap();

        assert!(!ledger.is_active("stale").await.unwrap());
        assert!(ledger.is_active("fresh").await.unwrap());

        assert_eq!(ledger.purge_expired().await.unwrap(), 1);
        assert!(ledger.is_active("fresh").await.unwrap());
    }

    #[tokio::test]
    async fn test_sweeper_drops_expired_sessions() {
        let memory = MemoryStore::new();
        let uid = user_id(&memory).await;
        let store: Arc<dyn Store> = Arc::new(memory);

        let ledger = SessionLedger::new(store.as_ref());
        ledger
            .record_session(uid, "stale", Duration::seconds(-1))
            .await
            .unwrap();
        ledger
            .record_session(uid, "fresh", Duration::days(7))
            .await
            .unwrap();

        let sweeper = spawn_session_sweeper(store.clone(), std::time::Duration::from_millis(10));
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        sweeper.abort();

        assert!(store.find_session(&hash_token("stale")).await.unwrap().is_none());
        assert!(store.find_session(&hash_token("fresh")).await.unwrap().is_some());
    }
}

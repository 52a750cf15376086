// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Session token lifecycle: one access/refresh token pair per signed-in
//! identity, refreshed transparently before it expires.

use crate::config::MAX_REFRESH_LEEWAY_SECS;
use crate::error::AppError;
use crate::models::TokenResponse;
use crate::services::identity::{decode_identity_assertion, IdentityClient};
use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use ring::rand::{SecureRandom, SystemRandom};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

/// Session errors.
#[derive(Debug, Clone, thiserror::Error)]
pub enum SessionError {
    /// No session exists (never signed in, signed out, or a previous
    /// refresh failed).
    #[error("unauthenticated")]
    Unauthenticated,

    /// Refresh failed just now; the session has been cleared.
    #[error("session expired: {0}")]
    SessionExpired(String),

    #[error("malformed identity assertion: {0}")]
    MalformedAssertion(String),

    #[error("token response carried no refresh token")]
    MissingRefreshToken,

    #[error("token lifetime out of range: {0}s")]
    InvalidLifetime(i64),
}

/// Access/refresh pair with the instant the access token stops being valid.
#[derive(Clone)]
struct SessionTokens {
    access_token: String,
    refresh_token: String,
    expires_at: DateTime<Utc>,
    /// `expires_in` as granted; bounds the refresh leeway.
    lifetime: Duration,
}

enum SessionState {
    Unauthenticated,
    Authenticated {
        subject_id: String,
        tokens: SessionTokens,
    },
}

/// Read-only view of an authenticated session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSnapshot {
    pub subject_id: String,
    pub expires_at: DateTime<Utc>,
}

impl SessionSnapshot {
    /// Expiry as epoch milliseconds.
    pub fn expires_at_millis(&self) -> i64 {
        self.expires_at.timestamp_millis()
    }
}

/// Owns the token pair of one signed-in identity.
///
/// `get_valid_token` is the only way to read the access token. It holds
/// the state lock across a refresh, so concurrent callers wait for the
/// in-flight refresh and then see its result instead of issuing another.
pub struct SessionTokenManager {
    identity: IdentityClient,
    refresh_leeway: Duration,
    state: Mutex<SessionState>,
}

impl SessionTokenManager {
    /// Create an unauthenticated manager.
    ///
    /// The leeway is clamped to `0..=MAX_REFRESH_LEEWAY_SECS`.
    pub fn new(identity: IdentityClient, refresh_leeway_secs: i64) -> Self {
        Self {
            identity,
            refresh_leeway: Duration::seconds(
                refresh_leeway_secs.clamp(0, MAX_REFRESH_LEEWAY_SECS),
            ),
            state: Mutex::new(SessionState::Unauthenticated),
        }
    }

    /// Establish the session from the initial token response.
    ///
    /// Fails closed: on error the manager stays (or becomes) unauthenticated.
    pub async fn sign_in(&self, grant: TokenResponse) -> Result<String, SessionError> {
        let mut state = self.state.lock().await;
        *state = SessionState::Unauthenticated;

        let assertion = grant
            .id_token
            .as_deref()
            .ok_or_else(|| SessionError::MalformedAssertion("missing id_token".to_string()))?;
        let claims =
            decode_identity_assertion(assertion).map_err(SessionError::MalformedAssertion)?;

        let refresh_token = grant
            .refresh_token
            .ok_or(SessionError::MissingRefreshToken)?;
        let (expires_at, lifetime) = token_expiry(grant.expires_in)?;

        *state = SessionState::Authenticated {
            subject_id: claims.sub.clone(),
            tokens: SessionTokens {
                access_token: grant.access_token,
                refresh_token,
                expires_at,
                lifetime,
            },
        };

        tracing::info!(subject_id = %claims.sub, "Session established");
        Ok(claims.sub)
    }

    /// Return a non-expired access token, refreshing first if needed.
    pub async fn get_valid_token(&self) -> Result<String, SessionError> {
        let mut state = self.state.lock().await;

        match &*state {
            SessionState::Unauthenticated => return Err(SessionError::Unauthenticated),
            SessionState::Authenticated { tokens, .. } => {
                // Never refresh earlier than halfway through the token's life.
                let leeway = self.refresh_leeway.min(tokens.lifetime / 2);
                if Utc::now() + leeway < tokens.expires_at {
                    return Ok(tokens.access_token.clone());
                }
            }
        }

        self.refresh_locked(&mut state).await
    }

    /// Refresh the access token now, regardless of its expiry.
    pub async fn refresh(&self) -> Result<String, SessionError> {
        let mut state = self.state.lock().await;
        self.refresh_locked(&mut state).await
    }

    /// Drop the session.
    pub async fn sign_out(&self) {
        let mut state = self.state.lock().await;
        if let SessionState::Authenticated { subject_id, .. } = &*state {
            tracing::info!(subject_id = %subject_id, "Session signed out");
        }
        *state = SessionState::Unauthenticated;
    }

    /// Subject and expiry of the current session, if any.
    pub async fn snapshot(&self) -> Option<SessionSnapshot> {
        match &*self.state.lock().await {
            SessionState::Unauthenticated => None,
            SessionState::Authenticated { subject_id, tokens } => Some(SessionSnapshot {
                subject_id: subject_id.clone(),
                expires_at: tokens.expires_at,
            }),
        }
    }

    pub async fn is_authenticated(&self) -> bool {
        matches!(&*self.state.lock().await, SessionState::Authenticated { .. })
    }

    /// Signed out, as far as can be seen without waiting. A locked state
    /// is in use and counts as live.
    fn has_ended(&self) -> bool {
        matches!(
            self.state.try_lock().as_deref(),
            Ok(SessionState::Unauthenticated)
        )
    }

    async fn refresh_locked(&self, state: &mut SessionState) -> Result<String, SessionError> {
        let (subject_id, tokens) = match &*state {
            SessionState::Unauthenticated => return Err(SessionError::Unauthenticated),
            SessionState::Authenticated { subject_id, tokens } => {
                (subject_id.clone(), tokens.clone())
            }
        };

        tracing::debug!(subject_id = %subject_id, "Refreshing access token");

        let refreshed = self
            .identity
            .refresh_token(&tokens.refresh_token)
            .await
            .map_err(|e| e.to_string())
            .and_then(|refreshed| {
                let (expires_at, lifetime) =
                    token_expiry(refreshed.expires_in).map_err(|e| e.to_string())?;
                Ok(SessionTokens {
                    access_token: refreshed.access_token,
                    refresh_token: refreshed.refresh_token.unwrap_or(tokens.refresh_token),
                    expires_at,
                    lifetime,
                })
            });

        match refreshed {
            Ok(tokens) => {
                let access_token = tokens.access_token.clone();
                *state = SessionState::Authenticated { subject_id, tokens };
                Ok(access_token)
            }
            Err(reason) => {
                tracing::warn!(
                    subject_id = %subject_id,
                    error = %reason,
                    "Failed to refresh access token, ending session"
                );
                *state = SessionState::Unauthenticated;
                Err(SessionError::SessionExpired(reason))
            }
        }
    }
}

/// Expiry instant and lifetime for a granted `expires_in`.
fn token_expiry(expires_in_secs: i64) -> Result<(DateTime<Utc>, Duration), SessionError> {
    let lifetime = Duration::try_seconds(expires_in_secs.max(0))
        .ok_or(SessionError::InvalidLifetime(expires_in_secs))?;
    let expires_at = Utc::now()
        .checked_add_signed(lifetime)
        .ok_or(SessionError::InvalidLifetime(expires_in_secs))?;
    Ok((expires_at, lifetime))
}

struct SessionEntry {
    manager: Arc<SessionTokenManager>,
    created_at: Instant,
}

/// All live sessions of this process, keyed by opaque session id.
///
/// Entries older than the session TTL are unreachable (the cookie JWT has
/// expired) and are removed by `prune_expired`.
#[derive(Clone)]
pub struct SessionStore {
    identity: IdentityClient,
    refresh_leeway_secs: i64,
    session_ttl: std::time::Duration,
    sessions: Arc<DashMap<String, SessionEntry>>,
    rng: SystemRandom,
}

impl SessionStore {
    pub fn new(
        identity: IdentityClient,
        refresh_leeway_secs: i64,
        session_ttl: std::time::Duration,
    ) -> Self {
        Self {
            identity,
            refresh_leeway_secs,
            session_ttl,
            sessions: Arc::new(DashMap::new()),
            rng: SystemRandom::new(),
        }
    }

    /// Sign in with the initial token response and register the session.
    ///
    /// Returns the new session id and the subject id.
    pub async fn create(&self, grant: TokenResponse) -> Result<(String, String), AppError> {
        let manager = Arc::new(SessionTokenManager::new(
            self.identity.clone(),
            self.refresh_leeway_secs,
        ));
        let subject_id = manager.sign_in(grant).await?;

        let session_id = self.new_session_id()?;
        self.sessions.insert(
            session_id.clone(),
            SessionEntry {
                manager,
                created_at: Instant::now(),
            },
        );
        Ok((session_id, subject_id))
    }

    /// Look up a live session.
    pub fn get(&self, session_id: &str) -> Option<Arc<SessionTokenManager>> {
        self.sessions
            .get(session_id)
            .map(|entry| entry.manager.clone())
    }

    /// Sign out and forget a session. Unknown ids are ignored.
    pub async fn remove(&self, session_id: &str) {
        if let Some((_, entry)) = self.sessions.remove(session_id) {
            entry.manager.sign_out().await;
        }
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Drop sessions past their TTL and sessions that have already ended.
    ///
    /// Returns the number of sessions removed.
    pub fn prune_expired(&self) -> usize {
        self.prune_expired_at(Instant::now())
    }

    fn prune_expired_at(&self, now: Instant) -> usize {
        let mut removed = 0;
        self.sessions.retain(|_, entry| {
            let keep = now.saturating_duration_since(entry.created_at) < self.session_ttl
                && !entry.manager.has_ended();
            if !keep {
                removed += 1;
            }
            keep
        });
        removed
    }

    /// Run `prune_expired` every `period` in the background.
    pub fn spawn_pruner(&self, period: std::time::Duration) -> JoinHandle<()> {
        let store = self.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            loop {
                interval.tick().await;
                let removed = store.prune_expired();
                if removed > 0 {
                    tracing::info!(removed, remaining = store.len(), "Pruned expired sessions");
                }
            }
        })
    }

    fn new_session_id(&self) -> Result<String, AppError> {
        let mut bytes = [0u8; 32];
        self.rng
            .fill(&mut bytes)
            .map_err(|_| AppError::Internal(anyhow::anyhow!("system RNG failure")))?;
        Ok(hex::encode(bytes))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TTL: std::time::Duration = std::time::Duration::from_secs(30 * 24 * 60 * 60);

    fn manager() -> SessionTokenManager {
        // Points nowhere; these tests never reach the network.
        let identity = IdentityClient::new(
            "http://127.0.0.1:9/realms/test",
            "client".to_string(),
            "secret".to_string(),
        );
        SessionTokenManager::new(identity, 30)
    }

    fn grant(id_token: Option<&str>) -> TokenResponse {
        TokenResponse {
            access_token: "access-1".to_string(),
            refresh_token: Some("refresh-1".to_string()),
            expires_in: 300,
            id_token: id_token.map(str::to_string),
        }
    }

    fn assertion(sub: &str) -> String {
        use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
        format!(
            "e30.{}.sig",
            URL_SAFE_NO_PAD.encode(format!(r#"{{"sub":"{}"}}"#, sub))
        )
    }

    #[tokio::test]
    async fn test_unauthenticated_manager_has_no_token() {
        let manager = manager();
        assert!(matches!(
            manager.get_valid_token().await,
            Err(SessionError::Unauthenticated)
        ));
        assert!(manager.snapshot().await.is_none());
    }

    #[tokio::test]
    async fn test_sign_in_then_valid_token_without_refresh() {
        let manager = manager();
        let subject = manager.sign_in(grant(Some(&assertion("user-1")))).await.unwrap();
        assert_eq!(subject, "user-1");

        assert_eq!(manager.get_valid_token().await.unwrap(), "access-1");
        let snapshot = manager.snapshot().await.unwrap();
        assert_eq!(snapshot.subject_id, "user-1");
        assert!(snapshot.expires_at_millis() > Utc::now().timestamp_millis());
    }

    #[tokio::test]
    async fn test_sign_in_fails_closed_on_missing_assertion() {
        let manager = manager();
        let result = manager.sign_in(grant(None)).await;
        assert!(matches!(result, Err(SessionError::MalformedAssertion(_))));
        assert!(!manager.is_authenticated().await);
    }

    #[tokio::test]
    async fn test_failed_sign_in_clears_previous_session() {
        let manager = manager();
        manager.sign_in(grant(Some(&assertion("user-1")))).await.unwrap();

        let result = manager.sign_in(grant(Some("garbage"))).await;
        assert!(matches!(result, Err(SessionError::MalformedAssertion(_))));
        assert!(!manager.is_authenticated().await);
    }

    #[tokio::test]
    async fn test_sign_in_requires_refresh_token() {
        let manager = manager();
        let mut g = grant(Some(&assertion("user-1")));
        g.refresh_token = None;
        assert!(matches!(
            manager.sign_in(g).await,
            Err(SessionError::MissingRefreshToken)
        ));
        assert!(!manager.is_authenticated().await);
    }

    #[tokio::test]
    async fn test_sign_out_clears_session() {
        let manager = manager();
        manager.sign_in(grant(Some(&assertion("user-1")))).await.unwrap();
        manager.sign_out().await;
        assert!(matches!(
            manager.get_valid_token().await,
            Err(SessionError::Unauthenticated)
        ));
    }

    #[tokio::test]
    async fn test_store_create_get_remove() {
        let identity = IdentityClient::new(
            "http://127.0.0.1:9/realms/test",
            "client".to_string(),
            "secret".to_string(),
        );
        let store = SessionStore::new(identity, 30, TTL);

        let (sid, subject) = store.create(grant(Some(&assertion("user-9")))).await.unwrap();
        assert_eq!(subject, "user-9");
        assert_eq!(sid.len(), 64);
        assert_eq!(store.len(), 1);

        let manager = store.get(&sid).expect("session registered");
        store.remove(&sid).await;
        assert!(store.get(&sid).is_none());
        assert!(store.is_empty());
        assert!(!manager.is_authenticated().await);
    }

    #[tokio::test]
    async fn test_store_rejects_malformed_assertion() {
        let identity = IdentityClient::new(
            "http://127.0.0.1:9/realms/test",
            "client".to_string(),
            "secret".to_string(),
        );
        let store = SessionStore::new(identity, 30, TTL);
        assert!(matches!(
            store.create(grant(Some("x.y"))).await,
            Err(AppError::BadRequest(_))
        ));
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_sign_in_rejects_out_of_range_lifetime() {
        let manager = manager();
        let mut g = grant(Some(&assertion("user-1")));
        g.expires_in = i64::MAX;
        assert!(matches!(
            manager.sign_in(g).await,
            Err(SessionError::InvalidLifetime(i64::MAX))
        ));
        assert!(!manager.is_authenticated().await);
    }

    #[test]
    fn test_token_expiry_bounds() {
        assert!(token_expiry(300).is_ok());
        assert_eq!(token_expiry(-5).unwrap().1, Duration::zero());
        assert!(token_expiry(10_000_000_000_000).is_err());
        assert!(token_expiry(i64::MAX).is_err());
    }

    #[tokio::test]
    async fn test_huge_leeway_is_clamped() {
        let identity = IdentityClient::new(
            "http://127.0.0.1:9/realms/test",
            "client".to_string(),
            "secret".to_string(),
        );
        let manager = SessionTokenManager::new(identity, i64::MAX);
        manager.sign_in(grant(Some(&assertion("user-1")))).await.unwrap();

        // Halfway through a 300 s lifetime is still far away.
        assert_eq!(manager.get_valid_token().await.unwrap(), "access-1");
    }

    #[tokio::test]
    async fn test_prune_evicts_sessions_past_ttl() {
        let identity = IdentityClient::new(
            "http://127.0.0.1:9/realms/test",
            "client".to_string(),
            "secret".to_string(),
        );
        let store = SessionStore::new(identity, 30, TTL);
        let (sid, _) = store.create(grant(Some(&assertion("user-1")))).await.unwrap();

        assert_eq!(store.prune_expired(), 0);
        assert!(store.get(&sid).is_some());

        let later = Instant::now() + TTL + std::time::Duration::from_secs(1);
        assert_eq!(store.prune_expired_at(later), 1);
        assert!(store.get(&sid).is_none());
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_prune_evicts_ended_sessions() {
        let identity = IdentityClient::new(
            "http://127.0.0.1:9/realms/test",
            "client".to_string(),
            "secret".to_string(),
        );
        let store = SessionStore::new(identity, 30, TTL);
        let (ended, _) = store.create(grant(Some(&assertion("user-1")))).await.unwrap();
        let (live, _) = store.create(grant(Some(&assertion("user-2")))).await.unwrap();

        store.get(&ended).unwrap().sign_out().await;

        assert_eq!(store.prune_expired(), 1);
        assert!(store.get(&ended).is_none());
        assert!(store.get(&live).is_some());
    }
}

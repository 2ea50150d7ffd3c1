//! Session guard: decides whether a protected view may render.
//!
//! ARCHITECTURE
//! ============
//! One evaluation walks a fixed chain: validate the stored access token, and
//! if that is missing or refused, exchange the stored refresh token once.
//! The result is `Authenticated` or `Unauthenticated`; the caller shows
//! `Pending` while the chain runs.
//!
//! FAILURE SEMANTICS
//! =================
//! Backend failures never escape. A refused token, a 5xx, and a dropped
//! connection are all just "this step failed" and move the chain forward.
//! There is no backoff and no retry beyond the single refresh.
//!
//! CONCURRENCY
//! ===========
//! Evaluations sharing one guard serialize the refresh step. An evaluation
//! that waited on another's refresh re-validates the token that one stored
//! instead of spending the refresh token a second time. Separate guards (or
//! separate processes) sharing a store are not coordinated; the last write
//! wins.

use tokio::sync::Mutex;

use crate::config::ConsoleConfig;
use crate::net::api::AuthApi;
use crate::services::claims;
use crate::state::auth::{AuthState, AuthStatus};
use crate::state::store::{SessionKey, SessionStore};

/// Behavior knobs for [`SessionGuard`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GuardPolicy {
    /// Clear the store when an evaluation ends `Unauthenticated`.
    pub clear_on_unauthenticated: bool,
}

impl Default for GuardPolicy {
    fn default() -> Self {
        Self { clear_on_unauthenticated: true }
    }
}

impl From<&ConsoleConfig> for GuardPolicy {
    fn from(config: &ConsoleConfig) -> Self {
        Self { clear_on_unauthenticated: config.clear_on_unauthenticated }
    }
}

pub struct SessionGuard<A, S> {
    api: A,
    store: S,
    policy: GuardPolicy,
    refresh_lock: Mutex<()>,
}

impl<A: AuthApi, S: SessionStore> SessionGuard<A, S> {
    #[must_use]
    pub fn new(api: A, store: S) -> Self {
        Self::with_policy(api, store, GuardPolicy::default())
    }

    #[must_use]
    pub fn with_policy(api: A, store: S, policy: GuardPolicy) -> Self {
        Self { api, store, policy, refresh_lock: Mutex::new(()) }
    }

    #[must_use]
    pub fn store(&self) -> &S {
        &self.store
    }

    #[must_use]
    pub fn policy(&self) -> GuardPolicy {
        self.policy
    }

    /// Run one full evaluation. Never fails; always returns a terminal status.
    pub async fn evaluate(&self) -> AuthStatus {
        let status = self.resolve().await;
        tracing::debug!(status = status.label(), "session guard decided");

        if status == AuthStatus::Unauthenticated && self.policy.clear_on_unauthenticated {
            self.store.clear();
        }
        status
    }

    /// [`SessionGuard::evaluate`], plus the roles of the resulting access
    /// token for display.
    pub async fn evaluate_state(&self) -> AuthState {
        let status = self.evaluate().await;
        let roles = match status {
            AuthStatus::Authenticated => claims::roles(self.stored(SessionKey::AccessToken).as_deref()),
            AuthStatus::Pending | AuthStatus::Unauthenticated => Vec::new(),
        };
        AuthState { status, roles }
    }

    async fn resolve(&self) -> AuthStatus {
        let access = self.stored(SessionKey::AccessToken);
        if let Some(token) = access.as_deref() {
            if self.validate(token).await {
                return AuthStatus::Authenticated;
            }
        } else {
            tracing::debug!("no access token stored");
        }
        self.recover(access.as_deref()).await
    }

    /// Refresh step. `stale` is the access token this evaluation already
    /// tried (if any).
    async fn recover(&self, stale: Option<&str>) -> AuthStatus {
        let _in_flight = self.refresh_lock.lock().await;

        if let Some(current) = self.stored(SessionKey::AccessToken) {
            if stale != Some(current.as_str()) && self.validate(&current).await {
                tracing::debug!("access token replaced by a concurrent refresh");
                return AuthStatus::Authenticated;
            }
        }

        let Some(refresh_token) = self.stored(SessionKey::RefreshToken) else {
            tracing::debug!("no refresh token stored");
            return AuthStatus::Unauthenticated;
        };

        match self.api.refresh(&refresh_token).await {
            Ok(access_token) if !access_token.trim().is_empty() => {
                self.store.set(SessionKey::AccessToken, &access_token);
                tracing::debug!("access token refreshed");
                AuthStatus::Authenticated
            }
            Ok(_) => {
                tracing::warn!("refresh returned an empty access token");
                AuthStatus::Unauthenticated
            }
            Err(e) => {
                tracing::warn!(error = %e, "token refresh failed");
                AuthStatus::Unauthenticated
            }
        }
    }

    async fn validate(&self, access_token: &str) -> bool {
        match self.api.validate(access_token).await {
            Ok(()) => true,
            Err(e) if e.is_auth_rejection() => {
                tracing::debug!(error = %e, "access token rejected");
                false
            }
            Err(e) => {
                tracing::warn!(error = %e, "access token validation failed");
                false
            }
        }
    }

    /// Stored value for `key`; blank strings count as absent.
    fn stored(&self, key: SessionKey) -> Option<String> {
        self.store.get(key).filter(|value| !value.trim().is_empty())
    }
}

#[cfg(test)]
#[path = "guard_test.rs"]
mod tests;

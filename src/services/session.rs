//! Login, logout, and onboarding submission flows.
//!
//! ARCHITECTURE
//! ============
//! Each flow is one backend round trip plus the store writes that follow it.
//! Flows never return `Err`; every failure becomes an error [`Notice`] the
//! rendering layer shows as-is. Navigation is returned, not performed.
//!
//! ERROR HANDLING
//! ==============
//! Server-provided messages win over the per-flow fallback. Transport
//! failures always read "Network error. Please try again.".

use serde_json::Value;

use crate::net::api::{AuthApi, TenantApi};
use crate::net::types::LoginRequest;
use crate::routes::Route;
use crate::services::onboarding::{FORM_INVALID_MESSAGE, FieldErrors, OnboardingForm};
use crate::state::notice::Notice;
use crate::state::store::{SessionKey, SessionStore};

pub const LOGIN_SUCCESS_MESSAGE: &str = "Login successful!";
pub const LOGIN_FAILED_MESSAGE: &str = "Login failed.";
pub const TOKEN_NOT_FOUND_MESSAGE: &str = "Authentication token not found.";
pub const ONBOARD_SUCCESS_MESSAGE: &str = "Tenant and initial user created successfully!";
pub const ONBOARD_FAILED_MESSAGE: &str = "Failed to onboard new tenant.";

/// Result of a flow that may navigate.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FlowOutcome {
    pub notice: Option<Notice>,
    pub redirect: Option<Route>,
}

impl FlowOutcome {
    #[must_use]
    pub fn is_error(&self) -> bool {
        self.notice.as_ref().is_some_and(Notice::is_error)
    }
}

/// Result of an onboarding submission.
#[derive(Clone, Debug, PartialEq)]
pub struct OnboardingOutcome {
    pub notice: Notice,
    /// Per-field messages when the form failed local validation.
    pub field_errors: Option<FieldErrors>,
    /// Tenant record returned by the backend on success.
    pub created: Option<Value>,
}

impl OnboardingOutcome {
    fn failed(notice: Notice) -> Self {
        Self { notice, field_errors: None, created: None }
    }

    #[must_use]
    pub fn is_success(&self) -> bool {
        self.created.is_some()
    }
}

// =============================================================================
// LOGIN / LOGOUT
// =============================================================================

/// Exchange credentials for a token pair and store both tokens.
///
/// The store is only written on success; a failed login leaves any previous
/// session in place.
pub async fn login<A, S>(api: &A, store: &S, tenant_id: &str, credentials: &LoginRequest) -> FlowOutcome
where
    A: AuthApi + ?Sized,
    S: SessionStore + ?Sized,
{
    match api.login(tenant_id, credentials).await {
        Ok(tokens) => {
            store.set(SessionKey::AccessToken, &tokens.access_token);
            store.set(SessionKey::RefreshToken, &tokens.refresh_token);
            tracing::info!(tenant_id, username = %credentials.username, "login succeeded");
            FlowOutcome {
                notice: Some(Notice::success(LOGIN_SUCCESS_MESSAGE)),
                redirect: Some(Route::Dashboard),
            }
        }
        Err(e) => {
            tracing::warn!(tenant_id, username = %credentials.username, error = %e, "login failed");
            FlowOutcome {
                notice: Some(Notice::error(e.user_message(LOGIN_FAILED_MESSAGE))),
                redirect: None,
            }
        }
    }
}

/// Forget both tokens and send the user to sign-in. Local only; the backend
/// is not told.
pub fn logout<S: SessionStore + ?Sized>(store: &S) -> FlowOutcome {
    for key in SessionKey::ALL {
        store.remove(key);
    }
    tracing::info!("logged out");
    FlowOutcome { notice: None, redirect: Some(Route::SignIn) }
}

// =============================================================================
// ONBOARDING
// =============================================================================

/// Validate `form` and, if it passes, submit it with the stored access token.
pub async fn submit_onboarding<A, S>(api: &A, store: &S, form: &OnboardingForm) -> OnboardingOutcome
where
    A: TenantApi + ?Sized,
    S: SessionStore + ?Sized,
{
    let request = match form.validate() {
        Ok(request) => request,
        Err(errors) => {
            tracing::debug!(failing = errors.len(), "onboarding form rejected locally");
            return OnboardingOutcome {
                notice: Notice::error(FORM_INVALID_MESSAGE),
                field_errors: Some(errors),
                created: None,
            };
        }
    };

    let Some(access_token) = store.get(SessionKey::AccessToken).filter(|t| !t.trim().is_empty()) else {
        return OnboardingOutcome::failed(Notice::error(TOKEN_NOT_FOUND_MESSAGE));
    };

    match api.onboard_tenant(&access_token, &request).await {
        Ok(created) => {
            tracing::info!(tenant_id = %request.tenant_id, "tenant onboarded");
            OnboardingOutcome {
                notice: Notice::success(ONBOARD_SUCCESS_MESSAGE),
                field_errors: None,
                created: Some(created),
            }
        }
        Err(e) => {
            tracing::warn!(tenant_id = %request.tenant_id, error = %e, "tenant onboarding failed");
            OnboardingOutcome::failed(Notice::error(e.user_message(ONBOARD_FAILED_MESSAGE)))
        }
    }
}

#[cfg(test)]
#[path = "session_test.rs"]
mod tests;

//! Access-token claim decoding and advisory role checks.
//!
//! SECURITY
//! ========
//! Tokens are decoded, never verified: the signature segment is ignored and
//! a successful decode only means "well-formed". Role checks here gate what
//! the console offers to show; the backend re-authorizes every call.

use std::collections::BTreeMap;

use jsonwebtoken::{Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::routes::Route;
use crate::state::notice::Notice;

pub const SUPER_ADMIN_ROLE: &str = "ROLE_SUPER_ADMIN";
pub const PERMISSION_DENIED_MESSAGE: &str = "You do not have permission to access this page.";

#[derive(Debug, thiserror::Error)]
pub enum ClaimsError {
    #[error("token is not three dot-separated segments")]
    Malformed,
    #[error("token did not decode: {0}")]
    Jwt(#[from] jsonwebtoken::errors::Error),
}

/// Decoded token payload.
///
/// Only `roles` is typed. Everything else is kept as raw JSON so an issuer
/// that writes a numeric `sub` or a fractional `iat` still yields its roles.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    /// Role identifiers in token order. `None` when the claim is absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub roles: Option<Vec<String>>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl Claims {
    /// Exact-string membership in the `roles` claim.
    #[must_use]
    pub fn has_role(&self, role: &str) -> bool {
        self.roles
            .as_deref()
            .is_some_and(|roles| roles.iter().any(|r| r == role))
    }

    /// `sub` rendered as text, whether the issuer wrote a string or a number.
    #[must_use]
    pub fn subject(&self) -> Option<String> {
        match self.extra.get("sub")? {
            Value::String(sub) => Some(sub.clone()),
            Value::Number(sub) => Some(sub.to_string()),
            _ => None,
        }
    }

    #[must_use]
    pub fn issued_at(&self) -> Option<i64> {
        self.timestamp("iat")
    }

    #[must_use]
    pub fn expires_at(&self) -> Option<i64> {
        self.timestamp("exp")
    }

    /// Whether `exp` lies at or before `now_secs`. Tokens without a numeric
    /// `exp` never expire locally.
    #[must_use]
    pub fn is_expired_at(&self, now_secs: i64) -> bool {
        self.expires_at().is_some_and(|exp| exp <= now_secs)
    }

    /// NumericDate claim in whole seconds; fractions are truncated.
    #[allow(clippy::cast_possible_truncation)]
    fn timestamp(&self, name: &str) -> Option<i64> {
        let value = self.extra.get(name)?;
        value.as_i64().or_else(|| value.as_f64().map(|secs| secs.trunc() as i64))
    }
}

/// Parse-only settings; the backend verifies tokens, this side never does.
fn parse_only() -> Validation {
    let mut validation = Validation::new(Algorithm::HS512);
    validation.insecure_disable_signature_validation();
    validation.validate_exp = false;
    validation.validate_nbf = false;
    validation.validate_aud = false;
    validation.required_spec_claims.clear();
    validation
}

/// Decode the payload of a JWT without verifying it.
///
/// # Errors
///
/// Returns [`ClaimsError::Malformed`] unless the token has three segments
/// with a non-empty payload, and [`ClaimsError::Jwt`] when the header or
/// payload is not base64url JSON or `roles` is not a list of strings.
pub fn decode(token: &str) -> Result<Claims, ClaimsError> {
    let token = token.trim();
    let segments = token.split('.').collect::<Vec<_>>();
    if segments.len() != 3 || segments[1].is_empty() {
        return Err(ClaimsError::Malformed);
    }

    // Some issuers pad segments; base64url as used in JWTs never does.
    let unpadded = segments.iter().map(|segment| segment.trim_end_matches('=')).collect::<Vec<_>>().join(".");
    let data = jsonwebtoken::decode::<Claims>(&unpadded, &DecodingKey::from_secret(&[]), &parse_only())?;
    Ok(data.claims)
}

/// True iff `token` is present, decodes, and lists `role` in its `roles` claim.
#[must_use]
pub fn has_role(token: Option<&str>, role: &str) -> bool {
    let Some(token) = token else {
        return false;
    };
    match decode(token) {
        Ok(claims) => claims.has_role(role),
        Err(e) => {
            tracing::debug!(error = %e, "access token did not decode; treating as no roles");
            false
        }
    }
}

/// Roles listed in `token`, or empty when absent or undecodable.
#[must_use]
pub fn roles(token: Option<&str>) -> Vec<String> {
    match token.map(decode) {
        Some(Ok(claims)) => claims.roles.unwrap_or_default(),
        _ => Vec::new(),
    }
}

// =============================================================================
// ADMIN GATE
// =============================================================================

/// Decision for entering the super-admin-only screens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdminGate {
    Allow,
    Redirect { to: Route, notice: Option<Notice> },
}

/// Decide whether the tenant onboarding screen may be shown for `token`.
///
/// No token or an undecodable token sends the user to sign-in; a decodable
/// token without [`SUPER_ADMIN_ROLE`] sends them to the dashboard with a
/// permission notice.
#[must_use]
pub fn admin_gate(token: Option<&str>) -> AdminGate {
    let Some(token) = token else {
        return AdminGate::Redirect { to: Route::SignIn, notice: None };
    };
    match decode(token) {
        Ok(claims) if claims.has_role(SUPER_ADMIN_ROLE) => AdminGate::Allow,
        Ok(_) => AdminGate::Redirect { to: Route::Dashboard, notice: Some(Notice::error(PERMISSION_DENIED_MESSAGE)) },
        Err(e) => {
            tracing::warn!(error = %e, "access token failed to decode at admin gate");
            AdminGate::Redirect { to: Route::SignIn, notice: None }
        }
    }
}

#[cfg(test)]
#[path = "claims_test.rs"]
mod tests;

//! Wire types shared by the HTTP client and its callers.
//!
//! Field names follow the backend's camelCase JSON.

use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const NETWORK_ERROR_MESSAGE: &str = "Network error. Please try again.";

// =============================================================================
// ERROR
// =============================================================================

/// Errors produced by backend API calls.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The request never produced a response (connect failure, timeout).
    #[error("API request failed: {0}")]
    Request(String),

    /// The backend answered with a non-success status.
    #[error("API response error: status {status}")]
    Status { status: u16, message: Option<String> },

    /// The response body could not be deserialized.
    #[error("API response parse failed: {0}")]
    Parse(String),

    /// The underlying HTTP client could not be constructed.
    #[error("HTTP client build failed: {0}")]
    HttpClientBuild(String),

    /// A stored credential cannot be sent as a header value.
    #[error("invalid credential: {0}")]
    InvalidCredential(&'static str),
}

impl ApiError {
    /// Message suitable for a transient notification.
    ///
    /// Prefers the server-provided message, then `fallback`. Transport
    /// failures always get the generic network message.
    #[must_use]
    pub fn user_message(&self, fallback: &str) -> String {
        match self {
            Self::Request(_) => NETWORK_ERROR_MESSAGE.to_owned(),
            Self::Status { message: Some(message), .. } => message.clone(),
            Self::Status { message: None, .. }
            | Self::Parse(_)
            | Self::HttpClientBuild(_)
            | Self::InvalidCredential(_) => fallback.to_owned(),
        }
    }

    /// True for 401/403 responses, i.e. the credential itself was refused.
    #[must_use]
    pub fn is_auth_rejection(&self) -> bool {
        matches!(self, Self::Status { status: 401 | 403, .. })
    }
}

/// Extract a human-readable message from an error response body.
///
/// Uses `message` when present, otherwise joins `errors[].defaultMessage`
/// (the bean-validation error shape) with `", "`.
#[must_use]
pub fn server_message(body: &Value) -> Option<String> {
    if let Some(message) = body.get("message").and_then(Value::as_str) {
        if !message.trim().is_empty() {
            return Some(message.to_owned());
        }
    }

    let joined = body
        .get("errors")
        .and_then(Value::as_array)?
        .iter()
        .filter_map(|err| err.get("defaultMessage").and_then(Value::as_str))
        .collect::<Vec<_>>()
        .join(", ");

    if joined.is_empty() { None } else { Some(joined) }
}

// =============================================================================
// AUTH
// =============================================================================

/// Body of `POST /auth/login`.
#[derive(Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

impl std::fmt::Debug for LoginRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoginRequest")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Token pair returned by a successful login.
#[derive(Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

impl std::fmt::Debug for TokenPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("TokenPair { .. }")
    }
}

/// Body of `POST /auth/refresh`.
#[derive(Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RefreshRequest {
    pub refresh_token: String,
}

/// Successful `POST /auth/refresh` response.
#[derive(Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RefreshResponse {
    pub access_token: String,
}

#[cfg(test)]
#[path = "types_test.rs"]
mod tests;

//! Backend API access.
//!
//! DESIGN
//! ======
//! Callers depend on the [`AuthApi`] and [`TenantApi`] traits so the session
//! guard and flows can be exercised against in-memory mocks. [`HttpApi`] is
//! the reqwest-backed implementation used by the CLI.
//!
//! ERROR HANDLING
//! ==============
//! Every method returns `Result<_, ApiError>`. Transport failures, non-2xx
//! statuses, and undecodable bodies are distinct variants so callers can pick
//! the right notification text; none of them panic.

use std::sync::Arc;

use reqwest::StatusCode;
use reqwest::header::{AUTHORIZATION, HeaderValue};
use serde::de::DeserializeOwned;
use serde_json::Value;

use super::types::{ApiError, LoginRequest, RefreshRequest, RefreshResponse, TokenPair, server_message};
use crate::config::{ConsoleConfig, HttpTimeouts};
use crate::services::onboarding::OnboardingRequest;

pub const LOGIN_PATH: &str = "/auth/login";
pub const VALIDATE_PATH: &str = "/auth/validate";
pub const REFRESH_PATH: &str = "/auth/refresh";
pub const ONBOARD_TENANT_PATH: &str = "/api/onboard-tenant";
pub const TENANT_HEADER: &str = "X-Tenant-ID";

// =============================================================================
// TRAITS
// =============================================================================

/// Authentication endpoints consumed by the session lifecycle.
#[async_trait::async_trait]
pub trait AuthApi: Send + Sync {
    /// `POST /auth/login` with the tenant header. Returns both tokens.
    async fn login(&self, tenant_id: &str, request: &LoginRequest) -> Result<TokenPair, ApiError>;

    /// `GET /auth/validate` with the access token as bearer credential.
    /// `Ok(())` means the backend accepted the token; the body is ignored.
    async fn validate(&self, access_token: &str) -> Result<(), ApiError>;

    /// `POST /auth/refresh`. Returns the new access token.
    async fn refresh(&self, refresh_token: &str) -> Result<String, ApiError>;
}

/// Tenant administration endpoints.
#[async_trait::async_trait]
pub trait TenantApi: Send + Sync {
    /// `POST /api/onboard-tenant`. Returns the created tenant record as-is.
    async fn onboard_tenant(&self, access_token: &str, request: &OnboardingRequest) -> Result<Value, ApiError>;
}

#[async_trait::async_trait]
impl<T: AuthApi + ?Sized> AuthApi for Arc<T> {
    async fn login(&self, tenant_id: &str, request: &LoginRequest) -> Result<TokenPair, ApiError> {
        (**self).login(tenant_id, request).await
    }

    async fn validate(&self, access_token: &str) -> Result<(), ApiError> {
        (**self).validate(access_token).await
    }

    async fn refresh(&self, refresh_token: &str) -> Result<String, ApiError> {
        (**self).refresh(refresh_token).await
    }
}

#[async_trait::async_trait]
impl<T: TenantApi + ?Sized> TenantApi for Arc<T> {
    async fn onboard_tenant(&self, access_token: &str, request: &OnboardingRequest) -> Result<Value, ApiError> {
        (**self).onboard_tenant(access_token, request).await
    }
}

// =============================================================================
// HTTP CLIENT
// =============================================================================

/// reqwest-backed client for the console backend.
#[derive(Debug, Clone)]
pub struct HttpApi {
    http: reqwest::Client,
    base_url: String,
}

impl HttpApi {
    /// Build a client for `base_url` with the given timeouts.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::HttpClientBuild`] if the TLS backend or client
    /// configuration cannot be initialized.
    pub fn new(base_url: &str, timeouts: HttpTimeouts) -> Result<Self, ApiError> {
        let http = reqwest::Client::builder()
            .timeout(timeouts.request())
            .connect_timeout(timeouts.connect())
            .build()
            .map_err(|e| ApiError::HttpClientBuild(e.to_string()))?;
        Ok(Self { http, base_url: base_url.trim_end_matches('/').to_owned() })
    }

    /// Build a client from a parsed typed config.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client fails to build.
    pub fn from_config(config: &ConsoleConfig) -> Result<Self, ApiError> {
        Self::new(&config.api_base_url, config.timeouts)
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

fn bearer(token: &str) -> Result<HeaderValue, ApiError> {
    HeaderValue::from_str(&format!("Bearer {token}"))
        .map_err(|_| ApiError::InvalidCredential("bearer token contains characters not allowed in a header"))
}

async fn send(request: reqwest::RequestBuilder) -> Result<reqwest::Response, ApiError> {
    request.send().await.map_err(|e| ApiError::Request(e.to_string()))
}

/// Turn a non-2xx response into [`ApiError::Status`], keeping any message the
/// server put in the body.
async fn reject(resp: reqwest::Response) -> ApiError {
    let status = resp.status();
    let body = resp.text().await.unwrap_or_default();
    let message = match serde_json::from_str::<Value>(&body) {
        Ok(value) => server_message(&value),
        Err(_) => None,
    };
    ApiError::Status { status: status.as_u16(), message }
}

async fn decode<T: DeserializeOwned>(resp: reqwest::Response) -> Result<T, ApiError> {
    if !resp.status().is_success() {
        return Err(reject(resp).await);
    }
    resp.json::<T>()
        .await
        .map_err(|e| ApiError::Parse(e.to_string()))
}

#[async_trait::async_trait]
impl AuthApi for HttpApi {
    async fn login(&self, tenant_id: &str, request: &LoginRequest) -> Result<TokenPair, ApiError> {
        let resp = send(
            self.http
                .post(self.url(LOGIN_PATH))
                .header(TENANT_HEADER, tenant_id)
                .json(request),
        )
        .await?;
        decode::<TokenPair>(resp).await
    }

    async fn validate(&self, access_token: &str) -> Result<(), ApiError> {
        let resp = send(
            self.http
                .get(self.url(VALIDATE_PATH))
                .header(AUTHORIZATION, bearer(access_token)?),
        )
        .await?;
        if resp.status().is_success() {
            return Ok(());
        }
        Err(reject(resp).await)
    }

    async fn refresh(&self, refresh_token: &str) -> Result<String, ApiError> {
        let body = RefreshRequest { refresh_token: refresh_token.to_owned() };
        let resp = send(self.http.post(self.url(REFRESH_PATH)).json(&body)).await?;
        let refreshed = decode::<RefreshResponse>(resp).await?;
        Ok(refreshed.access_token)
    }
}

#[async_trait::async_trait]
impl TenantApi for HttpApi {
    async fn onboard_tenant(&self, access_token: &str, request: &OnboardingRequest) -> Result<Value, ApiError> {
        let resp = send(
            self.http
                .post(self.url(ONBOARD_TENANT_PATH))
                .header(AUTHORIZATION, bearer(access_token)?)
                .json(request),
        )
        .await?;

        // 204 carries no body to decode.
        if resp.status() == StatusCode::NO_CONTENT {
            return Ok(Value::Null);
        }
        decode::<Value>(resp).await
    }
}

#[cfg(test)]
#[path = "api_test.rs"]
mod tests;

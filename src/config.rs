//! Console configuration parsed from environment variables.

use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_API_BASE_URL: &str = "http://localhost:8080";
pub const DEFAULT_TENANT_ID: &str = "dev-tenant";
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;

const SESSION_DIR_NAME: &str = "tenant-console";
const SESSION_FILE_NAME: &str = "session.json";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HttpTimeouts {
    pub request_secs: u64,
    pub connect_secs: u64,
}

impl HttpTimeouts {
    #[must_use]
    pub fn request(&self) -> Duration {
        Duration::from_secs(self.request_secs)
    }

    #[must_use]
    pub fn connect(&self) -> Duration {
        Duration::from_secs(self.connect_secs)
    }
}

impl Default for HttpTimeouts {
    fn default() -> Self {
        Self { request_secs: DEFAULT_REQUEST_TIMEOUT_SECS, connect_secs: DEFAULT_CONNECT_TIMEOUT_SECS }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsoleConfig {
    pub api_base_url: String,
    pub tenant_id: String,
    pub session_file: PathBuf,
    pub timeouts: HttpTimeouts,
    pub clear_on_unauthenticated: bool,
}

impl ConsoleConfig {
    /// Build typed console config from environment variables.
    ///
    /// All optional:
    /// - `CONSOLE_API_BASE_URL`: default `http://localhost:8080`
    /// - `CONSOLE_TENANT_ID`: sent as `X-Tenant-ID` on login, default `dev-tenant`
    /// - `CONSOLE_SESSION_FILE`: default `<config dir>/tenant-console/session.json`
    /// - `CONSOLE_REQUEST_TIMEOUT_SECS`: default 30
    /// - `CONSOLE_CONNECT_TIMEOUT_SECS`: default 10
    /// - `CONSOLE_CLEAR_ON_UNAUTHENTICATED`: default true
    #[must_use]
    pub fn from_env() -> Self {
        let api_base_url = normalize_base_url(&env_string("CONSOLE_API_BASE_URL").unwrap_or_else(|| DEFAULT_API_BASE_URL.to_owned()));
        let tenant_id = env_string("CONSOLE_TENANT_ID").unwrap_or_else(|| DEFAULT_TENANT_ID.to_owned());
        let session_file = env_string("CONSOLE_SESSION_FILE").map_or_else(default_session_file, PathBuf::from);
        let timeouts = HttpTimeouts {
            request_secs: env_parse_u64("CONSOLE_REQUEST_TIMEOUT_SECS", DEFAULT_REQUEST_TIMEOUT_SECS),
            connect_secs: env_parse_u64("CONSOLE_CONNECT_TIMEOUT_SECS", DEFAULT_CONNECT_TIMEOUT_SECS),
        };
        let clear_on_unauthenticated = env_bool("CONSOLE_CLEAR_ON_UNAUTHENTICATED").unwrap_or(true);

        Self { api_base_url, tenant_id, session_file, timeouts, clear_on_unauthenticated }
    }
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_owned(),
            tenant_id: DEFAULT_TENANT_ID.to_owned(),
            session_file: default_session_file(),
            timeouts: HttpTimeouts::default(),
            clear_on_unauthenticated: true,
        }
    }
}

/// Strip trailing slashes so paths can be appended with `format!`.
#[must_use]
pub fn normalize_base_url(raw: &str) -> String {
    raw.trim().trim_end_matches('/').to_owned()
}

/// Per-user session file location, falling back to the working directory
/// when the platform has no config dir.
#[must_use]
pub fn default_session_file() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(SESSION_DIR_NAME)
        .join(SESSION_FILE_NAME)
}

fn env_string(key: &str) -> Option<String> {
    match std::env::var(key) {
        Ok(value) if !value.trim().is_empty() => Some(value),
        _ => None,
    }
}

fn env_parse_u64(key: &str, default: u64) -> u64 {
    match env_string(key) {
        Some(raw) => raw.trim().parse::<u64>().unwrap_or(default),
        None => default,
    }
}

pub(crate) fn env_bool(key: &str) -> Option<bool> {
    env_string(key).and_then(|raw| parse_bool(&raw))
}

pub(crate) fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;

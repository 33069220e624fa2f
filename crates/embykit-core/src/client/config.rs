use crate::error::SyncError;
use serde::{Deserialize, Serialize};

pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:5257";

/// Connection settings for the backend, persisted by the application.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Backend origin; API paths are appended under `/api`.
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Per-request timeout applied by the HTTP transport.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    /// Background task status polling interval.
    #[serde(default = "default_status_poll_interval_ms")]
    pub status_poll_interval_ms: u64,
    /// Route path unauthenticated navigation is redirected to.
    #[serde(default = "default_login_route")]
    pub login_route: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            request_timeout_secs: default_request_timeout_secs(),
            status_poll_interval_ms: default_status_poll_interval_ms(),
            login_route: default_login_route(),
        }
    }
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_request_timeout_secs() -> u64 {
    15
}

fn default_status_poll_interval_ms() -> u64 {
    2000
}

fn default_login_route() -> String {
    "/login".to_string()
}

impl ClientConfig {
    /// Base URL without trailing slashes, validated.
    pub fn normalized_base_url(&self) -> Result<String, SyncError> {
        normalize_base_url(&self.base_url)
    }
}

pub fn normalize_base_url(raw: &str) -> Result<String, SyncError> {
    let trimmed = raw.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        return Err(SyncError::validation("base url must not be empty"));
    }
    let Some((scheme, remainder)) = trimmed.split_once("://") else {
        return Err(SyncError::validation(format!("base url '{}' has no scheme", trimmed)));
    };
    if scheme != "http" && scheme != "https" {
        return Err(SyncError::validation(format!(
            "base url '{}' must use http:// or https://",
            trimmed
        )));
    }
    if remainder.trim().is_empty() || remainder.starts_with('/') {
        return Err(SyncError::validation(format!("base url '{}' has no host", trimmed)));
    }
    Ok(trimmed.to_string())
}

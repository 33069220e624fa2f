use crate::api::{
    AboutInfo, AuthStatusResponse, ChangePasswordRequest, ErrorBody, LoginRequest, LoginResponse,
    TaskStatus,
};
use crate::client::backend::Backend;
use crate::client::config::ClientConfig;
use crate::error::{SyncError, SyncResult};

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::time::Duration;

/// reqwest-backed [`Backend`].
///
/// Keeps a cookie store so the session established by `login` is sent on
/// every later request.
pub struct HttpBackend {
    client: reqwest::Client,
    base_url: String,
}

impl HttpBackend {
    pub fn new(config: &ClientConfig) -> SyncResult<Self> {
        let base_url = config.normalized_base_url()?;
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs.max(1)))
            .cookie_store(true)
            .user_agent(format!("embykit/{}", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| SyncError::transport(format!("failed to build HTTP client: {}", e)))?;
        Ok(Self { client, base_url })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/api{}", self.base_url, path)
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> SyncResult<T> {
        let resp = self
            .client
            .get(self.url(path))
            .send()
            .await
            .map_err(|e| request_error(path, e))?;
        let resp = check_status(resp).await?;
        resp.json::<T>()
            .await
            .map_err(|e| SyncError::transport(format!("invalid response from {}: {}", path, e)))
    }

    async fn post_json<B: serde::Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> SyncResult<reqwest::Response> {
        let resp = self
            .client
            .post(self.url(path))
            .json(body)
            .send()
            .await
            .map_err(|e| request_error(path, e))?;
        check_status(resp).await
    }
}

fn request_error(path: &str, err: reqwest::Error) -> SyncError {
    if err.is_timeout() {
        SyncError::transport(format!("request to {} timed out", path))
    } else {
        SyncError::transport(format!("request to {} failed: {}", path, err))
    }
}

/// Map non-2xx replies: a structured `{"error": ...}` body is a logical
/// failure, anything else is a transport failure.
async fn check_status(resp: reqwest::Response) -> SyncResult<reqwest::Response> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().await.unwrap_or_default();
    match serde_json::from_str::<ErrorBody>(&body) {
        Ok(err) => Err(SyncError::logical(err.error)),
        Err(_) => Err(SyncError::transport(format!("HTTP {}", status))),
    }
}

/// A 2xx reply may still carry `{"error": ...}`.
async fn reject_error_body(resp: reqwest::Response) -> SyncResult<()> {
    let body = resp.text().await.unwrap_or_default();
    if let Ok(err) = serde_json::from_str::<ErrorBody>(&body) {
        return Err(SyncError::logical(err.error));
    }
    Ok(())
}

#[async_trait]
impl Backend for HttpBackend {
    async fn get_config(&self) -> SyncResult<Map<String, Value>> {
        match self.get_json::<Value>("/config").await? {
            Value::Object(map) => Ok(map),
            other => Err(SyncError::logical(format!(
                "settings response is not an object: {}",
                other
            ))),
        }
    }

    async fn save_config(&self, payload: &Map<String, Value>) -> SyncResult<()> {
        let resp = self.post_json("/config", payload).await?;
        reject_error_body(resp).await
    }

    async fn auth_status(&self) -> SyncResult<AuthStatusResponse> {
        self.get_json("/auth/status").await
    }

    async fn login(&self, request: &LoginRequest) -> SyncResult<LoginResponse> {
        let resp = self.post_json("/auth/login", request).await?;
        // An unexpected body is handed to the store as an empty response; it
        // decides whether that counts as a login.
        let body = resp.text().await.unwrap_or_default();
        Ok(serde_json::from_str::<LoginResponse>(&body).unwrap_or_default())
    }

    async fn logout(&self) -> SyncResult<()> {
        self.post_json("/auth/logout", &serde_json::json!({}))
            .await
            .map(|_| ())
    }

    async fn change_password(&self, request: &ChangePasswordRequest) -> SyncResult<()> {
        let resp = self.post_json("/auth/change_password", request).await?;
        reject_error_body(resp).await
    }

    async fn task_status(&self) -> SyncResult<TaskStatus> {
        self.get_json("/status").await
    }

    async fn about_info(&self) -> SyncResult<AboutInfo> {
        self.get_json("/system/about_info").await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn urls_live_under_api_prefix() {
        let config = ClientConfig {
            base_url: "http://nas.local:5257/".to_string(),
            ..ClientConfig::default()
        };
        let backend = HttpBackend::new(&config).unwrap();
        assert_eq!(backend.base_url(), "http://nas.local:5257");
        assert_eq!(backend.url("/auth/status"), "http://nas.local:5257/api/auth/status");
    }

    #[test]
    fn invalid_base_url_is_rejected() {
        let config = ClientConfig {
            base_url: "nas.local".to_string(),
            ..ClientConfig::default()
        };
        assert!(matches!(HttpBackend::new(&config), Err(SyncError::Validation(_))));
    }
}

//! Local client configuration: where the backend lives and how to talk to it.
//!
//! Stored as JSON in the user's config directory. A damaged file never stops
//! the client from starting; readable fields are kept, the rest defaulted.

use embykit_core::client::{ClientConfig, normalize_base_url};

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

/// Overrides `base_url` from the file when set.
pub const BASE_URL_ENV: &str = "EMBYKIT_BASE_URL";

pub fn get_config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("embykit")
}

pub fn get_client_config_path() -> PathBuf {
    get_config_dir().join("client.json")
}

/// Load the client configuration from the default location, then apply the
/// environment override.
pub fn load_client_config() -> ClientConfig {
    let mut config = load_client_config_from(&get_client_config_path());
    apply_base_url_override(&mut config, std::env::var(BASE_URL_ENV).ok());
    config
}

pub fn load_client_config_from(path: &Path) -> ClientConfig {
    if !path.exists() {
        log::info!("Client config not found at {}, using defaults", path.display());
        return ClientConfig::default();
    }

    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) => {
            log::error!("Failed to read client config {}: {}", path.display(), e);
            return ClientConfig::default();
        }
    };

    match serde_json::from_str::<ClientConfig>(&content) {
        Ok(config) => return config,
        Err(e) => {
            log::warn!("Failed to parse client config directly: {}, attempting partial recovery", e);
        }
    }

    match recover_client_config_from_json(&content) {
        Ok(config) => {
            log::info!("Recovered client config from {}", path.display());
            config
        }
        Err(e) => {
            log::error!("Client config recovery failed: {:#}, using defaults", e);
            ClientConfig::default()
        }
    }
}

fn recover_client_config_from_json(content: &str) -> Result<ClientConfig> {
    let value: serde_json::Value =
        serde_json::from_str(content).context("Client config is not valid JSON")?;
    let obj = value
        .as_object()
        .context("Client config root is not a JSON object")?;

    let mut config = ClientConfig::default();

    if let Some(v) = obj.get("base_url").and_then(|v| v.as_str()) {
        config.base_url = v.to_string();
    } else if obj.contains_key("base_url") {
        log::warn!("Could not parse base_url, using default");
    }

    if let Some(v) = obj.get("request_timeout_secs").and_then(|v| v.as_u64()) {
        config.request_timeout_secs = v;
    }

    if let Some(v) = obj.get("status_poll_interval_ms").and_then(|v| v.as_u64()) {
        config.status_poll_interval_ms = v;
    }

    if let Some(v) = obj.get("login_route").and_then(|v| v.as_str()) {
        if v.starts_with('/') {
            config.login_route = v.to_string();
        } else {
            log::warn!("Ignoring login_route '{}' (must start with '/')", v);
        }
    }

    Ok(config)
}

fn apply_base_url_override(config: &mut ClientConfig, value: Option<String>) {
    let Some(raw) = value.filter(|v| !v.trim().is_empty()) else {
        return;
    };
    match normalize_base_url(&raw) {
        Ok(url) => {
            log::info!("Using backend {} from {}", url, BASE_URL_ENV);
            config.base_url = url;
        }
        Err(e) => log::warn!("Ignoring {}: {}", BASE_URL_ENV, e),
    }
}

pub fn save_client_config(config: &ClientConfig) -> Result<()> {
    save_client_config_to(&get_client_config_path(), config)
}

pub fn save_client_config_to(path: &Path, config: &ClientConfig) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    let content = serde_json::to_string_pretty(config)?;
    std::fs::write(path, content).with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = load_client_config_from(&dir.path().join("client.json"));
        assert_eq!(config, ClientConfig::default());
    }

    #[test]
    fn save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("client.json");
        let config = ClientConfig {
            base_url: "https://nas.example:5257".to_string(),
            status_poll_interval_ms: 5000,
            ..ClientConfig::default()
        };
        save_client_config_to(&path, &config).unwrap();
        assert_eq!(load_client_config_from(&path), config);
    }

    #[test]
    fn partial_recovery_keeps_valid_fields() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("client.json");
        std::fs::write(
            &path,
            r#"{"base_url": "http://media:5257", "request_timeout_secs": "fast", "login_route": "login"}"#,
        )
        .unwrap();

        let config = load_client_config_from(&path);
        assert_eq!(config.base_url, "http://media:5257");
        assert_eq!(config.request_timeout_secs, ClientConfig::default().request_timeout_secs);
        assert_eq!(config.login_route, "/login");
    }

    #[test]
    fn garbage_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("client.json");
        std::fs::write(&path, "not json at all").unwrap();
        assert_eq!(load_client_config_from(&path), ClientConfig::default());
    }

    #[test]
    fn env_override_is_validated() {
        let mut config = ClientConfig::default();
        apply_base_url_override(&mut config, Some("ftp://nope".to_string()));
        assert_eq!(config.base_url, ClientConfig::default().base_url);

        apply_base_url_override(&mut config, Some("http://10.0.0.5:5257/".to_string()));
        assert_eq!(config.base_url, "http://10.0.0.5:5257");

        apply_base_url_override(&mut config, Some("   ".to_string()));
        assert_eq!(config.base_url, "http://10.0.0.5:5257");
    }
}

use crate::api::{AboutInfo, ReleaseInfo};
use crate::client::Backend;
use crate::error::SyncError;
use crate::resource::RemoteResource;

use semver::Version;
use std::sync::Arc;

/// Version and release notes of the backend.
pub struct AboutStore {
    backend: Arc<dyn Backend>,
    resource: RemoteResource<AboutInfo>,
}

impl AboutStore {
    pub fn new(backend: Arc<dyn Backend>) -> Self {
        Self {
            backend,
            resource: RemoteResource::new("about info"),
        }
    }

    /// Load once per session. Failures are stored in `error()`.
    pub async fn fetch(&self) -> bool {
        let backend = Arc::clone(&self.backend);
        self.resource
            .load(false, move || async move { backend.about_info().await })
            .await
            .inspect_err(|err| log::warn!("about info unavailable: {}", err))
            .is_ok()
    }

    pub fn info(&self) -> Option<AboutInfo> {
        self.resource.value()
    }

    pub fn is_loading(&self) -> bool {
        self.resource.is_loading()
    }

    pub fn error(&self) -> Option<SyncError> {
        self.resource.last_error()
    }

    pub fn current_version(&self) -> Option<String> {
        self.info()
            .map(|info| info.current_version)
            .filter(|v| !v.trim().is_empty())
    }

    pub fn latest_release(&self) -> Option<ReleaseInfo> {
        self.info().and_then(|info| info.releases.into_iter().next())
    }

    pub fn latest_version(&self) -> Option<String> {
        self.latest_release().map(|release| release.version)
    }

    pub fn is_update_available(&self) -> bool {
        match (self.current_version(), self.latest_version()) {
            (Some(current), Some(latest)) => is_newer_release(&current, &latest),
            _ => false,
        }
    }
}

fn normalize_version(raw: &str) -> &str {
    let trimmed = raw.trim();
    trimmed
        .strip_prefix('v')
        .or_else(|| trimmed.strip_prefix('V'))
        .unwrap_or(trimmed)
}

/// Whether `latest` should be offered as an update over `current`.
///
/// Semver comparison when both parse; otherwise any difference counts.
pub fn is_newer_release(current: &str, latest: &str) -> bool {
    let current = normalize_version(current);
    let latest = normalize_version(latest);
    if current.is_empty() || latest.is_empty() {
        return false;
    }
    match (Version::parse(current), Version::parse(latest)) {
        (Ok(current), Ok(latest)) => latest > current,
        _ => current != latest,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::mock::MockBackend;

    fn release(version: &str) -> ReleaseInfo {
        ReleaseInfo {
            version: version.to_string(),
            ..ReleaseInfo::default()
        }
    }

    #[test]
    fn newer_release_detection() {
        assert!(is_newer_release("v1.2.3", "v1.3.0"));
        assert!(is_newer_release("1.2.3", "V1.2.4"));
        assert!(!is_newer_release("v2.0.0", "v1.9.9"));
        assert!(!is_newer_release("v1.2.3", "1.2.3"));
        assert!(!is_newer_release("1.0.0", "1.0.0-beta.1"));
    }

    #[test]
    fn non_semver_versions_compare_by_text() {
        assert!(is_newer_release("2.3", "2.4"));
        assert!(!is_newer_release("v2.3", "2.3"));
        assert!(!is_newer_release("", "1.0.0"));
    }

    #[tokio::test]
    async fn fetch_exposes_latest_release() {
        let backend = Arc::new(MockBackend::new());
        backend.push_about(Ok(AboutInfo {
            current_version: "v1.0.0".to_string(),
            releases: vec![release("v1.1.0"), release("v1.0.0")],
        }));
        let store = AboutStore::new(Arc::clone(&backend) as Arc<dyn Backend>);

        assert!(store.fetch().await);
        assert!(store.fetch().await);
        assert_eq!(backend.calls("about_info"), 1);
        assert_eq!(store.latest_version().as_deref(), Some("v1.1.0"));
        assert!(store.is_update_available());
    }

    #[tokio::test]
    async fn failure_is_recorded_not_raised() {
        let backend = Arc::new(MockBackend::new());
        backend.push_about(Err(SyncError::logical("GitHub rate limited")));
        let store = AboutStore::new(Arc::clone(&backend) as Arc<dyn Backend>);

        assert!(!store.fetch().await);
        assert_eq!(store.error(), Some(SyncError::logical("GitHub rate limited")));
        assert!(!store.is_update_available());
    }
}

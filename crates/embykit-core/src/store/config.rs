use crate::client::Backend;
use crate::error::SyncError;
use crate::resource::RemoteResource;
use crate::settings::{ConfigSnapshot, SettingValue};

use parking_lot::Mutex;
use serde_json::{Map, Value};
use std::sync::Arc;
use tokio::sync::watch;

/// What consumers observe of the settings store.
#[derive(Clone, Debug, PartialEq)]
pub struct ConfigView {
    pub snapshot: ConfigSnapshot,
    pub loading: bool,
    pub saving: bool,
    pub error: Option<SyncError>,
}

struct ConfigInner {
    /// Working copy: server data merged over defaults, plus local edits.
    snapshot: ConfigSnapshot,
    /// Server data merged over defaults, without local edits.
    server: ConfigSnapshot,
    loading: bool,
    saving: bool,
    error: Option<SyncError>,
}

impl ConfigInner {
    fn view(&self) -> ConfigView {
        ConfigView {
            snapshot: self.snapshot.clone(),
            loading: self.loading,
            saving: self.saving,
            error: self.error.clone(),
        }
    }
}

/// Process-wide mirror of the backend settings.
///
/// `fetch` and `save` never return errors; the outcome is the returned bool
/// and the observable error slot.
pub struct ConfigStore {
    backend: Arc<dyn Backend>,
    resource: RemoteResource<ConfigSnapshot>,
    inner: Arc<Mutex<ConfigInner>>,
    view_tx: Arc<watch::Sender<ConfigView>>,
}

impl ConfigStore {
    pub fn new(backend: Arc<dyn Backend>) -> Self {
        let inner = ConfigInner {
            snapshot: ConfigSnapshot::default(),
            server: ConfigSnapshot::default(),
            loading: false,
            saving: false,
            error: None,
        };
        let (view_tx, _) = watch::channel(inner.view());
        Self {
            backend,
            resource: RemoteResource::new("settings"),
            inner: Arc::new(Mutex::new(inner)),
            view_tx: Arc::new(view_tx),
        }
    }

    // ── Reads ───────────────────────────────────────────────────────────

    pub fn snapshot(&self) -> ConfigSnapshot {
        self.inner.lock().snapshot.clone()
    }

    /// Last state confirmed by the server (fetched or saved), excluding
    /// unsaved local edits.
    pub fn persisted(&self) -> Option<ConfigSnapshot> {
        self.resource.value()
    }

    pub fn view(&self) -> ConfigView {
        self.inner.lock().view()
    }

    pub fn subscribe(&self) -> watch::Receiver<ConfigView> {
        self.view_tx.subscribe()
    }

    pub fn is_loading(&self) -> bool {
        self.resource.is_loading()
    }

    pub fn is_saving(&self) -> bool {
        self.inner.lock().saving
    }

    pub fn has_loaded_once(&self) -> bool {
        self.resource.has_loaded_once()
    }

    pub fn error(&self) -> Option<SyncError> {
        self.inner.lock().error.clone()
    }

    // ── Local edits ─────────────────────────────────────────────────────

    pub fn set_value(&self, name: &str, value: SettingValue) -> Result<(), SyncError> {
        let result = self.inner.lock().snapshot.set(name, value);
        if result.is_ok() {
            self.publish();
        }
        result
    }

    pub fn set_engines(&self, engines: Vec<String>) {
        self.inner.lock().snapshot.set_engines(engines);
        self.publish();
    }

    pub fn set_engines_text(&self, text: impl Into<String>) {
        self.inner.lock().snapshot.set_engines_text(text);
        self.publish();
    }

    // ── Remote operations ───────────────────────────────────────────────

    /// Load settings once per session; later calls reuse the result.
    pub async fn fetch(&self) -> bool {
        self.load(false).await
    }

    /// Reload settings even if they were already loaded.
    pub async fn refresh(&self) -> bool {
        self.load(true).await
    }

    /// Make the next `fetch` go to the server; the current snapshot stays.
    pub fn invalidate(&self) {
        self.resource.invalidate();
    }

    async fn load(&self, force: bool) -> bool {
        let backend = Arc::clone(&self.backend);
        let inner = Arc::clone(&self.inner);
        let view_tx = Arc::clone(&self.view_tx);

        let result = self
            .resource
            .load(force, move || async move {
                {
                    let mut guard = inner.lock();
                    guard.loading = true;
                    guard.error = None;
                    view_tx.send_replace(guard.view());
                }

                let fetched = backend.get_config().await;

                let mut guard = inner.lock();
                guard.loading = false;
                let outcome = match fetched {
                    Ok(map) => {
                        let report = guard.snapshot.merge_json(&map);
                        for warning in &report.warnings {
                            log::warn!("settings: {}", warning);
                        }
                        log::info!("settings: merged {} fields from server", report.applied);
                        guard.error = report.first_warning().cloned();
                        guard.server.merge_json(&map);
                        Ok(guard.server.clone())
                    }
                    Err(err) => {
                        log::warn!("settings: fetch failed: {}", err);
                        guard.error = Some(err.clone());
                        Err(err)
                    }
                };
                view_tx.send_replace(guard.view());
                outcome
            })
            .await;

        result.is_ok()
    }

    /// Persist settings.
    ///
    /// `edits` is overlaid on the current snapshot before sending; without it
    /// the current snapshot is sent as is. An edit that cannot be coerced to
    /// its field's kind aborts the save before anything is sent, with the
    /// validation error in the error slot. On success the saved payload is
    /// merged back so memory reflects exactly what the server stored.
    pub async fn save(&self, edits: Option<&Map<String, Value>>) -> bool {
        let payload = {
            let mut guard = self.inner.lock();
            guard.error = None;
            let mut draft = guard.snapshot.clone();
            if let Some(edits) = edits {
                let report = draft.apply_edits(edits);
                if let Some(warning) = report.first_warning() {
                    for warning in &report.warnings {
                        log::warn!("settings: {}", warning);
                    }
                    log::warn!("settings: save rejected, {} invalid edit(s)", report.warnings.len());
                    guard.error = Some(warning.clone());
                    None
                } else {
                    Some(draft.to_json())
                }
            } else {
                Some(draft.to_json())
            }
        };
        let Some(payload) = payload else {
            self.publish();
            return false;
        };
        self.inner.lock().saving = true;
        self.publish();

        let result = self.backend.save_config(&payload).await;

        let saved = {
            let mut guard = self.inner.lock();
            guard.saving = false;
            match result {
                Ok(()) => {
                    guard.snapshot.merge_json(&payload);
                    guard.server.merge_json(&payload);
                    self.resource.replace_value(guard.server.clone());
                    log::info!("settings: saved");
                    true
                }
                Err(err) => {
                    log::warn!("settings: save failed: {}", err);
                    guard.error = Some(err);
                    false
                }
            }
        };
        self.publish();
        saved
    }

    /// Persist a complete snapshot, e.g. one edited in a form.
    pub async fn save_snapshot(&self, snapshot: &ConfigSnapshot) -> bool {
        self.save(Some(&snapshot.to_json())).await
    }

    fn publish(&self) {
        let view = self.inner.lock().view();
        self.view_tx.send_replace(view);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::mock::MockBackend;
    use crate::settings::schema::ENGINES_FIELD;
    use serde_json::json;

    fn obj(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected an object"),
        }
    }

    fn store_with(backend: &Arc<MockBackend>) -> ConfigStore {
        ConfigStore::new(Arc::clone(backend) as Arc<dyn Backend>)
    }

    #[tokio::test]
    async fn concurrent_fetches_hit_the_backend_once() {
        let backend = Arc::new(MockBackend::new());
        backend.push_config(Ok(obj(json!({"emby_server_url": "http://emby:8096"}))));
        let store = store_with(&backend);

        let results = futures::future::join_all((0..6).map(|_| store.fetch())).await;

        assert!(results.into_iter().all(|ok| ok));
        assert_eq!(backend.calls("get_config"), 1);
        assert_eq!(store.snapshot().text("emby_server_url"), Some("http://emby:8096"));
        assert!(store.fetch().await);
        assert_eq!(backend.calls("get_config"), 1);
    }

    #[tokio::test]
    async fn failed_fetch_is_reported_and_retried() {
        let backend = Arc::new(MockBackend::new());
        backend
            .push_config(Err(SyncError::transport("connection refused")))
            .push_config(Ok(obj(json!({"proxy_port": 9000}))));
        let store = store_with(&backend);

        assert!(!store.fetch().await);
        assert_eq!(store.error(), Some(SyncError::transport("connection refused")));
        assert!(!store.has_loaded_once());
        assert!(!store.is_loading());

        assert!(store.fetch().await);
        assert_eq!(store.error(), None);
        assert_eq!(store.snapshot().number("proxy_port"), Some(9000.0));
        assert_eq!(backend.calls("get_config"), 2);
    }

    #[tokio::test]
    async fn fetch_merges_over_existing_values() {
        let backend = Arc::new(MockBackend::new());
        backend
            .push_config(Ok(obj(json!({"a": 1, "b": 2}))))
            .push_config(Ok(obj(json!({"a": 9}))));
        let store = store_with(&backend);

        assert!(store.fetch().await);
        assert!(store.refresh().await);
        let snapshot = store.snapshot();
        assert_eq!(snapshot.get("a"), Some(SettingValue::Number(9.0)));
        assert_eq!(snapshot.get("b"), Some(SettingValue::Number(2.0)));
    }

    #[tokio::test]
    async fn coercion_fallback_surfaces_as_validation_error() {
        let backend = Arc::new(MockBackend::new());
        backend.push_config(Ok(obj(json!({"emby_api_timeout": "soon"}))));
        let store = store_with(&backend);

        assert!(store.fetch().await);
        assert!(matches!(store.error(), Some(SyncError::Validation(_))));
        assert_eq!(store.snapshot().number("emby_api_timeout"), Some(60.0));
    }

    #[tokio::test]
    async fn save_rebuilds_engine_list_from_text() {
        let backend = Arc::new(MockBackend::new());
        backend.push_save(Ok(()));
        let store = store_with(&backend);
        store.set_engines_text("google, yandex");

        let edits = obj(json!({ENGINES_FIELD: ["bing", "google"]}));
        assert!(store.save(Some(&edits)).await);

        let payloads = backend.saved_payloads();
        assert_eq!(payloads.len(), 1);
        assert_eq!(payloads[0][ENGINES_FIELD], json!(["google", "yandex"]));
        assert_eq!(store.snapshot().engines(), ["google".to_string(), "yandex".to_string()]);
    }

    #[tokio::test]
    async fn successful_save_updates_memory_and_persisted_copy() {
        let backend = Arc::new(MockBackend::new());
        backend.push_save(Ok(()));
        let store = store_with(&backend);

        let edits = obj(json!({"tmdb_api_key": "abc123", "process_episodes": "false"}));
        assert!(store.save(Some(&edits)).await);

        let snapshot = store.snapshot();
        assert_eq!(snapshot.text("tmdb_api_key"), Some("abc123"));
        assert_eq!(snapshot.flag("process_episodes"), Some(false));
        assert_eq!(store.persisted(), Some(snapshot));
        assert!(!store.is_saving());
    }

    #[tokio::test]
    async fn failed_save_leaves_state_intact() {
        let backend = Arc::new(MockBackend::new());
        backend.push_save(Err(SyncError::logical("database unavailable")));
        let store = store_with(&backend);
        let before = store.snapshot();

        let edits = obj(json!({"tmdb_api_key": "abc123"}));
        assert!(!store.save(Some(&edits)).await);

        assert_eq!(store.snapshot(), before);
        assert_eq!(store.error(), Some(SyncError::logical("database unavailable")));
        assert_eq!(store.persisted(), None);
    }

    #[tokio::test]
    async fn save_rejects_edit_that_fails_coercion() {
        let backend = Arc::new(MockBackend::new());
        backend.push_save(Ok(()));
        let store = store_with(&backend);
        let before = store.snapshot();

        let edits = obj(json!({"proxy_port": "abc"}));
        assert!(!store.save(Some(&edits)).await);

        assert!(matches!(store.error(), Some(SyncError::Validation(_))));
        assert_eq!(backend.calls("save_config"), 0);
        assert_eq!(store.snapshot(), before);
        assert!(!store.is_saving());
    }

    #[tokio::test]
    async fn list_edit_after_fetch_is_saved() {
        let backend = Arc::new(MockBackend::new());
        backend
            .push_config(Ok(obj(json!({ENGINES_FIELD: ["bing", "google"]}))))
            .push_save(Ok(()));
        let store = store_with(&backend);
        assert!(store.fetch().await);

        let edits = obj(json!({ENGINES_FIELD: ["deepl"]}));
        assert!(store.save(Some(&edits)).await);

        assert_eq!(backend.saved_payloads()[0][ENGINES_FIELD], json!(["deepl"]));
        assert_eq!(store.snapshot().engines_text(), "deepl");
    }

    #[tokio::test]
    async fn persisted_copy_excludes_unsaved_edits() {
        let backend = Arc::new(MockBackend::new());
        backend.push_config(Ok(obj(json!({"tmdb_api_key": "server-key"}))));
        let store = store_with(&backend);
        assert!(store.fetch().await);

        store
            .set_value("tmdb_api_key", SettingValue::Text("local-key".into()))
            .unwrap();

        assert_eq!(store.snapshot().text("tmdb_api_key"), Some("local-key"));
        let persisted = store.persisted().unwrap();
        assert_eq!(persisted.text("tmdb_api_key"), Some("server-key"));
    }

    #[tokio::test]
    async fn subscribers_observe_edits_and_fetches() {
        let backend = Arc::new(MockBackend::new());
        backend.push_config(Ok(obj(json!({"ai_provider": "siliconflow"}))));
        let store = store_with(&backend);
        let mut rx = store.subscribe();

        store.set_engines(vec!["deepl".to_string()]);
        assert!(rx.has_changed().unwrap());
        assert_eq!(rx.borrow_and_update().snapshot.engines_text(), "deepl");

        assert!(store.fetch().await);
        let view = rx.borrow_and_update().clone();
        assert!(!view.loading);
        assert_eq!(view.snapshot.text("ai_provider"), Some("siliconflow"));
    }

    #[tokio::test]
    async fn set_value_rejects_wrong_kind() {
        let backend = Arc::new(MockBackend::new());
        let store = store_with(&backend);
        let err = store
            .set_value("proxy_enabled", SettingValue::Text("yes".into()))
            .unwrap_err();
        assert!(matches!(err, SyncError::Validation(_)));
        assert_eq!(store.snapshot().flag("proxy_enabled"), Some(false));
    }
}

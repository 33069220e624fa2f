use crate::routes::app_routes;

use embykit_core::client::{Backend, ClientConfig, Credentials, SessionState};
use embykit_core::navigation::{NavigationDecision, NavigationGate};
use embykit_core::store::{AboutStore, ConfigStore, SessionStore, TaskStatusMonitor};

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::OnceCell;

/// Every store the client shares, built once at startup.
pub struct AppContext {
    pub config: ClientConfig,
    pub settings: Arc<ConfigStore>,
    pub session: Arc<SessionStore>,
    pub about: Arc<AboutStore>,
    pub tasks: TaskStatusMonitor,
    pub gate: NavigationGate,
    initialized: OnceCell<()>,
}

impl AppContext {
    pub fn new(config: ClientConfig, backend: Arc<dyn Backend>) -> Self {
        let session = Arc::new(SessionStore::new(Arc::clone(&backend)));
        let gate = NavigationGate::new(
            Arc::clone(&session),
            Arc::new(app_routes(&config.login_route)),
            config.login_route.clone(),
        );
        Self {
            settings: Arc::new(ConfigStore::new(Arc::clone(&backend))),
            about: Arc::new(AboutStore::new(Arc::clone(&backend))),
            tasks: TaskStatusMonitor::new(
                backend,
                Duration::from_millis(config.status_poll_interval_ms),
            ),
            session,
            gate,
            config,
            initialized: OnceCell::new(),
        }
    }

    /// Build a context talking to the configured backend over HTTP.
    pub fn connect(config: ClientConfig) -> anyhow::Result<Self> {
        let backend = embykit_core::client::HttpBackend::new(&config)
            .map_err(|e| anyhow::anyhow!("Failed to set up backend client: {}", e))?;
        Ok(Self::new(config, Arc::new(backend)))
    }

    /// Establish the session and, when it allows it, load the shared data.
    ///
    /// Runs once; concurrent and later callers wait for the first run.
    pub async fn initialize(&self) {
        self.initialized
            .get_or_init(|| async {
                self.session.check_status().await;
                let state = self.session.state();
                if let Some(err) = &state.init_error {
                    log::warn!("Backend unreachable during startup: {}", err);
                }
                if state.permits_protected_route() {
                    self.load_session_data().await;
                }
            })
            .await;
    }

    async fn load_session_data(&self) {
        let (settings_ok, _) = tokio::join!(self.settings.fetch(), self.about.fetch());
        if !settings_ok {
            log::warn!("Settings could not be loaded");
        }
        self.tasks.start();
    }

    pub async fn navigate(&self, path: &str) -> NavigationDecision {
        self.initialize().await;
        self.gate.navigate(path).await
    }

    /// Log in and reload everything scoped to the previous session.
    pub async fn login(&self, credentials: Credentials) -> anyhow::Result<SessionState> {
        self.initialize().await;
        let state = self
            .session
            .login(credentials)
            .await
            .map_err(|e| anyhow::anyhow!("Login failed: {}", e))?;
        self.settings.invalidate();
        self.load_session_data().await;
        Ok(state)
    }

    pub async fn logout(&self) {
        self.tasks.stop();
        self.session.logout().await;
        self.settings.invalidate();
    }

    pub fn shutdown(&self) {
        self.tasks.stop();
    }
}

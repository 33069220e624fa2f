use crate::api::{AuthStatusResponse, ChangePasswordRequest, LoginRequest};
use crate::client::{AuthPhase, Backend, Credentials, SessionState};
use crate::error::{SyncError, SyncResult};
use crate::resource::RemoteResource;

use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::watch;

/// Minimum accepted length for a new password.
pub const MIN_PASSWORD_LEN: usize = 6;

struct SessionInner {
    session: SessionState,
    /// Bumped by login/logout. A status reply that started under an older
    /// epoch is not allowed to overwrite their result.
    epoch: u64,
    /// Set once a status answer, login or logout has settled the session.
    answered: bool,
}

impl SessionInner {
    fn status_response(&self) -> AuthStatusResponse {
        AuthStatusResponse {
            auth_enabled: self.session.is_auth_required,
            logged_in: self.session.is_logged_in,
            username: self.session.username.clone(),
        }
    }
}

/// Process-wide mirror of the backend's authentication state.
pub struct SessionStore {
    backend: Arc<dyn Backend>,
    status: RemoteResource<AuthStatusResponse>,
    inner: Arc<Mutex<SessionInner>>,
    state_tx: Arc<watch::Sender<SessionState>>,
}

impl SessionStore {
    pub fn new(backend: Arc<dyn Backend>) -> Self {
        let (state_tx, _) = watch::channel(SessionState::default());
        Self {
            backend,
            status: RemoteResource::new("auth status"),
            inner: Arc::new(Mutex::new(SessionInner {
                session: SessionState::default(),
                epoch: 0,
                answered: false,
            })),
            state_tx: Arc::new(state_tx),
        }
    }

    pub fn state(&self) -> SessionState {
        self.inner.lock().session.clone()
    }

    pub fn phase(&self) -> AuthPhase {
        self.inner.lock().session.phase
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state_tx.subscribe()
    }

    pub fn is_checking(&self) -> bool {
        self.status.is_loading()
    }

    /// Ask the backend who we are.
    ///
    /// Concurrent calls share one request. The phase reads `Authenticating`
    /// while the request runs; the identity fields keep their last known
    /// values. Never fails: an unreachable backend leaves the session
    /// unauthenticated with auth required and the error in `init_error`.
    pub async fn check_status(&self) -> bool {
        let backend = Arc::clone(&self.backend);
        let inner = Arc::clone(&self.inner);
        let state_tx = Arc::clone(&self.state_tx);

        let result = self
            .status
            .load(true, move || async move {
                let epoch = {
                    let mut guard = inner.lock();
                    guard.session.phase = AuthPhase::Authenticating;
                    state_tx.send_replace(guard.session.clone());
                    guard.epoch
                };

                let reply = backend.auth_status().await;

                let mut guard = inner.lock();
                if guard.epoch != epoch {
                    log::debug!("auth status reply superseded by login/logout");
                    return Ok(guard.status_response());
                }
                guard.answered = true;
                match &reply {
                    Ok(status) => apply_status(&mut guard.session, status),
                    Err(err) => {
                        log::warn!("auth status check failed: {}", err);
                        guard.session.unauthenticated();
                        guard.session.is_auth_required = true;
                        guard.session.init_error = Some(err.clone());
                    }
                }
                state_tx.send_replace(guard.session.clone());
                reply
            })
            .await;

        result.is_ok()
    }

    /// Current state, after waiting for a status answer if none exists yet.
    ///
    /// A re-check in flight is not awaited once the session has been settled.
    pub async fn ensure_checked(&self) -> SessionState {
        let answered = self.inner.lock().answered;
        if !answered {
            self.check_status().await;
        }
        self.state()
    }

    /// Log in. On failure the session is left exactly as it was.
    pub async fn login(&self, credentials: Credentials) -> SyncResult<SessionState> {
        if credentials.username.trim().is_empty() || credentials.password.is_empty() {
            return Err(SyncError::validation("username and password are required"));
        }
        let request = LoginRequest {
            username: credentials.username,
            password: credentials.password,
        };

        let response = self.backend.login(&request).await.inspect_err(|err| {
            log::warn!("login for {} failed: {}", request.username, err);
        })?;

        let Some(username) = response.username.filter(|name| !name.trim().is_empty()) else {
            let message = response
                .message
                .unwrap_or_else(|| "login response did not include a username".to_string());
            log::warn!("login for {} rejected: {}", request.username, message);
            return Err(SyncError::logical(message));
        };

        let state = {
            let mut guard = self.inner.lock();
            guard.epoch += 1;
            guard.answered = true;
            guard.session.authenticated(username, response.force_change_password);
            guard.session.init_error = None;
            self.status.replace_value(guard.status_response());
            guard.session.clone()
        };
        self.state_tx.send_replace(state.clone());
        log::info!(
            "logged in as {}{}",
            state.username.as_deref().unwrap_or_default(),
            if state.must_change_password { " (password change required)" } else { "" }
        );
        Ok(state)
    }

    /// Log out. The local session ends even if the backend call fails.
    pub async fn logout(&self) {
        if let Err(err) = self.backend.logout().await {
            log::warn!("logout request failed, clearing local session anyway: {}", err);
        }

        let state = {
            let mut guard = self.inner.lock();
            guard.epoch += 1;
            guard.answered = true;
            guard.session.unauthenticated();
            self.status.replace_value(guard.status_response());
            guard.session.clone()
        };
        self.state_tx.send_replace(state);
        log::info!("logged out");
    }

    /// Change the password of the logged-in user.
    pub async fn change_password(&self, current: &str, new: &str) -> SyncResult<()> {
        if current.is_empty() {
            return Err(SyncError::validation("current password is required"));
        }
        if new.chars().count() < MIN_PASSWORD_LEN {
            return Err(SyncError::validation(format!(
                "new password must be at least {} characters",
                MIN_PASSWORD_LEN
            )));
        }
        if !self.inner.lock().session.is_logged_in {
            return Err(SyncError::logical("not logged in"));
        }

        let request = ChangePasswordRequest {
            current_password: current.to_string(),
            new_password: new.to_string(),
        };
        self.backend.change_password(&request).await.inspect_err(|err| {
            log::warn!("password change failed: {}", err);
        })?;

        let state = {
            let mut guard = self.inner.lock();
            guard.session.must_change_password = false;
            guard.session.clone()
        };
        self.state_tx.send_replace(state);
        log::info!("password changed");
        Ok(())
    }
}

fn apply_status(session: &mut SessionState, status: &AuthStatusResponse) {
    session.is_auth_required = status.auth_enabled;
    session.init_error = None;

    let username = status.username.as_deref().filter(|name| !name.trim().is_empty());
    match (status.logged_in, username) {
        (true, Some(name)) => {
            // The status reply carries no password flag; keep the one from
            // login while the same user stays logged in.
            let keep_flag = session.is_logged_in
                && session.username.as_deref() == Some(name)
                && session.must_change_password;
            session.authenticated(name.to_string(), keep_flag);
        }
        (true, None) => {
            log::warn!("auth status reports a session without a username; treating as logged out");
            session.unauthenticated();
        }
        (false, _) => session.unauthenticated(),
    }
}

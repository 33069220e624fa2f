//! Scripted in-memory backend for store tests.

use crate::api::{
    AboutInfo, AuthStatusResponse, ChangePasswordRequest, LoginRequest, LoginResponse, TaskStatus,
};
use crate::client::backend::Backend;
use crate::error::{SyncError, SyncResult};

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{Map, Value};
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use tokio::sync::Notify;

#[derive(Default)]
struct MockInner {
    config: VecDeque<SyncResult<Map<String, Value>>>,
    save: VecDeque<SyncResult<()>>,
    auth_status: VecDeque<SyncResult<AuthStatusResponse>>,
    login: VecDeque<SyncResult<LoginResponse>>,
    logout: VecDeque<SyncResult<()>>,
    change_password: VecDeque<SyncResult<()>>,
    task_status: VecDeque<SyncResult<TaskStatus>>,
    about: VecDeque<SyncResult<AboutInfo>>,
    saved_payloads: Vec<Map<String, Value>>,
    login_requests: Vec<(String, String)>,
    calls: HashMap<&'static str, usize>,
    auth_status_hold: Option<Arc<Notify>>,
}

/// Each endpoint pops its next scripted reply; an empty script answers
/// with a transport error.
#[derive(Default)]
pub struct MockBackend {
    inner: Mutex<MockInner>,
}

macro_rules! script {
    ($fn_name:ident, $field:ident, $ty:ty) => {
        pub fn $fn_name(&self, reply: SyncResult<$ty>) -> &Self {
            self.inner.lock().$field.push_back(reply);
            self
        }
    };
}

impl MockBackend {
    pub fn new() -> Self {
        Self::default()
    }

    script!(push_config, config, Map<String, Value>);
    script!(push_save, save, ());
    script!(push_auth_status, auth_status, AuthStatusResponse);
    script!(push_login, login, LoginResponse);
    script!(push_logout, logout, ());
    script!(push_change_password, change_password, ());
    script!(push_task_status, task_status, TaskStatus);
    script!(push_about, about, AboutInfo);

    /// Makes the next `auth_status` call wait, after it has been counted,
    /// until the returned handle is notified.
    pub fn hold_auth_status(&self) -> Arc<Notify> {
        let notify = Arc::new(Notify::new());
        self.inner.lock().auth_status_hold = Some(Arc::clone(&notify));
        notify
    }

    pub fn calls(&self, endpoint: &str) -> usize {
        self.inner.lock().calls.get(endpoint).copied().unwrap_or(0)
    }

    pub fn saved_payloads(&self) -> Vec<Map<String, Value>> {
        self.inner.lock().saved_payloads.clone()
    }

    pub fn login_requests(&self) -> Vec<(String, String)> {
        self.inner.lock().login_requests.clone()
    }

    fn next<T>(
        &self,
        endpoint: &'static str,
        pick: impl FnOnce(&mut MockInner) -> &mut VecDeque<SyncResult<T>>,
    ) -> SyncResult<T> {
        let mut inner = self.inner.lock();
        *inner.calls.entry(endpoint).or_default() += 1;
        pick(&mut *inner)
            .pop_front()
            .unwrap_or_else(|| Err(SyncError::transport(format!("{} not scripted", endpoint))))
    }
}

pub fn auth_status(auth_enabled: bool, logged_in: bool, username: Option<&str>) -> AuthStatusResponse {
    AuthStatusResponse {
        auth_enabled,
        logged_in,
        username: username.map(str::to_string),
    }
}

pub fn login_ok(username: &str, force_change_password: bool) -> LoginResponse {
    LoginResponse {
        username: Some(username.to_string()),
        force_change_password,
        message: None,
    }
}

// Every reply yields once so concurrent callers overlap with the request.
#[async_trait]
impl Backend for MockBackend {
    async fn get_config(&self) -> SyncResult<Map<String, Value>> {
        tokio::task::yield_now().await;
        self.next("get_config", |i| &mut i.config)
    }

    async fn save_config(&self, payload: &Map<String, Value>) -> SyncResult<()> {
        tokio::task::yield_now().await;
        self.inner.lock().saved_payloads.push(payload.clone());
        self.next("save_config", |i| &mut i.save)
    }

    async fn auth_status(&self) -> SyncResult<AuthStatusResponse> {
        tokio::task::yield_now().await;
        let reply = self.next("auth_status", |i| &mut i.auth_status);
        let hold = self.inner.lock().auth_status_hold.take();
        if let Some(hold) = hold {
            hold.notified().await;
        }
        reply
    }

    async fn login(&self, request: &LoginRequest) -> SyncResult<LoginResponse> {
        tokio::task::yield_now().await;
        self.inner
            .lock()
            .login_requests
            .push((request.username.clone(), request.password.clone()));
        self.next("login", |i| &mut i.login)
    }

    async fn logout(&self) -> SyncResult<()> {
        tokio::task::yield_now().await;
        self.next("logout", |i| &mut i.logout)
    }

    async fn change_password(&self, _request: &ChangePasswordRequest) -> SyncResult<()> {
        tokio::task::yield_now().await;
        self.next("change_password", |i| &mut i.change_password)
    }

    async fn task_status(&self) -> SyncResult<TaskStatus> {
        tokio::task::yield_now().await;
        self.next("task_status", |i| &mut i.task_status)
    }

    async fn about_info(&self) -> SyncResult<AboutInfo> {
        tokio::task::yield_now().await;
        self.next("about_info", |i| &mut i.about)
    }
}

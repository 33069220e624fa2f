use crate::api::{
    AboutInfo, AuthStatusResponse, ChangePasswordRequest, LoginRequest, LoginResponse, TaskStatus,
};
use crate::error::SyncResult;
use async_trait::async_trait;
use serde_json::{Map, Value};

/// The backend's REST surface as seen by the stores.
///
/// The HTTP implementation lives in [`super::http`]; tests substitute a
/// scripted implementation.
#[async_trait]
pub trait Backend: Send + Sync + 'static {
    /// GET /api/config
    async fn get_config(&self) -> SyncResult<Map<String, Value>>;
    /// POST /api/config
    async fn save_config(&self, payload: &Map<String, Value>) -> SyncResult<()>;
    /// GET /api/auth/status
    async fn auth_status(&self) -> SyncResult<AuthStatusResponse>;
    /// POST /api/auth/login
    async fn login(&self, request: &LoginRequest) -> SyncResult<LoginResponse>;
    /// POST /api/auth/logout
    async fn logout(&self) -> SyncResult<()>;
    /// POST /api/auth/change_password
    async fn change_password(&self, request: &ChangePasswordRequest) -> SyncResult<()>;
    /// GET /api/status
    async fn task_status(&self) -> SyncResult<TaskStatus>;
    /// GET /api/system/about_info
    async fn about_info(&self) -> SyncResult<AboutInfo>;
}

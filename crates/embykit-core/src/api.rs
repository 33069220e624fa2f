use serde::{Deserialize, Serialize};

// ── API request/response types ──────────────────────────────────────────────

/// GET /api/auth/status response
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthStatusResponse {
    #[serde(default = "default_auth_enabled")]
    pub auth_enabled: bool,
    #[serde(default)]
    pub logged_in: bool,
    #[serde(default)]
    pub username: Option<String>,
}

// A status body without the flag must not read as "open access".
fn default_auth_enabled() -> bool {
    true
}

/// POST /api/auth/login request body
#[derive(Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

impl std::fmt::Debug for LoginRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoginRequest")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// POST /api/auth/login response.
///
/// Every field is optional on the wire; the session store decides whether the
/// body represents a successful login.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginResponse {
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub force_change_password: bool,
    #[serde(default)]
    pub message: Option<String>,
}

/// POST /api/auth/change_password request body
#[derive(Clone, Serialize, Deserialize)]
pub struct ChangePasswordRequest {
    pub current_password: String,
    pub new_password: String,
}

/// Error body returned by the backend on non-2xx replies.
#[derive(Clone, Debug, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

/// GET /api/status response
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TaskStatus {
    #[serde(default)]
    pub is_running: bool,
    #[serde(default = "default_current_action")]
    pub current_action: String,
    #[serde(default)]
    pub progress: f64,
    #[serde(default = "default_status_message")]
    pub message: String,
}

fn default_current_action() -> String {
    "idle".to_string()
}

fn default_status_message() -> String {
    "waiting for task".to_string()
}

impl Default for TaskStatus {
    fn default() -> Self {
        Self {
            is_running: false,
            current_action: default_current_action(),
            progress: 0.0,
            message: default_status_message(),
        }
    }
}

/// GET /api/system/about_info response
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct AboutInfo {
    #[serde(default)]
    pub current_version: String,
    /// Newest release first.
    #[serde(default)]
    pub releases: Vec<ReleaseInfo>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ReleaseInfo {
    pub version: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub published_at: Option<String>,
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auth_status_defaults_to_auth_required() {
        let status: AuthStatusResponse = serde_json::from_str("{}").unwrap();
        assert!(status.auth_enabled);
        assert!(!status.logged_in);
        assert_eq!(status.username, None);
    }

    #[test]
    fn login_response_tolerates_unexpected_body() {
        let resp: LoginResponse = serde_json::from_str(r#"{"message":"ok"}"#).unwrap();
        assert_eq!(resp.username, None);
        assert!(!resp.force_change_password);
    }

    #[test]
    fn login_request_debug_hides_password() {
        let req = LoginRequest {
            username: "admin".into(),
            password: "hunter2".into(),
        };
        let debug = format!("{:?}", req);
        assert!(debug.contains("admin"));
        assert!(!debug.contains("hunter2"));
    }

    #[test]
    fn task_status_fills_missing_fields() {
        let status: TaskStatus = serde_json::from_str(r#"{"is_running":true,"progress":40}"#).unwrap();
        assert!(status.is_running);
        assert_eq!(status.progress, 40.0);
        assert_eq!(status.current_action, "idle");
    }
}

use crate::error::SyncError;
use serde::{Deserialize, Serialize};

/// Phase of the session state machine.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum AuthPhase {
    /// No status check has completed yet
    #[default]
    Unknown,
    /// A status check is in flight
    Authenticating,
    /// The backend reports an active session
    Authenticated,
    /// Logged out, auth failed, or the backend was unreachable
    Unauthenticated,
}

/// Mirror of the backend's session identity.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SessionState {
    pub phase: AuthPhase,
    pub is_logged_in: bool,
    pub is_auth_required: bool,
    pub username: Option<String>,
    /// Only meaningful inside an active session.
    pub must_change_password: bool,
    /// Set when the last status check could not reach the backend.
    pub init_error: Option<SyncError>,
}

impl Default for SessionState {
    fn default() -> Self {
        Self {
            phase: AuthPhase::Unknown,
            is_logged_in: false,
            // Fail closed until the backend says otherwise.
            is_auth_required: true,
            username: None,
            must_change_password: false,
            init_error: None,
        }
    }
}

impl SessionState {
    pub(crate) fn authenticated(&mut self, username: String, must_change_password: bool) {
        self.phase = AuthPhase::Authenticated;
        self.is_logged_in = true;
        self.username = Some(username);
        self.must_change_password = must_change_password;
    }

    pub(crate) fn unauthenticated(&mut self) {
        self.phase = AuthPhase::Unauthenticated;
        self.is_logged_in = false;
        self.username = None;
        self.must_change_password = false;
    }

    /// Whether a route tagged as requiring authentication may be entered.
    ///
    /// Decided on the last known identity, so a re-check in flight does not
    /// lock out a logged-in user.
    pub fn permits_protected_route(&self) -> bool {
        !self.is_auth_required || self.is_logged_in
    }
}

/// Username/password pair submitted by the login form.
#[derive(Clone)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auth_phase_serde_round_trip() {
        for phase in [
            AuthPhase::Unknown,
            AuthPhase::Authenticating,
            AuthPhase::Authenticated,
            AuthPhase::Unauthenticated,
        ] {
            let json = serde_json::to_string(&phase).unwrap();
            let parsed: AuthPhase = serde_json::from_str(&json).unwrap();
            assert_eq!(parsed, phase);
        }
    }

    #[test]
    fn default_session_is_fail_closed() {
        let state = SessionState::default();
        assert!(state.is_auth_required);
        assert!(!state.permits_protected_route());
        assert_eq!(state.phase, AuthPhase::Unknown);
    }

    #[test]
    fn unauthenticated_clears_identity_and_password_flag() {
        let mut state = SessionState::default();
        state.authenticated("admin".into(), true);
        assert!(state.permits_protected_route());
        state.unauthenticated();
        assert_eq!(state.username, None);
        assert!(!state.must_change_password);
        assert!(!state.is_logged_in);
    }

    #[test]
    fn open_backend_permits_protected_routes_without_login() {
        let state = SessionState {
            is_auth_required: false,
            phase: AuthPhase::Unauthenticated,
            ..SessionState::default()
        };
        assert!(state.permits_protected_route());
    }

    #[test]
    fn recheck_in_flight_keeps_last_known_access() {
        let mut state = SessionState::default();
        state.authenticated("admin".into(), false);
        state.phase = AuthPhase::Authenticating;
        assert!(state.permits_protected_route());
    }
}

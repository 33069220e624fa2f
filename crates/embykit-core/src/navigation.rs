//! Route table and the authentication gate consulted before every navigation.

use crate::store::SessionStore;
use std::borrow::Cow;
use std::sync::Arc;

/// A navigable page and whether it needs a logged-in session.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Route {
    pub name: &'static str,
    /// `/`-separated path; segments starting with `:` match any value.
    pub path: Cow<'static, str>,
    pub requires_auth: bool,
}

impl Route {
    pub fn public(name: &'static str, path: impl Into<Cow<'static, str>>) -> Self {
        Self {
            name,
            path: path.into(),
            requires_auth: false,
        }
    }

    pub fn protected(name: &'static str, path: impl Into<Cow<'static, str>>) -> Self {
        Self {
            name,
            path: path.into(),
            requires_auth: true,
        }
    }

    fn matches(&self, path: &str) -> Option<Vec<(String, String)>> {
        let pattern: Vec<&str> = segments(&self.path).collect();
        let actual: Vec<&str> = segments(path).collect();
        if pattern.len() != actual.len() {
            return None;
        }
        let mut params = Vec::new();
        for (expected, got) in pattern.into_iter().zip(actual) {
            match expected.strip_prefix(':') {
                Some(param) => params.push((param.to_string(), got.to_string())),
                None if expected == got => {}
                None => return None,
            }
        }
        Some(params)
    }
}

fn segments(path: &str) -> impl Iterator<Item = &str> {
    path.split('/').filter(|s| !s.is_empty())
}

/// Drop query string and fragment.
fn strip_path(path: &str) -> &str {
    let end = path.find(['?', '#']).unwrap_or(path.len());
    &path[..end]
}

/// A resolved route with its captured `:param` values.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RouteMatch<'a> {
    pub route: &'a Route,
    pub params: Vec<(String, String)>,
}

impl RouteMatch<'_> {
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(key, _)| *key == name)
            .map(|(_, value)| value.as_str())
    }
}

#[derive(Clone, Debug, Default)]
pub struct RouteTable {
    routes: Vec<Route>,
    redirects: Vec<(&'static str, &'static str)>,
}

impl RouteTable {
    pub fn new(routes: Vec<Route>) -> Self {
        Self {
            routes,
            redirects: Vec::new(),
        }
    }

    /// Send navigations to `from` on to `to` (exact path match).
    pub fn with_redirect(mut self, from: &'static str, to: &'static str) -> Self {
        self.redirects.push((from, to));
        self
    }

    pub fn routes(&self) -> &[Route] {
        &self.routes
    }

    pub fn by_name(&self, name: &str) -> Option<&Route> {
        self.routes.iter().find(|route| route.name == name)
    }

    /// Apply a static redirect, if one is registered for `path`.
    pub fn redirect_for(&self, path: &str) -> Option<&'static str> {
        let path = strip_path(path);
        let trimmed = path.trim_end_matches('/');
        self.redirects
            .iter()
            .find(|(from, _)| *from == path || from.trim_end_matches('/') == trimmed)
            .map(|(_, to)| *to)
    }

    pub fn resolve(&self, path: &str) -> Option<RouteMatch<'_>> {
        let path = strip_path(path);
        self.routes.iter().find_map(|route| {
            route
                .matches(path)
                .map(|params| RouteMatch { route, params })
        })
    }
}

/// Outcome of a navigation request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum NavigationDecision {
    /// Enter the route (`path` after static redirects).
    Proceed { route: &'static str, path: String },
    /// The route needs a session; go to the login route instead.
    Redirect { to: String },
    NotFound,
}

/// Decides whether a navigation may proceed given the session state.
pub struct NavigationGate {
    session: Arc<SessionStore>,
    routes: Arc<RouteTable>,
    login_route: String,
}

impl NavigationGate {
    pub fn new(session: Arc<SessionStore>, routes: Arc<RouteTable>, login_route: impl Into<String>) -> Self {
        Self {
            session,
            routes,
            login_route: login_route.into(),
        }
    }

    pub fn login_route(&self) -> &str {
        &self.login_route
    }

    pub fn routes(&self) -> &RouteTable {
        &self.routes
    }

    /// Whether a route with the given tag may be entered now.
    ///
    /// Waits for the first status check when no answer exists yet; once the
    /// session is settled no request is made.
    pub async fn allows(&self, requires_auth: bool) -> bool {
        if !requires_auth {
            return true;
        }
        self.session.ensure_checked().await.permits_protected_route()
    }

    pub async fn navigate(&self, path: &str) -> NavigationDecision {
        let target = match self.routes.redirect_for(path) {
            Some(to) => to,
            None => strip_path(path),
        };

        let Some(matched) = self.routes.resolve(target) else {
            log::debug!("no route for {}", path);
            return NavigationDecision::NotFound;
        };

        if self.allows(matched.route.requires_auth).await {
            NavigationDecision::Proceed {
                route: matched.route.name,
                path: target.to_string(),
            }
        } else {
            log::info!("{} requires login; redirecting to {}", target, self.login_route);
            NavigationDecision::Redirect {
                to: self.login_route.clone(),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::Backend;
    use crate::client::mock::{MockBackend, auth_status};
    use crate::error::SyncError;

    fn table() -> RouteTable {
        RouteTable::new(vec![
            Route::public("login", "/login"),
            Route::protected("stats", "/stats"),
            Route::protected("edit-media", "/edit-media/:item_id"),
            Route::public("releases", "/releases"),
        ])
        .with_redirect("/", "/stats")
    }

    fn gate(backend: &Arc<MockBackend>) -> NavigationGate {
        let session = Arc::new(SessionStore::new(Arc::clone(backend) as Arc<dyn Backend>));
        NavigationGate::new(session, Arc::new(table()), "/login")
    }

    #[test]
    fn resolves_params_and_ignores_query() {
        let table = table();
        let matched = table.resolve("/edit-media/42?tab=cast").unwrap();
        assert_eq!(matched.route.name, "edit-media");
        assert_eq!(matched.param("item_id"), Some("42"));
        assert!(table.resolve("/edit-media").is_none());
        assert!(table.resolve("/stats/").is_some());
        assert_eq!(table.redirect_for("/"), Some("/stats"));
    }

    #[tokio::test]
    async fn anonymous_user_is_sent_to_login() {
        let backend = Arc::new(MockBackend::new());
        backend.push_auth_status(Ok(auth_status(true, false, None)));
        let gate = gate(&backend);

        assert_eq!(
            gate.navigate("/stats").await,
            NavigationDecision::Redirect { to: "/login".to_string() }
        );
        assert_eq!(
            gate.navigate("/releases").await,
            NavigationDecision::Proceed { route: "releases", path: "/releases".to_string() }
        );
        assert_eq!(gate.navigate("/nowhere").await, NavigationDecision::NotFound);
    }

    #[tokio::test]
    async fn settled_session_is_not_rechecked() {
        let backend = Arc::new(MockBackend::new());
        backend.push_auth_status(Ok(auth_status(true, true, Some("admin"))));
        let gate = gate(&backend);

        for _ in 0..3 {
            assert!(matches!(gate.navigate("/").await, NavigationDecision::Proceed { route: "stats", .. }));
        }
        assert_eq!(backend.calls("auth_status"), 1);
    }

    #[tokio::test]
    async fn concurrent_first_navigations_share_one_check() {
        let backend = Arc::new(MockBackend::new());
        backend.push_auth_status(Ok(auth_status(false, false, None)));
        let gate = gate(&backend);

        let (a, b) = tokio::join!(gate.navigate("/stats"), gate.navigate("/edit-media/7"));
        assert!(matches!(a, NavigationDecision::Proceed { .. }));
        assert!(matches!(b, NavigationDecision::Proceed { .. }));
        assert_eq!(backend.calls("auth_status"), 1);
    }

    #[tokio::test]
    async fn unreachable_backend_blocks_protected_routes() {
        let backend = Arc::new(MockBackend::new());
        backend.push_auth_status(Err(SyncError::transport("connection refused")));
        let gate = gate(&backend);

        assert!(!gate.allows(true).await);
        assert!(gate.allows(false).await);
    }
}

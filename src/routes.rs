use embykit_core::navigation::{Route, RouteTable};

/// Pages of the management UI and their access tags.
pub fn app_routes(login_route: &str) -> RouteTable {
    RouteTable::new(vec![
        Route::public("login", login_route.to_string()),
        Route::protected("database-stats", "/DatabaseStats"),
        Route::protected("review-list", "/review"),
        Route::protected("settings-scheduler", "/settings/scheduler"),
        Route::protected("settings-general", "/settings/general"),
        Route::protected("watchlist", "/watchlist"),
        Route::protected("collections", "/collections"),
        Route::protected("custom-collections", "/custom-collections"),
        Route::protected("media-edit", "/edit-media/:itemId"),
        Route::protected("actor-subscriptions", "/actor-subscriptions"),
        Route::public("releases", "/releases"),
        Route::public("cover-generator", "/settings/cover-generator"),
        Route::protected("resubscribe", "/resubscribe"),
    ])
    .with_redirect("/", "/DatabaseStats")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn login_route_is_public() {
        let table = app_routes("/login");
        let login = table.resolve("/login").unwrap();
        assert!(!login.route.requires_auth);
    }

    #[test]
    fn route_names_are_unique() {
        let table = app_routes("/login");
        let mut names: Vec<_> = table.routes().iter().map(|r| r.name).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), table.routes().len());
    }

    #[test]
    fn media_editor_captures_item_id() {
        let table = app_routes("/login");
        let matched = table.resolve("/edit-media/1234").unwrap();
        assert_eq!(matched.route.name, "media-edit");
        assert_eq!(matched.param("itemId"), Some("1234"));
    }
}

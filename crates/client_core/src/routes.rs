use shared::domain::UserId;

/// The app's navigable destinations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Login,
    SetPassword,
    Home,
    Punishments,
    People,
    Profile(UserId),
}

/// Coarse classification the session gate cares about: everything that is
/// not the login or set-password screen is gated identically.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteKind {
    Login,
    SetPassword,
    Other,
}

impl Route {
    pub fn kind(&self) -> RouteKind {
        match self {
            Route::Login => RouteKind::Login,
            Route::SetPassword => RouteKind::SetPassword,
            _ => RouteKind::Other,
        }
    }

    pub fn path(&self) -> String {
        match self {
            Route::Login => "/login".to_string(),
            Route::SetPassword => "/set-password".to_string(),
            Route::Home => "/".to_string(),
            Route::Punishments => "/punishments".to_string(),
            Route::People => "/users".to_string(),
            Route::Profile(user_id) => format!("/users/{}", user_id.0),
        }
    }

    /// Parses a location path, ignoring any query or fragment suffix.
    pub fn from_path(path: &str) -> Option<Route> {
        let path = path
            .split(['?', '#'])
            .next()
            .unwrap_or(path)
            .trim_end_matches('/');
        match path {
            "" => Some(Route::Home),
            "/login" => Some(Route::Login),
            "/set-password" => Some(Route::SetPassword),
            "/punishments" => Some(Route::Punishments),
            "/users" => Some(Route::People),
            _ => {
                let id = path.strip_prefix("/users/")?.parse::<i64>().ok()?;
                Some(Route::Profile(UserId(id)))
            }
        }
    }
}

#[cfg(test)]
#[path = "tests/routes_tests.rs"]
mod tests;

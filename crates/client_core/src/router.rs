use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::{
    auth::AuthStore,
    gate::{GateDecision, SessionGate},
    punishments::{EventFilter, PunishmentsStore},
    push::NavigationReceiver,
    routes::Route,
    users::{UsersQuery, UsersStore},
};

const CONFIRMED_PREFETCH_LIMIT: u32 = 10;

/// Owns the current route, runs the session gate on every navigation and
/// triggers the per-route store prefetches. Explicit container instead of
/// global singletons; callers share it via `Arc`.
pub struct AppRouter {
    gate: SessionGate,
    users: Arc<UsersStore>,
    punishments: Arc<PunishmentsStore>,
    current: tokio::sync::Mutex<Route>,
}

impl AppRouter {
    pub fn new(
        auth: Arc<AuthStore>,
        users: Arc<UsersStore>,
        punishments: Arc<PunishmentsStore>,
    ) -> Self {
        Self {
            gate: SessionGate::new(auth),
            users,
            punishments,
            current: tokio::sync::Mutex::new(Route::Home),
        }
    }

    pub async fn current(&self) -> Route {
        *self.current.lock().await
    }

    /// Runs the gate (following redirects until a destination is allowed),
    /// fires the destination's prefetches and commits the route. Returns
    /// the route actually settled on.
    pub async fn navigate(&self, to: Route) -> Route {
        let mut destination = to;
        loop {
            match self.gate.before_each(&destination).await {
                GateDecision::Allow => break,
                GateDecision::Redirect(redirect) => {
                    debug!("navigation redirected: {destination:?} -> {redirect:?}");
                    destination = redirect;
                }
            }
        }

        self.prefetch_for(destination);
        *self.current.lock().await = destination;
        destination
    }

    /// Fire-and-forget store refreshes on route entry, skipped when the
    /// matching fetch is already in flight. Errors land on the stores'
    /// error fields, never here.
    fn prefetch_for(&self, destination: Route) {
        let refresh_users = || {
            let users = Arc::clone(&self.users);
            tokio::spawn(async move {
                users
                    .fetch_if_idle(&UsersQuery {
                        q: Some(String::new()),
                        exclude_me: Some(true),
                        ..UsersQuery::default()
                    })
                    .await;
            });
        };

        match destination {
            Route::Home | Route::People => refresh_users(),
            Route::Punishments => {
                refresh_users();
                let punishments = Arc::clone(&self.punishments);
                tokio::spawn(async move {
                    punishments
                        .fetch_pending_if_idle(&EventFilter::default())
                        .await;
                });
                let punishments = Arc::clone(&self.punishments);
                tokio::spawn(async move {
                    punishments
                        .fetch_confirmed_if_idle(&EventFilter {
                            limit: Some(CONFIRMED_PREFETCH_LIMIT),
                            ..EventFilter::default()
                        })
                        .await;
                });
            }
            Route::Login | Route::SetPassword | Route::Profile(_) => {}
        }
    }

    /// Applies a navigate message from the notification task. Idempotent:
    /// messages that would not change the current route, and paths that do
    /// not name a known route, are dropped. Returns whether a navigation
    /// happened.
    pub async fn apply_navigate_message(&self, to: &str) -> bool {
        let Some(route) = Route::from_path(to) else {
            warn!("ignoring navigate message to unknown path: {to}");
            return false;
        };

        if route == self.current().await {
            return false;
        }

        self.navigate(route).await;
        true
    }
}

/// Consumes the navigation channel until the sender side is dropped.
pub fn spawn_navigation_pump(
    router: Arc<AppRouter>,
    mut receiver: NavigationReceiver,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(message) = receiver.recv().await {
            router.apply_navigate_message(&message.to).await;
        }
    })
}

#[cfg(test)]
#[path = "tests/router_tests.rs"]
mod tests;

use std::sync::Arc;

use crate::{
    auth::AuthStore,
    routes::{Route, RouteKind},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateDecision {
    Allow,
    Redirect(Route),
}

/// Pure gate rules, evaluated fresh on every navigation attempt and in this
/// order:
///
/// 1. not authenticated and destination is not login -> login
/// 2. authenticated with a forced password reset and destination is not
///    set-password -> set-password
/// 3. authenticated without a forced reset heading to login/set-password
///    -> home
/// 4. otherwise allow
///
/// Rule 1 wins over rule 2: the force-reset flag lives on the identity, so
/// it cannot apply while unauthenticated.
pub fn decide(is_authed: bool, must_reset_password: bool, destination: RouteKind) -> GateDecision {
    if !is_authed && destination != RouteKind::Login {
        return GateDecision::Redirect(Route::Login);
    }

    if is_authed && must_reset_password && destination != RouteKind::SetPassword {
        return GateDecision::Redirect(Route::SetPassword);
    }

    if is_authed && !must_reset_password && destination != RouteKind::Other {
        return GateDecision::Redirect(Route::Home);
    }

    GateDecision::Allow
}

/// Navigation guard over the auth state holder. Blocks the first evaluated
/// navigation on a one-time identity refresh so the gate can tell "not yet
/// checked" apart from "checked and absent"; refresh failure degrades to
/// unauthenticated (fail closed, no retry).
pub struct SessionGate {
    auth: Arc<AuthStore>,
}

impl SessionGate {
    pub fn new(auth: Arc<AuthStore>) -> Self {
        Self { auth }
    }

    pub async fn before_each(&self, destination: &Route) -> GateDecision {
        if !self.auth.ready().await {
            self.auth.refresh().await;
        }

        decide(
            self.auth.is_authed().await,
            self.auth.must_reset_password().await,
            destination.kind(),
        )
    }
}

#[cfg(test)]
#[path = "tests/gate_tests.rs"]
mod tests;

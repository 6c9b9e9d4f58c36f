use std::sync::Arc;

use anyhow::Result;
use shared::{
    domain::{Tier, PERM_MANAGE_FIKAPINNAR},
    protocol::Me,
};
use tokio::sync::Mutex;
use tracing::debug;

use crate::ApiClient;

#[derive(Debug, Clone, Default)]
pub struct AuthSnapshot {
    /// False until the first identity check completes; lets the gate tell
    /// "not yet checked" apart from "checked and absent".
    pub ready: bool,
    pub user: Option<Me>,
}

/// Single authoritative in-memory record of the current session identity.
///
/// Mutations are fire-and-forget with respect to each other: two concurrent
/// `refresh` calls may race and the last completed write wins, which is
/// harmless because identity is re-derived from server truth every time.
pub struct AuthStore {
    api: Arc<ApiClient>,
    inner: Mutex<AuthSnapshot>,
}

impl AuthStore {
    pub fn new(api: Arc<ApiClient>) -> Self {
        Self {
            api,
            inner: Mutex::new(AuthSnapshot::default()),
        }
    }

    pub async fn snapshot(&self) -> AuthSnapshot {
        self.inner.lock().await.clone()
    }

    pub async fn ready(&self) -> bool {
        self.inner.lock().await.ready
    }

    pub async fn is_authed(&self) -> bool {
        self.inner.lock().await.user.is_some()
    }

    pub async fn must_reset_password(&self) -> bool {
        self.inner
            .lock()
            .await
            .user
            .as_ref()
            .is_some_and(|user| user.force_password_reset)
    }

    pub async fn tier(&self) -> Tier {
        self.inner
            .lock()
            .await
            .user
            .as_ref()
            .map(|user| user.tier)
            .unwrap_or_default()
    }

    pub async fn has_permission(&self, name: &str) -> bool {
        self.inner
            .lock()
            .await
            .user
            .as_ref()
            .is_some_and(|user| user.has_permission(name))
    }

    pub async fn can_manage_fikapinnar(&self) -> bool {
        self.has_permission(PERM_MANAGE_FIKAPINNAR).await
    }

    /// Re-derives the identity from the server. Every failure (transport,
    /// non-2xx, decode) degrades to "unauthenticated"; readiness is set
    /// regardless of outcome.
    pub async fn refresh(&self) {
        let user = match self.api.me().await {
            Ok(me) => Some(me),
            Err(err) => {
                debug!("identity refresh failed, treating as unauthenticated: {err}");
                None
            }
        };

        let mut state = self.inner.lock().await;
        state.user = user;
        state.ready = true;
    }

    /// Submits credentials, then re-fetches the identity so permissions and
    /// the force-reset flag reflect server truth. On failure the error
    /// propagates unchanged and the identity is left untouched.
    pub async fn login(&self, username: &str, password: &str) -> Result<()> {
        self.api.login(username, password).await?;
        let me = self.api.me().await?;

        let mut state = self.inner.lock().await;
        state.user = Some(me);
        state.ready = true;
        Ok(())
    }

    /// Submits the new password, then re-fetches the identity so the
    /// force-reset flag clears once the server confirms.
    pub async fn set_password(&self, new_password: &str) -> Result<()> {
        self.api.set_password(new_password).await?;
        let me = self.api.me().await?;

        let mut state = self.inner.lock().await;
        state.user = Some(me);
        state.ready = true;
        Ok(())
    }

    /// Remote logout, then clears the identity. A failing remote call
    /// propagates before the identity is cleared (matching the app's
    /// long-standing behavior; the session cookie is then still live, so
    /// pretending to be logged out locally would be a lie).
    pub async fn logout(&self) -> Result<()> {
        self.api.logout().await?;

        let mut state = self.inner.lock().await;
        state.user = None;
        state.ready = true;
        Ok(())
    }

    pub async fn upload_avatar(
        &self,
        filename: &str,
        mime_type: &str,
        bytes: Vec<u8>,
    ) -> Result<()> {
        let me = self.api.set_avatar(filename, mime_type, bytes).await?;

        let mut state = self.inner.lock().await;
        state.user = Some(me);
        state.ready = true;
        Ok(())
    }

    /// Directly installs an identity (or clears it) without touching the
    /// server; used when another call path already returned a fresh `Me`.
    pub async fn set_user(&self, user: Option<Me>) {
        let mut state = self.inner.lock().await;
        state.user = user;
        state.ready = true;
    }
}

#[cfg(test)]
#[path = "tests/auth_tests.rs"]
mod tests;

use std::sync::Arc;

use shared::{domain::UserId, protocol::UserMini};
use tokio::sync::Mutex;

use crate::ApiClient;

/// Listing parameters; unset fields fall back to the last-used values
/// (initially q="", exclude_me=true, limit=20).
#[derive(Debug, Clone, Default)]
pub struct UsersQuery {
    pub q: Option<String>,
    pub exclude_me: Option<bool>,
    pub limit: Option<u32>,
}

#[derive(Debug, Clone)]
pub struct UsersSnapshot {
    pub ready: bool,
    pub loading: bool,
    pub error: Option<String>,

    pub q: String,
    pub exclude_me: bool,
    pub limit: u32,

    pub users: Vec<UserMini>,

    pub selected: Option<UserMini>,
    pub loading_selected: bool,
    pub selected_error: Option<String>,
}

impl Default for UsersSnapshot {
    fn default() -> Self {
        Self {
            ready: false,
            loading: false,
            error: None,
            q: String::new(),
            exclude_me: true,
            limit: 20,
            users: Vec::new(),
            selected: None,
            loading_selected: false,
            selected_error: None,
        }
    }
}

/// Cached user listing plus a selected-user slot for the profile view. Both
/// are transient projections of server state, replaced wholesale on fetch.
pub struct UsersStore {
    api: Arc<ApiClient>,
    inner: Mutex<UsersSnapshot>,
}

impl UsersStore {
    pub fn new(api: Arc<ApiClient>) -> Self {
        Self {
            api,
            inner: Mutex::new(UsersSnapshot::default()),
        }
    }

    pub async fn snapshot(&self) -> UsersSnapshot {
        self.inner.lock().await.clone()
    }

    pub async fn loading(&self) -> bool {
        self.inner.lock().await.loading
    }

    pub async fn fetch(&self, params: &UsersQuery) {
        let (q, exclude_me, limit) = {
            let mut state = self.inner.lock().await;
            state.loading = true;
            state.error = None;

            if let Some(q) = &params.q {
                state.q = q.clone();
            }
            if let Some(exclude_me) = params.exclude_me {
                state.exclude_me = exclude_me;
            }
            if let Some(limit) = params.limit {
                state.limit = limit;
            }
            (state.q.clone(), state.exclude_me, state.limit)
        };

        let result = self.api.list_users(&q, exclude_me, limit).await;

        let mut state = self.inner.lock().await;
        match result {
            Ok(users) => state.users = users,
            Err(err) => {
                state.users.clear();
                state.error = Some(err.to_string());
            }
        }
        state.loading = false;
        state.ready = true;
    }

    /// Re-fetch with the remembered parameters unless a fetch is already in
    /// flight (route-enter prefetch behavior).
    pub async fn fetch_if_idle(&self, params: &UsersQuery) {
        if self.loading().await {
            return;
        }
        self.fetch(params).await;
    }

    pub async fn fetch_one(&self, user_id: UserId) {
        {
            let mut state = self.inner.lock().await;
            state.loading_selected = true;
            state.selected_error = None;
        }

        let result = self.api.get_user(user_id).await;

        let mut state = self.inner.lock().await;
        match result {
            Ok(user) => state.selected = Some(user),
            Err(err) => {
                state.selected = None;
                state.selected_error = Some(err.to_string());
            }
        }
        state.loading_selected = false;
        state.ready = true;
    }

    pub async fn clear(&self) {
        let mut state = self.inner.lock().await;
        state.users.clear();
        state.error = None;
        state.ready = true;
    }

    pub async fn clear_selected(&self) {
        let mut state = self.inner.lock().await;
        state.selected = None;
        state.selected_error = None;
    }
}

#[cfg(test)]
#[path = "tests/users_tests.rs"]
mod tests;

use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{header::SET_COOKIE, Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use shared::{
    domain::UserId,
    error::{ApiFailure, ErrorDetail},
    protocol::{
        CreatePunishmentEventRequest, FikapinneStats, GiveFikapinneRequest, LoginRequest,
        LoginResponse, Me, PunishmentEvent, PunishmentStats, SetPasswordRequest,
        TakeFikapinnarRequest, TakePunishmentEvent, TakePunishmentRequest, UserMini,
    },
};
use tokio::sync::Mutex;
use tracing::debug;

pub mod auth;
pub mod gate;
pub mod punishments;
pub mod push;
pub mod router;
pub mod routes;
pub mod users;

pub use auth::{AuthSnapshot, AuthStore};
pub use gate::{decide, GateDecision, SessionGate};
pub use punishments::{EventFilter, PunishmentsSnapshot, PunishmentsStore};
pub use push::{
    navigation_channel, resolve_notification_click, ClickOutcome, NavigateMessage,
    NavigationReceiver, NavigationSender,
};
pub use router::{spawn_navigation_pump, AppRouter};
pub use routes::{Route, RouteKind};
pub use users::{UsersQuery, UsersSnapshot, UsersStore};

const CSRF_COOKIE: &str = "csrftoken";
const CSRF_HEADER: &str = "X-CSRFToken";

/// Supplies anti-forgery material for state-changing requests. The session
/// cookie itself rides on the HTTP client's cookie store; this seam only
/// covers the CSRF token handshake so tests can swap it out.
#[async_trait]
pub trait CredentialContext: Send + Sync {
    async fn attach(
        &self,
        http: &Client,
        base_url: &str,
        request: RequestBuilder,
    ) -> Result<RequestBuilder>;
}

/// Re-acquires the CSRF token from the dedicated endpoint immediately before
/// every mutating request and attaches it as a header. The token is never
/// reused across requests; the last seen value is only a fallback for
/// servers that skip re-setting an unchanged cookie.
pub struct CsrfCookieCredentials {
    last_token: Mutex<Option<String>>,
}

impl CsrfCookieCredentials {
    pub fn new() -> Self {
        Self {
            last_token: Mutex::new(None),
        }
    }
}

impl Default for CsrfCookieCredentials {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CredentialContext for CsrfCookieCredentials {
    async fn attach(
        &self,
        http: &Client,
        base_url: &str,
        request: RequestBuilder,
    ) -> Result<RequestBuilder> {
        let response = http
            .post(format!("{base_url}/api/users/csrf"))
            .send()
            .await
            .context("csrf endpoint unreachable")?;

        let mut last_token = self.last_token.lock().await;
        if let Some(token) = cookie_from_response(&response, CSRF_COOKIE) {
            *last_token = Some(token);
        }

        Ok(match last_token.as_deref() {
            Some(token) => request.header(CSRF_HEADER, token),
            None => request,
        })
    }
}

/// No-op credential context for tests and servers without CSRF protection.
pub struct PassthroughCredentials;

#[async_trait]
impl CredentialContext for PassthroughCredentials {
    async fn attach(
        &self,
        _http: &Client,
        _base_url: &str,
        request: RequestBuilder,
    ) -> Result<RequestBuilder> {
        Ok(request)
    }
}

fn cookie_from_response(response: &Response, name: &str) -> Option<String> {
    response.headers().get_all(SET_COOKIE).iter().find_map(|h| {
        let raw = h.to_str().ok()?;
        let pair = raw.split(';').next()?;
        let (key, value) = pair.split_once('=')?;
        (key.trim() == name).then(|| value.trim().to_string())
    })
}

/// Thin typed wrapper over the remote JSON API. One method per endpoint;
/// every failure mode of an operation collapses into a single [`ApiFailure`]
/// carrying the server `detail` when available and the operation's fallback
/// message otherwise.
pub struct ApiClient {
    http: Client,
    base_url: String,
    credentials: Arc<dyn CredentialContext>,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>, credentials: Arc<dyn CredentialContext>) -> Result<Self> {
        let http = Client::builder()
            .cookie_store(true)
            .build()
            .context("failed to build http client")?;
        Ok(Self {
            http,
            base_url: base_url.into(),
            credentials,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn mutating(&self, request: RequestBuilder) -> Result<RequestBuilder> {
        self.credentials
            .attach(&self.http, &self.base_url, request)
            .await
    }

    async fn expect_json<T: DeserializeOwned>(
        request: RequestBuilder,
        fallback: &str,
    ) -> Result<T> {
        let response = Self::checked(request, fallback).await?;
        response
            .json()
            .await
            .map_err(|err| decode_failure(fallback, err))
    }

    async fn expect_empty(request: RequestBuilder, fallback: &str) -> Result<()> {
        Self::checked(request, fallback).await?;
        Ok(())
    }

    async fn checked(request: RequestBuilder, fallback: &str) -> Result<Response> {
        let response = request.send().await.map_err(|err| {
            debug!("transport failure: {err}");
            anyhow::Error::new(err).context(ApiFailure::new(fallback))
        })?;

        if response.status().is_success() {
            return Ok(response);
        }

        let message = match response.json::<ErrorDetail>().await {
            Ok(body) => body.detail,
            Err(_) => fallback.to_string(),
        };
        Err(ApiFailure::new(message).into())
    }

    pub async fn login(&self, username: &str, password: &str) -> Result<LoginResponse> {
        let request = self
            .mutating(self.http.post(self.url("/api/users/login")))
            .await?
            .json(&LoginRequest {
                username: username.to_string(),
                password: password.to_string(),
            });
        Self::expect_json(request, "Login failed").await
    }

    pub async fn logout(&self) -> Result<()> {
        let request = self
            .mutating(self.http.post(self.url("/api/users/logout")))
            .await?;
        Self::expect_empty(request, "Logout failed").await
    }

    pub async fn me(&self) -> Result<Me> {
        Self::expect_json(self.http.get(self.url("/api/users/me")), "Not authenticated").await
    }

    pub async fn set_password(&self, new_password: &str) -> Result<()> {
        let request = self
            .mutating(self.http.post(self.url("/api/users/set-password")))
            .await?
            .json(&SetPasswordRequest {
                new_password: new_password.to_string(),
            });
        Self::expect_empty(request, "Failed to set password").await
    }

    pub async fn set_avatar(
        &self,
        filename: &str,
        mime_type: &str,
        bytes: Vec<u8>,
    ) -> Result<Me> {
        let part = reqwest::multipart::Part::bytes(bytes)
            .file_name(filename.to_string())
            .mime_str(mime_type)
            .context("invalid avatar mime type")?;
        let form = reqwest::multipart::Form::new().part("avatar", part);
        let request = self
            .mutating(self.http.post(self.url("/api/users/me/avatar")))
            .await?
            .multipart(form);
        Self::expect_json(request, "Failed to upload avatar").await
    }

    pub async fn list_users(
        &self,
        q: &str,
        exclude_me: bool,
        limit: u32,
    ) -> Result<Vec<UserMini>> {
        let mut query: Vec<(&str, String)> = Vec::new();
        let q = q.trim();
        if !q.is_empty() {
            query.push(("q", q.to_string()));
        }
        query.push(("exclude_me", if exclude_me { "1" } else { "0" }.to_string()));
        query.push(("limit", limit.to_string()));

        let request = self.http.get(self.url("/api/users")).query(&query);
        Self::expect_json(request, "Failed to load users").await
    }

    pub async fn get_user(&self, user_id: UserId) -> Result<UserMini> {
        let request = self.http.get(self.url(&format!("/api/users/{}", user_id.0)));
        Self::expect_json(request, "Failed to load user").await
    }

    fn events_query(base: (&'static str, &'static str), filter: &EventFilter) -> Vec<(&'static str, String)> {
        let mut query = vec![(base.0, base.1.to_string())];
        if let Some(target_id) = filter.target_id {
            query.push(("target_id", target_id.0.to_string()));
        }
        if let Some(limit) = filter.limit {
            query.push(("limit", limit.to_string()));
        }
        query
    }

    pub async fn list_pending_events(&self, filter: &EventFilter) -> Result<Vec<PunishmentEvent>> {
        let request = self
            .http
            .get(self.url("/api/punishments/events"))
            .query(&Self::events_query(("pending", "1"), filter));
        Self::expect_json(request, "Kunde inte ladda straff").await
    }

    pub async fn list_confirmed_events(
        &self,
        filter: &EventFilter,
    ) -> Result<Vec<PunishmentEvent>> {
        let request = self
            .http
            .get(self.url("/api/punishments/events"))
            .query(&Self::events_query(("confirmed", "1"), filter));
        Self::expect_json(request, "Kunde inte ladda bekräftade straff").await
    }

    pub async fn create_event(
        &self,
        payload: &CreatePunishmentEventRequest,
    ) -> Result<PunishmentEvent> {
        let request = self
            .mutating(self.http.post(self.url("/api/punishments/events")))
            .await?
            .json(payload);
        Self::expect_json(request, "Kunde inte ge straff").await
    }

    pub async fn confirm_event(&self, event_id: shared::domain::EventId) -> Result<PunishmentEvent> {
        let request = self
            .mutating(
                self.http
                    .post(self.url(&format!("/api/punishments/events/{}/confirm", event_id.0))),
            )
            .await?;
        Self::expect_json(request, "Kunde inte bekräfta straff").await
    }

    pub async fn delete_event(&self, event_id: shared::domain::EventId) -> Result<()> {
        let request = self
            .mutating(
                self.http
                    .delete(self.url(&format!("/api/punishments/events/{}", event_id.0))),
            )
            .await?;
        Self::expect_empty(request, "Kunde inte ångra straff").await
    }

    pub async fn punishment_stats(&self, target_id: Option<UserId>) -> Result<PunishmentStats> {
        let mut request = self.http.get(self.url("/api/punishments/stats"));
        if let Some(target_id) = target_id {
            request = request.query(&[("target_id", target_id.0)]);
        }
        Self::expect_json(request, "Kunde inte ladda statistik").await
    }

    pub async fn take_event(
        &self,
        payload: &TakePunishmentRequest,
    ) -> Result<TakePunishmentEvent> {
        let request = self
            .mutating(self.http.post(self.url("/api/punishments/take")))
            .await?
            .json(payload);
        Self::expect_json(request, "Kunde inte stryka straff").await
    }

    pub async fn give_fikapinne(&self, target_id: UserId) -> Result<()> {
        let request = self
            .mutating(self.http.post(self.url("/api/punishments/fikapinnar/give")))
            .await?
            .json(&GiveFikapinneRequest { target_id });
        Self::expect_empty(request, "Kunde inte ge fikapinne").await
    }

    pub async fn take_fikapinnar(&self, target_id: UserId, amount: i32) -> Result<()> {
        let request = self
            .mutating(self.http.post(self.url("/api/punishments/fikapinnar/take")))
            .await?
            .json(&TakeFikapinnarRequest { target_id, amount });
        Self::expect_empty(request, "Kunde inte stryka fikapinnar").await
    }

    pub async fn fikapinne_stats(&self, target_id: Option<UserId>) -> Result<FikapinneStats> {
        let mut request = self.http.get(self.url("/api/punishments/fikapinnar/stats"));
        if let Some(target_id) = target_id {
            request = request.query(&[("target_id", target_id.0)]);
        }
        Self::expect_json(request, "Kunde inte ladda fikapinne-statistik").await
    }
}

fn decode_failure(fallback: &str, err: reqwest::Error) -> anyhow::Error {
    debug!("payload decode failure: {err}");
    anyhow::Error::new(err).context(ApiFailure::new(fallback))
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;

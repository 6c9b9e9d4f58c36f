use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{EventId, Stage, TakeEventId, Tier, UserId};

/// The authenticated user's own identity as served by `GET /api/users/me`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Me {
    pub id: UserId,
    pub username: String,
    pub avatar_url: Option<String>,
    pub force_password_reset: bool,
    #[serde(default)]
    pub tier: Tier,
    #[serde(default)]
    pub permissions: Vec<String>,
}

impl Me {
    pub fn has_permission(&self, name: &str) -> bool {
        self.permissions.iter().any(|p| p == name)
    }
}

/// Public projection of a user, used for listings and as embedded
/// target/initiator/confirmer references.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserMini {
    pub id: UserId,
    pub username: String,
    pub avatar_url: Option<String>,
    #[serde(default)]
    pub tier: Tier,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PunishmentEvent {
    pub id: EventId,
    pub target: UserMini,
    pub initiator: UserMini,
    pub confirmer: Option<UserMini>,

    pub reason: String,
    pub amount: i32,

    pub created_at: DateTime<Utc>,
    pub confirmed_at: Option<DateTime<Utc>>,
    pub stage: Stage,
}

impl PunishmentEvent {
    /// Confirmer and confirmation timestamp are both present exactly when
    /// the event is confirmed.
    pub fn stage_is_consistent(&self) -> bool {
        match self.stage {
            Stage::Pending => self.confirmer.is_none() && self.confirmed_at.is_none(),
            Stage::Confirmed => self.confirmer.is_some() && self.confirmed_at.is_some(),
        }
    }
}

/// Fast-path record from `POST /api/punishments/take`. Distinct event kind;
/// it bypasses the pending/confirm workflow entirely.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TakePunishmentEvent {
    pub id: TakeEventId,
    pub target: UserMini,
    pub judge: UserMini,
    pub amount: i32,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PunishmentStats {
    pub target_id: UserId,
    pub total_amount: i64,
    pub week_amount: i64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct FikapinneStats {
    pub target_id: UserId,
    pub total_amount: i64,
    pub month_amount: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginResponse {
    pub force_password_reset: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SetPasswordRequest {
    pub new_password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatePunishmentEventRequest {
    pub target_id: UserId,
    /// 1..=10, enforced server side.
    pub amount: i32,
    #[serde(default)]
    pub reason: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TakePunishmentRequest {
    pub target_id: UserId,
    pub amount: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GiveFikapinneRequest {
    pub target_id: UserId,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TakeFikapinnarRequest {
    pub target_id: UserId,
    /// The server accepts only 3 or 5.
    pub amount: i32,
}

fn default_push_title() -> String {
    "Notis".to_string()
}

fn default_push_icon() -> String {
    "/pwa-192x192.png".to_string()
}

fn default_push_url() -> String {
    "/".to_string()
}

/// Payload carried by a web-push message. Every field is optional on the
/// wire; missing fields fall back to the app defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PushPayload {
    #[serde(default = "default_push_title")]
    pub title: String,
    #[serde(default)]
    pub body: String,
    #[serde(default = "default_push_icon")]
    pub icon: String,
    #[serde(default = "default_push_url")]
    pub url: String,
}

impl Default for PushPayload {
    fn default() -> Self {
        Self {
            title: default_push_title(),
            body: String::new(),
            icon: default_push_icon(),
            url: default_push_url(),
        }
    }
}

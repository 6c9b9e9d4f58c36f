use std::sync::Arc;

use anyhow::Result;
use shared::{
    domain::{EventId, UserId},
    protocol::{CreatePunishmentEventRequest, PunishmentEvent, TakePunishmentEvent,
        TakePunishmentRequest},
};
use tokio::sync::Mutex;

use crate::ApiClient;

/// Server-side filters for the event listings.
#[derive(Debug, Clone, Copy, Default)]
pub struct EventFilter {
    pub target_id: Option<UserId>,
    pub limit: Option<u32>,
}

#[derive(Debug, Clone, Default)]
pub struct PunishmentsSnapshot {
    pub ready: bool,
    pub loading_pending: bool,
    pub loading_confirmed: bool,
    pub error: Option<String>,

    /// Newest first. Front inserts on create; bulk fetches trust server
    /// order verbatim.
    pub pending: Vec<PunishmentEvent>,
    pub confirmed: Vec<PunishmentEvent>,

    pub creating: bool,
    pub create_error: Option<String>,

    pub confirming: bool,
    pub confirm_error: Option<String>,
}

/// Local projection of the remote punishment-event list, split into pending
/// and confirmed sequences. Local actions mutate optimistically with the
/// server-returned representation; the lists can drift from server state
/// until the next fetch, which is accepted.
pub struct PunishmentsStore {
    api: Arc<ApiClient>,
    inner: Mutex<PunishmentsSnapshot>,
}

impl PunishmentsStore {
    pub fn new(api: Arc<ApiClient>) -> Self {
        Self {
            api,
            inner: Mutex::new(PunishmentsSnapshot::default()),
        }
    }

    pub async fn snapshot(&self) -> PunishmentsSnapshot {
        self.inner.lock().await.clone()
    }

    pub async fn loading_pending(&self) -> bool {
        self.inner.lock().await.loading_pending
    }

    pub async fn loading_confirmed(&self) -> bool {
        self.inner.lock().await.loading_confirmed
    }

    /// Replaces the pending sequence with the server's current result. On
    /// failure the sequence is cleared and the error recorded; the confirmed
    /// sequence and its loading flag are untouched.
    pub async fn fetch_pending(&self, filter: &EventFilter) {
        {
            let mut state = self.inner.lock().await;
            state.loading_pending = true;
            state.error = None;
        }

        let result = self.api.list_pending_events(filter).await;

        let mut state = self.inner.lock().await;
        match result {
            Ok(events) => state.pending = events,
            Err(err) => {
                state.pending.clear();
                state.error = Some(err.to_string());
            }
        }
        state.loading_pending = false;
        state.ready = true;
    }

    pub async fn fetch_confirmed(&self, filter: &EventFilter) {
        {
            let mut state = self.inner.lock().await;
            state.loading_confirmed = true;
            state.error = None;
        }

        let result = self.api.list_confirmed_events(filter).await;

        let mut state = self.inner.lock().await;
        match result {
            Ok(events) => state.confirmed = events,
            Err(err) => {
                state.confirmed.clear();
                state.error = Some(err.to_string());
            }
        }
        state.loading_confirmed = false;
        state.ready = true;
    }

    /// Both listings concurrently; no ordering dependency between them.
    pub async fn fetch_all(&self, filter: &EventFilter, confirmed_limit: Option<u32>) {
        let confirmed_filter = EventFilter {
            target_id: filter.target_id,
            limit: confirmed_limit.or(filter.limit),
        };
        tokio::join!(
            self.fetch_pending(filter),
            self.fetch_confirmed(&confirmed_filter)
        );
    }

    pub async fn fetch_pending_if_idle(&self, filter: &EventFilter) {
        if self.loading_pending().await {
            return;
        }
        self.fetch_pending(filter).await;
    }

    pub async fn fetch_confirmed_if_idle(&self, filter: &EventFilter) {
        if self.loading_confirmed().await {
            return;
        }
        self.fetch_confirmed(filter).await;
    }

    /// Submits a new event; the server-returned pending representation goes
    /// to the front of the pending sequence. No local mutation on failure.
    pub async fn create_event(
        &self,
        target_id: UserId,
        amount: i32,
        reason: &str,
    ) -> Result<PunishmentEvent> {
        {
            let mut state = self.inner.lock().await;
            state.creating = true;
            state.create_error = None;
        }

        let result = self
            .api
            .create_event(&CreatePunishmentEventRequest {
                target_id,
                amount,
                reason: reason.trim().to_string(),
            })
            .await;

        let mut state = self.inner.lock().await;
        state.creating = false;
        match result {
            Ok(created) => {
                state.pending.insert(0, created.clone());
                Ok(created)
            }
            Err(err) => {
                state.create_error = Some(err.to_string());
                Err(err)
            }
        }
    }

    /// Moves the event out of pending and puts the server-returned confirmed
    /// representation at the front of confirmed, in one observable step.
    pub async fn confirm_event(&self, event_id: EventId) -> Result<PunishmentEvent> {
        {
            let mut state = self.inner.lock().await;
            state.confirming = true;
            state.confirm_error = None;
        }

        let result = self.api.confirm_event(event_id).await;

        let mut state = self.inner.lock().await;
        state.confirming = false;
        match result {
            Ok(updated) => {
                state.pending.retain(|event| event.id != event_id);
                state.confirmed.insert(0, updated.clone());
                Ok(updated)
            }
            Err(err) => {
                state.confirm_error = Some(err.to_string());
                Err(err)
            }
        }
    }

    /// Deletion is only valid while pending; the confirmed sequence is never
    /// touched through this path.
    pub async fn delete_event(&self, event_id: EventId) -> Result<()> {
        match self.api.delete_event(event_id).await {
            Ok(()) => {
                let mut state = self.inner.lock().await;
                state.pending.retain(|event| event.id != event_id);
                Ok(())
            }
            Err(err) => {
                let mut state = self.inner.lock().await;
                state.error = Some(err.to_string());
                Err(err)
            }
        }
    }

    /// Fast path that bypasses the pending/confirm workflow entirely: the
    /// created record is returned to the caller and neither sequence is
    /// touched.
    pub async fn take_event(&self, target_id: UserId, amount: i32) -> Result<TakePunishmentEvent> {
        self.api
            .take_event(&TakePunishmentRequest { target_id, amount })
            .await
    }
}

#[cfg(test)]
#[path = "tests/punishments_tests.rs"]
mod tests;

use super::*;
use std::sync::Arc;

use axum::{
    extract::{Path, Query},
    http::StatusCode,
    response::IntoResponse,
    routing::{delete, get, post},
    Json, Router,
};
use serde_json::json;
use shared::domain::TakeEventId;
use std::collections::HashMap;
use tokio::net::TcpListener;

use crate::PassthroughCredentials;

async fn spawn_server(app: Router) -> String {
    std::env::set_var("NO_PROXY", "127.0.0.1,localhost");
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    format!("http://{addr}")
}

fn event_json(id: i64, stage: &str) -> serde_json::Value {
    let confirmed = stage == "confirmed";
    json!({
        "id": id,
        "target": { "id": 1, "username": "kp", "avatar_url": null, "tier": "bandana" },
        "initiator": { "id": 2, "username": "jb", "avatar_url": null, "tier": "vest" },
        "confirmer": if confirmed {
            json!({ "id": 3, "username": "os", "avatar_url": null, "tier": "hat" })
        } else {
            json!(null)
        },
        "reason": "sen till träning",
        "amount": 2,
        "created_at": "2025-03-01T12:00:00Z",
        "confirmed_at": if confirmed { json!("2025-03-01T13:00:00Z") } else { json!(null) },
        "stage": stage,
    })
}

async fn handle_events(Query(params): Query<HashMap<String, String>>) -> Json<serde_json::Value> {
    if params.contains_key("pending") {
        Json(json!([event_json(7, "pending"), event_json(3, "pending")]))
    } else {
        Json(json!([event_json(2, "confirmed")]))
    }
}

fn store(base_url: String) -> PunishmentsStore {
    let api = ApiClient::new(base_url, Arc::new(PassthroughCredentials)).expect("client");
    PunishmentsStore::new(Arc::new(api))
}

#[tokio::test]
async fn both_listings_are_fetched_concurrently() {
    async fn slow_events(
        Query(params): Query<HashMap<String, String>>,
    ) -> Json<serde_json::Value> {
        // Stagger the two listings so an accidentally serial fetch_all would
        // still pass, but a deadlocked one would time out.
        if params.contains_key("pending") {
            tokio::time::sleep(std::time::Duration::from_millis(50)).await;
            Json(json!([event_json(7, "pending")]))
        } else {
            Json(json!([event_json(2, "confirmed")]))
        }
    }

    let app = Router::new().route("/api/punishments/events", get(slow_events));
    let store = store(spawn_server(app).await);

    store.fetch_all(&EventFilter::default(), Some(10)).await;

    let snapshot = store.snapshot().await;
    assert!(snapshot.ready);
    assert!(!snapshot.loading_pending);
    assert!(!snapshot.loading_confirmed);
    assert_eq!(snapshot.pending.len(), 1);
    assert_eq!(snapshot.confirmed.len(), 1);
}

#[tokio::test]
async fn failed_pending_fetch_clears_only_the_pending_sequence() {
    let app = Router::new().route(
        "/api/punishments/events",
        get(|Query(params): Query<HashMap<String, String>>| async move {
            if params.contains_key("pending") {
                (StatusCode::INTERNAL_SERVER_ERROR, Json(json!({}))).into_response()
            } else {
                Json(json!([event_json(2, "confirmed")])).into_response()
            }
        }),
    );
    let store = store(spawn_server(app).await);

    store.fetch_confirmed(&EventFilter::default()).await;
    store.fetch_pending(&EventFilter::default()).await;

    let snapshot = store.snapshot().await;
    assert!(snapshot.pending.is_empty());
    assert_eq!(snapshot.error.as_deref(), Some("Kunde inte ladda straff"));
    assert_eq!(snapshot.confirmed.len(), 1);
}

#[tokio::test]
async fn created_events_land_at_the_front_of_pending() {
    let app = Router::new()
        .route("/api/punishments/events", get(handle_events))
        .route(
            "/api/punishments/events",
            post(|Json(body): Json<serde_json::Value>| async move {
                assert_eq!(body["target_id"], 1);
                assert_eq!(body["amount"], 2);
                Json(event_json(9, "pending"))
            }),
        );
    let store = store(spawn_server(app).await);

    store.fetch_pending(&EventFilter::default()).await;
    let created = store
        .create_event(UserId(1), 2, "  sen till träning  ")
        .await
        .expect("create");

    assert_eq!(created.id, EventId(9));
    let snapshot = store.snapshot().await;
    assert_eq!(snapshot.pending[0].id, EventId(9));
    assert_eq!(snapshot.pending.len(), 3);
    assert!(snapshot.pending[0].stage_is_consistent());
    assert!(snapshot.create_error.is_none());
}

#[tokio::test]
async fn confirmation_moves_the_event_across_sequences_in_one_step() {
    let app = Router::new()
        .route("/api/punishments/events", get(handle_events))
        .route(
            "/api/punishments/events/:id/confirm",
            post(|Path(id): Path<i64>| async move { Json(event_json(id, "confirmed")) }),
        );
    let store = store(spawn_server(app).await);

    store.fetch_all(&EventFilter::default(), None).await;
    store.confirm_event(EventId(7)).await.expect("confirm");

    let snapshot = store.snapshot().await;
    assert!(snapshot.pending.iter().all(|event| event.id != EventId(7)));
    assert_eq!(snapshot.confirmed[0].id, EventId(7));
    assert!(snapshot.confirmed[0].confirmer.is_some());
    assert_eq!(snapshot.confirmed.len(), 2);
}

#[tokio::test]
async fn failed_confirmation_mutates_nothing() {
    let app = Router::new()
        .route("/api/punishments/events", get(handle_events))
        .route(
            "/api/punishments/events/:id/confirm",
            post(|| async {
                (
                    StatusCode::FORBIDDEN,
                    Json(json!({ "detail": "Du kan inte bekräfta ditt eget straff." })),
                )
            }),
        );
    let store = store(spawn_server(app).await);

    store.fetch_all(&EventFilter::default(), None).await;
    let err = store.confirm_event(EventId(7)).await.expect_err("must fail");

    assert_eq!(err.to_string(), "Du kan inte bekräfta ditt eget straff.");
    let snapshot = store.snapshot().await;
    assert_eq!(snapshot.pending.len(), 2);
    assert_eq!(snapshot.confirmed.len(), 1);
    assert_eq!(
        snapshot.confirm_error.as_deref(),
        Some("Du kan inte bekräfta ditt eget straff.")
    );
}

#[tokio::test]
async fn deletion_only_touches_the_pending_sequence() {
    let app = Router::new()
        .route("/api/punishments/events", get(handle_events))
        .route(
            "/api/punishments/events/:id",
            delete(|| async { StatusCode::NO_CONTENT }),
        );
    let store = store(spawn_server(app).await);

    store.fetch_all(&EventFilter::default(), None).await;
    store.delete_event(EventId(3)).await.expect("delete");

    let snapshot = store.snapshot().await;
    assert_eq!(snapshot.pending.len(), 1);
    assert_eq!(snapshot.pending[0].id, EventId(7));
    assert_eq!(snapshot.confirmed.len(), 1);
}

#[tokio::test]
async fn taking_a_punishment_bypasses_both_sequences() {
    let app = Router::new()
        .route("/api/punishments/events", get(handle_events))
        .route(
            "/api/punishments/take",
            post(|Json(body): Json<serde_json::Value>| async move {
                assert_eq!(body["amount"], 2);
                Json(json!({
                    "id": 41,
                    "target": { "id": 1, "username": "kp", "avatar_url": null, "tier": "bandana" },
                    "judge": { "id": 2, "username": "jb", "avatar_url": null, "tier": "vest" },
                    "amount": 2,
                    "created_at": "2025-03-02T10:00:00Z",
                }))
            }),
        );
    let store = store(spawn_server(app).await);

    store.fetch_all(&EventFilter::default(), None).await;
    let taken = store.take_event(UserId(1), 2).await.expect("take");

    assert_eq!(taken.id, TakeEventId(41));
    let snapshot = store.snapshot().await;
    assert_eq!(snapshot.pending.len(), 2);
    assert_eq!(snapshot.confirmed.len(), 1);
}

#[tokio::test]
async fn idle_guard_skips_a_fetch_already_in_flight() {
    let app = Router::new().route("/api/punishments/events", get(handle_events));
    let store = Arc::new(store(spawn_server(app).await));

    {
        let mut state = store.inner.lock().await;
        state.loading_pending = true;
    }
    store.fetch_pending_if_idle(&EventFilter::default()).await;
    assert!(store.snapshot().await.pending.is_empty());

    {
        let mut state = store.inner.lock().await;
        state.loading_pending = false;
    }
    store.fetch_pending_if_idle(&EventFilter::default()).await;
    assert_eq!(store.snapshot().await.pending.len(), 2);
}

use super::*;
use std::sync::Arc;

use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use serde_json::json;
use tokio::{net::TcpListener, sync::Mutex as TokioMutex};

use crate::{ApiClient, PassthroughCredentials};
use crate::routes::Route;

async fn spawn_server(app: Router) -> String {
    std::env::set_var("NO_PROXY", "127.0.0.1,localhost");
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    format!("http://{addr}")
}

#[test]
fn unauthenticated_visitors_land_on_login() {
    assert_eq!(
        decide(false, false, RouteKind::Other),
        GateDecision::Redirect(Route::Login)
    );
    assert_eq!(
        decide(false, false, RouteKind::SetPassword),
        GateDecision::Redirect(Route::Login)
    );
    assert_eq!(decide(false, false, RouteKind::Login), GateDecision::Allow);
}

#[test]
fn forced_reset_pins_navigation_to_set_password() {
    assert_eq!(
        decide(true, true, RouteKind::Other),
        GateDecision::Redirect(Route::SetPassword)
    );
    assert_eq!(
        decide(true, true, RouteKind::Login),
        GateDecision::Redirect(Route::SetPassword)
    );
    assert_eq!(decide(true, true, RouteKind::SetPassword), GateDecision::Allow);
}

#[test]
fn settled_sessions_skip_the_entry_screens() {
    assert_eq!(
        decide(true, false, RouteKind::Login),
        GateDecision::Redirect(Route::Home)
    );
    assert_eq!(
        decide(true, false, RouteKind::SetPassword),
        GateDecision::Redirect(Route::Home)
    );
    assert_eq!(decide(true, false, RouteKind::Other), GateDecision::Allow);
}

#[test]
fn missing_identity_outranks_a_stale_reset_flag() {
    assert_eq!(
        decide(false, true, RouteKind::Other),
        GateDecision::Redirect(Route::Login)
    );
}

type HitCounter = Arc<TokioMutex<u32>>;

async fn handle_me(State(hits): State<HitCounter>) -> Json<serde_json::Value> {
    *hits.lock().await += 1;
    Json(json!({
        "id": 1,
        "username": "kp",
        "avatar_url": null,
        "force_password_reset": false,
        "tier": "hat",
        "permissions": [],
    }))
}

#[tokio::test]
async fn identity_is_refreshed_once_across_navigations() {
    let hits: HitCounter = Arc::new(TokioMutex::new(0));
    let app = Router::new()
        .route("/api/users/me", get(handle_me))
        .with_state(Arc::clone(&hits));
    let base_url = spawn_server(app).await;

    let api = Arc::new(
        ApiClient::new(base_url, Arc::new(PassthroughCredentials)).expect("client"),
    );
    let gate = SessionGate::new(Arc::new(AuthStore::new(api)));

    assert_eq!(gate.before_each(&Route::Home).await, GateDecision::Allow);
    assert_eq!(
        gate.before_each(&Route::Punishments).await,
        GateDecision::Allow
    );

    assert_eq!(*hits.lock().await, 1);
}

#[tokio::test]
async fn failed_refresh_fails_closed_to_login() {
    let app = Router::new().route(
        "/api/users/me",
        get(|| async { (StatusCode::UNAUTHORIZED, Json(json!({ "detail": "nope" }))) }),
    );
    let base_url = spawn_server(app).await;

    let api = Arc::new(
        ApiClient::new(base_url, Arc::new(PassthroughCredentials)).expect("client"),
    );
    let auth = Arc::new(AuthStore::new(api));
    let gate = SessionGate::new(Arc::clone(&auth));

    assert_eq!(
        gate.before_each(&Route::Home).await,
        GateDecision::Redirect(Route::Login)
    );
    // Degraded to "checked and absent", not left unknown.
    assert!(auth.ready().await);
    assert!(!auth.is_authed().await);
}

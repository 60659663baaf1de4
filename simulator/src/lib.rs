//! In-process stand-in for the hosted relational store.
//!
//! Serves the same REST surface and change-feed WebSocket the client SDK
//! expects, backed by the engine's in-memory tables. Client integration
//! tests mount [`Api::router`] on an ephemeral listener; `dev-store` serves
//! it standalone for local development.

use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Path, State as AxumState};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{delete, get, post, put};
use axum::{Json, Router};
use tracing::{debug, info, warn};
use uuid::Uuid;

use stakebook_engine::mocks::MemoryStore;
use stakebook_engine::PointsStore;
use stakebook_types::api::{
    AdjustBalanceRequest, EnsureBalanceRequest, ErrorBody, SetBalanceRequest,
};
use stakebook_types::{Balance, ClaimRecord, DiaryEntry, StoreError, UserId};

/// The simulated store and its HTTP/WS API.
pub struct Api {
    store: Arc<MemoryStore>,
}

impl Api {
    pub fn new(store: Arc<MemoryStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> Arc<MemoryStore> {
        self.store.clone()
    }

    pub fn router(&self) -> Router {
        Router::new()
            .route("/healthz", get(healthz))
            .route("/balance/:user", get(get_balance))
            .route("/balance/:user", put(set_balance))
            .route("/balance/:user", delete(delete_balance))
            .route("/balance/:user/ensure", post(ensure_balance))
            .route("/balance/:user/adjust", post(adjust_balance))
            .route("/claims", post(append_claim))
            .route("/claims/:user", get(claims_for))
            .route("/entries", post(insert_entry))
            .route("/ws/balance/:user", get(balance_feed))
            .with_state(self.store.clone())
    }
}

fn store_error_response(err: StoreError) -> (StatusCode, Json<ErrorBody>) {
    let status = match err {
        StoreError::NotFound => StatusCode::NOT_FOUND,
        StoreError::Rejected(_) => StatusCode::BAD_REQUEST,
        StoreError::Timeout | StoreError::Transport(_) => StatusCode::SERVICE_UNAVAILABLE,
    };
    (
        status,
        Json(ErrorBody {
            error: err.to_string(),
        }),
    )
}

async fn healthz() -> &'static str {
    "ok"
}

async fn get_balance(
    AxumState(store): AxumState<Arc<MemoryStore>>,
    Path(user): Path<Uuid>,
) -> Result<Json<Balance>, (StatusCode, Json<ErrorBody>)> {
    store
        .balance_row(UserId(user))
        .map(Json)
        .ok_or_else(|| store_error_response(StoreError::NotFound))
}

async fn set_balance(
    AxumState(store): AxumState<Arc<MemoryStore>>,
    Path(user): Path<Uuid>,
    Json(body): Json<SetBalanceRequest>,
) -> Result<StatusCode, (StatusCode, Json<ErrorBody>)> {
    store
        .set_balance(UserId(user), body.points)
        .await
        .map(|_| StatusCode::NO_CONTENT)
        .map_err(store_error_response)
}

async fn delete_balance(
    AxumState(store): AxumState<Arc<MemoryStore>>,
    Path(user): Path<Uuid>,
) -> StatusCode {
    store.delete_balance(UserId(user)).await;
    StatusCode::NO_CONTENT
}

async fn ensure_balance(
    AxumState(store): AxumState<Arc<MemoryStore>>,
    Path(user): Path<Uuid>,
    Json(body): Json<EnsureBalanceRequest>,
) -> Result<Json<Balance>, (StatusCode, Json<ErrorBody>)> {
    let user = UserId(user);
    store
        .ensure_balance(user, body.initial)
        .await
        .map_err(store_error_response)?;
    store
        .balance_row(user)
        .map(Json)
        .ok_or_else(|| store_error_response(StoreError::NotFound))
}

async fn adjust_balance(
    AxumState(store): AxumState<Arc<MemoryStore>>,
    Path(user): Path<Uuid>,
    Json(body): Json<AdjustBalanceRequest>,
) -> Result<Json<Balance>, (StatusCode, Json<ErrorBody>)> {
    let user = UserId(user);
    store
        .adjust_balance(user, body.delta)
        .await
        .map_err(store_error_response)?;
    store
        .balance_row(user)
        .map(Json)
        .ok_or_else(|| store_error_response(StoreError::NotFound))
}

async fn append_claim(
    AxumState(store): AxumState<Arc<MemoryStore>>,
    Json(record): Json<ClaimRecord>,
) -> Result<StatusCode, (StatusCode, Json<ErrorBody>)> {
    store
        .append_claim(record)
        .await
        .map(|_| StatusCode::CREATED)
        .map_err(store_error_response)
}

async fn claims_for(
    AxumState(store): AxumState<Arc<MemoryStore>>,
    Path(user): Path<Uuid>,
) -> Result<Json<Vec<ClaimRecord>>, (StatusCode, Json<ErrorBody>)> {
    store
        .claims_for(UserId(user))
        .await
        .map(Json)
        .map_err(store_error_response)
}

async fn insert_entry(
    AxumState(store): AxumState<Arc<MemoryStore>>,
    Json(entry): Json<DiaryEntry>,
) -> Result<StatusCode, (StatusCode, Json<ErrorBody>)> {
    store
        .insert_entry(entry)
        .await
        .map(|_| StatusCode::CREATED)
        .map_err(store_error_response)
}

async fn balance_feed(
    AxumState(store): AxumState<Arc<MemoryStore>>,
    Path(user): Path<Uuid>,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| serve_feed(socket, store, UserId(user)))
}

/// Forwards the user's change events over the socket until either side
/// hangs up.
async fn serve_feed(mut socket: WebSocket, store: Arc<MemoryStore>, user: UserId) {
    let mut feed = match store.subscribe(user).await {
        Ok(feed) => feed,
        Err(err) => {
            warn!(%user, error = %err, "change feed subscription failed");
            return;
        }
    };
    info!(%user, "change feed attached");

    loop {
        tokio::select! {
            event = feed.recv() => {
                let Some(event) = event else { break };
                let payload = match serde_json::to_string(&event) {
                    Ok(payload) => payload,
                    Err(err) => {
                        warn!(%user, error = %err, "failed to encode change event");
                        continue;
                    }
                };
                if socket.send(Message::Text(payload)).await.is_err() {
                    break;
                }
            }
            msg = socket.recv() => {
                match msg {
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(_)) => {} // Feed is one-way; ignore client chatter.
                    Some(Err(err)) => {
                        debug!(%user, error = %err, "change feed socket error");
                        break;
                    }
                }
            }
        }
    }
    debug!(%user, "change feed detached");
}

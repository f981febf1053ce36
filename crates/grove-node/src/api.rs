//! HTTP API for Grove.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Bytes,
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Query, State,
    },
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use grove_forest::FrameSnapshot;
use grove_holders::HolderCache;
use grove_rounds::{RoundStore, WinnerLine, WinnerSink};
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::sync::watch;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{debug, info, warn};

use crate::runner::{RoundRunner, TriggerOutcome};

const DEBUG_SAMPLE: usize = 5;
const DEFAULT_ROUND_LIMIT: usize = 20;
const MAX_ROUND_LIMIT: usize = 100;

/// Shared state behind every handler.
pub struct NodeState {
    pub holders: HolderCache,
    pub rounds: Arc<dyn RoundStore>,
    pub winners: Arc<dyn WinnerSink>,
    pub runner: Arc<RoundRunner>,
    pub frames: watch::Receiver<Arc<FrameSnapshot>>,
    pub ws_interval: Duration,
}

type AppState = Arc<NodeState>;
type ApiResponse = (StatusCode, Json<Value>);

/// Build the API router.
pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health))
        // Holders
        .route("/api/wallets/current", get(wallets_current))
        .route("/api/debug/holders", get(debug_holders))
        // Rounds
        .route("/api/rounds", get(list_rounds))
        .route("/api/rounds/latest", get(latest_round))
        .route("/api/rounds/trigger", post(trigger_round))
        .route("/api/winners", post(write_winner))
        // Forest
        .route("/api/forest", get(forest_snapshot))
        .route("/ws/forest", get(ws_forest_handler))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

fn failure(status: StatusCode, error: impl ToString) -> ApiResponse {
    (status, Json(json!({ "ok": false, "error": error.to_string() })))
}

async fn health() -> &'static str {
    "OK"
}

// --- Holder endpoints ---

async fn wallets_current(State(state): State<AppState>) -> ApiResponse {
    match state.holders.current_holders().await {
        Ok(snapshot) => (
            StatusCode::OK,
            Json(json!({ "ok": true, "ids": snapshot.ids, "stale": snapshot.stale })),
        ),
        Err(e) => failure(StatusCode::SERVICE_UNAVAILABLE, e),
    }
}

async fn debug_holders(State(state): State<AppState>) -> ApiResponse {
    match state.holders.inspect().await {
        Ok(ids) => {
            let sample: Vec<&String> = ids.iter().take(DEBUG_SAMPLE).collect();
            (
                StatusCode::OK,
                Json(json!({ "ok": true, "count": ids.len(), "sample": sample, "ids": ids })),
            )
        }
        Err(e) => failure(StatusCode::INTERNAL_SERVER_ERROR, e),
    }
}

// --- Round endpoints ---

#[derive(Debug, Deserialize)]
struct RoundsQuery {
    limit: Option<usize>,
}

async fn list_rounds(State(state): State<AppState>, Query(query): Query<RoundsQuery>) -> ApiResponse {
    let limit = query.limit.unwrap_or(DEFAULT_ROUND_LIMIT).min(MAX_ROUND_LIMIT);
    match state.rounds.recent(limit) {
        Ok(rounds) => (StatusCode::OK, Json(json!({ "ok": true, "rounds": rounds }))),
        Err(e) => failure(StatusCode::INTERNAL_SERVER_ERROR, e),
    }
}

async fn latest_round(State(state): State<AppState>) -> ApiResponse {
    match state.rounds.latest() {
        Ok(round) => (StatusCode::OK, Json(json!({ "ok": true, "round": round }))),
        Err(e) => failure(StatusCode::INTERNAL_SERVER_ERROR, e),
    }
}

async fn trigger_round(State(state): State<AppState>) -> ApiResponse {
    match state.runner.clone().trigger_detached().await {
        Ok(TriggerOutcome::Busy) => (
            StatusCode::TOO_MANY_REQUESTS,
            Json(json!({ "ok": false, "msg": "busy" })),
        ),
        Ok(TriggerOutcome::Completed { round, winner_logged }) => (
            StatusCode::OK,
            Json(json!({
                "ok": true,
                "roundId": round.id,
                "winner": round.winner,
                "count": round.participants.len(),
                "winnerLogged": winner_logged,
            })),
        ),
        Err(e) => {
            warn!(error = %e, "Round trigger failed");
            let mut body = json!({ "ok": false, "error": e.to_string() });
            if let Some(winner) = e.winner() {
                body["winner"] = json!(winner);
            }
            (StatusCode::INTERNAL_SERVER_ERROR, Json(body))
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WinnerRequest {
    winner: Option<String>,
    round_id: Option<Value>,
    seed: Option<String>,
}

fn round_label(value: Option<Value>) -> Option<String> {
    match value? {
        Value::String(s) if !s.is_empty() => Some(s),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

async fn write_winner(State(state): State<AppState>, body: Bytes) -> ApiResponse {
    // Unparseable bodies are treated like empty ones.
    let req: WinnerRequest = serde_json::from_slice(&body).unwrap_or_default();
    let Some(winner) = req.winner.filter(|w| !w.is_empty()) else {
        return failure(StatusCode::BAD_REQUEST, "missing winner");
    };

    let line = WinnerLine::new(round_label(req.round_id), winner, req.seed);
    match state.winners.record(&line).await {
        Ok(()) => (
            StatusCode::OK,
            Json(json!({ "ok": true, "file": state.winners.location() })),
        ),
        Err(e) => {
            warn!(error = %e, "Failed to write winner line");
            failure(StatusCode::INTERNAL_SERVER_ERROR, e)
        }
    }
}

// --- Forest endpoints ---

async fn forest_snapshot(State(state): State<AppState>) -> Json<FrameSnapshot> {
    let snapshot = state.frames.borrow().clone();
    Json(snapshot.as_ref().clone())
}

async fn ws_forest_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(|socket| handle_forest_socket(socket, state))
}

async fn handle_forest_socket(mut socket: WebSocket, state: AppState) {
    info!("WebSocket client connected for forest frames");

    let mut interval = tokio::time::interval(state.ws_interval);
    let mut last_frame = None;

    loop {
        tokio::select! {
            msg = socket.recv() => {
                match msg {
                    Some(Ok(Message::Close(_))) | None => {
                        info!("WebSocket client disconnected");
                        break;
                    }
                    Some(Ok(Message::Ping(data))) => {
                        if let Err(e) = socket.send(Message::Pong(data)).await {
                            warn!("Failed to send pong: {}", e);
                            break;
                        }
                    }
                    Some(Ok(Message::Text(text))) => {
                        debug!("Received from client: {}", text.as_str());
                    }
                    Some(Err(e)) => {
                        warn!("WebSocket error: {}", e);
                        break;
                    }
                    _ => {}
                }
            }
            _ = interval.tick() => {
                let snapshot = state.frames.borrow().clone();
                if last_frame == Some(snapshot.frame) {
                    continue;
                }
                last_frame = Some(snapshot.frame);
                if let Err(e) = send_snapshot(&mut socket, &snapshot).await {
                    warn!("Failed to send forest frame: {}", e);
                    break;
                }
            }
        }
    }
}

async fn send_snapshot(socket: &mut WebSocket, snapshot: &FrameSnapshot) -> Result<(), axum::Error> {
    let json = serde_json::to_string(snapshot).map_err(axum::Error::new)?;
    socket.send(Message::Text(json.into())).await
}

//! `GET /ws/{client_id}` — a long-lived WebSocket a client can use to
//! subscribe to several jobs' event streams at once, instead of opening
//! one SSE connection per turn.
//!
//! Command envelope in: `{"command": "...", "data": {...}}`.
//! Event envelope out: `{"event": "...", "data": {...}}`.
//!
//! Commands: `ping`, `subscribe_job` (`data.job_id`), `unsubscribe_job`
//! (`data.job_id`). Events: `pong`, `job_update`, `message_update`,
//! `chat_update`, `error`.

use std::collections::HashMap;

use axum::extract::ws::{Message, WebSocket};
use axum::extract::{Path, State, WebSocketUpgrade};
use axum::response::IntoResponse;
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::runtime::jobs::JobEvent;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
struct ClientCommand {
    command: String,
    #[serde(default)]
    data: serde_json::Value,
}

/// `GET /ws/{client_id}` — upgrade to a WebSocket for job-subscription
/// commands. `client_id` is caller-chosen and only used for log
/// correlation; it does not gate access.
pub async fn job_ws(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    Path(client_id): Path<String>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state, client_id))
}

async fn handle_socket(socket: WebSocket, state: AppState, client_id: String) {
    let (mut ws_sink, mut ws_stream) = socket.split();
    let (outbound_tx, mut outbound_rx) = mpsc::channel::<serde_json::Value>(64);

    let writer = tokio::spawn(async move {
        while let Some(event) = outbound_rx.recv().await {
            let Ok(text) = serde_json::to_string(&event) else { continue };
            if ws_sink.send(Message::Text(text)).await.is_err() {
                break;
            }
        }
    });

    let mut subscriptions: HashMap<Uuid, JoinHandle<()>> = HashMap::new();

    while let Some(Ok(msg)) = ws_stream.next().await {
        match msg {
            Message::Text(text) => {
                handle_command(&state, &client_id, &text, &outbound_tx, &mut subscriptions).await;
            }
            Message::Close(_) => break,
            Message::Ping(_) | Message::Pong(_) => {}
            _ => {}
        }
    }

    for (_, handle) in subscriptions.drain() {
        handle.abort();
    }
    writer.abort();
    tracing::debug!(client_id = %client_id, "websocket client disconnected");
}

async fn handle_command(
    state: &AppState,
    client_id: &str,
    text: &str,
    outbound: &mpsc::Sender<serde_json::Value>,
    subscriptions: &mut HashMap<Uuid, JoinHandle<()>>,
) {
    let Ok(cmd) = serde_json::from_str::<ClientCommand>(text) else {
        let _ = outbound
            .send(event("error", serde_json::json!({ "message": "malformed command envelope" })))
            .await;
        return;
    };

    match cmd.command.as_str() {
        "ping" => {
            let _ = outbound.send(event("pong", cmd.data)).await;
        }
        "subscribe_job" => {
            let Some(job_id) = cmd.data.get("job_id").and_then(|v| v.as_str()).and_then(|s| s.parse::<Uuid>().ok())
            else {
                let _ = outbound.send(event("error", serde_json::json!({ "message": "subscribe_job requires data.job_id" }))).await;
                return;
            };

            if subscriptions.contains_key(&job_id) {
                return;
            }

            let Some(mut rx) = state.jobs.subscribe(job_id) else {
                let _ = outbound.send(event("error", serde_json::json!({ "message": "unknown job_id", "job_id": job_id }))).await;
                return;
            };

            if let Some(current) = state.jobs.get(job_id) {
                let _ = outbound.send(event("job_update", serde_json::to_value(&current).unwrap_or_default())).await;
            }

            let forward_tx = outbound.clone();
            let handle = tokio::spawn(async move {
                loop {
                    match rx.recv().await {
                        Ok(JobEvent::JobUpdate(job)) => {
                            let terminal = job.status.is_terminal();
                            let _ = forward_tx.send(event("job_update", serde_json::to_value(&job).unwrap_or_default())).await;
                            if terminal {
                                break;
                            }
                        }
                        Ok(JobEvent::MessageUpdate { delta }) => {
                            let _ = forward_tx.send(event("message_update", serde_json::json!({ "delta": delta }))).await;
                        }
                        Err(_) => break,
                    }
                }
            });
            subscriptions.insert(job_id, handle);
            tracing::debug!(client_id, %job_id, "subscribed to job");
        }
        "unsubscribe_job" => {
            let Some(job_id) = cmd.data.get("job_id").and_then(|v| v.as_str()).and_then(|s| s.parse::<Uuid>().ok())
            else {
                let _ = outbound.send(event("error", serde_json::json!({ "message": "unsubscribe_job requires data.job_id" }))).await;
                return;
            };
            if let Some(handle) = subscriptions.remove(&job_id) {
                handle.abort();
            }
        }
        other => {
            let _ = outbound.send(event("error", serde_json::json!({ "message": format!("unknown command '{other}'") }))).await;
        }
    }
}

fn event(name: &str, data: serde_json::Value) -> serde_json::Value {
    serde_json::json!({ "event": name, "data": data })
}

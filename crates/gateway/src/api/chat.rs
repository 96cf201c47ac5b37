//! Chat API — the primary interface for running agent turns.
//!
//! - `POST /v1/chat`                  — ephemeral, unsaved agent, synchronous
//! - `POST /v1/chat/agents/{id}`      — same, against a persisted agent
//! - `POST /v1/chat/stream`           — SSE: `job_update`/`message_update`
//!   events as the turn's backing job progresses

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::{IntoResponse, Json, Response};
use futures_util::stream::Stream;
use serde::Deserialize;
use uuid::Uuid;

use lop_domain::job::JobStatus;

use crate::runtime::job_exec::run_job;
use crate::runtime::jobs::JobEvent;
use crate::runtime::session_lock::SessionBusy;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    #[serde(default)]
    pub hosting: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
    pub prompt: String,
    #[serde(default)]
    pub stream: bool,
    #[serde(default)]
    pub context: Option<serde_json::Value>,
    #[serde(default)]
    pub options: Option<serde_json::Value>,
    #[serde(default)]
    pub attachments: Option<serde_json::Value>,
}

fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    (status, Json(serde_json::json!({ "error": message.into() }))).into_response()
}

/// `POST /v1/chat` — run one turn against a fresh, unsaved agent and wait
/// for the result.
pub async fn chat(State(state): State<AppState>, Json(body): Json<ChatRequest>) -> Response {
    run_sync(state, None, body).await
}

/// `POST /v1/chat/agents/{id}` — same as [`chat`] but against a persisted
/// agent: the turn is appended to its conversation and saved back
/// afterward, sandbox namespace included.
pub async fn chat_agent(State(state): State<AppState>, Path(id): Path<Uuid>, Json(body): Json<ChatRequest>) -> Response {
    if state.agents.get(id).is_err() {
        return error_response(StatusCode::NOT_FOUND, "agent not found");
    }
    run_sync(state, Some(id), body).await
}

async fn run_sync(state: AppState, agent_id: Option<Uuid>, body: ChatRequest) -> Response {
    let session_key = agent_id.map(|id| id.to_string()).unwrap_or_else(|| "chat:anonymous".to_string());
    let _permit = match state.session_locks.acquire(&session_key).await {
        Ok(permit) => permit,
        Err(SessionBusy) => return error_response(StatusCode::TOO_MANY_REQUESTS, SessionBusy.to_string()),
    };

    let job_id = state.jobs.submit(agent_id, body.prompt.clone(), body.model.clone(), body.hosting.clone());
    run_job(state.clone(), job_id).await;

    match state.jobs.get(job_id) {
        Some(job) if job.status == JobStatus::Completed => {
            let result = job.result.expect("a completed job always carries a result");
            Json(serde_json::json!({
                "response": result.response,
                "context": result.context,
                "stats": result.stats,
            }))
            .into_response()
        }
        Some(job) => error_response(
            StatusCode::UNPROCESSABLE_ENTITY,
            job.error.unwrap_or_else(|| format!("turn ended as {:?}", job.status)),
        ),
        None => error_response(StatusCode::INTERNAL_SERVER_ERROR, "job vanished before completion"),
    }
}

/// `POST /v1/chat/stream` — SSE: a `job_update` event is pushed at each job
/// state transition (queued → running → terminal); the terminal event
/// carries the job's final result.
pub async fn chat_stream(State(state): State<AppState>, Json(body): Json<ChatRequest>) -> Response {
    let session_key = "chat:anonymous".to_string();
    let permit = match state.session_locks.acquire(&session_key).await {
        Ok(permit) => permit,
        Err(SessionBusy) => return error_response(StatusCode::TOO_MANY_REQUESTS, SessionBusy.to_string()),
    };

    let job_id = state.jobs.submit(None, body.prompt.clone(), body.model.clone(), body.hosting.clone());
    let rx = state.jobs.subscribe(job_id).expect("job was just submitted");

    let spawn_state = state.clone();
    tokio::spawn(async move {
        run_job(spawn_state, job_id).await;
    });

    Sse::new(sse_stream(rx, permit)).keep_alive(KeepAlive::default()).into_response()
}

fn sse_stream(
    mut rx: tokio::sync::broadcast::Receiver<JobEvent>,
    _permit: tokio::sync::OwnedSemaphorePermit,
) -> impl Stream<Item = Result<Event, std::convert::Infallible>> {
    async_stream::stream! {
        loop {
            match rx.recv().await {
                Ok(JobEvent::JobUpdate(job)) => {
                    let terminal = job.status.is_terminal();
                    yield Ok(Event::default()
                        .event("job_update")
                        .data(serde_json::to_string(&job).unwrap_or_default()));
                    if terminal {
                        break;
                    }
                }
                Ok(JobEvent::MessageUpdate { delta }) => {
                    yield Ok(Event::default().event("message_update").data(delta));
                }
                Err(_) => break,
            }
        }
    }
}

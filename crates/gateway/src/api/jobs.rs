//! Job CRUD — `/v1/jobs*`. Submitting a job runs one executor-loop turn on
//! a spawned task via [`crate::runtime::job_exec::run_job`]; the submitting
//! request returns immediately with the job id.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use serde::Deserialize;
use uuid::Uuid;

use lop_domain::job::JobStatus;

use crate::runtime::job_exec::run_job;
use crate::runtime::jobs::JobFilter;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct SubmitJobRequest {
    #[serde(default)]
    pub agent_id: Option<Uuid>,
    pub prompt: String,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub hosting: Option<String>,
}

fn not_found(message: &str) -> Response {
    (StatusCode::NOT_FOUND, Json(serde_json::json!({ "error": message }))).into_response()
}

pub async fn submit(State(state): State<AppState>, Json(body): Json<SubmitJobRequest>) -> Response {
    if let Some(agent_id) = body.agent_id {
        if state.agents.get(agent_id).is_err() {
            return not_found("agent not found");
        }
    }

    let job_id = state.jobs.submit(body.agent_id, body.prompt, body.model, body.hosting);
    tokio::spawn(run_job(state.clone(), job_id));

    (StatusCode::ACCEPTED, Json(serde_json::json!({ "job_id": job_id }))).into_response()
}

pub async fn get(State(state): State<AppState>, Path(id): Path<Uuid>) -> Response {
    match state.jobs.get(id) {
        Some(job) => Json(job).into_response(),
        None => not_found("job not found"),
    }
}

#[derive(Debug, Deserialize, Default)]
pub struct ListJobsQuery {
    pub status: Option<String>,
    pub agent_id: Option<Uuid>,
}

pub async fn list(State(state): State<AppState>, Query(query): Query<ListJobsQuery>) -> Response {
    let status = match query.status.as_deref() {
        None => None,
        Some("pending") => Some(JobStatus::Pending),
        Some("running") => Some(JobStatus::Running),
        Some("completed") => Some(JobStatus::Completed),
        Some("failed") => Some(JobStatus::Failed),
        Some("cancelled") => Some(JobStatus::Cancelled),
        Some(other) => {
            return (
                StatusCode::BAD_REQUEST,
                Json(serde_json::json!({ "error": format!("unknown status '{other}'") })),
            )
                .into_response();
        }
    };

    let jobs = state.jobs.list(&JobFilter { status, agent_id: query.agent_id });
    Json(jobs).into_response()
}

pub async fn cancel(State(state): State<AppState>, Path(id): Path<Uuid>) -> Response {
    let job = match state.jobs.get(id) {
        Some(job) => job,
        None => return not_found("job not found"),
    };

    if job.status.is_terminal() {
        return Json(job).into_response();
    }

    state.cancel_map.cancel(&id.to_string());
    match state.jobs.mark_cancelled(id) {
        Some(job) => Json(job).into_response(),
        None => not_found("job not found"),
    }
}

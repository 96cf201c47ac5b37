//! Agent CRUD — `/v1/agents*`. Thin wrappers over [`lop_registry::AgentRegistry`];
//! every response is wrapped in the standard envelope (see [`super::envelope`]).

use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use serde::Deserialize;
use uuid::Uuid;

use lop_registry::{export_agent, import_agent, ListFilter, SortBy, SortOrder};

use super::envelope;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ListAgentsQuery {
    pub name: Option<String>,
    pub sort_by: Option<String>,
    pub sort_order: Option<String>,
    #[serde(default)]
    pub page: usize,
    #[serde(default)]
    pub page_size: usize,
}

fn parse_sort_by(raw: Option<&str>) -> Option<SortBy> {
    match raw {
        Some("name") => Some(SortBy::Name),
        Some("created_date") => Some(SortBy::CreatedDate),
        Some("last_message_datetime") => Some(SortBy::LastMessageDatetime),
        _ => None,
    }
}

fn parse_sort_order(raw: Option<&str>) -> Option<SortOrder> {
    match raw {
        Some("asc") => Some(SortOrder::Asc),
        Some("desc") => Some(SortOrder::Desc),
        _ => None,
    }
}

pub async fn list(State(state): State<AppState>, Query(query): Query<ListAgentsQuery>) -> Response {
    let filter = ListFilter {
        name_contains: query.name,
        sort_by: parse_sort_by(query.sort_by.as_deref()),
        sort_order: parse_sort_order(query.sort_order.as_deref()),
        page: query.page,
        page_size: query.page_size,
    };
    envelope::ok("ok", Some(state.agents.list(&filter)))
}

#[derive(Debug, Deserialize)]
pub struct CreateAgentRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default = "default_system_prompt")]
    pub system_prompt: String,
}

fn default_system_prompt() -> String {
    "You are a helpful agent.".to_string()
}

pub async fn create(State(state): State<AppState>, axum::Json(body): axum::Json<CreateAgentRequest>) -> Response {
    match state.agents.create(body.name, body.system_prompt, state.config.max_learnings_history) {
        Ok((id, _)) => envelope::ok("agent created", Some(serde_json::json!({ "id": id }))),
        Err(e) => envelope::error(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
    }
}

pub async fn get(State(state): State<AppState>, Path(id): Path<Uuid>) -> Response {
    match state.agents.get(id) {
        Ok((meta, agent_state)) => envelope::ok("ok", Some(serde_json::json!({ "meta": meta, "state": agent_state }))),
        Err(_) => envelope::error(StatusCode::NOT_FOUND, "agent not found"),
    }
}

#[derive(Debug, Deserialize)]
pub struct PatchAgentRequest {
    #[serde(default)]
    pub name: Option<String>,
}

pub async fn patch(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    axum::Json(body): axum::Json<PatchAgentRequest>,
) -> Response {
    if state.agents.get(id).is_err() {
        return envelope::error(StatusCode::NOT_FOUND, "agent not found");
    }
    match state.agents.rename(id, body.name) {
        Ok(()) => envelope::ok::<()>("agent updated", None),
        Err(e) => envelope::error(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
    }
}

pub async fn delete(State(state): State<AppState>, Path(id): Path<Uuid>) -> Response {
    match state.agents.delete(id) {
        Ok(()) => envelope::ok::<()>("agent deleted", None),
        Err(e) => envelope::error(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
    }
}

pub async fn get_conversation(State(state): State<AppState>, Path(id): Path<Uuid>) -> Response {
    match state.agents.get(id) {
        Ok((_, agent_state)) => envelope::ok("ok", Some(agent_state.conversation)),
        Err(_) => envelope::error(StatusCode::NOT_FOUND, "agent not found"),
    }
}

pub async fn clear_conversation(State(state): State<AppState>, Path(id): Path<Uuid>) -> Response {
    let (_, mut agent_state) = match state.agents.get(id) {
        Ok(pair) => pair,
        Err(_) => return envelope::error(StatusCode::NOT_FOUND, "agent not found"),
    };

    agent_state.conversation = vec![lop_domain::conversation::ConversationRecord::system_prompt(
        agent_state.agent_system_prompt.clone(),
    )];

    match state.agents.update(id, &agent_state, None) {
        Ok(()) => envelope::ok::<()>("conversation cleared", None),
        Err(e) => envelope::error(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
    }
}

pub async fn get_history(State(state): State<AppState>, Path(id): Path<Uuid>) -> Response {
    match state.agents.get(id) {
        Ok((_, agent_state)) => envelope::ok("ok", Some(agent_state.execution_history)),
        Err(_) => envelope::error(StatusCode::NOT_FOUND, "agent not found"),
    }
}

pub async fn get_system_prompt(State(state): State<AppState>, Path(id): Path<Uuid>) -> Response {
    match state.agents.get(id) {
        Ok((_, agent_state)) => {
            envelope::ok("ok", Some(serde_json::json!({ "system_prompt": agent_state.agent_system_prompt })))
        }
        Err(_) => envelope::error(StatusCode::NOT_FOUND, "agent not found"),
    }
}

#[derive(Debug, Deserialize)]
pub struct SystemPromptRequest {
    pub system_prompt: String,
}

pub async fn put_system_prompt(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    axum::Json(body): axum::Json<SystemPromptRequest>,
) -> Response {
    let (_, mut agent_state) = match state.agents.get(id) {
        Ok(pair) => pair,
        Err(_) => return envelope::error(StatusCode::NOT_FOUND, "agent not found"),
    };

    agent_state.agent_system_prompt = body.system_prompt;

    match state.agents.update(id, &agent_state, None) {
        Ok(()) => envelope::ok::<()>("system prompt updated", None),
        Err(e) => envelope::error(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
    }
}

pub async fn import(State(state): State<AppState>, body: Bytes) -> Response {
    match import_agent(&state.agents, &body) {
        Ok(id) => envelope::ok("agent imported", Some(serde_json::json!({ "id": id }))),
        Err(e) => envelope::error(StatusCode::BAD_REQUEST, e.to_string()),
    }
}

pub async fn export(State(state): State<AppState>, Path(id): Path<Uuid>) -> Response {
    match export_agent(&state.agents, id) {
        Ok(bytes) => (StatusCode::OK, [(header::CONTENT_TYPE, "application/zip")], bytes).into_response(),
        Err(e) => envelope::error(StatusCode::NOT_FOUND, e.to_string()),
    }
}

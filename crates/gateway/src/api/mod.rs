pub mod agents;
pub mod auth;
pub mod chat;
pub mod envelope;
pub mod health;
pub mod jobs;
pub mod stub;

use axum::middleware;
use axum::routing::{delete, get, patch, post, put};
use axum::Router;

use crate::state::AppState;

/// Build the full API router.
///
/// Routes are split into **public** (no auth required — health probe and
/// the websocket upgrade, which its own handler may gate independently)
/// and **protected** (gated behind the bearer-token middleware configured
/// via `config.server.api_token_env`).
pub fn router(state: AppState) -> Router<AppState> {
    let public = Router::new()
        .route("/health", get(health::health))
        .route("/ws/:client_id", get(crate::transport::ws::job_ws));

    let protected = Router::new()
        // Chat
        .route("/v1/chat", post(chat::chat))
        .route("/v1/chat/stream", post(chat::chat_stream))
        .route("/v1/chat/agents/:id", post(chat::chat_agent))
        // Jobs
        .route("/v1/jobs", post(jobs::submit))
        .route("/v1/jobs", get(jobs::list))
        .route("/v1/jobs/:id", get(jobs::get))
        .route("/v1/jobs/:id/cancel", post(jobs::cancel))
        // Agents
        .route("/v1/agents", get(agents::list))
        .route("/v1/agents", post(agents::create))
        .route("/v1/agents/import", post(agents::import))
        .route("/v1/agents/:id", get(agents::get))
        .route("/v1/agents/:id", patch(agents::patch))
        .route("/v1/agents/:id", delete(agents::delete))
        .route("/v1/agents/:id/export", get(agents::export))
        .route("/v1/agents/:id/conversation", get(agents::get_conversation))
        .route("/v1/agents/:id/conversation", delete(agents::clear_conversation))
        .route("/v1/agents/:id/history", get(agents::get_history))
        .route("/v1/agents/:id/system-prompt", get(agents::get_system_prompt))
        .route("/v1/agents/:id/system-prompt", put(agents::put_system_prompt))
        // Config / credentials / models — external collaborators, stubbed
        .route("/v1/config", get(stub::list_config))
        .route("/v1/config/:key", get(stub::get_config))
        .route("/v1/config/:key", put(stub::put_config))
        .route("/v1/credentials", get(stub::list_credentials))
        .route("/v1/credentials/:key", put(stub::put_credential))
        .route("/v1/credentials/:key", delete(stub::delete_credential))
        .route("/v1/models", get(stub::list_models))
        // Apply API auth middleware to all protected routes.
        .route_layer(middleware::from_fn_with_state(state, auth::require_api_token));

    public
        .merge(protected)
        .layer(tower_http::trace::TraceLayer::new_for_http())
}

//! AppState construction extracted from `main.rs`.
//!
//! This module exposes the single public function the CLI's `serve` and
//! `run` commands share so they can boot the full runtime without an HTTP
//! listener.

use std::sync::Arc;

use anyhow::Context;
use sha2::{Digest, Sha256};

use lop_domain::config::Config;
use lop_providers::{MockProvider, ProviderRegistry};
use lop_registry::AgentRegistry;
use lop_tools::build_registry;

use crate::runtime::cancel::CancelMap;
use crate::runtime::jobs::JobStore;
use crate::runtime::session_lock::SessionLockMap;
use crate::state::AppState;

/// Initialize every subsystem and return a fully-wired [`AppState`]. This is
/// the shared "boot" path used by `serve` and `run`.
pub async fn build_app_state(config: Arc<Config>) -> anyhow::Result<AppState> {
    // ── Tool registry ─────────────────────────────────────────────────
    let tools = Arc::new(build_registry(&config.tool_providers));
    tracing::info!("tool registry ready");

    // ── LLM providers ─────────────────────────────────────────────────
    // Concrete wire adapters are an external collaborator (see DESIGN.md);
    // a scriptable mock stands in so the server boots with a usable default
    // until a real `LlmProvider` is registered by the embedding deployment.
    let mut registry = ProviderRegistry::new();
    registry.register(Arc::new(MockProvider::new(
        config.hosting.clone(),
        vec!["no LLM provider configured".to_string()],
    )));
    let llm = Arc::new(registry);
    tracing::info!(providers = llm.len(), "LLM provider registry ready");

    // ── Agent registry (on-disk, one directory per agent) ────────────
    let agents = Arc::new(AgentRegistry::new(&config.config_dir).context("loading agent registry")?);
    tracing::info!(path = %config.config_dir.display(), "agent registry ready");

    // ── Job manager ───────────────────────────────────────────────────
    let jobs = Arc::new(JobStore::default());

    // ── Cancellation + session locks ─────────────────────────────────
    let cancel_map = Arc::new(CancelMap::new());
    let session_locks = Arc::new(SessionLockMap::new());
    tracing::info!("job manager, cancel map, session lock map ready");

    // ── API token (read once, hash for constant-time comparison) ────
    let api_token_hash = resolve_bearer_token_hash(
        config.server.api_token_env.as_deref(),
        "API",
    );
    let admin_token_hash = resolve_bearer_token_hash(
        config.server.admin_token_env.as_deref(),
        "admin",
    );

    Ok(AppState {
        config,
        llm,
        tools,
        agents,
        jobs,
        cancel_map,
        session_locks,
        api_token_hash,
        admin_token_hash,
    })
}

/// Read an optional bearer token from the named environment variable and
/// hash it for constant-time comparison at request time. Returns `None`
/// (auth disabled) when no env var is configured or it is unset/empty.
fn resolve_bearer_token_hash(env_var: Option<&str>, label: &str) -> Option<Vec<u8>> {
    let env_var = env_var?;
    match std::env::var(env_var) {
        Ok(token) if !token.is_empty() => {
            tracing::info!(env_var = %env_var, label, "bearer-token auth enabled");
            Some(Sha256::digest(token.as_bytes()).to_vec())
        }
        _ => {
            tracing::warn!(
                env_var = %env_var,
                label,
                "bearer-token auth DISABLED — set the env var to enable"
            );
            None
        }
    }
}

/// Spawn the long-running background tokio tasks (session-lock pruning).
/// Call this **after** [`build_app_state`] when running the HTTP server.
/// CLI one-shot commands (`run`) skip this.
pub fn spawn_background_tasks(state: &AppState) {
    let session_locks = state.session_locks.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(std::time::Duration::from_secs(60));
        loop {
            interval.tick().await;
            session_locks.prune_idle();
        }
    });
    tracing::info!("background tasks spawned");
}

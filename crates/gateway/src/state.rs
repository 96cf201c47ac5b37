use std::sync::Arc;

use lop_domain::config::Config;
use lop_providers::ProviderRegistry;
use lop_registry::AgentRegistry;
use lop_tools::ToolRegistry;

use crate::runtime::cancel::CancelMap;
use crate::runtime::jobs::JobStore;
use crate::runtime::session_lock::SessionLockMap;

/// Shared application state passed to all API handlers.
///
/// Fields are grouped by concern:
/// - **Core services** — config, LLM providers, tool registry
/// - **Agent store** — the on-disk agent registry
/// - **Runtime** — job manager, cancellation, per-agent session locks
/// - **Security** — the API bearer token hash computed once at startup
#[derive(Clone)]
pub struct AppState {
    // ── Core services ─────────────────────────────────────────────────
    pub config: Arc<Config>,
    pub llm: Arc<ProviderRegistry>,
    pub tools: Arc<ToolRegistry>,

    // ── Agent store ───────────────────────────────────────────────────
    pub agents: Arc<AgentRegistry>,

    // ── Runtime ───────────────────────────────────────────────────────
    pub jobs: Arc<JobStore>,
    pub cancel_map: Arc<CancelMap>,
    pub session_locks: Arc<SessionLockMap>,

    // ── Security (startup-computed) ───────────────────────────────────
    /// SHA-256 hash of the API bearer token. `None` = dev mode (no auth
    /// enforced on protected routes).
    pub api_token_hash: Option<Vec<u8>>,
    /// SHA-256 hash of the admin bearer token. `None` = admin routes
    /// accessible without separate auth.
    pub admin_token_hash: Option<Vec<u8>>,
}

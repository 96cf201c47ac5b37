//! Embedded code-execution sandbox: a per-agent persistent `rhai` engine
//! exposing the Tool Registry as `tools.<name>(...)`, with namespace
//! snapshotting for cross-turn persistence.

mod annotate;
mod namespace;
mod sandbox;

pub use annotate::{annotate_code, AGENT_GENERATED_CODE_SENTINEL};
pub use namespace::{json_to_scope, scope_to_json};
pub use sandbox::{CodeSandbox, ExecutionOutcome};

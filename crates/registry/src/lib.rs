//! The Agent Registry: persists `AgentState` and a code-sandbox namespace
//! snapshot per agent id, with list/create/read/update/delete and zip
//! import/export.

pub mod export;
pub mod store;

pub use export::{export_agent, import_agent, AgentManifest};
pub use store::{AgentMeta, AgentRegistry, ListFilter, SortBy, SortOrder, REFRESH_WINDOW};

use serde::{Deserialize, Serialize};

/// Machine-readable account of one windowing/summarization pass over an
/// agent's conversation, returned by the gateway's conversation report
/// endpoint for introspection.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConversationReport {
    pub record_count: usize,
    pub windowed: bool,
    pub records_summarized: usize,
    pub cache_hints_applied: usize,
}

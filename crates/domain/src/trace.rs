use serde::Serialize;

/// Structured trace events emitted across the runtime's crates. Each
/// variant is logged through [`TraceEvent::emit`] as a single `tracing`
/// event carrying its JSON encoding, so a log pipeline can index on
/// `trace_event` without parsing prose.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event")]
pub enum TraceEvent {
    TurnStarted {
        agent_id: String,
        turn_index: usize,
    },
    TurnClassified {
        agent_id: String,
        task_type: String,
        relative_effort: String,
        planning_required: bool,
    },
    ActionDispatched {
        agent_id: String,
        action: String,
    },
    SafetyVerdict {
        agent_id: String,
        verdict: String,
        mode: String,
    },
    ConfirmationRequested {
        agent_id: String,
        confirmation_id: String,
    },
    ConfirmationResolved {
        agent_id: String,
        confirmation_id: String,
        approved: bool,
    },
    ConversationCompacted {
        agent_id: String,
        turns_compacted: usize,
        turns_kept: usize,
    },
    LlmRequest {
        provider: String,
        model: String,
        streaming: bool,
        duration_ms: u64,
        prompt_tokens: Option<u32>,
        completion_tokens: Option<u32>,
    },
    JobCreated {
        job_id: String,
        agent_id: Option<String>,
    },
    JobStatusChanged {
        job_id: String,
        status: String,
    },
    JobStreamSubscribed {
        job_id: String,
        transport: String,
    },
}

impl TraceEvent {
    pub fn emit(&self) {
        let json = serde_json::to_string(self).unwrap_or_default();
        tracing::info!(trace_event = %json, "lop_event");
    }
}

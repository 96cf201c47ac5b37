//! Shared job-execution path. Wires one submitted [`lop_domain::job::Job`]
//! to one executor-loop turn and writes the outcome back to the
//! [`crate::runtime::jobs::JobStore`] — and, when the job addresses a
//! persisted agent, back to the agent registry.
//!
//! Used identically by the synchronous `/v1/chat` handler (awaited
//! directly) and the asynchronous `/v1/jobs` endpoint (spawned as a
//! background task).

use lop_domain::agent_state::AgentState;
use lop_domain::job::{Job, JobResult, JobStats};
use lop_sandbox::CodeSandbox;
use uuid::Uuid;

use crate::runtime::executor::{run_turn, TurnContext, TurnOutcome};
use crate::runtime::safety::SafetyMode;
use crate::state::AppState;

/// Run the executor loop for `job_id` to completion and persist the
/// outcome. No-op if the job id is unknown (nothing to run).
pub async fn run_job(state: AppState, job_id: Uuid) {
    let job = match state.jobs.get(job_id) {
        Some(job) => job,
        None => return,
    };

    let cancel = state.cancel_map.register(&job_id.to_string());
    state.jobs.mark_running(job_id);

    match execute(&state, &job, cancel).await {
        Ok(Outcome::Finished(result)) => {
            state.jobs.mark_completed(job_id, result);
        }
        Ok(Outcome::Cancelled) => {
            state.jobs.mark_cancelled(job_id);
        }
        Ok(Outcome::Blocked(message)) => {
            state.jobs.mark_failed(job_id, message);
        }
        Err(err) => {
            state.jobs.mark_failed(job_id, err.to_string());
        }
    }

    state.cancel_map.remove(&job_id.to_string());
}

enum Outcome {
    Finished(JobResult),
    Cancelled,
    Blocked(String),
}

async fn execute(
    state: &AppState,
    job: &Job,
    cancel: crate::runtime::cancel::CancelToken,
) -> anyhow::Result<Outcome> {
    let provider = state.llm.resolve(job.hosting.as_deref())?;
    let tools = state.tools.as_ref();
    let sandbox = CodeSandbox::new(tools);
    let store = lop_contextpack::ConversationStore::new(
        state.config.conversation_length,
        state.config.detail_length,
    );

    let (mut agent_state, workspace_root, sandbox_snapshot) = match job.agent_id {
        Some(id) => {
            let (_, agent_state) = state.agents.get(id)?;
            let snapshot = state.agents.get_sandbox_snapshot(id)?;
            (agent_state, state.agents.workspace_dir(id)?, snapshot)
        }
        None => {
            let workspace_root = std::env::temp_dir().join(format!("lop-job-{}", job.id));
            tokio::fs::create_dir_all(&workspace_root).await?;
            (
                AgentState::new("You are a helpful agent.", state.config.max_learnings_history),
                workspace_root,
                None,
            )
        }
    };

    if let Some(snapshot) = &sandbox_snapshot {
        sandbox.restore(snapshot);
    }

    let mut config = state.config.as_ref().clone();
    if let Some(model) = &job.model {
        config.model = model.clone();
    }

    let ctx = TurnContext {
        agent_id: job.agent_id.unwrap_or(job.id),
        config: &config,
        provider,
        tools,
        sandbox: &sandbox,
        conversation_store: &store,
        workspace_root,
        safety_mode: if config.can_prompt_user {
            SafetyMode::PromptUser
        } else {
            SafetyMode::ConversationConfirm
        },
        cancel,
    };

    let outcome = run_turn(&ctx, &mut agent_state, &job.prompt).await?;

    if let Some(id) = job.agent_id {
        let snapshot = sandbox.snapshot();
        state.agents.update(id, &agent_state, Some(&snapshot))?;
    }

    Ok(match outcome {
        TurnOutcome::Finished { response, .. } => Outcome::Finished(JobResult {
            response,
            context: agent_state.conversation.iter().map(|r| r.content.clone()).collect(),
            stats: JobStats {
                turns: agent_state.execution_history.len() as u32,
                input_tokens: agent_state.token_usage.prompt_tokens,
                output_tokens: agent_state.token_usage.completion_tokens,
                cost: agent_state.token_usage.cost_usd,
            },
        }),
        TurnOutcome::Cancelled { .. } | TurnOutcome::Interrupted => Outcome::Cancelled,
        TurnOutcome::ConfirmationRequired { message } => Outcome::Blocked(message),
    })
}

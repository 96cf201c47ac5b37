//! The Executor Loop: one user turn in, zero-or-more dispatched actions,
//! culminating in DONE/ASK/BYE or an early CONFIRMATION_REQUIRED/CANCELLED/
//! INTERRUPTED/ERROR outcome.
//!
//! Phases, in order: interrupt check, classification, conditional planning,
//! the action loop itself (propose → interpret → safety-audit → dispatch →
//! conditional reflection → summarization sweep), then one final model call
//! that produces the user-facing answer.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use lop_domain::action::{Action, ExecutionType, Status};
use lop_domain::agent_state::AgentState;
use lop_domain::classification::{parse_classification, RequestClassification};
use lop_domain::config::Config;
use lop_domain::conversation::ConversationRecord;
use lop_domain::error::{Error, Result};
use lop_domain::execution::ExecutionResult;
use lop_domain::response_schema::ResponseSchema;
use lop_domain::tool::Message;
use lop_providers::{ChatRequest, ChatResponse, LlmProvider};
use lop_sandbox::CodeSandbox;
use lop_tools::ToolRegistry;
use uuid::Uuid;

use crate::file_io;
use crate::runtime::cancel::CancelToken;
use crate::runtime::safety::{self, SafetyMode, SafetyOutcome};

const MAX_ACTION_LOOP_STEPS: usize = 25;
/// §4.5.c: READ refuses files above this size, recommending CODE instead.
const READ_SIZE_CAP_BYTES: u64 = 24 * 1024;
const MODEL_CALL_MAX_ATTEMPTS: u32 = 3;
const MODEL_CALL_BASE_BACKOFF: Duration = Duration::from_secs(1);

/// Everything one call to [`run_turn`] needs that isn't the turn's own
/// conversation state.
pub struct TurnContext<'a> {
    pub agent_id: Uuid,
    pub config: &'a Config,
    pub provider: Arc<dyn LlmProvider>,
    pub tools: &'a ToolRegistry,
    pub sandbox: &'a CodeSandbox,
    pub conversation_store: &'a lop_contextpack::ConversationStore,
    pub workspace_root: PathBuf,
    pub safety_mode: SafetyMode,
    pub cancel: CancelToken,
}

/// How a turn concluded.
#[derive(Debug, Clone)]
pub enum TurnOutcome {
    /// DONE or ASK or BYE, with the final first-person answer.
    Finished { action: Action, response: String },
    Cancelled { reason: String },
    ConfirmationRequired { message: String },
    Interrupted,
}

fn system_prompt_message(state: &AgentState) -> Message {
    Message::system(state.agent_system_prompt.clone())
}

/// Fold a completed call's usage into the agent's cumulative accounting
/// (spec §4.5's "token accounting"). A no-op when the provider didn't report
/// usage (e.g. streaming providers that haven't finished).
fn record_usage(state: &mut AgentState, resp: &ChatResponse) {
    if let Some(usage) = &resp.usage {
        let cost = lop_domain::pricing::estimate_cost_usd(
            &resp.model,
            usage.prompt_tokens as u64,
            usage.completion_tokens as u64,
        );
        state.token_usage.record(usage, cost);
    }
}

async fn call_model(
    provider: &dyn LlmProvider,
    req: ChatRequest,
    state: &mut AgentState,
) -> Result<ChatResponse> {
    let mut attempt = 0u32;
    loop {
        attempt += 1;
        match provider.chat(req.clone()).await {
            Ok(resp) => {
                record_usage(state, &resp);
                return Ok(resp);
            }
            Err(Error::ProviderTransient { message, retry_after_secs }) => {
                if attempt >= MODEL_CALL_MAX_ATTEMPTS {
                    return Err(Error::ProviderFatal(message));
                }
                let delay = retry_after_secs
                    .map(Duration::from_secs)
                    .unwrap_or_else(|| MODEL_CALL_BASE_BACKOFF * 2u32.pow(attempt - 1));
                tokio::time::sleep(delay).await;
            }
            Err(other) => return Err(other),
        }
    }
}

const CLASSIFICATION_SYSTEM_PROMPT: &str = "Classify the user's latest request. Respond with \
exactly this tag envelope and nothing else: <type>...</type><planning_required>true|false</planning_required>\
<relative_effort>low|medium|high</relative_effort><subject_change>true|false</subject_change>. \
Valid types: conversation, research, deep_research, software_development, data_science, writing, \
editing, translation, summarization, question_answering, planning, automation, file_management, \
system_administration, image_generation, media_processing, finance, legal, education, other.";

const ACTION_INTERPRETER_SYSTEM_PROMPT: &str = "Coerce the assistant's previous message into a \
single JSON object with this exact shape (omit fields that don't apply to the chosen action): \
{\"action\":\"CODE|READ|WRITE|EDIT|DONE|ASK|BYE\",\"response\":\"...\",\"code\":\"...\",\
\"content\":\"...\",\"file_path\":\"...\",\"replacements\":[{\"find\":\"...\",\"replace\":\"...\"}],\
\"mentioned_files\":[],\"learnings\":[]}. Exactly one action per response. Output raw JSON only.";

/// Run one user turn to completion. Mutates `state` in place (conversation,
/// execution_history, learnings, current_plan) so the caller can persist it
/// afterward regardless of how the turn concluded.
pub async fn run_turn(
    ctx: &TurnContext<'_>,
    state: &mut AgentState,
    user_message: &str,
) -> Result<TurnOutcome> {
    // Phase 1: interrupt check.
    if ctx.cancel.is_cancelled() {
        ctx.conversation_store.append(
            &mut state.conversation,
            ConversationRecord::assistant(
                "The current task was stopped before it could finish.",
            ),
        );
        return Ok(TurnOutcome::Interrupted);
    }

    ctx.conversation_store
        .append(&mut state.conversation, ConversationRecord::user(user_message));

    lop_domain::trace::TraceEvent::TurnStarted {
        agent_id: ctx.agent_id.to_string(),
        turn_index: state.execution_history.len(),
    }
    .emit();

    // Phase 2: classification.
    let classification = classify(ctx, state).await?;
    lop_domain::trace::TraceEvent::TurnClassified {
        agent_id: ctx.agent_id.to_string(),
        task_type: format!("{:?}", classification.task_type),
        relative_effort: format!("{:?}", classification.relative_effort),
        planning_required: classification.planning_required,
    }
    .emit();

    // Phase 3: conditional planning.
    if classification.planning_required {
        plan(ctx, state).await?;
    }

    // Phase 4: the action loop.
    let mut retries_used = 0u32;
    for _ in 0..MAX_ACTION_LOOP_STEPS {
        if ctx.cancel.is_cancelled() {
            return Ok(TurnOutcome::Interrupted);
        }

        let namespace_vars = ctx.sandbox.describe_namespace();
        ctx.conversation_store.refresh_ephemeral(
            &mut state.conversation,
            ctx.workspace_root.to_string_lossy().as_ref(),
            &ctx.agent_id.to_string(),
            state.learnings.iter().cloned(),
            state.current_plan.as_deref(),
            state.instruction_details.as_deref(),
            Some(namespace_vars.as_str()).filter(|s| !s.is_empty()),
        );

        let raw_action = propose_action(ctx, state).await?;
        let schema = match interpret_action(ctx, state, &raw_action).await {
            Ok(schema) => schema,
            Err(message) => {
                record_error_turn(ctx, state, &message);
                continue;
            }
        };

        lop_domain::trace::TraceEvent::ActionDispatched {
            agent_id: ctx.agent_id.to_string(),
            action: format!("{:?}", schema.action),
        }
        .emit();

        if matches!(schema.action, Action::Done | Action::Ask | Action::Bye) {
            state.execution_history.push(ExecutionResult {
                message: Some(schema.response.clone()),
                ..ExecutionResult::new(schema.action, ExecutionType::Action, Status::Success)
            });
            fold_learnings(state, &schema);
            break;
        }

        match dispatch_action(ctx, state, &schema, &mut retries_used).await? {
            Some(outcome) => return Ok(outcome),
            None => continue,
        }
    }

    reflect_if_warranted(ctx, state, &classification).await?;
    ctx.conversation_store
        .summarize(&mut state.conversation, ctx.provider.as_ref())
        .await?;

    let final_action = last_terminal_action(state).unwrap_or(Action::Done);
    let response = final_response(ctx, state).await?;
    state.execution_history.push(ExecutionResult {
        message: Some(response.clone()),
        ..ExecutionResult::new(final_action, ExecutionType::Response, Status::Success)
    });
    ctx.conversation_store
        .append(&mut state.conversation, ConversationRecord::assistant(response.clone()));

    Ok(TurnOutcome::Finished { action: final_action, response })
}

fn last_terminal_action(state: &AgentState) -> Option<Action> {
    state
        .execution_history
        .iter()
        .rev()
        .find(|e| matches!(e.action, Action::Done | Action::Ask | Action::Bye))
        .map(|e| e.action)
}

fn fold_learnings(state: &mut AgentState, schema: &ResponseSchema) {
    for learning in &schema.learnings {
        state.learnings.add(learning.clone());
    }
}

async fn classify(ctx: &TurnContext<'_>, state: &mut AgentState) -> Result<RequestClassification> {
    let mut messages = vec![Message::system(CLASSIFICATION_SYSTEM_PROMPT)];
    messages.extend(ctx.conversation_store.to_provider_messages(&state.conversation));
    let resp = call_model(
        ctx.provider.as_ref(),
        ChatRequest {
            messages,
            tools: vec![],
            temperature: Some(0.0),
            max_tokens: None,
            json_mode: false,
            model: None,
        },
        state,
    )
    .await?;
    Ok(parse_classification(&resp.content))
}

async fn plan(ctx: &TurnContext<'_>, state: &mut AgentState) -> Result<()> {
    let mut messages = vec![
        system_prompt_message(state),
        Message::system("Write a short, free-form plan for accomplishing the user's request."),
    ];
    messages.extend(ctx.conversation_store.to_provider_messages(&state.conversation));
    let resp = call_model(
        ctx.provider.as_ref(),
        ChatRequest {
            messages,
            tools: vec![],
            temperature: Some(0.3),
            max_tokens: None,
            json_mode: false,
            model: None,
        },
        state,
    )
    .await?;

    state.current_plan = Some(resp.content.clone());
    state.execution_history.push(ExecutionResult {
        message: Some(resp.content),
        is_streamable: true,
        ..ExecutionResult::new(Action::Ask, ExecutionType::Plan, Status::Success)
    });
    Ok(())
}

async fn propose_action(ctx: &TurnContext<'_>, state: &mut AgentState) -> Result<String> {
    let mut messages = vec![system_prompt_message(state)];
    messages.extend(ctx.conversation_store.to_provider_messages(&state.conversation));
    let resp = call_model(
        ctx.provider.as_ref(),
        ChatRequest {
            messages,
            tools: vec![],
            temperature: Some(0.2),
            max_tokens: None,
            json_mode: false,
            model: None,
        },
        state,
    )
    .await?;
    Ok(resp.content)
}

async fn interpret_action(
    ctx: &TurnContext<'_>,
    state: &mut AgentState,
    raw: &str,
) -> std::result::Result<ResponseSchema, String> {
    let messages = vec![
        Message::system(ACTION_INTERPRETER_SYSTEM_PROMPT),
        Message::user(raw.to_string()),
    ];
    let resp = call_model(
        ctx.provider.as_ref(),
        ChatRequest {
            messages,
            tools: vec![],
            temperature: Some(0.0),
            max_tokens: None,
            json_mode: true,
            model: None,
        },
        state,
    )
    .await
    .map_err(|e| e.to_string())?;

    let schema: ResponseSchema =
        serde_json::from_str(&resp.content).map_err(|e| format!("could not parse action envelope: {e}"))?;
    schema.validate()?;
    Ok(schema)
}

fn record_error_turn(ctx: &TurnContext<'_>, state: &mut AgentState, message: &str) {
    ctx.conversation_store.append(
        &mut state.conversation,
        ConversationRecord::user(format!("[error] {message}")),
    );
}

/// Dispatches one interpreted action. Returns `Some(outcome)` when the turn
/// must end right now (safety cancellation/confirmation), `None` to keep
/// looping.
async fn dispatch_action(
    ctx: &TurnContext<'_>,
    state: &mut AgentState,
    schema: &ResponseSchema,
    retries_used: &mut u32,
) -> Result<Option<TurnOutcome>> {
    if schema.action.requires_safety_check() {
        let outcome = safety::audit(
            ctx.safety_mode,
            ctx.provider.as_ref(),
            schema,
            &state.conversation,
            ctx.config.conversation_length,
            "follow the user's stated security preferences; be conservative by default",
            Duration::from_secs(ctx.config.safety_prompt_timeout_secs),
            ctx.conversation_store,
        )
        .await?;

        lop_domain::trace::TraceEvent::SafetyVerdict {
            agent_id: ctx.agent_id.to_string(),
            verdict: format!("{outcome:?}"),
            mode: format!("{:?}", ctx.safety_mode),
        }
        .emit();

        match outcome {
            SafetyOutcome::Cancelled { reason } => {
                state.execution_history.push(ExecutionResult {
                    message: Some(reason.clone()),
                    ..ExecutionResult::new(schema.action, ExecutionType::SecurityCheck, Status::Cancelled)
                });
                ctx.conversation_store.append(
                    &mut state.conversation,
                    ConversationRecord::assistant(format!("I won't do that: {reason}")),
                );
                return Ok(Some(TurnOutcome::Cancelled { reason }));
            }
            SafetyOutcome::ConfirmationRequired { message } => {
                state.execution_history.push(ExecutionResult {
                    message: Some(message.clone()),
                    ..ExecutionResult::new(schema.action, ExecutionType::SecurityCheck, Status::ConfirmationRequired)
                });
                ctx.conversation_store
                    .append(&mut state.conversation, ConversationRecord::assistant(message.clone()));
                return Ok(Some(TurnOutcome::ConfirmationRequired { message }));
            }
            SafetyOutcome::Proceed { warning } => {
                if let Some(warning) = warning {
                    state.execution_history.push(ExecutionResult::new(
                        schema.action,
                        ExecutionType::SecurityCheck,
                        Status::Success,
                    ));
                    ctx.conversation_store
                        .append(&mut state.conversation, ConversationRecord::assistant(warning));
                } else {
                    state.execution_history.push(ExecutionResult::new(
                        schema.action,
                        ExecutionType::SecurityCheck,
                        Status::Success,
                    ));
                }
            }
        }
    }

    match schema.action {
        Action::Code => dispatch_code(ctx, state, schema, retries_used).await,
        Action::Write => dispatch_write(ctx, state, schema).await,
        Action::Edit => dispatch_edit(ctx, state, schema).await,
        Action::Read => dispatch_read(ctx, state, schema).await,
        Action::Done | Action::Ask | Action::Bye => unreachable!("handled before safety gate"),
    }
}

async fn dispatch_code(
    ctx: &TurnContext<'_>,
    state: &mut AgentState,
    schema: &ResponseSchema,
    retries_used: &mut u32,
) -> Result<Option<TurnOutcome>> {
    let code = schema.code.as_deref().unwrap_or_default();
    let run_result = ctx
        .sandbox
        .run(code)
        .await
        .map_err(|err| err.with_agent_info(&ctx.agent_id.to_string(), &ctx.config.model));
    match run_result {
        Ok(outcome) => {
            state.execution_history.push(ExecutionResult {
                code: Some(code.to_string()),
                stdout: Some(outcome.stdout.clone()),
                logging: Some(outcome.log_output.clone()),
                ..ExecutionResult::new(Action::Code, ExecutionType::Action, Status::Success)
            });
            ctx.conversation_store.append(
                &mut state.conversation,
                ConversationRecord::user(format!("Execution output:\n{}", outcome.stdout)),
            );
            fold_learnings(state, schema);
            Ok(None)
        }
        Err(Error::CodeExecution { message, annotated_code, agent_info_str }) => {
            let formatted_print = match &agent_info_str {
                Some(info) => format!("[{info}]\n{annotated_code}"),
                None => annotated_code.clone(),
            };
            state.execution_history.push(ExecutionResult {
                code: Some(code.to_string()),
                stderr: Some(message.clone()),
                formatted_print: Some(formatted_print),
                ..ExecutionResult::new(Action::Code, ExecutionType::Action, Status::Error)
            });

            if *retries_used >= ctx.config.max_action_retries {
                ctx.conversation_store.append(
                    &mut state.conversation,
                    ConversationRecord::assistant(format!(
                        "I hit an unrecoverable error and am stopping: {message}"
                    )),
                );
                return Ok(Some(TurnOutcome::Finished {
                    action: Action::Bye,
                    response: format!("I couldn't complete this: {message}"),
                }));
            }
            *retries_used += 1;
            ctx.conversation_store.append(
                &mut state.conversation,
                ConversationRecord::user(format!(
                    "The code raised an error and must be corrected:\n{annotated_code}"
                )),
            );
            Ok(None)
        }
        Err(other) => Err(other),
    }
}

async fn dispatch_write(
    ctx: &TurnContext<'_>,
    state: &mut AgentState,
    schema: &ResponseSchema,
) -> Result<Option<TurnOutcome>> {
    let file_path = schema.file_path.clone().unwrap_or_default();
    let content = schema.content.clone().unwrap_or_default();

    match file_io::file_write(
        &ctx.workspace_root,
        file_io::FileWriteRequest { path: file_path.clone(), content: content.clone() },
    )
    .await
    {
        Ok(_) => {
            state.execution_history.push(ExecutionResult {
                files: vec![file_path.clone()],
                ..ExecutionResult::new(Action::Write, ExecutionType::Action, Status::Success)
            });
            ctx.conversation_store.append(
                &mut state.conversation,
                ConversationRecord::user(format!("Wrote '{file_path}'.")),
            );
            fold_learnings(state, schema);
            Ok(None)
        }
        Err(message) => {
            state.execution_history.push(ExecutionResult {
                files: vec![file_path.clone()],
                stderr: Some(message.clone()),
                ..ExecutionResult::new(Action::Write, ExecutionType::Action, Status::Error)
            });
            ctx.conversation_store.append(
                &mut state.conversation,
                ConversationRecord::user(format!("Failed to write '{file_path}': {message}")),
            );
            Ok(None)
        }
    }
}

async fn dispatch_edit(
    ctx: &TurnContext<'_>,
    state: &mut AgentState,
    schema: &ResponseSchema,
) -> Result<Option<TurnOutcome>> {
    let file_path = schema.file_path.clone().unwrap_or_default();

    match file_io::file_edit(&ctx.workspace_root, &file_path, &schema.replacements).await {
        Ok(result) => {
            let content = result["content"].as_str().unwrap_or_default().to_string();
            state.execution_history.push(ExecutionResult {
                files: vec![file_path.clone()],
                ..ExecutionResult::new(Action::Edit, ExecutionType::Action, Status::Success)
            });
            ctx.conversation_store.append(
                &mut state.conversation,
                ConversationRecord::user(format!("'{file_path}' after edit:\n{content}")),
            );
            fold_learnings(state, schema);
            Ok(None)
        }
        Err(message) => {
            state.execution_history.push(ExecutionResult {
                files: vec![file_path.clone()],
                stderr: Some(message.clone()),
                ..ExecutionResult::new(Action::Edit, ExecutionType::Action, Status::Error)
            });
            ctx.conversation_store.append(
                &mut state.conversation,
                ConversationRecord::user(format!("Failed to edit '{file_path}': {message}")),
            );
            Ok(None)
        }
    }
}

async fn dispatch_read(
    ctx: &TurnContext<'_>,
    state: &mut AgentState,
    schema: &ResponseSchema,
) -> Result<Option<TurnOutcome>> {
    let file_path = schema.file_path.clone().unwrap_or_default();

    let resolved = match file_io::validate_path(&ctx.workspace_root, &file_path) {
        Ok(p) => p,
        Err(message) => {
            ctx.conversation_store.append(
                &mut state.conversation,
                ConversationRecord::user(format!("Failed to read '{file_path}': {message}")),
            );
            return Ok(None);
        }
    };

    if let Ok(metadata) = tokio::fs::metadata(&resolved).await {
        if metadata.len() > READ_SIZE_CAP_BYTES {
            let message = format!(
                "'{file_path}' is {} bytes, over the {READ_SIZE_CAP_BYTES}-byte read cap. \
                 Use CODE to summarize or process it in chunks instead.",
                metadata.len()
            );
            state.execution_history.push(ExecutionResult {
                files: vec![file_path.clone()],
                stderr: Some(message.clone()),
                ..ExecutionResult::new(Action::Read, ExecutionType::Action, Status::Error)
            });
            ctx.conversation_store
                .append(&mut state.conversation, ConversationRecord::user(message));
            return Ok(None);
        }
    }

    match file_io::file_read(
        &ctx.workspace_root,
        file_io::FileReadRequest { path: file_path.clone(), offset: None, limit: None },
    )
    .await
    {
        Ok(result) => {
            let content = result["content"].as_str().unwrap_or_default().to_string();
            state.execution_history.push(ExecutionResult {
                files: vec![file_path.clone()],
                ..ExecutionResult::new(Action::Read, ExecutionType::Action, Status::Success)
            });
            ctx.conversation_store.append(
                &mut state.conversation,
                ConversationRecord::user(format!("Contents of '{file_path}':\n{content}")),
            );
            fold_learnings(state, schema);
            Ok(None)
        }
        Err(message) => {
            state.execution_history.push(ExecutionResult {
                files: vec![file_path.clone()],
                stderr: Some(message.clone()),
                ..ExecutionResult::new(Action::Read, ExecutionType::Action, Status::Error)
            });
            ctx.conversation_store.append(
                &mut state.conversation,
                ConversationRecord::user(format!("Failed to read '{file_path}': {message}")),
            );
            Ok(None)
        }
    }
}

async fn reflect_if_warranted(
    ctx: &TurnContext<'_>,
    state: &mut AgentState,
    classification: &RequestClassification,
) -> Result<()> {
    use lop_domain::classification::RelativeEffort;
    if !classification.planning_required && classification.relative_effort != RelativeEffort::High {
        return Ok(());
    }

    let mut messages = vec![
        system_prompt_message(state),
        Message::system("Briefly critique what you just did. Note anything you'd do differently."),
    ];
    messages.extend(ctx.conversation_store.to_provider_messages(&state.conversation));
    let resp = call_model(
        ctx.provider.as_ref(),
        ChatRequest {
            messages,
            tools: vec![],
            temperature: Some(0.3),
            max_tokens: None,
            json_mode: false,
            model: None,
        },
        state,
    )
    .await?;

    state.execution_history.push(ExecutionResult {
        message: Some(resp.content),
        is_streamable: true,
        ..ExecutionResult::new(Action::Done, ExecutionType::Reflection, Status::Success)
    });
    Ok(())
}

const FINAL_RESPONSE_SYSTEM_PROMPT: &str = "Produce the final first-person, user-facing answer for \
this turn. Use Markdown. Do not mention internal actions, tools, or the safety audit.";

async fn final_response(ctx: &TurnContext<'_>, state: &mut AgentState) -> Result<String> {
    let mut messages = vec![system_prompt_message(state), Message::system(FINAL_RESPONSE_SYSTEM_PROMPT)];
    messages.extend(ctx.conversation_store.to_provider_messages(&state.conversation));
    let resp = call_model(
        ctx.provider.as_ref(),
        ChatRequest {
            messages,
            tools: vec![],
            temperature: Some(0.4),
            max_tokens: None,
            json_mode: false,
            model: None,
        },
        state,
    )
    .await?;
    Ok(resp.content)
}

#[cfg(test)]
mod tests {
    use super::*;
    use lop_domain::capability::LlmCapabilities;
    use lop_domain::config::Config;
    use lop_providers::{EmbeddingsRequest, EmbeddingsResponse};
    use std::sync::atomic::{AtomicUsize, Ordering as AtomicOrdering};
    use tempfile::TempDir;

    /// Replies with a fixed queue of responses, one per call, cycling the
    /// last entry once exhausted.
    struct ScriptedProvider {
        responses: Vec<String>,
        calls: AtomicUsize,
        capabilities: LlmCapabilities,
    }

    impl ScriptedProvider {
        fn new(responses: Vec<&str>) -> Self {
            Self {
                responses: responses.into_iter().map(String::from).collect(),
                calls: AtomicUsize::new(0),
                capabilities: LlmCapabilities::default(),
            }
        }
    }

    #[async_trait::async_trait]
    impl LlmProvider for ScriptedProvider {
        async fn chat(&self, _req: ChatRequest) -> Result<ChatResponse> {
            let idx = self.calls.fetch_add(1, AtomicOrdering::SeqCst);
            let content = self.responses[idx.min(self.responses.len() - 1)].clone();
            Ok(ChatResponse {
                content,
                tool_calls: vec![],
                usage: None,
                model: "scripted".into(),
                finish_reason: Some("stop".into()),
            })
        }

        async fn chat_stream(
            &self,
            _req: ChatRequest,
        ) -> Result<lop_domain::stream::BoxStream<'static, Result<lop_domain::stream::StreamEvent>>>
        {
            unimplemented!("not exercised by these tests")
        }

        async fn embeddings(&self, _req: EmbeddingsRequest) -> Result<EmbeddingsResponse> {
            unimplemented!("not exercised by these tests")
        }

        fn capabilities(&self) -> &LlmCapabilities {
            &self.capabilities
        }

        fn provider_id(&self) -> &str {
            "scripted"
        }
    }

    fn test_ctx<'a>(
        provider: Arc<dyn LlmProvider>,
        config: &'a Config,
        tools: &'a ToolRegistry,
        sandbox: &'a CodeSandbox,
        store: &'a lop_contextpack::ConversationStore,
        workspace_root: PathBuf,
    ) -> TurnContext<'a> {
        TurnContext {
            agent_id: Uuid::new_v4(),
            config,
            provider,
            tools,
            sandbox,
            conversation_store: store,
            workspace_root,
            safety_mode: SafetyMode::ConversationConfirm,
            cancel: CancelToken::new(),
        }
    }

    #[tokio::test]
    async fn happy_code_turn_reaches_done() {
        let config = Config::default();
        let tools = ToolRegistry::new();
        let sandbox = CodeSandbox::new(&tools);
        let store = lop_contextpack::ConversationStore::new(50, 10);
        let ws = TempDir::new().unwrap();

        let provider: Arc<dyn LlmProvider> = Arc::new(ScriptedProvider::new(vec![
            "<type>other</type><planning_required>false</planning_required><relative_effort>low</relative_effort><subject_change>false</subject_change>",
            "I'll compute the sum.",
            r#"{"action":"CODE","response":"computing","code":"print(2+3)"}"#,
            "looks safe",
            "DONE",
            r#"{"action":"DONE","response":"done"}"#,
            "The sum of 2 and 3 is 5.",
        ]));

        let ctx = test_ctx(provider, &config, &tools, &sandbox, &store, ws.path().to_path_buf());
        let mut state = AgentState::new("you are an agent", 20);

        let outcome = run_turn(&ctx, &mut state, "print the sum of 2 and 3").await.unwrap();
        match outcome {
            TurnOutcome::Finished { action, response } => {
                assert_eq!(action, Action::Done);
                assert!(response.contains('5'));
            }
            other => panic!("expected Finished, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn conversation_confirm_unsafe_action_never_touches_disk() {
        let config = Config::default();
        let tools = ToolRegistry::new();
        let sandbox = CodeSandbox::new(&tools);
        let store = lop_contextpack::ConversationStore::new(50, 10);
        let ws = TempDir::new().unwrap();

        let provider: Arc<dyn LlmProvider> = Arc::new(ScriptedProvider::new(vec![
            "<type>system_administration</type><planning_required>false</planning_required><relative_effort>low</relative_effort><subject_change>false</subject_change>",
            "I'll delete it.",
            r#"{"action":"CODE","response":"deleting","code":"remove_system_file()"}"#,
            "[unsafe] this deletes a critical system file",
        ]));

        let ctx = test_ctx(provider, &config, &tools, &sandbox, &store, ws.path().to_path_buf());
        let mut state = AgentState::new("you are an agent", 20);

        let outcome = run_turn(&ctx, &mut state, "delete system.dll").await.unwrap();
        match outcome {
            TurnOutcome::ConfirmationRequired { message } => {
                assert!(message.contains("deletes"));
            }
            other => panic!("expected ConfirmationRequired, got {other:?}"),
        }
        assert!(std::fs::read_dir(ws.path()).unwrap().next().is_none(), "no file I/O should occur");
    }

    #[tokio::test]
    async fn edit_with_missing_find_records_failure_and_leaves_file_untouched() {
        let config = Config::default();
        let tools = ToolRegistry::new();
        let sandbox = CodeSandbox::new(&tools);
        let store = lop_contextpack::ConversationStore::new(50, 10);
        let ws = TempDir::new().unwrap();
        std::fs::write(ws.path().join("a.txt"), "hello").unwrap();

        let provider: Arc<dyn LlmProvider> = Arc::new(ScriptedProvider::new(vec![
            "<type>file_management</type><planning_required>false</planning_required><relative_effort>low</relative_effort><subject_change>false</subject_change>",
            "editing",
            r#"{"action":"EDIT","response":"editing","file_path":"a.txt","replacements":[{"find":"bye","replace":"x"}]}"#,
            "looks fine",
            "BYE",
            r#"{"action":"BYE","response":"done"}"#,
            "I couldn't find that text in the file.",
        ]));

        let ctx = test_ctx(provider, &config, &tools, &sandbox, &store, ws.path().to_path_buf());
        let mut state = AgentState::new("you are an agent", 20);

        run_turn(&ctx, &mut state, "replace bye with x in a.txt").await.unwrap();

        let on_disk = std::fs::read_to_string(ws.path().join("a.txt")).unwrap();
        assert_eq!(on_disk, "hello");
        assert!(state
            .conversation
            .iter()
            .any(|r| r.content.contains("Failed to edit")));
    }
}

//! Safety Auditor: gates CODE/WRITE/EDIT/READ actions behind an LLM verdict
//! before the executor loop dispatches them.
//!
//! Verdict extraction is a case-insensitive substring match against
//! `[override]` / `[unsafe]`; anything else is SAFE. Two modes are
//! supported, selected once at boot by whether the process has an
//! interactive terminal attached (`can_prompt_user`): prompt-user asks a
//! human on the terminal for an explicit y/n override; conversation-confirm
//! never blocks and instead returns a status the caller surfaces to the
//! client.

use std::time::Duration;

use lop_domain::conversation::ConversationRecord;
use lop_domain::error::Result;
use lop_domain::response_schema::ResponseSchema;
use lop_domain::tool::Message;
use lop_providers::LlmProvider;

/// The auditor's raw verdict before any human-override handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Safe,
    Unsafe,
    Override,
}

/// What the executor loop does next after an audit call.
#[derive(Debug, Clone)]
pub enum SafetyOutcome {
    /// SAFE, or UNSAFE overridden by a human at the terminal, or OVERRIDE.
    Proceed {
        /// Set for OVERRIDE and for a terminal-approved UNSAFE — an
        /// informational note the caller may fold into the turn's record.
        warning: Option<String>,
    },
    /// UNSAFE in prompt-user mode and the human declined (or the prompt
    /// timed out). The action loop must record a refusal and stop.
    Cancelled { reason: String },
    /// UNSAFE in conversation-confirm mode. The action loop stops and the
    /// caller surfaces `CONFIRMATION_REQUIRED` with `message` as the risk
    /// summary shown to the user.
    ConfirmationRequired { message: String },
}

/// Which of the two audit modes to run. Chosen once at boot from whether
/// the process has an interactive terminal attached — not per-request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SafetyMode {
    PromptUser,
    ConversationConfirm,
}

/// Case-insensitive substring match against `[override]` / `[unsafe]`.
/// Order matters: `[override]` takes precedence if a (malformed) response
/// somehow contains both tags.
pub fn parse_verdict(raw: &str) -> Verdict {
    let lower = raw.to_ascii_lowercase();
    if lower.contains("[override]") {
        Verdict::Override
    } else if lower.contains("[unsafe]") {
        Verdict::Unsafe
    } else {
        Verdict::Safe
    }
}

const AUDITOR_SYSTEM_PROMPT: &str = "You are a safety auditor reviewing a proposed agent action \
for irreversible or destructive side effects (data loss, unauthorized network access, credential \
exposure, system modification outside the workspace). Respond with `[unsafe]` followed by a short \
risk analysis if the action is dangerous, `[override]` if a prior unsafe verdict has since been \
authorized, or plain text otherwise.";

fn render_action(action: &ResponseSchema) -> String {
    serde_json::to_string_pretty(action).unwrap_or_else(|_| format!("{action:?}"))
}

/// Prompt-user mode: one self-contained LLM call, then (on UNSAFE) a
/// blocking terminal y/n read with a timeout. Never called concurrently
/// with another prompt-user audit on the same process, since the per-agent
/// session lock already serializes turns.
async fn audit_prompt_user(
    provider: &dyn LlmProvider,
    action: &ResponseSchema,
    security_preferences: &str,
    prompt_timeout: Duration,
) -> Result<SafetyOutcome> {
    let messages = vec![
        Message::system(AUDITOR_SYSTEM_PROMPT),
        Message::user(format!(
            "User security preferences: {security_preferences}\n\nProposed action:\n{}",
            render_action(action)
        )),
    ];

    let req = lop_providers::ChatRequest {
        messages,
        tools: vec![],
        temperature: Some(0.0),
        max_tokens: None,
        json_mode: false,
        model: None,
    };

    let response = provider.chat(req).await?;
    match parse_verdict(&response.content) {
        Verdict::Safe => Ok(SafetyOutcome::Proceed { warning: None }),
        Verdict::Override => Ok(SafetyOutcome::Proceed {
            warning: Some("safety auditor returned OVERRIDE — proceeding with caution".into()),
        }),
        Verdict::Unsafe => {
            let approved = prompt_terminal_yes_no(&response.content, prompt_timeout).await;
            if approved {
                Ok(SafetyOutcome::Proceed {
                    warning: Some(format!(
                        "action was flagged unsafe and approved by the operator: {}",
                        response.content.trim()
                    )),
                })
            } else {
                Ok(SafetyOutcome::Cancelled {
                    reason: format!("action declined: {}", response.content.trim()),
                })
            }
        }
    }
}

/// Blocks on a terminal read in a dedicated thread; times out to "declined"
/// rather than hanging the executor loop indefinitely.
async fn prompt_terminal_yes_no(risk_analysis: &str, timeout: Duration) -> bool {
    let risk_analysis = risk_analysis.to_string();
    let prompt = tokio::task::spawn_blocking(move || {
        eprintln!("\nThe agent wants to perform an action flagged unsafe:\n{risk_analysis}\n");
        let mut rl = rustyline::DefaultEditor::new().ok()?;
        rl.readline("Allow this action? [y/N] ").ok()
    });

    match tokio::time::timeout(timeout, prompt).await {
        Ok(Ok(Some(line))) => matches!(line.trim().to_ascii_lowercase().as_str(), "y" | "yes"),
        _ => false,
    }
}

/// Conversation-confirm mode: audits against a transcript made of a
/// dedicated auditor system prompt followed by the last
/// `conversation_length` records of the real conversation, never blocking
/// on human input. On UNSAFE, returns the risk analysis as a
/// `ConfirmationRequired` message; on OVERRIDE, proceeds with a warning.
async fn audit_conversation_confirm(
    provider: &dyn LlmProvider,
    action: &ResponseSchema,
    conversation: &[ConversationRecord],
    conversation_length: usize,
    store: &lop_contextpack::ConversationStore,
) -> Result<SafetyOutcome> {
    let total = conversation.len();
    let window_start = total.saturating_sub(conversation_length);
    let mut messages = vec![Message::system(AUDITOR_SYSTEM_PROMPT)];
    if window_start > 0 {
        messages.push(Message::user(
            "[Some conversation history has been truncated for brevity]",
        ));
    }
    messages.extend(store.to_provider_messages(&conversation[window_start..]));
    messages.push(Message::user(format!(
        "Proposed action:\n{}",
        render_action(action)
    )));

    let req = lop_providers::ChatRequest {
        messages,
        tools: vec![],
        temperature: Some(0.0),
        max_tokens: None,
        json_mode: false,
        model: None,
    };

    let response = provider.chat(req).await?;
    match parse_verdict(&response.content) {
        Verdict::Safe => Ok(SafetyOutcome::Proceed { warning: None }),
        Verdict::Override => Ok(SafetyOutcome::Proceed {
            warning: Some("safety auditor returned OVERRIDE — proceeding with caution".into()),
        }),
        Verdict::Unsafe => Ok(SafetyOutcome::ConfirmationRequired {
            message: response.content.trim().to_string(),
        }),
    }
}

/// Entry point the executor loop calls before dispatching CODE/WRITE/EDIT/
/// READ.
#[allow(clippy::too_many_arguments)]
pub async fn audit(
    mode: SafetyMode,
    provider: &dyn LlmProvider,
    action: &ResponseSchema,
    conversation: &[ConversationRecord],
    conversation_length: usize,
    security_preferences: &str,
    prompt_timeout: Duration,
    store: &lop_contextpack::ConversationStore,
) -> Result<SafetyOutcome> {
    match mode {
        SafetyMode::PromptUser => {
            audit_prompt_user(provider, action, security_preferences, prompt_timeout).await
        }
        SafetyMode::ConversationConfirm => {
            audit_conversation_confirm(provider, action, conversation, conversation_length, store)
                .await
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_text_is_safe() {
        assert_eq!(parse_verdict("looks fine, go ahead"), Verdict::Safe);
    }

    #[test]
    fn bracket_unsafe_is_case_insensitive() {
        assert_eq!(parse_verdict("[UNSAFE] this deletes the repo"), Verdict::Unsafe);
    }

    #[test]
    fn bracket_override_wins_over_unsafe() {
        assert_eq!(parse_verdict("[override] [unsafe] proceed anyway"), Verdict::Override);
    }
}

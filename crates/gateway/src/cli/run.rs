//! `local-operator run` — a single one-shot turn against a fresh, unsaved
//! agent. Useful for scripting and smoke-testing a configuration without
//! standing up the HTTP server.

use std::sync::Arc;

use lop_domain::agent_state::AgentState;
use lop_domain::config::Config;
use lop_sandbox::CodeSandbox;
use lop_tools::build_registry;

use crate::runtime::cancel::CancelToken;
use crate::runtime::executor::{run_turn, TurnContext, TurnOutcome};
use crate::runtime::safety::SafetyMode;

pub async fn run(config: &Config, message: &str, model: Option<String>, json: bool) -> anyhow::Result<()> {
    let mut config = config.clone();
    if let Some(model) = model {
        config.model = model;
    }

    let mut registry = lop_providers::ProviderRegistry::new();
    registry.register(Arc::new(lop_providers::MockProvider::new(
        config.hosting.clone(),
        vec!["no LLM provider configured".to_string()],
    )));
    let provider = registry
        .resolve(None)
        .expect("mock provider was just registered as the default");

    let tools = build_registry(&config.tool_providers);
    let sandbox = CodeSandbox::new(&tools);
    let store = lop_contextpack::ConversationStore::new(config.conversation_length, config.detail_length);
    let workspace_root = std::env::current_dir()?;

    let ctx = TurnContext {
        agent_id: uuid::Uuid::new_v4(),
        config: &config,
        provider,
        tools: &tools,
        sandbox: &sandbox,
        conversation_store: &store,
        workspace_root,
        safety_mode: if config.can_prompt_user {
            SafetyMode::PromptUser
        } else {
            SafetyMode::ConversationConfirm
        },
        cancel: CancelToken::new(),
    };

    let mut state = AgentState::new(
        "You are a helpful agent running from the local-operator CLI.",
        config.max_learnings_history,
    );

    let outcome = run_turn(&ctx, &mut state, message).await?;

    match outcome {
        TurnOutcome::Finished { response, .. } if json => {
            println!("{}", serde_json::json!({ "response": response }));
        }
        TurnOutcome::Finished { response, .. } => println!("{response}"),
        TurnOutcome::Cancelled { reason } => println!("Cancelled: {reason}"),
        TurnOutcome::ConfirmationRequired { message } => println!("Confirmation required: {message}"),
        TurnOutcome::Interrupted => println!("Interrupted."),
    }

    Ok(())
}

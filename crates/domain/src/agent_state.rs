use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::conversation::ConversationRecord;
use crate::execution::ExecutionResult;
use crate::stream::Usage;

/// The per-agent durable root. Created by the registry, mutated exclusively
/// by the executor loop (and the registry's administrative clear/import
/// endpoints).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentState {
    pub version: u32,
    /// First record is always the system prompt; all others have
    /// role user/assistant.
    pub conversation: Vec<ConversationRecord>,
    pub execution_history: Vec<ExecutionResult>,
    /// Bounded, duplicate-suppressed, FIFO-evicted free-text notes.
    pub learnings: Learnings,
    #[serde(default)]
    pub current_plan: Option<String>,
    #[serde(default)]
    pub instruction_details: Option<String>,
    pub agent_system_prompt: String,
    /// Cumulative token/cost accounting across every model call this agent
    /// has made (spec §4.5's "token accounting").
    #[serde(default)]
    pub token_usage: TokenUsage,
}

impl AgentState {
    pub const CURRENT_VERSION: u32 = 1;

    pub fn new(agent_system_prompt: impl Into<String>, max_learnings: usize) -> Self {
        let system_prompt = agent_system_prompt.into();
        Self {
            version: Self::CURRENT_VERSION,
            conversation: vec![ConversationRecord::system_prompt(system_prompt.clone())],
            execution_history: Vec::new(),
            learnings: Learnings::new(max_learnings),
            current_plan: None,
            instruction_details: None,
            agent_system_prompt: system_prompt,
            token_usage: TokenUsage::default(),
        }
    }

    /// Invariant: the first record in `conversation` is always a system
    /// prompt.
    pub fn first_is_system_prompt(&self) -> bool {
        self.conversation
            .first()
            .map(|r| r.is_system_prompt)
            .unwrap_or(false)
    }
}

/// Bounded, FIFO-evicted, duplicate-suppressed set of free-text notes.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Learnings {
    cap: usize,
    entries: VecDeque<String>,
}

impl Learnings {
    pub fn new(cap: usize) -> Self {
        Self {
            cap,
            entries: VecDeque::new(),
        }
    }

    /// Insert a learning, ignoring exact duplicates, evicting the oldest
    /// entry once at capacity.
    pub fn add(&mut self, learning: impl Into<String>) {
        let learning = learning.into();
        if self.entries.iter().any(|e| e == &learning) {
            return;
        }
        if self.cap > 0 && self.entries.len() >= self.cap {
            self.entries.pop_front();
        }
        self.entries.push_back(learning);
    }

    pub fn iter(&self) -> impl Iterator<Item = &String> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn reset(&mut self) {
        self.entries.clear();
    }
}

/// Running prompt/completion/cost totals across every model call an agent
/// has made. Updated once per successful [`crate::error::Result`]-returning
/// call and carried forward on [`Job::result.stats`](crate::job::JobStats).
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct TokenUsage {
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
    pub cost_usd: f64,
}

impl TokenUsage {
    /// Fold one call's usage into the running totals.
    pub fn record(&mut self, usage: &Usage, cost_usd: f64) {
        self.prompt_tokens += usage.prompt_tokens as u64;
        self.completion_tokens += usage.completion_tokens as u64;
        self.cost_usd += cost_usd;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_agent_state_has_system_prompt_first() {
        let state = AgentState::new("you are an agent", 10);
        assert!(state.first_is_system_prompt());
        assert_eq!(state.conversation.len(), 1);
    }

    #[test]
    fn learnings_deduplicate() {
        let mut l = Learnings::new(5);
        l.add("fact a");
        l.add("fact a");
        assert_eq!(l.len(), 1);
    }

    #[test]
    fn learnings_evict_fifo_at_cap() {
        let mut l = Learnings::new(2);
        l.add("one");
        l.add("two");
        l.add("three");
        let all: Vec<_> = l.iter().cloned().collect();
        assert_eq!(all, vec!["two".to_string(), "three".to_string()]);
    }

    #[test]
    fn token_usage_accumulates_across_calls() {
        let mut usage = TokenUsage::default();
        usage.record(
            &Usage { prompt_tokens: 100, completion_tokens: 50, total_tokens: 150 },
            0.01,
        );
        usage.record(
            &Usage { prompt_tokens: 20, completion_tokens: 10, total_tokens: 30 },
            0.002,
        );
        assert_eq!(usage.prompt_tokens, 120);
        assert_eq!(usage.completion_tokens, 60);
        assert!((usage.cost_usd - 0.012).abs() < 1e-9);
    }
}

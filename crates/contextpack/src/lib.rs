//! The Conversation Store: windowing, summarization, ephemeral HUD
//! rendering, cache-hint annotation, and provider-role normalization over
//! an agent's append-only turn log.

pub mod cache_hints;
pub mod hud;
pub mod injection;
pub mod normalize;
pub mod report;
pub mod summarization;
pub mod truncation;
pub mod windowing;

use chrono::Utc;
use lop_domain::conversation::ConversationRecord;
use lop_domain::error::Result;
use lop_domain::tool::Message;
use lop_providers::LlmProvider;

pub use hud::HudBuilder;
pub use report::ConversationReport;

/// Facade over the conversation-store operations, parameterized by the
/// caps a `Config` carries.
pub struct ConversationStore {
    pub max_conversation_history: usize,
    pub detail_conversation_length: i64,
    pub hud_max_chars: usize,
    pub cache_hint_window: usize,
}

impl ConversationStore {
    pub fn new(max_conversation_history: usize, detail_conversation_length: i64) -> Self {
        Self {
            max_conversation_history,
            detail_conversation_length,
            hud_max_chars: 4_000,
            cache_hint_window: 4,
        }
    }

    /// Append a record, then window if the non-system-prompt count exceeds
    /// the configured cap.
    pub fn append(&self, conversation: &mut Vec<ConversationRecord>, record: ConversationRecord) {
        conversation.push(record);
        windowing::window(conversation, self.max_conversation_history);
    }

    pub async fn summarize(
        &self,
        conversation: &mut [ConversationRecord],
        provider: &dyn LlmProvider,
    ) -> Result<usize> {
        summarization::summarize(conversation, self.detail_conversation_length, provider).await
    }

    /// Purge ephemeral records, then append a freshly rendered HUD record.
    pub fn refresh_ephemeral(
        &self,
        conversation: &mut Vec<ConversationRecord>,
        cwd: &str,
        agent_id: &str,
        learnings: impl Iterator<Item = String>,
        current_plan: Option<&str>,
        instruction_details: Option<&str>,
        namespace_vars: Option<&str>,
    ) {
        conversation.retain(|r| !r.ephemeral);
        let learnings: Vec<String> = learnings.collect();
        let builder = HudBuilder::new(self.hud_max_chars);
        let hud = builder.build(
            cwd,
            &Utc::now().to_rfc3339(),
            agent_id,
            learnings.iter(),
            current_plan,
            instruction_details,
            namespace_vars,
        );
        conversation.push(hud);
    }

    /// Build the outgoing provider message list: normalize roles, then
    /// annotate cache hints over the last N cacheable records.
    pub fn to_provider_messages(&self, conversation: &[ConversationRecord]) -> Vec<Message> {
        normalize::to_provider_messages(conversation)
    }

    pub fn cache_hints(&self, conversation: &[ConversationRecord]) -> Vec<bool> {
        cache_hints::annotate_cache_hints(conversation, self.cache_hint_window)
    }

    pub fn report(&self, conversation: &[ConversationRecord]) -> ConversationReport {
        ConversationReport {
            record_count: conversation.len(),
            windowed: conversation.len() > self.max_conversation_history + 2,
            records_summarized: conversation.iter().filter(|r| r.summarized).count(),
            cache_hints_applied: self
                .cache_hints(conversation)
                .into_iter()
                .filter(|&b| b)
                .count(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn append_windows_when_over_cap() {
        let store = ConversationStore::new(4, 10);
        let mut conv = vec![ConversationRecord::system_prompt("sys")];
        for i in 0..20 {
            store.append(&mut conv, ConversationRecord::user(format!("m{i}")));
        }
        assert!(conv.len() as i64 - 1 <= 4);
    }

    #[test]
    fn refresh_ephemeral_replaces_old_hud() {
        let store = ConversationStore::new(50, 10);
        let mut conv = vec![ConversationRecord::system_prompt("sys")];
        store.refresh_ephemeral(&mut conv, "/tmp", "agent-1", std::iter::empty(), None, None, None);
        let first_len = conv.len();
        store.refresh_ephemeral(&mut conv, "/tmp", "agent-1", std::iter::empty(), None, None, None);
        assert_eq!(conv.len(), first_len);
        assert_eq!(conv.iter().filter(|r| r.ephemeral).count(), 1);
    }
}

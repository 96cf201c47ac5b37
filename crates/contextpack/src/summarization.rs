use lop_domain::conversation::ConversationRecord;
use lop_domain::error::Result;
use lop_providers::{ChatRequest, LlmProvider};

const SUMMARIZER_SYSTEM_PROMPT: &str = "\
You compress a single conversation turn into one sentence preserving any \
facts, decisions, or file paths mentioned. Respond with the sentence only.";

/// Indices (excluding the system prompt) eligible for summarization: older
/// than the last `detail_length` records, not already summarized, and
/// flagged `should_summarize`. `detail_length < 0` disables summarization
/// entirely (returns empty).
pub fn candidates(conversation: &[ConversationRecord], detail_length: i64) -> Vec<usize> {
    if detail_length < 0 {
        return Vec::new();
    }
    let detail_length = detail_length as usize;
    let len = conversation.len();
    (0..len)
        .filter(|&i| {
            let record = &conversation[i];
            if record.is_system_prompt || record.summarized || !record.should_summarize {
                return false;
            }
            let position_from_end = len - i;
            position_from_end > detail_length
        })
        .collect()
}

/// Summarize every eligible record in place via one LLM call each,
/// replacing `content` with the returned summary prefixed `[SUMMARY]` and
/// marking `summarized = true`. Returns the number of records summarized.
pub async fn summarize(
    conversation: &mut [ConversationRecord],
    detail_length: i64,
    provider: &dyn LlmProvider,
) -> Result<usize> {
    let indices = candidates(conversation, detail_length);
    let count = indices.len();
    for idx in indices {
        let original = conversation[idx].content.clone();
        let request = ChatRequest {
            messages: vec![
                lop_domain::tool::Message::system(SUMMARIZER_SYSTEM_PROMPT),
                lop_domain::tool::Message::user(original),
            ],
            ..Default::default()
        };
        let response = provider.chat(request).await?;
        conversation[idx].content = format!("[SUMMARY] {}", response.content.trim());
        conversation[idx].summarized = true;
    }
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn conv_with(n: usize) -> Vec<ConversationRecord> {
        let mut v = vec![ConversationRecord::system_prompt("sys")];
        for i in 0..n {
            v.push(ConversationRecord::user(format!("msg {i}")));
        }
        v
    }

    #[test]
    fn negative_detail_length_disables() {
        let conv = conv_with(20);
        assert!(candidates(&conv, -1).is_empty());
    }

    #[test]
    fn candidates_excludes_system_prompt_and_recent_window() {
        let conv = conv_with(10);
        let idxs = candidates(&conv, 3);
        assert!(!idxs.contains(&0));
        for idx in &idxs {
            assert!(conv.len() - idx > 3);
        }
    }

    #[tokio::test]
    async fn summarize_replaces_content_and_marks_summarized() {
        use lop_providers::MockProvider;
        let mut conv = conv_with(10);
        let provider = MockProvider::new("mock", vec!["the user asked about X".into()]);
        let count = summarize(&mut conv, 3, &provider).await.unwrap();
        assert!(count > 0);
        assert!(conv[1].summarized);
        assert!(conv[1].content.starts_with("[SUMMARY]"));
    }
}

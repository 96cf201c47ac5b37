use lop_domain::conversation::ConversationRecord;

/// Trim `conversation` to: the first record (system prompt) + one synthetic
/// truncation marker + the most recent `max_history / 2` records, whenever
/// the non-system-prompt count exceeds `max_history`.
///
/// Trimming in `max_history/2`-sized chunks (rather than by one record at a
/// time) preserves provider cache hits on the stable prefix.
pub fn window(conversation: &mut Vec<ConversationRecord>, max_history: usize) {
    if conversation.is_empty() {
        return;
    }
    let non_system_count = conversation.len() - 1;
    if non_system_count <= max_history {
        return;
    }

    let keep = max_history / 2;
    let system_prompt = conversation[0].clone();
    let tail_start = conversation.len().saturating_sub(keep);
    let tail: Vec<ConversationRecord> = conversation[tail_start..].to_vec();

    let mut rebuilt = Vec::with_capacity(tail.len() + 2);
    rebuilt.push(system_prompt);
    rebuilt.push(ConversationRecord::truncation_marker());
    rebuilt.extend(tail);

    *conversation = rebuilt;
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
    fn no_trim_under_threshold() {
        let mut conv = conv_with(5);
        window(&mut conv, 10);
        assert_eq!(conv.len(), 6);
    }

    #[test]
    fn trims_to_system_marker_plus_tail() {
        let mut conv = conv_with(20);
        window(&mut conv, 10);
        assert_eq!(conv.len(), 2 + 5);
        assert!(conv[0].is_system_prompt);
        assert!(conv[1].content.contains("truncated"));
        assert_eq!(conv.last().unwrap().content, "msg 19");
    }

    #[test]
    fn never_exceeds_max_history_plus_two() {
        let mut conv = conv_with(1000);
        window(&mut conv, 10);
        assert!(conv.len() as i64 - 1 <= 10);
    }
}

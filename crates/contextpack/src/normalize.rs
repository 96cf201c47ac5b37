use lop_domain::conversation::{ConvRole, ConversationRecord};
use lop_domain::tool::Message;

/// Convert the stored conversation into the provider-agnostic wire format.
/// Only the first outgoing record may carry the system role; every later
/// system-like record is reassigned to user role, since most providers
/// reject mid-conversation system messages.
pub fn to_provider_messages(conversation: &[ConversationRecord]) -> Vec<Message> {
    conversation
        .iter()
        .enumerate()
        .map(|(i, record)| {
            let role = if i == 0 {
                ConvRole::System
            } else if record.role == ConvRole::System {
                ConvRole::User
            } else {
                record.role
            };
            match role {
                ConvRole::System => Message::system(record.content.clone()),
                ConvRole::User => Message::user(record.content.clone()),
                ConvRole::Assistant => Message::assistant(record.content.clone()),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use lop_domain::tool::Role;

    #[test]
    fn only_first_record_keeps_system_role() {
        let mut conv = vec![ConversationRecord::system_prompt("sys")];
        let mut stray_system = ConversationRecord::user("stray");
        stray_system.role = ConvRole::System;
        conv.push(stray_system);
        conv.push(ConversationRecord::assistant("hi"));

        let messages = to_provider_messages(&conv);
        assert_eq!(messages[0].role, Role::System);
        assert_eq!(messages[1].role, Role::User);
        assert_eq!(messages[2].role, Role::Assistant);
    }
}

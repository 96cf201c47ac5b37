use serde::{Deserialize, Serialize};

use crate::action::Action;

/// A single find/replace pair for an EDIT action.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Replacement {
    pub find: String,
    pub replace: String,
}

/// The structured envelope every LLM turn must produce, after the action
/// interpreter's JSON-coercion pass normalizes whatever tag/prose format the
/// model actually emitted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResponseSchema {
    pub action: Action,
    /// Prose the model wants shown to the user (final-answer phase) or a
    /// short narration of what it's about to do (action phase).
    #[serde(default)]
    pub response: String,
    /// CODE action payload.
    #[serde(default)]
    pub code: Option<String>,
    /// WRITE action payload.
    #[serde(default)]
    pub content: Option<String>,
    /// WRITE/EDIT/READ action target.
    #[serde(default)]
    pub file_path: Option<String>,
    /// EDIT action payload.
    #[serde(default)]
    pub replacements: Vec<Replacement>,
    /// Files the model says it read or intends to touch, for the HUD and
    /// for `ExecutionResult::files`.
    #[serde(default)]
    pub mentioned_files: Vec<String>,
    /// Free-text notes to fold into `AgentState::learnings`.
    #[serde(default)]
    pub learnings: Vec<String>,
}

impl ResponseSchema {
    /// Validate that the payload actually matches what its `action` needs.
    /// Standing in for design note 9's recommended strict validator: the
    /// interpreter prompt forbids multiple actions per response, but we
    /// don't trust it — this is the backstop.
    pub fn validate(&self) -> Result<(), String> {
        match self.action {
            Action::Code if self.code.is_none() => {
                Err("action=CODE requires `code`".to_string())
            }
            Action::Write if self.content.is_none() || self.file_path.is_none() => {
                Err("action=WRITE requires `content` and `file_path`".to_string())
            }
            Action::Edit if self.file_path.is_none() || self.replacements.is_empty() => {
                Err("action=EDIT requires `file_path` and at least one replacement".to_string())
            }
            Action::Read if self.file_path.is_none() => {
                Err("action=READ requires `file_path`".to_string())
            }
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base(action: Action) -> ResponseSchema {
        ResponseSchema {
            action,
            response: String::new(),
            code: None,
            content: None,
            file_path: None,
            replacements: vec![],
            mentioned_files: vec![],
            learnings: vec![],
        }
    }

    #[test]
    fn code_without_payload_rejected() {
        assert!(base(Action::Code).validate().is_err());
    }

    #[test]
    fn done_with_no_payload_is_fine() {
        assert!(base(Action::Done).validate().is_ok());
    }

    #[test]
    fn edit_requires_replacements() {
        let mut r = base(Action::Edit);
        r.file_path = Some("a.txt".into());
        assert!(r.validate().is_err());
        r.replacements.push(Replacement {
            find: "a".into(),
            replace: "b".into(),
        });
        assert!(r.validate().is_ok());
    }
}

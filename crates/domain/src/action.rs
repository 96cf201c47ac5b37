use serde::{Deserialize, Serialize};

/// The action an agent turn proposes. Mutually exclusive — the action
/// interpreter's job is to coerce free-form model output into exactly one
/// of these per turn (design note 9's "forbid multi-action per response").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Action {
    Code,
    Read,
    Write,
    Edit,
    Done,
    Ask,
    Bye,
}

impl Action {
    /// Whether this action requires a safety-audit gate before dispatch.
    pub fn requires_safety_check(self) -> bool {
        matches!(self, Action::Code | Action::Write | Action::Edit | Action::Read)
    }
}

/// What kind of thing an [`ExecutionResult`] records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExecutionType {
    Action,
    SecurityCheck,
    Plan,
    Reflection,
    Response,
    System,
}

/// The outcome of one dispatched action or check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Status {
    Success,
    Error,
    Cancelled,
    ConfirmationRequired,
    InProgress,
    Interrupted,
    None,
}

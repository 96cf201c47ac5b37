use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::action::{Action, ExecutionType, Status};
use crate::classification::RequestClassification;

/// The trace of one dispatched action or check — a node in
/// `AgentState::execution_history`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionResult {
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub action: Action,
    pub execution_type: ExecutionType,
    pub status: Status,
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub stdout: Option<String>,
    #[serde(default)]
    pub stderr: Option<String>,
    #[serde(default)]
    pub logging: Option<String>,
    #[serde(default)]
    pub formatted_print: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub files: Vec<String>,
    #[serde(default)]
    pub task_classification: Option<RequestClassification>,
    pub is_streamable: bool,
    pub is_complete: bool,
}

impl ExecutionResult {
    pub fn new(action: Action, execution_type: ExecutionType, status: Status) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            action,
            execution_type,
            status,
            code: None,
            stdout: None,
            stderr: None,
            logging: None,
            formatted_print: None,
            message: None,
            files: Vec::new(),
            task_classification: None,
            is_streamable: false,
            is_complete: matches!(
                status,
                Status::Success | Status::Error | Status::Cancelled | Status::Interrupted
            ),
        }
    }
}

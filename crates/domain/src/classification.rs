use serde::{Deserialize, Serialize};

/// Closed enum of task genres the classifier sorts an incoming request
/// into. Drives whether planning is required and which system prompt
/// variant the executor builds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskType {
    Conversation,
    Research,
    DeepResearch,
    SoftwareDevelopment,
    DataScience,
    Writing,
    Editing,
    Translation,
    Summarization,
    QuestionAnswering,
    Planning,
    Automation,
    FileManagement,
    SystemAdministration,
    ImageGeneration,
    MediaProcessing,
    Finance,
    Legal,
    Education,
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelativeEffort {
    Low,
    Medium,
    High,
}

/// The result of the classification phase (executor loop phase 2).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestClassification {
    #[serde(rename = "type")]
    pub task_type: TaskType,
    pub planning_required: bool,
    pub relative_effort: RelativeEffort,
    pub subject_change: bool,
}

impl Default for RequestClassification {
    /// The fallback used when classification tag parsing fails.
    fn default() -> Self {
        Self {
            task_type: TaskType::Other,
            planning_required: false,
            relative_effort: RelativeEffort::Medium,
            subject_change: false,
        }
    }
}

/// Parse the XML-ish tag envelope the classifier model returns, e.g.
/// `<type>research</type><planning_required>true</planning_required>
///  <relative_effort>high</relative_effort><subject_change>false</subject_change>`.
///
/// On any parse failure, falls back to `type=other, effort=medium,
/// planning=false, subject_change=false` per the executor's phase 2 contract.
pub fn parse_classification(raw: &str) -> RequestClassification {
    let task_type = extract_tag(raw, "type")
        .and_then(|s| parse_task_type(&s))
        .unwrap_or(TaskType::Other);
    let planning_required = extract_tag(raw, "planning_required")
        .map(|s| s.eq_ignore_ascii_case("true"))
        .unwrap_or(false);
    let relative_effort = extract_tag(raw, "relative_effort")
        .and_then(|s| parse_effort(&s))
        .unwrap_or(RelativeEffort::Medium);
    let subject_change = extract_tag(raw, "subject_change")
        .map(|s| s.eq_ignore_ascii_case("true"))
        .unwrap_or(false);

    RequestClassification {
        task_type,
        planning_required,
        relative_effort,
        subject_change,
    }
}

fn extract_tag(raw: &str, tag: &str) -> Option<String> {
    let open = format!("<{tag}>");
    let close = format!("</{tag}>");
    let start = raw.find(&open)? + open.len();
    let end = raw[start..].find(&close)? + start;
    Some(raw[start..end].trim().to_string())
}

fn parse_task_type(s: &str) -> Option<TaskType> {
    let normalized = s.trim().to_ascii_lowercase().replace(' ', "_");
    use TaskType::*;
    Some(match normalized.as_str() {
        "conversation" => Conversation,
        "research" => Research,
        "deep_research" => DeepResearch,
        "software_development" => SoftwareDevelopment,
        "data_science" => DataScience,
        "writing" => Writing,
        "editing" => Editing,
        "translation" => Translation,
        "summarization" => Summarization,
        "question_answering" => QuestionAnswering,
        "planning" => Planning,
        "automation" => Automation,
        "file_management" => FileManagement,
        "system_administration" => SystemAdministration,
        "image_generation" => ImageGeneration,
        "media_processing" => MediaProcessing,
        "finance" => Finance,
        "legal" => Legal,
        "education" => Education,
        "other" => Other,
        _ => return None,
    })
}

fn parse_effort(s: &str) -> Option<RelativeEffort> {
    match s.trim().to_ascii_lowercase().as_str() {
        "low" => Some(RelativeEffort::Low),
        "medium" => Some(RelativeEffort::Medium),
        "high" => Some(RelativeEffort::High),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_well_formed_envelope() {
        let raw = "<type>research</type><planning_required>true</planning_required>\
                   <relative_effort>high</relative_effort><subject_change>false</subject_change>";
        let c = parse_classification(raw);
        assert_eq!(c.task_type, TaskType::Research);
        assert!(c.planning_required);
        assert_eq!(c.relative_effort, RelativeEffort::High);
        assert!(!c.subject_change);
    }

    #[test]
    fn falls_back_on_garbage() {
        let c = parse_classification("the model rambled and emitted no tags");
        assert_eq!(c.task_type, TaskType::Other);
        assert!(!c.planning_required);
        assert_eq!(c.relative_effort, RelativeEffort::Medium);
        assert!(!c.subject_change);
    }

    #[test]
    fn falls_back_on_unknown_type_value() {
        let raw = "<type>blorp</type>";
        let c = parse_classification(raw);
        assert_eq!(c.task_type, TaskType::Other);
    }
}

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Lifecycle of a submitted job. Monotonic except for the terminal states,
/// which never transition further.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Pending,
    Running,
    Completed,
    Failed,
    Cancelled,
}

impl JobStatus {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            JobStatus::Completed | JobStatus::Failed | JobStatus::Cancelled
        )
    }
}

/// Token/turn accounting surfaced alongside a completed job's result.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct JobStats {
    #[serde(default)]
    pub turns: u32,
    #[serde(default)]
    pub input_tokens: u64,
    #[serde(default)]
    pub output_tokens: u64,
    /// Cumulative USD cost estimate, from [`crate::pricing::estimate_cost_usd`]
    /// against the agent's per-model usage.
    #[serde(default)]
    pub cost: f64,
}

/// The payload attached to a job once it reaches a terminal state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobResult {
    pub response: String,
    #[serde(default)]
    pub context: Vec<String>,
    #[serde(default)]
    pub stats: JobStats,
}

/// One asynchronous unit of work tracked by the job manager. A job wraps one
/// executor-loop run and is addressable independently of any client
/// connection — a client may disconnect and later re-attach to the same
/// job's event stream.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub id: Uuid,
    #[serde(default)]
    pub agent_id: Option<Uuid>,
    pub prompt: String,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub hosting: Option<String>,
    pub status: JobStatus,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub result: Option<JobResult>,
    #[serde(default)]
    pub error: Option<String>,
}

impl Job {
    pub fn new(prompt: impl Into<String>, agent_id: Option<Uuid>) -> Self {
        Self {
            id: Uuid::new_v4(),
            agent_id,
            prompt: prompt.into(),
            model: None,
            hosting: None,
            status: JobStatus::Pending,
            created_at: Utc::now(),
            started_at: None,
            completed_at: None,
            result: None,
            error: None,
        }
    }

    pub fn mark_running(&mut self) {
        self.status = JobStatus::Running;
        self.started_at = Some(Utc::now());
    }

    pub fn mark_completed(&mut self, result: JobResult) {
        self.status = JobStatus::Completed;
        self.completed_at = Some(Utc::now());
        self.result = Some(result);
    }

    pub fn mark_failed(&mut self, error: impl Into<String>) {
        self.status = JobStatus::Failed;
        self.completed_at = Some(Utc::now());
        self.error = Some(error.into());
    }

    pub fn mark_cancelled(&mut self) {
        self.status = JobStatus::Cancelled;
        self.completed_at = Some(Utc::now());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_job_is_pending() {
        let job = Job::new("do the thing", None);
        assert_eq!(job.status, JobStatus::Pending);
        assert!(!job.status.is_terminal());
    }

    #[test]
    fn completed_job_is_terminal() {
        let mut job = Job::new("do the thing", None);
        job.mark_running();
        job.mark_completed(JobResult {
            response: "done".into(),
            context: vec![],
            stats: JobStats::default(),
        });
        assert!(job.status.is_terminal());
        assert!(job.completed_at.is_some());
    }
}

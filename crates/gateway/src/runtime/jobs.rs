//! Job Manager: an in-memory, thread-safe registry of submitted jobs plus a
//! per-job broadcast channel used to fan updates out to the Streaming
//! Transport (SSE and WebSocket subscribers).
//!
//! Every state transition is both recorded on the `Job` itself and pushed to
//! that job's channel, so a WebSocket client that subscribes after
//! completion can still be handed the terminal snapshot on subscribe (the
//! channel is not the only source of truth — callers should always read the
//! current `Job` via [`JobStore::get`] immediately after subscribing).

use std::collections::{HashMap, VecDeque};

use lop_domain::job::{Job, JobResult, JobStatus};
use lop_domain::trace::TraceEvent;
use parking_lot::Mutex;
use tokio::sync::broadcast;
use uuid::Uuid;

/// Retained terminal jobs beyond this count are evicted oldest-first.
/// Pending/running jobs are never evicted regardless of this cap.
const DEFAULT_CAPACITY: usize = 1000;

/// Broadcast channel buffer depth per job; a slow subscriber that falls this
/// far behind sees a `Lagged` error and simply misses intermediate deltas —
/// the terminal `Job` snapshot is always available via `get`.
const CHANNEL_CAPACITY: usize = 256;

/// An event pushed to a job's subscribers.
#[derive(Debug, Clone)]
pub enum JobEvent {
    /// The job's status (or any other field) changed; carries the full
    /// current snapshot rather than a diff.
    JobUpdate(Job),
    /// An incremental chunk of the job's in-progress response, emitted
    /// while the executor loop is still running (e.g. streaming model
    /// output or a reflection note).
    MessageUpdate { delta: String },
}

struct Entry {
    job: Job,
    sender: broadcast::Sender<JobEvent>,
}

struct Inner {
    jobs: HashMap<Uuid, Entry>,
    order: VecDeque<Uuid>,
    capacity: usize,
}

/// Optional filter applied by [`JobStore::list`].
#[derive(Debug, Clone, Default)]
pub struct JobFilter {
    pub status: Option<JobStatus>,
    pub agent_id: Option<Uuid>,
}

pub struct JobStore {
    inner: Mutex<Inner>,
}

impl Default for JobStore {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl JobStore {
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Mutex::new(Inner {
                jobs: HashMap::new(),
                order: VecDeque::new(),
                capacity,
            }),
        }
    }

    /// Create a new pending job and register its event channel. Returns the
    /// new job's id.
    pub fn submit(
        &self,
        agent_id: Option<Uuid>,
        prompt: impl Into<String>,
        model: Option<String>,
        hosting: Option<String>,
    ) -> Uuid {
        let mut job = Job::new(prompt, agent_id);
        job.model = model;
        job.hosting = hosting;
        let id = job.id;
        let (sender, _) = broadcast::channel(CHANNEL_CAPACITY);

        TraceEvent::JobCreated {
            job_id: id.to_string(),
            agent_id: agent_id.map(|a| a.to_string()),
        }
        .emit();

        let mut inner = self.inner.lock();
        inner.jobs.insert(id, Entry { job, sender });
        inner.order.push_back(id);
        evict_terminal_overflow(&mut inner);
        id
    }

    pub fn get(&self, id: Uuid) -> Option<Job> {
        self.inner.lock().jobs.get(&id).map(|e| e.job.clone())
    }

    pub fn list(&self, filter: &JobFilter) -> Vec<Job> {
        let inner = self.inner.lock();
        inner
            .order
            .iter()
            .filter_map(|id| inner.jobs.get(id))
            .map(|e| &e.job)
            .filter(|job| filter.status.map(|s| s == job.status).unwrap_or(true))
            .filter(|job| filter.agent_id.map(|a| Some(a) == job.agent_id).unwrap_or(true))
            .cloned()
            .collect()
    }

    /// Subscribe to a job's event stream. Returns `None` if the job is
    /// unknown. Callers should immediately follow up with [`Self::get`] to
    /// pick up the current snapshot, since events emitted before
    /// subscribing are not replayed.
    pub fn subscribe(&self, id: Uuid) -> Option<broadcast::Receiver<JobEvent>> {
        self.inner.lock().jobs.get(&id).map(|e| e.sender.subscribe())
    }

    /// Publish an incremental message delta without changing job status.
    /// Best-effort: if nobody is subscribed this is a no-op.
    pub fn publish_delta(&self, id: Uuid, delta: impl Into<String>) {
        let inner = self.inner.lock();
        if let Some(entry) = inner.jobs.get(&id) {
            let _ = entry.sender.send(JobEvent::MessageUpdate { delta: delta.into() });
        }
    }

    fn mutate(&self, id: Uuid, f: impl FnOnce(&mut Job)) -> Option<Job> {
        let mut inner = self.inner.lock();
        let entry = inner.jobs.get_mut(&id)?;
        f(&mut entry.job);
        let snapshot = entry.job.clone();

        TraceEvent::JobStatusChanged {
            job_id: id.to_string(),
            status: format!("{:?}", snapshot.status).to_ascii_lowercase(),
        }
        .emit();

        let _ = entry.sender.send(JobEvent::JobUpdate(snapshot.clone()));
        evict_terminal_overflow(&mut inner);
        Some(snapshot)
    }

    pub fn mark_running(&self, id: Uuid) -> Option<Job> {
        self.mutate(id, Job::mark_running)
    }

    pub fn mark_completed(&self, id: Uuid, result: JobResult) -> Option<Job> {
        self.mutate(id, |job| job.mark_completed(result))
    }

    pub fn mark_failed(&self, id: Uuid, error: impl Into<String>) -> Option<Job> {
        let error = error.into();
        self.mutate(id, |job| job.mark_failed(error))
    }

    pub fn mark_cancelled(&self, id: Uuid) -> Option<Job> {
        self.mutate(id, Job::mark_cancelled)
    }
}

/// Drops the oldest terminal jobs (and their channels) once the store holds
/// more entries than `capacity`. Pending/running jobs are skipped and left
/// in place even if they are the oldest entries, since they still have
/// live work in flight.
fn evict_terminal_overflow(inner: &mut Inner) {
    while inner.order.len() > inner.capacity {
        let evict_at = inner
            .order
            .iter()
            .position(|id| inner.jobs.get(id).map(|e| e.job.status.is_terminal()).unwrap_or(true));
        match evict_at {
            Some(pos) => {
                let id = inner.order.remove(pos).expect("position was just found");
                inner.jobs.remove(&id);
            }
            None => break,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn submit_creates_pending_job() {
        let store = JobStore::default();
        let id = store.submit(None, "do the thing", None, None);
        let job = store.get(id).unwrap();
        assert_eq!(job.status, JobStatus::Pending);
    }

    #[test]
    fn unknown_job_returns_none() {
        let store = JobStore::default();
        assert!(store.get(Uuid::new_v4()).is_none());
        assert!(store.subscribe(Uuid::new_v4()).is_none());
    }

    #[test]
    fn lifecycle_transitions_update_status_and_timestamps() {
        let store = JobStore::default();
        let id = store.submit(None, "prompt", None, None);

        let running = store.mark_running(id).unwrap();
        assert_eq!(running.status, JobStatus::Running);
        assert!(running.started_at.is_some());

        let completed = store
            .mark_completed(
                id,
                JobResult {
                    response: "done".into(),
                    context: vec![],
                    stats: Default::default(),
                },
            )
            .unwrap();
        assert_eq!(completed.status, JobStatus::Completed);
        assert!(completed.completed_at.unwrap() >= completed.started_at.unwrap());
    }

    #[tokio::test]
    async fn subscribers_receive_job_update_events_in_order() {
        let store = JobStore::default();
        let id = store.submit(None, "prompt", None, None);
        let mut rx1 = store.subscribe(id).unwrap();
        let mut rx2 = store.subscribe(id).unwrap();

        store.mark_running(id);
        store.mark_completed(
            id,
            JobResult {
                response: "done".into(),
                context: vec![],
                stats: Default::default(),
            },
        );

        for rx in [&mut rx1, &mut rx2] {
            match rx.recv().await.unwrap() {
                JobEvent::JobUpdate(job) => assert_eq!(job.status, JobStatus::Running),
                other => panic!("unexpected event: {other:?}"),
            }
            match rx.recv().await.unwrap() {
                JobEvent::JobUpdate(job) => assert_eq!(job.status, JobStatus::Completed),
                other => panic!("unexpected event: {other:?}"),
            }
        }
    }

    #[tokio::test]
    async fn late_subscriber_gets_the_completed_snapshot_via_get() {
        let store = JobStore::default();
        let id = store.submit(None, "prompt", None, None);

        let mut early = store.subscribe(id).unwrap();
        store.mark_running(id);
        store.mark_completed(
            id,
            JobResult {
                response: "done".into(),
                context: vec![],
                stats: Default::default(),
            },
        );

        // Drain the two events the early subscriber was promised.
        for _ in 0..2 {
            early.recv().await.unwrap();
        }

        // A subscriber that joins after completion gets no more channel
        // events (the broadcast has already been sent), so callers are
        // expected to call `get` right after `subscribe` for the current
        // snapshot — exactly what the transport layer does.
        let late = store.subscribe(id).unwrap();
        assert_eq!(late.len(), 0);
        let snapshot = store.get(id).unwrap();
        assert_eq!(snapshot.status, JobStatus::Completed);
    }

    #[test]
    fn list_filters_by_status_and_agent() {
        let store = JobStore::default();
        let agent = Uuid::new_v4();
        let a = store.submit(Some(agent), "a", None, None);
        let _b = store.submit(None, "b", None, None);
        store.mark_running(a);

        let running = store.list(&JobFilter {
            status: Some(JobStatus::Running),
            agent_id: None,
        });
        assert_eq!(running.len(), 1);
        assert_eq!(running[0].id, a);

        let for_agent = store.list(&JobFilter {
            status: None,
            agent_id: Some(agent),
        });
        assert_eq!(for_agent.len(), 1);
    }

    #[test]
    fn eviction_never_drops_running_jobs() {
        let store = JobStore::new(1);
        let a = store.submit(None, "a", None, None);
        store.mark_running(a);
        let b = store.submit(None, "b", None, None);

        assert!(store.get(a).is_some(), "running job must survive eviction");
        assert!(store.get(b).is_some());
    }
}

//! Per-job cancellation tokens.
//!
//! Each running job gets a `CancelToken`. Calling `cancel()` on it signals
//! the executor loop to stop at its next suspension point and finalize the
//! job as cancelled rather than completed.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

/// A cancellation token checked by the executor loop at every phase
/// boundary and before/after each dispatched action.
#[derive(Clone)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self {
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }
}

impl Default for CancelToken {
    fn default() -> Self {
        Self::new()
    }
}

/// Tracks the cancel token of every currently-running job, keyed by job id.
pub struct CancelMap {
    tokens: Mutex<HashMap<String, CancelToken>>,
}

impl Default for CancelMap {
    fn default() -> Self {
        Self::new()
    }
}

impl CancelMap {
    pub fn new() -> Self {
        Self {
            tokens: Mutex::new(HashMap::new()),
        }
    }

    /// Create and register a new cancel token for a job.
    pub fn register(&self, job_id: &str) -> CancelToken {
        let token = CancelToken::new();
        self.tokens.lock().insert(job_id.to_owned(), token.clone());
        token
    }

    /// Cancel a running job. Returns true if a token was found.
    pub fn cancel(&self, job_id: &str) -> bool {
        match self.tokens.lock().get(job_id) {
            Some(token) => {
                token.cancel();
                true
            }
            None => false,
        }
    }

    /// Remove the token for a job (called once the executor loop returns).
    pub fn remove(&self, job_id: &str) {
        self.tokens.lock().remove(job_id);
    }

    pub fn is_running(&self, job_id: &str) -> bool {
        self.tokens.lock().contains_key(job_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cancel_token_lifecycle() {
        let token = CancelToken::new();
        assert!(!token.is_cancelled());
        token.cancel();
        assert!(token.is_cancelled());
    }

    #[test]
    fn cancel_map_register_and_cancel() {
        let map = CancelMap::new();
        let token = map.register("job1");
        assert!(!token.is_cancelled());
        assert!(map.is_running("job1"));

        assert!(map.cancel("job1"));
        assert!(token.is_cancelled());

        map.remove("job1");
        assert!(!map.is_running("job1"));
        assert!(!map.cancel("job1"));
    }

    #[test]
    fn cancel_nonexistent_job_returns_false() {
        let map = CancelMap::new();
        assert!(!map.cancel("does_not_exist"));
    }

    #[test]
    fn remove_is_idempotent() {
        let map = CancelMap::new();
        map.register("job1");
        map.remove("job1");
        map.remove("job1");
        assert!(!map.is_running("job1"));
    }

    #[test]
    fn register_replaces_previous_token() {
        let map = CancelMap::new();
        let old_token = map.register("job1");
        let new_token = map.register("job1");

        assert!(!old_token.is_cancelled());
        assert!(!new_token.is_cancelled());

        map.cancel("job1");
        assert!(new_token.is_cancelled());
        assert!(!old_token.is_cancelled());
    }

    #[test]
    fn cancel_token_clone_shares_state() {
        let token = CancelToken::new();
        let clone = token.clone();
        assert!(!clone.is_cancelled());
        token.cancel();
        assert!(clone.is_cancelled());
    }

    #[test]
    fn cancel_map_default_trait() {
        let map = CancelMap::default();
        assert!(!map.is_running("any"));
    }
}

//! Core runtime — cancellation, the Safety Auditor, the Job Manager, the
//! per-agent session lock, and the Executor Loop that ties them together
//! into one deterministic turn.
//!
//! Entry point: [`executor::run_turn`] takes a turn context + user message
//! and returns a [`executor::TurnOutcome`].

pub mod cancel;
pub mod executor;
pub mod job_exec;
pub mod jobs;
pub mod safety;
pub mod session_lock;

pub use executor::{run_turn, TurnContext, TurnOutcome};

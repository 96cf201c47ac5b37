/// Shared error type used across the runtime.
///
/// Variants map onto the kinds from the error-handling design: some are
/// fatal at startup (`ExecutorInit`), some feed back into the conversation
/// as a user turn so the model can recover (`CodeExecution`, `Validation`,
/// `FileIO`), some are never retried silently (`SafetyDenied`), and some
/// drive the executor's retry/backoff loop (`ProviderTransient`) or job
/// failure (`ProviderFatal`).
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("IO: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP: {0}")]
    Http(String),

    #[error("timeout: {0}")]
    Timeout(String),

    #[error("provider {provider}: {message}")]
    Provider { provider: String, message: String },

    #[error("config: {0}")]
    Config(String),

    #[error("auth: {0}")]
    Auth(String),

    /// The runtime could not be constructed (missing credentials, bad config).
    /// Fatal at startup.
    #[error("executor init: {0}")]
    ExecutorInit(String),

    /// A sandbox snippet raised. Carries the annotated snippet so the
    /// caller can append it to the conversation for the model to see.
    #[error("code execution failed: {message}")]
    CodeExecution {
        message: String,
        annotated_code: String,
        /// `"agent {id} (model {model})"`, filled in by the caller once the
        /// failing turn's context is known — the sandbox itself has no
        /// notion of agent identity.
        agent_info_str: Option<String>,
    },

    /// The model's output could not be coerced to the Response Schema.
    #[error("response validation failed: {0}")]
    Validation(String),

    /// Returned by the safety auditor. Never retried silently by the caller.
    #[error("safety denied: {0}")]
    SafetyDenied(String),

    /// A transient provider failure (rate limit, 5xx). Callers retry with
    /// backoff; `retry_after` carries the provider's `Retry-After` hint in
    /// seconds when present.
    #[error("provider transient error: {message}")]
    ProviderTransient {
        message: String,
        retry_after_secs: Option<u64>,
    },

    /// A provider failure surfaced after retry exhaustion.
    #[error("provider fatal error: {0}")]
    ProviderFatal(String),

    /// READ/WRITE/EDIT failures: file too large, find-string missing, etc.
    #[error("file io: {0}")]
    FileIo(String),

    /// The job/turn was interrupted by the caller.
    #[error("interrupted")]
    Interrupted,

    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Render a terse, user-facing message suitable for a terminal or UI,
    /// per the "every failure carries a `formatted_print` field" requirement.
    pub fn formatted_print(&self) -> String {
        match self {
            Error::CodeExecution {
                message,
                annotated_code,
                agent_info_str,
            } => match agent_info_str {
                Some(info) => format!("Code execution error [{info}]: {message}\n\n{annotated_code}"),
                None => format!("Code execution error: {message}\n\n{annotated_code}"),
            },
            other => format!("Error: {other}"),
        }
    }

    /// Attach agent identity to a [`Error::CodeExecution`], no-op on any
    /// other variant. The sandbox constructs the error without this context;
    /// the executor fills it in once the failing turn's agent/model is known.
    pub fn with_agent_info(self, agent_id: &str, model: &str) -> Self {
        match self {
            Error::CodeExecution { message, annotated_code, .. } => Error::CodeExecution {
                message,
                annotated_code,
                agent_info_str: Some(format!("agent {agent_id} (model {model})")),
            },
            other => other,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formatted_print_includes_annotated_code() {
        let err = Error::CodeExecution {
            message: "NameError: x is not defined".into(),
            annotated_code: "   1 |   7 | print(x)".into(),
            agent_info_str: None,
        };
        let rendered = err.formatted_print();
        assert!(rendered.contains("NameError"));
        assert!(rendered.contains("print(x)"));
    }

    #[test]
    fn with_agent_info_is_rendered_by_formatted_print() {
        let err = Error::CodeExecution {
            message: "boom".into(),
            annotated_code: "   1 |   4 | boom()".into(),
            agent_info_str: None,
        }
        .with_agent_info("agent-1", "claude-test");
        let rendered = err.formatted_print();
        assert!(rendered.contains("agent agent-1"));
        assert!(rendered.contains("model claude-test"));
    }

    #[test]
    fn with_agent_info_is_noop_on_other_variants() {
        let err = Error::Validation("bad schema".into()).with_agent_info("agent-1", "model-x");
        assert!(matches!(err, Error::Validation(_)));
    }
}

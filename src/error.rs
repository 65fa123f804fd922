//! Error types for the intent orchestrator
//!
//! Schema violations are never raised through these types: they are returned
//! as [`SchemaReport`](crate::schema::SchemaReport) values so callers can diff
//! the initial and final checks.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Failures of a single generation-service call.
#[derive(Error, Debug)]
pub enum LlmError {
    #[error("LLM configuration incomplete: missing {missing}")]
    Configuration { missing: String },

    #[error("{status} {reason} @ {url} :: {body}")]
    Upstream {
        status: u16,
        reason: String,
        url: String,
        body: String,
    },

    #[error("upstream timed out after {timeout_secs}s @ {url}")]
    Timeout { url: String, timeout_secs: u64 },

    #[error("request failed @ {url} :: {message}")]
    Transport { url: String, message: String },

    #[error("model returned non-JSON content: {snippet}")]
    MalformedResponse { snippet: String },
}

impl LlmError {
    pub fn malformed(content: &str) -> Self {
        Self::MalformedResponse {
            snippet: truncate_chars(content, 200),
        }
    }

    /// Whether the failure came from the remote side (status, timeout or transport).
    pub fn is_upstream(&self) -> bool {
        matches!(
            self,
            Self::Upstream { .. } | Self::Timeout { .. } | Self::Transport { .. }
        )
    }
}

#[derive(Error, Debug)]
pub enum IntentError {
    #[error("unknown profile: {0}")]
    UnknownProfile(String),

    #[error("intent is missing the profile field")]
    MissingProfile,

    #[error("intent must be a JSON object")]
    NotAnObject,

    #[error("Schema/Template not found: {}", path.display())]
    SchemaNotFound { path: PathBuf },

    #[error("JSON decode error in {}: {message}", path.display())]
    Decode { path: PathBuf, message: String },

    #[error("LLM collection failed: {0}")]
    Collector(#[source] LlmError),

    #[error("LLM fill failed: {0}")]
    FastFill(#[source] LlmError),

    #[error("invalid job id: {0}")]
    InvalidJobId(String),

    #[error("storage failure at {}: {source}", path.display())]
    Storage {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("JSON serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

pub type IntentResult<T> = Result<T, IntentError>;

/// Job registry failures.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum JobError {
    #[error("job registry task unavailable")]
    Unavailable,

    #[error("unknown job: {0}")]
    NotFound(String),

    #[error("job {job_id} cannot move from {from} to {to}")]
    InvalidTransition {
        job_id: String,
        from: String,
        to: String,
    },
}

pub(crate) fn truncate_chars(text: &str, limit: usize) -> String {
    text.chars().take(limit).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upstream_error_renders_status_and_body() {
        let err = LlmError::Upstream {
            status: 503,
            reason: "Service Unavailable".into(),
            url: "http://llm/chat/completions".into(),
            body: "busy".into(),
        };
        assert_eq!(
            err.to_string(),
            "503 Service Unavailable @ http://llm/chat/completions :: busy"
        );
        assert!(err.is_upstream());
    }

    #[test]
    fn malformed_snippet_is_bounded() {
        let content = "x".repeat(500);
        match LlmError::malformed(&content) {
            LlmError::MalformedResponse { snippet } => assert_eq!(snippet.len(), 200),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn configuration_error_is_not_upstream() {
        let err = LlmError::Configuration {
            missing: "api_key".into(),
        };
        assert!(!err.is_upstream());
    }
}

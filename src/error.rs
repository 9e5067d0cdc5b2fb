//! Error types for the council engine

use thiserror::Error;

/// Result type alias for council operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the council engine
#[derive(Debug, Error)]
pub enum Error {
    /// Text-generation backend failure (transport, quota, timeout)
    #[error("generation error: {0}")]
    Generation(String),

    /// Generation output that failed structured-payload extraction
    #[error("malformed generation output: {0}")]
    MalformedOutput(String),

    /// Routing could not find a valid addressee for a question
    #[error("no eligible target for question from {asker}")]
    NoEligibleTarget {
        /// Participant that asked the question
        asker: String,
    },

    /// Zero usable participants remain; the session cannot continue
    #[error("roster exhausted: {0}")]
    RosterExhausted(String),

    /// Session ID not present in the store
    #[error("session not found: {0}")]
    SessionNotFound(String),

    /// Admission limit on concurrently running sessions reached
    #[error("session limit reached: {running} running (max {max})")]
    CapacityExceeded {
        /// Sessions currently running
        running: usize,
        /// Configured admission limit
        max: usize,
    },

    /// HTTP request error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Serialization/deserialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// Invalid session input (empty topic, too few options, ...)
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Create a generation error
    pub fn generation(msg: impl Into<String>) -> Self {
        Self::Generation(msg.into())
    }

    /// Create a malformed-output error
    pub fn malformed(msg: impl Into<String>) -> Self {
        Self::MalformedOutput(msg.into())
    }

    /// Create a roster-exhausted error
    pub fn roster(msg: impl Into<String>) -> Self {
        Self::RosterExhausted(msg.into())
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create an invalid-input error
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    /// Whether the task layer should retry after this error
    ///
    /// Only transport-level generation failures are transient; parse
    /// failures are final for the attempt that produced them.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Generation(_) | Self::Http(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generation_errors_are_retryable() {
        assert!(Error::generation("timeout").is_retryable());
        assert!(!Error::malformed("not json").is_retryable());
        assert!(!Error::roster("no debaters").is_retryable());
    }
}

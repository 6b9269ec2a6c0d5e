//! Error types for mSCP operations

use std::time::Duration;

use serde::Serialize;
use thiserror::Error;

/// Result type alias for mSCP operations
pub type Result<T> = std::result::Result<T, Error>;

/// Coarse failure classification callers can branch on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// A path, file or executable is missing
    NotFound,
    /// A bounded operation exceeded its time limit
    Timeout,
    /// A subprocess exited non-zero
    ExternalFailure,
    /// The caller's request cannot be satisfied as given
    PreconditionUnmet,
    /// IO or configuration problems inside this tool
    Internal,
}

/// Error type for mSCP operations
#[derive(Error, Debug)]
pub enum Error {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A required path, file or executable does not exist
    #[error("{0}")]
    NotFound(String),

    /// A subprocess did not finish within its time limit
    #[error("`{command}` timed out after {}s", timeout.as_secs())]
    Timeout {
        command: String,
        timeout: Duration,
        /// Output captured before the process was killed
        output: String,
    },

    /// A subprocess exited with a non-zero status
    #[error("`{command}` failed with exit code {}", code.map_or_else(|| "none".to_string(), |c| c.to_string()))]
    ExternalFailure {
        command: String,
        code: Option<i32>,
        output: String,
    },

    /// The request was rejected before anything ran
    #[error("{0}")]
    PreconditionUnmet(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Generic error with message
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Classify this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::NotFound(_) => ErrorKind::NotFound,
            Error::Timeout { .. } => ErrorKind::Timeout,
            Error::ExternalFailure { .. } => ErrorKind::ExternalFailure,
            Error::PreconditionUnmet(_) => ErrorKind::PreconditionUnmet,
            Error::Io(_) | Error::Config(_) | Error::Other(_) => ErrorKind::Internal,
        }
    }

    /// Raw subprocess output attached to this error, if any
    pub fn output(&self) -> Option<&str> {
        match self {
            Error::Timeout { output, .. } | Error::ExternalFailure { output, .. } => {
                Some(output.as_str())
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_mapping() {
        assert_eq!(Error::NotFound("x".into()).kind(), ErrorKind::NotFound);
        assert_eq!(
            Error::PreconditionUnmet("x".into()).kind(),
            ErrorKind::PreconditionUnmet
        );
        assert_eq!(Error::Config("x".into()).kind(), ErrorKind::Internal);
        let io = Error::from(std::io::Error::other("disk"));
        assert_eq!(io.kind(), ErrorKind::Internal);

        let timeout = Error::Timeout {
            command: "git clone".into(),
            timeout: Duration::from_secs(120),
            output: "Cloning into 'x'...".into(),
        };
        assert_eq!(timeout.kind(), ErrorKind::Timeout);
        assert_eq!(timeout.output(), Some("Cloning into 'x'..."));
        assert_eq!(timeout.to_string(), "`git clone` timed out after 120s");
    }

    #[test]
    fn test_external_failure_display() {
        let err = Error::ExternalFailure {
            command: "git pull --ff-only".into(),
            code: Some(128),
            output: "fatal: Not possible to fast-forward, aborting.".into(),
        };
        assert_eq!(err.kind(), ErrorKind::ExternalFailure);
        assert_eq!(err.to_string(), "`git pull --ff-only` failed with exit code 128");

        let killed = Error::ExternalFailure {
            command: "uv run".into(),
            code: None,
            output: String::new(),
        };
        assert!(killed.to_string().ends_with("exit code none"));
    }
}

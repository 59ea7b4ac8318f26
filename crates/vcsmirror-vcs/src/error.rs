//! VCS error types with rich context for debugging and recovery.

use std::path::PathBuf;
use thiserror::Error;

/// VCS-specific error types with detailed context.
#[derive(Error, Debug)]
pub enum VcsError {
    /// Git operation failed.
    #[error("git error: {message}")]
    Git {
        /// Error message.
        message: String,
        /// Optional source error.
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Mercurial operation failed.
    #[error("mercurial error: {message}")]
    Mercurial {
        /// Error message.
        message: String,
    },

    /// Mirror clone failed.
    #[error("clone failed for {url}: {reason}")]
    CloneFailed {
        /// Repository URL.
        url: String,
        /// Failure reason.
        reason: String,
        /// Whether this error is retryable.
        retryable: bool,
    },

    /// Mirror update (fetch) failed.
    #[error("update failed for remote '{remote}': {reason}")]
    UpdateFailed {
        /// Remote name or URL.
        remote: String,
        /// Failure reason.
        reason: String,
        /// Whether this error is retryable.
        retryable: bool,
    },

    /// Repository not found upstream.
    #[error("repository not found: {url}")]
    RepositoryNotFound {
        /// Repository URL.
        url: String,
    },

    /// File or revision not found in the mirror.
    #[error("not found: {what}")]
    NotFound {
        /// What wasn't found (a path, a revision, or "revision or path").
        what: String,
    },

    /// Not a mirror directory.
    #[error("not a repository: {path}")]
    NotRepository {
        /// Path that is not a repository.
        path: PathBuf,
    },

    /// Path exists but is not a directory.
    #[error("repo path is not directory: {path}")]
    NotADirectory {
        /// The offending path.
        path: PathBuf,
    },

    /// IO error.
    #[error("io error at {path}: {message}")]
    Io {
        /// File path.
        path: PathBuf,
        /// Error message.
        message: String,
    },

    /// Command execution failed.
    #[error("command '{command}' failed: {message}")]
    Command {
        /// Command that failed.
        command: String,
        /// Error message.
        message: String,
        /// Exit code if available.
        exit_code: Option<i32>,
    },

    /// VCS tool not available.
    #[error("{vcs_type} is not installed or not in PATH")]
    ToolNotAvailable {
        /// VCS type (git, hg).
        vcs_type: String,
    },
}

impl VcsError {
    /// Create a Git error from a message.
    #[must_use]
    pub fn git(message: impl Into<String>) -> Self {
        Self::Git {
            message: message.into(),
            source: None,
        }
    }

    /// Create a Git error with a source.
    #[must_use]
    pub fn git_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Git {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Create an IO error.
    #[must_use]
    pub fn io(path: impl Into<PathBuf>, err: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            message: err.to_string(),
        }
    }

    /// Create a clone-failed error.
    #[must_use]
    pub fn clone_failed(url: impl Into<String>, reason: impl Into<String>, retryable: bool) -> Self {
        Self::CloneFailed {
            url: url.into(),
            reason: reason.into(),
            retryable,
        }
    }

    /// Check if this error is retryable.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::CloneFailed { retryable, .. } | Self::UpdateFailed { retryable, .. } => *retryable,
            Self::Git { message, .. } | Self::Mercurial { message } => {
                message.contains("network") || message.contains("timeout") || message.contains("connection")
            }
            _ => false,
        }
    }

    /// Check if this is a "not found" error: a missing file, a missing
    /// revision, or a missing upstream repository.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::RepositoryNotFound { .. } | Self::NotFound { .. })
    }
}

impl From<std::io::Error> for VcsError {
    fn from(err: std::io::Error) -> Self {
        Self::Io {
            path: PathBuf::new(),
            message: err.to_string(),
        }
    }
}

/// Result type for VCS operations.
pub type Result<T> = std::result::Result<T, VcsError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clone_failed_retryable_flag_round_trips() {
        let err = VcsError::clone_failed("git://example.com/r", "connection reset", true);
        assert!(err.is_retryable());
    }

    #[test]
    fn not_found_is_not_found() {
        let err = VcsError::NotFound {
            what: "foo.txt at rev deadbeef".into(),
        };
        assert!(err.is_not_found());
        assert!(!err.is_retryable());
    }

    #[test]
    fn command_error_is_not_not_found() {
        let err = VcsError::Command {
            command: "git cat-file".into(),
            message: "fatal: bad object".into(),
            exit_code: Some(128),
        };
        assert!(!err.is_not_found());
    }
}

//! Error types for configuration loading.

use miette::Diagnostic;
use std::path::PathBuf;
use thiserror::Error;

/// Configuration error type with rich diagnostics.
#[derive(Error, Debug, Diagnostic)]
pub enum ConfigError {
    /// Invalid field value.
    #[error("invalid value for '{field}': {message}")]
    #[diagnostic(code(config::invalid_value), help("{hint}"))]
    InvalidValue {
        /// Field name.
        field: String,
        /// Error message.
        message: String,
        /// Help hint.
        hint: String,
    },

    /// Invalid path.
    #[error("invalid path for '{field}': {path}")]
    #[diagnostic(code(config::invalid_path))]
    InvalidPath {
        /// Field name.
        field: String,
        /// Invalid path.
        path: String,
    },

    /// IO error while resolving a default directory.
    #[error("IO error at {path}: {message}")]
    #[diagnostic(code(config::io_error))]
    Io {
        /// File path.
        path: PathBuf,
        /// Error message.
        message: String,
    },

    /// Environment variable could not be interpreted.
    #[error("invalid environment variable {var}: {message}")]
    #[diagnostic(code(config::env_error))]
    EnvError {
        /// Variable name.
        var: String,
        /// Error message.
        message: String,
    },

    /// No allowed hosts were configured.
    #[error("no allowed hosts configured: pass at least one host as a positional argument or via VCSMIRROR_HOSTS")]
    #[diagnostic(code(config::no_hosts), help("e.g. `vcsmirror-server --bind 0.0.0.0:8080 github.com bitbucket.org`"))]
    NoHosts,
}

impl ConfigError {
    /// Create an invalid value error.
    #[must_use]
    pub fn invalid_value(field: impl Into<String>, message: impl Into<String>, hint: impl Into<String>) -> Self {
        Self::InvalidValue {
            field: field.into(),
            message: message.into(),
            hint: hint.into(),
        }
    }

    /// Create an IO error with context.
    #[must_use]
    pub fn io(path: impl Into<PathBuf>, err: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            message: err.to_string(),
        }
    }

    /// Create an environment-variable error.
    #[must_use]
    pub fn env(var: impl Into<String>, message: impl Into<String>) -> Self {
        Self::EnvError {
            var: var.into(),
            message: message.into(),
        }
    }
}

impl From<std::io::Error> for ConfigError {
    fn from(err: std::io::Error) -> Self {
        Self::Io {
            path: PathBuf::new(),
            message: err.to_string(),
        }
    }
}

/// Result type for configuration operations.
pub type Result<T> = std::result::Result<T, ConfigError>;

//! Error taxonomy for request dispatch.
//!
//! Every component between the router and the top-level HTTP handler
//! communicates failure through [`HttpError`] rather than a raw
//! `std::io::Error` or subprocess exit status: the top-level handler only
//! needs to know how to turn an `HttpError` into a status line and a body.
//! The message on an `HttpError` is always safe to return verbatim to the
//! client; anything sensitive (subprocess stderr, filesystem paths) stays in
//! the `tracing` event emitted alongside it.

use std::fmt;
use thiserror::Error;

/// The five status-code buckets the core ever returns.
///
/// `BadPath` and `NotFound` both map to HTTP 404 but are kept distinct
/// because they originate from different places (a malformed request path
/// vs. a revision or file genuinely absent from the mirror) and callers
/// sometimes need to tell them apart (see [`HttpError::is_not_found`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The request path didn't match the router grammar at all.
    BadPath,
    /// The request path matched the grammar but carried an invalid value.
    BadRequest,
    /// The host in the request isn't in the configured whitelist.
    Forbidden,
    /// A file or revision genuinely doesn't exist in the mirror.
    NotFound,
    /// Anything else: filesystem, subprocess, or upstream VCS failure.
    Internal,
}

impl ErrorKind {
    /// The HTTP status code this kind maps to.
    #[must_use]
    pub const fn status(self) -> u16 {
        match self {
            Self::BadPath | Self::NotFound => 404,
            Self::BadRequest => 400,
            Self::Forbidden => 403,
            Self::Internal => 500,
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::BadPath => "bad-path",
            Self::BadRequest => "bad-request",
            Self::Forbidden => "forbidden",
            Self::NotFound => "not-found",
            Self::Internal => "internal",
        };
        f.write_str(s)
    }
}

/// A request-scoped failure carrying a status code and a user-safe message.
#[derive(Error, Debug, Clone)]
#[error("{message}")]
pub struct HttpError {
    /// Text returned verbatim as the response body on failure.
    pub message: String,
    /// Which taxonomy bucket produced this error.
    pub kind: ErrorKind,
}

impl HttpError {
    /// Build an error of the given kind.
    #[must_use]
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            kind,
        }
    }

    /// 404: the request path did not match the router grammar.
    #[must_use]
    pub fn bad_path(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::BadPath, message)
    }

    /// 400: a structurally valid request carried an invalid value.
    #[must_use]
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::BadRequest, message)
    }

    /// 403: the host is not in the configured whitelist.
    #[must_use]
    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Forbidden, message)
    }

    /// 404: a file or revision does not exist in the mirror.
    #[must_use]
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotFound, message)
    }

    /// 500: a filesystem, subprocess, or upstream VCS failure.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Internal, message)
    }

    /// The HTTP status code for this error.
    #[must_use]
    pub const fn status(&self) -> u16 {
        self.kind.status()
    }

    /// True for the two 404 kinds (`BadPath`, `NotFound`).
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self.kind, ErrorKind::BadPath | ErrorKind::NotFound)
    }

    /// Annotate this error as having been observed by a coordinator waiter
    /// rather than the leader that actually ran the clone/update, per the
    /// coordinator's error-propagation rule.
    #[must_use]
    pub fn after_waiting(&self) -> Self {
        Self {
            message: format!("after waiting: {}", self.message),
            kind: self.kind,
        }
    }
}

/// Result type for request-dispatch operations.
pub type Result<T> = std::result::Result<T, HttpError>;

//! Error types for remote API operations.
//!
//! Every failed call is classified into one [`ErrorKind`]. The kind drives
//! retry decisions and tells callers whether a failure can be treated as
//! "no match" or "already done".

use std::time::Duration;
use thiserror::Error;

/// Closed set of failure categories returned by the remote API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The addressed object does not exist
    NotFound,
    /// A uniqueness constraint was violated
    Conflict,
    /// Too many requests (transient, retryable)
    RateLimited,
    /// The server failed to handle the request (transient, retryable)
    Server,
    /// The request was rejected as malformed
    Validation,
    /// Missing or invalid credentials
    Authentication,
    /// Credentials lack the required scope
    Authorization,
    /// Transport failures and anything else unclassified (retryable)
    Unknown,
}

impl ErrorKind {
    /// Whether this kind of error is transient and worth retrying.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::RateLimited | Self::Server | Self::Unknown)
    }

    /// Short machine-readable tag, stable across releases.
    pub fn tag(&self) -> &'static str {
        match self {
            Self::NotFound => "not_found",
            Self::Conflict => "conflict",
            Self::RateLimited => "rate_limited",
            Self::Server => "server_error",
            Self::Validation => "validation",
            Self::Authentication => "authentication",
            Self::Authorization => "authorization",
            Self::Unknown => "unknown",
        }
    }

    /// Get a user-friendly description of this error kind.
    pub fn description(&self) -> &'static str {
        match self {
            Self::NotFound => "Remote object not found",
            Self::Conflict => "Uniqueness conflict",
            Self::RateLimited => "Rate limit exceeded",
            Self::Server => "Remote server error",
            Self::Validation => "Request rejected by validation",
            Self::Authentication => "Authentication failed",
            Self::Authorization => "Permission denied",
            Self::Unknown => "Unexpected error",
        }
    }

    /// Get actionable advice for resolving this error kind.
    pub fn advice(&self) -> &'static str {
        match self {
            Self::NotFound => "Check that the parent object, list or record exists",
            Self::Conflict => {
                "Another object already holds this unique key - rename it or import it"
            }
            Self::RateLimited => "Wait a moment and run the command again",
            Self::Server => "The service may be degraded, try again later",
            Self::Validation => "Fix the declared properties and try again",
            Self::Authentication => "Set a valid API token (CRMFORM_API_TOKEN)",
            Self::Authorization => "Grant the API token the scopes this resource needs",
            Self::Unknown => "Check your network connection and the error details",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.tag())
    }
}

/// Errors returned by remote API operations.
#[derive(Debug, Clone, Error)]
pub enum Error {
    /// The addressed object does not exist
    #[error("not found: {resource}")]
    NotFound {
        /// What was being looked up
        resource: String,
    },

    /// Uniqueness violation
    #[error("conflict: {message}")]
    Conflict {
        /// Server-provided description
        message: String,
    },

    /// Too many requests
    #[error("rate limited: {message}")]
    RateLimited {
        /// Server-provided description
        message: String,
        /// Delay requested by the server, if any
        retry_after: Option<Duration>,
    },

    /// 5xx response
    #[error("server error ({status}): {message}")]
    Server {
        /// HTTP status code
        status: u16,
        /// Server-provided description
        message: String,
    },

    /// Request rejected as malformed
    #[error("validation failed: {message}")]
    Validation {
        /// Server-provided description
        message: String,
    },

    /// Missing or invalid credentials
    #[error("authentication failed: {message}")]
    Authentication {
        /// Server-provided description
        message: String,
    },

    /// Credentials lack the required scope
    #[error("not authorized: {message}")]
    Authorization {
        /// Server-provided description
        message: String,
    },

    /// Transport failure or unclassified response
    #[error("{message}")]
    Unknown {
        /// Description of the failure
        message: String,
    },
}

impl Error {
    /// Get the error kind.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::NotFound { .. } => ErrorKind::NotFound,
            Error::Conflict { .. } => ErrorKind::Conflict,
            Error::RateLimited { .. } => ErrorKind::RateLimited,
            Error::Server { .. } => ErrorKind::Server,
            Error::Validation { .. } => ErrorKind::Validation,
            Error::Authentication { .. } => ErrorKind::Authentication,
            Error::Authorization { .. } => ErrorKind::Authorization,
            Error::Unknown { .. } => ErrorKind::Unknown,
        }
    }

    /// Whether this error is transient and worth retrying.
    pub fn is_retryable(&self) -> bool {
        self.kind().is_retryable()
    }

    /// Whether this error reports a missing object.
    pub fn is_not_found(&self) -> bool {
        self.kind() == ErrorKind::NotFound
    }

    /// Delay the server asked for before the next attempt.
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            Error::RateLimited { retry_after, .. } => *retry_after,
            _ => None,
        }
    }

    /// Shorthand for a not-found error.
    pub fn not_found(resource: impl Into<String>) -> Self {
        Error::NotFound {
            resource: resource.into(),
        }
    }

    /// Build an error from an HTTP status and the server's message.
    pub fn from_status(status: u16, message: impl Into<String>, retry_after: Option<Duration>) -> Self {
        let message = message.into();
        match status {
            400 | 422 => Error::Validation { message },
            401 => Error::Authentication { message },
            403 => Error::Authorization { message },
            404 => Error::NotFound { resource: message },
            409 => Error::Conflict { message },
            429 => Error::RateLimited {
                message,
                retry_after,
            },
            500..=599 => Error::Server { status, message },
            _ => Error::Unknown {
                message: format!("unexpected HTTP {status}: {message}"),
            },
        }
    }
}

impl From<ureq::Error> for Error {
    fn from(err: ureq::Error) -> Self {
        match err {
            ureq::Error::StatusCode(code) => Self::from_status(code, format!("HTTP {code}"), None),
            other => Self::Unknown {
                message: other.to_string(),
            },
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::Unknown {
            message: format!("invalid response body: {err}"),
        }
    }
}

/// Result type for remote API operations.
pub type Result<T> = std::result::Result<T, Error>;

use std::fmt;

use serde::Serialize;

/// A request that a guard step refused to forward.
///
/// Rejections are the only failures a client ever sees. They carry a status
/// code and a short message, and stop the pipeline immediately.
///
/// # Examples
///
/// ```
/// use sanitize_core::{Rejection, RejectionKind};
///
/// let rejection = Rejection::invalid_field("email", "Invalid email format");
/// assert_eq!(rejection.status_code(), 400);
/// assert_eq!(rejection.kind(), &RejectionKind::InvalidField { field: "email" });
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rejection {
    kind: RejectionKind,
    message: String,
}

impl Rejection {
    /// Creates a new rejection.
    pub fn new(kind: RejectionKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// Rejection for a payload larger than the configured limit.
    pub fn payload_too_large(size: usize, limit: usize) -> Self {
        Self::new(
            RejectionKind::PayloadTooLarge { size, limit },
            "Request payload too large",
        )
    }

    /// Rejection for a recognized body field that failed its format check.
    pub fn invalid_field(field: &'static str, message: impl Into<String>) -> Self {
        Self::new(RejectionKind::InvalidField { field }, message)
    }

    /// Returns the rejection kind.
    pub fn kind(&self) -> &RejectionKind {
        &self.kind
    }

    /// Returns the client-facing message.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// HTTP status code an adapter should answer with.
    pub fn status_code(&self) -> u16 {
        match self.kind {
            RejectionKind::PayloadTooLarge { .. } => 413,
            RejectionKind::InvalidField { .. } => 400,
        }
    }

    /// Response body an adapter should render.
    pub fn body(&self) -> ErrorBody {
        ErrorBody {
            status: "error",
            message: self.message.clone(),
        }
    }
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

impl std::error::Error for Rejection {}

/// Why a request was rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RejectionKind {
    /// Serialized body and query exceed the payload limit
    PayloadTooLarge {
        /// Measured size in bytes
        size: usize,
        /// Configured limit in bytes
        limit: usize,
    },
    /// A recognized body field is present but malformed
    InvalidField {
        /// The offending field name
        field: &'static str,
    },
}

impl fmt::Display for RejectionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RejectionKind::PayloadTooLarge { size, limit } => {
                write!(f, "payload too large ({} > {} bytes)", size, limit)
            }
            RejectionKind::InvalidField { field } => write!(f, "invalid field '{}'", field),
        }
    }
}

/// JSON body for a rejected request: `{"status": "error", "message": ...}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorBody {
    /// Always `"error"`
    pub status: &'static str,
    /// Human-readable message
    pub message: String,
}

/// An internal failure inside a sanitizing step.
///
/// Faults are never shown to the client. The pipeline logs them and forwards
/// the request unmodified.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SanitizeFault {
    kind: FaultKind,
    message: String,
}

impl SanitizeFault {
    /// Creates a new fault.
    pub fn new(kind: FaultKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// Fault for a tree nested deeper than the walker accepts.
    pub fn depth_exceeded(limit: usize) -> Self {
        Self::new(
            FaultKind::DepthExceeded,
            format!("value nested deeper than {} levels", limit),
        )
    }

    /// Returns the fault kind.
    pub fn kind(&self) -> FaultKind {
        self.kind
    }

    /// Returns the fault detail.
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for SanitizeFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sanitization fault ({}): {}", self.kind, self.message)
    }
}

impl std::error::Error for SanitizeFault {}

impl From<serde_json::Error> for SanitizeFault {
    fn from(err: serde_json::Error) -> Self {
        SanitizeFault::new(FaultKind::Serialization, err.to_string())
    }
}

/// Kind of internal fault.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaultKind {
    /// The value is nested deeper than the configured maximum.
    DepthExceeded,
    /// Measuring or serializing a value failed.
    Serialization,
}

impl fmt::Display for FaultKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FaultKind::DepthExceeded => write!(f, "depth exceeded"),
            FaultKind::Serialization => write!(f, "serialization"),
        }
    }
}

/// Error returned by a pipeline step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepError {
    /// The request violates a policy; stop and answer the client.
    Rejected(Rejection),
    /// The step itself failed; log and forward the request unmodified.
    Fault(SanitizeFault),
}

impl fmt::Display for StepError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StepError::Rejected(r) => write!(f, "rejected: {}", r),
            StepError::Fault(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for StepError {}

impl From<Rejection> for StepError {
    fn from(r: Rejection) -> Self {
        StepError::Rejected(r)
    }
}

impl From<SanitizeFault> for StepError {
    fn from(e: SanitizeFault) -> Self {
        StepError::Fault(e)
    }
}

impl From<serde_json::Error> for StepError {
    fn from(err: serde_json::Error) -> Self {
        StepError::Fault(err.into())
    }
}

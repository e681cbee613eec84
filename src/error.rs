use std::error::Error as StdError;
use std::fmt;

/// Stable, matchable reasons a runtime operation can fail.
///
/// # Why
/// Consumers branch on the reason (a missing sample is routine, a lost service is not), so the
/// reason must be a closed, matchable enum rather than a free-form string.
///
/// # What
/// - `DefaultError` is the generic bucket used by `ModuleController::report_error` when a module
///   does not classify its own failure.
/// - `NoSampleAvailable` / `NoOperationHandlerRegistered` are routine, expected outcomes of
///   calling a Service Module before its producer side is ready.
/// - `ServiceNotFound`, `ServiceModelMismatch`, `ServiceLost`, `ServiceNotRunning` are reserved for
///   the external bridge adapter (wire-backed Service Modules); the in-process backend never
///   produces them.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum ErrorKind {
    DefaultError,
    ServiceNotFound,
    ServiceModelMismatch,
    ServiceLost,
    NoSampleAvailable,
    ServiceNotRunning,
    NoOperationHandlerRegistered,
}

impl ErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::DefaultError => "default_error",
            ErrorKind::ServiceNotFound => "service_not_found",
            ErrorKind::ServiceModelMismatch => "service_model_mismatch",
            ErrorKind::ServiceLost => "service_lost",
            ErrorKind::NoSampleAvailable => "no_sample_available",
            ErrorKind::ServiceNotRunning => "service_not_running",
            ErrorKind::NoOperationHandlerRegistered => "no_operation_handler_registered",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The runtime's error type: a [`ErrorKind`] plus a human message and an optional cause.
///
/// Builder-style construction mirrors the rest of the crate's error types so call sites read the
/// same way whether they are reporting a module error or a sample-unavailable condition.
#[derive(Debug)]
pub struct Error {
    kind: ErrorKind,
    message: String,
    cause: Option<Box<dyn StdError + Send + Sync + 'static>>,
}

impl Error {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            cause: None,
        }
    }

    pub fn with_cause(mut self, cause: impl StdError + Send + Sync + 'static) -> Self {
        self.cause = Some(Box::new(cause));
        self
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// Convenience constructor for the two pub/sub "not yet published" cases.
    pub fn no_sample_available() -> Self {
        Self::new(ErrorKind::NoSampleAvailable, "no sample has been published yet")
    }

    pub fn no_operation_handler() -> Self {
        Self::new(
            ErrorKind::NoOperationHandlerRegistered,
            "no operation handler is registered for this request",
        )
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.cause.as_ref().map(|c| c.as_ref() as &(dyn StdError + 'static))
    }
}

/// Shorthand used throughout the crate; `Result<()>` stands in for the source's `Result<void>`.
pub type Result<T> = std::result::Result<T, Error>;

//! Error types for read contexts and their collaborators.

use derive_builder::UninitializedFieldError;
use strum::{AsRefStr, Display, IntoStaticStr};
use thiserror::Error;

/// Type alias for boxed dynamic errors that can be sent across threads.
pub type BoxedError = Box<dyn std::error::Error + Send + Sync>;

/// Type alias for Results with our custom Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Categories of errors raised by this crate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, AsRefStr, Display, IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum ErrorKind {
    /// A required argument was missing or out of range.
    InvalidArgument,
    /// The remote object changed while it was being read.
    RemoteFileChanged,
    /// The remote object does not exist.
    NotFound,
    /// The object store rejected or failed a request.
    Store,
}

/// A structured error carrying a kind, a message, and an optional source.
#[derive(Debug, Error)]
#[error("{kind}: {message}")]
pub struct Error {
    kind: ErrorKind,
    message: String,
    retryable: bool,
    #[source]
    source: Option<BoxedError>,
}

impl Error {
    /// Creates a new, non-retryable error.
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            retryable: false,
            source: None,
        }
    }

    /// Creates an invalid argument error.
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidArgument, message)
    }

    /// Creates the error raised when a required field is absent.
    pub fn missing(field: &str) -> Self {
        Self::invalid_argument(format!("{field} must not be null"))
    }

    /// Creates a remote-file-changed error.
    pub fn remote_file_changed(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::RemoteFileChanged, message)
    }

    /// Creates an object store error.
    pub fn store(message: impl Into<String>, retryable: bool) -> Self {
        Self::new(ErrorKind::Store, message).with_retryable(retryable)
    }

    /// Marks whether the failed operation may be retried.
    pub fn with_retryable(mut self, retryable: bool) -> Self {
        self.retryable = retryable;
        self
    }

    /// Attach a source error.
    pub fn with_source(mut self, source: impl std::error::Error + Send + Sync + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    /// Returns the error kind.
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Returns the error kind as a string.
    pub fn kind_str(&self) -> &'static str {
        self.kind.into()
    }

    /// Returns the error message without the kind prefix.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Whether the caller should retry this operation.
    pub fn is_retryable(&self) -> bool {
        self.retryable
    }
}

impl From<UninitializedFieldError> for Error {
    fn from(err: UninitializedFieldError) -> Self {
        Self::missing(err.field_name())
    }
}

impl From<object_store::Error> for Error {
    fn from(err: object_store::Error) -> Self {
        let kind = match err {
            object_store::Error::NotFound { .. } => ErrorKind::NotFound,
            object_store::Error::Precondition { .. } => ErrorKind::RemoteFileChanged,
            _ => ErrorKind::Store,
        };
        let retryable = !matches!(
            err,
            object_store::Error::NotFound { .. }
                | object_store::Error::PermissionDenied { .. }
                | object_store::Error::Unauthenticated { .. }
                | object_store::Error::AlreadyExists { .. }
                | object_store::Error::Precondition { .. }
                | object_store::Error::NotSupported { .. }
                | object_store::Error::NotImplemented
        );
        Self::new(kind, err.to_string())
            .with_retryable(retryable)
            .with_source(err)
    }
}

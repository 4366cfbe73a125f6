// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Error types for cache operations.

use std::fmt;

use recoverable::{Recovery, RecoveryInfo};

/// The category of a cache [`Error`].
///
/// The category decides how callers react: usage errors are programming mistakes and
/// should never be retried, backend errors are transient I/O failures, and fetch errors
/// come from the caller-supplied loader of a read-through lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum ErrorKind {
    /// The cache was used incorrectly: an unregistered or duplicate collection, a value that
    /// does not match the collection's type, an invalid collection name or use after close.
    Usage,
    /// The storage backend failed, for example a lost database connection.
    Backend,
    /// The fetch function of a read-through lookup failed.
    Fetch,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Usage => f.write_str("usage"),
            Self::Backend => f.write_str("backend"),
            Self::Fetch => f.write_str("fetch"),
        }
    }
}

/// An error from a cache operation.
///
/// Every error carries an [`ErrorKind`]. The underlying cause is kept in the error chain and
/// can be inspected with [`std::error::Error::source()`] or [`ohno::ErrorExt::find_source`].
///
/// # Example
///
/// ```
/// use stowage_tier::{Error, ErrorKind};
///
/// let error = Error::usage("collection \"users\" is not registered");
/// assert_eq!(error.kind(), ErrorKind::Usage);
/// assert!(error.is_fatal());
/// ```
#[ohno::error]
#[display("cache {kind} error")]
pub struct Error {
    kind: ErrorKind,
}

impl Error {
    /// Creates a usage error.
    ///
    /// Usage errors indicate a bug in the calling code and are never worth retrying.
    pub fn usage(cause: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        Self::caused_by(ErrorKind::Usage, cause)
    }

    /// Creates a backend error from the underlying I/O or database failure.
    pub fn backend(cause: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        Self::caused_by(ErrorKind::Backend, cause)
    }

    /// Creates a fetch error wrapping the failure of a read-through fetch function.
    pub fn fetch(cause: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        Self::caused_by(ErrorKind::Fetch, cause)
    }

    /// Returns the category of this error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Returns `true` for errors that signal a programming mistake rather than a transient failure.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        self.kind == ErrorKind::Usage
    }
}

impl Recovery for Error {
    fn recovery(&self) -> RecoveryInfo {
        match self.kind {
            ErrorKind::Usage => RecoveryInfo::never(),
            ErrorKind::Backend => RecoveryInfo::retry(),
            ErrorKind::Fetch => RecoveryInfo::unknown(),
        }
    }
}

/// A specialized [`Result`] type for cache operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use ohno::ErrorExt;
    use recoverable::RecoveryKind;

    use super::*;

    #[test]
    fn usage_error_is_fatal_and_never_retried() {
        let error = Error::usage("duplicate collection");
        assert_eq!(error.kind(), ErrorKind::Usage);
        assert!(error.is_fatal());
        assert_eq!(error.recovery().kind(), RecoveryKind::Never);
    }

    #[test]
    fn backend_error_is_retryable() {
        let error = Error::backend("connection reset");
        assert_eq!(error.kind(), ErrorKind::Backend);
        assert!(!error.is_fatal());
        assert_eq!(error.recovery().kind(), RecoveryKind::Retry);
    }

    #[test]
    fn display_contains_kind_and_cause() {
        let error = Error::backend("connection reset");
        let display_str = error.to_string();
        assert!(display_str.contains("cache backend error"), "got: {display_str}");
        assert!(display_str.contains("connection reset"), "got: {display_str}");
    }

    #[test]
    fn fetch_error_keeps_source() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "row missing");
        let error = Error::fetch(io);
        assert_eq!(error.kind(), ErrorKind::Fetch);

        let source = error.find_source::<std::io::Error>().expect("io error should be in the chain");
        assert_eq!(source.kind(), std::io::ErrorKind::NotFound);
    }

    #[test]
    fn result_type_alias_propagates_errors() {
        fn returns_err() -> Result<i32> {
            Err(Error::usage("expected failure"))
        }

        let err = returns_err().expect_err("should return an error");
        assert!(format!("{err}").contains("expected failure"));
    }
}

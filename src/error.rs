//! Error taxonomy for test bodies, setup/teardown closures, and the
//! internal "unwrap failed" sentinel used by [`crate::assert`].
//!
//! Three independent booleans classify any error a test body can produce:
//! whether it should be recorded as a failure, whether it should abort the
//! rest of the invocation, and whether it should be recorded as a skip
//! rather than a failure. Three named presets cover every error kind this
//! framework currently produces; the type stays open so callers can author
//! their own classifications for `thrown` errors.

use crate::location::SourceLocation;
use std::fmt;

/// How [`crate::engine::ExecutionEngine`] should react to an error returned
/// from a test body, `setUp`, or `tearDown`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ErrorClassification {
    /// Record a failure on the current case's result record.
    pub record_as_failure: bool,
    /// Stop running the rest of the current test invocation.
    pub skip_test_invocation: bool,
    /// Record a skip instead of a failure.
    pub record_as_skip: bool,
}

impl ErrorClassification {
    /// An error thrown by ordinary test code: recorded as a failure. If
    /// thrown from a pre-body phase (`setUp`), the body itself is skipped;
    /// thrown from the body, there is nothing left in the invocation to
    /// skip.
    pub const ORDINARY: Self = Self {
        record_as_failure: true,
        skip_test_invocation: true,
        record_as_skip: false,
    };

    /// A deliberate skip: stops the invocation, recorded as a skip rather
    /// than a failure.
    pub const SKIP: Self = Self {
        record_as_failure: false,
        skip_test_invocation: true,
        record_as_skip: true,
    };

    /// The internal sentinel produced by a failed `unwrap()` assertion: the
    /// failure was already recorded by the assertion that produced it, so
    /// this must not be recorded a second time, but it does stop the
    /// invocation immediately.
    pub const UNWRAP_FAILURE_SENTINEL: Self = Self {
        record_as_failure: false,
        skip_test_invocation: true,
        record_as_skip: false,
    };
}

/// A deliberate skip raised from within a test body, `setUp`, or
/// `tearDown`.
#[derive(Clone, Debug)]
pub struct Skip {
    pub message: Option<String>,
    pub location: SourceLocation,
}

impl Skip {
    pub fn new(location: SourceLocation, message: impl Into<Option<String>>) -> Self {
        Self {
            location,
            message: message.into(),
        }
    }

    /// A one-line human-readable summary, e.g. `"skipped: not supported on
    /// this platform (foo.rs:12)"`.
    pub fn summary(&self) -> String {
        match &self.message {
            Some(msg) => format!("skipped: {} ({})", msg, self.location),
            None => format!("skipped ({})", self.location),
        }
    }
}

impl fmt::Display for Skip {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.summary())
    }
}

/// The sentinel produced internally when `Evaluate::unwrap` fails. The
/// assertion that produced this has already recorded a failure; the
/// framework must not record it again when propagating the error upward.
#[derive(Clone, Copy, Debug, Default)]
pub struct UnwrapFailureSentinel;

impl fmt::Display for UnwrapFailureSentinel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "assertion failed earlier in this test")
    }
}

impl std::error::Error for UnwrapFailureSentinel {}

/// Any error a test body, `setUp`, or `tearDown` closure can return.
#[derive(Debug, thiserror::Error)]
pub enum TestError {
    #[error("{0}")]
    Skip(#[from] Skip),

    #[error(transparent)]
    Unwrap(#[from] UnwrapFailureSentinel),

    /// An arbitrary error thrown by test code; always classified as
    /// [`ErrorClassification::ORDINARY`].
    #[error(transparent)]
    Thrown(#[from] anyhow::Error),
}

impl TestError {
    pub fn classify(&self) -> ErrorClassification {
        match self {
            TestError::Skip(_) => ErrorClassification::SKIP,
            TestError::Unwrap(_) => ErrorClassification::UNWRAP_FAILURE_SENTINEL,
            TestError::Thrown(_) => ErrorClassification::ORDINARY,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ordinary_errors_are_recorded_and_skip_the_rest_of_the_invocation() {
        let err = TestError::Thrown(anyhow::anyhow!("boom"));
        let c = err.classify();
        assert!(c.record_as_failure);
        assert!(c.skip_test_invocation);
        assert!(!c.record_as_skip);
    }

    #[test]
    fn skip_stops_the_invocation_and_is_not_a_failure() {
        let loc = SourceLocation::new("f.rs", 1);
        let err = TestError::Skip(Skip::new(loc, "not supported"));
        let c = err.classify();
        assert!(!c.record_as_failure);
        assert!(c.skip_test_invocation);
        assert!(c.record_as_skip);
    }

    #[test]
    fn unwrap_sentinel_stops_without_double_recording() {
        let err = TestError::Unwrap(UnwrapFailureSentinel);
        let c = err.classify();
        assert!(!c.record_as_failure);
        assert!(c.skip_test_invocation);
        assert!(!c.record_as_skip);
    }

    #[test]
    fn skip_summary_includes_message_and_location() {
        let loc = SourceLocation::new("f.rs", 7);
        let skip = Skip::new(loc, Some("no gpu".to_string()));
        assert_eq!(skip.summary(), "skipped: no gpu (f.rs:7)");
    }

    #[test]
    fn skip_summary_without_message() {
        let loc = SourceLocation::new("f.rs", 7);
        let skip = Skip::new(loc, None);
        assert_eq!(skip.summary(), "skipped (f.rs:7)");
    }
}

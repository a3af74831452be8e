//! Assertion evaluation: a family of assertion functions, all thin
//! adapters over a single [`evaluate`] protocol that classifies the
//! outcome and routes failures to whichever case is currently executing.
//!
//! Calling an assertion with no case active is safe and simply drops the
//! failure — see [`crate::current::record_failure`] — so these helpers
//! stay callable from library diagnostics, not only from inside a running
//! test.

use crate::error::{TestError, UnwrapFailureSentinel};
use crate::location::SourceLocation;
use std::fmt::Debug;

/// The outcome of evaluating a single assertion predicate.
pub enum AssertionOutcome {
    Success,
    /// The predicate ran to completion and determined the assertion does
    /// not hold. Carries an explanation to append to the failure
    /// description.
    ExpectedFailure(Option<String>),
    /// The predicate itself errored out (Rust's analogue of "the
    /// predicate threw") rather than returning a verdict.
    UnexpectedFailure(String),
}

/// Evaluates `predicate`, routing a non-success outcome to the current
/// case's [`crate::record::ResultRecord`] as `"<kind> failed: <explanation>
/// - <message>"`. `expected` on the routed failure is true for
/// [`AssertionOutcome::ExpectedFailure`], false for
/// [`AssertionOutcome::UnexpectedFailure`].
pub fn evaluate(
    kind: &str,
    location: SourceLocation,
    message: &str,
    predicate: impl FnOnce() -> AssertionOutcome,
) -> bool {
    match predicate() {
        AssertionOutcome::Success => true,
        AssertionOutcome::ExpectedFailure(details) => {
            route_failure(kind, location, message, details.unwrap_or_default(), true);
            false
        }
        AssertionOutcome::UnexpectedFailure(err) => {
            route_failure(kind, location, message, err, false);
            false
        }
    }
}

fn route_failure(kind: &str, location: SourceLocation, message: &str, explanation: String, expected: bool) {
    let description = if message.is_empty() {
        format!("{kind} failed: {explanation}")
    } else {
        format!("{kind} failed: {explanation} - {message}")
    };
    crate::current::record_failure(description, location, expected);
}

/// `a == b`. Equality is tested directly (not via a derived comparator)
/// so infinities and self-equal NaN-free floats compare the way `==`
/// already does.
pub fn assert_equal<T: PartialEq + Debug>(a: &T, b: &T, message: &str, location: SourceLocation) -> bool {
    evaluate("XCTAssertEqual", location, message, || {
        if a == b {
            AssertionOutcome::Success
        } else {
            AssertionOutcome::ExpectedFailure(Some(format!("(\"{a:?}\") is not equal to (\"{b:?}\")")))
        }
    })
}

pub fn assert_not_equal<T: PartialEq + Debug>(a: &T, b: &T, message: &str, location: SourceLocation) -> bool {
    evaluate("XCTAssertNotEqual", location, message, || {
        if a != b {
            AssertionOutcome::Success
        } else {
            AssertionOutcome::ExpectedFailure(Some(format!("(\"{a:?}\") is equal to (\"{b:?}\")")))
        }
    })
}

/// `|a - b| <= accuracy`. `a == b` is checked first so infinities compare
/// equal to themselves without going through subtraction.
pub fn assert_equal_with_accuracy(a: f64, b: f64, accuracy: f64, message: &str, location: SourceLocation) -> bool {
    evaluate("XCTAssertEqual", location, message, || {
        if a == b || (a - b).abs() <= accuracy {
            AssertionOutcome::Success
        } else {
            AssertionOutcome::ExpectedFailure(Some(format!(
                "(\"{a}\") is not equal to (\"{b}\") +/- (\"{accuracy}\")"
            )))
        }
    })
}

pub fn assert_greater_than<T: PartialOrd + Debug>(a: &T, b: &T, message: &str, location: SourceLocation) -> bool {
    evaluate("XCTAssertGreaterThan", location, message, || {
        if a > b {
            AssertionOutcome::Success
        } else {
            AssertionOutcome::ExpectedFailure(Some(format!("(\"{a:?}\") is not greater than (\"{b:?}\")")))
        }
    })
}

pub fn assert_greater_than_or_equal<T: PartialOrd + Debug>(a: &T, b: &T, message: &str, location: SourceLocation) -> bool {
    evaluate("XCTAssertGreaterThanOrEqual", location, message, || {
        if a >= b {
            AssertionOutcome::Success
        } else {
            AssertionOutcome::ExpectedFailure(Some(format!(
                "(\"{a:?}\") is less than (\"{b:?}\")"
            )))
        }
    })
}

pub fn assert_less_than<T: PartialOrd + Debug>(a: &T, b: &T, message: &str, location: SourceLocation) -> bool {
    evaluate("XCTAssertLessThan", location, message, || {
        if a < b {
            AssertionOutcome::Success
        } else {
            AssertionOutcome::ExpectedFailure(Some(format!("(\"{a:?}\") is not less than (\"{b:?}\")")))
        }
    })
}

pub fn assert_less_than_or_equal<T: PartialOrd + Debug>(a: &T, b: &T, message: &str, location: SourceLocation) -> bool {
    evaluate("XCTAssertLessThanOrEqual", location, message, || {
        if a <= b {
            AssertionOutcome::Success
        } else {
            AssertionOutcome::ExpectedFailure(Some(format!(
                "(\"{a:?}\") is greater than (\"{b:?}\")"
            )))
        }
    })
}

pub fn assert_true(value: bool, message: &str, location: SourceLocation) -> bool {
    evaluate("XCTAssertTrue", location, message, || {
        if value {
            AssertionOutcome::Success
        } else {
            AssertionOutcome::ExpectedFailure(None)
        }
    })
}

pub fn assert_false(value: bool, message: &str, location: SourceLocation) -> bool {
    evaluate("XCTAssertFalse", location, message, || {
        if !value {
            AssertionOutcome::Success
        } else {
            AssertionOutcome::ExpectedFailure(None)
        }
    })
}

pub fn assert_nil<T>(value: &Option<T>, message: &str, location: SourceLocation) -> bool {
    evaluate("XCTAssertNil", location, message, || {
        if value.is_none() {
            AssertionOutcome::Success
        } else {
            AssertionOutcome::ExpectedFailure(Some("value is not nil".to_string()))
        }
    })
}

pub fn assert_not_nil<T>(value: &Option<T>, message: &str, location: SourceLocation) -> bool {
    evaluate("XCTAssertNotNil", location, message, || {
        if value.is_some() {
            AssertionOutcome::Success
        } else {
            AssertionOutcome::ExpectedFailure(Some("value is nil".to_string()))
        }
    })
}

/// Evaluates `body`; succeeds iff it returns `Ok`.
pub fn assert_no_throw(body: impl FnOnce() -> anyhow::Result<()>, message: &str, location: SourceLocation) -> bool {
    evaluate("XCTAssertNoThrow", location, message, || match body() {
        Ok(()) => AssertionOutcome::Success,
        Err(e) => AssertionOutcome::ExpectedFailure(Some(format!("threw error \"{e}\""))),
    })
}

/// Evaluates `body`; succeeds iff it returns `Err`.
pub fn assert_throws(body: impl FnOnce() -> anyhow::Result<()>, message: &str, location: SourceLocation) -> bool {
    evaluate("XCTAssertThrowsError", location, message, || match body() {
        Err(_) => AssertionOutcome::Success,
        Ok(()) => AssertionOutcome::ExpectedFailure(Some("did not throw an error".to_string())),
    })
}

/// Unconditionally records a failure, regardless of any predicate.
pub fn fail(message: &str, location: SourceLocation) {
    evaluate("XCTFail", location, message, || {
        AssertionOutcome::ExpectedFailure(None)
    });
}

/// Returns the wrapped value, or records a failure and propagates the
/// not-to-be-recorded-again [`UnwrapFailureSentinel`] so the invocation
/// stops without double-counting the failure the evaluator already
/// recorded.
pub fn unwrap<T>(value: Option<T>, message: &str, location: SourceLocation) -> Result<T, TestError> {
    match value {
        Some(v) => Ok(v),
        None => {
            evaluate("XCTUnwrap", location, message, || {
                AssertionOutcome::ExpectedFailure(Some("expected a non-nil value".to_string()))
            });
            Err(TestError::Unwrap(UnwrapFailureSentinel))
        }
    }
}

/// As [`unwrap`], for a fallible producer rather than an `Option`.
pub fn unwrap_result<T, E: std::fmt::Display>(
    value: Result<T, E>,
    message: &str,
    location: SourceLocation,
) -> Result<T, TestError> {
    match value {
        Ok(v) => Ok(v),
        Err(e) => {
            evaluate("XCTUnwrap", location, message, || {
                AssertionOutcome::ExpectedFailure(Some(format!("threw error \"{e}\"")))
            });
            Err(TestError::Unwrap(UnwrapFailureSentinel))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::current::{self, CaseContext};
    use std::sync::Arc;

    fn with_case<R>(f: impl FnOnce() -> R) -> (R, Arc<CaseContext>) {
        let ctx = CaseContext::new("T.test");
        current::enter(ctx.clone());
        let result = f();
        current::exit();
        (result, ctx)
    }

    fn loc() -> SourceLocation {
        SourceLocation::new("f.rs", 1)
    }

    #[test]
    fn assert_equal_on_mismatch_produces_the_documented_message() {
        let (_, ctx) = with_case(|| assert_equal(&1, &2, "", loc()));
        let failures = ctx.record.lock().unwrap().failures().iter().map(|f| f.description.clone()).collect::<Vec<_>>();
        assert!(failures[0].contains("(\"1\") is not equal to (\"2\")"));
    }

    #[test]
    fn assert_equal_on_match_records_nothing() {
        let (ok, ctx) = with_case(|| assert_equal(&1, &1, "", loc()));
        assert!(ok);
        assert_eq!(ctx.record.lock().unwrap().failure_count(), 0);
    }

    #[test]
    fn assert_true_false_cases() {
        let (_, ctx) = with_case(|| {
            assert_true(true, "", loc());
            assert_true(false, "", loc());
            assert_false(false, "", loc());
            assert_false(true, "", loc());
        });
        assert_eq!(ctx.record.lock().unwrap().failure_count(), 2);
    }

    #[test]
    fn assert_nil_variants() {
        let none: Option<i32> = None;
        let some = Some(5);
        let (_, ctx) = with_case(|| {
            assert_nil(&none, "", loc());
            assert_nil(&some, "", loc());
            assert_not_nil(&some, "", loc());
            assert_not_nil(&none, "", loc());
        });
        assert_eq!(ctx.record.lock().unwrap().failure_count(), 2);
    }

    #[test]
    fn accuracy_based_equality() {
        let (_, ctx) = with_case(|| {
            assert_equal_with_accuracy(1.0, 1.0001, 0.001, "", loc());
            assert_equal_with_accuracy(1.0, 2.0, 0.001, "", loc());
            assert_equal_with_accuracy(f64::INFINITY, f64::INFINITY, 0.001, "", loc());
        });
        assert_eq!(ctx.record.lock().unwrap().failure_count(), 1);
    }

    #[test]
    fn comparisons() {
        let (_, ctx) = with_case(|| {
            assert_greater_than(&2, &1, "", loc());
            assert_less_than(&1, &2, "", loc());
            assert_greater_than_or_equal(&1, &1, "", loc());
            assert_less_than_or_equal(&1, &1, "", loc());
            assert_greater_than(&1, &2, "", loc());
        });
        assert_eq!(ctx.record.lock().unwrap().failure_count(), 1);
    }

    #[test]
    fn no_throw_and_throws() {
        let (_, ctx) = with_case(|| {
            assert_no_throw(|| Ok(()), "", loc());
            assert_no_throw(|| Err(anyhow::anyhow!("boom")), "", loc());
            assert_throws(|| Err(anyhow::anyhow!("boom")), "", loc());
            assert_throws(|| Ok(()), "", loc());
        });
        assert_eq!(ctx.record.lock().unwrap().failure_count(), 2);
    }

    #[test]
    fn fail_always_records() {
        let (_, ctx) = with_case(|| fail("deliberate", loc()));
        assert_eq!(ctx.record.lock().unwrap().failure_count(), 1);
    }

    #[test]
    fn unwrap_returns_value_on_some() {
        let (result, ctx) = with_case(|| unwrap(Some(5), "", loc()));
        assert_eq!(result.unwrap(), 5);
        assert_eq!(ctx.record.lock().unwrap().failure_count(), 0);
    }

    #[test]
    fn unwrap_records_once_and_propagates_the_sentinel_on_none() {
        let (result, ctx) = with_case(|| unwrap::<i32>(None, "", loc()));
        assert!(matches!(result, Err(TestError::Unwrap(_))));
        assert_eq!(ctx.record.lock().unwrap().failure_count(), 1);
        assert!(!result.unwrap_err().classify().record_as_failure);
    }

    #[test]
    fn assertion_evaluation_with_no_active_case_is_silently_dropped() {
        current::exit();
        assert!(!assert_equal(&1, &2, "", loc()));
    }
}

//! Expectations: named promises that some event will occur a configurable
//! number of times, optionally in a specific order, optionally inverted.
//!
//! All mutable expectation state is guarded by a single process-wide
//! serial lock (the "subsystem queue") so that fulfillment — which may
//! happen from any thread — and waiting — which validates across many
//! expectations at once — never observe a torn update. Monotonic
//! creation/fulfillment tokens live outside that lock in their own atomics,
//! per the framework's token-ordering guarantee.

use crate::location::SourceLocation;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

static CREATION_TOKENS: AtomicU64 = AtomicU64::new(1);
static FULFILLMENT_TOKENS: AtomicU64 = AtomicU64::new(1);

fn next_creation_token() -> u64 {
    CREATION_TOKENS.fetch_add(1, Ordering::SeqCst)
}

fn next_fulfillment_token() -> u64 {
    FULFILLMENT_TOKENS.fetch_add(1, Ordering::SeqCst)
}

/// The single lock serializing all Expectation/Waiter mutation. Acquired
/// first by any operation that must atomically examine or update more than
/// one expectation at a time (fulfillment, waiter validation); individual
/// expectations additionally hold their own mutex for the data itself.
static SUBSYSTEM_QUEUE: Mutex<()> = Mutex::new(());

/// A token proving the subsystem queue is held. Passed by reference so
/// callers can't accidentally drop it mid-operation.
pub(crate) struct SubsystemGuard<'a>(#[allow(dead_code)] MutexGuard<'a, ()>);

pub(crate) fn lock_subsystem() -> SubsystemGuard<'static> {
    SubsystemGuard(SUBSYSTEM_QUEUE.lock().unwrap_or_else(|e| e.into_inner()))
}

type FulfillHandler = Box<dyn FnMut() + Send>;

struct Mutable {
    description: String,
    is_fulfilled: bool,
    fulfillment_token: u64,
    fulfillment_location: Option<SourceLocation>,
    expected_fulfillment_count: u32,
    number_of_fulfillments: u32,
    is_inverted: bool,
    assert_for_over_fulfill: bool,
    has_been_waited_on: bool,
    on_fulfill_handler: Option<FulfillHandler>,
}

/// A named promise that some event will occur, optionally more than once,
/// optionally in a specific order relative to other expectations, and
/// optionally "inverted" (fulfilling it is itself a failure).
pub struct Expectation {
    creation_token: u64,
    creation_location: SourceLocation,
    inner: Mutex<Mutable>,
}

impl Expectation {
    pub fn new(description: impl Into<String>, creation_location: SourceLocation) -> Arc<Self> {
        Arc::new(Self {
            creation_token: next_creation_token(),
            creation_location,
            inner: Mutex::new(Mutable {
                description: description.into(),
                is_fulfilled: false,
                fulfillment_token: 0,
                fulfillment_location: None,
                expected_fulfillment_count: 1,
                number_of_fulfillments: 0,
                is_inverted: false,
                assert_for_over_fulfill: false,
                has_been_waited_on: false,
                on_fulfill_handler: None,
            }),
        })
    }

    pub fn creation_token(&self) -> u64 {
        self.creation_token
    }

    pub fn creation_location(&self) -> &SourceLocation {
        &self.creation_location
    }

    pub fn description(&self) -> String {
        self.inner.lock().unwrap().description.clone()
    }

    pub fn is_fulfilled(&self) -> bool {
        self.inner.lock().unwrap().is_fulfilled
    }

    pub fn fulfillment_token(&self) -> u64 {
        self.inner.lock().unwrap().fulfillment_token
    }

    pub fn is_inverted(&self) -> bool {
        self.inner.lock().unwrap().is_inverted
    }

    pub fn has_been_waited_on(&self) -> bool {
        self.inner.lock().unwrap().has_been_waited_on
    }

    fn guard_configurable(inner: &Mutable, what: &str) {
        assert!(
            !inner.has_been_waited_on,
            "cannot set {what} on an expectation after it has been waited on"
        );
    }

    pub fn set_description(&self, description: impl Into<String>) {
        let mut inner = self.inner.lock().unwrap();
        Self::guard_configurable(&inner, "description");
        inner.description = description.into();
    }

    pub fn set_expected_fulfillment_count(&self, count: u32) {
        assert!(count > 0, "expectedFulfillmentCount must be positive");
        let mut inner = self.inner.lock().unwrap();
        Self::guard_configurable(&inner, "expectedFulfillmentCount");
        inner.expected_fulfillment_count = count;
    }

    pub fn set_inverted(&self, inverted: bool) {
        let mut inner = self.inner.lock().unwrap();
        Self::guard_configurable(&inner, "isInverted");
        inner.is_inverted = inverted;
    }

    pub fn set_assert_for_over_fulfill(&self, assert: bool) {
        let mut inner = self.inner.lock().unwrap();
        Self::guard_configurable(&inner, "assertForOverFulfill");
        inner.assert_for_over_fulfill = assert;
    }

    /// Marks this expectation as having been included in a `wait()` call.
    /// Called by [`crate::waiter::Waiter`] while holding the subsystem
    /// queue.
    pub(crate) fn mark_has_been_waited_on(&self, _queue: &SubsystemGuard<'_>) {
        self.inner.lock().unwrap().has_been_waited_on = true;
    }

    pub(crate) fn install_on_fulfill_handler(&self, _queue: &SubsystemGuard<'_>, handler: FulfillHandler) {
        self.inner.lock().unwrap().on_fulfill_handler = Some(handler);
    }

    pub(crate) fn clear_on_fulfill_handler(&self, _queue: &SubsystemGuard<'_>) {
        self.inner.lock().unwrap().on_fulfill_handler = None;
    }

    /// Fulfills this expectation. Increments the fulfillment count; if this
    /// is the increment that satisfies `expectedFulfillmentCount`, flips
    /// `isFulfilled`, stamps a fulfillment token, and runs the installed
    /// handler (if any) after releasing every lock. Re-fulfilling an
    /// already-fulfilled expectation with `assertForOverFulfill` set routes
    /// a failure to the current case instead of running the handler.
    pub fn fulfill(self: &Arc<Self>, location: SourceLocation) {
        let queue = lock_subsystem();
        let mut inner = self.inner.lock().unwrap();
        inner.number_of_fulfillments += 1;

        if inner.is_fulfilled {
            let assert_over_fulfill = inner.assert_for_over_fulfill;
            let description = inner.description.clone();
            drop(inner);
            drop(queue);
            if assert_over_fulfill {
                crate::current::record_failure(
                    format!("API violation - multiple calls made to fulfill() for \"{description}\""),
                    location,
                    true,
                );
            }
            return;
        }

        if inner.number_of_fulfillments >= inner.expected_fulfillment_count {
            inner.is_fulfilled = true;
            inner.fulfillment_token = next_fulfillment_token();
            inner.fulfillment_location = Some(location);
            let handler = inner.on_fulfill_handler.take();
            drop(inner);
            drop(queue);
            if let Some(mut handler) = handler {
                handler();
            }
        }
    }
}

impl std::fmt::Debug for Expectation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Expectation")
            .field("creation_token", &self.creation_token)
            .field("description", &self.description())
            .finish()
    }
}

/// Creates a new expectation and, if a case is presently executing,
/// registers it as one of that case's strongly-owned expectations so it
/// can be checked for "unwaited" status at body end.
pub fn new_expectation(description: impl Into<String>, location: SourceLocation) -> Arc<Expectation> {
    let expectation = Expectation::new(description, location);
    if let Some(ctx) = crate::current::current() {
        ctx.expectations.lock().unwrap().push(expectation.clone());
    }
    expectation
}

#[cfg(test)]
mod tests {
    use super::*;

    fn loc() -> SourceLocation {
        SourceLocation::new("f.rs", 1)
    }

    #[test]
    fn fresh_expectation_is_unfulfilled() {
        let e = Expectation::new("e", loc());
        assert!(!e.is_fulfilled());
        assert_eq!(e.fulfillment_token(), 0);
    }

    #[test]
    fn single_fulfill_satisfies_default_count() {
        let e = Expectation::new("e", loc());
        e.fulfill(loc());
        assert!(e.is_fulfilled());
        assert!(e.fulfillment_token() > 0);
    }

    #[test]
    fn requires_configured_fulfillment_count() {
        let e = Expectation::new("e", loc());
        e.set_expected_fulfillment_count(2);
        e.fulfill(loc());
        assert!(!e.is_fulfilled());
        e.fulfill(loc());
        assert!(e.is_fulfilled());
    }

    #[test]
    #[should_panic(expected = "after it has been waited on")]
    fn configuration_after_wait_panics() {
        let e = Expectation::new("e", loc());
        {
            let q = lock_subsystem();
            e.mark_has_been_waited_on(&q);
        }
        e.set_inverted(true);
    }

    #[test]
    fn fulfillment_tokens_are_strictly_increasing_across_expectations() {
        let a = Expectation::new("a", loc());
        let b = Expectation::new("b", loc());
        b.fulfill(loc());
        a.fulfill(loc());
        assert!(b.fulfillment_token() < a.fulfillment_token());
    }

    #[test]
    fn over_fulfill_without_assert_flag_is_a_silent_noop() {
        let e = Expectation::new("e", loc());
        e.fulfill(loc());
        e.fulfill(loc());
        assert!(e.is_fulfilled());
    }
}

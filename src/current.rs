//! The "current case" slot: a single process-wide reference to whichever
//! [`Case`](crate::entity::case::Case) is presently executing.
//!
//! The execution engine only ever runs one case body at a time, but that
//! case's asynchronous work (a spawned thread fulfilling an expectation,
//! a waiter's delegate reporting a timeout) may reach back into its state
//! from a different OS thread. A thread-local would be invisible to those
//! callbacks, so this is a single global slot guarded by a mutex instead —
//! the same "one process-wide serialization point" idiom used for the
//! expectation/waiter subsystem queue in [`crate::expectation`].

use crate::expectation::Expectation;
use crate::location::SourceLocation;
use crate::record::ResultRecord;
use std::sync::{Arc, Mutex};

/// Shared state for the case presently bound into the current-case slot.
pub struct CaseContext {
    pub display_name: String,
    pub record: Mutex<ResultRecord>,
    pub expectations: Mutex<Vec<Arc<Expectation>>>,
    pub teardown_blocks: Mutex<Vec<Box<dyn FnOnce() + Send>>>,
}

impl CaseContext {
    pub fn new(display_name: impl Into<String>) -> Arc<Self> {
        Arc::new(Self {
            display_name: display_name.into(),
            record: Mutex::new(ResultRecord::leaf()),
            expectations: Mutex::new(Vec::new()),
            teardown_blocks: Mutex::new(Vec::new()),
        })
    }
}

static CURRENT_CASE: Mutex<Option<Arc<CaseContext>>> = Mutex::new(None);

/// Binds `context` as the current case. Only the execution engine should
/// call this, once per case, at body entry.
pub(crate) fn enter(context: Arc<CaseContext>) {
    *CURRENT_CASE.lock().unwrap() = Some(context);
}

/// Clears the current-case slot. Called once per case, at body exit.
pub(crate) fn exit() {
    *CURRENT_CASE.lock().unwrap() = None;
}

/// Returns a handle to the presently executing case, if any.
pub fn current() -> Option<Arc<CaseContext>> {
    CURRENT_CASE.lock().unwrap().clone()
}

/// Routes a failure to whichever case is presently executing. Silently
/// drops it if no case is active, which is the contract
/// [`crate::assert::Evaluate`] and [`crate::expectation::Expectation::fulfill`]
/// both rely on to stay safely callable outside a running test.
pub fn record_failure(description: impl Into<String>, location: SourceLocation, expected: bool) {
    if let Some(ctx) = current() {
        ctx.record.lock().unwrap().record_failure(description, location, expected);
    } else {
        tracing::debug!("assertion failure reported with no case active; dropped");
    }
}

/// Registers a teardown block with the presently executing case, to run
/// (in reverse registration order) during that case's teardown sequence.
/// A no-op if no case is active.
pub fn add_teardown_block(block: impl FnOnce() + Send + 'static) {
    if let Some(ctx) = current() {
        ctx.teardown_blocks.lock().unwrap().push(Box::new(block));
    }
}

/// The default [`crate::waiter::WaiterDelegate`]: per spec.md §7, "the
/// default delegate is the Case," translating timeouts, ordering
/// violations, and inverted fulfillments into recorded failures. Captures
/// the case's own context rather than going through [`current()`] again,
/// so a failure lands on the case that owned the wait even if a different
/// case has since become current by the time the delegate queue runs it.
struct CaseWaiterDelegate(Arc<CaseContext>);

impl crate::waiter::WaiterDelegate for CaseWaiterDelegate {
    fn did_timeout_with_unfulfilled(&mut self, unfulfilled: &[Arc<Expectation>]) {
        let names: Vec<String> = unfulfilled.iter().map(|e| e.description()).collect();
        let description = format!("Asynchronous wait failed: exceeded timeout for {}", names.join(", "));
        let location = unfulfilled[0].creation_location().clone();
        self.0.record.lock().unwrap().record_failure(description, location, true);
    }

    fn fulfillment_did_violate_ordering_constraints(&mut self, _actual: &[Arc<Expectation>], required: &[Arc<Expectation>]) {
        let description = "Expectation fulfilled in incorrect order".to_string();
        let location = required[0].creation_location().clone();
        self.0.record.lock().unwrap().record_failure(description, location, true);
    }

    fn did_fulfill_inverted_expectation(&mut self, expectation: &Arc<Expectation>) {
        let description = format!("Inverted expectation fulfilled: {}", expectation.description());
        let location = expectation.creation_location().clone();
        self.0.record.lock().unwrap().record_failure(description, location, true);
    }
}

/// Builds the default delegate for the presently executing case, if any.
/// Used by [`crate::waiter::wait`] and
/// [`crate::waiter::wait_with_default_timeout`] so ordinary test bodies get
/// the spec's default Case-as-delegate behavior without constructing one
/// themselves.
pub fn waiter_delegate() -> Option<Box<dyn crate::waiter::WaiterDelegate>> {
    current().map(|ctx| Box::new(CaseWaiterDelegate(ctx)) as Box<dyn crate::waiter::WaiterDelegate>)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_failure_with_no_active_case_is_silently_dropped() {
        exit();
        record_failure("oops", SourceLocation::new("f.rs", 1), true);
    }

    #[test]
    fn record_failure_reaches_the_bound_context() {
        let ctx = CaseContext::new("T.test");
        enter(ctx.clone());
        record_failure("oops", SourceLocation::new("f.rs", 1), true);
        exit();
        assert_eq!(ctx.record.lock().unwrap().failure_count(), 1);
    }
}

//! The synchronization object that blocks a test thread until a set of
//! [`Expectation`]s is satisfied, times out, is violated in order, is
//! inverted-fulfilled, or is interrupted by an enclosing waiter's timeout.

pub mod manager;
mod delegate_queue;

pub use manager::WaiterManager;

use crate::expectation::{self, Expectation, SubsystemGuard};
use crate::location::SourceLocation;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::time::{Duration, Instant};

/// The default timeout applied by [`Waiter::new_with_default_timeout`],
/// in milliseconds. Configurable once at startup from
/// [`crate::config::WaiterConfig::default_timeout_secs`]; 60s until then.
static DEFAULT_TIMEOUT_MILLIS: AtomicU64 = AtomicU64::new(60_000);

/// Sets the process-wide default wait timeout, read by
/// [`Waiter::new_with_default_timeout`]. Called once by the CLI driver
/// after loading configuration.
pub fn configure_default_timeout(timeout: Duration) {
    DEFAULT_TIMEOUT_MILLIS.store(timeout.as_millis() as u64, Ordering::SeqCst);
}

fn default_timeout() -> Duration {
    Duration::from_millis(DEFAULT_TIMEOUT_MILLIS.load(Ordering::SeqCst))
}

/// Upper bound on each cooperative suspension slice inside [`Waiter::wait`],
/// in milliseconds. Configurable once at startup from
/// [`crate::config::WaiterConfig::suspension_slice_millis`]; 100ms (the
/// spec's documented cap) until then.
static SUSPENSION_SLICE_MILLIS: AtomicU64 = AtomicU64::new(100);

/// Sets the process-wide suspension slice ceiling, read by [`Waiter::wait`].
/// Called once by the CLI driver after loading configuration.
pub fn configure_suspension_slice(slice: Duration) {
    SUSPENSION_SLICE_MILLIS.store(slice.as_millis() as u64, Ordering::SeqCst);
}

fn suspension_slice() -> Duration {
    Duration::from_millis(SUSPENSION_SLICE_MILLIS.load(Ordering::SeqCst))
}

/// Waits on `expectations`, installing whichever case is presently
/// executing (if any) as the default delegate — per spec.md §7, "the
/// default delegate is the Case, which does so [records timeouts, ordering
/// violations, and inverted fulfillments as test failures]." Prefer this
/// over constructing a [`Waiter`] directly unless a test needs a custom
/// delegate.
pub fn wait(
    expectations: Vec<Arc<Expectation>>,
    timeout: Duration,
    enforce_order: bool,
    location: SourceLocation,
) -> WaiterResult {
    Waiter::new(expectations, timeout, enforce_order, location, crate::current::waiter_delegate()).wait()
}

/// As [`wait`], applying the process-wide default timeout instead of
/// requiring the caller to supply one.
pub fn wait_with_default_timeout(
    expectations: Vec<Arc<Expectation>>,
    enforce_order: bool,
    location: SourceLocation,
) -> WaiterResult {
    Waiter::new_with_default_timeout(expectations, enforce_order, location, crate::current::waiter_delegate()).wait()
}

/// The outcome of a completed [`Waiter::wait`] call.
#[derive(Clone, Debug)]
pub enum WaiterResult {
    Completed,
    TimedOut(Vec<Arc<Expectation>>),
    IncorrectOrder {
        actual: Vec<Arc<Expectation>>,
        required: Vec<Arc<Expectation>>,
    },
    InvertedFulfillment(Arc<Expectation>),
    Interrupted,
}

/// Callbacks a [`Waiter`] reports on its delegate queue, never on the
/// subsystem queue. The default delegate installed by a running case
/// translates these into recorded failures. Each waiter calls its delegate
/// at most once, since `Finished` is terminal.
pub trait WaiterDelegate: Send {
    fn did_timeout_with_unfulfilled(&mut self, _unfulfilled: &[Arc<Expectation>]) {}
    fn fulfillment_did_violate_ordering_constraints(&mut self, _actual: &[Arc<Expectation>], _required: &[Arc<Expectation>]) {}
    fn did_fulfill_inverted_expectation(&mut self, _expectation: &Arc<Expectation>) {}
    fn nested_waiter_was_interrupted_by(&mut self, _outer_location: &SourceLocation) {}
}

#[derive(Debug)]
enum Phase {
    Ready,
    Waiting,
    Finished(WaiterResult),
}

pub struct Waiter {
    expectations: Vec<Arc<Expectation>>,
    enforce_order: bool,
    timeout: Duration,
    wait_location: SourceLocation,
    delegate: Mutex<Option<Box<dyn WaiterDelegate>>>,
    phase: Mutex<Phase>,
    condvar: Condvar,
}

impl Waiter {
    /// Duplicate expectations in `expectations` are a programming error.
    pub fn new(
        expectations: Vec<Arc<Expectation>>,
        timeout: Duration,
        enforce_order: bool,
        wait_location: SourceLocation,
        delegate: Option<Box<dyn WaiterDelegate>>,
    ) -> Arc<Self> {
        for (i, a) in expectations.iter().enumerate() {
            for b in &expectations[i + 1..] {
                assert!(
                    !Arc::ptr_eq(a, b),
                    "duplicate expectations passed to the same wait() call"
                );
            }
        }
        Arc::new(Self {
            expectations,
            enforce_order,
            timeout,
            wait_location,
            delegate: Mutex::new(delegate),
            phase: Mutex::new(Phase::Ready),
            condvar: Condvar::new(),
        })
    }

    /// Like [`Waiter::new`], but applies the process-wide default timeout
    /// (see [`configure_default_timeout`]) instead of requiring the caller
    /// to supply one.
    pub fn new_with_default_timeout(
        expectations: Vec<Arc<Expectation>>,
        enforce_order: bool,
        wait_location: SourceLocation,
        delegate: Option<Box<dyn WaiterDelegate>>,
    ) -> Arc<Self> {
        Self::new(expectations, default_timeout(), enforce_order, wait_location, delegate)
    }

    pub fn wait_location(&self) -> &SourceLocation {
        &self.wait_location
    }

    /// Blocks the calling thread until every non-inverted expectation is
    /// fulfilled, the timeout elapses, an ordering violation or inverted
    /// fulfillment is detected, or an enclosing waiter interrupts this one.
    pub fn wait(self: &Arc<Self>) -> WaiterResult {
        {
            let queue = expectation::lock_subsystem();
            for e in &self.expectations {
                e.mark_has_been_waited_on(&queue);
                let weak_self = Arc::downgrade(self);
                e.install_on_fulfill_handler(
                    &queue,
                    Box::new(move || {
                        if let Some(this) = weak_self.upgrade() {
                            this.validate(false);
                        }
                    }),
                );
            }
            *self.phase.lock().unwrap() = Phase::Waiting;
        }
        self.validate(false);

        let manager = WaiterManager::current();
        manager.register(self.clone());

        let deadline = Instant::now() + self.timeout;
        loop {
            let phase = self.phase.lock().unwrap();
            if matches!(*phase, Phase::Finished(_)) {
                break;
            }
            let now = Instant::now();
            if now >= deadline {
                drop(phase);
                manager.interrupt_inner(self);
                self.validate(true);
                continue;
            }
            let remaining = deadline - now;
            let slice = remaining.min(suspension_slice());
            let _ = self.condvar.wait_timeout(phase, slice).unwrap();
        }

        manager.deregister(self);
        {
            let queue = expectation::lock_subsystem();
            for e in &self.expectations {
                e.clear_on_fulfill_handler(&queue);
            }
        }

        let phase = self.phase.lock().unwrap();
        match &*phase {
            Phase::Finished(result) => result.clone(),
            _ => unreachable!("waiter loop exited without finishing"),
        }
    }

    /// Re-checks this waiter's completion condition. Runs under the
    /// subsystem queue; transitions `phase` to `Finished` and wakes the
    /// suspended thread if a terminal condition is met. `is_timeout`
    /// indicates this validation is happening because the deadline passed
    /// rather than because an expectation just fulfilled.
    fn validate(self: &Arc<Self>, is_timeout: bool) {
        let queue = expectation::lock_subsystem();
        {
            let phase = self.phase.lock().unwrap();
            if matches!(*phase, Phase::Finished(_)) {
                return;
            }
        }

        for e in &self.expectations {
            if e.is_inverted() && e.is_fulfilled() {
                self.finish(&queue, WaiterResult::InvertedFulfillment(e.clone()));
                let e = e.clone();
                self.notify_delegate(move |d| d.did_fulfill_inverted_expectation(&e));
                return;
            }
        }

        if self.enforce_order {
            let mut fulfilled: Vec<Arc<Expectation>> = self
                .expectations
                .iter()
                .filter(|e| !e.is_inverted() && e.is_fulfilled())
                .cloned()
                .collect();
            fulfilled.sort_by_key(|e| e.fulfillment_token());
            let required: Vec<Arc<Expectation>> = self
                .expectations
                .iter()
                .filter(|e| !e.is_inverted())
                .cloned()
                .collect();
            for (got, want) in fulfilled.iter().zip(required.iter()) {
                if !Arc::ptr_eq(got, want) {
                    self.finish(
                        &queue,
                        WaiterResult::IncorrectOrder {
                            actual: fulfilled.clone(),
                            required: required.clone(),
                        },
                    );
                    let (a, r) = (fulfilled, required);
                    self.notify_delegate(move |d| d.fulfillment_did_violate_ordering_constraints(&a, &r));
                    return;
                }
            }
        }

        let unfulfilled: Vec<Arc<Expectation>> = self
            .expectations
            .iter()
            .filter(|e| !e.is_inverted() && !e.is_fulfilled())
            .cloned()
            .collect();
        let has_noninverted = self.expectations.iter().any(|e| !e.is_inverted());

        // A waiter made up entirely of inverted expectations has nothing
        // non-inverted to be "all fulfilled" about; completing it here
        // (rather than at timeout) would defeat the point of inversion —
        // an inverted expectation must sit out its full timeout before
        // counting as a (non-)completion.
        if self.expectations.is_empty() || (has_noninverted && unfulfilled.is_empty()) {
            self.finish(&queue, WaiterResult::Completed);
            return;
        }

        if is_timeout {
            if unfulfilled.is_empty() {
                self.finish(&queue, WaiterResult::Completed);
            } else {
                self.finish(&queue, WaiterResult::TimedOut(unfulfilled.clone()));
                self.notify_delegate(move |d| d.did_timeout_with_unfulfilled(&unfulfilled));
            }
            return;
        }
        // else: incomplete, stays in Waiting.
    }

    fn finish(&self, _queue: &SubsystemGuard<'_>, result: WaiterResult) {
        *self.phase.lock().unwrap() = Phase::Finished(result);
        self.condvar.notify_all();
    }

    pub(crate) fn finish_interrupted(&self, outer_location: SourceLocation) {
        {
            let _queue = expectation::lock_subsystem();
            let mut phase = self.phase.lock().unwrap();
            if matches!(*phase, Phase::Finished(_)) {
                return;
            }
            *phase = Phase::Finished(WaiterResult::Interrupted);
        }
        self.condvar.notify_all();
        self.notify_delegate(move |d| d.nested_waiter_was_interrupted_by(&outer_location));
    }

    /// Dispatches a single terminal callback to the delegate queue. A
    /// waiter only ever finishes once, so the delegate is consumed rather
    /// than restored afterward.
    fn notify_delegate(&self, call: impl FnOnce(&mut dyn WaiterDelegate) + Send + 'static) {
        if let Some(mut delegate) = self.delegate.lock().unwrap().take() {
            delegate_queue::dispatch(move || call(delegate.as_mut()));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc as StdArc;
    use std::thread;

    fn loc() -> SourceLocation {
        SourceLocation::new("f.rs", 1)
    }

    #[test]
    fn wait_with_timeout_zero_and_prefulfilled_expectation_completes() {
        let e = Expectation::new("e", loc());
        e.fulfill(loc());
        let waiter = Waiter::new(vec![e], Duration::from_millis(0), false, loc(), None);
        assert!(matches!(waiter.wait(), WaiterResult::Completed));
    }

    #[test]
    fn wait_with_timeout_zero_and_unfulfilled_expectation_times_out() {
        let e = Expectation::new("e", loc());
        let waiter = Waiter::new(vec![e], Duration::from_millis(0), false, loc(), None);
        assert!(matches!(waiter.wait(), WaiterResult::TimedOut(_)));
    }

    #[test]
    fn fulfillment_from_another_thread_completes_the_wait() {
        let e = Expectation::new("e", loc());
        let waiter = Waiter::new(vec![e.clone()], Duration::from_secs(1), false, loc(), None);
        thread::spawn(move || {
            thread::sleep(Duration::from_millis(10));
            e.fulfill(loc());
        });
        assert!(matches!(waiter.wait(), WaiterResult::Completed));
    }

    #[test]
    fn inverted_expectation_never_fulfilled_completes_after_timeout() {
        let e = Expectation::new("e", loc());
        e.set_inverted(true);
        let waiter = Waiter::new(vec![e], Duration::from_millis(20), false, loc(), None);
        let started = Instant::now();
        assert!(matches!(waiter.wait(), WaiterResult::Completed));
        assert!(started.elapsed() >= Duration::from_millis(20));
    }

    #[test]
    fn enforce_order_violation_is_detected() {
        let a = Expectation::new("a", loc());
        let b = Expectation::new("b", loc());
        let waiter = Waiter::new(vec![a.clone(), b.clone()], Duration::from_secs(1), true, loc(), None);
        thread::spawn(move || {
            b.fulfill(loc());
            thread::sleep(Duration::from_millis(5));
            a.fulfill(loc());
        });
        assert!(matches!(waiter.wait(), WaiterResult::IncorrectOrder { .. }));
    }

    struct FlagDelegate(StdArc<AtomicBool>);
    impl WaiterDelegate for FlagDelegate {
        fn nested_waiter_was_interrupted_by(&mut self, _outer_location: &SourceLocation) {
            self.0.store(true, Ordering::SeqCst);
        }
    }

    #[test]
    fn manager_interrupts_inner_waiters_beneath_a_timed_out_outer() {
        let flagged = StdArc::new(AtomicBool::new(false));
        let inner = Waiter::new(
            vec![],
            Duration::from_secs(5),
            false,
            loc(),
            Some(Box::new(FlagDelegate(flagged.clone()))),
        );
        let outer = Waiter::new(vec![], Duration::from_secs(5), false, loc(), None);

        let manager = WaiterManager::current();
        manager.register(outer.clone());
        manager.register(inner.clone());

        manager.interrupt_inner(&outer);

        thread::sleep(Duration::from_millis(20));
        assert!(flagged.load(Ordering::SeqCst));
        assert!(matches!(*inner.phase.lock().unwrap(), Phase::Finished(WaiterResult::Interrupted)));
        manager.deregister(&inner);
        manager.deregister(&outer);
    }
}

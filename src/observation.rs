//! The observer fan-out: lets external collaborators (the default textual
//! reporter, a custom CI integration, ...) track lifecycle events without
//! the execution engine knowing anything about them.
//!
//! Observers are held by identity in an ordered set; dispatch copies the
//! set before iterating so an observer is free to register or drop another
//! observer from inside a callback without racing the dispatch loop. A
//! panicking observer is caught and logged, never propagated — one
//! misbehaving reporter must not take down the test run.

use crate::location::SourceLocation;
use crate::record::ResultRecord;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Mutex};

/// Receives lifecycle callbacks from the engine's depth-first traversal of
/// the test tree. Every method has a default no-op body so an observer
/// only needs to implement the events it cares about.
pub trait Observer: Send + Sync {
    fn bundle_will_start(&self, _bundle_name: &str) {}
    fn bundle_did_finish(&self, _bundle_name: &str, _record: &ResultRecord) {}
    fn suite_will_start(&self, _suite_name: &str) {}
    fn suite_did_finish(&self, _suite_name: &str, _record: &ResultRecord) {}
    fn case_will_start(&self, _case_name: &str) {}
    fn case_did_finish(&self, _case_name: &str, _record: &ResultRecord) {}
    fn case_did_fail(&self, _case_name: &str, _description: &str, _location: &SourceLocation) {}
    fn case_was_skipped(&self, _case_name: &str, _description: &str, _location: &SourceLocation) {}
}

/// An identity-keyed set of observers, dispatched to synchronously and in
/// insertion order during the engine's traversal.
#[derive(Default)]
pub struct ObservationHub {
    observers: Mutex<Vec<Arc<dyn Observer>>>,
}

impl ObservationHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `observer`, unless an observer with the same identity is
    /// already present.
    pub fn add_observer(&self, observer: Arc<dyn Observer>) {
        let mut observers = self.observers.lock().unwrap();
        if !observers.iter().any(|o| Arc::ptr_eq(o, &observer)) {
            observers.push(observer);
        }
    }

    pub fn remove_observer(&self, observer: &Arc<dyn Observer>) {
        self.observers
            .lock()
            .unwrap()
            .retain(|o| !Arc::ptr_eq(o, observer));
    }

    fn dispatch(&self, call: impl Fn(&dyn Observer)) {
        // Copy-on-iterate: an observer callback is free to mutate the
        // observer set without invalidating this traversal.
        let snapshot = self.observers.lock().unwrap().clone();
        for observer in &snapshot {
            let observer = observer.as_ref();
            if std::panic::catch_unwind(AssertUnwindSafe(|| call(observer))).is_err() {
                tracing::warn!("observer panicked during lifecycle dispatch; ignoring");
            }
        }
    }

    pub fn bundle_will_start(&self, bundle_name: &str) {
        self.dispatch(|o| o.bundle_will_start(bundle_name));
    }

    pub fn bundle_did_finish(&self, bundle_name: &str, record: &ResultRecord) {
        self.dispatch(|o| o.bundle_did_finish(bundle_name, record));
    }

    pub fn suite_will_start(&self, suite_name: &str) {
        self.dispatch(|o| o.suite_will_start(suite_name));
    }

    pub fn suite_did_finish(&self, suite_name: &str, record: &ResultRecord) {
        self.dispatch(|o| o.suite_did_finish(suite_name, record));
    }

    pub fn case_will_start(&self, case_name: &str) {
        self.dispatch(|o| o.case_will_start(case_name));
    }

    pub fn case_did_finish(&self, case_name: &str, record: &ResultRecord) {
        self.dispatch(|o| o.case_did_finish(case_name, record));
    }

    pub fn case_did_fail(&self, case_name: &str, description: &str, location: &SourceLocation) {
        self.dispatch(|o| o.case_did_fail(case_name, description, location));
    }

    pub fn case_was_skipped(&self, case_name: &str, description: &str, location: &SourceLocation) {
        self.dispatch(|o| o.case_was_skipped(case_name, description, location));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingObserver {
        starts: AtomicUsize,
    }

    impl Observer for CountingObserver {
        fn case_will_start(&self, _case_name: &str) {
            self.starts.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn dispatch_reaches_every_registered_observer() {
        let hub = ObservationHub::new();
        let observer = Arc::new(CountingObserver {
            starts: AtomicUsize::new(0),
        });
        hub.add_observer(observer.clone());
        hub.case_will_start("A.test");
        assert_eq!(observer.starts.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn adding_the_same_observer_twice_is_a_no_op() {
        let hub = ObservationHub::new();
        let observer = Arc::new(CountingObserver {
            starts: AtomicUsize::new(0),
        });
        hub.add_observer(observer.clone());
        hub.add_observer(observer.clone());
        hub.case_will_start("A.test");
        assert_eq!(observer.starts.load(Ordering::SeqCst), 1);
    }

    struct PanickingObserver;
    impl Observer for PanickingObserver {
        fn case_will_start(&self, _case_name: &str) {
            panic!("boom");
        }
    }

    #[test]
    fn a_panicking_observer_does_not_stop_dispatch_to_the_rest() {
        let hub = ObservationHub::new();
        hub.add_observer(Arc::new(PanickingObserver));
        let observer = Arc::new(CountingObserver {
            starts: AtomicUsize::new(0),
        });
        hub.add_observer(observer.clone());
        hub.case_will_start("A.test");
        assert_eq!(observer.starts.load(Ordering::SeqCst), 1);
    }
}

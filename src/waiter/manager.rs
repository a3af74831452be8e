//! Per-execution-context stack of active waiters, enforcing nested-waiter
//! interruption: when an outer waiter's own deadline passes while inner
//! waiters are still blocked beneath it, those inner waiters are finished
//! with `Interrupted` so the stack can unwind promptly.

use crate::waiter::Waiter;
use std::cell::RefCell;
use std::sync::Arc;

thread_local! {
    static STACK: RefCell<Vec<Arc<Waiter>>> = RefCell::new(Vec::new());
}

/// A handle onto the calling execution context's waiter stack. Cheap to
/// construct; all state lives in the thread-local it wraps.
pub struct WaiterManager;

impl WaiterManager {
    pub fn current() -> Self {
        WaiterManager
    }

    pub(crate) fn register(&self, waiter: Arc<Waiter>) {
        STACK.with(|s| s.borrow_mut().push(waiter));
    }

    pub(crate) fn deregister(&self, waiter: &Arc<Waiter>) {
        STACK.with(|s| {
            let mut stack = s.borrow_mut();
            if let Some(pos) = stack.iter().position(|w| Arc::ptr_eq(w, waiter)) {
                stack.remove(pos);
            }
        });
    }

    /// Finishes every waiter nested beneath `outer` on this context's
    /// stack with `Interrupted`, because `outer`'s own deadline just
    /// passed.
    pub(crate) fn interrupt_inner(&self, outer: &Arc<Waiter>) {
        let inner_waiters: Vec<Arc<Waiter>> = STACK.with(|s| {
            let stack = s.borrow();
            match stack.iter().position(|w| Arc::ptr_eq(w, outer)) {
                Some(pos) => stack[pos + 1..].to_vec(),
                None => Vec::new(),
            }
        });
        for inner in inner_waiters {
            inner.finish_interrupted(outer.wait_location().clone());
        }
    }

    #[cfg(test)]
    pub(crate) fn depth(&self) -> usize {
        STACK.with(|s| s.borrow().len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::location::SourceLocation;
    use std::time::Duration;

    #[test]
    fn register_and_deregister_round_trip() {
        let manager = WaiterManager::current();
        let waiter = Waiter::new(vec![], Duration::from_millis(10), false, SourceLocation::new("f.rs", 1), None);
        manager.register(waiter.clone());
        assert_eq!(manager.depth(), 1);
        manager.deregister(&waiter);
        assert_eq!(manager.depth(), 0);
    }
}

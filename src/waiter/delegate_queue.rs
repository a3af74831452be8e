//! A dedicated serial worker that runs waiter delegate callbacks, kept
//! distinct from the subsystem queue so a delegate can freely call back
//! into expectation/waiter APIs without deadlocking on a lock its own
//! completion already dropped.

use std::sync::mpsc;
use std::sync::OnceLock;
use std::thread;

type Job = Box<dyn FnOnce() + Send>;

fn sender() -> &'static mpsc::Sender<Job> {
    static SENDER: OnceLock<mpsc::Sender<Job>> = OnceLock::new();
    SENDER.get_or_init(|| {
        let (tx, rx) = mpsc::channel::<Job>();
        thread::Builder::new()
            .name("testframe-waiter-delegate".into())
            .spawn(move || {
                for job in rx {
                    job();
                }
            })
            .expect("failed to spawn waiter delegate queue thread");
        tx
    })
}

/// Runs `job` on the delegate queue and blocks the caller until it
/// completes. The job still runs on a dedicated worker thread distinct
/// from the subsystem queue (so it can freely call back into
/// expectation/waiter APIs), but the caller is guaranteed the job has
/// finished — and, for the default Case delegate, that any failure it
/// records has landed — before `dispatch` returns. This is what lets
/// [`crate::waiter::Waiter::wait`] hand the result straight to its
/// delegate and have that delegate's recorded failure already visible by
/// the time `wait()` hands control back to the test body.
pub fn dispatch(job: impl FnOnce() + Send + 'static) {
    let (done_tx, done_rx) = mpsc::channel::<()>();
    let wrapped: Job = Box::new(move || {
        job();
        let _ = done_tx.send(());
    });
    if sender().send(wrapped).is_err() {
        return;
    }
    let _ = done_rx.recv();
}

use std::cell::Cell;

use crate::scheduler::flush_jobs;

// Thread-local transaction depth counter
// When > 0, queued jobs do not request a flush; the outermost exit flushes.
thread_local! {
    static TRANSACTION_DEPTH: Cell<usize> = const { Cell::new(0) };
}

/// RAII guard that ensures transaction cleanup happens even on panic.
struct TransactionGuard;

impl Drop for TransactionGuard {
    fn drop(&mut self) {
        let outermost = TRANSACTION_DEPTH.with(|depth| {
            let next = depth.get().saturating_sub(1);
            depth.set(next);
            next == 0
        });
        // Don't run user jobs while unwinding from a panic.
        if outermost && !std::thread::panicking() {
            flush_jobs();
        }
    }
}

/// Check if currently inside a transaction
pub fn is_transaction_active() -> bool {
    TRANSACTION_DEPTH.with(|depth| depth.get() > 0)
}

/// Batch writes and flush the job queue synchronously at the end
///
/// Inside a transaction, enqueued jobs do not call the flush trigger. When
/// the outermost transaction returns, the queue is flushed on the spot, so
/// code after `Transaction::run` observes fully re-rendered output.
///
/// # Example
/// ```ignore
/// Transaction::run(|| {
///     state.set("a", 1);
///     state.set("b", 2);
/// }); // the component re-rendered exactly once, right here
/// ```
pub struct Transaction;

impl Transaction {
    /// Run a function within a transaction context
    pub fn run<F, R>(f: F) -> R
    where
        F: FnOnce() -> R,
    {
        TRANSACTION_DEPTH.with(|depth| depth.set(depth.get() + 1));
        let _guard = TransactionGuard;
        f()
    }
}

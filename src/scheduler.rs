//! Job queue with flush batching.
//!
//! Reactive triggers never re-render directly: component render effects
//! enqueue their update [`Job`], and the whole queue runs later in one
//! [`flush_jobs`] pass. The queue deduplicates by job identity, so any
//! number of writes between two flushes re-renders a component once.
//!
//! When the first job lands in an empty queue the installed flush trigger
//! is called, exactly once per flush cycle. The host wires the trigger to
//! its equivalent of "run soon" (a microtask, an event-loop wakeup); by
//! default there is none and flushing is manual.
//!
//! ## Usage
//!
//! ```ignore
//! // Manual flushing (default, also what tests use)
//! state.set("count", 1);
//! flush_jobs();
//!
//! // Hand flush requests to an event loop
//! SchedulerConfig::new()
//!     .flush_trigger(move || event_loop.post(flush_jobs))
//!     .install();
//! ```

use std::cell::{Cell, RefCell};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::rc::Rc;

use crate::hash::FastIndexSet;
use crate::transaction::is_transaction_active;

/// Called when a flush becomes necessary.
pub type FlushTrigger = Rc<dyn Fn()>;

thread_local! {
    static QUEUE: RefCell<FastIndexSet<Job>> = RefCell::new(FastIndexSet::default());
    static FLUSH_PENDING: Cell<bool> = const { Cell::new(false) };
    static FLUSH_TRIGGER: RefCell<Option<FlushTrigger>> = const { RefCell::new(None) };
}

/// A queued unit of work, identified by its allocation.
#[derive(Clone)]
pub struct Job(Rc<dyn Fn()>);

impl Job {
    /// Wrap a closure. Each call creates a distinct job identity.
    pub fn new(f: impl Fn() + 'static) -> Self {
        Self(Rc::new(f))
    }

    /// Run the job now.
    pub fn run(&self) {
        (self.0)();
    }

    fn addr(&self) -> usize {
        Rc::as_ptr(&self.0) as *const () as usize
    }
}

impl PartialEq for Job {
    fn eq(&self, other: &Self) -> bool {
        self.addr() == other.addr()
    }
}

impl Eq for Job {}

impl Hash for Job {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.addr().hash(state);
    }
}

impl fmt::Debug for Job {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Job({:#x})", self.addr())
    }
}

/// Builder for the per-thread scheduler configuration.
///
/// # Example
///
/// ```ignore
/// SchedulerConfig::new()
///     .flush_trigger(|| wake_event_loop())
///     .install();
/// ```
#[derive(Default)]
pub struct SchedulerConfig {
    flush_trigger: Option<FlushTrigger>,
}

impl SchedulerConfig {
    /// Manual flushing, no trigger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Call `trigger` whenever a flush is requested.
    pub fn flush_trigger(mut self, trigger: impl Fn() + 'static) -> Self {
        self.flush_trigger = Some(Rc::new(trigger));
        self
    }

    /// Install on the current thread, replacing any previous configuration.
    pub fn install(self) {
        FLUSH_TRIGGER.with(|slot| *slot.borrow_mut() = self.flush_trigger);
    }
}

/// Enqueue `job` unless it is already queued, requesting a flush if none
/// is pending.
pub fn queue_job(job: Job) {
    let inserted = QUEUE.with(|queue| queue.borrow_mut().insert(job));
    if !inserted {
        cov_mark::hit!(job_deduplicated);
    }
    request_flush();
}

/// Drop `job` from the queue if it is waiting there. Used when a job is
/// about to be run synchronously by someone else.
pub fn invalidate_job(job: &Job) {
    QUEUE.with(|queue| {
        queue.borrow_mut().shift_remove(job);
    });
}

fn request_flush() {
    if FLUSH_PENDING.with(|pending| pending.replace(true)) {
        return;
    }
    // Transactions flush synchronously on exit instead.
    if is_transaction_active() {
        return;
    }
    let trigger = FLUSH_TRIGGER.with(|slot| slot.borrow().clone());
    if let Some(trigger) = trigger {
        tracing::trace!("scheduler: flush requested");
        trigger();
    }
}

/// Run every queued job, in insertion order. Returns how many ran.
///
/// The queue is moved out before any job runs, so jobs queued by the
/// batch (including a job re-queuing itself) wait for the next flush.
pub fn flush_jobs() -> usize {
    FLUSH_PENDING.with(|pending| pending.set(false));
    let batch: Vec<Job> = QUEUE.with(|queue| queue.borrow_mut().drain(..).collect());
    if batch.is_empty() {
        return 0;
    }
    tracing::trace!(jobs = batch.len(), "scheduler: flushing");
    for job in &batch {
        job.run();
    }
    batch.len()
}

/// Whether a flush has been requested but not run yet.
pub fn is_flush_pending() -> bool {
    FLUSH_PENDING.with(Cell::get)
}

/// Number of jobs waiting for the next flush.
pub fn queued_job_count() -> usize {
    QUEUE.with(|queue| queue.borrow().len())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn counting_job(counter: &Rc<Cell<usize>>) -> Job {
        let counter = counter.clone();
        Job::new(move || counter.set(counter.get() + 1))
    }

    #[test]
    fn same_job_runs_once_per_flush() {
        cov_mark::check!(job_deduplicated);
        let runs = Rc::new(Cell::new(0));
        let job = counting_job(&runs);
        queue_job(job.clone());
        queue_job(job.clone());
        queue_job(job);
        assert_eq!(flush_jobs(), 1);
        assert_eq!(runs.get(), 1);
    }

    #[test]
    fn trigger_fires_once_per_cycle() {
        let requests = Rc::new(Cell::new(0));
        let counter = requests.clone();
        SchedulerConfig::new()
            .flush_trigger(move || counter.set(counter.get() + 1))
            .install();

        let runs = Rc::new(Cell::new(0));
        queue_job(counting_job(&runs));
        queue_job(counting_job(&runs));
        assert_eq!(requests.get(), 1);
        assert!(is_flush_pending());

        flush_jobs();
        assert!(!is_flush_pending());
        queue_job(counting_job(&runs));
        assert_eq!(requests.get(), 2);

        flush_jobs();
        SchedulerConfig::new().install();
    }

    #[test]
    fn jobs_queued_during_flush_run_next_flush() {
        let runs = Rc::new(Cell::new(0));
        let follow_up = counting_job(&runs);
        let first = Job::new(move || queue_job(follow_up.clone()));
        queue_job(first);

        assert_eq!(flush_jobs(), 1);
        assert_eq!(runs.get(), 0);
        assert_eq!(queued_job_count(), 1);
        assert!(is_flush_pending());

        assert_eq!(flush_jobs(), 1);
        assert_eq!(runs.get(), 1);
    }

    #[test]
    fn invalidated_job_is_skipped() {
        let runs = Rc::new(Cell::new(0));
        let job = counting_job(&runs);
        queue_job(job.clone());
        invalidate_job(&job);
        assert_eq!(queued_job_count(), 0);
        flush_jobs();
        assert_eq!(runs.get(), 0);
    }

    #[test]
    fn jobs_run_in_insertion_order() {
        let order = Rc::new(RefCell::new(Vec::new()));
        for i in 0..3 {
            let order = order.clone();
            queue_job(Job::new(move || order.borrow_mut().push(i)));
        }
        flush_jobs();
        assert_eq!(*order.borrow(), vec![0, 1, 2]);
    }
}

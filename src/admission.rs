//! Admission control: bound how many record-source invocations run at once.
//!
//! Two strategies share one worker body:
//! - `Strategy::Pool` starts exactly N long-lived workers that pull from a closed work queue.
//! - `Strategy::Gate` spawns one short-lived task per file, each holding a `Permit` from a
//!   counting `Gate` for its whole lifetime.
//!
//! Both run on a dedicated rayon pool of N threads and return only after every task has
//! finished emitting and released its resources.

use crate::collector::Emitter;
use crate::error::{Failure, PipelineError};
use crate::source::{read_records, RecordSource, WorkItem};
use crossbeam_channel::bounded;
use indicatif::ProgressBar;
use parking_lot::{Condvar, Mutex};
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Weak};

/// Admission strategy toggle.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Strategy {
    /// N persistent workers draining a shared work queue.
    #[default]
    Pool,
    /// One task per file, admitted through an N-permit gate.
    Gate,
}

impl FromStr for Strategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pool" => Ok(Strategy::Pool),
            "gate" | "semaphore" => Ok(Strategy::Gate),
            other => Err(format!("unknown strategy '{other}' (expected 'pool' or 'gate')")),
        }
    }
}

/// Cloneable run-wide cancellation flag. Once set, no further files are admitted.
#[derive(Clone, Debug, Default)]
pub struct CancelHandle {
    inner: Arc<CancelInner>,
}

#[derive(Debug, Default)]
struct CancelInner {
    flag: AtomicBool,
    // Gates built on this handle; woken on cancel.
    gates: Mutex<Vec<Weak<GateState>>>,
}

impl CancelHandle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the flag and wake every acquire blocked on a gate tied to this handle.
    pub fn cancel(&self) {
        self.inner.flag.store(true, Ordering::SeqCst);
        let gates = std::mem::take(&mut *self.inner.gates.lock());
        for gate in gates.iter().filter_map(Weak::upgrade) {
            // Taking the lock orders this notify after any waiter's flag check.
            let _available = gate.available.lock();
            gate.freed.notify_all();
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.inner.flag.load(Ordering::SeqCst)
    }

    fn register(&self, gate: &Arc<GateState>) {
        let mut gates = self.inner.gates.lock();
        gates.retain(|g| g.strong_count() > 0);
        gates.push(Arc::downgrade(gate));
    }
}

#[derive(Debug)]
struct GateState {
    available: Mutex<usize>,
    freed: Condvar,
}

/// Counting admission gate (weighted semaphore with weight 1 per permit).
pub struct Gate {
    state: Arc<GateState>,
    capacity: usize,
    cancel: CancelHandle,
}

/// Scoped acquisition: the permit goes back to its gate when dropped,
/// including while unwinding.
pub struct Permit<'a> {
    gate: &'a Gate,
}

impl Drop for Permit<'_> {
    fn drop(&mut self) {
        self.gate.release();
    }
}

impl Gate {
    pub fn new(permits: usize, cancel: CancelHandle) -> Self {
        let capacity = permits.max(1);
        let state = Arc::new(GateState { available: Mutex::new(capacity), freed: Condvar::new() });
        cancel.register(&state);
        Self { state, capacity, cancel }
    }

    /// Block until a permit is free. Returns `None` once the run is cancelled.
    pub fn acquire(&self) -> Option<Permit<'_>> {
        let mut available = self.state.available.lock();
        loop {
            if self.cancel.is_cancelled() {
                return None;
            }
            if *available > 0 {
                *available -= 1;
                return Some(Permit { gate: self });
            }
            self.state.freed.wait(&mut available);
        }
    }

    /// Take a permit only if one is free right now.
    pub fn try_acquire(&self) -> Option<Permit<'_>> {
        let mut available = self.state.available.lock();
        if *available > 0 && !self.cancel.is_cancelled() {
            *available -= 1;
            Some(Permit { gate: self })
        } else {
            None
        }
    }

    pub fn available(&self) -> usize {
        *self.state.available.lock()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    fn release(&self) {
        let mut available = self.state.available.lock();
        *available += 1;
        debug_assert!(*available <= self.capacity, "gate released more permits than it holds");
        self.state.freed.notify_one();
    }
}

/// Everything a worker needs to process one file and report it.
pub(crate) struct Admission<'a, S> {
    source: &'a S,
    emitter: &'a Emitter,
    cancel: &'a CancelHandle,
    progress: Option<&'a ProgressBar>,
    processed: AtomicUsize,
}

impl<'a, S: RecordSource> Admission<'a, S> {
    pub(crate) fn new(
        source: &'a S,
        emitter: &'a Emitter,
        cancel: &'a CancelHandle,
        progress: Option<&'a ProgressBar>,
    ) -> Self {
        Self { source, emitter, cancel, progress, processed: AtomicUsize::new(0) }
    }

    /// Process every item with at most `concurrency` invocations in flight.
    /// Returns after all workers/tasks have finished, with the number of items
    /// never processed because the run was cancelled.
    pub(crate) fn run(
        &self,
        strategy: Strategy,
        concurrency: usize,
        items: Vec<WorkItem>,
    ) -> Result<usize, PipelineError> {
        let concurrency = concurrency.max(1);
        let total = items.len();
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(concurrency)
            .thread_name(|i| format!("jsonpool-worker-{i}"))
            .build()?;

        match strategy {
            Strategy::Pool => self.run_pool(&pool, concurrency, items),
            Strategy::Gate => self.run_gate(&pool, concurrency, items),
        }

        let processed = self.processed.load(Ordering::SeqCst);
        Ok(total.saturating_sub(processed))
    }

    fn run_pool(&self, pool: &rayon::ThreadPool, workers: usize, items: Vec<WorkItem>) {
        // Sized to hold every item: feeding never blocks, and the queue is closed right after.
        let (work_tx, work_rx) = bounded::<WorkItem>(items.len().max(1));

        pool.in_place_scope(|scope| {
            for worker in 0..workers {
                let work_rx = work_rx.clone();
                scope.spawn(move |_| {
                    for item in work_rx.iter() {
                        if self.cancel.is_cancelled() {
                            break;
                        }
                        self.process(item);
                    }
                    tracing::debug!(worker, "worker exiting");
                });
            }
            drop(work_rx);

            for item in items {
                if self.cancel.is_cancelled() || work_tx.send(item).is_err() {
                    break;
                }
            }
            drop(work_tx);
        });
    }

    fn run_gate(&self, pool: &rayon::ThreadPool, permits: usize, items: Vec<WorkItem>) {
        let gate = Gate::new(permits, self.cancel.clone());

        pool.in_place_scope(|scope| {
            for item in items {
                let Some(permit) = gate.acquire() else {
                    tracing::warn!("admission cancelled; remaining files will not be dispatched");
                    break;
                };
                scope.spawn(move |_| {
                    let _permit = permit;
                    self.process(item);
                });
            }
        });
        debug_assert_eq!(gate.available(), gate.capacity());
    }

    /// Worker body: read one file, emit its records or exactly one failure.
    fn process(&self, item: WorkItem) {
        tracing::debug!(file = %item.display(), "reading");
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| read_records(self.source, &item)));
        match outcome {
            Ok(Ok(records)) => {
                tracing::debug!(file = %item.display(), records = records.len(), "decoded");
                for record in records {
                    self.emitter.record(record);
                }
            }
            Ok(Err(failure)) => {
                tracing::warn!(kind = %failure.kind(), "{failure}");
                self.emitter.failure(failure);
            }
            Err(payload) => {
                let message = panic_message(payload.as_ref());
                tracing::warn!(file = %item.display(), "reader panicked: {message}");
                self.emitter.failure(Failure::Panicked { item, message });
            }
        }
        self.processed.fetch_add(1, Ordering::SeqCst);
        if let Some(pb) = self.progress {
            pb.inc(1);
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

//! Fan-in: workers push into two bounded streams (records, failures); a single
//! drain task owns both accumulators and empties the streams while production runs.

use crate::error::Failure;
use crate::pipeline::RunOutput;
use crate::record::Record;
use crossbeam_channel::{bounded, never, select, Receiver, Sender};

/// Producer side, shared by reference with every worker. Dropping it closes both streams.
pub(crate) struct Emitter {
    records: Sender<Record>,
    failures: Sender<Failure>,
}

impl Emitter {
    /// Blocks while the record stream is full.
    pub(crate) fn record(&self, record: Record) {
        if self.records.send(record).is_err() {
            tracing::error!("record stream closed while producers are still running; record dropped");
        }
    }

    pub(crate) fn failure(&self, failure: Failure) {
        if let Err(e) = self.failures.send(failure) {
            tracing::error!("failure stream closed while producers are still running: {}", e.0);
        }
    }
}

/// Consumer side, moved into the drain task.
pub(crate) struct Collector {
    records: Receiver<Record>,
    failures: Receiver<Failure>,
}

/// Create the two bounded output streams. Capacities are clamped to at least 1.
pub(crate) fn streams(record_capacity: usize, failure_capacity: usize) -> (Emitter, Collector) {
    let (rec_tx, rec_rx) = bounded(record_capacity.max(1));
    let (fail_tx, fail_rx) = bounded(failure_capacity.max(1));
    (
        Emitter { records: rec_tx, failures: fail_tx },
        Collector { records: rec_rx, failures: fail_rx },
    )
}

impl Collector {
    /// Drain both streams in arrival order until the `Emitter` is dropped.
    pub(crate) fn drain(self) -> RunOutput {
        let mut records = Vec::new();
        let mut failures = Vec::new();

        // A closed stream is swapped for `never()` so select! stops polling it.
        let no_records = never::<Record>();
        let no_failures = never::<Failure>();
        let mut records_open = true;
        let mut failures_open = true;

        while records_open || failures_open {
            let rec_rx = if records_open { &self.records } else { &no_records };
            let fail_rx = if failures_open { &self.failures } else { &no_failures };
            select! {
                recv(rec_rx) -> msg => match msg {
                    Ok(record) => records.push(record),
                    Err(_) => records_open = false,
                },
                recv(fail_rx) -> msg => match msg {
                    Ok(failure) => failures.push(failure),
                    Err(_) => failures_open = false,
                },
            }
        }

        tracing::debug!(records = records.len(), failures = failures.len(), "drain finished");
        RunOutput { records, failures }
    }
}

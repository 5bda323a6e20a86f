use crate::admission::{Admission, CancelHandle, Strategy};
use crate::collector::streams;
use crate::config::IngestOptions;
use crate::error::{Failure, FailureKind, PipelineError};
use crate::paths::discover_json_files;
use crate::progress::make_count_progress;
use crate::record::Record;
use crate::source::{FsSource, RecordSource, WorkItem};
use crate::util::init_tracing_once;
use anyhow::{anyhow, Result};
use regex::Regex;
use std::path::{Path, PathBuf};
use std::thread;

/// Final aggregates of one run. Record order reflects arrival, not input order;
/// records of a single file keep their decode order.
#[derive(Debug, Default)]
pub struct RunOutput {
    pub records: Vec<Record>,
    pub failures: Vec<Failure>,
}

impl RunOutput {
    pub fn record_count(&self) -> usize {
        self.records.len()
    }
    pub fn failure_count(&self) -> usize {
        self.failures.len()
    }
    /// Failure kinds, sorted, for order-insensitive comparison.
    pub fn failure_kinds(&self) -> Vec<FailureKind> {
        let mut kinds: Vec<FailureKind> = self.failures.iter().map(Failure::kind).collect();
        kinds.sort();
        kinds
    }
}

#[derive(Clone, Default)]
pub struct JsonIngest {
    pub(crate) opts: IngestOptions,
    cancel: CancelHandle,
}

impl JsonIngest {
    pub fn new() -> Self {
        Self { opts: IngestOptions::default(), cancel: CancelHandle::new() }
    }

    pub fn from_options(opts: IngestOptions) -> Self {
        Self { opts, cancel: CancelHandle::new() }
    }

    // -------- Builder methods --------
    pub fn concurrency(mut self, n: usize) -> Self { self.opts = self.opts.with_concurrency(n); self }
    pub fn strategy(mut self, strategy: Strategy) -> Self { self.opts = self.opts.with_strategy(strategy); self }
    pub fn record_capacity(mut self, n: usize) -> Self { self.opts = self.opts.with_record_capacity(n); self }
    pub fn failure_capacity(mut self, n: usize) -> Self { self.opts = self.opts.with_failure_capacity(n); self }
    pub fn read_buffer(mut self, bytes: usize) -> Self { self.opts = self.opts.with_read_buffer(bytes); self }
    pub fn progress(mut self, yes: bool) -> Self { self.opts = self.opts.with_progress(yes); self }
    pub fn progress_label(mut self, label: impl Into<String>) -> Self { self.opts = self.opts.with_progress_label(label); self }

    pub fn options(&self) -> &IngestOptions {
        &self.opts
    }

    /// Handle that stops admission of further files. Shared by clones of this builder.
    pub fn cancel_handle(&self) -> CancelHandle {
        self.cancel.clone()
    }

    /// Ingest `files` from the local filesystem.
    pub fn run<I, P>(&self, files: I) -> Result<RunOutput>
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        let source = FsSource::new().with_read_buffer(self.opts.read_buffer_bytes);
        self.run_with(files, &source)
    }

    /// Ingest every `*.json` file directly inside `dir` (optionally filtered by file name).
    pub fn run_dir(&self, dir: &Path, name_filter: Option<&Regex>) -> Result<RunOutput> {
        let files = discover_json_files(dir, name_filter);
        if files.is_empty() {
            tracing::warn!("No JSON files found in {}.", dir.display());
        }
        self.run(files)
    }

    /// Ingest `items` through `source`.
    ///
    /// Blocks until every file has been processed and both output streams are drained.
    /// Per-file failures are returned in `RunOutput::failures`; the only error is
    /// `PipelineError` (cancellation, carrying the partial output, or the worker pool
    /// failing to start).
    pub fn run_with<I, P, S>(&self, items: I, source: &S) -> Result<RunOutput>
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
        S: RecordSource,
    {
        init_tracing_once();
        let items: Vec<WorkItem> = items.into_iter().map(Into::into).collect();
        let total = items.len();
        let concurrency = self.opts.concurrency.max(1);
        let strategy = self.opts.strategy;
        tracing::info!(files = total, concurrency, ?strategy, "Starting ingest.");

        let failure_capacity = self.opts.failure_capacity.unwrap_or(total);
        let (emitter, collector) = streams(self.opts.record_capacity, failure_capacity);

        let pb = if self.opts.progress {
            Some(make_count_progress(total as u64, self.opts.progress_label.as_deref().unwrap_or("Ingest")))
        } else {
            None
        };

        let (admitted, output) = thread::scope(|ts| {
            // Drain must run alongside production: the record stream is bounded.
            let drain = ts.spawn(move || collector.drain());

            let admitted = {
                let admission = Admission::new(source, &emitter, &self.cancel, pb.as_ref());
                admission.run(strategy, concurrency, items)
            };
            // All producers are done: closing the streams lets the drain task finish.
            drop(emitter);

            (admitted, drain.join())
        });

        if let Some(pb) = pb {
            pb.finish_with_message("done");
        }
        let output = output.map_err(|_| anyhow!("collector thread panicked"))?;
        let skipped = admitted?;
        if skipped > 0 {
            tracing::warn!(
                skipped,
                records = output.record_count(),
                failures = output.failure_count(),
                "Ingest cancelled."
            );
            return Err(PipelineError::Cancelled { skipped, partial: output }.into());
        }

        tracing::info!(
            records = output.record_count(),
            failures = output.failure_count(),
            "Ingest finished."
        );
        Ok(output)
    }
}

/// One-shot form: ingest `items` through `source` with at most `concurrency`
/// invocations in flight, using the default (pool) strategy.
pub fn run<I, P, S>(items: I, concurrency: usize, source: &S) -> Result<RunOutput>
where
    I: IntoIterator<Item = P>,
    P: Into<PathBuf>,
    S: RecordSource,
{
    JsonIngest::new().concurrency(concurrency).run_with(items, source)
}

mod config;
mod paths;
mod progress;
mod util;

mod record;
mod error;
mod source;
mod admission;
mod collector;
mod pipeline;

pub use crate::config::{IngestOptions, ENV_CONCURRENCY, ENV_STRATEGY};
pub use crate::record::Record;
pub use crate::error::{Failure, FailureKind, PipelineError};
pub use crate::pipeline::{run, JsonIngest, RunOutput};

// Record source capability: implement `RecordSource` to ingest from anywhere.
pub use crate::source::{read_records, FsSource, RecordSource, WorkItem};

// Admission control building blocks.
pub use crate::admission::{CancelHandle, Gate, Permit, Strategy};

// Expose multiprogress and progress helpers.
pub use crate::progress::{make_count_progress, set_global_multiprogress};

pub use crate::paths::discover_json_files;
pub use crate::util::init_tracing_once;

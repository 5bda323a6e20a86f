//! Failure taxonomy: per-file failures travel on the failure stream,
//! `PipelineError` is reserved for conditions that stop the whole run.

use crate::pipeline::RunOutput;
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Classification of a per-file failure.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FailureKind {
    /// The file could not be opened (missing, permission denied, ...).
    Open,
    /// The file's size could not be determined.
    Stat,
    /// The file exists but has zero size.
    EmptyInput,
    /// Content is not a valid record array (including whitespace-only content).
    Decode,
    /// Content decoded to an empty array.
    EmptyResult,
    /// The reader panicked while processing the file.
    Panicked,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            FailureKind::Open => "open",
            FailureKind::Stat => "stat",
            FailureKind::EmptyInput => "empty-input",
            FailureKind::Decode => "decode",
            FailureKind::EmptyResult => "empty-result",
            FailureKind::Panicked => "panicked",
        };
        f.write_str(s)
    }
}

/// A failure local to one input file. Never aborts sibling files or the run.
#[derive(Debug, Error)]
pub enum Failure {
    #[error("failed to open file {}: {source}", .item.display())]
    Open { item: PathBuf, source: io::Error },

    #[error("failed to stat file {}: {source}", .item.display())]
    Stat { item: PathBuf, source: io::Error },

    #[error("file {} is empty", .item.display())]
    EmptyInput { item: PathBuf },

    #[error("failed to decode JSON from file {}: {source}", .item.display())]
    Decode { item: PathBuf, source: serde_json::Error },

    #[error("file {} holds an empty record array", .item.display())]
    EmptyResult { item: PathBuf },

    #[error("reader panicked on file {}: {message}", .item.display())]
    Panicked { item: PathBuf, message: String },
}

impl Failure {
    pub fn kind(&self) -> FailureKind {
        match self {
            Failure::Open { .. } => FailureKind::Open,
            Failure::Stat { .. } => FailureKind::Stat,
            Failure::EmptyInput { .. } => FailureKind::EmptyInput,
            Failure::Decode { .. } => FailureKind::Decode,
            Failure::EmptyResult { .. } => FailureKind::EmptyResult,
            Failure::Panicked { .. } => FailureKind::Panicked,
        }
    }

    /// The input file this failure refers to.
    pub fn item(&self) -> &Path {
        match self {
            Failure::Open { item, .. }
            | Failure::Stat { item, .. }
            | Failure::EmptyInput { item }
            | Failure::Decode { item, .. }
            | Failure::EmptyResult { item }
            | Failure::Panicked { item, .. } => item,
        }
    }
}

/// Run-level errors. Wrapped in `anyhow::Error` by `JsonIngest::run*`; use
/// `downcast::<PipelineError>()` to inspect or recover the partial output.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Admission stopped early. `partial` holds everything drained from the files
    /// that did run.
    #[error("run cancelled; {skipped} file(s) were never processed")]
    Cancelled { skipped: usize, partial: RunOutput },

    #[error("failed to build worker pool")]
    WorkerPool(#[from] rayon::ThreadPoolBuildError),
}

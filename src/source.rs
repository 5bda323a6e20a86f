//! Record sources: the pluggable capability that turns one input file into records,
//! and the classifier that maps every non-success path onto a `Failure`.

use crate::error::Failure;
use crate::record::Record;
use std::fs::File;
use std::io::{self, BufReader};
use std::path::{Path, PathBuf};

/// One unit of input: a file identifier.
pub type WorkItem = PathBuf;

/// Opens, sizes, and decodes one input file.
///
/// Implementations must be `Sync`: a single source is shared by every worker of a run.
/// The handle is dropped (closed) once `read_records` is done with it.
pub trait RecordSource: Sync {
    type Handle;

    fn open(&self, item: &Path) -> io::Result<Self::Handle>;
    fn size(&self, handle: &Self::Handle) -> io::Result<u64>;
    fn decode(&self, handle: Self::Handle) -> serde_json::Result<Vec<Record>>;
}

/// Filesystem-backed source decoding a JSON array of records per file.
#[derive(Clone, Debug)]
pub struct FsSource {
    read_buffer_bytes: usize,
}

impl Default for FsSource {
    fn default() -> Self {
        Self { read_buffer_bytes: 64 * 1024 }
    }
}

impl FsSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_read_buffer(mut self, bytes: usize) -> Self {
        self.read_buffer_bytes = bytes.max(8 * 1024);
        self
    }
}

impl RecordSource for FsSource {
    type Handle = File;

    fn open(&self, item: &Path) -> io::Result<File> {
        File::open(item)
    }

    fn size(&self, handle: &File) -> io::Result<u64> {
        Ok(handle.metadata()?.len())
    }

    fn decode(&self, handle: File) -> serde_json::Result<Vec<Record>> {
        let reader = BufReader::with_capacity(self.read_buffer_bytes, handle);
        serde_json::from_reader(reader)
    }
}

/// Read all records of `item`, classifying failures.
///
/// Exactly one of the following holds on return:
/// - `Ok(records)` with at least one record, in decode order;
/// - `Err(failure)` and no records.
///
/// A zero-size file is `EmptyInput`; a file decoding to `[]` is `EmptyResult`.
pub fn read_records<S: RecordSource>(source: &S, item: &Path) -> Result<Vec<Record>, Failure> {
    let handle = source
        .open(item)
        .map_err(|source| Failure::Open { item: item.to_path_buf(), source })?;

    let size = source
        .size(&handle)
        .map_err(|source| Failure::Stat { item: item.to_path_buf(), source })?;
    if size == 0 {
        return Err(Failure::EmptyInput { item: item.to_path_buf() });
    }

    let records = source
        .decode(handle)
        .map_err(|source| Failure::Decode { item: item.to_path_buf(), source })?;
    if records.is_empty() {
        return Err(Failure::EmptyResult { item: item.to_path_buf() });
    }
    Ok(records)
}

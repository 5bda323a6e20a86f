#![allow(dead_code)]

use jsonpool::{Record, RecordSource};
use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::Duration;

/// Write `records` as a JSON array to `dir/name` and return the path.
pub fn write_records(dir: &Path, name: &str, records: &[Record]) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, serde_json::to_vec(records).unwrap()).unwrap();
    path
}

/// Write raw text to `dir/name` and return the path.
pub fn write_raw(dir: &Path, name: &str, contents: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, contents).unwrap();
    path
}

/// `n` records named `{prefix}-{i}` with `age = i`, `role = 1`.
pub fn numbered(prefix: &str, n: usize) -> Vec<Record> {
    (0..n).map(|i| Record::new(format!("{prefix}-{i}"), i as i64, 1)).collect()
}

pub fn sorted_names(records: &[Record]) -> Vec<String> {
    let mut names: Vec<String> = records.iter().map(|r| r.name.clone()).collect();
    names.sort();
    names
}

/// Live/peak counters of concurrent record-source invocations.
#[derive(Default)]
pub struct Counters {
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    opens: AtomicUsize,
}

/// Held from `open` until the handle is dropped (end of `decode`, or an early failure).
struct InFlight(Arc<Counters>);

impl InFlight {
    fn enter(counters: &Arc<Counters>) -> Self {
        let now = counters.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        counters.max_in_flight.fetch_max(now, Ordering::SeqCst);
        counters.opens.fetch_add(1, Ordering::SeqCst);
        InFlight(Arc::clone(counters))
    }
}

impl Drop for InFlight {
    fn drop(&mut self) {
        self.0.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}

pub struct MemHandle {
    bytes: Vec<u8>,
    _in_flight: InFlight,
}

/// Instrumented in-memory source: files live in a map, every invocation is counted.
#[derive(Default)]
pub struct MemSource {
    files: HashMap<PathBuf, Vec<u8>>,
    counters: Arc<Counters>,
    delay: Duration,
    barrier: Option<Barrier>,
    panic_on: Option<PathBuf>,
    on_decode: Option<Box<dyn Fn() + Send + Sync>>,
}

impl MemSource {
    pub fn new() -> Self {
        Self::default()
    }
    pub fn with_file(mut self, name: &str, contents: impl Into<Vec<u8>>) -> Self {
        self.files.insert(PathBuf::from(name), contents.into());
        self
    }
    pub fn with_records(self, name: &str, records: &[Record]) -> Self {
        let bytes = serde_json::to_vec(records).unwrap();
        self.with_file(name, bytes)
    }
    /// Sleep inside every decode to widen the overlap window.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
    /// Every decode waits until `parties` decodes are in progress at once.
    pub fn with_barrier(mut self, parties: usize) -> Self {
        self.barrier = Some(Barrier::new(parties));
        self
    }
    pub fn panic_on(mut self, name: &str) -> Self {
        self.panic_on = Some(PathBuf::from(name));
        self
    }
    pub fn on_decode(mut self, f: impl Fn() + Send + Sync + 'static) -> Self {
        self.on_decode = Some(Box::new(f));
        self
    }
    pub fn max_in_flight(&self) -> usize {
        self.counters.max_in_flight.load(Ordering::SeqCst)
    }
    pub fn in_flight(&self) -> usize {
        self.counters.in_flight.load(Ordering::SeqCst)
    }
    pub fn opens(&self) -> usize {
        self.counters.opens.load(Ordering::SeqCst)
    }
}

impl RecordSource for MemSource {
    type Handle = MemHandle;

    fn open(&self, item: &Path) -> io::Result<MemHandle> {
        let guard = InFlight::enter(&self.counters);
        if self.panic_on.as_deref() == Some(item) {
            panic!("simulated reader crash on {}", item.display());
        }
        match self.files.get(item) {
            Some(bytes) => Ok(MemHandle { bytes: bytes.clone(), _in_flight: guard }),
            None => Err(io::Error::new(io::ErrorKind::NotFound, "no such file")),
        }
    }

    fn size(&self, handle: &MemHandle) -> io::Result<u64> {
        Ok(handle.bytes.len() as u64)
    }

    fn decode(&self, handle: MemHandle) -> serde_json::Result<Vec<Record>> {
        if let Some(barrier) = &self.barrier {
            barrier.wait();
        }
        if let Some(f) = &self.on_decode {
            f();
        }
        if !self.delay.is_zero() {
            thread::sleep(self.delay);
        }
        serde_json::from_slice(&handle.bytes)
    }
}

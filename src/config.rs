use crate::admission::Strategy;

pub const ENV_CONCURRENCY: &str = "JSONPOOL_CONCURRENCY";
pub const ENV_STRATEGY: &str = "JSONPOOL_STRATEGY";

/// User-facing options with sensible defaults and builder chaining.
#[derive(Clone, Debug)]
pub struct IngestOptions {
    pub concurrency: usize,              // admission bound N (>= 1)
    pub strategy: Strategy,
    pub record_capacity: usize,          // bounded record stream
    pub failure_capacity: Option<usize>, // None = one slot per input file
    pub read_buffer_bytes: usize,        // BufReader capacity per open file
    pub progress: bool,                  // show progress bar
    pub progress_label: Option<String>,
}

impl Default for IngestOptions {
    fn default() -> Self {
        let hw = std::thread::available_parallelism().map(|n| n.get()).unwrap_or(4);
        Self {
            concurrency: hw,
            strategy: Strategy::Pool,
            record_capacity: 64,
            failure_capacity: None,
            read_buffer_bytes: 64 * 1024,
            progress: false,
            progress_label: None,
        }
    }
}

impl IngestOptions {
    /// Defaults overridden by `JSONPOOL_CONCURRENCY` / `JSONPOOL_STRATEGY` when set.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as `from_env`, reading variables through `lookup`.
    /// Unparseable values are ignored with a warning.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut opts = Self::default();
        if let Some(raw) = lookup(ENV_CONCURRENCY) {
            match raw.trim().parse::<usize>() {
                Ok(n) if n > 0 => opts.concurrency = n,
                _ => tracing::warn!("{} must be a positive integer, got '{}'; ignoring", ENV_CONCURRENCY, raw),
            }
        }
        if let Some(raw) = lookup(ENV_STRATEGY) {
            match raw.parse::<Strategy>() {
                Ok(s) => opts.strategy = s,
                Err(e) => tracing::warn!("{}: {}; ignoring", ENV_STRATEGY, e),
            }
        }
        opts
    }

    pub fn with_concurrency(mut self, n: usize) -> Self {
        self.concurrency = n.max(1);
        self
    }
    pub fn with_strategy(mut self, strategy: Strategy) -> Self {
        self.strategy = strategy;
        self
    }
    pub fn with_record_capacity(mut self, n: usize) -> Self {
        self.record_capacity = n.max(1);
        self
    }
    pub fn with_failure_capacity(mut self, n: usize) -> Self {
        self.failure_capacity = Some(n.max(1));
        self
    }
    pub fn with_read_buffer(mut self, bytes: usize) -> Self {
        self.read_buffer_bytes = bytes.max(8 * 1024);
        self
    }
    pub fn with_progress(mut self, yes: bool) -> Self {
        self.progress = yes;
        self
    }
    pub fn with_progress_label(mut self, label: impl Into<String>) -> Self {
        self.progress_label = Some(label.into());
        self
    }
}

//! Counters recorded by read paths.
//!
//! [`Statistics`] is the filesystem-wide sink a caller may pass in when
//! opening a file; it is optional. [`StatisticsContext`] is the
//! instrumentation factory every open receives, producing a fresh
//! [`InputStreamStatistics`] per stream.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Filesystem-wide read counters.
pub trait Statistics: fmt::Debug + Send + Sync {
    /// Adds `bytes` to the bytes-read counter.
    fn increment_bytes_read(&self, bytes: u64);

    /// Adds `count` to the read-operations counter.
    fn increment_read_ops(&self, count: u64);

    /// Total bytes read.
    fn bytes_read(&self) -> u64;

    /// Total read operations.
    fn read_ops(&self) -> u64;
}

/// A [`Statistics`] sink that records nothing.
///
/// Used wherever no filesystem statistics were supplied.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopStatistics;

impl Statistics for NoopStatistics {
    fn increment_bytes_read(&self, _bytes: u64) {}

    fn increment_read_ops(&self, _count: u64) {}

    fn bytes_read(&self) -> u64 {
        0
    }

    fn read_ops(&self) -> u64 {
        0
    }
}

/// Shared no-op instance.
pub(crate) static NOOP_STATISTICS: NoopStatistics = NoopStatistics;

/// Atomic filesystem counters.
#[derive(Debug, Default)]
pub struct FileSystemStatistics {
    bytes_read: AtomicU64,
    read_ops: AtomicU64,
}

impl FileSystemStatistics {
    /// Creates zeroed counters.
    pub fn new() -> Self {
        Self::default()
    }
}

impl Statistics for FileSystemStatistics {
    fn increment_bytes_read(&self, bytes: u64) {
        self.bytes_read.fetch_add(bytes, Ordering::Relaxed);
    }

    fn increment_read_ops(&self, count: u64) {
        self.read_ops.fetch_add(count, Ordering::Relaxed);
    }

    fn bytes_read(&self) -> u64 {
        self.bytes_read.load(Ordering::Relaxed)
    }

    fn read_ops(&self) -> u64 {
        self.read_ops.load(Ordering::Relaxed)
    }
}

/// Per-stream counters.
///
/// Bytes and read operations are forwarded to the filesystem statistics,
/// when there are any, as they are recorded.
#[derive(Debug, Default)]
pub struct InputStreamStatistics {
    filesystem: Option<Arc<dyn Statistics>>,
    bytes_read: AtomicU64,
    read_operations: AtomicU64,
    forward_seeks: AtomicU64,
    backward_seeks: AtomicU64,
    vectored_operations: AtomicU64,
    vectored_incoming_ranges: AtomicU64,
    vectored_combined_ranges: AtomicU64,
    version_mismatches: AtomicU64,
}

impl InputStreamStatistics {
    /// Creates stream counters forwarding to `filesystem`.
    pub fn new(filesystem: Option<Arc<dyn Statistics>>) -> Self {
        Self {
            filesystem,
            ..Default::default()
        }
    }

    /// Records a completed read of `bytes`.
    pub fn record_bytes_read(&self, bytes: u64) {
        self.bytes_read.fetch_add(bytes, Ordering::Relaxed);
        self.read_operations.fetch_add(1, Ordering::Relaxed);
        if let Some(fs) = &self.filesystem {
            fs.increment_bytes_read(bytes);
            fs.increment_read_ops(1);
        }
    }

    /// Records a seek from `from` to `to`.
    pub fn record_seek(&self, from: u64, to: u64) {
        if to >= from {
            self.forward_seeks.fetch_add(1, Ordering::Relaxed);
        } else {
            self.backward_seeks.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Records a vectored read of `incoming` ranges issued as `combined`
    /// requests.
    pub fn record_vectored_read(&self, incoming: u64, combined: u64) {
        self.vectored_operations.fetch_add(1, Ordering::Relaxed);
        self.vectored_incoming_ranges.fetch_add(incoming, Ordering::Relaxed);
        self.vectored_combined_ranges.fetch_add(combined, Ordering::Relaxed);
    }

    /// Records a revision mismatch reported by change detection.
    pub fn record_version_mismatch(&self) {
        self.version_mismatches.fetch_add(1, Ordering::Relaxed);
    }

    /// Takes a point-in-time copy of the counters.
    pub fn snapshot(&self) -> StreamCounters {
        StreamCounters {
            bytes_read: self.bytes_read.load(Ordering::Relaxed),
            read_operations: self.read_operations.load(Ordering::Relaxed),
            forward_seeks: self.forward_seeks.load(Ordering::Relaxed),
            backward_seeks: self.backward_seeks.load(Ordering::Relaxed),
            vectored_operations: self.vectored_operations.load(Ordering::Relaxed),
            vectored_incoming_ranges: self.vectored_incoming_ranges.load(Ordering::Relaxed),
            vectored_combined_ranges: self.vectored_combined_ranges.load(Ordering::Relaxed),
            version_mismatches: self.version_mismatches.load(Ordering::Relaxed),
        }
    }
}

/// Copy of [`InputStreamStatistics`] counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StreamCounters {
    pub bytes_read: u64,
    pub read_operations: u64,
    pub forward_seeks: u64,
    pub backward_seeks: u64,
    pub vectored_operations: u64,
    pub vectored_incoming_ranges: u64,
    pub vectored_combined_ranges: u64,
    pub version_mismatches: u64,
}

/// Factory for per-stream statistics.
pub trait StatisticsContext: fmt::Debug + Send + Sync {
    /// Creates counters for a newly opened stream.
    fn new_input_stream_statistics(
        &self,
        filesystem: Option<Arc<dyn Statistics>>,
    ) -> Arc<InputStreamStatistics>;
}

/// Statistics context that counts the streams it has instrumented.
#[derive(Debug, Default)]
pub struct DefaultStatisticsContext {
    streams_opened: AtomicU64,
}

impl DefaultStatisticsContext {
    /// Creates a context with no streams recorded.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of streams instrumented so far.
    pub fn streams_opened(&self) -> u64 {
        self.streams_opened.load(Ordering::Relaxed)
    }
}

impl StatisticsContext for DefaultStatisticsContext {
    fn new_input_stream_statistics(
        &self,
        filesystem: Option<Arc<dyn Statistics>>,
    ) -> Arc<InputStreamStatistics> {
        self.streams_opened.fetch_add(1, Ordering::Relaxed);
        Arc::new(InputStreamStatistics::new(filesystem))
    }
}

//! Tunables for vectored (batched, range-coalesced) reads.

use std::fmt;

use derive_builder::Builder;

use crate::error::Error;

/// Default minimum gap below which two ranges are merged: 4 KiB.
pub const DEFAULT_MIN_SEEK_FOR_VECTOR_READS: u64 = 4 * 1024;

/// Default upper bound on a merged range: 1 MiB.
pub const DEFAULT_MAX_READ_SIZE_FOR_VECTOR_READS: u64 = 1024 * 1024;

/// Default number of merged ranges fetched in parallel.
pub const DEFAULT_VECTORED_ACTIVE_RANGE_READS: usize = 4;

/// Configuration consumed by the range-merge algorithm of a vectored read.
///
/// Two requested ranges separated by less than
/// [`min_seek_for_vector_reads`](Self::min_seek_for_vector_reads) bytes are
/// fetched with one GET, as long as the merged range does not exceed
/// [`max_read_size_for_vector_reads`](Self::max_read_size_for_vector_reads).
/// At most [`vectored_active_range_reads`](Self::vectored_active_range_reads)
/// merged GETs are in flight at once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Builder)]
#[builder(
    name = "VectoredIoContextBuilder",
    pattern = "owned",
    setter(into, prefix = "with"),
    build_fn(validate = "Self::validate_context")
)]
pub struct VectoredIoContext {
    #[builder(default = "DEFAULT_MIN_SEEK_FOR_VECTOR_READS")]
    min_seek_for_vector_reads: u64,
    #[builder(default = "DEFAULT_MAX_READ_SIZE_FOR_VECTOR_READS")]
    max_read_size_for_vector_reads: u64,
    #[builder(default = "DEFAULT_VECTORED_ACTIVE_RANGE_READS")]
    vectored_active_range_reads: usize,
}

impl VectoredIoContext {
    /// Create a new configuration builder.
    pub fn builder() -> VectoredIoContextBuilder {
        VectoredIoContextBuilder::default()
    }

    /// Minimum gap, in bytes, at which ranges are fetched separately.
    pub fn min_seek_for_vector_reads(&self) -> u64 {
        self.min_seek_for_vector_reads
    }

    /// Maximum size, in bytes, of a merged range.
    pub fn max_read_size_for_vector_reads(&self) -> u64 {
        self.max_read_size_for_vector_reads
    }

    /// Maximum number of merged ranges read concurrently.
    pub fn vectored_active_range_reads(&self) -> usize {
        self.vectored_active_range_reads
    }
}

impl Default for VectoredIoContext {
    fn default() -> Self {
        Self {
            min_seek_for_vector_reads: DEFAULT_MIN_SEEK_FOR_VECTOR_READS,
            max_read_size_for_vector_reads: DEFAULT_MAX_READ_SIZE_FOR_VECTOR_READS,
            vectored_active_range_reads: DEFAULT_VECTORED_ACTIVE_RANGE_READS,
        }
    }
}

impl VectoredIoContextBuilder {
    fn validate_context(&self) -> std::result::Result<(), String> {
        if let Some(active) = &self.vectored_active_range_reads
            && *active == 0
        {
            return Err("vectored active range reads must be greater than 0".to_string());
        }

        Ok(())
    }
}

impl From<VectoredIoContextBuilderError> for Error {
    fn from(err: VectoredIoContextBuilderError) -> Self {
        match err {
            VectoredIoContextBuilderError::UninitializedField(field) => Error::missing(field),
            VectoredIoContextBuilderError::ValidationError(msg) => Error::invalid_argument(msg),
        }
    }
}

impl fmt::Display for VectoredIoContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "VectoredIoContext{{min_seek={}, max_read_size={}, active_range_reads={}}}",
            self.min_seek_for_vector_reads,
            self.max_read_size_for_vector_reads,
            self.vectored_active_range_reads
        )
    }
}

//! Serializable read options.
//!
//! [`ReadOptions`] collects the plain-value settings of a read path so they
//! can be deserialized from a store configuration and applied to a
//! [`ReadOpContextBuilder`](crate::ReadOpContextBuilder).

use std::sync::Arc;

#[cfg(feature = "schema")]
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::policy::{
    ChangeDetectionPolicy, ChangeMode, ChangeSource, InputPolicy, RevisionChangeDetection,
};
use crate::vectored::{
    DEFAULT_MAX_READ_SIZE_FOR_VECTOR_READS, DEFAULT_MIN_SEEK_FOR_VECTOR_READS,
    DEFAULT_VECTORED_ACTIVE_RANGE_READS, VectoredIoContext,
};

/// Default readahead range: 64 KiB.
pub const DEFAULT_READAHEAD_RANGE: u64 = 64 * 1024;

/// Read settings shared by the streams of one store.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[cfg_attr(feature = "schema", derive(JsonSchema))]
#[serde(rename_all = "camelCase")]
pub struct ReadOptions {
    /// Bytes prefetched beyond a requested range on sequential reads.
    #[serde(default = "default_readahead")]
    pub readahead: u64,
    /// Initial access-pattern hint.
    #[serde(default)]
    pub input_policy: InputPolicy,
    /// Revision tracking for objects changing mid-read.
    #[serde(default)]
    pub change_detection: ChangeDetectionOptions,
    /// Range coalescing for vectored reads.
    #[serde(default)]
    pub vectored: VectoredOptions,
}

fn default_readahead() -> u64 {
    DEFAULT_READAHEAD_RANGE
}

impl Default for ReadOptions {
    fn default() -> Self {
        Self {
            readahead: DEFAULT_READAHEAD_RANGE,
            input_policy: InputPolicy::default(),
            change_detection: ChangeDetectionOptions::default(),
            vectored: VectoredOptions::default(),
        }
    }
}

impl ReadOptions {
    /// Builds the change-detection policy these options describe.
    pub fn change_detection_policy(&self) -> Arc<dyn ChangeDetectionPolicy> {
        let options = &self.change_detection;
        Arc::new(
            RevisionChangeDetection::new(options.source, options.mode)
                .with_require_version(options.require_version),
        )
    }

    /// Builds and validates the vectored IO context these options describe.
    pub fn vectored_io_context(&self) -> Result<VectoredIoContext> {
        let options = &self.vectored;
        let context = VectoredIoContext::builder()
            .with_min_seek_for_vector_reads(options.min_seek)
            .with_max_read_size_for_vector_reads(options.max_merged_size)
            .with_vectored_active_range_reads(options.active_range_reads)
            .build()?;
        Ok(context)
    }
}

/// Change-detection settings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[cfg_attr(feature = "schema", derive(JsonSchema))]
#[serde(rename_all = "camelCase")]
pub struct ChangeDetectionOptions {
    /// Revision identifier to compare.
    #[serde(default)]
    pub source: ChangeSource,
    /// Where mismatches are enforced.
    #[serde(default)]
    pub mode: ChangeMode,
    /// Fail reads of objects without a revision identifier.
    #[serde(default)]
    pub require_version: bool,
}

/// Vectored read settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[cfg_attr(feature = "schema", derive(JsonSchema))]
#[serde(rename_all = "camelCase")]
pub struct VectoredOptions {
    /// Ranges closer than this many bytes are merged.
    #[serde(default = "default_min_seek")]
    pub min_seek: u64,
    /// Upper bound on a merged range in bytes.
    #[serde(default = "default_max_merged_size")]
    pub max_merged_size: u64,
    /// Merged ranges fetched in parallel.
    #[serde(default = "default_active_range_reads")]
    pub active_range_reads: usize,
}

fn default_min_seek() -> u64 {
    DEFAULT_MIN_SEEK_FOR_VECTOR_READS
}

fn default_max_merged_size() -> u64 {
    DEFAULT_MAX_READ_SIZE_FOR_VECTOR_READS
}

fn default_active_range_reads() -> usize {
    DEFAULT_VECTORED_ACTIVE_RANGE_READS
}

impl Default for VectoredOptions {
    fn default() -> Self {
        Self {
            min_seek: DEFAULT_MIN_SEEK_FOR_VECTOR_READS,
            max_merged_size: DEFAULT_MAX_READ_SIZE_FOR_VECTOR_READS,
            active_range_reads: DEFAULT_VECTORED_ACTIVE_RANGE_READS,
        }
    }
}

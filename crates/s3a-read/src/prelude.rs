//! Convenience re-exports.

pub use crate::audit::{AuditSpan, OperationSpan};
pub use crate::config::ReadOptions;
pub use crate::context::{OpContext, ReadOpContext, ReadOpContextBuilder};
pub use crate::error::{Error, ErrorKind, Result};
pub use crate::invoker::{Invoker, MaxRetries, NoRetries};
pub use crate::policy::{
    ChangeDecision, ChangeDetectionPolicy, ChangeMode, ChangeSource, InputPolicy,
    RevisionChangeDetection,
};
pub use crate::statistics::{
    DefaultStatisticsContext, FileSystemStatistics, Statistics, StatisticsContext,
};
pub use crate::status::FileStatus;
pub use crate::vectored::VectoredIoContext;

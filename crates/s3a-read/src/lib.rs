#![forbid(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![doc = include_str!("../README.md")]

/// Tracing target for context construction.
pub const TRACING_TARGET_CONTEXT: &str = "s3a_read::context";

/// Tracing target for retried store calls.
pub const TRACING_TARGET_INVOKER: &str = "s3a_read::invoker";

/// Tracing target for change detection.
pub const TRACING_TARGET_CHANGE: &str = "s3a_read::change";

mod error;

/// Audit spans and per-thread activation.
pub mod audit;
pub mod config;
/// Operation contexts.
pub mod context;
pub mod invoker;
/// Input and change-detection policies.
pub mod policy;
pub mod statistics;
mod status;
pub mod vectored;

pub use audit::{AuditSpan, OperationSpan};
pub use config::ReadOptions;
pub use context::{OpContext, ReadOpContext, ReadOpContextBuilder};
pub use error::{BoxedError, Error, ErrorKind, Result};
pub use invoker::Invoker;
pub use policy::{ChangeDecision, ChangeDetectionPolicy, InputPolicy};
pub use statistics::{Statistics, StatisticsContext};
pub use status::FileStatus;
pub use vectored::VectoredIoContext;

#[doc(hidden)]
pub mod prelude;

//! Collaborators shared by every store operation.

use std::fmt;
use std::sync::Arc;

use crate::invoker::Invoker;
use crate::statistics::{NOOP_STATISTICS, Statistics, StatisticsContext};
use crate::status::FileStatus;

/// State common to all operations against one object.
///
/// Embedded by value in operation-specific contexts such as
/// [`ReadOpContext`](super::ReadOpContext). Clones share the collaborators.
#[derive(Clone)]
pub struct OpContext {
    invoker: Arc<Invoker>,
    statistics: Option<Arc<dyn Statistics>>,
    instrumentation: Arc<dyn StatisticsContext>,
    target_status: FileStatus,
}

impl OpContext {
    /// Creates an operation context.
    pub fn new(
        invoker: Arc<Invoker>,
        statistics: Option<Arc<dyn Statistics>>,
        instrumentation: Arc<dyn StatisticsContext>,
        target_status: FileStatus,
    ) -> Self {
        Self {
            invoker,
            statistics,
            instrumentation,
            target_status,
        }
    }

    /// Invoker for remote calls.
    pub fn invoker(&self) -> &Arc<Invoker> {
        &self.invoker
    }

    /// Filesystem statistics, if the caller supplied any.
    pub fn statistics(&self) -> Option<&Arc<dyn Statistics>> {
        self.statistics.as_ref()
    }

    /// Filesystem statistics, or a sink that records nothing.
    pub fn statistics_or_noop(&self) -> &dyn Statistics {
        match &self.statistics {
            Some(statistics) => statistics.as_ref(),
            None => &NOOP_STATISTICS,
        }
    }

    /// Factory for per-stream statistics.
    pub fn instrumentation(&self) -> &Arc<dyn StatisticsContext> {
        &self.instrumentation
    }

    /// Status of the object when the operation started.
    pub fn target_status(&self) -> &FileStatus {
        &self.target_status
    }
}

impl fmt::Debug for OpContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpContext")
            .field("statistics", &self.statistics.is_some())
            .field("target_status", &self.target_status)
            .finish_non_exhaustive()
    }
}

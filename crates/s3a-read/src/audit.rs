//! Audit spans correlating store calls with the operation that issued them.
//!
//! A span is captured when a file is opened and reused for every read on
//! the resulting stream. Async store calls run inside [`scope`], which
//! binds the span to the task for as long as the call's future is polled.
//! Synchronous code may use [`activate`] instead; the returned
//! [`ActiveAuditSpan`] guard restores the previously active span when
//! dropped and must not be held across an `.await`.

use std::cell::RefCell;
use std::fmt;
use std::future::Future;
use std::marker::PhantomData;
use std::rc::Rc;
use std::sync::Arc;

use tracing::Instrument;
use uuid::Uuid;

/// Correlation handle for one logical store operation.
pub trait AuditSpan: fmt::Debug + Send + Sync {
    /// Unique identifier attached to every correlated call.
    fn span_id(&self) -> &str;

    /// Name of the operation that created the span, e.g. `open`.
    fn operation_name(&self) -> &str;

    /// The tracing span entered while this audit span is active.
    fn tracing_span(&self) -> &tracing::Span;
}

/// An [`AuditSpan`] backed by a [`tracing::Span`].
#[derive(Debug, Clone)]
pub struct OperationSpan {
    span_id: String,
    operation: String,
    path: String,
    span: tracing::Span,
}

impl OperationSpan {
    /// Creates a span for `operation` on `path` with a fresh identifier.
    pub fn new(operation: impl Into<String>, path: impl Into<String>) -> Self {
        let span_id = Uuid::now_v7().to_string();
        let operation = operation.into();
        let path = path.into();
        let span = tracing::info_span!(
            "audit",
            span_id = %span_id,
            operation = %operation,
            path = %path,
        );
        Self {
            span_id,
            operation,
            path,
            span,
        }
    }

    /// Path the operation was issued against.
    pub fn path(&self) -> &str {
        &self.path
    }
}

impl AuditSpan for OperationSpan {
    fn span_id(&self) -> &str {
        &self.span_id
    }

    fn operation_name(&self) -> &str {
        &self.operation
    }

    fn tracing_span(&self) -> &tracing::Span {
        &self.span
    }
}

thread_local! {
    static ACTIVE: RefCell<Option<Arc<dyn AuditSpan>>> = const { RefCell::new(None) };
}

tokio::task_local! {
    static SCOPED: Arc<dyn AuditSpan>;
}

/// Runs `future` with `span` active, inside the span's tracing span.
///
/// The binding follows the future across `.await` points and thread
/// migrations, so concurrent calls on one thread each see their own span.
pub async fn scope<F>(span: Arc<dyn AuditSpan>, future: F) -> F::Output
where
    F: Future,
{
    let tracing_span = span.tracing_span().clone();
    SCOPED.scope(span, future.instrument(tracing_span)).await
}

/// Makes `span` the active audit span of the current thread.
///
/// For synchronous code only; use [`scope`] around async store calls.
pub fn activate(span: &Arc<dyn AuditSpan>) -> ActiveAuditSpan {
    let previous = ACTIVE.with(|active| active.borrow_mut().replace(span.clone()));
    let entered = span.tracing_span().clone().entered();
    ActiveAuditSpan {
        previous,
        _entered: entered,
        _not_send: PhantomData,
    }
}

/// The active audit span, if any.
///
/// A span activated with [`activate`] takes precedence over one bound by
/// an enclosing [`scope`].
pub fn current() -> Option<Arc<dyn AuditSpan>> {
    ACTIVE
        .with(|active| active.borrow().clone())
        .or_else(|| SCOPED.try_with(Arc::clone).ok())
}

/// Guard returned by [`activate`].
///
/// Restores the previously active span on drop. Guards are bound to the
/// thread that created them and must be dropped in reverse order.
#[must_use = "the audit span is deactivated when the guard is dropped"]
pub struct ActiveAuditSpan {
    previous: Option<Arc<dyn AuditSpan>>,
    _entered: tracing::span::EnteredSpan,
    _not_send: PhantomData<Rc<()>>,
}

impl Drop for ActiveAuditSpan {
    fn drop(&mut self) {
        let previous = self.previous.take();
        ACTIVE.with(|active| *active.borrow_mut() = previous);
    }
}

impl fmt::Debug for ActiveAuditSpan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActiveAuditSpan").finish_non_exhaustive()
    }
}

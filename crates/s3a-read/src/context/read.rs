//! Read-specific operation context.

use std::fmt;
use std::sync::Arc;

use derive_builder::Builder;
use object_store::path::Path;

use super::OpContext;
use crate::TRACING_TARGET_CONTEXT;
use crate::audit::AuditSpan;
use crate::config::ReadOptions;
use crate::error::{Error, Result};
use crate::invoker::Invoker;
use crate::policy::{ChangeDetectionPolicy, InputPolicy};
use crate::statistics::{InputStreamStatistics, Statistics, StatisticsContext};
use crate::status::FileStatus;
use crate::vectored::VectoredIoContext;

/// Everything an input stream needs to read one object.
///
/// Built once when a file is opened for reading and held by the stream
/// until it is closed. The context is immutable: every accessor returns the
/// value it was built with. Collaborators are shared handles owned by the
/// store session and the open call.
#[derive(Clone)]
pub struct ReadOpContext {
    op: OpContext,
    path: Path,
    input_policy: InputPolicy,
    change_detection_policy: Arc<dyn ChangeDetectionPolicy>,
    readahead: u64,
    audit_span: Arc<dyn AuditSpan>,
    vectored_io_context: VectoredIoContext,
}

impl ReadOpContext {
    /// Creates a read context.
    ///
    /// Fails with [`ErrorKind::InvalidArgument`](crate::ErrorKind) if
    /// `readahead` is negative. `statistics` may be `None`.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        path: Path,
        invoker: Arc<Invoker>,
        statistics: Option<Arc<dyn Statistics>>,
        instrumentation: Arc<dyn StatisticsContext>,
        target_status: FileStatus,
        input_policy: InputPolicy,
        change_detection_policy: Arc<dyn ChangeDetectionPolicy>,
        readahead: i64,
        audit_span: Arc<dyn AuditSpan>,
        vectored_io_context: VectoredIoContext,
    ) -> Result<Self> {
        let readahead = u64::try_from(readahead)
            .map_err(|_| Error::invalid_argument(format!("invalid readahead {readahead}")))?;

        tracing::debug!(
            target: TRACING_TARGET_CONTEXT,
            path = %path,
            input_policy = %input_policy,
            readahead,
            change_detection = %change_detection_policy,
            "created read operation context"
        );

        Ok(Self {
            op: OpContext::new(invoker, statistics, instrumentation, target_status),
            path,
            input_policy,
            change_detection_policy,
            readahead,
            audit_span,
            vectored_io_context,
        })
    }

    /// Create a new context builder.
    pub fn builder() -> ReadOpContextBuilder {
        ReadOpContextBuilder::default()
    }

    /// Path of the object being read.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Invoker for remote calls.
    pub fn invoker(&self) -> &Arc<Invoker> {
        self.op.invoker()
    }

    /// Invoker to use on read code paths.
    pub fn read_invoker(&self) -> &Arc<Invoker> {
        self.op.invoker()
    }

    /// Filesystem statistics, if the caller supplied any.
    pub fn statistics(&self) -> Option<&Arc<dyn Statistics>> {
        self.op.statistics()
    }

    /// Filesystem statistics, or a sink that records nothing.
    pub fn statistics_or_noop(&self) -> &dyn Statistics {
        self.op.statistics_or_noop()
    }

    /// Factory for per-stream statistics.
    pub fn instrumentation(&self) -> &Arc<dyn StatisticsContext> {
        self.op.instrumentation()
    }

    /// Status captured at open time; the baseline for change detection.
    pub fn target_status(&self) -> &FileStatus {
        self.op.target_status()
    }

    /// Initial input policy of the stream.
    pub fn input_policy(&self) -> InputPolicy {
        self.input_policy
    }

    /// How to detect and react to the object changing during the read.
    pub fn change_detection_policy(&self) -> &Arc<dyn ChangeDetectionPolicy> {
        &self.change_detection_policy
    }

    /// Bytes a sequential GET may fetch beyond the requested range.
    pub fn readahead(&self) -> u64 {
        self.readahead
    }

    /// The audit span active when the file was opened.
    pub fn audit_span(&self) -> &Arc<dyn AuditSpan> {
        &self.audit_span
    }

    /// Tunables for vectored reads.
    pub fn vectored_io_context(&self) -> &VectoredIoContext {
        &self.vectored_io_context
    }

    /// The shared operation context this read context embeds.
    pub fn op_context(&self) -> &OpContext {
        &self.op
    }

    /// Creates counters for a stream using this context.
    pub fn new_input_stream_statistics(&self) -> Arc<InputStreamStatistics> {
        self.instrumentation()
            .new_input_stream_statistics(self.statistics().cloned())
    }
}

impl fmt::Display for ReadOpContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ReadOpContext{{path={}, input_policy={}, readahead={}, change_detection_policy={}}}",
            self.path, self.input_policy, self.readahead, self.change_detection_policy
        )
    }
}

impl fmt::Debug for ReadOpContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReadOpContext")
            .field("path", &self.path)
            .field("input_policy", &self.input_policy)
            .field("readahead", &self.readahead)
            .field("change_detection_policy", &self.change_detection_policy)
            .field("vectored_io_context", &self.vectored_io_context)
            .field("op", &self.op)
            .finish_non_exhaustive()
    }
}

/// Arguments collected by [`ReadOpContextBuilder`].
///
/// Every field starts unset; [`ReadOpContextBuilder::build`] reports the
/// first required field, in declaration order, that is still unset.
#[derive(Builder)]
#[builder(
    name = "ReadOpContextBuilder",
    vis = "pub",
    pattern = "owned",
    setter(prefix = "with"),
    build_fn(private, name = "build_inner", error = "Error"),
    derive(Debug)
)]
struct ReadOpArgs {
    /// Set the path of the object being read.
    #[builder(setter(into))]
    path: Path,
    /// Set the invoker for remote calls.
    invoker: Arc<Invoker>,
    /// Set the filesystem statistics.
    #[builder(setter(strip_option), default)]
    statistics: Option<Arc<dyn Statistics>>,
    /// Set the statistics factory.
    instrumentation: Arc<dyn StatisticsContext>,
    /// Set the status observed at open time.
    #[builder(setter(into))]
    target_status: FileStatus,
    /// Set the initial input policy.
    input_policy: InputPolicy,
    /// Set the change-detection policy.
    change_detection_policy: Arc<dyn ChangeDetectionPolicy>,
    /// Set the readahead in bytes; unset means no prefetch.
    #[builder(default)]
    readahead: i64,
    /// Set the audit span active at open time.
    audit_span: Arc<dyn AuditSpan>,
    /// Set the vectored IO tunables.
    vectored_io_context: VectoredIoContext,
}

impl ReadOpContextBuilder {
    /// Apply readahead, input policy, change detection and vectored
    /// settings from `options`.
    pub fn with_options(self, options: &ReadOptions) -> Result<Self> {
        let readahead = i64::try_from(options.readahead).map_err(|_| {
            Error::invalid_argument(format!("invalid readahead {}", options.readahead))
        })?;

        Ok(self
            .with_readahead(readahead)
            .with_input_policy(options.input_policy)
            .with_change_detection_policy(options.change_detection_policy())
            .with_vectored_io_context(options.vectored_io_context()?))
    }

    /// Validates the fields and builds the context.
    pub fn build(self) -> Result<ReadOpContext> {
        let args = self.build_inner()?;
        ReadOpContext::new(
            args.path,
            args.invoker,
            args.statistics,
            args.instrumentation,
            args.target_status,
            args.input_policy,
            args.change_detection_policy,
            args.readahead,
            args.audit_span,
            args.vectored_io_context,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorKind;
    use crate::audit::OperationSpan;
    use crate::invoker::MaxRetries;
    use crate::policy::{ChangeMode, ChangeSource, RevisionChangeDetection};
    use crate::statistics::{DefaultStatisticsContext, FileSystemStatistics};
    use crate::status::tests::status;

    const KEY: &str = "warehouse/sales/part-00017.orc";

    struct Parts {
        invoker: Arc<Invoker>,
        statistics: Arc<FileSystemStatistics>,
        instrumentation: Arc<DefaultStatisticsContext>,
        policy: Arc<dyn ChangeDetectionPolicy>,
        span: Arc<OperationSpan>,
        vectored: VectoredIoContext,
    }

    impl Parts {
        fn new() -> Self {
            Self {
                invoker: Arc::new(Invoker::new(MaxRetries::new(5))),
                statistics: Arc::new(FileSystemStatistics::new()),
                instrumentation: Arc::new(DefaultStatisticsContext::new()),
                policy: Arc::new(RevisionChangeDetection::new(
                    ChangeSource::ETag,
                    ChangeMode::Client,
                )),
                span: Arc::new(OperationSpan::new("open", KEY)),
                vectored: VectoredIoContext::builder()
                    .with_min_seek_for_vector_reads(8192u64)
                    .build()
                    .unwrap(),
            }
        }

        fn builder(&self) -> ReadOpContextBuilder {
            ReadOpContext::builder()
                .with_path(KEY)
                .with_invoker(self.invoker.clone())
                .with_statistics(self.statistics.clone())
                .with_instrumentation(self.instrumentation.clone())
                .with_target_status(status(KEY, 4096, Some("\"etag-1\""), None))
                .with_input_policy(InputPolicy::Sequential)
                .with_change_detection_policy(self.policy.clone())
                .with_readahead(65536)
                .with_audit_span(self.span.clone())
                .with_vectored_io_context(self.vectored)
        }

        fn context(&self, readahead: i64) -> Result<ReadOpContext> {
            ReadOpContext::new(
                Path::from(KEY),
                self.invoker.clone(),
                Some(self.statistics.clone()),
                self.instrumentation.clone(),
                status(KEY, 4096, Some("\"etag-1\""), None),
                InputPolicy::Random,
                self.policy.clone(),
                readahead,
                self.span.clone(),
                self.vectored,
            )
        }
    }

    #[test]
    fn accessors_return_supplied_values() {
        let parts = Parts::new();
        let context = parts.builder().build().unwrap();

        assert_eq!(context.path().as_ref(), KEY);
        assert!(Arc::ptr_eq(context.invoker(), &parts.invoker));
        assert!(Arc::ptr_eq(context.read_invoker(), &parts.invoker));
        assert_eq!(context.target_status(), &status(KEY, 4096, Some("\"etag-1\""), None));
        assert_eq!(context.input_policy(), InputPolicy::Sequential);
        assert!(Arc::ptr_eq(context.change_detection_policy(), &parts.policy));
        assert_eq!(context.readahead(), 65536);
        assert_eq!(context.audit_span().span_id(), parts.span.span_id());
        assert_eq!(context.vectored_io_context(), &parts.vectored);
        assert_eq!(context.vectored_io_context().min_seek_for_vector_reads(), 8192);

        let statistics: Arc<dyn Statistics> = parts.statistics.clone();
        assert!(Arc::ptr_eq(context.statistics().unwrap(), &statistics));
        let instrumentation: Arc<dyn StatisticsContext> = parts.instrumentation.clone();
        assert!(Arc::ptr_eq(context.instrumentation(), &instrumentation));
    }

    #[test]
    fn constructor_matches_builder() {
        let parts = Parts::new();
        let context = parts.context(0).unwrap();

        assert_eq!(context.path().as_ref(), KEY);
        assert_eq!(context.input_policy(), InputPolicy::Random);
        assert_eq!(context.readahead(), 0);
        assert!(context.statistics().is_some());
        assert_eq!(context.op_context().target_status().len(), 4096);
    }

    #[test]
    fn missing_required_fields_are_named() {
        type Clear = fn(ReadOpContextBuilder) -> ReadOpContextBuilder;
        let cases: [(&str, Clear); 8] = [
            ("path", |b| ReadOpContextBuilder { path: None, ..b }),
            ("invoker", |b| ReadOpContextBuilder { invoker: None, ..b }),
            ("instrumentation", |b| ReadOpContextBuilder {
                instrumentation: None,
                ..b
            }),
            ("target_status", |b| ReadOpContextBuilder {
                target_status: None,
                ..b
            }),
            ("input_policy", |b| ReadOpContextBuilder {
                input_policy: None,
                ..b
            }),
            ("change_detection_policy", |b| ReadOpContextBuilder {
                change_detection_policy: None,
                ..b
            }),
            ("audit_span", |b| ReadOpContextBuilder {
                audit_span: None,
                ..b
            }),
            ("vectored_io_context", |b| ReadOpContextBuilder {
                vectored_io_context: None,
                ..b
            }),
        ];

        let parts = Parts::new();
        for (field, clear) in cases {
            let err = clear(parts.builder()).build().unwrap_err();
            assert_eq!(err.kind(), ErrorKind::InvalidArgument, "{field}");
            assert_eq!(err.message(), format!("{field} must not be null"));
        }
    }

    #[test]
    fn empty_builder_reports_path_first() {
        let err = ReadOpContext::builder().build().unwrap_err();
        assert_eq!(err.message(), "path must not be null");
    }

    #[test]
    fn negative_readahead_is_rejected() {
        let parts = Parts::new();

        let err = parts.context(-1).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
        assert_eq!(err.message(), "invalid readahead -1");

        let err = parts.builder().with_readahead(-4096).build().unwrap_err();
        assert!(err.message().contains("-4096"));
    }

    #[test]
    fn zero_and_large_readahead_are_accepted() {
        let parts = Parts::new();
        assert_eq!(parts.context(0).unwrap().readahead(), 0);
        assert_eq!(parts.context(1 << 30).unwrap().readahead(), 1 << 30);
        assert_eq!(
            parts.builder().with_readahead(i64::MAX).build().unwrap().readahead(),
            i64::MAX as u64
        );
    }

    #[test]
    fn unset_readahead_means_no_prefetch() {
        let parts = Parts::new();
        let context = ReadOpContextBuilder {
            readahead: None,
            ..parts.builder()
        }
        .build()
        .unwrap();
        assert_eq!(context.readahead(), 0);
    }

    #[test]
    fn statistics_are_optional() {
        let parts = Parts::new();
        let context = ReadOpContextBuilder {
            statistics: None,
            ..parts.builder()
        }
        .build()
        .unwrap();

        assert!(context.statistics().is_none());
        context.statistics_or_noop().increment_bytes_read(10);
        assert_eq!(context.statistics_or_noop().bytes_read(), 0);

        let stream = context.new_input_stream_statistics();
        stream.record_bytes_read(10);
        assert_eq!(stream.snapshot().bytes_read, 10);
    }

    #[test]
    fn stream_statistics_reach_filesystem_statistics() {
        let parts = Parts::new();
        let context = parts.builder().build().unwrap();

        let stream = context.new_input_stream_statistics();
        stream.record_bytes_read(512);

        assert_eq!(parts.statistics.bytes_read(), 512);
        assert_eq!(context.statistics_or_noop().read_ops(), 1);
        assert_eq!(parts.instrumentation.streams_opened(), 1);
    }

    #[test]
    fn display_summarises_policies_only() {
        let parts = Parts::new();
        let context = parts.builder().build().unwrap();
        let rendered = context.to_string();

        assert!(rendered.contains(KEY));
        assert!(rendered.contains("sequential"));
        assert!(rendered.contains("65536"));
        assert!(rendered.contains(&parts.policy.to_string()));
        assert!(!rendered.contains(parts.span.span_id()));
        assert!(!rendered.contains("MaxRetries"));

        let debug = format!("{context:?}");
        assert!(debug.contains(KEY));
        assert!(!debug.contains(parts.span.span_id()));
        assert!(!debug.contains("MaxRetries"));
    }

    #[test]
    fn contexts_from_same_inputs_have_equal_fields() {
        let parts = Parts::new();
        let a = parts.builder().build().unwrap();
        let b = parts.builder().build().unwrap();

        assert_eq!(a.path(), b.path());
        assert_eq!(a.target_status(), b.target_status());
        assert_eq!(a.input_policy(), b.input_policy());
        assert_eq!(a.readahead(), b.readahead());
        assert_eq!(a.vectored_io_context(), b.vectored_io_context());
        assert_eq!(
            a.change_detection_policy().to_string(),
            b.change_detection_policy().to_string()
        );
        assert_eq!(a.audit_span().span_id(), b.audit_span().span_id());
    }

    #[test]
    fn options_configure_policies() {
        let parts = Parts::new();
        let options: ReadOptions = serde_json::from_str(
            r#"{ "readahead": 262144, "inputPolicy": "vector", "changeDetection": { "mode": "warn" } }"#,
        )
        .unwrap();

        let context = parts.builder().with_options(&options).unwrap().build().unwrap();
        assert_eq!(context.readahead(), 262144);
        assert_eq!(context.input_policy(), InputPolicy::Random);
        assert_eq!(context.change_detection_policy().mode(), ChangeMode::Warn);
        assert_eq!(context.vectored_io_context(), &VectoredIoContext::default());
    }

    #[test]
    fn oversized_option_readahead_is_rejected() {
        let options = ReadOptions {
            readahead: u64::MAX,
            ..Default::default()
        };
        let err = ReadOpContext::builder().with_options(&options).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
        assert!(err.message().starts_with("invalid readahead"));
    }

    #[test]
    fn context_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<ReadOpContext>();
    }

    #[test]
    fn concurrent_reads_observe_constant_values() {
        let parts = Parts::new();
        let context = Arc::new(parts.builder().build().unwrap());
        let expected = context.to_string();

        std::thread::scope(|scope| {
            for _ in 0..8 {
                let context = Arc::clone(&context);
                let expected = &expected;
                scope.spawn(move || {
                    for _ in 0..1_000 {
                        assert_eq!(context.path().as_ref(), KEY);
                        assert_eq!(context.readahead(), 65536);
                        assert_eq!(context.input_policy(), InputPolicy::Sequential);
                        assert_eq!(context.target_status().etag(), Some("\"etag-1\""));
                        assert_eq!(&context.to_string(), expected);
                    }
                });
            }
        });
    }

    #[test]
    fn change_detection_uses_target_status_as_baseline() {
        let parts = Parts::new();
        let context = parts.builder().build().unwrap();
        let observed = status(KEY, 4096, Some("\"etag-2\""), None);

        let decision = context
            .change_detection_policy()
            .detect(context.target_status(), &observed);
        let err = decision.into_result(context.path()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::RemoteFileChanged);
    }
}

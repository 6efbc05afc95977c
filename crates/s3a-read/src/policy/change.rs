//! Detection of objects that change while they are being read.
//!
//! A read path captures a [`FileStatus`] when the file is opened. Every
//! later GET observes the object again, and a [`ChangeDetectionPolicy`]
//! compares the two revisions to decide whether the read can continue.

use std::fmt;

use object_store::GetOptions;
#[cfg(feature = "schema")]
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString, IntoStaticStr};

use crate::TRACING_TARGET_CHANGE;
use crate::status::FileStatus;

/// Which piece of object metadata identifies a revision.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
#[derive(AsRefStr, Display, EnumString, IntoStaticStr)]
#[derive(Serialize, Deserialize)]
#[cfg_attr(feature = "schema", derive(JsonSchema))]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
#[serde(rename_all = "lowercase", try_from = "String")]
pub enum ChangeSource {
    /// Compare entity tags.
    #[default]
    ETag,
    /// Compare version identifiers of a versioned bucket.
    VersionId,
    /// Do not track revisions.
    None,
}

/// Where a detected change is enforced and how strictly.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
#[derive(AsRefStr, Display, EnumString, IntoStaticStr)]
#[derive(Serialize, Deserialize)]
#[cfg_attr(feature = "schema", derive(JsonSchema))]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
#[serde(rename_all = "lowercase", try_from = "String")]
pub enum ChangeMode {
    /// The client compares revisions and fails the read on mismatch.
    Client,
    /// The GET carries a revision constraint; the store rejects mismatches.
    #[default]
    Server,
    /// Mismatches are logged and the new revision is read.
    Warn,
    /// Changes are ignored.
    None,
}

impl TryFrom<String> for ChangeSource {
    type Error = strum::ParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl TryFrom<String> for ChangeMode {
    type Error = strum::ParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// Outcome of comparing the baseline revision with an observed one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChangeDecision {
    /// The object is unchanged by the policy's criterion.
    Continue,
    /// The object changed and the read must fail.
    Fail(String),
    /// The object changed; reread from the new revision.
    Refetch,
}

impl ChangeDecision {
    /// Whether the stream may keep using the data it has.
    pub fn is_continue(&self) -> bool {
        matches!(self, Self::Continue)
    }

    /// Converts a failure into a [`crate::Error`] for `path`.
    pub fn into_result(self, path: &object_store::path::Path) -> crate::Result<Self> {
        match self {
            Self::Fail(reason) => Err(crate::Error::remote_file_changed(format!(
                "{path}: {reason}"
            ))),
            decision => Ok(decision),
        }
    }
}

/// Decides how a read reacts to the object changing after it was opened.
pub trait ChangeDetectionPolicy: fmt::Debug + fmt::Display + Send + Sync {
    /// The metadata used as a revision identifier.
    fn source(&self) -> ChangeSource;

    /// How mismatches are enforced.
    fn mode(&self) -> ChangeMode;

    /// Extracts the revision identifier from `status`.
    fn revision_id<'a>(&self, status: &'a FileStatus) -> Option<&'a str> {
        match self.source() {
            ChangeSource::ETag => status.etag(),
            ChangeSource::VersionId => status.version_id(),
            ChangeSource::None => None,
        }
    }

    /// Compares the status captured at open time with a freshly observed one.
    fn detect(&self, baseline: &FileStatus, observed: &FileStatus) -> ChangeDecision;

    /// Adds a server-side revision constraint to a GET.
    fn apply_constraint(&self, _baseline: &FileStatus, _options: &mut GetOptions) {}
}

/// Revision comparison on etag or version id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RevisionChangeDetection {
    source: ChangeSource,
    mode: ChangeMode,
    require_version: bool,
}

impl RevisionChangeDetection {
    /// Creates a policy comparing `source` revisions, enforced per `mode`.
    pub fn new(source: ChangeSource, mode: ChangeMode) -> Self {
        Self {
            source,
            mode,
            require_version: false,
        }
    }

    /// A policy that never reports a change.
    pub fn disabled() -> Self {
        Self::new(ChangeSource::None, ChangeMode::None)
    }

    /// Fail reads whose revision cannot be determined.
    pub fn with_require_version(mut self, require_version: bool) -> Self {
        self.require_version = require_version;
        self
    }

    /// Whether a missing revision fails the read.
    pub fn require_version(&self) -> bool {
        self.require_version
    }

    fn is_disabled(&self) -> bool {
        self.source == ChangeSource::None || self.mode == ChangeMode::None
    }
}

impl Default for RevisionChangeDetection {
    fn default() -> Self {
        Self::new(ChangeSource::default(), ChangeMode::default())
    }
}

impl ChangeDetectionPolicy for RevisionChangeDetection {
    fn source(&self) -> ChangeSource {
        self.source
    }

    fn mode(&self) -> ChangeMode {
        self.mode
    }

    fn detect(&self, baseline: &FileStatus, observed: &FileStatus) -> ChangeDecision {
        if self.is_disabled() {
            return ChangeDecision::Continue;
        }

        let (Some(expected), Some(actual)) =
            (self.revision_id(baseline), self.revision_id(observed))
        else {
            if self.require_version && self.mode != ChangeMode::Warn {
                return ChangeDecision::Fail(format!("no {} available", self.source));
            }
            tracing::debug!(
                target: TRACING_TARGET_CHANGE,
                path = %observed.path(),
                source = %self.source,
                "revision unavailable, skipping change detection"
            );
            return ChangeDecision::Continue;
        };

        if expected == actual {
            return ChangeDecision::Continue;
        }

        match self.mode {
            ChangeMode::Warn => {
                tracing::warn!(
                    target: TRACING_TARGET_CHANGE,
                    path = %observed.path(),
                    expected,
                    actual,
                    "object changed during read, rereading new revision"
                );
                ChangeDecision::Refetch
            }
            _ => ChangeDecision::Fail(format!(
                "{} changed from {expected} to {actual}",
                self.source
            )),
        }
    }

    fn apply_constraint(&self, baseline: &FileStatus, options: &mut GetOptions) {
        if self.mode != ChangeMode::Server {
            return;
        }
        match self.source {
            ChangeSource::ETag => {
                if let Some(etag) = baseline.etag() {
                    options.if_match = Some(etag.to_string());
                }
            }
            ChangeSource::VersionId => {
                if let Some(version) = baseline.version_id() {
                    options.version = Some(version.to_string());
                }
            }
            ChangeSource::None => {}
        }
    }
}

impl fmt::Display for RevisionChangeDetection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "RevisionChangeDetection{{source={}, mode={}, require_version={}}}",
            self.source, self.mode, self.require_version
        )
    }
}

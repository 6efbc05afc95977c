//! Snapshot of object metadata captured when a file is opened.

use derive_more::Deref;
use object_store::ObjectMeta;
use object_store::path::Path;

/// Object metadata observed at a point in time.
///
/// Wraps [`ObjectMeta`] so the size, modification time, etag and version
/// are available through [`Deref`], and adds the accessors read paths use
/// when comparing revisions.
#[derive(Debug, Clone, PartialEq, Eq, Deref)]
pub struct FileStatus(ObjectMeta);

impl FileStatus {
    /// Wrap object metadata returned by a HEAD or GET.
    pub fn new(meta: ObjectMeta) -> Self {
        Self(meta)
    }

    /// Location of the object.
    pub fn path(&self) -> &Path {
        &self.0.location
    }

    /// Length of the object in bytes.
    pub fn len(&self) -> u64 {
        self.0.size
    }

    /// Whether the object is zero bytes long.
    pub fn is_empty(&self) -> bool {
        self.0.size == 0
    }

    /// Entity tag, if the store reported one.
    pub fn etag(&self) -> Option<&str> {
        self.0.e_tag.as_deref()
    }

    /// Version identifier, if the bucket is versioned.
    pub fn version_id(&self) -> Option<&str> {
        self.0.version.as_deref()
    }

    /// Unwrap into the underlying metadata.
    pub fn into_inner(self) -> ObjectMeta {
        self.0
    }
}

impl From<ObjectMeta> for FileStatus {
    fn from(meta: ObjectMeta) -> Self {
        Self::new(meta)
    }
}

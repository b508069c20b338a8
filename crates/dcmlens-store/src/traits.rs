use dcmlens_types::{ContentDigest, FileId};

use crate::error::StoreResult;

/// Storage for uploaded file bytes, keyed by [`FileId`].
///
/// All implementations must satisfy these invariants:
/// - A write either lands completely or not at all; readers never observe a
///   partially written file.
/// - `exists` reflects actual presence on the backend, not a cached belief.
/// - The store never interprets file contents.
/// - All I/O errors are propagated, never silently ignored.
pub trait BlobStore: Send + Sync {
    /// Write the bytes for `id`, replacing anything already stored under it.
    fn write(&self, id: &FileId, data: &[u8]) -> StoreResult<()>;

    /// Read the bytes for `id`.
    ///
    /// Returns `Ok(None)` if nothing is stored under `id`.
    fn read(&self, id: &FileId) -> StoreResult<Option<Vec<u8>>>;

    /// Check whether bytes are stored under `id`.
    fn exists(&self, id: &FileId) -> StoreResult<bool>;

    /// Delete the bytes for `id`. Returns `true` if something was removed.
    fn delete(&self, id: &FileId) -> StoreResult<bool>;

    /// All identifiers currently stored, in ascending order.
    fn list(&self) -> StoreResult<Vec<FileId>>;
}

/// Mapping from content digest to the identifier of the file holding it.
///
/// The index is the single source of truth for "have we seen these exact
/// bytes before". It holds at most one identifier per digest.
pub trait DedupIndex: Send + Sync {
    /// Look up the identifier recorded for `digest`.
    fn lookup(&self, digest: &ContentDigest) -> StoreResult<Option<FileId>>;

    /// Record `digest → id`.
    ///
    /// Callers record only after a lookup miss, or to replace an entry whose
    /// file has disappeared from storage. The new entry replaces any old one
    /// and is durable once this returns.
    fn record(&self, digest: ContentDigest, id: FileId) -> StoreResult<()>;

    /// Number of digests in the index.
    fn len(&self) -> usize;

    /// Returns `true` if the index holds no digests.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

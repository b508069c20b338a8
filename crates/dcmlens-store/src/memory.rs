use std::collections::{BTreeMap, HashMap};
use std::sync::RwLock;

use dcmlens_types::{ContentDigest, FileId};

use crate::error::StoreResult;
use crate::traits::{BlobStore, DedupIndex};

/// In-memory blob store.
///
/// Intended for tests and embedding. Files are held behind a `RwLock` for
/// safe concurrent access and cloned on read/write.
pub struct InMemoryBlobStore {
    files: RwLock<BTreeMap<FileId, Vec<u8>>>,
}

impl InMemoryBlobStore {
    /// Create a new empty in-memory store.
    pub fn new() -> Self {
        Self {
            files: RwLock::new(BTreeMap::new()),
        }
    }

    /// Number of files currently stored.
    pub fn len(&self) -> usize {
        self.files.read().expect("lock poisoned").len()
    }

    /// Returns `true` if the store is empty.
    pub fn is_empty(&self) -> bool {
        self.files.read().expect("lock poisoned").is_empty()
    }

    /// Total bytes across all stored files.
    pub fn total_bytes(&self) -> u64 {
        self.files
            .read()
            .expect("lock poisoned")
            .values()
            .map(|data| data.len() as u64)
            .sum()
    }
}

impl Default for InMemoryBlobStore {
    fn default() -> Self {
        Self::new()
    }
}

impl BlobStore for InMemoryBlobStore {
    fn write(&self, id: &FileId, data: &[u8]) -> StoreResult<()> {
        let mut map = self.files.write().expect("lock poisoned");
        map.insert(*id, data.to_vec());
        Ok(())
    }

    fn read(&self, id: &FileId) -> StoreResult<Option<Vec<u8>>> {
        let map = self.files.read().expect("lock poisoned");
        Ok(map.get(id).cloned())
    }

    fn exists(&self, id: &FileId) -> StoreResult<bool> {
        let map = self.files.read().expect("lock poisoned");
        Ok(map.contains_key(id))
    }

    fn delete(&self, id: &FileId) -> StoreResult<bool> {
        let mut map = self.files.write().expect("lock poisoned");
        Ok(map.remove(id).is_some())
    }

    fn list(&self) -> StoreResult<Vec<FileId>> {
        let map = self.files.read().expect("lock poisoned");
        Ok(map.keys().copied().collect())
    }
}

impl std::fmt::Debug for InMemoryBlobStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryBlobStore")
            .field("file_count", &self.len())
            .finish()
    }
}

/// In-memory dedup index. Nothing survives the process.
#[derive(Debug, Default)]
pub struct InMemoryDedupIndex {
    entries: RwLock<HashMap<ContentDigest, FileId>>,
}

impl InMemoryDedupIndex {
    pub fn new() -> Self {
        Self::default()
    }
}

impl DedupIndex for InMemoryDedupIndex {
    fn lookup(&self, digest: &ContentDigest) -> StoreResult<Option<FileId>> {
        let map = self.entries.read().expect("lock poisoned");
        Ok(map.get(digest).copied())
    }

    fn record(&self, digest: ContentDigest, id: FileId) -> StoreResult<()> {
        let mut map = self.entries.write().expect("lock poisoned");
        map.insert(digest, id);
        Ok(())
    }

    fn len(&self) -> usize {
        self.entries.read().expect("lock poisoned").len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // -----------------------------------------------------------------------
    // Blob store
    // -----------------------------------------------------------------------

    #[test]
    fn write_and_read() {
        let store = InMemoryBlobStore::new();
        let id = FileId::generate();
        store.write(&id, b"DICM bytes").unwrap();

        let read_back = store.read(&id).unwrap().expect("should exist");
        assert_eq!(read_back, b"DICM bytes");
    }

    #[test]
    fn read_missing_returns_none() {
        let store = InMemoryBlobStore::new();
        assert!(store.read(&FileId::generate()).unwrap().is_none());
    }

    #[test]
    fn exists_and_delete() {
        let store = InMemoryBlobStore::new();
        let id = FileId::generate();
        assert!(!store.exists(&id).unwrap());

        store.write(&id, b"x").unwrap();
        assert!(store.exists(&id).unwrap());

        assert!(store.delete(&id).unwrap()); // was present
        assert!(!store.exists(&id).unwrap()); // now gone
        assert!(!store.delete(&id).unwrap()); // second delete = false
    }

    #[test]
    fn list_is_sorted() {
        let store = InMemoryBlobStore::new();
        for _ in 0..5 {
            store.write(&FileId::generate(), b"a").unwrap();
        }
        let ids = store.list().unwrap();
        assert_eq!(ids.len(), 5);
        for w in ids.windows(2) {
            assert!(w[0] <= w[1]);
        }
    }

    #[test]
    fn len_and_total_bytes() {
        let store = InMemoryBlobStore::default();
        assert!(store.is_empty());
        store.write(&FileId::generate(), b"12345").unwrap();
        store.write(&FileId::generate(), b"123456789").unwrap();
        assert_eq!(store.len(), 2);
        assert_eq!(store.total_bytes(), 14);
    }

    #[test]
    fn concurrent_reads_are_safe() {
        use std::sync::Arc;
        use std::thread;

        let store = Arc::new(InMemoryBlobStore::new());
        let id = FileId::generate();
        store.write(&id, b"shared data").unwrap();

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let store = Arc::clone(&store);
                thread::spawn(move || {
                    let data = store.read(&id).unwrap().unwrap();
                    assert_eq!(data, b"shared data");
                })
            })
            .collect();

        for h in handles {
            h.join().expect("thread should not panic");
        }
    }

    #[test]
    fn debug_format() {
        let store = InMemoryBlobStore::new();
        store.write(&FileId::generate(), b"x").unwrap();
        let debug = format!("{store:?}");
        assert!(debug.contains("InMemoryBlobStore"));
        assert!(debug.contains("file_count"));
    }

    // -----------------------------------------------------------------------
    // Dedup index
    // -----------------------------------------------------------------------

    #[test]
    fn index_lookup_miss_then_hit() {
        let index = InMemoryDedupIndex::new();
        let digest = ContentDigest::from_hash([3; 32]);
        assert!(index.lookup(&digest).unwrap().is_none());

        let id = FileId::generate();
        index.record(digest, id).unwrap();
        assert_eq!(index.lookup(&digest).unwrap(), Some(id));
        assert_eq!(index.len(), 1);
    }

    #[test]
    fn index_record_replaces_stale_entry() {
        let index = InMemoryDedupIndex::new();
        let digest = ContentDigest::from_hash([4; 32]);
        let stale = FileId::generate();
        let fresh = FileId::generate();

        index.record(digest, stale).unwrap();
        index.record(digest, fresh).unwrap();
        assert_eq!(index.lookup(&digest).unwrap(), Some(fresh));
        assert_eq!(index.len(), 1);
    }
}

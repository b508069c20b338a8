//! Local filesystem blob store.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use dcmlens_types::FileId;
use tracing::{debug, instrument};

use crate::error::{StoreError, StoreResult};
use crate::traits::BlobStore;

/// Extension of stored upload files.
pub const FILE_EXTENSION: &str = "dcm";

/// Directory of uploads, one `<file_id>.dcm` file per identifier.
///
/// Writes land in a temporary file inside the root and are renamed into
/// place, so a crash mid-write never leaves a truncated `.dcm` behind.
#[derive(Debug, Clone)]
pub struct FsBlobStore {
    root: PathBuf,
}

impl FsBlobStore {
    /// Open a store rooted at `root`, creating the directory if needed.
    pub fn open(root: impl AsRef<Path>) -> StoreResult<Self> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root).map_err(|e| StoreError::RootUnavailable {
            path: root.clone(),
            reason: e.to_string(),
        })?;
        Ok(Self { root })
    }

    /// The storage root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of the file stored under `id`.
    ///
    /// `FileId` only renders as a UUID, so the result is always a direct
    /// child of the root.
    pub fn path_for(&self, id: &FileId) -> PathBuf {
        self.root.join(format!("{id}.{FILE_EXTENSION}"))
    }

    fn parse_file_name(name: &str) -> Option<FileId> {
        let stem = name.strip_suffix(FILE_EXTENSION)?.strip_suffix('.')?;
        FileId::parse(stem).ok()
    }
}

impl BlobStore for FsBlobStore {
    #[instrument(skip(self, data), fields(len = data.len()))]
    fn write(&self, id: &FileId, data: &[u8]) -> StoreResult<()> {
        let mut tmp = tempfile::NamedTempFile::new_in(&self.root)?;
        tmp.write_all(data)?;
        tmp.as_file().sync_all()?;
        tmp.persist(self.path_for(id)).map_err(|e| StoreError::Io(e.error))?;
        debug!(%id, "stored upload");
        Ok(())
    }

    fn read(&self, id: &FileId) -> StoreResult<Option<Vec<u8>>> {
        match fs::read(self.path_for(id)) {
            Ok(data) => Ok(Some(data)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn exists(&self, id: &FileId) -> StoreResult<bool> {
        match fs::metadata(self.path_for(id)) {
            Ok(meta) => Ok(meta.is_file()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    fn delete(&self, id: &FileId) -> StoreResult<bool> {
        match fs::remove_file(self.path_for(id)) {
            Ok(()) => {
                debug!(%id, "deleted upload");
                Ok(true)
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    fn list(&self) -> StoreResult<Vec<FileId>> {
        let mut ids = Vec::new();
        for entry in fs::read_dir(&self.root)? {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }
            if let Some(id) = entry.file_name().to_str().and_then(Self::parse_file_name) {
                ids.push(id);
            }
        }
        ids.sort();
        Ok(ids)
    }
}

//! Durable state for dcmlens: uploaded files and the dedup index.
//!
//! Uploaded bytes live in a [`BlobStore`], one entry per [`FileId`]. The
//! [`DedupIndex`] maps each distinct [`ContentDigest`] to the identifier of
//! the file that holds those bytes; it is the only durable state the upload
//! pipeline owns.
//!
//! # Backends
//!
//! - [`FsBlobStore`] -- a directory of `<file_id>.dcm` files
//! - [`InMemoryBlobStore`] -- `BTreeMap`-backed store for tests and embedding
//! - [`LogDedupIndex`] -- append-only, CRC-framed log replayed at startup
//! - [`InMemoryDedupIndex`] -- `HashMap`-backed index for tests
//!
//! # Design Rules
//!
//! 1. A file is written completely before its digest is recorded.
//! 2. An index hit is only trusted after the blob store confirms the file.
//! 3. No eviction: entries live as long as the storage root.
//! 4. All I/O errors are propagated, except that a damaged index log is
//!    recovered instead of failing startup.
//!
//! [`ContentDigest`]: dcmlens_types::ContentDigest
//! [`FileId`]: dcmlens_types::FileId

pub mod error;
pub mod fs;
pub mod log;
pub mod memory;
pub mod traits;

pub use error::{StoreError, StoreResult};
pub use fs::FsBlobStore;
pub use log::{FileRecord, IndexConfig, LogDedupIndex};
pub use memory::{InMemoryBlobStore, InMemoryDedupIndex};
pub use traits::{BlobStore, DedupIndex};

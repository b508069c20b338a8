//! Foundation types for dcmlens.
//!
//! Every other dcmlens crate depends on `dcmlens-types`.
//!
//! # Key Types
//!
//! - [`ContentDigest`] -- 256-bit digest of an upload, the deduplication key
//! - [`FileId`] -- opaque identifier assigned once per distinct upload
//! - [`ElementTag`] -- `(group, element)` key of a DICOM attribute

pub mod digest;
pub mod error;
pub mod file_id;
pub mod tag;

pub use digest::ContentDigest;
pub use error::TypeError;
pub use file_id::FileId;
pub use tag::{ElementTag, FILE_META_GROUP};

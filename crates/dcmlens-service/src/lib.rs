//! Upload orchestration for dcmlens.
//!
//! [`UploadService`] ties the pieces together: content digest, dedup index,
//! blob storage, format validation, tag resolution and preview rendering.
//! Transports (the HTTP server, the CLI) only translate to and from
//! [`RawUpload`], [`UploadOutcome`] and [`ServiceError`].

pub mod error;
pub mod locks;
pub mod service;
pub mod upload;

pub use error::{ErrorKind, ServiceError, ServiceResult};
pub use locks::StripedLocks;
pub use service::{Ingested, UploadService};
pub use upload::{RawUpload, TagData, UploadOutcome, UploadResponse};

// Re-export key types
pub use dcmlens_types::{ElementTag, FileId};

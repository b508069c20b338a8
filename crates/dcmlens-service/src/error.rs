use std::fmt;

use dcmlens_dataset::{ParseError, TagError};
use dcmlens_store::StoreError;
use dcmlens_types::FileId;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("Invalid tag format: {0}")]
    InvalidTagFormat(#[from] TagError),

    #[error("Tag {0} not found in DICOM file")]
    TagNotFound(String),

    #[error("The uploaded file is not a valid DICOM file")]
    InvalidFormat,

    /// A stored file that passed validation failed the full parse.
    #[error("failed to parse stored file {file_id}: {source}")]
    Parse {
        file_id: FileId,
        #[source]
        source: ParseError,
    },

    #[error("storage error: {0}")]
    Storage(#[from] StoreError),

    #[error("No DICOM files found in uploads directory")]
    NoStoredFiles,

    #[error("internal error: {0}")]
    Internal(String),
}

pub type ServiceResult<T> = Result<T, ServiceError>;

/// Machine-readable class of a [`ServiceError`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    InvalidTagFormat,
    TagNotFound,
    InvalidFormat,
    StorageFailure,
    NotFound,
    Internal,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InvalidTagFormat => "invalid_tag_format",
            Self::TagNotFound => "tag_not_found",
            Self::InvalidFormat => "invalid_format",
            Self::StorageFailure => "storage_failure",
            Self::NotFound => "not_found",
            Self::Internal => "internal",
        }
    }

    /// Client errors are caused by the request, not by the service.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidTagFormat | Self::TagNotFound | Self::InvalidFormat | Self::NotFound
        )
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl ServiceError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidTagFormat(_) => ErrorKind::InvalidTagFormat,
            Self::TagNotFound(_) => ErrorKind::TagNotFound,
            Self::InvalidFormat => ErrorKind::InvalidFormat,
            Self::Storage(_) => ErrorKind::StorageFailure,
            Self::NoStoredFiles => ErrorKind::NotFound,
            Self::Parse { .. } | Self::Internal(_) => ErrorKind::Internal,
        }
    }
}

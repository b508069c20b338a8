use thiserror::Error;

/// Errors from turning bytes into a [`StructuredDataset`](crate::StructuredDataset).
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    /// The bytes are not a readable DICOM file.
    #[error("malformed DICOM data: {0}")]
    Malformed(String),

    /// A pixel grid whose sample count does not match its shape.
    #[error("pixel grid shape {shape:?} needs {expected} samples, got {actual}")]
    ShapeMismatch {
        shape: Vec<usize>,
        expected: usize,
        actual: usize,
    },
}

/// Result alias for parse operations.
pub type ParseResult<T> = Result<T, ParseError>;

/// Errors from parsing a client-supplied tag string.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TagError {
    /// Not two hexadecimal components separated by one comma.
    #[error("invalid tag format {input:?}: {reason}")]
    InvalidFormat { input: String, reason: String },
}

impl TagError {
    pub(crate) fn new(input: &str, reason: impl Into<String>) -> Self {
        Self::InvalidFormat {
            input: input.to_string(),
            reason: reason.into(),
        }
    }
}

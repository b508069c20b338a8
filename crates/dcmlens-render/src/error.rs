use thiserror::Error;

/// Why an upload could not be previewed as a PNG.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RenderError {
    /// The file has no pixel data element.
    #[error("DICOM file does not contain image data")]
    NoPixelData,

    /// Pixel data exists but could not be decoded, normalized or encoded.
    #[error("Error converting to PNG: {0}")]
    ConversionFailed(String),
}

pub type RenderResult<T> = Result<T, RenderError>;

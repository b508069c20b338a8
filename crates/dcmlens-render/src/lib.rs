//! Turning a parsed dataset into what the upload response carries: a PNG
//! preview and `X-DICOM-*` metadata headers.

pub mod error;
pub mod headers;
pub mod pixels;

pub use error::{RenderError, RenderResult};
pub use headers::{element_headers, header_value, headers_for, FixedHeaders, IMAGE_GROUPS};
pub use pixels::{normalize, render, RenderedImage};

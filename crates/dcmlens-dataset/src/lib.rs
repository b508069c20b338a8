//! Structured view of uploaded DICOM files.
//!
//! [`DatasetParser`] turns bytes into a [`StructuredDataset`]: a main element
//! table, the file meta table, and decoded pixels. [`parse_tag`] and
//! [`resolve`] find the element a client asked for.

pub mod dataset;
pub mod error;
pub mod parser;
pub mod tag;

pub use dataset::{Element, ElementValue, PixelGrid, PixelLayout, StructuredDataset};
pub use error::{ParseError, ParseResult, TagError};
pub use parser::{DatasetParser, DicomParser};
pub use tag::{parse_tag, resolve};

//! HTTP server for dcmlens.
//!
//! Accepts DICOM uploads over multipart form posts, deduplicates them by
//! content, and answers with a PNG preview carrying metadata headers, or a
//! JSON description of the requested tag when no preview can be made.

pub mod config;
pub mod error;
pub mod handler;
pub mod router;
pub mod server;

pub use config::{IndexSettings, ServerConfig};
pub use error::{AppError, ServerError, ServerResult};
pub use handler::AppState;
pub use server::DcmlensServer;

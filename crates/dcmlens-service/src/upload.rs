use std::collections::BTreeMap;

use dcmlens_dataset::Element;
use dcmlens_types::FileId;
use serde::{Deserialize, Serialize};

/// An upload as received: the file bytes and the client's file name.
#[derive(Clone, Debug)]
pub struct RawUpload {
    pub filename: Option<String>,
    pub bytes: Vec<u8>,
}

impl RawUpload {
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            filename: None,
            bytes: bytes.into(),
        }
    }

    pub fn with_filename(mut self, filename: impl Into<String>) -> Self {
        self.filename = Some(filename.into());
        self
    }
}

/// The requested element, as reported to clients.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagData {
    /// Display form, e.g. `(0010,0010)`.
    pub tag: String,
    /// Dictionary keyword, empty for private tags.
    pub keyword: String,
    pub vr: String,
}

impl From<&Element> for TagData {
    fn from(element: &Element) -> Self {
        Self {
            tag: element.tag.to_string(),
            keyword: element.keyword_or_empty().to_string(),
            vr: element.vr.clone(),
        }
    }
}

/// JSON body returned when no preview image is produced.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadResponse {
    pub file_id: FileId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
    pub success: bool,
    /// Only set for uploads; random picks leave it out.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_duplicate: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag_data: Option<TagData>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub png_error: Option<String>,
}

impl UploadResponse {
    pub fn new(file_id: FileId) -> Self {
        Self {
            file_id,
            filename: None,
            success: true,
            is_duplicate: None,
            tag_data: None,
            png_error: None,
        }
    }
}

/// What a processed upload turns into.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum UploadOutcome {
    /// A PNG preview and the headers to send with it.
    Image {
        png: Vec<u8>,
        headers: BTreeMap<String, String>,
    },
    /// Metadata only; `png_error` says why there is no image.
    Metadata(UploadResponse),
}

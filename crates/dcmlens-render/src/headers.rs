//! Response headers for image previews.
//!
//! Besides a fixed set describing the upload and the requested tag, every
//! element of the image-related groups that has a text form becomes an
//! `X-DICOM-*` header.

use std::collections::BTreeMap;

use dcmlens_dataset::{Element, ElementValue, StructuredDataset};
use dcmlens_types::{ElementTag, FileId};
use tracing::trace;

/// Study/series (0008), acquisition (0018) and image pixel (0028) groups.
pub const IMAGE_GROUPS: [u16; 3] = [0x0008, 0x0018, 0x0028];

/// Headers that every image response carries.
#[derive(Clone, Debug)]
pub struct FixedHeaders {
    pub file_id: FileId,
    pub tag: ElementTag,
    pub keyword: String,
    pub vr: String,
}

impl FixedHeaders {
    fn into_map(self) -> BTreeMap<String, String> {
        BTreeMap::from([
            (
                "Content-Disposition".to_string(),
                format!("inline; filename={}.png", self.file_id),
            ),
            ("X-DICOM-ID".to_string(), self.file_id.to_string()),
            ("X-Tag".to_string(), self.tag.to_string()),
            ("X-Keyword".to_string(), self.keyword),
            ("X-VR".to_string(), self.vr),
        ])
    }
}

/// Build the full header set for an image response.
pub fn headers_for(dataset: &StructuredDataset, fixed: FixedHeaders) -> BTreeMap<String, String> {
    let mut headers = fixed.into_map();
    headers.extend(element_headers(dataset));
    headers
}

/// `X-DICOM-*` headers for the image-related elements of `dataset`.
pub fn element_headers(dataset: &StructuredDataset) -> BTreeMap<String, String> {
    let mut headers = BTreeMap::new();
    for element in dataset
        .elements()
        .filter(|e| IMAGE_GROUPS.contains(&e.tag.group))
    {
        match header_value(&element.value) {
            Some(value) => {
                headers.insert(header_name(element), value);
            }
            None => trace!(tag = %element.tag, "element skipped for headers"),
        }
    }
    headers
}

fn header_name(element: &Element) -> String {
    match element.keyword.as_deref() {
        Some(keyword) if !keyword.is_empty() => format!("X-DICOM-{keyword}"),
        _ => format!("X-DICOM-{}-{}", element.tag.group, element.tag.element),
    }
}

/// Single-line text form of a value, or `None` when it cannot be sent as a
/// header.
pub fn header_value(value: &ElementValue) -> Option<String> {
    let raw = match value {
        ElementValue::Scalar(s) => s.clone(),
        ElementValue::Sequence(items) => items.join(", "),
        ElementValue::Empty | ElementValue::Nested | ElementValue::Unsupported(_) => {
            return None
        }
    };
    let cleaned = raw.replace('\n', " ").replace('\r', "");
    let cleaned = cleaned.trim();
    if cleaned.is_empty() || !is_valid_header_value(cleaned) {
        return None;
    }
    Some(cleaned.to_string())
}

/// Visible ASCII, space and tab.
fn is_valid_header_value(value: &str) -> bool {
    value
        .bytes()
        .all(|b| b == b'\t' || (0x20..0x7f).contains(&b))
}

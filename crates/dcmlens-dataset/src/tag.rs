//! Tag strings from clients, and lookup of the element they name.

use dcmlens_types::ElementTag;

use crate::dataset::{Element, StructuredDataset};
use crate::error::TagError;

/// Parse a `"GGGG,EEEE"` tag string.
///
/// Surrounding whitespace is ignored, as is one pair of parentheses around
/// the whole tag (the form tags are displayed in). Each component is base-16,
/// case-insensitive, with an optional `0x` prefix, and must fit in 16 bits.
pub fn parse_tag(input: &str) -> Result<ElementTag, TagError> {
    let trimmed = input.trim();
    let inner = trimmed
        .strip_prefix('(')
        .and_then(|s| s.strip_suffix(')'))
        .unwrap_or(trimmed);

    let parts: Vec<&str> = inner.split(',').collect();
    if parts.len() != 2 {
        return Err(TagError::new(
            input,
            "expected exactly one comma between group and element",
        ));
    }

    let group = parse_component(input, parts[0])?;
    let element = parse_component(input, parts[1])?;
    Ok(ElementTag::new(group, element))
}

fn parse_component(input: &str, raw: &str) -> Result<u16, TagError> {
    let part = raw.trim();
    let digits = part
        .strip_prefix("0x")
        .or_else(|| part.strip_prefix("0X"))
        .unwrap_or(part);
    if digits.is_empty() {
        return Err(TagError::new(input, "empty tag component"));
    }
    u16::from_str_radix(digits, 16)
        .map_err(|e| TagError::new(input, format!("invalid hex value {part:?}: {e}")))
}

/// Look up `tag`, falling back to the file meta table for group 0002.
pub fn resolve(dataset: &StructuredDataset, tag: ElementTag) -> Option<&Element> {
    dataset.element(tag).or_else(|| {
        if tag.is_file_meta() {
            dataset.meta_element(tag)
        } else {
            None
        }
    })
}

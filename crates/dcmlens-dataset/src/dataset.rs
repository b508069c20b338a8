use std::collections::BTreeMap;

use dcmlens_types::ElementTag;
use serde::Serialize;

use crate::error::{ParseError, ParseResult};

/// The value of an element, resolved from its VR when the file is parsed.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum ElementValue {
    /// Present but zero-length.
    Empty,
    /// A single scalar, already rendered as text.
    Scalar(String),
    /// Several scalars (value multiplicity > 1), each rendered as text.
    Sequence(Vec<String>),
    /// Items of a sequence (`SQ`) element. Never stringified.
    Nested,
    /// A value that has no text form here, with the reason.
    Unsupported(String),
}

impl ElementValue {
    pub fn is_nested(&self) -> bool {
        matches!(self, Self::Nested)
    }
}

/// One attribute of a data set.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Element {
    pub tag: ElementTag,
    /// Two-letter value representation code, e.g. `PN` or `US`.
    pub vr: String,
    /// Standard dictionary keyword, `None` for private or unknown tags.
    pub keyword: Option<String>,
    pub value: ElementValue,
}

impl Element {
    pub fn new(tag: ElementTag, vr: impl Into<String>, value: ElementValue) -> Self {
        Self {
            tag,
            vr: vr.into(),
            keyword: None,
            value,
        }
    }

    pub fn with_keyword(mut self, keyword: impl Into<String>) -> Self {
        self.keyword = Some(keyword.into());
        self
    }

    /// Keyword, or the empty string when none is known.
    pub fn keyword_or_empty(&self) -> &str {
        self.keyword.as_deref().unwrap_or("")
    }
}

/// Dimensions of a decoded pixel array.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct PixelLayout {
    pub frames: usize,
    pub rows: usize,
    pub cols: usize,
    pub samples_per_pixel: usize,
}

impl PixelLayout {
    /// One frame of `rows` by `cols` single-sample pixels.
    pub fn new(rows: usize, cols: usize) -> Self {
        Self {
            frames: 1,
            rows,
            cols,
            samples_per_pixel: 1,
        }
    }

    pub fn with_frames(mut self, frames: usize) -> Self {
        self.frames = frames;
        self
    }

    pub fn with_samples_per_pixel(mut self, samples_per_pixel: usize) -> Self {
        self.samples_per_pixel = samples_per_pixel;
        self
    }

    /// Samples in one frame.
    pub fn frame_len(&self) -> usize {
        self.rows * self.cols * self.samples_per_pixel
    }

    /// Samples in the whole array.
    pub fn sample_count(&self) -> usize {
        self.frames * self.frame_len()
    }

    /// `[frames, rows, cols, samples]` with a unit frame or sample axis left out.
    pub fn shape(&self) -> Vec<usize> {
        let mut shape = Vec::with_capacity(4);
        if self.frames != 1 {
            shape.push(self.frames);
        }
        shape.push(self.rows);
        shape.push(self.cols);
        if self.samples_per_pixel != 1 {
            shape.push(self.samples_per_pixel);
        }
        shape
    }
}

/// Decoded pixel samples in row-major order, frame by frame, with the
/// samples of a pixel interleaved.
#[derive(Clone, Debug, PartialEq)]
pub struct PixelGrid {
    layout: PixelLayout,
    samples: Vec<f64>,
}

impl PixelGrid {
    pub fn new(layout: PixelLayout, samples: Vec<f64>) -> ParseResult<Self> {
        let expected = layout.sample_count();
        if expected == 0 || expected != samples.len() {
            return Err(ParseError::ShapeMismatch {
                shape: layout.shape(),
                expected,
                actual: samples.len(),
            });
        }
        Ok(Self { layout, samples })
    }

    pub fn layout(&self) -> PixelLayout {
        self.layout
    }

    pub fn shape(&self) -> Vec<usize> {
        self.layout.shape()
    }

    pub fn samples(&self) -> &[f64] {
        &self.samples
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

/// A parsed file: the main element table, the file meta table, and the
/// decoded pixels if there are any.
///
/// File meta elements (group 0002) are kept apart from the main table, the
/// same way the file format stores them.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct StructuredDataset {
    elements: BTreeMap<ElementTag, Element>,
    file_meta: BTreeMap<ElementTag, Element>,
    pixels: Option<PixelGrid>,
    pixel_error: Option<String>,
}

impl StructuredDataset {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert into the main table, replacing any element with the same tag.
    pub fn insert(&mut self, element: Element) {
        self.elements.insert(element.tag, element);
    }

    /// Insert into the file meta table.
    pub fn insert_meta(&mut self, element: Element) {
        self.file_meta.insert(element.tag, element);
    }

    pub fn set_pixels(&mut self, pixels: PixelGrid) {
        self.pixels = Some(pixels);
        self.pixel_error = None;
    }

    /// Record why pixel data that is present could not be decoded.
    pub fn set_pixel_error(&mut self, reason: impl Into<String>) {
        self.pixels = None;
        self.pixel_error = Some(reason.into());
    }

    pub fn element(&self, tag: ElementTag) -> Option<&Element> {
        self.elements.get(&tag)
    }

    pub fn meta_element(&self, tag: ElementTag) -> Option<&Element> {
        self.file_meta.get(&tag)
    }

    /// Main table elements in tag order.
    pub fn elements(&self) -> impl Iterator<Item = &Element> {
        self.elements.values()
    }

    /// File meta elements in tag order.
    pub fn meta_elements(&self) -> impl Iterator<Item = &Element> {
        self.file_meta.values()
    }

    pub fn pixels(&self) -> Option<&PixelGrid> {
        self.pixels.as_ref()
    }

    pub fn pixel_error(&self) -> Option<&str> {
        self.pixel_error.as_deref()
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }
}

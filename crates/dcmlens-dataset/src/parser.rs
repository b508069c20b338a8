//! Reading DICOM files into [`StructuredDataset`]s.
//!
//! The [`DatasetParser`] trait is the seam the upload pipeline depends on;
//! [`DicomParser`] implements it with dicom-rs.

use dcmlens_types::ElementTag;
use dicom_core::dictionary::{DataDictionary, DataDictionaryEntry};
use dicom_core::header::Header;
use dicom_core::value::{PrimitiveValue, Value};
use dicom_core::{Tag, VR};
use dicom_dictionary_std::{tags, StandardDataDictionary};
use dicom_object::meta::FileMetaTable;
use dicom_object::mem::InMemElement;
use dicom_object::file::ReadPreamble;
use dicom_object::{DefaultDicomObject, OpenFileOptions};
use dicom_pixeldata::{ConvertOptions, ModalityLutOption, PixelDecoder};
use tracing::debug;

use crate::dataset::{Element, ElementValue, PixelGrid, PixelLayout, StructuredDataset};
use crate::error::{ParseError, ParseResult};

/// Offset of the `DICM` magic in a file with the 128-byte preamble.
const PREAMBLE_LEN: usize = 128;
const MAGIC: &[u8; 4] = b"DICM";

/// Parses raw upload bytes.
pub trait DatasetParser: Send + Sync {
    /// Parse the whole file, decoding pixel data when present.
    ///
    /// Pixel decoding failures do not fail the parse; they are recorded with
    /// [`StructuredDataset::set_pixel_error`].
    fn parse(&self, bytes: &[u8]) -> ParseResult<StructuredDataset>;

    /// Whether the bytes are a structurally valid DICOM file. Reads the header
    /// and stops before pixel data. Never fails, never panics.
    fn validate(&self, bytes: &[u8]) -> bool;
}

/// [`DatasetParser`] backed by `dicom-object` and `dicom-pixeldata`.
#[derive(Clone, Copy, Debug, Default)]
pub struct DicomParser;

impl DicomParser {
    pub fn new() -> Self {
        Self
    }
}

impl DatasetParser for DicomParser {
    fn parse(&self, bytes: &[u8]) -> ParseResult<StructuredDataset> {
        let obj = open(bytes, None)?;

        let mut dataset = StructuredDataset::new();
        for elem in obj.iter() {
            dataset.insert(convert_element(elem));
        }
        for elem in meta_elements(obj.meta()) {
            dataset.insert_meta(elem);
        }

        if obj.element(tags::PIXEL_DATA).is_ok() {
            match decode_pixels(&obj) {
                Ok(grid) => dataset.set_pixels(grid),
                Err(reason) => {
                    debug!(%reason, "pixel data could not be decoded");
                    dataset.set_pixel_error(reason);
                }
            }
        }

        debug!(
            elements = dataset.len(),
            has_pixels = dataset.pixels().is_some(),
            "parsed dataset"
        );
        Ok(dataset)
    }

    fn validate(&self, bytes: &[u8]) -> bool {
        match open(bytes, Some(tags::PIXEL_DATA)) {
            Ok(_) => true,
            Err(e) => {
                debug!(error = %e, "format validation failed");
                false
            }
        }
    }
}

/// Skip the 128-byte preamble when the `DICM` magic follows it.
fn strip_preamble(bytes: &[u8]) -> &[u8] {
    if bytes.len() >= PREAMBLE_LEN + MAGIC.len()
        && &bytes[PREAMBLE_LEN..PREAMBLE_LEN + MAGIC.len()] == MAGIC
    {
        &bytes[PREAMBLE_LEN..]
    } else {
        bytes
    }
}

fn open(bytes: &[u8], read_until: Option<Tag>) -> ParseResult<DefaultDicomObject> {
    let mut options = OpenFileOptions::new().read_preamble(ReadPreamble::Never);
    if let Some(tag) = read_until {
        options = options.read_until(tag);
    }
    options
        .from_reader(strip_preamble(bytes))
        .map_err(|e| ParseError::Malformed(e.to_string()))
}

fn keyword_for(tag: Tag) -> Option<String> {
    StandardDataDictionary
        .by_tag(tag)
        .map(|entry| entry.alias().to_string())
}

fn trim_text(s: &str) -> String {
    s.trim_end_matches(['\0', ' ']).to_string()
}

fn convert_element(elem: &InMemElement) -> Element {
    let tag = elem.tag();
    let vr = elem.vr();
    let value = if tag == tags::PIXEL_DATA {
        ElementValue::Unsupported("pixel data".to_string())
    } else {
        match elem.value() {
            Value::Primitive(p) => convert_primitive(p),
            Value::Sequence(_) => ElementValue::Nested,
            Value::PixelSequence(_) => {
                ElementValue::Unsupported("encapsulated pixel data".to_string())
            }
        }
    };
    build(tag, vr, value)
}

fn convert_primitive(value: &PrimitiveValue) -> ElementValue {
    if value.multiplicity() == 0 {
        return ElementValue::Empty;
    }
    let mut parts: Vec<String> = value.to_multi_str().iter().map(|s| trim_text(s)).collect();
    match parts.len() {
        0 => ElementValue::Empty,
        1 if parts[0].is_empty() => ElementValue::Empty,
        1 => ElementValue::Scalar(parts.remove(0)),
        _ => ElementValue::Sequence(parts),
    }
}

fn build(tag: Tag, vr: VR, value: ElementValue) -> Element {
    Element {
        tag: ElementTag::new(tag.group(), tag.element()),
        vr: vr.to_string().to_owned(),
        keyword: keyword_for(tag),
        value,
    }
}

/// The file meta group as elements.
fn meta_elements(meta: &FileMetaTable) -> Vec<Element> {
    let text = |s: &str| ElementValue::Scalar(trim_text(s));
    let mut out = vec![
        build(
            tags::FILE_META_INFORMATION_GROUP_LENGTH,
            VR::UL,
            ElementValue::Scalar(meta.information_group_length.to_string()),
        ),
        build(
            tags::FILE_META_INFORMATION_VERSION,
            VR::OB,
            ElementValue::Sequence(
                meta.information_version
                    .iter()
                    .map(|b| b.to_string())
                    .collect(),
            ),
        ),
        build(
            tags::MEDIA_STORAGE_SOP_CLASS_UID,
            VR::UI,
            text(&meta.media_storage_sop_class_uid),
        ),
        build(
            tags::MEDIA_STORAGE_SOP_INSTANCE_UID,
            VR::UI,
            text(&meta.media_storage_sop_instance_uid),
        ),
        build(tags::TRANSFER_SYNTAX_UID, VR::UI, text(&meta.transfer_syntax)),
        build(
            tags::IMPLEMENTATION_CLASS_UID,
            VR::UI,
            text(&meta.implementation_class_uid),
        ),
    ];
    if let Some(v) = &meta.implementation_version_name {
        out.push(build(tags::IMPLEMENTATION_VERSION_NAME, VR::SH, text(v)));
    }
    if let Some(v) = &meta.source_application_entity_title {
        out.push(build(tags::SOURCE_APPLICATION_ENTITY_TITLE, VR::AE, text(v)));
    }
    if let Some(v) = &meta.private_information_creator_uid {
        out.push(build(tags::PRIVATE_INFORMATION_CREATOR_UID, VR::UI, text(v)));
    }
    out
}

/// Decode pixel data into a grid of stored values.
///
/// Rescale slope and intercept are not applied.
fn decode_pixels(obj: &DefaultDicomObject) -> Result<PixelGrid, String> {
    let decoded = obj.decode_pixel_data().map_err(|e| e.to_string())?;
    let layout = PixelLayout::new(decoded.rows() as usize, decoded.columns() as usize)
        .with_frames(decoded.number_of_frames() as usize)
        .with_samples_per_pixel(decoded.samples_per_pixel() as usize);
    let stored = ConvertOptions::new().with_modality_lut(ModalityLutOption::None);
    let samples: Vec<f64> = decoded
        .to_vec_with_options::<f64>(&stored)
        .map_err(|e| e.to_string())?;
    PixelGrid::new(layout, samples).map_err(|e| e.to_string())
}

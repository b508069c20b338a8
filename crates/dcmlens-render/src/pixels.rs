use dcmlens_dataset::{PixelGrid, PixelLayout, StructuredDataset};
use image::codecs::png::{CompressionType, FilterType, PngEncoder};
use image::{ExtendedColorType, ImageEncoder};
use tracing::debug;

use crate::error::{RenderError, RenderResult};

/// An encoded PNG preview.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RenderedImage {
    pub png: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

/// Normalize the dataset's pixels to 8 bits and encode them as PNG.
pub fn render(dataset: &StructuredDataset) -> RenderResult<RenderedImage> {
    let grid = match (dataset.pixels(), dataset.pixel_error()) {
        (Some(grid), _) => grid,
        (None, Some(reason)) => return Err(RenderError::ConversionFailed(reason.to_string())),
        (None, None) => return Err(RenderError::NoPixelData),
    };
    let normalized = normalize(grid.samples());
    encode(grid, &normalized)
}

/// Linearly rescale samples onto `0..=255`.
///
/// The range is taken over finite samples. Non-finite samples map to 0. When
/// the range is empty or flat every output is 0.
pub fn normalize(samples: &[f64]) -> Vec<u8> {
    let (min, max) = samples
        .iter()
        .copied()
        .filter(|s| s.is_finite())
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), s| {
            (lo.min(s), hi.max(s))
        });

    if !(min.is_finite() && max.is_finite() && max > min) {
        return vec![0; samples.len()];
    }

    let span = max - min;
    samples
        .iter()
        .map(|&s| {
            if s.is_finite() {
                ((s - min) / span * 255.0).clamp(0.0, 255.0) as u8
            } else {
                0
            }
        })
        .collect()
}

fn color_type(layout: &PixelLayout) -> RenderResult<ExtendedColorType> {
    match layout.samples_per_pixel {
        1 => Ok(ExtendedColorType::L8),
        3 => Ok(ExtendedColorType::Rgb8),
        4 => Ok(ExtendedColorType::Rgba8),
        n => Err(RenderError::ConversionFailed(format!(
            "unsupported samples per pixel: {n}"
        ))),
    }
}

/// Encode the first frame; later frames are ignored.
fn encode(grid: &PixelGrid, normalized: &[u8]) -> RenderResult<RenderedImage> {
    let layout = grid.layout();
    let color = color_type(&layout)?;
    let width = u32::try_from(layout.cols)
        .map_err(|_| RenderError::ConversionFailed(format!("width {} out of range", layout.cols)))?;
    let height = u32::try_from(layout.rows)
        .map_err(|_| RenderError::ConversionFailed(format!("height {} out of range", layout.rows)))?;

    let mut png = Vec::new();
    PngEncoder::new_with_quality(&mut png, CompressionType::Best, FilterType::Adaptive)
        .write_image(&normalized[..layout.frame_len()], width, height, color)
        .map_err(|e| RenderError::ConversionFailed(e.to_string()))?;

    debug!(width, height, frames = layout.frames, bytes = png.len(), "encoded png preview");
    Ok(RenderedImage { png, width, height })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dataset_with(layout: PixelLayout, samples: Vec<f64>) -> StructuredDataset {
        let mut ds = StructuredDataset::new();
        ds.set_pixels(PixelGrid::new(layout, samples).unwrap());
        ds
    }

    const PNG_MAGIC: &[u8] = b"\x89PNG\r\n\x1a\n";

    // ----------------------------------------------------------------------
    // Normalization
    // ----------------------------------------------------------------------

    #[test]
    fn linear_rescale_truncates() {
        assert_eq!(normalize(&[0.0, 50.0, 100.0]), vec![0, 127, 255]);
    }

    #[test]
    fn negative_range() {
        assert_eq!(normalize(&[-1000.0, 0.0, 1000.0]), vec![0, 127, 255]);
    }

    #[test]
    fn flat_grid_is_all_zero() {
        assert_eq!(normalize(&[42.0; 6]), vec![0; 6]);
    }

    #[test]
    fn empty_input() {
        assert!(normalize(&[]).is_empty());
    }

    #[test]
    fn non_finite_samples_map_to_zero() {
        let out = normalize(&[f64::NAN, 0.0, 10.0, f64::INFINITY]);
        assert_eq!(out, vec![0, 0, 255, 0]);
    }

    #[test]
    fn all_non_finite_is_all_zero() {
        assert_eq!(normalize(&[f64::NAN, f64::NEG_INFINITY]), vec![0, 0]);
    }

    // ----------------------------------------------------------------------
    // Rendering
    // ----------------------------------------------------------------------

    #[test]
    fn renders_grayscale() {
        let ds = dataset_with(PixelLayout::new(2, 3), vec![0.0, 1.0, 2.0, 3.0, 4.0, 5.0]);
        let img = render(&ds).unwrap();
        assert_eq!((img.width, img.height), (3, 2));
        assert!(img.png.starts_with(PNG_MAGIC));
    }

    #[test]
    fn renders_flat_image() {
        let ds = dataset_with(PixelLayout::new(2, 2), vec![42.0; 4]);
        assert!(render(&ds).is_ok());
    }

    #[test]
    fn renders_rgb() {
        let layout = PixelLayout::new(1, 2).with_samples_per_pixel(3);
        let ds = dataset_with(layout, (0..6).map(f64::from).collect());
        let img = render(&ds).unwrap();
        assert_eq!((img.width, img.height), (2, 1));
    }

    #[test]
    fn multi_frame_renders_first_frame() {
        let layout = PixelLayout::new(2, 5).with_frames(2);
        let ds = dataset_with(layout, (0..20).map(f64::from).collect());
        let img = render(&ds).unwrap();
        assert_eq!((img.width, img.height), (5, 2));
    }

    #[test]
    fn narrow_multi_frame_stays_grayscale() {
        // Two 5x3 grayscale frames: three columns must not read as RGB.
        let layout = PixelLayout::new(5, 3).with_frames(2);
        let grid = PixelGrid::new(layout, (0..30).map(f64::from).collect()).unwrap();
        let img = encode(&grid, &normalize(grid.samples())).unwrap();
        assert_eq!((img.width, img.height), (3, 5));

        let expected = {
            let mut png = Vec::new();
            PngEncoder::new_with_quality(&mut png, CompressionType::Best, FilterType::Adaptive)
                .write_image(&normalize(grid.samples())[..15], 3, 5, ExtendedColorType::L8)
                .unwrap();
            png
        };
        assert_eq!(img.png, expected);
    }

    #[test]
    fn unsupported_channel_count_fails() {
        let layout = PixelLayout::new(1, 1).with_samples_per_pixel(2);
        let ds = dataset_with(layout, vec![0.0, 1.0]);
        assert!(matches!(render(&ds), Err(RenderError::ConversionFailed(_))));
    }

    #[test]
    fn no_pixels() {
        let err = render(&StructuredDataset::new()).unwrap_err();
        assert_eq!(err, RenderError::NoPixelData);
        assert_eq!(err.to_string(), "DICOM file does not contain image data");
    }

    #[test]
    fn decode_failure_is_conversion_failure() {
        let mut ds = StructuredDataset::new();
        ds.set_pixel_error("unsupported transfer syntax");
        let err = render(&ds).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Error converting to PNG: unsupported transfer syntax"
        );
    }
}

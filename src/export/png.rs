//! PNG export functionality for heightfields and scalar layers.

use std::fs::File;
use std::io::BufWriter;
use std::path::Path;
use image::codecs::png::{CompressionType, FilterType, PngEncoder};
use image::{ImageBuffer, ImageEncoder, Luma};
use thiserror::Error;

use crate::terrain::Heightfield;

/// Errors that can occur during PNG export.
#[derive(Error, Debug)]
pub enum PngExportError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Image encoding error: {0}")]
    Image(#[from] image::ImageError),
    #[error("Invalid value range: min ({0}) >= max ({1})")]
    InvalidRange(f32, f32),
}

/// Options for PNG export.
#[derive(Debug, Clone)]
pub struct PngExportOptions {
    /// Value mapped to black.
    pub min_value: f32,
    /// Value mapped to white.
    pub max_value: f32,
    /// PNG compression type.
    pub compression: CompressionType,
    /// PNG filter type.
    pub filter: FilterType,
}

impl Default for PngExportOptions {
    fn default() -> Self {
        Self {
            min_value: 0.0,
            max_value: 1.0,
            compression: CompressionType::Default,
            filter: FilterType::Adaptive,
        }
    }
}

impl PngExportOptions {
    /// Creates options spanning the heightfield's range.
    pub fn auto_range(field: &Heightfield) -> Self {
        Self::auto_range_values(&field.heights)
    }

    /// Creates options spanning the min/max of `values`.
    ///
    /// A constant layer (a dry water map, say) gets a unit-wide range so it
    /// still exports as a flat image.
    pub fn auto_range_values(values: &[f32]) -> Self {
        let (mut min, mut max) = values
            .iter()
            .fold((f32::MAX, f32::MIN), |(lo, hi), &v| (lo.min(v), hi.max(v)));
        if values.is_empty() {
            min = 0.0;
            max = 1.0;
        } else if max <= min {
            max = min + 1.0;
        }
        Self {
            min_value: min,
            max_value: max,
            ..Default::default()
        }
    }
}

/// Exports a heightfield as a 16-bit grayscale PNG.
pub fn export_heightfield_png(
    field: &Heightfield,
    path: &Path,
    options: &PngExportOptions,
) -> Result<(), PngExportError> {
    export_scalar_png(field.size, &field.heights, path, options)
}

/// Exports an arbitrary scalar layer (water, sediment) as a 16-bit grayscale PNG.
///
/// `data` must be length `size*size` in row-major order.
pub fn export_scalar_png(
    size: usize,
    data: &[f32],
    path: &Path,
    options: &PngExportOptions,
) -> Result<(), PngExportError> {
    let min = options.min_value;
    let max = options.max_value;
    if min >= max {
        return Err(PngExportError::InvalidRange(min, max));
    }
    let expected = size * size;
    if data.len() != expected {
        return Err(PngExportError::Io(std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            format!("scalar data length {} != expected {}", data.len(), expected),
        )));
    }

    let dim = size as u32;
    let range = max - min;
    let mut img: ImageBuffer<Luma<u16>, Vec<u16>> = ImageBuffer::new(dim, dim);
    for (pixel, &v) in img.pixels_mut().zip(data) {
        let normalized = ((v - min) / range).clamp(0.0, 1.0);
        *pixel = Luma([(normalized * 65535.0) as u16]);
    }

    let file = File::create(path)?;
    let writer = BufWriter::new(file);
    let encoder = PngEncoder::new_with_quality(writer, options.compression, options.filter);

    // Convert u16 slice to bytes for the encoder
    let byte_slice: &[u8] = bytemuck::cast_slice(img.as_raw());
    encoder.write_image(byte_slice, dim, dim, image::ExtendedColorType::L16)?;

    Ok(())
}

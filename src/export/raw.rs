//! RAW heightmap export for game engine imports.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use thiserror::Error;

use crate::terrain::Heightfield;

/// Errors that can occur during RAW export.
#[derive(Error, Debug)]
pub enum RawExportError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid height range: min ({0}) >= max ({1})")]
    InvalidRange(f32, f32),
}

/// RAW export format options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RawFormat {
    /// 16-bit unsigned integer, little-endian (Unity default).
    #[default]
    R16LittleEndian,
    /// 16-bit unsigned integer, big-endian.
    R16BigEndian,
    /// 32-bit float, little-endian (high precision, no normalization).
    R32Float,
}

impl RawFormat {
    /// Bytes written per cell.
    pub fn bytes_per_sample(self) -> u64 {
        match self {
            RawFormat::R16LittleEndian | RawFormat::R16BigEndian => 2,
            RawFormat::R32Float => 4,
        }
    }
}

/// Exports a heightfield as a headerless RAW file in row-major order.
///
/// `min_height`/`max_height` map to 0 and 65535 for the R16 formats and are
/// ignored for `R32Float`.
pub fn export_heightfield_raw(
    field: &Heightfield,
    path: &Path,
    format: RawFormat,
    min_height: f32,
    max_height: f32,
) -> Result<(), RawExportError> {
    if format != RawFormat::R32Float && min_height >= max_height {
        return Err(RawExportError::InvalidRange(min_height, max_height));
    }

    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);

    let range = max_height - min_height;
    let quantize = |height: f32| -> u16 {
        let normalized = ((height - min_height) / range).clamp(0.0, 1.0);
        (normalized * 65535.0) as u16
    };

    for &height in &field.heights {
        match format {
            RawFormat::R16LittleEndian => writer.write_all(&quantize(height).to_le_bytes())?,
            RawFormat::R16BigEndian => writer.write_all(&quantize(height).to_be_bytes())?,
            RawFormat::R32Float => writer.write_all(&height.to_le_bytes())?,
        }
    }

    writer.flush()?;
    Ok(())
}

/// Returns the expected file size for a RAW export.
pub fn expected_file_size(size: usize, format: RawFormat) -> u64 {
    (size as u64) * (size as u64) * format.bytes_per_sample()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn ramp(size: usize) -> Heightfield {
        let n = size * size;
        let heights = (0..n).map(|i| i as f32 / n as f32 * 100.0).collect();
        Heightfield::from_heights(size, heights).unwrap()
    }

    #[test]
    fn test_file_sizes() {
        let field = ramp(16);
        let dir = tempdir().unwrap();

        for format in [RawFormat::R16LittleEndian, RawFormat::R16BigEndian, RawFormat::R32Float] {
            let path = dir.path().join(format!("{format:?}.raw"));
            export_heightfield_raw(&field, &path, format, 0.0, 100.0).unwrap();
            let len = std::fs::metadata(&path).unwrap().len();
            assert_eq!(len, expected_file_size(16, format));
        }
    }

    #[test]
    fn test_raw_content_correctness() {
        let field = Heightfield::from_heights(2, vec![-1.0, 0.0, 0.5, 1.0]).unwrap();
        let dir = tempdir().unwrap();
        let path = dir.path().join("test.raw");

        export_heightfield_raw(&field, &path, RawFormat::R16LittleEndian, -1.0, 1.0).unwrap();

        let data = std::fs::read(&path).unwrap();
        assert_eq!(data.len(), 8); // 4 pixels × 2 bytes

        assert_eq!(u16::from_le_bytes([data[0], data[1]]), 0);
        let mid = u16::from_le_bytes([data[2], data[3]]);
        assert!((mid as i32 - 32767).abs() < 2);
        assert_eq!(u16::from_le_bytes([data[6], data[7]]), 65535);
    }

    #[test]
    fn test_big_endian_and_float() {
        let field = Heightfield::from_heights(1, vec![12.5]).unwrap();
        let dir = tempdir().unwrap();

        let be = dir.path().join("be.raw");
        export_heightfield_raw(&field, &be, RawFormat::R16BigEndian, 0.0, 12.5).unwrap();
        assert_eq!(std::fs::read(&be).unwrap(), vec![0xFF, 0xFF]);

        let float = dir.path().join("f.raw");
        export_heightfield_raw(&field, &float, RawFormat::R32Float, 0.0, 0.0).unwrap();
        assert_eq!(std::fs::read(&float).unwrap(), 12.5f32.to_le_bytes().to_vec());
    }

    #[test]
    fn test_invalid_range_for_r16() {
        let dir = tempdir().unwrap();
        let result = export_heightfield_raw(
            &ramp(4),
            &dir.path().join("bad.raw"),
            RawFormat::R16LittleEndian,
            5.0,
            5.0,
        );
        assert!(matches!(result, Err(RawExportError::InvalidRange(_, _))));
    }
}

//! Export module for saving heightfields and simulation layers.
//!
//! Supports 16-bit PNG for universal compatibility and RAW formats
//! for game engine imports.

mod png;
mod raw;

pub use png::{export_heightfield_png, export_scalar_png, PngExportError, PngExportOptions};
pub use raw::{expected_file_size, export_heightfield_raw, RawExportError, RawFormat};

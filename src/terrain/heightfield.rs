//! Square heightfield storage and noise seeding.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::noise::NoiseField;

/// A square grid of heights stored in row-major order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Heightfield {
    /// Width and height in cells.
    pub size: usize,
    /// Height values, `size * size` entries.
    pub heights: Vec<f32>,
}

impl Heightfield {
    /// Creates a flat heightfield at height 0.
    pub fn new(size: usize) -> Self {
        Self {
            size,
            heights: vec![0.0; size * size],
        }
    }

    /// Wraps existing heights. Returns `None` if the length is not `size * size`.
    pub fn from_heights(size: usize, heights: Vec<f32>) -> Option<Self> {
        (heights.len() == size * size).then_some(Self { size, heights })
    }

    /// Returns the number of cells.
    pub fn pixel_count(&self) -> usize {
        self.heights.len()
    }

    #[inline]
    pub fn get(&self, x: usize, y: usize) -> f32 {
        self.heights[y * self.size + x]
    }

    #[inline]
    pub fn set(&mut self, x: usize, y: usize, height: f32) {
        self.heights[y * self.size + x] = height;
    }

    /// Computes the min and max height values.
    pub fn height_range(&self) -> (f32, f32) {
        let mut min = f32::MAX;
        let mut max = f32::MIN;

        for &height in &self.heights {
            min = min.min(height);
            max = max.max(height);
        }

        (min, max)
    }
}

/// Generates a noise heightfield scaled by `amplitude`.
///
/// Rows are sampled in parallel; each cell only depends on its own coordinates,
/// so the result is identical to a sequential fill.
pub fn generate_heightfield(size: usize, noise: &NoiseField, amplitude: f32) -> Heightfield {
    let mut field = Heightfield::new(size);

    field
        .heights
        .par_chunks_mut(size.max(1))
        .enumerate()
        .for_each(|(y, row)| {
            for (x, height) in row.iter_mut().enumerate() {
                *height = noise.sample(x as f32, y as f32) * amplitude;
            }
        });

    field
}

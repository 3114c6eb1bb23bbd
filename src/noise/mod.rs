//! Noise generation for terrain seeding and rainfall.
//!
//! Uses simdnoise gradient noise, sampled point-wise so results are a pure
//! function of the input coordinates.

mod gradient;

pub use gradient::{NoiseConfig, NoiseField, unit_gradient_2d};

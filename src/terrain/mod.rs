//! Terrain data handed to and received from the erosion simulator.
//!
//! Provides the `Heightfield` storage, noise seeding, and the `HeightSink`
//! boundary through which the simulator publishes vertex heights.

mod heightfield;
mod sink;

pub use heightfield::{generate_heightfield, Heightfield};
pub use sink::{HeightSink, HeightfieldRecorder};

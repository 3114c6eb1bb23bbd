//! Pipe-model hydraulic erosion over a square heightfield.
//!
//! This crate simulates rain, shallow water flow between cells, sediment
//! pickup, transport and deposition, and publishes the eroded terrain one row
//! at a time to a `HeightSink` such as a mesh or texture owner.

pub mod noise;
pub mod terrain;
pub mod export;
pub mod erosion;

pub use noise::{NoiseConfig, NoiseField};
pub use terrain::{Heightfield, HeightfieldRecorder, HeightSink};
pub use erosion::{ErosionConfig, ErosionSimulator, Phase, SimulationError, StepOutcome, SweepCursor};

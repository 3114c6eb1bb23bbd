//! Pipe-model hydraulic erosion.
//!
//! Water moves between cells through virtual pipes, picks up terrain where it
//! flows fast over steep ground, carries it along its velocity, and deposits it
//! where it slows down. The simulation is split into seven phases that are
//! processed one grid row at a time so a host can interleave it with rendering.

mod config;
mod grid;
pub mod hydraulics;
mod phase;
mod simulator;

pub use config::{ConfigError, ErosionConfig};
pub use grid::{Cell, Direction, ErosionGrid, GridStats};
pub use phase::{Phase, SweepCursor};
pub use simulator::{ErosionSimulator, SimulationError, StepOutcome};

//! Row-at-a-time driver for the seven erosion phases.

use thiserror::Error;

use crate::erosion::grid::{Cell, ErosionGrid, GridStats};
use crate::erosion::hydraulics;
use crate::erosion::phase::{CursorStep, Phase, SweepCursor};
use crate::erosion::ErosionConfig;
use crate::noise::NoiseField;
use crate::terrain::{generate_heightfield, HeightSink};

#[derive(Error, Debug, PartialEq)]
pub enum SimulationError {
    #[error("Grid size must be at least 1, got {0}")]
    InvalidGridSize(usize),
    #[error("Expected {expected} terrain heights, got {actual}")]
    HeightCountMismatch { expected: usize, actual: usize },
}

/// Result of one [`ErosionSimulator::advance_row`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    /// The sink was not ready; nothing changed.
    Waiting,
    /// One row of the current phase was processed.
    Advanced,
    /// The last publish row was processed and the sink was notified.
    SweepComplete,
}

/// Where initial terrain comes from on `reset`.
#[derive(Debug, Clone)]
enum TerrainSource {
    Noise,
    Heights(Vec<f32>),
}

/// Pipe-model hydraulic erosion over a square grid.
///
/// Work is split into rows so a host can spread a sweep over several frames:
/// every call to [`advance_row`](Self::advance_row) processes one row of the
/// current phase and moves the cursor. A full sweep is `7 * size` calls.
#[derive(Debug, Clone)]
pub struct ErosionSimulator {
    config: ErosionConfig,
    grid: ErosionGrid,
    noise: NoiseField,
    source: TerrainSource,
    cursor: SweepCursor,
    seed_drift: f32,
    sweeps_completed: u64,
}

impl ErosionSimulator {
    /// Allocates a `size` x `size` grid seeded from noise.
    pub fn new(config: ErosionConfig, size: usize) -> Result<Self, SimulationError> {
        Self::with_source(config, size, TerrainSource::Noise)
    }

    /// Allocates a grid over explicit row-major terrain heights.
    pub fn from_heights(config: ErosionConfig, size: usize, heights: Vec<f32>) -> Result<Self, SimulationError> {
        check_size(size)?;
        let expected = size * size;
        if heights.len() != expected {
            return Err(SimulationError::HeightCountMismatch {
                expected,
                actual: heights.len(),
            });
        }
        Self::with_source(config, size, TerrainSource::Heights(heights))
    }

    fn with_source(config: ErosionConfig, size: usize, source: TerrainSource) -> Result<Self, SimulationError> {
        check_size(size)?;
        let mut sim = Self {
            grid: ErosionGrid::new(size),
            noise: NoiseField::new(size, &config.noise()),
            config,
            source,
            cursor: SweepCursor::default(),
            seed_drift: 0.0,
            sweeps_completed: 0,
        };
        sim.reseed(size);
        Ok(sim)
    }

    /// Replaces the tunable constants. The grid and cursor are untouched.
    pub fn configure(&mut self, config: ErosionConfig) {
        self.noise = NoiseField::new(self.grid.size(), &config.noise());
        self.config = config;
    }

    /// Re-allocates the grid at a new size and seeds it from noise.
    pub fn initialize(&mut self, size: usize) -> Result<(), SimulationError> {
        check_size(size)?;
        self.noise = NoiseField::new(size, &self.config.noise());
        self.source = TerrainSource::Noise;
        self.reseed(size);
        Ok(())
    }

    /// Restores the initial terrain, dries the grid and rewinds the cursor.
    pub fn reset(&mut self) {
        self.reseed(self.grid.size());
    }

    fn reseed(&mut self, size: usize) {
        let heights = match &self.source {
            TerrainSource::Noise => generate_heightfield(size, &self.noise, self.config.height_amplitude).heights,
            TerrainSource::Heights(heights) => heights.clone(),
        };

        self.grid = ErosionGrid::with_terrain(size, heights);
        self.cursor = SweepCursor::default();
        self.seed_drift = 0.0;
        self.sweeps_completed = 0;

        log::info!(
            "Initialized {}x{} erosion grid ({} cells, max terrain {:.3})",
            size,
            size,
            self.grid.len(),
            self.grid.stats().max_terrain
        );
    }

    /// Processes one row of the current phase.
    ///
    /// `frame_dt` is the host frame time; it is scaled by `time_multiplier`.
    pub fn advance_row<S: HeightSink + ?Sized>(&mut self, frame_dt: f32, sink: &mut S) -> StepOutcome {
        if !sink.is_ready() {
            log::trace!("Sink not ready at {:?}", self.cursor);
            return StepOutcome::Waiting;
        }

        let dt = frame_dt * self.config.time_multiplier;
        let SweepCursor { phase, row } = self.cursor;

        if self.cursor.at_phase_start() {
            log::trace!("Entering phase {}", phase.name());
            match phase {
                Phase::Field => self.grid.water_layer_mut().snapshot(),
                Phase::Erode => self.grid.terrain_layer_mut().snapshot(),
                // Transport carries the post-erosion sediment, not the previous sweep's.
                Phase::Transport => self.grid.sediment_layer_mut().snapshot(),
                _ => {}
            }
        }

        match phase {
            Phase::Increment => {
                let origin = self.seed_position();
                hydraulics::rain_row(&mut self.grid, row, &self.noise, &self.config, origin, dt);
            }
            Phase::Fluxes => hydraulics::flux_row(&mut self.grid, row, &self.config, dt),
            Phase::Field => hydraulics::field_row(&mut self.grid, row, &self.config, dt),
            Phase::Erode => hydraulics::erode_row(&mut self.grid, row, &self.config),
            Phase::Transport => hydraulics::transport_row(&mut self.grid, row, dt),
            Phase::Evaporate => hydraulics::evaporate_row(&mut self.grid, row, &self.config, dt),
            Phase::Publish => hydraulics::publish_row(&self.grid, row, sink),
        }

        match self.cursor.advance(self.grid.size()) {
            CursorStep::Row => StepOutcome::Advanced,
            CursorStep::PhaseDone(Phase::Increment) => {
                self.seed_drift += self.config.seed_increment;
                StepOutcome::Advanced
            }
            CursorStep::PhaseDone(_) => StepOutcome::Advanced,
            CursorStep::SweepDone => {
                self.sweeps_completed += 1;
                sink.on_sweep_complete();
                if log::log_enabled!(log::Level::Debug) {
                    let stats = self.grid.stats();
                    log::debug!(
                        "Sweep {}: water {:.4}, terrain {:.4}, sediment {:.4}, max depth {:.4}",
                        self.sweeps_completed,
                        stats.total_water,
                        stats.total_terrain,
                        stats.total_sediment,
                        stats.max_water
                    );
                }
                StepOutcome::SweepComplete
            }
        }
    }

    /// Advances until the current sweep completes, or until the sink stops
    /// being ready (returns [`StepOutcome::Waiting`]).
    pub fn run_full_sweep<S: HeightSink + ?Sized>(&mut self, frame_dt: f32, sink: &mut S) -> StepOutcome {
        loop {
            match self.advance_row(frame_dt, sink) {
                StepOutcome::Advanced => continue,
                outcome => return outcome,
            }
        }
    }

    /// Runs up to `sweeps` full sweeps and returns how many completed.
    pub fn run_sweeps<S: HeightSink + ?Sized>(&mut self, sweeps: usize, frame_dt: f32, sink: &mut S) -> usize {
        for done in 0..sweeps {
            if self.run_full_sweep(frame_dt, sink) == StepOutcome::Waiting {
                return done;
            }
        }
        sweeps
    }

    pub fn config(&self) -> &ErosionConfig {
        &self.config
    }

    pub fn cursor(&self) -> SweepCursor {
        self.cursor
    }

    pub fn sweeps_completed(&self) -> u64 {
        self.sweeps_completed
    }

    /// Rain sampling origin: the noise seed, the grid size and the drift
    /// accumulated over completed increment phases.
    pub fn seed_position(&self) -> f32 {
        self.config.noise_seed + self.grid.size() as f32 + self.seed_drift
    }

    pub fn size(&self) -> usize {
        self.grid.size()
    }

    pub fn grid(&self) -> &ErosionGrid {
        &self.grid
    }

    pub fn grid_mut(&mut self) -> &mut ErosionGrid {
        &mut self.grid
    }

    pub fn cell(&self, x: usize, y: usize) -> Cell {
        self.grid.cell(x, y)
    }

    /// Adds water at a cell outside of the rain phase.
    pub fn add_water(&mut self, x: usize, y: usize, amount: f32) {
        self.grid.add_water(x, y, amount);
    }

    pub fn stats(&self) -> GridStats {
        self.grid.stats()
    }
}

fn check_size(size: usize) -> Result<(), SimulationError> {
    if size == 0 {
        Err(SimulationError::InvalidGridSize(size))
    } else {
        Ok(())
    }
}

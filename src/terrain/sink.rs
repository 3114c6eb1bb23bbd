//! The boundary between the simulator and whatever displays the terrain.

use super::heightfield::Heightfield;

/// Receives published vertex heights.
///
/// The simulator only advances while `is_ready` is true, writes every vertex
/// of a row during the publish phase, and calls `on_sweep_complete` once per
/// finished sweep so the receiver can rebuild derived data (meshes, textures).
pub trait HeightSink {
    /// Whether the receiver can accept more work.
    fn is_ready(&self) -> bool {
        true
    }

    fn set_height(&mut self, x: usize, y: usize, height: f32);

    fn on_sweep_complete(&mut self);
}

/// A [`HeightSink`] that keeps the published heights in a [`Heightfield`].
#[derive(Debug, Clone)]
pub struct HeightfieldRecorder {
    heightfield: Heightfield,
    /// Cleared to pause the simulator.
    pub ready: bool,
    pending_updates: usize,
    rebuilds: usize,
}

impl HeightfieldRecorder {
    pub fn new(size: usize) -> Self {
        Self {
            heightfield: Heightfield::new(size),
            ready: true,
            pending_updates: 0,
            rebuilds: 0,
        }
    }

    pub fn heightfield(&self) -> &Heightfield {
        &self.heightfield
    }

    pub fn into_heightfield(self) -> Heightfield {
        self.heightfield
    }

    /// Heights written since the last sweep completed.
    pub fn pending_updates(&self) -> usize {
        self.pending_updates
    }

    /// Number of sweep-complete notifications received.
    pub fn rebuilds(&self) -> usize {
        self.rebuilds
    }
}

impl HeightSink for HeightfieldRecorder {
    fn is_ready(&self) -> bool {
        self.ready
    }

    fn set_height(&mut self, x: usize, y: usize, height: f32) {
        self.heightfield.set(x, y, height);
        self.pending_updates += 1;
    }

    fn on_sweep_complete(&mut self) {
        log::trace!("rebuild after {} height updates", self.pending_updates);
        self.pending_updates = 0;
        self.rebuilds += 1;
    }
}

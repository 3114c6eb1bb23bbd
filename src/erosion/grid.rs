//! Erosion cell grid.
//!
//! Fields are stored as flat row-major arrays (`index = y * size + x`). Water,
//! sediment and terrain each keep a `previous` copy that the simulator refreshes
//! once per sweep right before the phase that must read pre-phase values.

use glam::Vec2;

/// Cardinal pipe direction. The discriminant is the slot in a cell's flux array.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    /// Toward `x - 1`.
    NegX = 0,
    /// Toward `x + 1`.
    PosX = 1,
    /// Toward `y - 1`.
    NegY = 2,
    /// Toward `y + 1`.
    PosY = 3,
}

impl Direction {
    /// All directions in flux-slot order.
    pub const ALL: [Direction; 4] = [Direction::NegX, Direction::PosX, Direction::NegY, Direction::PosY];

    /// Flux array slot.
    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }

    /// Grid offset `(dx, dy)`.
    #[inline]
    pub fn offset(self) -> (isize, isize) {
        match self {
            Direction::NegX => (-1, 0),
            Direction::PosX => (1, 0),
            Direction::NegY => (0, -1),
            Direction::PosY => (0, 1),
        }
    }

    /// The direction pointing back at the origin cell.
    #[inline]
    pub fn opposite(self) -> Direction {
        match self {
            Direction::NegX => Direction::PosX,
            Direction::PosX => Direction::NegX,
            Direction::NegY => Direction::PosY,
            Direction::PosY => Direction::NegY,
        }
    }
}

/// A scalar field with the value it held at the last snapshot.
#[derive(Debug, Clone, PartialEq)]
pub struct Layer {
    current: Vec<f32>,
    previous: Vec<f32>,
}

impl Layer {
    fn zeroed(len: usize) -> Self {
        Self {
            current: vec![0.0; len],
            previous: vec![0.0; len],
        }
    }

    fn from_values(values: Vec<f32>) -> Self {
        Self {
            previous: values.clone(),
            current: values,
        }
    }

    /// Copies `current` into `previous`.
    pub fn snapshot(&mut self) {
        self.previous.copy_from_slice(&self.current);
    }

    pub fn current(&self) -> &[f32] {
        &self.current
    }
}

/// Value snapshot of a single cell.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Cell {
    pub terrain_height: f32,
    pub water_height: f32,
    pub last_water_height: f32,
    pub suspended_sediment: f32,
    pub last_suspended_sediment: f32,
    /// Pipe discharge in `Direction` slot order.
    pub outflow_flux: [f32; 4],
    pub velocity: Vec2,
}

/// Totals over the whole grid, used for logging and conservation checks.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct GridStats {
    pub total_terrain: f64,
    pub total_water: f64,
    pub total_sediment: f64,
    pub max_water: f32,
    pub max_terrain: f32,
}

/// Square grid of erosion cells.
#[derive(Debug, Clone, PartialEq)]
pub struct ErosionGrid {
    size: usize,
    terrain: Layer,
    water: Layer,
    sediment: Layer,
    flux: Vec<[f32; 4]>,
    velocity: Vec<Vec2>,
}

/// Clamps a terrain write.
#[inline]
pub(crate) fn sanitize_terrain(value: f32) -> f32 {
    value.max(0.0)
}

/// Clamps a water write and maps NaN to zero.
#[inline]
pub(crate) fn sanitize_water(value: f32) -> f32 {
    if value.is_nan() {
        0.0
    } else {
        value.max(0.0)
    }
}

impl ErosionGrid {
    /// Creates a flat, dry grid. `size` must be non-zero; the simulator checks this.
    pub fn new(size: usize) -> Self {
        let len = size * size;
        Self {
            size,
            terrain: Layer::zeroed(len),
            water: Layer::zeroed(len),
            sediment: Layer::zeroed(len),
            flux: vec![[0.0; 4]; len],
            velocity: vec![Vec2::ZERO; len],
        }
    }

    /// Creates a dry grid over the given row-major terrain heights.
    ///
    /// Negative heights are clamped like any other terrain write.
    pub(crate) fn with_terrain(size: usize, heights: Vec<f32>) -> Self {
        debug_assert_eq!(heights.len(), size * size);
        let mut grid = Self::new(size);
        grid.terrain = Layer::from_values(heights.into_iter().map(sanitize_terrain).collect());
        grid
    }

    /// Side length.
    #[inline]
    pub fn size(&self) -> usize {
        self.size
    }

    /// Number of cells.
    #[inline]
    pub fn len(&self) -> usize {
        self.size * self.size
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    /// Row-major index.
    ///
    /// # Panics
    ///
    /// Panics if `x` or `y` is outside the grid.
    #[inline]
    pub fn index(&self, x: usize, y: usize) -> usize {
        assert!(
            x < self.size && y < self.size,
            "cell ({x}, {y}) is outside a {0}x{0} grid",
            self.size
        );
        y * self.size + x
    }

    /// Returns true if signed coordinates fall inside the grid.
    #[inline]
    pub fn in_bounds(&self, x: isize, y: isize) -> bool {
        x >= 0 && y >= 0 && (x as usize) < self.size && (y as usize) < self.size
    }

    /// Neighbor coordinates in `dir`, or `None` past the edge. Never wraps.
    #[inline]
    pub fn neighbor(&self, x: usize, y: usize, dir: Direction) -> Option<(usize, usize)> {
        let (dx, dy) = dir.offset();
        let nx = x as isize + dx;
        let ny = y as isize + dy;
        if self.in_bounds(nx, ny) {
            Some((nx as usize, ny as usize))
        } else {
            None
        }
    }

    /// Neighbor index in `dir`, or `None` past the edge.
    #[inline]
    pub fn neighbor_index(&self, x: usize, y: usize, dir: Direction) -> Option<usize> {
        self.neighbor(x, y, dir).map(|(nx, ny)| self.index(nx, ny))
    }

    // --- terrain ---

    pub fn terrain_height(&self, x: usize, y: usize) -> f32 {
        self.terrain.current[self.index(x, y)]
    }

    pub fn set_terrain_height(&mut self, x: usize, y: usize, height: f32) {
        let i = self.index(x, y);
        self.terrain.current[i] = sanitize_terrain(height);
    }

    /// Terrain as of the last snapshot (start of the erosion phase).
    pub fn last_terrain_height(&self, x: usize, y: usize) -> f32 {
        self.terrain.previous[self.index(x, y)]
    }

    // --- water ---

    pub fn water_height(&self, x: usize, y: usize) -> f32 {
        self.water.current[self.index(x, y)]
    }

    pub fn set_water_height(&mut self, x: usize, y: usize, height: f32) {
        let i = self.index(x, y);
        self.water.current[i] = sanitize_water(height);
    }

    /// Water as of the last snapshot (start of the field update).
    pub fn last_water_height(&self, x: usize, y: usize) -> f32 {
        self.water.previous[self.index(x, y)]
    }

    /// Adds water to one cell, e.g. a spring or manual forcing.
    pub fn add_water(&mut self, x: usize, y: usize, amount: f32) {
        let i = self.index(x, y);
        self.water.current[i] = sanitize_water(self.water.current[i] + amount);
    }

    // --- sediment ---

    pub fn suspended_sediment(&self, x: usize, y: usize) -> f32 {
        self.sediment.current[self.index(x, y)]
    }

    /// Sediment writes are not clamped.
    pub fn set_suspended_sediment(&mut self, x: usize, y: usize, amount: f32) {
        let i = self.index(x, y);
        self.sediment.current[i] = amount;
    }

    /// Sediment as of the last snapshot (start of transport).
    pub fn last_suspended_sediment(&self, x: usize, y: usize) -> f32 {
        self.sediment.previous[self.index(x, y)]
    }

    // --- flux / velocity ---

    pub fn outflow_flux(&self, x: usize, y: usize) -> [f32; 4] {
        self.flux[self.index(x, y)]
    }

    pub fn set_outflow_flux(&mut self, x: usize, y: usize, flux: [f32; 4]) {
        let i = self.index(x, y);
        self.flux[i] = flux.map(|f| f.max(0.0));
    }

    pub fn velocity(&self, x: usize, y: usize) -> Vec2 {
        self.velocity[self.index(x, y)]
    }

    /// Value snapshot of one cell.
    pub fn cell(&self, x: usize, y: usize) -> Cell {
        let i = self.index(x, y);
        Cell {
            terrain_height: self.terrain.current[i],
            water_height: self.water.current[i],
            last_water_height: self.water.previous[i],
            suspended_sediment: self.sediment.current[i],
            last_suspended_sediment: self.sediment.previous[i],
            outflow_flux: self.flux[i],
            velocity: self.velocity[i],
        }
    }

    // --- whole-field access ---

    pub fn terrain(&self) -> &[f32] {
        self.terrain.current()
    }

    pub fn water(&self) -> &[f32] {
        self.water.current()
    }

    pub fn sediment(&self) -> &[f32] {
        self.sediment.current()
    }

    pub fn fluxes(&self) -> &[[f32; 4]] {
        &self.flux
    }

    pub(crate) fn terrain_layer_mut(&mut self) -> &mut Layer {
        &mut self.terrain
    }

    pub(crate) fn water_layer_mut(&mut self) -> &mut Layer {
        &mut self.water
    }

    pub(crate) fn sediment_layer_mut(&mut self) -> &mut Layer {
        &mut self.sediment
    }

    /// Writes a cell's velocity.
    pub(crate) fn set_velocity(&mut self, x: usize, y: usize, velocity: Vec2) {
        let i = self.index(x, y);
        self.velocity[i] = velocity;
    }

    /// Whole-grid totals.
    pub fn stats(&self) -> GridStats {
        let mut stats = GridStats::default();
        for i in 0..self.len() {
            let h = self.terrain.current[i];
            let w = self.water.current[i];
            stats.total_terrain += h as f64;
            stats.total_water += w as f64;
            stats.total_sediment += self.sediment.current[i] as f64;
            stats.max_water = stats.max_water.max(w);
            stats.max_terrain = stats.max_terrain.max(h);
        }
        stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_direction_roundtrip() {
        for dir in Direction::ALL {
            assert_eq!(dir.opposite().opposite(), dir);
            let (dx, dy) = dir.offset();
            let (ox, oy) = dir.opposite().offset();
            assert_eq!((dx + ox, dy + oy), (0, 0));
        }
        assert_eq!(Direction::ALL.map(Direction::index), [0, 1, 2, 3]);
    }

    #[test]
    fn test_neighbors_never_wrap() {
        let grid = ErosionGrid::new(4);
        assert_eq!(grid.neighbor(0, 0, Direction::NegX), None);
        assert_eq!(grid.neighbor(0, 0, Direction::NegY), None);
        assert_eq!(grid.neighbor(3, 3, Direction::PosX), None);
        assert_eq!(grid.neighbor(3, 3, Direction::PosY), None);
        assert_eq!(grid.neighbor(1, 2, Direction::PosX), Some((2, 2)));
        assert_eq!(grid.neighbor(1, 2, Direction::NegY), Some((1, 1)));
        assert_eq!(grid.neighbor_index(1, 2, Direction::PosY), Some(grid.index(1, 3)));
    }

    #[test]
    fn test_writes_are_sanitized() {
        let mut grid = ErosionGrid::new(2);
        grid.set_terrain_height(0, 0, -3.0);
        grid.set_water_height(1, 0, -0.5);
        grid.set_water_height(0, 1, f32::NAN);
        grid.set_suspended_sediment(1, 1, -0.25);

        assert_eq!(grid.terrain_height(0, 0), 0.0);
        assert_eq!(grid.water_height(1, 0), 0.0);
        assert_eq!(grid.water_height(0, 1), 0.0);
        // Sediment writes are plain assignments.
        assert_eq!(grid.suspended_sediment(1, 1), -0.25);
    }

    #[test]
    fn test_snapshot_keeps_previous_value() {
        let mut grid = ErosionGrid::new(3);
        grid.set_water_height(1, 1, 2.0);
        grid.water_layer_mut().snapshot();
        grid.set_water_height(1, 1, 0.5);

        let cell = grid.cell(1, 1);
        assert_eq!(cell.water_height, 0.5);
        assert_eq!(cell.last_water_height, 2.0);
    }

    #[test]
    fn test_with_terrain_clamps_and_stats() {
        let grid = ErosionGrid::with_terrain(2, vec![1.0, -2.0, 3.0, 4.0]);
        assert_eq!(grid.terrain(), &[1.0, 0.0, 3.0, 4.0]);
        let stats = grid.stats();
        assert_eq!(stats.total_terrain, 8.0);
        assert_eq!(stats.max_terrain, 4.0);
        assert_eq!(stats.total_water, 0.0);
    }

    #[test]
    #[should_panic(expected = "outside a 4x4 grid")]
    fn test_out_of_bounds_read_panics() {
        let grid = ErosionGrid::new(4);
        grid.terrain_height(4, 0);
    }

    #[test]
    #[should_panic(expected = "outside a 4x4 grid")]
    fn test_out_of_bounds_write_panics() {
        let mut grid = ErosionGrid::new(4);
        grid.set_water_height(0, 4, 1.0);
    }
}

//! Per-cell math of the pipe-model erosion passes.
//!
//! Each `*_row` function processes one grid row for one phase. Within a phase a
//! cell only writes its own state and only reads neighbor values that no other
//! cell writes during that phase (or their snapshots), so rows can be processed
//! in any order.

use glam::Vec2;

use crate::erosion::grid::{Direction, ErosionGrid};
use crate::erosion::ErosionConfig;
use crate::noise::NoiseField;
use crate::terrain::HeightSink;

/// Upper bound applied to the slope term of the transport capacity.
pub const MAX_SLOPE_ANGLE: f32 = 65.0;

/// Water + terrain at a cell.
#[inline]
fn hydraulic_head(grid: &ErosionGrid, x: usize, y: usize) -> f32 {
    grid.terrain_height(x, y) + grid.water_height(x, y)
}

// --- Pass 1: rainfall ---

/// Adds rain to every cell of row `y` whose mask sample exceeds the threshold.
///
/// `origin` is the drifting rain sampling offset; the mask is sampled at
/// `+origin` and the intensity at `-origin`.
pub fn rain_row(
    grid: &mut ErosionGrid,
    y: usize,
    noise: &NoiseField,
    config: &ErosionConfig,
    origin: f32,
    dt: f32,
) {
    let fy = y as f32;
    for x in 0..grid.size() {
        let fx = x as f32;
        if noise.sample(fx + origin, fy + origin) > config.rain_threshold {
            let intensity = (noise.sample(fx - origin, fy - origin) * config.rain_multiplier).max(0.0);
            grid.add_water(x, y, dt * intensity);
        }
    }
}

// --- Pass 2: outflow flux ---

/// Head difference toward `dir`, or 0 past the edge.
pub fn head_difference(grid: &ErosionGrid, x: usize, y: usize, dir: Direction) -> f32 {
    match grid.neighbor(x, y, dir) {
        Some((nx, ny)) => hydraulic_head(grid, x, y) - hydraulic_head(grid, nx, ny),
        None => 0.0,
    }
}

/// Scales `flux` so its sum never exceeds `volume`. Zero total outflow is left alone.
pub fn scale_outflow(flux: &mut [f32; 4], volume: f32) {
    let total: f32 = flux.iter().sum();
    if total > 0.0 {
        let k = (volume / total).min(1.0);
        for f in flux.iter_mut() {
            *f *= k;
        }
    }
}

/// New scaled outflow flux of one cell.
pub fn outflow_flux(grid: &ErosionGrid, x: usize, y: usize, config: &ErosionConfig, dt: f32) -> [f32; 4] {
    let area = config.pipe_area();
    let gain = dt * area * config.gravity / config.pipe_length;

    let mut flux = grid.outflow_flux(x, y);
    for dir in Direction::ALL {
        let diff = head_difference(grid, x, y, dir);
        flux[dir.index()] = (flux[dir.index()] + gain * diff).max(0.0);
    }

    scale_outflow(&mut flux, grid.water_height(x, y) * area);
    flux
}

pub fn flux_row(grid: &mut ErosionGrid, y: usize, config: &ErosionConfig, dt: f32) {
    for x in 0..grid.size() {
        let flux = outflow_flux(grid, x, y, config, dt);
        grid.set_outflow_flux(x, y, flux);
    }
}

// --- Pass 3: water field ---

/// Sum of the neighbors' flux pointing at `(x, y)`.
pub fn inflow(grid: &ErosionGrid, x: usize, y: usize) -> f32 {
    let fluxes = grid.fluxes();
    Direction::ALL
        .iter()
        .filter_map(|&dir| {
            grid.neighbor_index(x, y, dir)
                .map(|n| fluxes[n][dir.opposite().index()])
        })
        .sum()
}

pub fn field_row(grid: &mut ErosionGrid, y: usize, config: &ErosionConfig, dt: f32) {
    let area = config.pipe_area();
    for x in 0..grid.size() {
        let outflow: f32 = grid.outflow_flux(x, y).iter().sum();
        let delta_volume = dt * (inflow(grid, x, y) - outflow);
        let water = grid.water_height(x, y) + delta_volume / area;
        grid.set_water_height(x, y, water);
    }
}

// --- Pass 4: velocity + erosion/deposition ---

/// Net water passing through the cell along each axis (positive toward `+x`/`+y`).
pub fn flow_differential(grid: &ErosionGrid, x: usize, y: usize) -> Vec2 {
    let fluxes = grid.fluxes();
    let own = grid.outflow_flux(x, y);

    let axis = |neg: Direction, pos: Direction| -> f32 {
        let from_neg = grid
            .neighbor_index(x, y, neg)
            .map_or(0.0, |n| fluxes[n][pos.index()]);
        let from_pos = grid
            .neighbor_index(x, y, pos)
            .map_or(0.0, |n| fluxes[n][neg.index()]);
        from_neg - own[neg.index()] + own[pos.index()] - from_pos
    };

    Vec2::new(
        axis(Direction::NegX, Direction::PosX),
        axis(Direction::NegY, Direction::PosY),
    )
}

/// Water velocity from the flow differential and the mean of the water height
/// before and after the field update. Dry cells have zero velocity.
pub fn cell_velocity(grid: &ErosionGrid, x: usize, y: usize, config: &ErosionConfig) -> Vec2 {
    let mean_depth = 0.5 * (grid.last_water_height(x, y) + grid.water_height(x, y));
    if mean_depth <= 0.0 || config.pipe_length <= 0.0 {
        return Vec2::ZERO;
    }

    let velocity = flow_differential(grid, x, y) / config.pipe_length / mean_depth;
    if velocity.is_finite() {
        velocity
    } else {
        Vec2::ZERO
    }
}

/// Local tilt term from central differences of the pre-erosion terrain.
///
/// Cells without all four neighbors are treated as flat. The result of
/// `|g| / sqrt(1 + |g|^2)` stays below 1, so the cap at [`MAX_SLOPE_ANGLE`]
/// is kept only as an upper bound.
pub fn slope_angle(grid: &ErosionGrid, x: usize, y: usize) -> f32 {
    let size = grid.size();
    if x == 0 || y == 0 || x + 1 >= size || y + 1 >= size {
        return 0.0;
    }

    let dx = 0.5 * (grid.last_terrain_height(x + 1, y) - grid.last_terrain_height(x - 1, y));
    let dy = 0.5 * (grid.last_terrain_height(x, y + 1) - grid.last_terrain_height(x, y - 1));
    let g2 = dx * dx + dy * dy;
    let angle = g2.sqrt() / (1.0 + g2).sqrt();
    angle.min(MAX_SLOPE_ANGLE)
}

/// Sediment the water can hold at this slope and speed.
#[inline]
pub fn transport_capacity(config: &ErosionConfig, angle: f32, velocity: Vec2) -> f32 {
    (config.sediment_capacity * angle * velocity.length()).max(config.minimum_capacity)
}

/// Moves material between terrain and suspension toward `capacity`.
///
/// Returns the new `(terrain, sediment)` pair. Dissolution never takes more
/// terrain than the cell has, so both sides change by the same amount.
pub fn exchange_sediment(config: &ErosionConfig, terrain: f32, sediment: f32, capacity: f32) -> (f32, f32) {
    if sediment < capacity {
        let dissolved = (config.dissolving_rate * (capacity - sediment)).min(terrain);
        (terrain - dissolved, sediment + dissolved)
    } else {
        let deposited = config.deposition_rate * (sediment - capacity);
        (terrain + deposited, sediment - deposited)
    }
}

pub fn erode_row(grid: &mut ErosionGrid, y: usize, config: &ErosionConfig) {
    for x in 0..grid.size() {
        let velocity = cell_velocity(grid, x, y, config);
        grid.set_velocity(x, y, velocity);

        let capacity = transport_capacity(config, slope_angle(grid, x, y), velocity);
        let (terrain, sediment) = exchange_sediment(
            config,
            grid.terrain_height(x, y),
            grid.suspended_sediment(x, y),
            capacity,
        );
        grid.set_terrain_height(x, y, terrain);
        grid.set_suspended_sediment(x, y, sediment);
    }
}

// --- Pass 5: sediment transport ---

/// Nearest cell to the back-traced position `(x, y) - velocity * dt`, clamped to the grid.
pub fn upstream_cell(size: usize, x: usize, y: usize, velocity: Vec2, dt: f32) -> (usize, usize) {
    let last = size.saturating_sub(1) as f32;
    let trace = |p: usize, v: f32| -> usize {
        let src = (p as f32 - v * dt).round();
        if src.is_finite() {
            src.clamp(0.0, last) as usize
        } else {
            p
        }
    };
    (trace(x, velocity.x), trace(y, velocity.y))
}

pub fn transport_row(grid: &mut ErosionGrid, y: usize, dt: f32) {
    let size = grid.size();
    for x in 0..size {
        let (sx, sy) = upstream_cell(size, x, y, grid.velocity(x, y), dt);
        let carried = grid.last_suspended_sediment(sx, sy);
        grid.set_suspended_sediment(x, y, carried);
    }
}

// --- Pass 6: evaporation ---

pub fn evaporate_row(grid: &mut ErosionGrid, y: usize, config: &ErosionConfig, dt: f32) {
    let retained = 1.0 - config.evaporation_rate * dt;
    for x in 0..grid.size() {
        let water = grid.water_height(x, y) * retained;
        grid.set_water_height(x, y, water);
    }
}

// --- Pass 7: publish ---

/// Mean terrain height of the cells sharing the corner at `(x, y)`:
/// `(x-1, y-1)`, `(x, y-1)`, `(x-1, y)` and `(x, y)`, skipping those off the grid.
pub fn vertex_height(grid: &ErosionGrid, x: usize, y: usize) -> f32 {
    let xs = x.checked_sub(1).into_iter().chain(std::iter::once(x));
    let mut total = 0.0f32;
    let mut count = 0u32;
    for cx in xs {
        for cy in y.checked_sub(1).into_iter().chain(std::iter::once(y)) {
            total += grid.terrain_height(cx, cy);
            count += 1;
        }
    }
    total / count as f32
}

pub fn publish_row<S: HeightSink + ?Sized>(grid: &ErosionGrid, y: usize, sink: &mut S) {
    for x in 0..grid.size() {
        sink.set_height(x, y, vertex_height(grid, x, y));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flat(size: usize) -> ErosionGrid {
        ErosionGrid::new(size)
    }

    #[test]
    fn test_rain_mask_leaves_some_cells_dry() {
        let size = 32;
        let mut grid = flat(size);
        let config = ErosionConfig::default();
        let noise = NoiseField::new(size, &config.noise());
        for y in 0..size {
            rain_row(&mut grid, y, &noise, &config, 0.0, 1.0);
        }

        let wet = grid.water().iter().filter(|&&w| w > 0.0).count();
        assert!(wet > 0, "rain should reach cells above the threshold");
        assert!(wet < size * size, "rain should skip cells below the threshold");
        assert!(grid.water().iter().all(|&w| w <= 0.5 * config.rain_multiplier));
    }

    #[test]
    fn test_head_difference_zero_past_edge() {
        let mut grid = flat(3);
        grid.set_water_height(0, 0, 5.0);
        grid.set_terrain_height(2, 2, 7.0);

        assert_eq!(head_difference(&grid, 0, 0, Direction::NegX), 0.0);
        assert_eq!(head_difference(&grid, 0, 0, Direction::NegY), 0.0);
        assert_eq!(head_difference(&grid, 2, 2, Direction::PosX), 0.0);
        assert_eq!(head_difference(&grid, 2, 2, Direction::PosY), 0.0);
        assert_eq!(head_difference(&grid, 0, 0, Direction::PosX), 5.0);
    }

    #[test]
    fn test_edge_cell_never_flows_off_grid() {
        let mut grid = flat(4);
        grid.set_water_height(0, 1, 3.0);
        let config = ErosionConfig::default();

        let flux = outflow_flux(&grid, 0, 1, &config, 0.1);
        assert_eq!(flux[Direction::NegX.index()], 0.0);
        assert!(flux[Direction::PosX.index()] > 0.0);
        assert!(flux[Direction::NegY.index()] > 0.0);
        assert!(flux[Direction::PosY.index()] > 0.0);
    }

    #[test]
    fn test_scale_outflow_bounds_total() {
        let mut flux = [4.0, 2.0, 1.0, 1.0];
        scale_outflow(&mut flux, 2.0);
        let total: f32 = flux.iter().sum();
        assert!((total - 2.0).abs() < 1e-6);
        assert!((flux[0] / flux[1] - 2.0).abs() < 1e-6, "scaling keeps proportions");

        let mut small = [0.1, 0.0, 0.0, 0.1];
        scale_outflow(&mut small, 5.0);
        assert_eq!(small, [0.1, 0.0, 0.0, 0.1]);

        let mut none = [0.0; 4];
        scale_outflow(&mut none, 0.0);
        assert_eq!(none, [0.0; 4]);
    }

    #[test]
    fn test_inflow_reads_flux_toward_cell() {
        let mut grid = flat(3);
        grid.set_outflow_flux(0, 1, [0.0, 1.0, 0.0, 0.0]); // left neighbor, toward +x
        grid.set_outflow_flux(2, 1, [2.0, 0.0, 0.0, 0.0]); // right neighbor, toward -x
        grid.set_outflow_flux(1, 0, [0.0, 0.0, 0.0, 3.0]); // upper neighbor, toward +y
        grid.set_outflow_flux(1, 2, [0.0, 0.0, 4.0, 0.0]); // lower neighbor, toward -y
        // Flux pointing away from (1, 1) must be ignored.
        grid.set_outflow_flux(0, 1, [9.0, 1.0, 9.0, 9.0]);

        assert_eq!(inflow(&grid, 1, 1), 10.0);
    }

    #[test]
    fn test_velocity_zero_when_dry() {
        let mut grid = flat(3);
        grid.set_outflow_flux(0, 1, [0.0, 1.0, 0.0, 0.0]);
        let v = cell_velocity(&grid, 1, 1, &ErosionConfig::default());
        assert_eq!(v, Vec2::ZERO);
    }

    #[test]
    fn test_velocity_follows_flow() {
        let mut grid = flat(3);
        grid.set_water_height(1, 1, 1.0);
        grid.water_layer_mut().snapshot();
        grid.set_outflow_flux(0, 1, [0.0, 0.5, 0.0, 0.0]);
        grid.set_outflow_flux(1, 1, [0.0, 0.5, 0.0, 0.0]);

        let config = ErosionConfig::default();
        let v = cell_velocity(&grid, 1, 1, &config);
        // (0.5 + 0.5) / pipe_length / mean depth
        assert!((v.x - 2.0).abs() < 1e-6);
        assert_eq!(v.y, 0.0);
    }

    #[test]
    fn test_slope_angle_flat_at_border() {
        let mut grid = ErosionGrid::with_terrain(4, (0..16).map(|i| (i % 4) as f32 * 10.0).collect());
        grid.terrain_layer_mut().snapshot();
        assert_eq!(slope_angle(&grid, 0, 1), 0.0);
        assert_eq!(slope_angle(&grid, 1, 0), 0.0);
        assert_eq!(slope_angle(&grid, 3, 2), 0.0);

        // dx = 10, dy = 0 -> 10 / sqrt(101)
        let interior = slope_angle(&grid, 1, 1);
        assert!((interior - 10.0 / 101.0f32.sqrt()).abs() < 1e-6);
        assert!(interior < 1.0);
    }

    #[test]
    fn test_capacity_floor() {
        let config = ErosionConfig::default();
        assert_eq!(transport_capacity(&config, 0.0, Vec2::new(3.0, 4.0)), config.minimum_capacity);
        let c = transport_capacity(&config, 0.5, Vec2::new(3.0, 4.0));
        assert!((c - 0.1 * 0.5 * 5.0).abs() < 1e-6);
    }

    #[test]
    fn test_exchange_moves_equal_amounts() {
        let config = ErosionConfig::default();

        let (h, s) = exchange_sediment(&config, 10.0, 0.0, 1.0);
        assert!((h - 9.9).abs() < 1e-6);
        assert!((s - 0.1).abs() < 1e-6);

        let (h, s) = exchange_sediment(&config, 10.0, 2.0, 1.0);
        assert!((h - 10.1).abs() < 1e-6);
        assert!((s - 1.9).abs() < 1e-6);

        // Bare rock cannot be dissolved below zero.
        let (h, s) = exchange_sediment(&config, 0.02, 0.0, 1.0);
        assert_eq!(h, 0.0);
        assert!((s - 0.02).abs() < 1e-7);
    }

    #[test]
    fn test_upstream_cell_clamps() {
        assert_eq!(upstream_cell(4, 1, 1, Vec2::new(1.0, 0.0), 1.0), (0, 1));
        assert_eq!(upstream_cell(4, 1, 1, Vec2::new(-1.0, -1.0), 1.0), (2, 2));
        assert_eq!(upstream_cell(4, 0, 3, Vec2::new(50.0, -50.0), 1.0), (0, 3));
        assert_eq!(upstream_cell(4, 2, 2, Vec2::new(0.2, -0.2), 1.0), (2, 2));
        assert_eq!(upstream_cell(4, 2, 2, Vec2::new(f32::NAN, 0.0), 1.0), (2, 2));
    }

    #[test]
    fn test_vertex_height_interior_edge_corner() {
        let grid = ErosionGrid::with_terrain(3, vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0]);

        // Corner: only the cell itself.
        assert_eq!(vertex_height(&grid, 0, 0), 1.0);
        // Top edge: (0,0) and (1,0).
        assert_eq!(vertex_height(&grid, 1, 0), 1.5);
        // Interior: (0,0), (1,0), (0,1), (1,1).
        assert_eq!(vertex_height(&grid, 1, 1), (1.0 + 2.0 + 4.0 + 5.0) / 4.0);
        assert_eq!(vertex_height(&grid, 2, 2), (5.0 + 6.0 + 8.0 + 9.0) / 4.0);
    }

    #[test]
    fn test_evaporation_scales_water() {
        let mut grid = flat(2);
        grid.set_water_height(1, 0, 2.0);
        let config = ErosionConfig {
            evaporation_rate: 0.25,
            ..Default::default()
        };
        evaporate_row(&mut grid, 0, &config, 2.0);
        assert_eq!(grid.water_height(1, 0), 1.0);

        // Over-evaporation clamps to dry instead of going negative.
        evaporate_row(&mut grid, 0, &config, 8.0);
        assert_eq!(grid.water_height(1, 0), 0.0);
    }
}

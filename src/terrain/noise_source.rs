//! A Perlin-heightmap terrain source for tests and examples.

use std::collections::HashMap;
use std::rc::Rc;

use cgmath::Point2;
use noise::{NoiseFn, Perlin};

use crate::meshing::region::DEFAULT_TILE_SIZE;
use crate::terrain::source::{TerrainSource, TileId};
use crate::terrain::tiler::Tiler;

/// Scaling factor applied to grid coordinates when sampling the noise.
const NOISE_SCALE_FACTOR: f64 = 0.02;

/// Default height amplitude in world units.
const NOISE_AMPLITUDE: f32 = 8.0;

/// A minimal world backed by seeded Perlin noise: rolling corner heights,
/// one uniform terrain type, and whatever handlers the caller registers.
pub struct NoiseSource {
    perlin: Perlin,
    scale: f64,
    amplitude: f32,
    tile_size: f32,
    base: TileId,
    tilers: HashMap<TileId, Rc<dyn Tiler>>,
}

impl NoiseSource {
    /// Creates a source with the default scale and amplitude.
    pub fn new(seed: u32) -> Self {
        NoiseSource {
            perlin: Perlin::new(seed),
            scale: NOISE_SCALE_FACTOR,
            amplitude: NOISE_AMPLITUDE,
            tile_size: DEFAULT_TILE_SIZE,
            base: 0,
            tilers: HashMap::new(),
        }
    }

    /// Overrides the uniform terrain type reported for every tile.
    pub fn with_terrain(mut self, base: TileId) -> Self {
        self.base = base;
        self
    }

    /// Overrides noise frequency and height amplitude.
    pub fn with_relief(mut self, scale: f64, amplitude: f32) -> Self {
        self.scale = scale;
        self.amplitude = amplitude;
        self
    }

    /// Registers the handler for a terrain type.
    pub fn register(&mut self, id: TileId, tiler: Rc<dyn Tiler>) {
        self.tilers.insert(id, tiler);
    }

    fn sample(&self, gx: f64, gy: f64) -> f32 {
        self.perlin.get([gx * self.scale, gy * self.scale]) as f32 * self.amplitude
    }
}

impl TerrainSource for NoiseSource {
    fn corner_height(&self, gc: Point2<i32>) -> f32 {
        self.sample(gc.x as f64, gc.y as f64)
    }

    fn height_at(&self, wc: Point2<f32>) -> f32 {
        self.sample(
            (wc.x / self.tile_size) as f64,
            (wc.y / self.tile_size) as f64,
        )
    }

    fn tile_at(&self, _gc: Point2<i32>) -> TileId {
        self.base
    }

    fn tiler(&self, id: TileId) -> Option<Rc<dyn Tiler>> {
        self.tilers.get(&id).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn heights_are_deterministic_per_seed() {
        let a = NoiseSource::new(42);
        let b = NoiseSource::new(42);
        let c = NoiseSource::new(43);
        let gc = Point2::new(17, -4);
        assert_eq!(a.corner_height(gc), b.corner_height(gc));
        assert_ne!(a.corner_height(gc), c.corner_height(gc));
    }

    #[test]
    fn map_sampling_matches_grid_corners() {
        let s = NoiseSource::new(1);
        let grid = s.corner_height(Point2::new(3, 2));
        let map = s.height_at(Point2::new(3.0 * DEFAULT_TILE_SIZE, 2.0 * DEFAULT_TILE_SIZE));
        assert!((grid - map).abs() < 1e-6);
    }
}

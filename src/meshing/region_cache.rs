//! LRU store of built regions.
//!
//! The world is meshed in fixed-size cuts; consumers that pan across it
//! keep a bounded working set of built regions and rebuild on re-entry.
//! Eviction releases a region's buffers when the cache holds the last
//! reference; otherwise the region is dropped from the cache but left
//! intact, since a renderer may still be reading it.

use std::num::NonZeroUsize;
use std::rc::Rc;

use cgmath::Point2;
use lru::LruCache;

use crate::core::rng::fold_coord;
use crate::error::BuildResult;
use crate::meshing::region::{BuildParams, Region};
use crate::terrain::source::TerrainSource;

/// Fixed-grid LRU cache of built regions.
pub struct RegionCache {
    region_sz: Point2<i32>,
    tile_size: f32,
    seed: u64,
    cache: LruCache<(i32, i32), Rc<Region>>,
}

impl RegionCache {
    /// Creates a cache of up to `capacity` regions of `region_sz` tiles.
    ///
    /// Each region's build seed is folded from `seed` and its cut
    /// coordinate, so the whole world is reproducible from one value.
    pub fn new(region_sz: Point2<i32>, tile_size: f32, seed: u64, capacity: NonZeroUsize) -> Self {
        RegionCache {
            region_sz,
            tile_size,
            seed,
            cache: LruCache::new(capacity),
        }
    }

    /// The built region at cut coordinate `cut`, building it on a miss.
    pub fn get(&mut self, source: &dyn TerrainSource, cut: Point2<i32>) -> BuildResult<Rc<Region>> {
        if let Some(r) = self.cache.get(&(cut.x, cut.y)) {
            return Ok(r.clone());
        }
        let params = BuildParams {
            seed: fold_coord(self.seed, cut),
            ul: Point2::new(cut.x * self.region_sz.x, cut.y * self.region_sz.y),
            sz: self.region_sz,
            tile_size: self.tile_size,
        };
        let region = Rc::new(Region::build_with(source, &params)?);
        if let Some((evicted_key, evicted)) = self.cache.push((cut.x, cut.y), region.clone()) {
            if evicted_key != (cut.x, cut.y) {
                release_evicted(evicted);
            }
        }
        Ok(region)
    }

    /// The built region containing global tile `tc`.
    pub fn region_at(
        &mut self,
        source: &dyn TerrainSource,
        tc: Point2<i32>,
    ) -> BuildResult<Rc<Region>> {
        let cut = Point2::new(
            tc.x.div_euclid(self.region_sz.x),
            tc.y.div_euclid(self.region_sz.y),
        );
        self.get(source, cut)
    }

    /// The region at `cut` if it is currently cached, without building.
    pub fn peek(&self, cut: Point2<i32>) -> Option<Rc<Region>> {
        self.cache.peek(&(cut.x, cut.y)).cloned()
    }

    /// Number of cached regions.
    pub fn len(&self) -> usize {
        self.cache.len()
    }

    /// Whether the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }

    /// Drops every cached region, releasing those the cache uniquely owns.
    pub fn clear(&mut self) {
        while let Some((_, r)) = self.cache.pop_lru() {
            release_evicted(r);
        }
    }
}

fn release_evicted(region: Rc<Region>) {
    match Rc::try_unwrap(region) {
        Ok(mut r) => r.release(),
        Err(r) => log::warn!(
            "evicted region at ({}, {}) still has {} outstanding references; buffers not released",
            r.ul.x,
            r.ul.y,
            Rc::strong_count(&r) - 1
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rendering::state::Texture;
    use crate::terrain::ground::GroundTiler;
    use crate::terrain::noise_source::NoiseSource;

    fn source() -> NoiseSource {
        let mut s = NoiseSource::new(5);
        let tex = Texture::new(1, Point2::new(32, 32));
        s.register(0, Rc::new(GroundTiler::new(0, vec![tex], true)));
        s
    }

    fn cap(n: usize) -> NonZeroUsize {
        NonZeroUsize::new(n).unwrap()
    }

    #[test]
    fn hit_returns_the_same_region() {
        let s = source();
        let mut cache = RegionCache::new(Point2::new(4, 4), 11.0, 9, cap(4));
        let a = cache.get(&s, Point2::new(0, 0)).unwrap();
        let b = cache.get(&s, Point2::new(0, 0)).unwrap();
        assert!(Rc::ptr_eq(&a, &b));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn region_at_maps_tiles_to_cuts() {
        let s = source();
        let mut cache = RegionCache::new(Point2::new(4, 4), 11.0, 9, cap(4));
        let r = cache.region_at(&s, Point2::new(-1, 6)).unwrap();
        assert_eq!(r.ul, Point2::new(-4, 4));
    }

    #[test]
    fn capacity_evicts_least_recently_used() {
        let s = source();
        let mut cache = RegionCache::new(Point2::new(4, 4), 11.0, 9, cap(2));
        cache.get(&s, Point2::new(0, 0)).unwrap();
        cache.get(&s, Point2::new(1, 0)).unwrap();
        cache.get(&s, Point2::new(2, 0)).unwrap();
        assert_eq!(cache.len(), 2);
        assert!(cache.peek(Point2::new(0, 0)).is_none());
        assert!(cache.peek(Point2::new(2, 0)).is_some());
    }

    #[test]
    fn sibling_cuts_get_distinct_seeds() {
        let s = source();
        let mut cache = RegionCache::new(Point2::new(4, 4), 11.0, 9, cap(4));
        let a = cache.get(&s, Point2::new(0, 0)).unwrap();
        let b = cache.get(&s, Point2::new(1, 0)).unwrap();
        assert_ne!(a.seed, b.seed);
    }
}

//! Deterministic random-stream derivation for region construction.
//!
//! A region's entire build must be reproducible from its seed and origin.
//! Per-tile contributions therefore never share the raw region stream:
//! before each tile the driver advances the region generator by one draw,
//! reseeds it with that draw folded with the tile's local coordinates,
//! runs the tile, and restores the generator to the captured draw. Sibling
//! tiles see independent streams regardless of how many values each one
//! consumes.

use cgmath::Point2;
use fastrand::Rng;

/// Odd multiplier from the SplitMix64 finalizer, used to spread tile
/// coordinates across the seed space.
const COORD_MIX: u64 = 0x9E37_79B9_7F4A_7C15;

/// Folds a tile's local coordinates into a base seed value.
#[inline]
pub fn fold_coord(base: u64, lc: Point2<i32>) -> u64 {
    let x = (lc.x as i64 as u64).wrapping_mul(COORD_MIX);
    let y = (lc.y as i64 as u64).wrapping_mul(COORD_MIX).rotate_left(32);
    base ^ x ^ y
}

/// Runs `f` with the region generator temporarily reseeded for one tile.
///
/// Advances `rng` by a single draw, derives the tile stream from that draw
/// and `lc`, and restores the generator afterward so the next tile starts
/// from a state independent of anything `f` consumed.
pub fn with_tile_rng<T>(rng: &mut Rng, lc: Point2<i32>, f: impl FnOnce(&mut Rng) -> T) -> T {
    let ns = rng.u64(..);
    rng.seed(fold_coord(ns, lc));
    let out = f(rng);
    rng.seed(ns);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sibling_tiles_are_isolated() {
        // The draw a tile sees must not depend on how much randomness the
        // previous tile consumed.
        let mut a = Rng::with_seed(42);
        let mut b = Rng::with_seed(42);

        with_tile_rng(&mut a, Point2::new(0, 0), |r| {
            r.u64(..);
        });
        with_tile_rng(&mut b, Point2::new(0, 0), |r| {
            for _ in 0..100 {
                r.u64(..);
            }
        });

        let next_a = with_tile_rng(&mut a, Point2::new(1, 0), |r| r.u64(..));
        let next_b = with_tile_rng(&mut b, Point2::new(1, 0), |r| r.u64(..));
        assert_eq!(next_a, next_b);
    }

    #[test]
    fn distinct_tiles_get_distinct_streams() {
        let mut rng = Rng::with_seed(7);
        let ns = rng.u64(..);
        assert_ne!(fold_coord(ns, Point2::new(0, 0)), fold_coord(ns, Point2::new(1, 0)));
        assert_ne!(fold_coord(ns, Point2::new(0, 1)), fold_coord(ns, Point2::new(1, 0)));
    }

    #[test]
    fn reproducible_across_runs() {
        let mut a = Rng::with_seed(99);
        let mut b = Rng::with_seed(99);
        let va = with_tile_rng(&mut a, Point2::new(3, 5), |r| r.u64(..));
        let vb = with_tile_rng(&mut b, Point2::new(3, 5), |r| r.u64(..));
        assert_eq!(va, vb);
    }
}

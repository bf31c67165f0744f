//! The region's shared height/normal grid.
//!
//! Heights are sampled eagerly for every grid point including a ghost ring
//! one sample beyond the usual +1 border, so that normal computation at
//! the region edge reads real neighbor heights instead of extrapolating.
//! Normals are deferred to the `calcnrm` phase: model-phase handlers may
//! still be nudging sample positions (prop seating), and a normal computed
//! earlier would go stale.

use cgmath::{InnerSpace, Point2, Point3, Vector3, Zero};

use crate::core::scan::Scan;
use crate::meshing::aux_data::{AuxKey, BuildCtx, ConsHooks};

/// One grid sample: a position and, after the normal phase, a unit normal.
#[derive(Debug, Clone, Copy)]
pub struct SurfPoint {
    /// World-space position relative to the region origin.
    pub pos: Point3<f32>,
    /// Surface normal; the zero vector before `calcnrm` runs, and also
    /// afterwards for degenerate neighborhoods.
    pub nrm: Vector3<f32>,
}

/// The region's height grid with ghost border and per-tile split flags.
pub struct GroundSurface {
    /// Sample scan over `[-1, sz + 1]` inclusive.
    vs: Scan,
    /// Tile scan over `[0, sz)`.
    ts: Scan,
    pts: Vec<SurfPoint>,
    split: Vec<bool>,
}

impl GroundSurface {
    pub(crate) fn new(ctx: &BuildCtx<'_>) -> Self {
        let vs = Scan::new(Point2::new(-1, -1), Point2::new(ctx.sz.x + 3, ctx.sz.y + 3));
        let ts = Scan::new(Point2::new(0, 0), ctx.sz);
        let ts_len = ts.len;

        let mut pts = Vec::with_capacity(vs.len);
        for y in vs.ul.y..vs.br.y {
            for x in vs.ul.x..vs.br.x {
                let h = ctx
                    .source
                    .corner_height(Point2::new(ctx.ul.x + x, ctx.ul.y + y));
                pts.push(SurfPoint {
                    pos: Point3::new(
                        x as f32 * ctx.tile_size,
                        y as f32 * -ctx.tile_size,
                        h,
                    ),
                    nrm: Vector3::zero(),
                });
            }
        }

        let mut split = vec![false; ts_len];
        for y in ts.ul.y..ts.br.y {
            for x in ts.ul.x..ts.br.x {
                let z = |dx: i32, dy: i32| pts[vs.idx(x + dx, y + dy)].pos.z;
                // True when the ul-lr diagonal is steeper than ur-ll, in
                // which case triangulation runs along the flatter ur-ll.
                split[ts.idx(x, y)] = (z(0, 0) - z(1, 1)).abs() > (z(1, 0) - z(0, 1)).abs();
            }
        }

        GroundSurface { vs, ts, pts, split }
    }

    /// Index of the sample at grid coordinate `lc` in `[-1, sz + 1]`.
    ///
    /// The index is stable for the life of the region and doubles as the
    /// vertex identity derived passes deduplicate on.
    #[inline]
    pub fn idx(&self, lc: Point2<i32>) -> usize {
        self.vs.at(lc)
    }

    /// The sample at grid coordinate `lc`.
    pub fn point(&self, lc: Point2<i32>) -> &SurfPoint {
        &self.pts[self.vs.at(lc)]
    }

    /// Mutable sample access, for model-phase position adjustments.
    pub fn point_mut(&mut self, lc: Point2<i32>) -> &mut SurfPoint {
        &mut self.pts[self.vs.at(lc)]
    }

    /// The sample at a previously obtained index.
    pub fn point_at(&self, idx: usize) -> &SurfPoint {
        &self.pts[idx]
    }

    /// Sample indices of tile `lc`'s corners, in ring order upper-left,
    /// lower-left, lower-right, upper-right.
    pub fn tile_corners(&self, lc: Point2<i32>) -> [usize; 4] {
        [
            self.vs.idx(lc.x, lc.y),
            self.vs.idx(lc.x, lc.y + 1),
            self.vs.idx(lc.x + 1, lc.y + 1),
            self.vs.idx(lc.x + 1, lc.y),
        ]
    }

    /// Whether tile `lc` triangulates along its ur-ll diagonal.
    pub fn split(&self, lc: Point2<i32>) -> bool {
        self.split[self.ts.at(lc)]
    }

    fn compute_normals(&mut self) {
        // Interior plus the +1 border; the ghost ring keeps every read in
        // bounds and itself retains the zero sentinel.
        for y in 0..=self.ts.sz.y {
            for x in 0..=self.ts.sz.x {
                let p = self.pts[self.vs.idx(x, y)].pos;
                let n = self.pts[self.vs.idx(x, y - 1)].pos - p;
                let s = self.pts[self.vs.idx(x, y + 1)].pos - p;
                let w = self.pts[self.vs.idx(x - 1, y)].pos - p;
                let e = self.pts[self.vs.idx(x + 1, y)].pos - p;
                let sum = n.cross(w) + e.cross(n) + s.cross(e) + w.cross(s);
                self.pts[self.vs.idx(x, y)].nrm = normalize_or_zero(sum);
            }
        }
    }
}

/// Normalizes `v`, mapping degenerate (zero-length) input to the zero
/// vector instead of NaN.
#[inline]
pub fn normalize_or_zero(v: Vector3<f32>) -> Vector3<f32> {
    let m2 = v.magnitude2();
    if m2 > 0.0 {
        v / m2.sqrt()
    } else {
        Vector3::zero()
    }
}

impl ConsHooks for GroundSurface {
    fn calcnrm(&mut self) {
        self.compute_normals();
    }

    fn clean(&mut self) -> bool {
        // Retained: decal projection re-reads the finalized grid after the
        // region is frozen.
        true
    }
}

/// Singleton key of the region's ground surface.
#[derive(PartialEq, Eq)]
pub struct GroundKey;

impl AuxKey for GroundKey {
    type Value = GroundSurface;

    fn make(&self, ctx: &BuildCtx<'_>) -> GroundSurface {
        GroundSurface::new(ctx)
    }
}

//! Ground decals: a texture projected onto already-built terrain.
//!
//! A decal covers a world-space rectangle that may span several built
//! regions. The builder re-lays every covered tile's ground topology
//! through the regions' retained surfaces, stitches shared vertices, and
//! planar-projects the texture across the rectangle. Positions are emitted
//! relative to the decal's anchor so the consumer can place the mesh as a
//! unit.

use std::collections::HashMap;

use cgmath::{Point2, Point3};

use crate::error::{BuildError, BuildResult};
use crate::meshing::mesh_buf::{FrozenMesh, MeshBuf, VertId};
use crate::meshing::region::RegionView;
use crate::rendering::state::{RenderState, Texture, WrapMode};
use crate::terrain::source::TerrainSource;
use crate::terrain::tiler::{MeshCons, TilePatch};

/// A frozen ground decal, drawn at
/// [`order::GROUND_MOD`](crate::rendering::order) with a small depth
/// offset so it sits on the terrain without z-fighting.
pub struct GroundMod {
    /// Render state of the decal (border-clamped so the projection fades
    /// at its rectangle instead of tiling).
    pub state: RenderState,
    /// Map-space anchor the mesh positions are relative to.
    pub cc: Point2<f32>,
    /// The stitched, projected mesh.
    pub mesh: FrozenMesh,
}

struct DecalCons {
    buf: MeshBuf,
    /// Vertex dedup across tiles, keyed by (region origin, grid id);
    /// regions have disjoint grids so the composite key is unique.
    seen: HashMap<(i32, i32, u32), VertId>,
    cc: Point2<f32>,
    cz: f32,
    ul: Point2<f32>,
    br: Point2<f32>,
}

impl MeshCons for DecalCons {
    fn faces(&mut self, view: &RegionView, patch: &TilePatch<'_>) {
        let ts = view.tile_size;
        let mut ids = Vec::with_capacity(patch.verts.len());
        for v in patch.verts.iter() {
            let key = (view.ul.x, view.ul.y, v.id);
            let vid = match self.seen.get(&key) {
                Some(&vid) => vid,
                None => {
                    let pos = Point3::new(
                        v.pos.x + view.ul.x as f32 * ts - self.cc.x,
                        v.pos.y + (self.cc.y - view.ul.y as f32 * ts),
                        v.pos.z - self.cz,
                    );
                    let vid = self.buf.vertex(pos, v.nrm);
                    let u = ((view.ul.x + patch.lc.x) as f32 + v.tc.x) * ts - self.ul.x;
                    let w = ((view.ul.y + patch.lc.y) as f32 + v.tc.y) * ts - self.ul.y;
                    self.buf.set_tex(
                        vid,
                        [u / (self.br.x - self.ul.x), w / (self.br.y - self.ul.y)],
                    );
                    self.seen.insert(key, vid);
                    vid
                }
            };
            ids.push(vid);
        }
        for f in patch.faces.chunks_exact(3) {
            self.buf.face(
                ids[f[0] as usize],
                ids[f[1] as usize],
                ids[f[2] as usize],
            );
        }
    }
}

impl GroundMod {
    /// Builds a decal projecting `tex` over the map-space rectangle
    /// `[ul, br]`, anchored at `cc` (map-space coordinates are the tile
    /// grid axes scaled by the tile size).
    ///
    /// Every covered tile's region must already be built and reachable
    /// through `source.region_at`, with its ground surface retained.
    ///
    /// # Arguments
    /// * `tile_size` - World units per tile edge, matching the regions'
    ///   build parameters
    pub fn new(
        source: &dyn TerrainSource,
        tex: &Texture,
        cc: Point2<f32>,
        ul: Point2<f32>,
        br: Point2<f32>,
        tile_size: f32,
    ) -> BuildResult<GroundMod> {
        let state = RenderState {
            tex: tex.render_id()?,
            clipped: false,
            wrap: WrapMode::ClampBorder,
        };
        let cz = source.height_at(cc);
        let mut cons = DecalCons {
            buf: MeshBuf::new(),
            seen: HashMap::new(),
            cc,
            cz,
            ul,
            br,
        };

        let ult = Point2::new(
            (ul.x / tile_size).floor() as i32,
            (ul.y / tile_size).floor() as i32,
        );
        let brt = Point2::new(
            (br.x / tile_size).floor() as i32,
            (br.y / tile_size).floor() as i32,
        );
        for ty in ult.y..=brt.y {
            for tx in ult.x..=brt.x {
                let t = Point2::new(tx, ty);
                let region = source
                    .region_at(t)
                    .ok_or(BuildError::MissingRegion { x: tx, y: ty })?;
                let surf_rc = region
                    .ground()
                    .ok_or(BuildError::MissingRegion { x: tx, y: ty })?;
                let surf = surf_rc.borrow();
                let id = source.tile_at(t);
                let Some(tiler) = source.tiler(id) else {
                    return Err(BuildError::MissingTiler { id, x: tx, y: ty });
                };
                let lc = Point2::new(t.x - region.ul.x, t.y - region.ul.y);
                tiler.lay_patch(&region.view(), &surf, lc, t, &mut cons);
            }
        }

        Ok(GroundMod {
            state,
            cc,
            mesh: cons.buf.freeze(),
        })
    }
}

#[cfg(test)]
mod tests {
    use std::rc::Rc;

    use super::*;
    use crate::meshing::region::Region;
    use crate::terrain::ground::GroundTiler;
    use crate::terrain::source::TileId;
    use crate::terrain::tiler::Tiler;

    const TS: f32 = 11.0;

    /// Flat world of 4x4-tile regions, prebuilt on construction.
    struct DecalWorld {
        tiler: Rc<GroundTiler>,
        regions: Vec<((i32, i32), Rc<Region>)>,
    }

    impl DecalWorld {
        fn new(cuts: &[(i32, i32)]) -> Self {
            let tiler = Rc::new(GroundTiler::new(
                0,
                vec![Texture::new(1, Point2::new(32, 32))],
                true,
            ));
            let mut world = DecalWorld {
                tiler,
                regions: Vec::new(),
            };
            for &(cx, cy) in cuts {
                let region = Region::build(
                    &world,
                    7,
                    Point2::new(cx * 4, cy * 4),
                    Point2::new(4, 4),
                )
                .unwrap();
                world.regions.push(((cx, cy), Rc::new(region)));
            }
            world
        }
    }

    impl TerrainSource for DecalWorld {
        fn corner_height(&self, _gc: Point2<i32>) -> f32 {
            2.0
        }
        fn height_at(&self, _wc: Point2<f32>) -> f32 {
            2.0
        }
        fn tile_at(&self, _gc: Point2<i32>) -> TileId {
            0
        }
        fn tiler(&self, _id: TileId) -> Option<Rc<dyn Tiler>> {
            Some(self.tiler.clone())
        }
        fn region_at(&self, tc: Point2<i32>) -> Option<Rc<Region>> {
            let cut = (tc.x.div_euclid(4), tc.y.div_euclid(4));
            self.regions
                .iter()
                .find(|(c, _)| *c == cut)
                .map(|(_, r)| r.clone())
        }
    }

    #[test]
    fn decal_stitches_across_region_boundaries() {
        let world = DecalWorld::new(&[(0, 0), (1, 0)]);
        let tex = Texture::new(50, Point2::new(64, 64));
        let decal = GroundMod::new(
            &world,
            &tex,
            Point2::new(4.0 * TS, 2.0 * TS),
            Point2::new(3.0 * TS, 1.0 * TS),
            Point2::new(5.0 * TS, 3.0 * TS),
            TS,
        )
        .unwrap();

        // Nine covered tiles: three in the left region sharing one corner
        // column (8 vertices), six in the right sharing three (12).
        assert_eq!(decal.mesh.indices().len(), 54);
        assert_eq!(decal.mesh.vertices().len(), 20);
        assert_eq!(decal.state.wrap, WrapMode::ClampBorder);

        // Positions are relative to the anchor, including height.
        for v in decal.mesh.vertices() {
            assert_eq!(v.position[2], 0.0);
            assert!(v.position[0].abs() <= 2.0 * TS);
        }
    }

    #[test]
    fn decal_over_unbuilt_ground_fails() {
        let world = DecalWorld::new(&[(0, 0)]);
        let tex = Texture::new(50, Point2::new(64, 64));
        let err = GroundMod::new(
            &world,
            &tex,
            Point2::new(4.0 * TS, 2.0 * TS),
            Point2::new(3.0 * TS, 1.0 * TS),
            Point2::new(5.0 * TS, 3.0 * TS),
            TS,
        );
        assert!(matches!(err, Err(BuildError::MissingRegion { .. })));
    }
}

//! Shape registration and per-(depth, render-state) batching.
//!
//! Every geometric contribution a handler makes during the lay phases is a
//! `Shape` registered under a depth and a render state. All shapes sharing
//! that pair accumulate into one layer and freeze into exactly one mesh,
//! so the draw submission for a region is bounded by its distinct
//! material/depth combinations rather than its tile count.

use std::cell::RefCell;
use std::rc::Rc;

use cgmath::Point2;

use crate::meshing::mesh_buf::{FrozenMesh, MeshBuf, VertId};
use crate::meshing::surface::GroundSurface;
use crate::rendering::state::{RenderState, Texture};

/// A tile-local geometry contributor, immutable once registered.
///
/// `build` runs during the batch-freeze phase, after normals are
/// finalized, and appends the shape's geometry into its layer's buffer.
pub trait Shape {
    /// Appends this shape's geometry.
    fn build(&self, buf: &mut MeshBuf);
}

/// Accumulating layer: shapes awaiting the freeze phase.
pub(crate) struct LayerAcc {
    pub z: i32,
    pub state: Rc<RenderState>,
    pub shapes: Vec<Box<dyn Shape>>,
}

/// A frozen batch: one mesh drawn with one render state at one depth.
pub struct Layer {
    z: i32,
    state: Rc<RenderState>,
    mesh: FrozenMesh,
}

impl Layer {
    pub(crate) fn new(z: i32, state: Rc<RenderState>, mesh: FrozenMesh) -> Self {
        Layer { z, state, mesh }
    }

    /// Draw depth; the region's layer list is sorted ascending on this.
    pub fn z(&self) -> i32 {
        self.z
    }

    /// Render state shared by everything in the batch.
    pub fn state(&self) -> &Rc<RenderState> {
        &self.state
    }

    /// The frozen mesh.
    pub fn mesh(&self) -> &FrozenMesh {
        &self.mesh
    }

    pub(crate) fn release(&mut self) {
        self.mesh.release();
    }
}

/// A textured ground quad over one tile's surface corners.
///
/// The workhorse shape: holds indices into the shared surface grid rather
/// than copied positions, so it picks up finalized heights and normals at
/// build time no matter what the model phase did to the grid in between.
pub struct Plane {
    surf: Rc<RefCell<GroundSurface>>,
    corners: [usize; 4],
    tex: Option<PlaneTex>,
}

struct PlaneTex {
    tex: Texture,
    px: [[i32; 2]; 4],
}

impl Plane {
    /// Creates an untextured plane over tile `sc`'s corners.
    pub fn new(surf: &Rc<RefCell<GroundSurface>>, sc: Point2<i32>) -> Plane {
        let corners = surf.borrow().tile_corners(sc);
        Plane {
            surf: surf.clone(),
            corners,
            tex: None,
        }
    }

    /// Creates a plane over four explicit surface sample indices (ring
    /// order), for shapes spanning something other than a single tile.
    pub fn from_corners(surf: &Rc<RefCell<GroundSurface>>, corners: [usize; 4]) -> Plane {
        Plane {
            surf: surf.clone(),
            corners,
            tex: None,
        }
    }

    /// Textures the plane with `tex`'s full rectangle, unrotated.
    pub fn textured(self, tex: &Texture) -> Plane {
        self.texrot(tex, None, None, 0, false)
    }

    /// Textures the plane with a sub-rectangle of `tex`, rotated by `rot`
    /// quarter turns and optionally mirrored in x.
    ///
    /// `ul`/`br` default to the texture's full rectangle when `None`.
    pub fn texrot(
        mut self,
        tex: &Texture,
        ul: Option<Point2<i32>>,
        br: Option<Point2<i32>>,
        rot: u8,
        flipx: bool,
    ) -> Plane {
        let ul = ul.unwrap_or(Point2::new(0, 0));
        let br = br.unwrap_or(tex.sz());
        let (xs, ys) = if !flipx {
            ([ul.x, ul.x, br.x, br.x], [ul.y, br.y, br.y, ul.y])
        } else {
            ([br.x, br.x, ul.x, ul.x], [ul.y, br.y, br.y, ul.y])
        };
        let mut px = [[0i32; 2]; 4];
        for (i, p) in px.iter_mut().enumerate() {
            let o = (i + rot as usize) % 4;
            *p = [xs[o], ys[o]];
        }
        self.tex = Some(PlaneTex {
            tex: tex.clone(),
            px,
        });
        self
    }
}

impl Shape for Plane {
    fn build(&self, buf: &mut MeshBuf) {
        let surf = self.surf.borrow();
        let mut v = [VertId(0); 4];
        for (i, &c) in self.corners.iter().enumerate() {
            let p = surf.point_at(c);
            v[i] = buf.vertex(p.pos, p.nrm);
        }
        if let Some(pt) = &self.tex {
            for (i, &vid) in v.iter().enumerate() {
                buf.set_tex(vid, [pt.tex.tcx(pt.px[i][0]), pt.tex.tcy(pt.px[i][1])]);
            }
        }
        buf.split_quad(v[0], v[1], v[2], v[3]);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::meshing::aux_data::BuildCtx;
    use crate::terrain::source::{TerrainSource, TileId};
    use crate::terrain::tiler::Tiler;

    struct FlatSource;
    impl TerrainSource for FlatSource {
        fn corner_height(&self, _gc: Point2<i32>) -> f32 {
            3.0
        }
        fn height_at(&self, _wc: Point2<f32>) -> f32 {
            3.0
        }
        fn tile_at(&self, _gc: Point2<i32>) -> TileId {
            0
        }
        fn tiler(&self, _id: TileId) -> Option<Rc<dyn Tiler>> {
            None
        }
    }

    fn ground() -> Rc<RefCell<GroundSurface>> {
        let source = FlatSource;
        Rc::new(RefCell::new(GroundSurface::new(&BuildCtx {
            ul: Point2::new(0, 0),
            sz: Point2::new(2, 2),
            tile_size: 11.0,
            source: &source,
        })))
    }

    #[test]
    fn plane_emits_one_quad() {
        let surf = ground();
        let plane = Plane::new(&surf, Point2::new(0, 0));
        let mut buf = MeshBuf::new();
        plane.build(&mut buf);
        assert_eq!(buf.vertex_count(), 4);
        assert_eq!(buf.face_count(), 2);
    }

    #[test]
    fn texrot_rotates_pixel_corners() {
        let surf = ground();
        let tex = Texture::new(1, Point2::new(32, 32));

        let unrot = Plane::new(&surf, Point2::new(0, 0)).textured(&tex);
        let rot1 = Plane::new(&surf, Point2::new(0, 0)).texrot(&tex, None, None, 1, false);
        let (a, b) = (
            unrot.tex.as_ref().map(|t| t.px).unwrap_or_default(),
            rot1.tex.as_ref().map(|t| t.px).unwrap_or_default(),
        );
        // One quarter turn shifts every corner by one slot.
        assert_eq!(a[1], b[0]);
        assert_eq!(a[2], b[1]);
        assert_eq!(a[3], b[2]);
        assert_eq!(a[0], b[3]);
    }

    #[test]
    fn plane_reads_finalized_heights_at_build_time() {
        let surf = ground();
        let plane = Plane::new(&surf, Point2::new(0, 0));
        surf.borrow_mut().point_mut(Point2::new(0, 0)).pos.z = 9.0;

        let mut buf = MeshBuf::new();
        plane.build(&mut buf);
        assert_eq!(buf.pos(VertId(0)).z, 9.0);
    }
}

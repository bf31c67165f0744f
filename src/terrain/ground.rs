//! The standard flat-ground terrain handler.
//!
//! Lays one textured quad per tile, picking a texture variant from the
//! tile's random stream, and blends onto lower-priority neighbors with
//! mask-indexed border/corner textures.

use cgmath::{Point2, Vector2};
use fastrand::Rng;

use crate::error::{BuildError, BuildResult};
use crate::meshing::layer::Plane;
use crate::meshing::region::{RegionBuilder, RegionView};
use crate::meshing::surface::GroundSurface;
use crate::rendering::state::Texture;
use crate::terrain::source::TileId;
use crate::terrain::tiler::{MeshCons, PatchVert, TilePatch, Tiler};

/// Mask-indexed transition textures: entry `m - 1` serves border (or
/// corner) mask `m`, for the 15 non-zero 4-bit masks.
pub struct TransSet {
    border: Vec<Texture>,
    corner: Vec<Texture>,
}

impl TransSet {
    /// Validates and wraps the 15 border and 15 corner variants.
    pub fn new(border: Vec<Texture>, corner: Vec<Texture>) -> BuildResult<TransSet> {
        if border.len() != 15 || corner.len() != 15 {
            return Err(BuildError::BadTransSet {
                border: border.len(),
                corner: corner.len(),
            });
        }
        Ok(TransSet { border, corner })
    }
}

/// Flat-ground handler for one terrain type.
pub struct GroundTiler {
    id: TileId,
    textures: Vec<Texture>,
    clip: bool,
    trans: Option<TransSet>,
}

impl GroundTiler {
    /// Creates a handler drawing tiles from `textures` (one variant picked
    /// per tile from its random stream).
    ///
    /// # Panics
    /// Panics if `textures` is empty.
    pub fn new(id: TileId, textures: Vec<Texture>, clip: bool) -> Self {
        assert!(!textures.is_empty(), "ground tiler needs at least one texture");
        GroundTiler {
            id,
            textures,
            clip,
            trans: None,
        }
    }

    /// Adds transition blending onto lower-priority neighbors.
    pub fn with_transitions(mut self, trans: TransSet) -> Self {
        self.trans = Some(trans);
        self
    }

    /// The terrain type this handler serves.
    pub fn id(&self) -> TileId {
        self.id
    }

    fn pick<'t>(&'t self, rng: &mut Rng) -> &'t Texture {
        &self.textures[rng.usize(..self.textures.len())]
    }
}

impl Tiler for GroundTiler {
    fn lay(
        &self,
        m: &mut RegionBuilder<'_>,
        rng: &mut Rng,
        lc: Point2<i32>,
        _gc: Point2<i32>,
    ) -> BuildResult<()> {
        let tex = self.pick(rng).clone();
        let state = m.state_for(&tex, self.clip)?;
        let surf = m.ground();
        m.register(0, state, Box::new(Plane::new(&surf, lc).textured(&tex)));
        Ok(())
    }

    fn trans(
        &self,
        m: &mut RegionBuilder<'_>,
        _rng: &mut Rng,
        _base: &dyn Tiler,
        lc: Point2<i32>,
        _gc: Point2<i32>,
        z: i32,
        bmask: u8,
        cmask: u8,
    ) -> BuildResult<()> {
        let Some(trans) = &self.trans else {
            return Ok(());
        };
        let surf = m.ground();
        if bmask != 0 {
            let tex = &trans.border[(bmask - 1) as usize];
            let state = m.state_for(tex, false)?;
            m.register(z, state, Box::new(Plane::new(&surf, lc).textured(tex)));
        }
        if cmask != 0 {
            let tex = &trans.corner[(cmask - 1) as usize];
            let state = m.state_for(tex, false)?;
            m.register(z, state, Box::new(Plane::new(&surf, lc).textured(tex)));
        }
        Ok(())
    }

    fn lay_patch(
        &self,
        view: &RegionView,
        surf: &GroundSurface,
        lc: Point2<i32>,
        _gc: Point2<i32>,
        cons: &mut dyn MeshCons,
    ) {
        let corners = surf.tile_corners(lc);
        let tc = [
            Vector2::new(0.0, 0.0),
            Vector2::new(0.0, 1.0),
            Vector2::new(1.0, 1.0),
            Vector2::new(1.0, 0.0),
        ];
        let mut verts = [PatchVert {
            id: 0,
            pos: cgmath::Point3::new(0.0, 0.0, 0.0),
            nrm: cgmath::Vector3::new(0.0, 0.0, 0.0),
            tc: Vector2::new(0.0, 0.0),
        }; 4];
        for i in 0..4 {
            let p = surf.point_at(corners[i]);
            verts[i] = PatchVert {
                id: corners[i] as u32,
                pos: p.pos,
                nrm: p.nrm,
                tc: tc[i],
            };
        }
        // Same diagonal the lay phase's quad split chose.
        let faces: [u16; 6] = if surf.split(lc) {
            [0, 1, 3, 1, 2, 3]
        } else {
            [0, 1, 2, 0, 2, 3]
        };
        cons.faces(
            view,
            &TilePatch {
                lc,
                verts: &verts,
                faces: &faces,
            },
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tex(id: u32) -> Texture {
        Texture::new(id, Point2::new(32, 32))
    }

    #[test]
    fn trans_set_validates_variant_counts() {
        let full: Vec<Texture> = (0..15).map(tex).collect();
        assert!(TransSet::new(full.clone(), full.clone()).is_ok());

        let short: Vec<Texture> = (0..7).map(tex).collect();
        let err = TransSet::new(full, short);
        assert!(matches!(
            err,
            Err(BuildError::BadTransSet { border: 15, corner: 7 })
        ));
    }

    #[test]
    fn texture_variant_choice_is_seeded() {
        let t = GroundTiler::new(0, (0..4).map(tex).collect(), true);
        let mut a = Rng::with_seed(11);
        let mut b = Rng::with_seed(11);
        for _ in 0..16 {
            assert_eq!(t.pick(&mut a), t.pick(&mut b));
        }
    }
}

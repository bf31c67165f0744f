//! The per-terrain-type geometry handler interface.
//!
//! A `Tiler` is invoked once per tile in each build phase that needs tile
//! geometry: `model` for free-form contributions (props, auxiliary state),
//! `lay` for the ground itself, `trans` when a higher-priority neighbor
//! blends onto the tile, and `lay_patch` whenever a derived pass (overlay
//! channels, flat debug meshes, ground decals) needs the tile's surface
//! topology re-emitted through a [`MeshCons`] consumer.

use cgmath::{Point2, Point3, Vector2, Vector3};
use fastrand::Rng;

use crate::error::BuildResult;
use crate::meshing::region::{RegionBuilder, RegionView};
use crate::meshing::surface::GroundSurface;

/// One surface vertex of a tile patch.
#[derive(Debug, Clone, Copy)]
pub struct PatchVert {
    /// Stable identity of the vertex within the region's surface grid;
    /// adjoining tiles emit the same id for a shared corner, which is what
    /// consumers deduplicate on.
    pub id: u32,
    /// World-space position relative to the region origin.
    pub pos: Point3<f32>,
    /// Finalized surface normal.
    pub nrm: Vector3<f32>,
    /// Subtile coordinate in `[0, 1]²`.
    pub tc: Vector2<f32>,
}

/// A tile's ground geometry as vertices plus triangle indices.
#[derive(Debug, Clone, Copy)]
pub struct TilePatch<'a> {
    /// Local tile coordinate within the region.
    pub lc: Point2<i32>,
    /// Patch vertices.
    pub verts: &'a [PatchVert],
    /// Triangle index triples into `verts`.
    pub faces: &'a [u16],
}

/// Consumer of re-emitted tile geometry.
pub trait MeshCons {
    /// Receives one tile's patch. Called once per tile in region tile
    /// order; `view` identifies the region the patch belongs to (decal
    /// consumers span several regions).
    fn faces(&mut self, view: &RegionView, patch: &TilePatch<'_>);
}

/// Geometry handler for one terrain type.
pub trait Tiler {
    /// Free-form contribution phase, before any ground is laid. Handlers
    /// typically populate auxiliary entries or queue prop geometry here.
    fn model(
        &self,
        m: &mut RegionBuilder<'_>,
        rng: &mut Rng,
        lc: Point2<i32>,
        gc: Point2<i32>,
    ) -> BuildResult<()> {
        let _ = (m, rng, lc, gc);
        Ok(())
    }

    /// Lays the tile's ground geometry into the region's batches.
    fn lay(
        &self,
        m: &mut RegionBuilder<'_>,
        rng: &mut Rng,
        lc: Point2<i32>,
        gc: Point2<i32>,
    ) -> BuildResult<()>;

    /// Blends this (higher-priority) terrain onto a neighboring tile of
    /// lower priority.
    ///
    /// # Arguments
    /// * `base` - The encroached tile's own handler, for handlers that
    ///   blend into the base ground rather than over it
    /// * `z` - Blend layer depth, the inverted priority `255 - id`
    /// * `bmask` - Cardinal-neighbor bits (west, north, east, south)
    /// * `cmask` - Diagonal bits (NW, NE, SE, SW) not already implied by an
    ///   adjacent cardinal pair
    fn trans(
        &self,
        m: &mut RegionBuilder<'_>,
        rng: &mut Rng,
        base: &dyn Tiler,
        lc: Point2<i32>,
        gc: Point2<i32>,
        z: i32,
        bmask: u8,
        cmask: u8,
    ) -> BuildResult<()> {
        let _ = (m, rng, base, lc, gc, z, bmask, cmask);
        Ok(())
    }

    /// Re-emits the tile's finalized surface topology through `cons`.
    ///
    /// The emitted indices and vertex order must match what `lay` produced
    /// for the same tile, so overlay and flat meshes stay in exact
    /// correspondence with the rendered ground.
    fn lay_patch(
        &self,
        view: &RegionView,
        surf: &GroundSurface,
        lc: Point2<i32>,
        gc: Point2<i32>,
        cons: &mut dyn MeshCons,
    );
}

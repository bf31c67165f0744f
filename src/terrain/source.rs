//! The read-only world-data interface consumed during region construction.

use std::rc::Rc;

use cgmath::Point2;

use crate::meshing::region::Region;
use crate::terrain::tiler::Tiler;

/// Identifier of a terrain type.
///
/// The numeric value doubles as the transition priority: where two
/// differing types meet, the higher id visually encroaches onto the lower.
pub type TileId = u8;

/// Read-only access to the tile/height store backing a region build.
///
/// All queries must be stable for the duration of one build; the mesher
/// samples heights and tiles once and assumes later reads agree.
pub trait TerrainSource {
    /// Height of the grid corner at global grid coordinate `gc`.
    fn corner_height(&self, gc: Point2<i32>) -> f32;

    /// Continuous ground height at a map-space position (tile-grid axes
    /// scaled by the tile size), used to anchor geometry that is not tied
    /// to a grid corner (decal centers).
    fn height_at(&self, wc: Point2<f32>) -> f32;

    /// Terrain type of the tile at global tile coordinate `gc`.
    fn tile_at(&self, gc: Point2<i32>) -> TileId;

    /// The geometry handler registered for a terrain type, if any.
    ///
    /// A missing handler for a tile's own type is a fatal build error; a
    /// missing handler for a neighboring transition priority is an
    /// expected absence and is skipped.
    fn tiler(&self, id: TileId) -> Option<Rc<dyn Tiler>>;

    /// Overlay channel membership mask of the tile at `gc`; bit `i` set
    /// means the tile belongs to overlay channel `i`.
    fn overlay_at(&self, gc: Point2<i32>) -> u32 {
        let _ = gc;
        0
    }

    /// The already-built region containing global tile `tc`.
    ///
    /// Only required by cross-region consumers such as
    /// [`GroundMod`](crate::meshing::GroundMod); sources that never feed
    /// decals can leave the default.
    fn region_at(&self, tc: Point2<i32>) -> Option<Rc<Region>> {
        let _ = tc;
        None
    }
}

//! Flat/debug mesh variants.
//!
//! A simplified re-accumulation of the region's ground topology used by
//! tooling and minimap-style flat rendering: one shared position array,
//! one shared index array, and two alternative color encodings selected by
//! an integer mode at draw time. Vertex and index order exactly mirror the
//! lay phase, so a flat pick maps one-to-one onto rendered geometry.

use num_derive::FromPrimitive;

use cgmath::Point2;

use crate::error::BuildResult;
use crate::meshing::region::{RegionBuilder, RegionView};
use crate::rendering::vertex::FlatVertex;
use crate::terrain::tiler::{MeshCons, TilePatch};

/// Scale divisor of the tile-coordinate color encoding.
const TILE_COLOR_SCALE: f32 = 256.0;

/// Vertex-attribute encoding of the flat variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromPrimitive)]
pub enum FlatMode {
    /// Positions only.
    Plain = 0,
    /// Positions plus local tile coordinate encoded as color.
    TileCoord = 1,
    /// Positions plus raw subtile texture coordinate as color.
    SubTex = 2,
}

impl FlatMode {
    /// Decodes a draw-time integer mode.
    pub fn from_index(mode: i32) -> Option<FlatMode> {
        num::FromPrimitive::from_i32(mode)
    }
}

/// One selected flat variant's buffer views.
#[derive(Debug, Clone, Copy)]
pub struct FlatVariant<'a> {
    /// Shared position array.
    pub positions: &'a [[f32; 3]],
    /// Mode's color array; `None` for [`FlatMode::Plain`].
    pub colors: Option<&'a [[f32; 4]]>,
    /// Shared triangle index array.
    pub indices: &'a [u32],
}

/// The region's flat/debug buffers: three vertex encodings over one
/// position and one index array.
#[derive(Debug, Default)]
pub struct FlatSet {
    positions: Vec<[f32; 3]>,
    tile_colors: Vec<[f32; 4]>,
    subtex_colors: Vec<[f32; 4]>,
    indices: Vec<u32>,
}

impl FlatSet {
    /// Buffer views for `mode`.
    pub fn variant(&self, mode: FlatMode) -> FlatVariant<'_> {
        FlatVariant {
            positions: &self.positions,
            colors: match mode {
                FlatMode::Plain => None,
                FlatMode::TileCoord => Some(&self.tile_colors),
                FlatMode::SubTex => Some(&self.subtex_colors),
            },
            indices: &self.indices,
        }
    }

    /// Packs `mode`'s attributes into upload-ready interleaved vertices
    /// (plain mode gets an opaque black color payload).
    pub fn interleave(&self, mode: FlatMode) -> Vec<FlatVertex> {
        let colors = self.variant(mode).colors;
        self.positions
            .iter()
            .enumerate()
            .map(|(i, p)| FlatVertex {
                position: *p,
                color: colors.map_or([0.0, 0.0, 0.0, 1.0], |c| c[i]),
            })
            .collect()
    }

    /// Vertex count shared by all variants.
    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    /// Index count shared by all variants.
    pub fn index_count(&self) -> usize {
        self.indices.len()
    }

    pub(crate) fn release(&mut self) {
        self.positions = Vec::new();
        self.tile_colors = Vec::new();
        self.subtex_colors = Vec::new();
        self.indices = Vec::new();
    }
}

struct FlatCons {
    set: FlatSet,
}

impl MeshCons for FlatCons {
    fn faces(&mut self, _view: &RegionView, patch: &TilePatch<'_>) {
        let base = self.set.positions.len() as u32;
        let cx = (patch.lc.x + 1) as f32 / TILE_COLOR_SCALE;
        let cy = (patch.lc.y + 1) as f32 / TILE_COLOR_SCALE;
        for v in patch.verts {
            self.set.positions.push([v.pos.x, v.pos.y, v.pos.z]);
            self.set.tile_colors.push([cx, cy, 0.0, 1.0]);
            self.set.subtex_colors.push([v.tc.x, v.tc.y, 0.0, 1.0]);
        }
        for &f in patch.faces {
            self.set.indices.push(base + f as u32);
        }
    }
}

/// Re-accumulates the region's ground topology into the flat buffers.
pub(crate) fn build_flats(m: &mut RegionBuilder<'_>) -> BuildResult<FlatSet> {
    let view = m.view();
    let source = m.source();
    let surf_rc = m.ground();
    let surf = surf_rc.borrow();

    let mut cons = FlatCons {
        set: FlatSet::default(),
    };
    for y in 0..view.sz.y {
        for x in 0..view.sz.x {
            let lc = Point2::new(x, y);
            let gc = Point2::new(view.ul.x + x, view.ul.y + y);
            if let Some(t) = source.tiler(source.tile_at(gc)) {
                t.lay_patch(&view, &surf, lc, gc, &mut cons);
            }
        }
    }
    Ok(cons.set)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mode_decodes_from_draw_time_integers() {
        assert_eq!(FlatMode::from_index(0), Some(FlatMode::Plain));
        assert_eq!(FlatMode::from_index(2), Some(FlatMode::SubTex));
        assert_eq!(FlatMode::from_index(3), None);
    }

    #[test]
    fn variants_share_positions_and_indices() {
        let set = FlatSet {
            positions: vec![[0.0; 3]; 4],
            tile_colors: vec![[0.1, 0.1, 0.0, 1.0]; 4],
            subtex_colors: vec![[1.0, 0.0, 0.0, 1.0]; 4],
            indices: vec![0, 1, 2, 0, 2, 3],
        };
        let a = set.variant(FlatMode::Plain);
        let b = set.variant(FlatMode::TileCoord);
        assert!(std::ptr::eq(a.positions, b.positions));
        assert!(std::ptr::eq(a.indices, b.indices));
        assert!(a.colors.is_none());
        assert_eq!(b.colors.map(|c| c.len()), Some(4));
    }
}

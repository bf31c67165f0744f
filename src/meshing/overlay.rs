//! Overlay channel extraction.
//!
//! Each tile carries a 32-bit membership mask; every set bit places the
//! tile in one independent overlay channel (selection rings, claim
//! markers, scripted highlights). Per channel, the member tiles' ground
//! topology is re-collected into its own mesh so the channel can be drawn
//! as a single decal batch over the terrain.

use std::collections::HashMap;

use cgmath::Point2;

use crate::error::BuildResult;
use crate::meshing::mesh_buf::{FrozenMesh, MeshBuf, VertId};
use crate::meshing::region::{RegionBuilder, RegionView};
use crate::terrain::tiler::{MeshCons, TilePatch};

/// Number of overlay channels, one per mask bit.
pub const OVERLAY_CHANNELS: usize = 32;

/// Accumulates one channel's geometry, deduplicating vertices by surface
/// grid id so adjoining member tiles share edge vertices.
struct ChannelCons {
    buf: MeshBuf,
    seen: HashMap<u32, VertId>,
}

impl MeshCons for ChannelCons {
    fn faces(&mut self, _view: &RegionView, patch: &TilePatch<'_>) {
        for v in patch.verts {
            if !self.seen.contains_key(&v.id) {
                let vid = self.buf.vertex(v.pos, v.nrm);
                self.seen.insert(v.id, vid);
            }
        }
        for f in patch.faces.chunks_exact(3) {
            let a = self.seen[&patch.verts[f[0] as usize].id];
            let b = self.seen[&patch.verts[f[1] as usize].id];
            let c = self.seen[&patch.verts[f[2] as usize].id];
            self.buf.face(a, b, c);
        }
    }
}

/// Extracts every non-empty overlay channel of the region under
/// construction.
pub(crate) fn build_overlays(
    m: &mut RegionBuilder<'_>,
) -> BuildResult<[Option<FrozenMesh>; OVERLAY_CHANNELS]> {
    let view = m.view();
    let source = m.source();
    let sz = view.sz;

    // One mask query per tile, up front.
    let mut ol = vec![0u32; (sz.x * sz.y) as usize];
    let mut union = 0u32;
    for y in 0..sz.y {
        for x in 0..sz.x {
            let mask = source.overlay_at(Point2::new(view.ul.x + x, view.ul.y + y));
            ol[(x + y * sz.x) as usize] = mask;
            union |= mask;
        }
    }

    let mut out: [Option<FrozenMesh>; OVERLAY_CHANNELS] = std::array::from_fn(|_| None);
    if union == 0 {
        return Ok(out);
    }

    let surf_rc = m.ground();
    let surf = surf_rc.borrow();
    for (i, slot) in out.iter_mut().enumerate() {
        if union & (1 << i) == 0 {
            continue;
        }
        let mut cons = ChannelCons {
            buf: MeshBuf::new(),
            seen: HashMap::new(),
        };
        for y in 0..sz.y {
            for x in 0..sz.x {
                if ol[(x + y * sz.x) as usize] & (1 << i) == 0 {
                    continue;
                }
                let lc = Point2::new(x, y);
                let gc = Point2::new(view.ul.x + x, view.ul.y + y);
                if let Some(t) = source.tiler(source.tile_at(gc)) {
                    t.lay_patch(&view, &surf, lc, gc, &mut cons);
                }
            }
        }
        if cons.buf.face_count() > 0 {
            *slot = Some(cons.buf.freeze());
        }
    }
    Ok(out)
}

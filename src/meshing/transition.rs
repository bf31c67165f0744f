//! Boundary transitions between differing terrain types.
//!
//! Where a higher-priority terrain borders a tile, its handler is asked to
//! blend edge/corner geometry onto that tile. The core only computes which
//! neighbors participate: a 4-bit border mask for cardinal neighbors and a
//! 4-bit corner mask for diagonals, per priority level, highest first. A
//! diagonal already flanked by a matching cardinal pair is omitted from
//! the corner mask since the two border pieces cover it.

use cgmath::Point2;
use fastrand::Rng;

use crate::error::BuildResult;
use crate::meshing::region::RegionBuilder;
use crate::terrain::source::TileId;

// Neighbor table offsets into the 3x3 priority grid, matching the mask
// bit order: border bits west, north, east, south; corner bits NW, NE,
// SE, SW.
const BX: [usize; 4] = [0, 1, 2, 1];
const BY: [usize; 4] = [1, 0, 1, 2];
const CX: [usize; 4] = [0, 2, 2, 0];
const CY: [usize; 4] = [0, 0, 2, 2];

/// Border and corner masks of `level` within a 3x3 neighborhood grid
/// (indexed `[x + 1][y + 1]`; the center entry is ignored).
pub(crate) fn masks(tr: &[[i32; 3]; 3], level: i32) -> (u8, u8) {
    let mut bm = 0u8;
    for o in 0..4 {
        if tr[BX[o]][BY[o]] == level {
            bm |= 1 << o;
        }
    }
    let mut cm = 0u8;
    for o in 0..4 {
        if bm & ((1 << o) | (1 << ((o + 1) % 4))) != 0 {
            continue;
        }
        if tr[CX[o]][CY[o]] == level {
            cm |= 1 << o;
        }
    }
    (bm, cm)
}

/// Runs the transition pass for the tile at `lc`/`gc`.
///
/// Levels at or below the tile's own priority never blend (equal terrain
/// needs no seam, lower priority stays underneath); levels without a
/// registered handler are skipped silently.
pub(crate) fn apply(
    m: &mut RegionBuilder<'_>,
    rng: &mut Rng,
    lc: Point2<i32>,
    gc: Point2<i32>,
) -> BuildResult<()> {
    let source = m.source();
    let own = source.tile_at(gc) as i32;
    let ground = match source.tiler(source.tile_at(gc)) {
        Some(t) => t,
        // The driver has already rejected tiles without a base handler.
        None => return Ok(()),
    };

    let mut tr = [[0i32; 3]; 3];
    let mut max = -1i32;
    for y in -1..=1i32 {
        for x in -1..=1i32 {
            if x == 0 && y == 0 {
                continue;
            }
            let tn = source.tile_at(Point2::new(gc.x + x, gc.y + y)) as i32;
            tr[(x + 1) as usize][(y + 1) as usize] = tn;
            max = max.max(tn);
        }
    }

    for i in ((own + 1)..=max).rev() {
        let (bm, cm) = masks(&tr, i);
        if bm == 0 && cm == 0 {
            continue;
        }
        let Some(t) = source.tiler(i as TileId) else {
            continue;
        };
        t.trans(m, rng, ground.as_ref(), lc, gc, 255 - i, bm, cm)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    // Builds the 3x3 grid from rows as seen on a map: row[y][x].
    fn grid(rows: [[i32; 3]; 3]) -> [[i32; 3]; 3] {
        let mut tr = [[0i32; 3]; 3];
        for (y, row) in rows.iter().enumerate() {
            for (x, &v) in row.iter().enumerate() {
                tr[x][y] = v;
            }
        }
        tr
    }

    #[test]
    fn uniform_neighborhood_produces_no_masks_above_own_level() {
        let tr = grid([[5, 5, 5], [5, 5, 5], [5, 5, 5]]);
        // Levels above the uniform value have no members at all.
        for level in 6..=8 {
            assert_eq!(masks(&tr, level), (0, 0));
        }
    }

    #[test]
    fn single_cardinal_neighbor_sets_one_border_bit() {
        // North neighbor only.
        let tr = grid([[0, 7, 0], [0, 0, 0], [0, 0, 0]]);
        assert_eq!(masks(&tr, 7), (0b0010, 0));

        // West neighbor only.
        let tr = grid([[0, 0, 0], [7, 0, 0], [0, 0, 0]]);
        assert_eq!(masks(&tr, 7), (0b0001, 0));
    }

    #[test]
    fn lone_diagonal_sets_a_corner_bit() {
        // North-west diagonal only.
        let tr = grid([[7, 0, 0], [0, 0, 0], [0, 0, 0]]);
        assert_eq!(masks(&tr, 7), (0, 0b0001));

        // South-east diagonal only.
        let tr = grid([[0, 0, 0], [0, 0, 0], [0, 0, 7]]);
        assert_eq!(masks(&tr, 7), (0, 0b0100));
    }

    #[test]
    fn diagonal_flanked_by_cardinal_pair_is_suppressed() {
        // West + north + the NW diagonal between them: the corner is
        // already covered by the two border pieces.
        let tr = grid([[7, 7, 0], [7, 0, 0], [0, 0, 0]]);
        let (bm, cm) = masks(&tr, 7);
        assert_eq!(bm, 0b0011);
        assert_eq!(cm, 0);
    }

    #[test]
    fn diagonal_next_to_single_cardinal_still_counts() {
        // NW diagonal with only a west border bit: bit pair (west, north)
        // is incomplete for the corner's covering rule only when NEITHER
        // adjacent cardinal matches; one matching cardinal suffices to
        // suppress it.
        let tr = grid([[7, 0, 0], [7, 0, 0], [0, 0, 0]]);
        let (bm, cm) = masks(&tr, 7);
        assert_eq!(bm, 0b0001);
        assert_eq!(cm, 0, "corner adjacent to a matching border is covered");

        // Whereas a diagonal with no adjacent cardinal match survives.
        let tr = grid([[7, 0, 0], [0, 0, 7], [0, 0, 0]]);
        let (bm, cm) = masks(&tr, 7);
        assert_eq!(bm, 0b0100);
        assert_eq!(cm, 0b0001);
    }
}

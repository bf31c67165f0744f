//! Texture references, render-state identity, and draw ordering.
//!
//! Render states here are value-equality descriptions, not device objects:
//! two states comparing equal are guaranteed to be drawable with one
//! pipeline/bind-group pair, which is what layer batching keys on. The
//! consumer owns the mapping from these descriptions to its actual GPU
//! state.

use std::collections::HashMap;
use std::rc::Rc;

use cgmath::Point2;

use crate::error::{BuildError, BuildResult};

/// Opaque identifier of an underlying texture image.
pub type TexId = u32;

/// Sampler wrapping behavior carried by a render state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WrapMode {
    /// Tile the texture (the default for terrain).
    Repeat,
    /// Clamp to a transparent border; used by ground decals so the
    /// projected image fades out at its rectangle instead of tiling.
    ClampBorder,
}

/// A reference to texture data usable for terrain rendering.
///
/// Tiles usually reference a rectangle inside a shared atlas
/// ([`Texture::Slice`]); the slice resolves through its parent for both
/// state identity and coordinate normalization, so every tile sharing an
/// atlas also shares a render state.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Texture {
    /// A whole standalone image.
    Whole {
        /// Image identity.
        id: TexId,
        /// Image size in pixels.
        sz: Point2<i32>,
    },
    /// A sub-rectangle of a parent image (texture atlas entry).
    Slice {
        /// Parent image identity.
        parent: TexId,
        /// Parent image size in pixels.
        parent_sz: Point2<i32>,
        /// Upper-left pixel of the slice within the parent.
        ul: Point2<i32>,
        /// Bottom-right pixel of the slice within the parent.
        br: Point2<i32>,
    },
    /// A render target. Targets have no stable contents during region
    /// construction and are rejected by the state resolver.
    Target {
        /// Target identity.
        id: TexId,
    },
}

impl Texture {
    /// Creates a whole-image texture reference.
    pub fn new(id: TexId, sz: Point2<i32>) -> Self {
        Texture::Whole { id, sz }
    }

    /// Creates a whole-image reference by decoding the dimensions of an
    /// encoded image (PNG).
    pub fn from_image_bytes(id: TexId, bytes: &[u8]) -> BuildResult<Self> {
        let img = image::load_from_memory(bytes)?;
        Ok(Texture::Whole {
            id,
            sz: Point2::new(img.width() as i32, img.height() as i32),
        })
    }

    /// Returns a slice of this texture covering `[ul, br)` in local pixels.
    ///
    /// Slicing a slice re-bases onto the original parent.
    pub fn slice(&self, ul: Point2<i32>, br: Point2<i32>) -> Texture {
        match *self {
            Texture::Whole { id, sz } => Texture::Slice {
                parent: id,
                parent_sz: sz,
                ul,
                br,
            },
            Texture::Slice {
                parent,
                parent_sz,
                ul: base,
                ..
            } => Texture::Slice {
                parent,
                parent_sz,
                ul: Point2::new(base.x + ul.x, base.y + ul.y),
                br: Point2::new(base.x + br.x, base.y + br.y),
            },
            Texture::Target { .. } => self.clone(),
        }
    }

    /// Size of the referenced rectangle in pixels.
    pub fn sz(&self) -> Point2<i32> {
        match *self {
            Texture::Whole { sz, .. } => sz,
            Texture::Slice { ul, br, .. } => Point2::new(br.x - ul.x, br.y - ul.y),
            Texture::Target { .. } => Point2::new(0, 0),
        }
    }

    /// Normalized u coordinate of local pixel column `px`.
    pub fn tcx(&self, px: i32) -> f32 {
        match *self {
            Texture::Whole { sz, .. } => px as f32 / sz.x as f32,
            Texture::Slice { parent_sz, ul, .. } => (ul.x + px) as f32 / parent_sz.x as f32,
            Texture::Target { .. } => 0.0,
        }
    }

    /// Normalized v coordinate of local pixel row `py`.
    pub fn tcy(&self, py: i32) -> f32 {
        match *self {
            Texture::Whole { sz, .. } => py as f32 / sz.y as f32,
            Texture::Slice { parent_sz, ul, .. } => (ul.y + py) as f32 / parent_sz.y as f32,
            Texture::Target { .. } => 0.0,
        }
    }

    /// The underlying image identity a render state is keyed on, or an
    /// error for texture kinds that cannot back terrain rendering.
    pub(crate) fn render_id(&self) -> BuildResult<TexId> {
        match *self {
            Texture::Whole { id, .. } => Ok(id),
            Texture::Slice { parent, .. } => Ok(parent),
            Texture::Target { id } => Err(BuildError::UnusableTexture(id)),
        }
    }
}

/// Identity of one drawable state: a texture plus the fixed-function bits
/// terrain batches vary on.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RenderState {
    /// Underlying texture image bound while drawing.
    pub tex: TexId,
    /// Whether geometry is clipped against the surface (ground plane
    /// batches clip, decorative overlay batches do not).
    pub clipped: bool,
    /// Sampler wrap behavior.
    pub wrap: WrapMode,
}

/// Per-region pool resolving textures to their clip/non-clip render-state
/// pair.
///
/// Repeated tiles sharing one atlas resolve to the same two `Rc`s, so the
/// layer scan and the auxiliary-data pool both see one identity per
/// distinct image.
#[derive(Default)]
pub struct StateCache {
    states: HashMap<TexId, [Rc<RenderState>; 2]>,
}

impl StateCache {
    /// Resolves `tex` to its cached render state.
    ///
    /// # Arguments
    /// * `tex` - Texture to resolve; slices resolve through their parent
    /// * `clip` - Whether the clip-aware variant of the pair is wanted
    pub fn state_for(&mut self, tex: &Texture, clip: bool) -> BuildResult<Rc<RenderState>> {
        let id = tex.render_id()?;
        let pair = self.states.entry(id).or_insert_with(|| {
            [
                Rc::new(RenderState {
                    tex: id,
                    clipped: true,
                    wrap: WrapMode::Repeat,
                }),
                Rc::new(RenderState {
                    tex: id,
                    clipped: false,
                    wrap: WrapMode::Repeat,
                }),
            ]
        });
        Ok(pair[if clip { 0 } else { 1 }].clone())
    }
}

/// Draw-order constants for the region's products.
///
/// The consumer's traversal submits batches in ascending order value;
/// within the layer slot, layers are already depth-sorted.
pub mod order {
    /// Ground/terrain layers.
    pub const LAYERS: i32 = 1000;
    /// Projected ground decals, drawn over the layers with a depth offset.
    pub const GROUND_MOD: i32 = 1001;
    /// Overlay channel meshes.
    pub const OVERLAY: i32 = 1002;

    /// Sub-ordering for transition blend layers: the inverted terrain
    /// priority in the high bits keeps higher-priority terrain on top,
    /// with room for per-handler sub-steps below.
    pub const fn blend(z: i32, subz: i32) -> i32 {
        (z << 8) + subz
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn state_pair_is_deduplicated_per_image() {
        let mut cache = StateCache::default();
        let atlas = Texture::new(3, Point2::new(256, 256));
        let a = atlas.slice(Point2::new(0, 0), Point2::new(32, 32));
        let b = atlas.slice(Point2::new(32, 0), Point2::new(64, 32));

        let sa = cache.state_for(&a, true).unwrap();
        let sb = cache.state_for(&b, true).unwrap();
        assert!(Rc::ptr_eq(&sa, &sb));

        let nc = cache.state_for(&a, false).unwrap();
        assert!(!Rc::ptr_eq(&sa, &nc));
        assert!(!nc.clipped);
    }

    #[test]
    fn render_target_is_rejected() {
        let mut cache = StateCache::default();
        let err = cache.state_for(&Texture::Target { id: 9 }, true);
        assert!(matches!(err, Err(BuildError::UnusableTexture(9))));
    }

    #[test]
    fn slice_coordinates_resolve_through_parent() {
        let atlas = Texture::new(1, Point2::new(128, 64));
        let s = atlas.slice(Point2::new(32, 16), Point2::new(64, 48));
        assert_eq!(s.sz(), Point2::new(32, 32));
        assert_eq!(s.tcx(0), 0.25);
        assert_eq!(s.tcy(0), 0.25);
        assert_eq!(s.tcx(32), 0.5);
    }

    #[test]
    fn texture_dimensions_decode_from_png() {
        let img = image::RgbaImage::new(4, 8);
        let mut bytes = Vec::new();
        img.write_to(
            &mut std::io::Cursor::new(&mut bytes),
            image::ImageFormat::Png,
        )
        .unwrap();
        let tex = Texture::from_image_bytes(2, &bytes).unwrap();
        assert_eq!(tex.sz(), Point2::new(4, 8));
    }

    #[test]
    fn blend_order_is_monotonic_in_priority() {
        assert!(order::blend(255 - 3, 0) < order::blend(255 - 2, 0));
        assert!(order::blend(10, 0) < order::blend(10, 1));
    }
}

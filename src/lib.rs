#![warn(missing_docs)]
#![warn(rustdoc::invalid_rust_codeblocks)]

//! # Terramesh
//!
//! A batched terrain mesh construction library for tile-based heightmap worlds.
//!
//! This crate converts a rectangular region of tiles into a GPU-ready renderable
//! scene: the ground surface, blended transitions between differing terrain
//! types, bitmask-selected overlay layers, and free-form prop geometry, all
//! grouped into as few draw batches as possible and frozen into immutable
//! vertex/index buffers.
//!
//! ## Key Modules
//!
//! * `core` - Grid indexing and deterministic random derivation utilities
//! * `terrain` - The world-data query interface and per-terrain-type handlers
//! * `meshing` - The region construction pipeline, from height grid to frozen batches
//! * `rendering` - GPU vertex formats, textures, and render-state identity
//!
//! ## Architecture
//!
//! Construction runs as a fixed sequence of phases over one region:
//! per-tile model contributions, geometry sealing, ground laying plus
//! transition blending, normal computation, post-normal prop emission,
//! per-layer batch freezing, and finally derived products (flat debug
//! meshes, overlay channels) plus auxiliary-state retention.
//!
//! The same seed, origin, and world data always produce bit-identical
//! buffers, so regions can be rebuilt or compared across runs.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use cgmath::Point2;
//! use terramesh::{NoiseSource, Region};
//!
//! let source = NoiseSource::new(7);
//! let region = Region::build(&source, 0xC0FFEE, Point2::new(0, 0), Point2::new(16, 16))?;
//! for layer in region.layers() {
//!     upload(layer.state(), layer.mesh());
//! }
//! ```

pub mod core;
pub mod error;
pub mod meshing;
pub mod rendering;
pub mod terrain;

pub use error::BuildError;
pub use meshing::{
    BuildParams, FlatMode, FlatSet, FrozenMesh, GroundMod, GroundSurface, Layer, MeshBuf, Plane,
    Region, RegionBuilder, RegionCache, Shape, VertId,
};
pub use rendering::{GroundVertex, RenderState, Texture, WrapMode};
pub use terrain::{GroundTiler, MeshCons, NoiseSource, TerrainSource, TileId, TilePatch, Tiler};

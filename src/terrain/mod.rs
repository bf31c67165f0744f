//! # Terrain Module
//!
//! The boundary between the mesher and the world it renders.
//!
//! ## Key Components
//! - `TerrainSource`: read-only query interface to the tile/height store
//! - `Tiler`: per-terrain-type geometry handler invoked by the build phases
//! - `GroundTiler`: the standard flat-ground handler with transition blending
//! - `NoiseSource`: a Perlin-heightmap source for tests and examples
//!
//! Handlers are registered with the world store, not with this crate; the
//! mesher only ever reaches them through `TerrainSource::tiler`.

pub mod ground;
pub mod noise_source;
pub mod source;
pub mod tiler;

pub use ground::{GroundTiler, TransSet};
pub use noise_source::NoiseSource;
pub use source::{TerrainSource, TileId};
pub use tiler::{MeshCons, PatchVert, TilePatch, Tiler};

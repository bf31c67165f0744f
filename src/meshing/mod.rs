//! Region mesh construction.
//!
//! This module turns tile/height data into batched, immutable GPU meshes.
//! The key correctness concerns all live here: shared surface vertices so
//! tiles never seam, deterministic per-tile randomness, batch identity by
//! (depth, render-state), and a strict phase order so nothing reads
//! normals before every contribution that can move a vertex has run.
//!
//! # Architecture
//! - `mesh_buf`: append-only geometry accumulation and the one-way freeze
//! - `surface`: the shared height/normal grid with its ghost border
//! - `aux_data`: lazily built, key-addressed per-region helper state
//! - `layer`: shape registration and per-(depth, state) batching
//! - `transition`: neighbor priority masks and blend dispatch
//! - `overlay`: 32 independent bitmask-selected decal channels
//! - `flat`: simplified debug/tooling mesh variants
//! - `ground_mod`: cross-region texture decals over built terrain
//! - `region`: the phase driver and the frozen region
//! - `region_cache`: bounded LRU working set of built regions

pub mod aux_data;
pub mod flat;
pub mod ground_mod;
pub mod layer;
pub mod mesh_buf;
pub mod overlay;
pub mod region;
pub mod region_cache;
pub mod surface;

pub(crate) mod transition;

pub use aux_data::{AuxKey, BuildCtx, ConsHooks, MatKey, MatModel};
pub use flat::{FlatMode, FlatSet, FlatVariant};
pub use ground_mod::GroundMod;
pub use layer::{Layer, Plane, Shape};
pub use mesh_buf::{FrozenMesh, MeshBuf, VertId};
pub use overlay::OVERLAY_CHANNELS;
pub use region::{
    BuildParams, ExtraMesh, Region, RegionBuilder, RegionView, DEFAULT_TILE_SIZE,
};
pub use region_cache::RegionCache;
pub use surface::{GroundKey, GroundSurface, SurfPoint};

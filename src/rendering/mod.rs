//! GPU-facing data: vertex formats, texture references, and render-state
//! identity.
//!
//! Nothing in this module talks to a device. The crate's products are
//! CPU-side buffers laid out for upload (`bytemuck`-castable vertex
//! structs with matching `wgpu` layout descriptors) plus value-equality
//! render-state descriptions the consumer maps onto its own pipeline
//! objects.

pub mod state;
pub mod vertex;

pub use state::{order, RenderState, StateCache, TexId, Texture, WrapMode};
pub use vertex::{FlatVertex, GroundVertex};

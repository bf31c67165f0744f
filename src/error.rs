//! Error types for region construction.
//!
//! Every fatal condition aborts the current build wholesale: no partial
//! region is ever returned, and because construction is deterministic a
//! retry with the same inputs fails the same way. Expected absences (a
//! missing transition handler for one priority level, an overlay channel
//! with no member tiles) are not errors and are skipped silently by the
//! pipeline.

use crate::terrain::TileId;

/// Result alias used throughout the construction pipeline.
pub type BuildResult<T> = Result<T, BuildError>;

/// Fatal construction errors.
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    /// A tile's own terrain type has no registered handler. Unlike a
    /// transition-level handler (which may legitimately be absent), the
    /// base handler for a tile is required to lay any ground at all.
    #[error("no tiler registered for tile type {id} at ({x}, {y})")]
    MissingTiler {
        /// The unhandled terrain type.
        id: TileId,
        /// Global tile x coordinate.
        x: i32,
        /// Global tile y coordinate.
        y: i32,
    },

    /// A layer reached the freeze phase without a single shape. A handler
    /// created the layer and then contributed nothing, which is a logic
    /// bug in that handler rather than a recoverable runtime condition.
    #[error("layer at depth {z} frozen with no shapes")]
    EmptyLayer {
        /// Depth of the offending layer.
        z: i32,
    },

    /// The texture cannot back a terrain render state (render targets
    /// have no stable sampleable contents during construction).
    #[error("texture {0} cannot be used for terrain rendering")]
    UnusableTexture(u32),

    /// A transition set was constructed with the wrong variant counts.
    #[error("transition set requires 15 border and 15 corner textures, got {border} and {corner}")]
    BadTransSet {
        /// Supplied border variant count.
        border: usize,
        /// Supplied corner variant count.
        corner: usize,
    },

    /// A ground decal spans a tile whose region has not been built.
    #[error("no built region available for tile ({x}, {y})")]
    MissingRegion {
        /// Global tile x coordinate.
        x: i32,
        /// Global tile y coordinate.
        y: i32,
    },

    /// Build parameters failed to parse.
    #[error("bad build parameters: {0}")]
    Config(#[from] serde_json::Error),

    /// A texture image failed to decode.
    #[error("bad texture image: {0}")]
    Image(#[from] image::ImageError),
}

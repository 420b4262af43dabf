//! # World Error Types
//!
//! All errors that can occur building or indexing the world.

use thiserror::Error;

/// Errors that can occur in the world core.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum WorldError {
    /// The window has no area.
    #[error("world dimensions must be non-zero, got {width}x{height}")]
    ZeroDimension {
        /// Requested width in pixels.
        width: u32,
        /// Requested height in pixels.
        height: u32,
    },

    /// No tile columns were requested.
    #[error("horizontal tile count must be at least 1")]
    ZeroTiles,

    /// The partition count cannot split the tile columns.
    #[error("cannot split {columns} tile columns into {partitions} partitions")]
    InvalidPartitionCount {
        /// Requested partition count.
        partitions: usize,
        /// Available tile columns.
        columns: u32,
    },

    /// Trade radius is negative or not finite.
    #[error("trade radius must be finite and non-negative, got {0}")]
    InvalidTradeRadius(f32),

    /// A location maps outside the tile grid.
    #[error("location ({x}, {y}) lies outside the world ({tile_count} tiles)")]
    OutOfBounds {
        /// Offending x coordinate.
        x: f32,
        /// Offending y coordinate.
        y: f32,
        /// Number of tiles in the world.
        tile_count: usize,
    },
}

/// Result type for world operations.
pub type WorldResult<T> = Result<T, WorldError>;

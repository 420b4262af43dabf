//! World construction parameters.

use market_shared::{
    DEFAULT_HORIZONTAL_TILES, DEFAULT_PARTITIONS, DEFAULT_TRADE_RADIUS, DEFAULT_WINDOW_HEIGHT,
    DEFAULT_WINDOW_WIDTH,
};
use serde::{Deserialize, Serialize};

/// Geometry and partitioning of a [`World`](crate::World).
///
/// Deserializes from the `[world]` table of a simulation config. Missing
/// keys fall back to the defaults.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WorldConfig {
    /// Window width in pixels.
    pub width: u32,
    /// Window height in pixels.
    pub height: u32,
    /// Number of tile columns (`H`).
    pub horizontal_tiles: u32,
    /// Number of column partitions processed in parallel.
    pub partitions: usize,
    /// Trade interaction radius in pixels.
    pub trade_radius: f32,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            width: DEFAULT_WINDOW_WIDTH,
            height: DEFAULT_WINDOW_HEIGHT,
            horizontal_tiles: DEFAULT_HORIZONTAL_TILES,
            partitions: DEFAULT_PARTITIONS,
            trade_radius: DEFAULT_TRADE_RADIUS,
        }
    }
}

impl WorldConfig {
    /// Config for a `width` x `height` window with `horizontal_tiles` columns.
    ///
    /// Partition count and trade radius keep their defaults.
    #[must_use]
    pub fn with_size(width: u32, height: u32, horizontal_tiles: u32) -> Self {
        Self {
            width,
            height,
            horizontal_tiles,
            ..Self::default()
        }
    }
}

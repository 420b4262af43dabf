//! # Simulation Defaults
//!
//! Baseline values used when a config file leaves a field out.

// =============================================================================
// WINDOW / WORLD
// =============================================================================

/// Default window width in pixels.
pub const DEFAULT_WINDOW_WIDTH: u32 = 1280;

/// Default window height in pixels.
pub const DEFAULT_WINDOW_HEIGHT: u32 = 760;

/// Default number of tile columns across the window.
pub const DEFAULT_HORIZONTAL_TILES: u32 = 9;

/// Default number of column partitions (LEFT, CENTER, RIGHT).
pub const DEFAULT_PARTITIONS: usize = 3;

// =============================================================================
// TRADING
// =============================================================================

/// Default trade radius around a Rug, in pixels.
pub const DEFAULT_TRADE_RADIUS: f32 = 24.0;

/// Default time a Rug waits after a trade before it trades again.
pub const DEFAULT_TRADE_COOLDOWN_SECS: f32 = 1.5;

// =============================================================================
// NPC MOVEMENT
// =============================================================================

/// Slowest NPC walking speed, pixels per second.
pub const MIN_SPEED: f32 = 10.0;

/// Fastest NPC walking speed, pixels per second.
pub const MAX_SPEED: f32 = 30.0;

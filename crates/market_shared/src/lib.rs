//! # Market Shared
//!
//! Leaf types used by both the world core and the simulation driver.
//!
//! ## CRITICAL RULE
//!
//! This crate must NEVER depend on:
//! - `market_core` or `market`
//! - Any locking primitive
//! - Any window, texture or GPU crate
//!
//! If you need entity types, put them in `market_core`.

#![deny(missing_docs)]
#![deny(unsafe_code)]

pub mod constants;
pub mod geometry;
pub mod math;

pub use constants::{
    DEFAULT_HORIZONTAL_TILES, DEFAULT_PARTITIONS, DEFAULT_TRADE_COOLDOWN_SECS,
    DEFAULT_TRADE_RADIUS, DEFAULT_WINDOW_HEIGHT, DEFAULT_WINDOW_WIDTH, MAX_SPEED, MIN_SPEED,
};
pub use geometry::{clamp, line_segment_overlaps_circle, points_in_range};
pub use math::Vec2;

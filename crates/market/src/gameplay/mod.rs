//! # Gameplay Entities
//!
//! The two kinds of entity the market is populated with, plus the driver
//! commands that steer the crowd.

pub mod npc;
pub mod rug;

pub use npc::{Animation, Npc};
pub use rug::Rug;

use market_shared::{clamp, Vec2};

/// A corner of the window.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Corner {
    /// `(0, 0)`.
    TopLeft,
    /// `(width, 0)`.
    TopRight,
    /// `(0, height)`.
    BottomLeft,
    /// `(width, height)`.
    BottomRight,
}

impl Corner {
    /// The corner point, clamped inside a world of size `bounds`.
    #[must_use]
    pub fn point(self, bounds: Vec2) -> Vec2 {
        let corner = match self {
            Self::TopLeft => Vec2::ZERO,
            Self::TopRight => Vec2::new(bounds.x, 0.0),
            Self::BottomLeft => Vec2::new(0.0, bounds.y),
            Self::BottomRight => bounds,
        };
        clamp(corner, bounds)
    }
}

/// Crowd-wide instructions.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Command {
    /// Every NPC stops where it is.
    StopAll,
    /// Every NPC gets a random throttle in `[0, 1)`.
    RandomizeSpeeds,
    /// Every NPC walks at full speed.
    FullSpeed,
    /// Every NPC heads for a corner.
    WalkToCorner(Corner),
}

//! # Render Capability
//!
//! The core decides *when* and in *which order* entities draw (tile by tile,
//! ascending `y` within a tile). *What* gets drawn is a [`DrawCommand`]
//! submitted to an external [`RenderTarget`]; turning commands into pixels
//! happens outside this crate.

use market_shared::Vec2;

use crate::entity::{EntityId, TradeState};

/// Which sprite sheet and row to draw from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Sprite {
    /// NPC carrying the given goods.
    Npc(TradeState),
    /// Rug displaying the given goods.
    Rug(TradeState),
}

/// A single draw request.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DrawCommand {
    /// Entity that issued the command.
    pub entity: EntityId,
    /// Sprite to draw.
    pub sprite: Sprite,
    /// Top-left of the sprite in world pixels.
    pub position: Vec2,
    /// Animation frame within the sprite row.
    pub frame: u32,
}

/// Sink for draw commands.
///
/// Shared by every partition's render task, so it must accept submissions
/// from several threads at once.
pub trait RenderTarget: Send + Sync {
    /// Accepts one draw command.
    fn submit(&self, command: DrawCommand);
}

//! # Rugs
//!
//! Stationary stalls that display one kind of goods. After a trade a Rug
//! closes for `trade_cooldown_secs`.

use market_core::{
    DrawCommand, Entity, EntityCore, EntityId, RenderTarget, Sprite, Stall, TradeState, Trader,
};
use market_shared::Vec2;
use parking_lot::Mutex;

/// A trade stall.
#[derive(Debug)]
pub struct Rug {
    core: EntityCore,
    cooldown_secs: f32,
    /// Seconds until the Rug reopens; open at or below zero.
    remaining: Mutex<f32>,
}

impl Rug {
    /// Creates an open Rug at `location`.
    #[must_use]
    pub fn new(id: EntityId, location: Vec2, state: TradeState, cooldown_secs: f32) -> Self {
        Self {
            core: EntityCore::new(id, location, state),
            cooldown_secs: cooldown_secs.max(0.0),
            remaining: Mutex::new(0.0),
        }
    }

    /// Advances the cooldown by `dt` seconds.
    ///
    /// Also records the (unchanged) position so the previous location never
    /// goes stale.
    pub fn update(&self, dt: f32) {
        let mut remaining = self.remaining.lock();
        if *remaining > 0.0 {
            *remaining = (*remaining - dt).max(0.0);
        }
        self.core.move_to(self.core.motion().location);
    }

    /// Seconds until the Rug can trade again.
    #[must_use]
    pub fn cooldown_remaining(&self) -> f32 {
        *self.remaining.lock()
    }
}

impl Stall for Rug {
    fn can_trade(&self) -> bool {
        *self.remaining.lock() <= 0.0
    }

    fn reset_cooldown(&self) {
        *self.remaining.lock() = self.cooldown_secs;
    }
}

impl Entity for Rug {
    fn core(&self) -> &EntityCore {
        &self.core
    }

    fn trader(&self) -> Trader<'_> {
        Trader::Rug(self)
    }

    fn render(&self, target: &dyn RenderTarget) {
        let state = self.trade_state();
        // One sheet column per kind of goods
        target.submit(DrawCommand {
            entity: self.unique_id(),
            sprite: Sprite::Rug(state),
            position: self.location(),
            frame: u32::from(state.as_u8()),
        });
    }
}

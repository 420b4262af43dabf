//! Shared fixtures for the world integration tests.

#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use market_core::{
    Customer, DrawCommand, Entity, EntityCore, EntityId, IdAllocator, OverlapLatch, RenderTarget,
    Sprite, Stall, TradeState, Trader,
};
use market_shared::Vec2;
use parking_lot::Mutex;

pub static IDS: IdAllocator = IdAllocator::new();

/// NPC moved by hand from the test body.
pub struct Walker {
    core: EntityCore,
    latch: OverlapLatch,
}

impl Walker {
    pub fn spawn(location: Vec2, state: TradeState) -> Arc<Self> {
        Arc::new(Self {
            core: EntityCore::new(IDS.allocate(), location, state),
            latch: OverlapLatch::new(),
        })
    }

    /// Steps to `location`, rolling the overlap latch like a real update.
    pub fn step(&self, location: Vec2) {
        self.latch.roll();
        self.core.move_to(location);
    }
}

impl Customer for Walker {
    fn was_overlapping(&self) -> bool {
        self.latch.previous()
    }

    fn is_overlapping(&self) -> bool {
        self.latch.current()
    }

    fn mark_overlapping(&self) {
        self.latch.mark();
    }
}

impl Entity for Walker {
    fn core(&self) -> &EntityCore {
        &self.core
    }

    fn trader(&self) -> Trader<'_> {
        Trader::Npc(self)
    }

    fn render(&self, target: &dyn RenderTarget) {
        target.submit(DrawCommand {
            entity: self.unique_id(),
            sprite: Sprite::Npc(self.trade_state()),
            position: self.location(),
            frame: 0,
        });
    }
}

/// Rug that closes after one trade until reopened.
pub struct Stand {
    core: EntityCore,
    open: AtomicBool,
}

impl Stand {
    pub fn spawn(location: Vec2, state: TradeState) -> Arc<Self> {
        Arc::new(Self {
            core: EntityCore::new(IDS.allocate(), location, state),
            open: AtomicBool::new(true),
        })
    }

    pub fn reopen(&self) {
        self.open.store(true, Ordering::SeqCst);
    }
}

impl Stall for Stand {
    fn can_trade(&self) -> bool {
        self.open.load(Ordering::SeqCst)
    }

    fn reset_cooldown(&self) {
        self.open.store(false, Ordering::SeqCst);
    }
}

impl Entity for Stand {
    fn core(&self) -> &EntityCore {
        &self.core
    }

    fn trader(&self) -> Trader<'_> {
        Trader::Rug(self)
    }

    fn render(&self, target: &dyn RenderTarget) {
        target.submit(DrawCommand {
            entity: self.unique_id(),
            sprite: Sprite::Rug(self.trade_state()),
            position: self.location(),
            frame: 0,
        });
    }
}

/// Render target recording every command in submission order.
#[derive(Default)]
pub struct Recorder {
    pub commands: Mutex<Vec<DrawCommand>>,
}

impl Recorder {
    pub fn ids(&self) -> Vec<EntityId> {
        self.commands.lock().iter().map(|c| c.entity).collect()
    }
}

impl RenderTarget for Recorder {
    fn submit(&self, command: DrawCommand) {
        self.commands.lock().push(command);
    }
}

/// Deterministic point inside a `width` x `height` window.
pub fn scatter(seed: u32, width: f32, height: f32) -> Vec2 {
    let a = seed.wrapping_mul(2_654_435_761);
    let b = a.rotate_left(13).wrapping_mul(40_503);
    let x = (a % 10_000) as f32 / 10_000.0 * width;
    let y = (b % 10_000) as f32 / 10_000.0 * height;
    Vec2::new(x, y)
}

//! # NPC Walkers
//!
//! NPCs wander the market carrying one kind of goods:
//! - Walk toward a target at their own speed, pick a new one on arrival
//! - Never leave the window (movement is clamped)
//! - Cycle a walk animation while moving, rest on frame 0 when stopped
//!
//! The overlap latch rolls at the start of every update, so a trade scan
//! that runs after the update sees last tick's overlap in `previous`.

use market_core::{
    Customer, DrawCommand, Entity, EntityCore, EntityId, OverlapLatch, RenderTarget, Sprite,
    TradeState, Trader,
};
use market_shared::{clamp, Vec2};
use parking_lot::Mutex;

// ============================================================================
// ANIMATION
// ============================================================================

/// Walk-cycle timing shared by every NPC.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Animation {
    /// Frames in the cycle.
    pub frame_count: u32,
    /// Seconds each frame is shown.
    pub period: f32,
}

impl Default for Animation {
    fn default() -> Self {
        Self {
            frame_count: 4,
            period: 0.15,
        }
    }
}

// ============================================================================
// NPC COMPONENT
// ============================================================================

/// Mutable walking state, touched only by the NPC's own update and commands.
#[derive(Clone, Copy, Debug)]
struct Walk {
    target: Vec2,
    /// Speed at full throttle (px/s).
    base_speed: f32,
    /// Throttle in `[0, 1]`.
    throttle: f32,
    frame: u32,
    frame_clock: f32,
}

/// A walking trader.
#[derive(Debug)]
pub struct Npc {
    core: EntityCore,
    latch: OverlapLatch,
    walk: Mutex<Walk>,
    bounds: Vec2,
    animation: Animation,
}

impl Npc {
    /// Creates an NPC at `location` heading for `target`.
    ///
    /// # Arguments
    ///
    /// * `base_speed` - Speed at full throttle, px/s
    /// * `bounds` - World size; positions and targets are clamped into it
    #[must_use]
    pub fn new(
        id: EntityId,
        location: Vec2,
        state: TradeState,
        target: Vec2,
        base_speed: f32,
        bounds: Vec2,
        animation: Animation,
    ) -> Self {
        Self {
            core: EntityCore::new(id, clamp(location, bounds), state),
            latch: OverlapLatch::new(),
            walk: Mutex::new(Walk {
                target: clamp(target, bounds),
                base_speed: base_speed.max(0.0),
                throttle: 1.0,
                frame: 0,
                frame_clock: 0.0,
            }),
            bounds,
            animation,
        }
    }

    /// Advances one tick.
    ///
    /// `next_target` is only used if the NPC reaches its current target this
    /// tick.
    pub fn update(&self, dt: f32, next_target: Vec2) {
        self.latch.roll();

        let mut walk = self.walk.lock();
        let here = self.core.motion().location;
        let speed = walk.base_speed * walk.throttle;

        if speed <= 0.0 || dt <= 0.0 {
            self.core.move_to(here);
            walk.frame = 0;
            walk.frame_clock = 0.0;
            return;
        }

        let to_target = walk.target - here;
        let step = speed * dt;
        let next = if to_target.length() <= step {
            let arrived = walk.target;
            walk.target = clamp(next_target, self.bounds);
            arrived
        } else {
            here + to_target.normalize_or_zero() * step
        };
        self.core.move_to(clamp(next, self.bounds));

        let period = self.animation.period;
        if period.is_nan() || period <= 0.0 {
            return;
        }
        walk.frame_clock += dt;
        if walk.frame_clock >= period {
            let frames = self.animation.frame_count.max(1);
            let steps = (walk.frame_clock / period).floor();
            // Saturating cast; huge step counts only need to land on some frame
            let advance = (steps as u64 % u64::from(frames)) as u32;
            walk.frame = (walk.frame + advance) % frames;
            walk.frame_clock = walk.frame_clock.rem_euclid(period);
        }
    }

    /// Sets the throttle, clamped to `[0, 1]`. Zero stops the NPC.
    pub fn set_throttle(&self, throttle: f32) {
        let throttle = if throttle.is_nan() { 0.0 } else { throttle.clamp(0.0, 1.0) };
        self.walk.lock().throttle = throttle;
    }

    /// Replaces the current walk target.
    pub fn walk_to(&self, target: Vec2) {
        self.walk.lock().target = clamp(target, self.bounds);
    }

    /// Current speed in px/s after throttle.
    #[must_use]
    pub fn speed(&self) -> f32 {
        let walk = self.walk.lock();
        walk.base_speed * walk.throttle
    }

    /// Where the NPC is heading.
    #[must_use]
    pub fn target(&self) -> Vec2 {
        self.walk.lock().target
    }

    /// Current walk-cycle frame.
    #[must_use]
    pub fn frame(&self) -> u32 {
        self.walk.lock().frame
    }

    /// The overlap latch.
    #[must_use]
    pub fn latch(&self) -> &OverlapLatch {
        &self.latch
    }
}

impl Customer for Npc {
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

impl Entity for Npc {
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
            frame: self.frame(),
        });
    }
}

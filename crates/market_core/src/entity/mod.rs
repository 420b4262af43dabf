//! # Entity Capability Set
//!
//! The core never owns entities. The driver builds them, wraps them in
//! `Arc<dyn Entity>` and hands the world a reference to index.
//!
//! ## Dispatch
//!
//! Interaction rules depend on what an entity *is*. Instead of checking a type
//! tag and casting, each entity hands out a tagged [`Trader`] view:
//!
//! ```text
//! entity.trader()
//!   ├─ Trader::Rug(&dyn Stall)      cooldown gate
//!   └─ Trader::Npc(&dyn Customer)   overlap latch
//! ```

mod id;
mod state;

pub use id::{EntityId, IdAllocator};
pub use state::{
    EntityCore, EntityKind, Motion, OverlapLatch, SubspaceIndex, SubspaceSlot, TradeCell,
    TradeState,
};

use market_shared::Vec2;

use crate::render::RenderTarget;

/// Rug side of a trade.
pub trait Stall: Send + Sync {
    /// Whether the trade cooldown has expired.
    fn can_trade(&self) -> bool;

    /// Re-arms the trade cooldown after a swap.
    fn reset_cooldown(&self);
}

/// NPC side of a trade.
pub trait Customer: Send + Sync {
    /// Whether the NPC overlapped a Rug during the previous tick.
    fn was_overlapping(&self) -> bool;

    /// Whether the NPC has been seen overlapping a Rug this tick.
    fn is_overlapping(&self) -> bool;

    /// Records an overlap this tick.
    fn mark_overlapping(&self);
}

/// Tagged view of an entity's role in trading.
#[derive(Clone, Copy)]
pub enum Trader<'a> {
    /// A stationary trade object.
    Rug(&'a dyn Stall),
    /// A mobile agent.
    Npc(&'a dyn Customer),
}

impl Trader<'_> {
    /// The discriminator matching this role.
    #[must_use]
    pub fn kind(&self) -> EntityKind {
        match self {
            Trader::Rug(_) => EntityKind::Rug,
            Trader::Npc(_) => EntityKind::Npc,
        }
    }
}

/// Capabilities every entity indexed by the world exposes.
///
/// Only [`core`](Self::core), [`trader`](Self::trader) and
/// [`render`](Self::render) need implementing. Subspace membership is
/// read-only from outside this crate.
pub trait Entity: Send + Sync {
    /// The shared per-entity state.
    fn core(&self) -> &EntityCore;

    /// The entity's role in trading.
    fn trader(&self) -> Trader<'_>;

    /// Draws the entity.
    ///
    /// Never called concurrently for the same entity by the world, but
    /// different entities render concurrently from different partitions.
    fn render(&self, target: &dyn RenderTarget);

    /// Interaction-rule discriminator.
    fn kind(&self) -> EntityKind {
        self.trader().kind()
    }

    /// Process-unique ID.
    fn unique_id(&self) -> EntityId {
        self.core().id()
    }

    /// Current and previous location, read together.
    fn motion(&self) -> Motion {
        self.core().motion()
    }

    /// Position this tick.
    fn location(&self) -> Vec2 {
        self.motion().location
    }

    /// Position at the prior tick.
    fn previous_location(&self) -> Vec2 {
        self.motion().previous
    }

    /// Goods currently held.
    fn trade_state(&self) -> TradeState {
        self.core().trade().load()
    }

    /// Replaces the goods held.
    fn set_trade_state(&self, state: TradeState) {
        self.core().trade().store(state);
    }

    /// Occupied tile, `None` before the first placement.
    fn subspace(&self) -> Option<SubspaceIndex> {
        self.core().subspace().get()
    }
}

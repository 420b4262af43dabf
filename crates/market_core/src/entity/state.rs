//! # Per-Entity Shared State
//!
//! Every entity is referenced from the driver's update threads and from
//! exactly one tile at a time, and those run on different threads. The state
//! they share is therefore stored in independently synchronized cells:
//!
//! | State              | Cell             | Written by                   |
//! |--------------------|------------------|------------------------------|
//! | trade state        | [`TradeCell`]    | the tile's trade scan        |
//! | subspace membership| [`SubspaceSlot`] | `World::place_entity` only   |
//! | location, previous | `Mutex<Motion>`  | the entity's own update      |
//! | overlap latch      | [`OverlapLatch`] | trade scan + NPC update      |

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU8, Ordering};

use market_shared::Vec2;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use super::id::EntityId;

// =============================================================================
// TRADE STATE
// =============================================================================

/// The goods an entity is currently holding.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum TradeState {
    /// Holding a chicken.
    Chicken = 0,
    /// Holding a lamb.
    Lamb = 1,
    /// Holding bread and wine.
    BreadWine = 2,
}

impl TradeState {
    /// Every trade state, in discriminant order.
    pub const ALL: [Self; 3] = [Self::Chicken, Self::Lamb, Self::BreadWine];

    /// Converts from the raw discriminant. Out-of-range values wrap.
    #[must_use]
    pub const fn from_u8(value: u8) -> Self {
        match value % 3 {
            0 => Self::Chicken,
            1 => Self::Lamb,
            _ => Self::BreadWine,
        }
    }

    /// Returns the raw discriminant.
    #[must_use]
    pub const fn as_u8(self) -> u8 {
        self as u8
    }

    /// Display name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Chicken => "chicken",
            Self::Lamb => "lamb",
            Self::BreadWine => "bread & wine",
        }
    }
}

impl fmt::Display for TradeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Atomic holder for a [`TradeState`].
#[derive(Debug)]
pub struct TradeCell(AtomicU8);

impl TradeCell {
    /// Creates a cell holding `state`.
    #[must_use]
    pub const fn new(state: TradeState) -> Self {
        Self(AtomicU8::new(state as u8))
    }

    /// Reads the current state.
    #[inline]
    #[must_use]
    pub fn load(&self) -> TradeState {
        TradeState::from_u8(self.0.load(Ordering::Acquire))
    }

    /// Replaces the current state.
    #[inline]
    pub fn store(&self, state: TradeState) {
        self.0.store(state.as_u8(), Ordering::Release);
    }
}

// =============================================================================
// ENTITY KIND
// =============================================================================

/// Closed discriminator used for interaction-rule dispatch.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EntityKind {
    /// A mobile agent.
    Npc,
    /// A stationary trade object.
    Rug,
}

// =============================================================================
// SUBSPACE MEMBERSHIP
// =============================================================================

/// Row-major index of a tile within the world's tile array.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct SubspaceIndex(u32);

impl SubspaceIndex {
    /// Wraps a raw index.
    #[inline]
    #[must_use]
    pub const fn new(raw: u32) -> Self {
        Self(raw)
    }

    /// Returns the raw index.
    #[inline]
    #[must_use]
    pub const fn get(self) -> u32 {
        self.0
    }

    /// Returns the raw index as a `usize`.
    #[inline]
    #[must_use]
    pub const fn as_usize(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for SubspaceIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "tile {}", self.0)
    }
}

const UNPLACED: u32 = u32::MAX;

/// Atomic slot recording which tile an entity currently occupies.
///
/// Holds nothing until the first placement. Only the world writes it.
#[derive(Debug)]
pub struct SubspaceSlot(AtomicU32);

impl SubspaceSlot {
    /// Creates an empty slot (entity not yet placed).
    #[must_use]
    pub const fn unplaced() -> Self {
        Self(AtomicU32::new(UNPLACED))
    }

    /// Returns the occupied tile, or `None` before the first placement.
    #[inline]
    #[must_use]
    pub fn get(&self) -> Option<SubspaceIndex> {
        match self.0.load(Ordering::Acquire) {
            UNPLACED => None,
            raw => Some(SubspaceIndex(raw)),
        }
    }

    #[inline]
    pub(crate) fn set(&self, index: SubspaceIndex) {
        debug_assert_ne!(index.0, UNPLACED);
        self.0.store(index.0, Ordering::Release);
    }
}

// =============================================================================
// MOTION
// =============================================================================

/// Current and previous-tick positions, read together.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Motion {
    /// Position this tick.
    pub location: Vec2,
    /// Position at the prior tick.
    pub previous: Vec2,
}

impl Motion {
    /// Motion of an entity standing still at `location`.
    #[must_use]
    pub const fn at(location: Vec2) -> Self {
        Self {
            location,
            previous: location,
        }
    }
}

// =============================================================================
// ENTITY CORE
// =============================================================================

/// State every concrete entity embeds.
///
/// The default methods of [`Entity`](super::Entity) read through it, so a
/// concrete entity only has to hand out a reference.
#[derive(Debug)]
pub struct EntityCore {
    id: EntityId,
    trade: TradeCell,
    subspace: SubspaceSlot,
    motion: Mutex<Motion>,
}

impl EntityCore {
    /// Creates unplaced core state at `location`.
    #[must_use]
    pub fn new(id: EntityId, location: Vec2, trade_state: TradeState) -> Self {
        Self {
            id,
            trade: TradeCell::new(trade_state),
            subspace: SubspaceSlot::unplaced(),
            motion: Mutex::new(Motion::at(location)),
        }
    }

    /// The entity's unique ID.
    #[inline]
    #[must_use]
    pub fn id(&self) -> EntityId {
        self.id
    }

    /// The trade-state cell.
    #[inline]
    #[must_use]
    pub fn trade(&self) -> &TradeCell {
        &self.trade
    }

    /// The subspace slot.
    #[inline]
    #[must_use]
    pub fn subspace(&self) -> &SubspaceSlot {
        &self.subspace
    }

    /// Snapshot of current and previous location.
    #[inline]
    #[must_use]
    pub fn motion(&self) -> Motion {
        *self.motion.lock()
    }

    /// Moves to `location`, remembering the current location as previous.
    pub fn move_to(&self, location: Vec2) {
        let mut motion = self.motion.lock();
        motion.previous = motion.location;
        motion.location = location;
    }

    /// Puts the entity at `location` with no motion history.
    pub fn teleport(&self, location: Vec2) {
        *self.motion.lock() = Motion::at(location);
    }
}

// =============================================================================
// OVERLAP LATCH
// =============================================================================

/// Two-flag latch that makes NPC trades edge-triggered.
///
/// `current` is raised by the trade scan whenever the NPC's motion segment
/// touches a Rug. [`roll`](Self::roll) moves it into `previous` at the start
/// of the NPC's next update. A trade needs `previous == false`, so an NPC
/// standing on a Rug trades once, not every frame.
#[derive(Debug, Default)]
pub struct OverlapLatch {
    previous: AtomicBool,
    current: AtomicBool,
}

impl OverlapLatch {
    /// Creates a cleared latch.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            previous: AtomicBool::new(false),
            current: AtomicBool::new(false),
        }
    }

    /// Whether the NPC overlapped a Rug last tick.
    #[inline]
    #[must_use]
    pub fn previous(&self) -> bool {
        self.previous.load(Ordering::Acquire)
    }

    /// Whether the NPC has been seen overlapping a Rug this tick.
    #[inline]
    #[must_use]
    pub fn current(&self) -> bool {
        self.current.load(Ordering::Acquire)
    }

    /// Records an overlap this tick.
    #[inline]
    pub fn mark(&self) {
        self.current.store(true, Ordering::Release);
    }

    /// Starts a new tick: `previous = current`, `current = false`.
    pub fn roll(&self) {
        let was = self.current.swap(false, Ordering::AcqRel);
        self.previous.store(was, Ordering::Release);
    }
}

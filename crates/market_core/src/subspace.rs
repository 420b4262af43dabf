//! # Subspace Tiles
//!
//! A subspace is one square cell of the world grid. It holds references to
//! the entities currently located inside it and runs two per-frame passes:
//!
//! 1. [`order`](Subspace::order): sort by ascending `y` so nearer entities
//!    draw on top of farther ones.
//! 2. [`run_trade_interactions`](Subspace::run_trade_interactions): for each
//!    Rug, walk outward through the sorted list in both directions until the
//!    vertical gap exceeds the trade radius, swapping goods with NPCs whose
//!    motion segment crossed the Rug's trade circle.
//!
//! ```text
//!   index:   0     1     2     3     4     5
//!   y:      12    40    61    70    95   140
//!                  ^-----above----[RUG]---below---^
//!                  |<----- radius ->|<- radius -->|  stop
//! ```
//!
//! A subspace is not synchronized itself. The world guards every tile with
//! the lock of the partition its column belongs to.

use std::sync::Arc;

use market_shared::line_segment_overlaps_circle;
use tracing::trace;

use crate::entity::{Customer, Entity, EntityId, Stall, SubspaceIndex, TradeState, Trader};
use crate::render::RenderTarget;

/// A completed swap between a Rug and an NPC.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TradeEvent {
    /// The Rug that traded.
    pub rug: EntityId,
    /// The NPC that traded.
    pub npc: EntityId,
    /// What the Rug holds after the swap (the NPC's old goods).
    pub rug_received: TradeState,
    /// What the NPC holds after the swap (the Rug's old goods).
    pub npc_received: TradeState,
    /// Tile the trade happened in.
    pub subspace: SubspaceIndex,
}

/// Ordered collection of the entities inside one tile.
pub struct Subspace {
    /// Tile position in the world's row-major array.
    index: SubspaceIndex,
    /// Entity references; ascending `y` after `order()`.
    entities: Vec<Arc<dyn Entity>>,
    /// Sort keys, parallel to `entities` during a sort.
    keys: Vec<f32>,
    /// NPCs that already traded with the Rug being scanned.
    traded: Vec<EntityId>,
}

impl Subspace {
    /// Creates an empty tile at `index`.
    #[must_use]
    pub fn new(index: SubspaceIndex) -> Self {
        Self {
            index,
            entities: Vec::new(),
            keys: Vec::new(),
            traded: Vec::new(),
        }
    }

    /// This tile's row-major index.
    #[inline]
    #[must_use]
    pub fn index(&self) -> SubspaceIndex {
        self.index
    }

    /// Number of entities in the tile.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    /// Whether the tile is empty.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Entities in their current order.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn Entity>> {
        self.entities.iter()
    }

    /// IDs in their current order.
    #[must_use]
    pub fn ids(&self) -> Vec<EntityId> {
        self.entities.iter().map(|e| e.unique_id()).collect()
    }

    /// Whether an entity with `id` is in the tile.
    #[must_use]
    pub fn contains(&self, id: EntityId) -> bool {
        self.entities.iter().any(|e| e.unique_id() == id)
    }

    /// Appends an entity. Order is restored by the next [`order`](Self::order).
    pub fn add_entity(&mut self, entity: Arc<dyn Entity>) {
        self.entities.push(entity);
    }

    /// Removes the first entity with `id`.
    ///
    /// Returns `false` (and does nothing) if no such entity is present.
    /// Relocation bookkeeping can race with an earlier removal, so "not
    /// found" is not an error.
    pub fn remove_entity(&mut self, id: EntityId) -> bool {
        match self.entities.iter().position(|e| e.unique_id() == id) {
            Some(pos) => {
                self.entities.remove(pos);
                true
            }
            None => false,
        }
    }

    /// Sorts the entities by ascending `location.y`.
    ///
    /// Hoare-partition quicksort with the middle element as pivot. Not
    /// stable. Keys are snapshotted before sorting so a position changing
    /// mid-sort cannot break the partition scans.
    pub fn order(&mut self) {
        let len = self.entities.len();
        if len <= 1 {
            return;
        }

        self.keys.clear();
        self.keys.extend(self.entities.iter().map(|e| e.location().y));
        quick_sort(&mut self.keys, &mut self.entities, 0, len - 1);
    }

    /// Runs the trade scan over the tile. Call after [`order`](Self::order).
    ///
    /// Every swap is appended to `events`. Returns the number of swaps.
    pub fn run_trade_interactions(&mut self, trade_radius: f32, events: &mut Vec<TradeEvent>) -> usize {
        let mut trades = 0;

        for pivot in 0..self.entities.len() {
            let Trader::Rug(stall) = self.entities[pivot].trader() else {
                continue;
            };
            if !stall.can_trade() {
                continue;
            }

            trades += scan_rug(
                &self.entities,
                pivot,
                stall,
                trade_radius,
                self.index,
                &mut self.traded,
                events,
            );
        }

        self.refresh_overlap_latches(trade_radius);
        trades
    }

    /// Keeps the latch raised for NPCs still standing on a Rug.
    ///
    /// An NPC latched last tick that no Rug scan touched this tick is checked
    /// against every Rug in its vertical window. Presence only, trade state
    /// does not matter here.
    fn refresh_overlap_latches(&self, trade_radius: f32) {
        for (pos, entity) in self.entities.iter().enumerate() {
            let Trader::Npc(customer) = entity.trader() else {
                continue;
            };
            if !customer.was_overlapping() || customer.is_overlapping() {
                continue;
            }
            if rug_in_reach(&self.entities, pos, trade_radius) {
                customer.mark_overlapping();
            }
        }
    }

    /// Renders every entity in the current order. Returns how many rendered.
    pub fn render(&self, target: &dyn RenderTarget) -> usize {
        for entity in &self.entities {
            entity.render(target);
        }
        self.entities.len()
    }
}

impl std::fmt::Debug for Subspace {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subspace")
            .field("index", &self.index)
            .field("entities", &self.ids())
            .finish()
    }
}

// =============================================================================
// TRADE SCAN
// =============================================================================

/// Scans outward from the Rug at `pivot`, trading with eligible NPCs.
///
/// Each swap restarts both directions from the Rug, as long as the Rug is
/// still allowed to trade. NPCs that already traded in this scan are skipped,
/// so a pair never swaps back and forth.
fn scan_rug(
    entities: &[Arc<dyn Entity>],
    pivot: usize,
    stall: &dyn Stall,
    trade_radius: f32,
    subspace: SubspaceIndex,
    traded: &mut Vec<EntityId>,
    events: &mut Vec<TradeEvent>,
) -> usize {
    let rug = &*entities[pivot];
    let rug_y = rug.location().y;
    let last = entities.len() - 1;
    let mut trades = 0;
    traded.clear();

    while stall.can_trade() {
        let mut above = pivot.checked_sub(1);
        let mut below = (pivot < last).then_some(pivot + 1);
        let mut swapped = false;

        while above.is_some() || below.is_some() {
            if let Some(i) = above {
                let candidate = &*entities[i];
                if rug_y - candidate.location().y > trade_radius {
                    above = None;
                } else if try_trade(rug, stall, candidate, trade_radius, subspace, traded, events) {
                    swapped = true;
                    break;
                } else {
                    above = i.checked_sub(1);
                }
            }

            if let Some(i) = below {
                let candidate = &*entities[i];
                if candidate.location().y - rug_y > trade_radius {
                    below = None;
                } else if try_trade(rug, stall, candidate, trade_radius, subspace, traded, events) {
                    swapped = true;
                    break;
                } else {
                    below = (i < last).then_some(i + 1);
                }
            }
        }

        if !swapped {
            break;
        }
        trades += 1;
    }

    trades
}

/// Swaps goods between `rug` and `candidate` if every trade gate is open.
fn try_trade(
    rug: &dyn Entity,
    stall: &dyn Stall,
    candidate: &dyn Entity,
    trade_radius: f32,
    subspace: SubspaceIndex,
    traded: &mut Vec<EntityId>,
    events: &mut Vec<TradeEvent>,
) -> bool {
    let Trader::Npc(customer) = candidate.trader() else {
        return false;
    };

    let npc = candidate.unique_id();
    let rug_state = rug.trade_state();
    let npc_state = candidate.trade_state();
    if npc_state == rug_state || traded.contains(&npc) {
        return false;
    }

    let motion = candidate.motion();
    if !line_segment_overlaps_circle(motion.previous, motion.location, rug.location(), trade_radius) {
        return false;
    }

    if !enter(customer) {
        return false;
    }

    rug.set_trade_state(npc_state);
    candidate.set_trade_state(rug_state);
    stall.reset_cooldown();
    traded.push(npc);

    let event = TradeEvent {
        rug: rug.unique_id(),
        npc,
        rug_received: npc_state,
        npc_received: rug_state,
        subspace,
    };
    trace!(rug = %event.rug, npc = %event.npc, rug_received = %npc_state, npc_received = %rug_state, "trade");
    events.push(event);
    true
}

/// Latches the overlap and reports whether this is a fresh entry.
fn enter(customer: &dyn Customer) -> bool {
    let fresh = !customer.was_overlapping();
    customer.mark_overlapping();
    fresh
}

/// Whether any Rug within the vertical window of `pos` overlaps its motion.
fn rug_in_reach(entities: &[Arc<dyn Entity>], pos: usize, trade_radius: f32) -> bool {
    let npc = &*entities[pos];
    let motion = npc.motion();
    let y = motion.location.y;

    let touches = |other: &dyn Entity| {
        matches!(other.trader(), Trader::Rug(_))
            && line_segment_overlaps_circle(motion.previous, motion.location, other.location(), trade_radius)
    };

    let above = entities[..pos]
        .iter()
        .rev()
        .take_while(|e| y - e.location().y <= trade_radius)
        .any(|e| touches(&**e));

    above
        || entities[pos + 1..]
            .iter()
            .take_while(|e| e.location().y - y <= trade_radius)
            .any(|e| touches(&**e))
}

// =============================================================================
// QUICKSORT
// =============================================================================

/// Sorts `keys[low..=high]` ascending, applying every swap to `items` too.
///
/// Recurses into the smaller half and loops on the larger, so stack depth
/// stays logarithmic.
fn quick_sort<T>(keys: &mut [f32], items: &mut [T], mut low: usize, mut high: usize) {
    while low < high {
        let split = hoare_partition(keys, items, low, high);
        if split - low < high - split {
            quick_sort(keys, items, low, split);
            low = split + 1;
        } else {
            quick_sort(keys, items, split + 1, high);
            high = split;
        }
    }
}

/// Hoare partition around the middle element.
///
/// Returns `split` with `low <= split < high` such that every key in
/// `low..=split` is `<=` every key in `split + 1..=high`. Pairs with equal
/// keys are never exchanged.
fn hoare_partition<T>(keys: &mut [f32], items: &mut [T], low: usize, high: usize) -> usize {
    let pivot = keys[low + (high - low) / 2];
    let mut lower = low;
    let mut upper = high;

    loop {
        while keys[lower] < pivot {
            lower += 1;
        }
        while keys[upper] > pivot {
            upper -= 1;
        }
        if lower >= upper {
            return upper;
        }
        // Equal keys stay put, so an already sorted run is left untouched
        if keys[lower] != keys[upper] {
            keys.swap(lower, upper);
            items.swap(lower, upper);
        }
        lower += 1;
        upper -= 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{npc, rug, Recorder};
    use market_shared::Vec2;

    fn tile() -> Subspace {
        Subspace::new(SubspaceIndex::new(0))
    }

    #[test]
    fn test_add_and_remove_by_id() {
        let mut tile = tile();
        let a = npc(1, Vec2::new(1.0, 1.0), TradeState::Chicken);
        let b = npc(2, Vec2::new(2.0, 2.0), TradeState::Chicken);
        tile.add_entity(a);
        tile.add_entity(b);

        assert!(tile.remove_entity(EntityId::new(1)));
        assert_eq!(tile.ids(), vec![EntityId::new(2)]);

        // Absent ids are a silent no-op
        assert!(!tile.remove_entity(EntityId::new(1)));
        assert_eq!(tile.len(), 1);
    }

    #[test]
    fn test_order_sorts_by_y() {
        let mut tile = tile();
        let ys = [50.0, 10.0, 30.0, 30.0, 90.0, 0.0, 70.0, 20.0];
        for (i, y) in ys.iter().enumerate() {
            tile.add_entity(npc(i as u32 + 1, Vec2::new(5.0, *y), TradeState::Lamb));
        }

        tile.order();
        let sorted: Vec<f32> = tile.iter().map(|e| e.location().y).collect();
        assert!(sorted.windows(2).all(|w| w[0] <= w[1]), "{sorted:?}");

        let first = tile.ids();
        tile.order();
        assert_eq!(tile.ids(), first);
    }

    #[test]
    fn test_order_twice_with_many_ties() {
        let mut tile = tile();
        let ys = [40.0, 10.0, 25.0];
        for i in 0..32u32 {
            let y = ys[(i as usize * 7) % ys.len()];
            tile.add_entity(npc(i + 1, Vec2::new(i as f32, y), TradeState::Chicken));
        }

        tile.order();
        let sorted: Vec<f32> = tile.iter().map(|e| e.location().y).collect();
        assert!(sorted.windows(2).all(|w| w[0] <= w[1]), "{sorted:?}");

        let first = tile.ids();
        tile.order();
        assert_eq!(tile.ids(), first);
        tile.order();
        assert_eq!(tile.ids(), first);
    }

    #[test]
    fn test_order_already_sorted_and_reversed() {
        for reversed in [false, true] {
            let mut tile = tile();
            for i in 0..64u32 {
                let y = if reversed { 64.0 - i as f32 } else { i as f32 };
                tile.add_entity(npc(i + 1, Vec2::new(0.0, y), TradeState::Lamb));
            }
            tile.order();
            let sorted: Vec<f32> = tile.iter().map(|e| e.location().y).collect();
            assert!(sorted.windows(2).all(|w| w[0] <= w[1]));
            assert_eq!(tile.len(), 64);
        }
    }

    #[test]
    fn test_order_single_and_empty() {
        let mut tile = tile();
        tile.order();
        tile.add_entity(npc(1, Vec2::new(0.0, 3.0), TradeState::Lamb));
        tile.order();
        assert_eq!(tile.ids(), vec![EntityId::new(1)]);
    }

    #[test]
    fn test_rug_and_npc_swap() {
        let mut tile = tile();
        let rug = rug(1, Vec2::new(50.0, 100.0), TradeState::Chicken);
        let npc = npc(2, Vec2::new(50.0, 105.0), TradeState::Lamb);
        tile.add_entity(npc.clone());
        tile.add_entity(rug.clone());

        tile.order();
        let mut events = Vec::new();
        let trades = tile.run_trade_interactions(50.0, &mut events);

        assert_eq!(trades, 1);
        assert_eq!(rug.trade_state(), TradeState::Lamb);
        assert_eq!(npc.trade_state(), TradeState::Chicken);
        assert_eq!(rug.cooldown_resets(), 1);
        assert_eq!(
            events,
            vec![TradeEvent {
                rug: EntityId::new(1),
                npc: EntityId::new(2),
                rug_received: TradeState::Lamb,
                npc_received: TradeState::Chicken,
                subspace: SubspaceIndex::new(0),
            }]
        );
    }

    #[test]
    fn test_same_state_does_not_trade() {
        let mut tile = tile();
        let rug = rug(1, Vec2::new(50.0, 100.0), TradeState::Chicken);
        let npc = npc(2, Vec2::new(50.0, 101.0), TradeState::Chicken);
        tile.add_entity(rug.clone());
        tile.add_entity(npc.clone());

        tile.order();
        let mut events = Vec::new();
        assert_eq!(tile.run_trade_interactions(50.0, &mut events), 0);
        assert!(events.is_empty());
    }

    #[test]
    fn test_cooldown_blocks_trade() {
        let mut tile = tile();
        let rug = rug(1, Vec2::new(50.0, 100.0), TradeState::Chicken);
        rug.set_eligible(false);
        let npc = npc(2, Vec2::new(50.0, 100.0), TradeState::Lamb);
        tile.add_entity(rug.clone());
        tile.add_entity(npc.clone());

        tile.order();
        let mut events = Vec::new();
        assert_eq!(tile.run_trade_interactions(50.0, &mut events), 0);
        assert_eq!(npc.trade_state(), TradeState::Lamb);
    }

    #[test]
    fn test_out_of_vertical_range_stops_scan() {
        let mut tile = tile();
        let rug = rug(1, Vec2::new(50.0, 100.0), TradeState::Chicken);
        // Within the circle horizontally but 60px below
        let far = npc(2, Vec2::new(50.0, 160.0), TradeState::Lamb);
        tile.add_entity(rug.clone());
        tile.add_entity(far.clone());

        tile.order();
        let mut events = Vec::new();
        assert_eq!(tile.run_trade_interactions(50.0, &mut events), 0);
        assert_eq!(far.trade_state(), TradeState::Lamb);
    }

    #[test]
    fn test_swept_segment_trades() {
        let mut tile = tile();
        let rug = rug(1, Vec2::new(50.0, 100.0), TradeState::Chicken);
        // Passed straight through the Rug between ticks, now 40px right of it
        let fast = npc(2, Vec2::new(10.0, 100.0), TradeState::BreadWine);
        fast.core().move_to(Vec2::new(90.0, 100.0));
        tile.add_entity(rug.clone());
        tile.add_entity(fast.clone());

        tile.order();
        let mut events = Vec::new();
        assert_eq!(tile.run_trade_interactions(10.0, &mut events), 1);
        assert_eq!(fast.trade_state(), TradeState::Chicken);
        assert_eq!(rug.trade_state(), TradeState::BreadWine);
    }

    #[test]
    fn test_zero_cooldown_trades_each_npc_once() {
        let mut tile = tile();
        let rug = rug(1, Vec2::new(50.0, 100.0), TradeState::Chicken);
        rug.set_resets_cooldown(false);
        let a = npc(2, Vec2::new(50.0, 95.0), TradeState::Lamb);
        let b = npc(3, Vec2::new(50.0, 104.0), TradeState::BreadWine);
        tile.add_entity(a.clone());
        tile.add_entity(rug.clone());
        tile.add_entity(b.clone());

        tile.order();
        let mut events = Vec::new();
        let trades = tile.run_trade_interactions(20.0, &mut events);

        // Rug: chicken -> (lamb|bread&wine) -> the other one. Each NPC once.
        assert_eq!(trades, 2);
        let mut partners: Vec<_> = events.iter().map(|e| e.npc).collect();
        partners.sort();
        assert_eq!(partners, vec![EntityId::new(2), EntityId::new(3)]);
    }

    #[test]
    fn test_latched_npc_does_not_retrade() {
        let mut tile = tile();
        let rug = rug(1, Vec2::new(50.0, 100.0), TradeState::Chicken);
        let npc = npc(2, Vec2::new(50.0, 100.0), TradeState::Lamb);
        npc.latch().mark();
        npc.latch().roll(); // overlapped last tick
        tile.add_entity(rug.clone());
        tile.add_entity(npc.clone());

        tile.order();
        let mut events = Vec::new();
        assert_eq!(tile.run_trade_interactions(20.0, &mut events), 0);
        assert_eq!(npc.trade_state(), TradeState::Lamb);
        assert!(npc.latch().current(), "overlap still latched");
    }

    #[test]
    fn test_latch_refreshed_without_trade() {
        let mut tile = tile();
        let rug = rug(1, Vec2::new(50.0, 100.0), TradeState::Lamb);
        let npc = npc(2, Vec2::new(52.0, 102.0), TradeState::Lamb);
        npc.latch().mark();
        npc.latch().roll();
        tile.add_entity(rug);
        tile.add_entity(npc.clone());

        tile.order();
        let mut events = Vec::new();
        tile.run_trade_interactions(20.0, &mut events);
        assert!(npc.latch().current());
    }

    #[test]
    fn test_non_rugs_ignored_as_pivots() {
        let mut tile = tile();
        let a = npc(1, Vec2::new(50.0, 100.0), TradeState::Chicken);
        let b = npc(2, Vec2::new(50.0, 100.0), TradeState::Lamb);
        tile.add_entity(a.clone());
        tile.add_entity(b.clone());

        tile.order();
        let mut events = Vec::new();
        assert_eq!(tile.run_trade_interactions(50.0, &mut events), 0);
        assert_eq!(a.trade_state(), TradeState::Chicken);
    }

    #[test]
    fn test_render_in_sorted_order() {
        let mut tile = tile();
        tile.add_entity(npc(1, Vec2::new(0.0, 30.0), TradeState::Lamb));
        tile.add_entity(rug(2, Vec2::new(0.0, 10.0), TradeState::Lamb));
        tile.add_entity(npc(3, Vec2::new(0.0, 20.0), TradeState::Lamb));
        tile.order();

        let recorder = Recorder::default();
        assert_eq!(tile.render(&recorder), 3);
        assert_eq!(
            recorder.ids(),
            vec![EntityId::new(2), EntityId::new(3), EntityId::new(1)]
        );
    }
}

//! # Trade Event Flow
//!
//! ```text
//! ┌──────────────┐
//! │ partition 0  │──┐
//! ├──────────────┤  │    ┌───────────────┐    ┌──────────────┐
//! │ partition 1  │──┼───>│ TradeChannel  │───>│ TradeLedger  │
//! ├──────────────┤  │    └───────────────┘    └──────────────┘
//! │ partition 2  │──┘      drained after join
//! └──────────────┘
//! ```
//!
//! Each partition's order+trade task sends its events when it finishes. The
//! frame loop drains the channel once every task has joined.

use crossbeam_channel::{unbounded, Receiver, Sender};
use market_core::{TradeEvent, TradeState};

/// Multi-producer channel for trade events.
///
/// Unbounded: a trade already happened when its event is sent, so dropping
/// it on a full channel would desynchronize the ledger.
pub struct TradeChannel {
    sender: Sender<TradeEvent>,
    receiver: Receiver<TradeEvent>,
}

impl TradeChannel {
    /// Creates an empty channel.
    #[must_use]
    pub fn new() -> Self {
        let (sender, receiver) = unbounded();
        Self { sender, receiver }
    }

    /// Creates a sender handle (clone for multiple producers).
    #[must_use]
    pub fn sender(&self) -> TradeSender {
        TradeSender {
            sender: self.sender.clone(),
        }
    }

    /// Receives every pending event (non-blocking).
    #[must_use]
    pub fn drain(&self) -> Vec<TradeEvent> {
        self.receiver.try_iter().collect()
    }

    /// Returns the number of pending events.
    #[inline]
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.receiver.len()
    }
}

impl Default for TradeChannel {
    fn default() -> Self {
        Self::new()
    }
}

/// Handle for sending trade events.
#[derive(Clone)]
pub struct TradeSender {
    sender: Sender<TradeEvent>,
}

impl TradeSender {
    /// Sends a batch of events. Returns how many were delivered.
    pub fn send_all(&self, events: impl IntoIterator<Item = TradeEvent>) -> usize {
        events
            .into_iter()
            .take_while(|event| self.sender.send(*event).is_ok())
            .count()
    }
}

// =============================================================================
// LEDGER
// =============================================================================

/// Running totals of every trade since the simulation started.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TradeLedger {
    /// Swaps performed.
    pub trades: u64,
    /// Goods received by NPCs, indexed by [`TradeState::as_u8`].
    pub npc_received: [u64; 3],
    /// Goods received by Rugs, indexed by [`TradeState::as_u8`].
    pub rug_received: [u64; 3],
}

impl TradeLedger {
    /// Adds one trade.
    pub fn record(&mut self, event: &TradeEvent) {
        self.trades += 1;
        self.npc_received[usize::from(event.npc_received.as_u8())] += 1;
        self.rug_received[usize::from(event.rug_received.as_u8())] += 1;
    }

    /// Trades in which NPCs received `state`.
    #[must_use]
    pub fn npc_received(&self, state: TradeState) -> u64 {
        self.npc_received[usize::from(state.as_u8())]
    }

    /// Trades in which Rugs received `state`.
    #[must_use]
    pub fn rug_received(&self, state: TradeState) -> u64 {
        self.rug_received[usize::from(state.as_u8())]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use market_core::{EntityId, SubspaceIndex};

    fn event(npc_received: TradeState, rug_received: TradeState) -> TradeEvent {
        TradeEvent {
            rug: EntityId::new(1),
            npc: EntityId::new(2),
            rug_received,
            npc_received,
            subspace: SubspaceIndex::new(0),
        }
    }

    #[test]
    fn test_channel_collects_from_threads() {
        let channel = TradeChannel::new();

        std::thread::scope(|s| {
            for _ in 0..3 {
                let sender = channel.sender();
                s.spawn(move || {
                    sender.send_all(vec![event(TradeState::Lamb, TradeState::Chicken); 4]);
                });
            }
        });

        assert_eq!(channel.pending_count(), 12);
        assert_eq!(channel.drain().len(), 12);
        assert_eq!(channel.pending_count(), 0);
    }

    #[test]
    fn test_ledger_counts_by_state() {
        let mut ledger = TradeLedger::default();
        ledger.record(&event(TradeState::Lamb, TradeState::Chicken));
        ledger.record(&event(TradeState::Lamb, TradeState::BreadWine));

        assert_eq!(ledger.trades, 2);
        assert_eq!(ledger.npc_received(TradeState::Lamb), 2);
        assert_eq!(ledger.rug_received(TradeState::Chicken), 1);
        assert_eq!(ledger.rug_received(TradeState::BreadWine), 1);
        assert_eq!(ledger.npc_received(TradeState::Chicken), 0);
    }
}

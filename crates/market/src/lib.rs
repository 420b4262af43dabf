//! # Market
//!
//! The simulation driver. Populates a [`World`](market_core::World) with
//! walking NPCs and trade Rugs and runs the frame loop over it.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                            market                               │
//! │                                                                 │
//! │  config ──> GameLoop ──> gameplay (Npc, Rug, Command)           │
//! │                │                                                │
//! │                ├──> events (TradeChannel -> TradeLedger)        │
//! │                └──> draw   (DrawList, consumed by a presenter)  │
//! └────────────────┬────────────────────────────────────────────────┘
//!                  │
//!         ┌────────┴────────┐
//!         │   market_core   │  World, Subspace, Entity
//!         └────────┬────────┘
//!         ┌────────┴────────┐
//!         │  market_shared  │  Vec2, geometry, constants
//!         └─────────────────┘
//! ```
//!
//! ## Modules
//!
//! - `config`: TOML configuration
//! - `game_loop`: Frame orchestration and timing
//! - `gameplay`: NPC and Rug entities
//! - `events`: Trade event channel and ledger

#![deny(missing_docs)]
#![deny(unsafe_code)]

pub mod config;
pub mod draw;
pub mod error;
pub mod events;
pub mod game_loop;
pub mod gameplay;

// Re-export the layers below
pub use market_core as core;
pub use market_shared as shared;

// Re-export commonly used types
pub use config::{ConfigError, NpcConfig, RugConfig, RunConfig, SimulationConfig};
pub use draw::DrawList;
pub use error::{SimulationError, SimulationResult};
pub use events::{TradeChannel, TradeLedger, TradeSender};
pub use game_loop::{FrameStats, FrameStatsAccumulator, GameLoop};
pub use gameplay::{Animation, Command, Corner, Npc, Rug};

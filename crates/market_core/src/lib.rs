//! # Market Core
//!
//! Partitioned spatial index for the Market simulation:
//! - A fixed grid of square tiles ("subspaces") covering the window
//! - Column partitions, each guarded by one lock, processed in parallel
//! - Per-tile y-ordering for painter's-order rendering
//! - Motion-swept trade detection between NPCs and Rugs
//!
//! ## Frame Contract
//!
//! The driver owns the entities and the frame:
//!
//! 1. Update every entity, then [`World::place_entity`] each one
//! 2. Fork one task per partition calling [`World::order_partition`], join
//! 3. Fork one task per partition calling [`World::render_partition`], join
//!
//! ## Example
//!
//! ```rust,ignore
//! use market_core::{World, WorldConfig};
//!
//! let world = World::new(WorldConfig::default())?;
//! world.place_entity(&npc);
//! std::thread::scope(|s| {
//!     for p in world.partitions() {
//!         let world = &world;
//!         s.spawn(move || world.order_partition(p));
//!     }
//! });
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod config;
pub mod entity;
pub mod error;
pub mod render;
pub mod subspace;
pub mod world;

pub use config::WorldConfig;
pub use entity::{
    Customer, Entity, EntityCore, EntityId, EntityKind, IdAllocator, Motion, OverlapLatch, Stall,
    SubspaceIndex, SubspaceSlot, TradeCell, TradeState, Trader,
};
pub use error::{WorldError, WorldResult};
pub use render::{DrawCommand, RenderTarget, Sprite};
pub use subspace::{Subspace, TradeEvent};
pub use world::{PartitionId, PartitionReport, Placement, World};

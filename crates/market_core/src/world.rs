//! # The Partitioned World
//!
//! The world is a flat, row-major array of square tiles. Tile columns are
//! split into contiguous partitions, and each partition has one lock
//! guarding every tile in its columns.
//!
//! ```text
//!          LEFT        CENTER       RIGHT
//!        col 0..3     col 3..6     col 6..9
//!      +---+---+---+---+---+---+---+---+---+
//! row 0| 0 | 1 | 2 | 3 | 4 | 5 | 6 | 7 | 8 |
//!      +---+---+---+---+---+---+---+---+---+
//! row 1| 9 |10 |11 |12 |13 |14 |15 |16 |17 |
//!      +---+---+---+---+---+---+---+---+---+
//!        \_ Mutex _/   \_ Mutex _/   \_ Mutex _/
//! ```
//!
//! ## Locking
//!
//! - The tile array is fixed after construction. Each partition's tiles live
//!   inside its `Mutex`, so a tile cannot be touched without the lock.
//! - Every operation takes the lock once per tile access. No operation holds
//!   two partition locks at the same time, so the world cannot deadlock
//!   against itself.
//! - Two operations on different tiles of the same partition serialize.

use std::fmt;
use std::ops::Range;
use std::sync::Arc;

use market_shared::Vec2;
use parking_lot::Mutex;
use tracing::{debug, error, info, trace};

use crate::config::WorldConfig;
use crate::entity::{Entity, EntityId, SubspaceIndex};
use crate::error::{WorldError, WorldResult};
use crate::render::RenderTarget;
use crate::subspace::{Subspace, TradeEvent};

// =============================================================================
// PARTITION IDS
// =============================================================================

/// Identifies one column partition.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PartitionId(pub usize);

impl PartitionId {
    /// Leftmost partition.
    pub const LEFT: Self = Self(0);
    /// Middle partition of a three-way split.
    pub const CENTER: Self = Self(1);
    /// Rightmost partition of a three-way split.
    pub const RIGHT: Self = Self(2);

    /// Raw partition number.
    #[inline]
    #[must_use]
    pub const fn get(self) -> usize {
        self.0
    }
}

impl fmt::Display for PartitionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "partition {}", self.0)
    }
}

/// Outcome of placing an entity.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Placement {
    /// Still inside the tile it was already in.
    Unchanged(SubspaceIndex),
    /// First placement.
    Placed(SubspaceIndex),
    /// Crossed a tile boundary.
    Moved {
        /// Tile it left.
        from: SubspaceIndex,
        /// Tile it entered.
        to: SubspaceIndex,
    },
}

impl Placement {
    /// The tile the entity occupies after placement.
    #[must_use]
    pub fn subspace(&self) -> SubspaceIndex {
        match *self {
            Self::Unchanged(index) | Self::Placed(index) => index,
            Self::Moved { to, .. } => to,
        }
    }
}

/// What one [`World::order_partition`] pass did.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PartitionReport {
    /// Partition that was processed.
    pub partition: PartitionId,
    /// Tiles visited.
    pub tiles: usize,
    /// Entities sorted.
    pub entities: usize,
    /// Trades performed.
    pub trades: usize,
    /// Every trade, in scan order.
    pub events: Vec<TradeEvent>,
}

/// One lock and the tiles it guards.
struct Partition {
    columns: Range<u32>,
    tiles: Mutex<Box<[Subspace]>>,
}

impl Partition {
    fn width(&self) -> u32 {
        self.columns.end - self.columns.start
    }
}

// =============================================================================
// WORLD
// =============================================================================

/// Spatial index of every entity, split into independently locked partitions.
pub struct World {
    config: WorldConfig,
    horizontal: u32,
    vertical: u32,
    tile_side: f32,
    /// Partition owning each column.
    column_partition: Box<[usize]>,
    partitions: Box<[Partition]>,
}

impl World {
    /// Builds the tile grid for `config`.
    ///
    /// Tiles are `width / horizontal_tiles` pixels square. The row count is
    /// rounded up so the bottom edge of the window is covered.
    ///
    /// # Errors
    ///
    /// Returns an error if either dimension is zero, there are no tile
    /// columns, the partition count is zero or exceeds the column count, or
    /// the trade radius is negative or not finite.
    pub fn new(config: WorldConfig) -> WorldResult<Self> {
        if config.width == 0 || config.height == 0 {
            return Err(WorldError::ZeroDimension {
                width: config.width,
                height: config.height,
            });
        }
        if config.horizontal_tiles == 0 {
            return Err(WorldError::ZeroTiles);
        }
        let horizontal = config.horizontal_tiles;
        if config.partitions == 0 || config.partitions > horizontal as usize {
            return Err(WorldError::InvalidPartitionCount {
                partitions: config.partitions,
                columns: horizontal,
            });
        }
        if !config.trade_radius.is_finite() || config.trade_radius < 0.0 {
            return Err(WorldError::InvalidTradeRadius(config.trade_radius));
        }

        let tile_side = config.width as f32 / horizontal as f32;
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let vertical = ((config.height as f32 / tile_side).ceil() as u32).max(1);

        let count = config.partitions;
        let mut column_partition = vec![0; horizontal as usize].into_boxed_slice();
        let partitions: Box<[Partition]> = (0..count)
            .map(|p| {
                let start = column_start(p, count, horizontal);
                let end = column_start(p + 1, count, horizontal);
                for col in start..end {
                    column_partition[col as usize] = p;
                }
                let tiles = (0..vertical)
                    .flat_map(|row| (start..end).map(move |col| row * horizontal + col))
                    .map(|index| Subspace::new(SubspaceIndex::new(index)))
                    .collect::<Vec<_>>()
                    .into_boxed_slice();
                Partition {
                    columns: start..end,
                    tiles: Mutex::new(tiles),
                }
            })
            .collect();

        info!(
            width = config.width,
            height = config.height,
            tile_side,
            columns = horizontal,
            rows = vertical,
            partitions = count,
            "world initialized"
        );

        Ok(Self {
            config,
            horizontal,
            vertical,
            tile_side,
            column_partition,
            partitions,
        })
    }

    // =========================================================================
    // GEOMETRY
    // =========================================================================

    /// The config the world was built from.
    #[must_use]
    pub fn config(&self) -> &WorldConfig {
        &self.config
    }

    /// Tile columns (`H`).
    #[inline]
    #[must_use]
    pub fn horizontal_tiles(&self) -> u32 {
        self.horizontal
    }

    /// Tile rows (`V`).
    #[inline]
    #[must_use]
    pub fn vertical_tiles(&self) -> u32 {
        self.vertical
    }

    /// Total number of tiles (`H * V`).
    #[inline]
    #[must_use]
    pub fn tile_count(&self) -> usize {
        self.horizontal as usize * self.vertical as usize
    }

    /// Tile edge length in pixels.
    #[inline]
    #[must_use]
    pub fn tile_side(&self) -> f32 {
        self.tile_side
    }

    /// Trade interaction radius in pixels.
    #[inline]
    #[must_use]
    pub fn trade_radius(&self) -> f32 {
        self.config.trade_radius
    }

    /// Number of partitions.
    #[inline]
    #[must_use]
    pub fn partition_count(&self) -> usize {
        self.partitions.len()
    }

    /// Every partition, left to right.
    pub fn partitions(&self) -> impl Iterator<Item = PartitionId> {
        (0..self.partitions.len()).map(PartitionId)
    }

    /// Column range covered by `partition`.
    #[must_use]
    pub fn partition_columns(&self, partition: PartitionId) -> Option<Range<u32>> {
        self.partitions.get(partition.0).map(|p| p.columns.clone())
    }

    /// Partition that owns tile `index`.
    #[must_use]
    pub fn partition_of(&self, index: SubspaceIndex) -> Option<PartitionId> {
        if index.as_usize() >= self.tile_count() {
            return None;
        }
        let col = index.get() % self.horizontal;
        Some(PartitionId(self.column_partition[col as usize]))
    }

    /// Maps a location to the tile containing it.
    ///
    /// Tiles are half-open: a point exactly on a tile's left or top edge
    /// belongs to that tile.
    ///
    /// # Errors
    ///
    /// Returns [`WorldError::OutOfBounds`] for non-finite or negative
    /// coordinates, or ones at or past the window's right or bottom edge.
    pub fn subspace_index_for(&self, location: Vec2) -> WorldResult<SubspaceIndex> {
        let out_of_bounds = || WorldError::OutOfBounds {
            x: location.x,
            y: location.y,
            tile_count: self.tile_count(),
        };

        if !location.is_finite()
            || location.x < 0.0
            || location.y < 0.0
            || location.x >= self.config.width as f32
            || location.y >= self.config.height as f32
        {
            return Err(out_of_bounds());
        }

        // Rounding can push a point just inside the edge onto the next tile
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let col = ((location.x / self.tile_side).floor() as u32).min(self.horizontal - 1);
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let row = ((location.y / self.tile_side).floor() as u32).min(self.vertical - 1);

        Ok(SubspaceIndex::new(row * self.horizontal + col))
    }

    /// Finds the partition and in-partition offset of tile `index`.
    fn locate(&self, index: SubspaceIndex) -> Option<(&Partition, usize)> {
        let partition = &self.partitions[self.partition_of(index)?.0];
        let row = index.get() / self.horizontal;
        let col = index.get() % self.horizontal;
        let local = row * partition.width() + (col - partition.columns.start);
        Some((partition, local as usize))
    }

    // =========================================================================
    // PLACEMENT
    // =========================================================================

    /// Re-indexes `entity` after it moved.
    ///
    /// Does nothing if the entity is still in the same tile. Otherwise it is
    /// removed from its old tile under the old partition's lock, its slot is
    /// updated, and it is added to the new tile under the new partition's
    /// lock. The two locks are never held together.
    ///
    /// # Errors
    ///
    /// Returns [`WorldError::OutOfBounds`] if the entity is outside the
    /// world. Its membership is left unchanged.
    pub fn try_place_entity(&self, entity: &Arc<dyn Entity>) -> WorldResult<Placement> {
        let target = self.subspace_index_for(entity.location())?;
        let slot = entity.core().subspace();

        let placement = match slot.get() {
            Some(current) if current == target => return Ok(Placement::Unchanged(target)),
            Some(current) => {
                self.remove_from(current, entity.unique_id());
                Placement::Moved {
                    from: current,
                    to: target,
                }
            }
            None => Placement::Placed(target),
        };

        slot.set(target);
        if let Some((partition, local)) = self.locate(target) {
            partition.tiles.lock()[local].add_entity(Arc::clone(entity));
        }

        trace!(entity = %entity.unique_id(), ?placement, "placed");
        Ok(placement)
    }

    /// Re-indexes `entity` after it moved.
    ///
    /// # Panics
    ///
    /// Panics if the entity is outside the world. Movement must be clamped
    /// before placement; an escaped entity is a bug in the caller.
    pub fn place_entity(&self, entity: &Arc<dyn Entity>) -> Placement {
        match self.try_place_entity(entity) {
            Ok(placement) => placement,
            Err(err) => {
                error!(entity = %entity.unique_id(), %err, "entity escaped the world");
                panic!("cannot place entity {}: {err}", entity.unique_id());
            }
        }
    }

    fn remove_from(&self, index: SubspaceIndex, id: EntityId) {
        if let Some((partition, local)) = self.locate(index) {
            partition.tiles.lock()[local].remove_entity(id);
        }
    }

    // =========================================================================
    // PER-PARTITION PASSES
    // =========================================================================

    /// Sorts every tile of `partition`, then runs its trade scan.
    ///
    /// Safe to call concurrently for different partitions. Unknown partitions
    /// produce an empty report.
    pub fn order_partition(&self, partition: PartitionId) -> PartitionReport {
        let mut report = PartitionReport {
            partition,
            ..PartitionReport::default()
        };
        let Some(part) = self.partitions.get(partition.0) else {
            return report;
        };
        let radius = self.config.trade_radius;

        for local in self.column_major(part) {
            let mut tiles = part.tiles.lock();
            let tile = &mut tiles[local];
            tile.order();
            report.trades += tile.run_trade_interactions(radius, &mut report.events);
            report.entities += tile.len();
            report.tiles += 1;
        }

        debug!(
            %partition,
            tiles = report.tiles,
            entities = report.entities,
            trades = report.trades,
            "partition ordered"
        );
        report
    }

    /// Renders every non-empty tile of `partition` in sorted order.
    ///
    /// Returns the number of entities rendered.
    pub fn render_partition(&self, partition: PartitionId, target: &dyn RenderTarget) -> usize {
        let Some(part) = self.partitions.get(partition.0) else {
            return 0;
        };

        let mut rendered = 0;
        for local in self.column_major(part) {
            let tiles = part.tiles.lock();
            let tile = &tiles[local];
            if !tile.is_empty() {
                rendered += tile.render(target);
            }
        }

        debug!(%partition, rendered, "partition rendered");
        rendered
    }

    /// In-partition tile offsets, column by column, top to bottom.
    fn column_major(&self, part: &Partition) -> impl Iterator<Item = usize> {
        let width = part.width() as usize;
        let rows = self.vertical as usize;
        (0..width).flat_map(move |col| (0..rows).map(move |row| row * width + col))
    }

    // =========================================================================
    // INSPECTION
    // =========================================================================

    /// Runs `f` on tile `index` under its partition's lock.
    ///
    /// Returns `None` if the index is out of range.
    pub fn with_tile<R>(&self, index: SubspaceIndex, f: impl FnOnce(&Subspace) -> R) -> Option<R> {
        let (partition, local) = self.locate(index)?;
        let tiles = partition.tiles.lock();
        Some(f(&tiles[local]))
    }

    /// Number of entities in tile `index` (0 if out of range).
    #[must_use]
    pub fn tile_len(&self, index: SubspaceIndex) -> usize {
        self.with_tile(index, Subspace::len).unwrap_or(0)
    }

    /// Whether tile `index` holds entity `id`.
    #[must_use]
    pub fn tile_contains(&self, index: SubspaceIndex, id: EntityId) -> bool {
        self.with_tile(index, |tile| tile.contains(id)).unwrap_or(false)
    }

    /// IDs in tile `index`, in current order.
    #[must_use]
    pub fn tile_ids(&self, index: SubspaceIndex) -> Vec<EntityId> {
        self.with_tile(index, Subspace::ids).unwrap_or_default()
    }

    /// Total indexed entities. Takes every partition lock in turn.
    #[must_use]
    pub fn entity_count(&self) -> usize {
        self.partitions
            .iter()
            .map(|p| p.tiles.lock().iter().map(Subspace::len).sum::<usize>())
            .sum()
    }
}

impl fmt::Debug for World {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("World")
            .field("columns", &self.horizontal)
            .field("rows", &self.vertical)
            .field("tile_side", &self.tile_side)
            .field("partitions", &self.partitions.len())
            .finish_non_exhaustive()
    }
}

/// First column of partition `p` out of `count`.
fn column_start(p: usize, count: usize, columns: u32) -> u32 {
    #[allow(clippy::cast_possible_truncation)]
    let start = (p * columns as usize / count) as u32;
    start
}

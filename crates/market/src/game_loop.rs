//! # Market Game Loop
//!
//! THE FRAME:
//! ```text
//! Frame N:
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │ 1. MOVEMENT (calling thread)                                        │
//! │    ├─ Every NPC walks (latch roll, step, animation)                 │
//! │    ├─ Every Rug advances its cooldown                               │
//! │    └─ Every entity is re-placed in the world                        │
//! │                                                                     │
//! │ 2. ORDER + TRADE (one scoped thread per partition)                  │
//! │    ├─ Sort each tile by y                                           │
//! │    ├─ Scan Rugs for trades                                          │
//! │    └─ Send trade events down the channel                            │
//! │    ── join ──                                                       │
//! │                                                                     │
//! │ 3. RENDER (one scoped thread per partition)                         │
//! │    └─ Submit draw commands to the draw list in painter's order      │
//! │    ── join ──                                                       │
//! │                                                                     │
//! │ 4. END FRAME                                                        │
//! │    └─ Drain trade events into the ledger, record timings            │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Movement always completes before ordering starts, so the trade scan
//! never races an entity's own update.

use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use market_core::{DrawCommand, Entity, IdAllocator, TradeState, World};
use market_shared::{clamp, Vec2};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tracing::{debug, info, warn};

use crate::config::SimulationConfig;
use crate::draw::DrawList;
use crate::error::SimulationResult;
use crate::events::{TradeChannel, TradeLedger};
use crate::gameplay::{Animation, Command, Npc, Rug};

/// Frame timing and activity statistics.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FrameStats {
    /// Total frame time in microseconds.
    pub total_us: u64,
    /// Movement and placement time in microseconds.
    pub logic_us: u64,
    /// Order+trade phase time in microseconds.
    pub order_us: u64,
    /// Render phase time in microseconds.
    pub render_us: u64,
    /// Frame number.
    pub frame: u64,
    /// Entities sorted this frame.
    pub entities: usize,
    /// Trades this frame.
    pub trades: usize,
    /// Draw commands submitted this frame.
    pub draw_calls: usize,
}

/// The simulation orchestrator.
///
/// Owns the world, every entity and the per-frame buffers.
pub struct GameLoop {
    /// The partitioned spatial index.
    world: World,
    /// Configuration.
    config: SimulationConfig,
    /// Source of entity IDs.
    ids: IdAllocator,
    npcs: Vec<Arc<Npc>>,
    rugs: Vec<Arc<Rug>>,
    /// Every entity as the world sees it, Rugs first.
    entities: Vec<Arc<dyn Entity>>,
    /// World size, used to clamp every spawn point and walk target.
    bounds: Vec2,
    rng: ChaCha8Rng,
    trades: TradeChannel,
    ledger: TradeLedger,
    draw_list: DrawList,
    /// Frame counter.
    frame_count: u64,
    /// Accumulated frame statistics.
    stats_accumulator: FrameStatsAccumulator,
}

impl GameLoop {
    /// Builds the world and spawns every Rug and NPC at a random position.
    ///
    /// # Arguments
    ///
    /// * `config` - Validated here before anything is built
    ///
    /// # Errors
    ///
    /// Returns an error if the config is out of range or describes an
    /// impossible world.
    pub fn new(config: SimulationConfig) -> SimulationResult<Self> {
        config.validate()?;
        let world = World::new(config.world.clone())?;

        #[allow(clippy::cast_precision_loss)]
        let bounds = Vec2::new(config.world.width as f32, config.world.height as f32);
        let mut rng = ChaCha8Rng::seed_from_u64(config.run.seed);
        let ids = IdAllocator::new();

        let rugs: Vec<Arc<Rug>> = (0..config.rug.count)
            .map(|_| {
                Arc::new(Rug::new(
                    ids.allocate(),
                    random_point(&mut rng, bounds),
                    random_state(&mut rng),
                    config.rug.trade_cooldown_secs,
                ))
            })
            .collect();

        let animation = Animation {
            frame_count: config.npc.frame_count,
            period: config.npc.animation_period,
        };
        let npcs: Vec<Arc<Npc>> = (0..config.npc.count)
            .map(|_| {
                let location = random_point(&mut rng, bounds);
                let state = random_state(&mut rng);
                let target = random_point(&mut rng, bounds);
                let speed = rng.gen_range(config.npc.min_speed..=config.npc.max_speed);
                Arc::new(Npc::new(
                    ids.allocate(),
                    location,
                    state,
                    target,
                    speed,
                    bounds,
                    animation,
                ))
            })
            .collect();

        let entities: Vec<Arc<dyn Entity>> = rugs
            .iter()
            .map(|rug| Arc::clone(rug) as Arc<dyn Entity>)
            .chain(npcs.iter().map(|npc| Arc::clone(npc) as Arc<dyn Entity>))
            .collect();
        for entity in &entities {
            world.try_place_entity(entity)?;
        }

        info!(
            npcs = npcs.len(),
            rugs = rugs.len(),
            seed = config.run.seed,
            "market populated"
        );

        let draw_capacity = entities.len();
        let budget = Duration::from_secs_f64(config.run.frame_budget_ms / 1000.0);
        Ok(Self {
            world,
            config,
            ids,
            npcs,
            rugs,
            entities,
            bounds,
            rng,
            trades: TradeChannel::new(),
            ledger: TradeLedger::default(),
            draw_list: DrawList::with_capacity(draw_capacity),
            frame_count: 0,
            stats_accumulator: FrameStatsAccumulator::new(budget),
        })
    }

    /// Runs one frame with a step of `dt` seconds.
    ///
    /// # Panics
    ///
    /// Panics if an entity escapes the world, or re-raises a panic from a
    /// partition task.
    pub fn tick(&mut self, dt: f32) -> FrameStats {
        let frame_start = Instant::now();

        // 1. Movement
        for npc in &self.npcs {
            let next_target = random_point(&mut self.rng, self.bounds);
            npc.update(dt, next_target);
        }
        for rug in &self.rugs {
            rug.update(dt);
        }
        for entity in &self.entities {
            self.world.place_entity(entity);
        }
        let logic_done = Instant::now();

        // 2. Order + trade
        let world = &self.world;
        let trades = &self.trades;
        let (entities, frame_trades) = thread::scope(|s| {
            let handles: Vec<_> = world
                .partitions()
                .map(|partition| {
                    let sender = trades.sender();
                    s.spawn(move || {
                        let report = world.order_partition(partition);
                        sender.send_all(report.events);
                        (report.entities, report.trades)
                    })
                })
                .collect();
            handles
                .into_iter()
                .map(join_partition)
                .fold((0, 0), |(sorted, traded), (e, t)| (sorted + e, traded + t))
        });
        for event in self.trades.drain() {
            self.ledger.record(&event);
        }
        let order_done = Instant::now();

        // 3. Render
        self.draw_list.clear();
        let draw_list = &self.draw_list;
        let draw_calls: usize = thread::scope(|s| {
            let handles: Vec<_> = world
                .partitions()
                .map(|partition| s.spawn(move || world.render_partition(partition, draw_list)))
                .collect();
            handles.into_iter().map(join_partition).sum()
        });
        let render_done = Instant::now();

        // 4. End frame
        let stats = FrameStats {
            total_us: micros(render_done - frame_start),
            logic_us: micros(logic_done - frame_start),
            order_us: micros(order_done - logic_done),
            render_us: micros(render_done - order_done),
            frame: self.frame_count,
            entities,
            trades: frame_trades,
            draw_calls,
        };
        self.end_frame(stats);
        stats
    }

    /// Records timing and logs slow frames.
    fn end_frame(&mut self, stats: FrameStats) {
        self.frame_count += 1;
        self.stats_accumulator.record(stats);

        let budget_us = micros(self.stats_accumulator.budget);
        if stats.total_us > budget_us {
            #[allow(clippy::cast_precision_loss)]
            let total_ms = stats.total_us as f64 / 1000.0;
            warn!(
                frame = stats.frame,
                total_ms,
                budget_ms = self.config.run.frame_budget_ms,
                "frame exceeded budget"
            );
        } else {
            debug!(
                frame = stats.frame,
                total_us = stats.total_us,
                trades = stats.trades,
                "frame complete"
            );
        }
    }

    /// Runs `frames` frames at the configured fixed step.
    pub fn run(&mut self, frames: u64) -> &FrameStatsAccumulator {
        let dt = self.config.run.fixed_dt;
        for _ in 0..frames {
            self.tick(dt);
        }
        &self.stats_accumulator
    }

    /// Applies a crowd-wide command to every NPC.
    pub fn apply(&mut self, command: Command) {
        for npc in &self.npcs {
            match command {
                Command::StopAll => npc.set_throttle(0.0),
                Command::RandomizeSpeeds => npc.set_throttle(self.rng.gen::<f32>()),
                Command::FullSpeed => npc.set_throttle(1.0),
                Command::WalkToCorner(corner) => npc.walk_to(corner.point(self.bounds)),
            }
        }
        info!(?command, npcs = self.npcs.len(), "command applied");
    }

    // =========================================================================
    // ACCESSORS
    // =========================================================================

    /// Returns the current frame count.
    #[inline]
    #[must_use]
    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    /// The world index.
    #[must_use]
    pub fn world(&self) -> &World {
        &self.world
    }

    /// The configuration the loop was built from.
    #[must_use]
    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    /// Every NPC, in spawn order.
    #[must_use]
    pub fn npcs(&self) -> &[Arc<Npc>] {
        &self.npcs
    }

    /// Every Rug, in spawn order.
    #[must_use]
    pub fn rugs(&self) -> &[Arc<Rug>] {
        &self.rugs
    }

    /// Every entity the world indexes.
    #[must_use]
    pub fn entities(&self) -> &[Arc<dyn Entity>] {
        &self.entities
    }

    /// IDs handed out so far.
    #[must_use]
    pub fn ids_allocated(&self) -> u32 {
        self.ids.allocated()
    }

    /// Trade totals since the start.
    #[must_use]
    pub fn trade_ledger(&self) -> &TradeLedger {
        &self.ledger
    }

    /// Takes the last frame's draw commands.
    #[must_use]
    pub fn take_draw_list(&self) -> Vec<DrawCommand> {
        self.draw_list.take()
    }

    /// Returns the accumulated statistics.
    #[must_use]
    pub fn stats(&self) -> &FrameStatsAccumulator {
        &self.stats_accumulator
    }

    /// Goods currently held, per state, across every entity.
    #[must_use]
    pub fn goods_census(&self) -> [usize; 3] {
        let mut census = [0; 3];
        for entity in &self.entities {
            census[usize::from(entity.trade_state().as_u8())] += 1;
        }
        census
    }
}

/// Joins a partition task, re-raising its panic on the frame thread.
fn join_partition<T>(handle: thread::ScopedJoinHandle<'_, T>) -> T {
    handle
        .join()
        .unwrap_or_else(|payload| std::panic::resume_unwind(payload))
}

fn micros(duration: Duration) -> u64 {
    u64::try_from(duration.as_micros()).unwrap_or(u64::MAX)
}

fn random_point(rng: &mut ChaCha8Rng, bounds: Vec2) -> Vec2 {
    let point = Vec2::new(rng.gen::<f32>() * bounds.x, rng.gen::<f32>() * bounds.y);
    clamp(point, bounds)
}

fn random_state(rng: &mut ChaCha8Rng) -> TradeState {
    TradeState::from_u8(rng.gen_range(0..3))
}

// =============================================================================
// STATISTICS
// =============================================================================

/// Accumulator for frame statistics.
#[derive(Clone, Debug)]
pub struct FrameStatsAccumulator {
    /// Wall-clock budget per frame.
    pub budget: Duration,
    /// Total frames recorded.
    pub frames_recorded: u64,
    /// Sum of total frame times.
    pub total_us_sum: u64,
    /// Sum of movement times.
    pub logic_us_sum: u64,
    /// Sum of order+trade times.
    pub order_us_sum: u64,
    /// Sum of render times.
    pub render_us_sum: u64,
    /// Min frame time.
    pub min_frame_us: u64,
    /// Max frame time.
    pub max_frame_us: u64,
    /// Frames that exceeded budget.
    pub frames_over_budget: u64,
    /// Trades across all frames.
    pub trades: u64,
}

impl FrameStatsAccumulator {
    /// Creates a new accumulator for frames budgeted at `budget`.
    #[must_use]
    pub fn new(budget: Duration) -> Self {
        Self {
            budget,
            frames_recorded: 0,
            total_us_sum: 0,
            logic_us_sum: 0,
            order_us_sum: 0,
            render_us_sum: 0,
            min_frame_us: u64::MAX,
            max_frame_us: 0,
            frames_over_budget: 0,
            trades: 0,
        }
    }

    /// Records a frame's statistics.
    pub fn record(&mut self, stats: FrameStats) {
        self.frames_recorded += 1;
        self.total_us_sum += stats.total_us;
        self.logic_us_sum += stats.logic_us;
        self.order_us_sum += stats.order_us;
        self.render_us_sum += stats.render_us;
        self.min_frame_us = self.min_frame_us.min(stats.total_us);
        self.max_frame_us = self.max_frame_us.max(stats.total_us);
        self.trades += stats.trades as u64;

        if stats.total_us > micros(self.budget) {
            self.frames_over_budget += 1;
        }
    }

    /// Returns average frame time in milliseconds.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn avg_frame_ms(&self) -> f64 {
        if self.frames_recorded == 0 {
            return 0.0;
        }
        (self.total_us_sum as f64 / self.frames_recorded as f64) / 1000.0
    }

    /// Returns average FPS.
    #[must_use]
    pub fn avg_fps(&self) -> f64 {
        let avg_ms = self.avg_frame_ms();
        if avg_ms <= 0.0 {
            return 0.0;
        }
        1000.0 / avg_ms
    }

    /// Returns the fraction of frames over budget.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn over_budget_ratio(&self) -> f64 {
        if self.frames_recorded == 0 {
            return 0.0;
        }
        self.frames_over_budget as f64 / self.frames_recorded as f64
    }

    /// Prints a summary of the statistics.
    #[allow(clippy::cast_precision_loss)]
    pub fn print_summary(&self) {
        println!("╔══════════════════════════════════════════════════════════════════╗");
        println!("║                    FRAME STATISTICS SUMMARY                      ║");
        println!("╚══════════════════════════════════════════════════════════════════╝");
        println!();
        println!("┌─ TIMING ─────────────────────────────────────────────────────────┐");
        println!("│ Frames Recorded:    {}", self.frames_recorded);
        println!("│ Average Frame:      {:.3} ms ({:.1} FPS)", self.avg_frame_ms(), self.avg_fps());
        if self.frames_recorded > 0 {
            println!("│ Min Frame:          {:.3} ms", self.min_frame_us as f64 / 1000.0);
            println!("│ Max Frame:          {:.3} ms", self.max_frame_us as f64 / 1000.0);
        }
        println!("└──────────────────────────────────────────────────────────────────┘");
        println!();
        println!("┌─ BUDGET ─────────────────────────────────────────────────────────┐");
        println!("│ Target:             {:.3} ms", self.budget.as_secs_f64() * 1000.0);
        println!(
            "│ Over Budget:        {} frames ({:.1}%)",
            self.frames_over_budget,
            self.over_budget_ratio() * 100.0
        );
        println!("└──────────────────────────────────────────────────────────────────┘");

        if self.frames_recorded > 0 {
            let frames = self.frames_recorded as f64;
            println!();
            println!("┌─ BREAKDOWN ──────────────────────────────────────────────────────┐");
            println!("│ Movement:           {:.3} ms", self.logic_us_sum as f64 / frames / 1000.0);
            println!("│ Order + Trade:      {:.3} ms", self.order_us_sum as f64 / frames / 1000.0);
            println!("│ Render:             {:.3} ms", self.render_us_sum as f64 / frames / 1000.0);
            println!("│ Trades:             {}", self.trades);
            println!("└──────────────────────────────────────────────────────────────────┘");
        }
    }
}

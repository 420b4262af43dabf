//! # Simulation Integration Tests
//!
//! Whole-loop behaviour: determinism, index consistency over many frames,
//! trade gating with real NPCs and Rugs, and config loading.

use std::sync::Arc;

use market::core::{
    Entity, EntityId, PartitionId, Sprite, Stall, TradeState, World, WorldConfig,
};
use market::shared::Vec2;
use market::{Animation, Command, Corner, GameLoop, Npc, Rug, SimulationConfig};

fn config(seed: u64) -> SimulationConfig {
    let mut config = SimulationConfig::default();
    config.npc.count = 150;
    config.rug.count = 10;
    config.run.seed = seed;
    config
}

#[test]
fn test_same_seed_same_market() {
    let mut a = GameLoop::new(config(9)).unwrap();
    let mut b = GameLoop::new(config(9)).unwrap();
    a.run(90);
    b.run(90);

    assert_eq!(a.trade_ledger(), b.trade_ledger());
    let positions = |game: &GameLoop| -> Vec<Vec2> {
        game.npcs().iter().map(|n| n.location()).collect()
    };
    assert_eq!(positions(&a), positions(&b));
}

#[test]
fn test_index_consistent_over_many_frames() {
    let mut game = GameLoop::new(config(1)).unwrap();
    game.apply(Command::FullSpeed);

    for frame in 0..200 {
        game.tick(1.0 / 30.0);
        if frame == 100 {
            game.apply(Command::WalkToCorner(Corner::BottomRight));
        }
    }

    let world = game.world();
    for entity in game.entities() {
        let slot = entity.subspace().unwrap();
        assert!(world.tile_contains(slot, entity.unique_id()));
        assert_eq!(world.subspace_index_for(entity.location()), Ok(slot));
    }
    assert_eq!(world.entity_count(), game.entities().len());
}

#[test]
fn test_draw_list_in_painters_order_per_tile() {
    let mut game = GameLoop::new(config(3)).unwrap();
    game.tick(1.0 / 60.0);
    let commands = game.take_draw_list();
    assert_eq!(commands.len(), 160);

    // Consecutive commands from the same tile are sorted by y
    let world = game.world();
    for pair in commands.windows(2) {
        let first = world.subspace_index_for(pair[0].position).unwrap();
        let second = world.subspace_index_for(pair[1].position).unwrap();
        if first == second {
            assert!(pair[0].position.y <= pair[1].position.y);
        }
    }

    let rugs = commands
        .iter()
        .filter(|c| matches!(c.sprite, Sprite::Rug(_)))
        .count();
    assert_eq!(rugs, 10);
}

#[test]
fn test_npc_walking_over_rug_trades_once_per_visit() {
    let world = World::new(WorldConfig::with_size(300, 300, 3)).unwrap();
    let bounds = Vec2::new(300.0, 300.0);

    let rug = Arc::new(Rug::new(
        EntityId::new(1),
        Vec2::new(150.0, 150.0),
        TradeState::BreadWine,
        0.5,
    ));
    // 60 px/s along y = 150, crossing the Rug's circle
    let npc = Arc::new(Npc::new(
        EntityId::new(2),
        Vec2::new(110.0, 150.0),
        TradeState::Lamb,
        Vec2::new(190.0, 150.0),
        60.0,
        bounds,
        Animation::default(),
    ));
    let rug_entity: Arc<dyn Entity> = Arc::clone(&rug) as Arc<dyn Entity>;
    let npc_entity: Arc<dyn Entity> = Arc::clone(&npc) as Arc<dyn Entity>;
    world.place_entity(&rug_entity);
    world.place_entity(&npc_entity);

    let mut trades = 0;
    for _ in 0..20 {
        npc.update(0.05, Vec2::new(190.0, 150.0));
        rug.update(0.05);
        world.place_entity(&npc_entity);
        trades += world.order_partition(PartitionId::CENTER).trades;
    }

    // Stays inside the circle for several ticks but the latch holds
    assert_eq!(trades, 1);
    assert_eq!(npc.trade_state(), TradeState::BreadWine);
    assert_eq!(rug.trade_state(), TradeState::Lamb);
    assert!(rug.can_trade(), "cooldown expired during the walk");
}

#[test]
fn test_cooldown_blocks_second_customer() {
    let world = World::new(WorldConfig::with_size(300, 300, 3)).unwrap();
    let bounds = Vec2::new(300.0, 300.0);

    let rug = Arc::new(Rug::new(
        EntityId::new(1),
        Vec2::new(150.0, 150.0),
        TradeState::Chicken,
        10.0,
    ));
    let first = Arc::new(Npc::new(
        EntityId::new(2),
        Vec2::new(150.0, 145.0),
        TradeState::Lamb,
        Vec2::new(150.0, 145.0),
        0.0,
        bounds,
        Animation::default(),
    ));
    let second = Arc::new(Npc::new(
        EntityId::new(3),
        Vec2::new(150.0, 156.0),
        TradeState::BreadWine,
        Vec2::new(150.0, 156.0),
        0.0,
        bounds,
        Animation::default(),
    ));
    let entities: [Arc<dyn Entity>; 3] = [rug.clone(), first.clone(), second.clone()];
    for entity in &entities {
        world.place_entity(entity);
    }

    let report = world.order_partition(PartitionId::CENTER);
    assert_eq!(report.trades, 1);
    assert_eq!(report.events[0].rug, EntityId::new(1));
    assert!(!rug.can_trade());

    // The earlier one in y order traded; the other still holds its goods
    assert_eq!(first.trade_state(), TradeState::Chicken);
    assert_eq!(second.trade_state(), TradeState::BreadWine);
}

#[test]
fn test_config_file_roundtrip() {
    let path = std::env::temp_dir().join(format!("market-test-{}.toml", std::process::id()));
    std::fs::write(
        &path,
        "[world]\nwidth = 640\nheight = 480\nhorizontal_tiles = 6\n\n[npc]\ncount = 12\n\n[rug]\ncount = 2\n",
    )
    .unwrap();

    let config = SimulationConfig::load(&path).unwrap();
    std::fs::remove_file(&path).unwrap();

    let mut game = GameLoop::new(config).unwrap();
    assert_eq!(game.world().horizontal_tiles(), 6);
    assert_eq!(game.world().vertical_tiles(), 5);
    let stats = game.tick(1.0 / 60.0);
    assert_eq!(stats.entities, 14);
}

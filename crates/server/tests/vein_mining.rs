//! End-to-end vein operations through the sandbox host.

use rand::SeedableRng;
use rand::rngs::StdRng;
use veinmine_engine::clock::ManualClock;
use veinmine_engine::gate::Rejection;
use veinmine_engine::world::block::BlockType;
use veinmine_engine::world::position::BlockPos;
use veinmine_server::config::VeinMinerConfig;
use veinmine_server::durability::DurabilityOutcome;
use veinmine_server::host::PlayerContext;
use veinmine_server::item::{ItemId, ToolDescriptor};
use veinmine_server::miner::{AbortReason, BreakOutcome, SkipReason, VeinMiner, VeinReport};
use veinmine_server::sandbox::{Chat, Sandbox, SandboxInventory};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Always-on activation, face-only adjacency and no XP bonus, so scenario
/// numbers come out exact.
fn base_config() -> VeinMinerConfig {
    let mut config = VeinMinerConfig::default();
    config.activation.mode = "always".into();
    config.mining_pattern.include_diagonals = false;
    config.experience.bonus_enabled = false;
    config
}

struct Scenario {
    sandbox: Sandbox,
    miner: VeinMiner,
    clock: ManualClock,
    steve: PlayerContext,
}

impl Scenario {
    fn new(config: VeinMinerConfig) -> Self {
        let clock = ManualClock::new(1_000_000);
        let miner = VeinMiner::new(config)
            .with_clock(clock.clone())
            .with_rng(StdRng::seed_from_u64(17));
        let mut sandbox = Sandbox::new();
        let steve = sandbox.join("Steve");
        sandbox.give_tool(steve.id, ToolDescriptor::new("iron_pickaxe"));
        Self {
            sandbox,
            miner,
            clock,
            steve,
        }
    }

    /// A straight run of `len` blocks along +x from `start`.
    fn line(&self, block: &str, start: BlockPos, len: i64) -> Vec<BlockPos> {
        let block = BlockType::new(block);
        let positions: Vec<_> = (0..len)
            .map(|i| BlockPos::new(start.x + i, start.y, start.z))
            .collect();
        for pos in &positions {
            self.sandbox.world.set_block(*pos, &block).unwrap();
        }
        positions
    }

    fn mine(&mut self, pos: BlockPos) -> BreakOutcome {
        let steve = self.steve.clone();
        self.sandbox.break_block(&mut self.miner, &steve, pos)
    }

    fn messages(&self) -> Vec<&str> {
        self.sandbox.messenger.messages_to(&self.steve.id)
    }

    fn count(&self, id: &str) -> usize {
        self.sandbox.world.count_blocks(&BlockType::new(id))
    }

    fn held(&self, item: &str) -> u32 {
        self.sandbox.inventory.count(&self.steve.id, &ItemId::new(item))
    }
}

fn mined(outcome: BreakOutcome) -> VeinReport {
    match outcome {
        BreakOutcome::Mined(report) => report,
        other => panic!("expected a mined vein, got {:?}", other),
    }
}

const ORIGIN: BlockPos = BlockPos::new(0, 10, 0);

// ---------------------------------------------------------------------------
// Whole veins
// ---------------------------------------------------------------------------

#[test]
fn six_iron_ore_with_plain_pickaxe() {
    let mut s = Scenario::new(base_config());
    s.line("iron_ore", ORIGIN, 6);

    let report = mined(s.mine(ORIGIN));
    assert_eq!(report.found, 6);
    assert!(!report.truncated);
    assert_eq!(report.process.successful, 6);
    assert_eq!(report.process.failed, 0);
    assert_eq!(report.process.xp_granted, 6);

    assert_eq!(s.count("iron_ore"), 0);
    assert_eq!(s.held("raw_iron"), 6);
    assert_eq!(s.sandbox.inventory.experience(&s.steve.id), 6);

    let tool = s.sandbox.inventory.backpack(&s.steve.id).unwrap().main_hand.clone().unwrap();
    assert_eq!(tool.damage, 6);
    assert_eq!(report.process.durability, DurabilityOutcome::Damaged { damage: 6 });

    assert!(s.sandbox.messenger.log.contains(&Chat::Tip(
        s.steve.id,
        "§6Vein Mining: §f6 blocks§7 (+6 XP)".to_string()
    )));
    assert_eq!(s.miner.stats(&s.steve.id).unwrap().total_blocks, 6);
}

#[test]
fn vein_larger_than_max_is_cut_at_max() {
    let mut config = base_config();
    config.max_blocks = 5;
    let mut s = Scenario::new(config);
    s.line("iron_ore", ORIGIN, 10);

    let report = mined(s.mine(ORIGIN));
    assert!(report.truncated);
    assert_eq!(report.process.successful, 5);
    assert_eq!(s.count("iron_ore"), 5);
    assert!(s.messages().contains(&"§cVein size limited to 5 blocks!"));
}

#[test]
fn diagonal_neighbors_join_the_vein_by_default() {
    let mut config = base_config();
    config.mining_pattern.include_diagonals = true;
    let mut s = Scenario::new(config);
    let coal = BlockType::new("coal_ore");
    for i in 0..4 {
        s.sandbox
            .world
            .set_block(BlockPos::new(i, 10 + i, 0), &coal)
            .unwrap();
    }

    let report = mined(s.mine(ORIGIN));
    assert_eq!(report.process.successful, 4);
    assert_eq!(s.held("coal"), 4);
}

#[test]
fn unbreakable_positions_count_as_failures() {
    let mut s = Scenario::new(base_config());
    let positions = s.line("gold_ore", ORIGIN, 4);
    s.sandbox.world.protect(positions[2]);

    let report = mined(s.mine(ORIGIN));
    assert_eq!(report.found, 4);
    assert_eq!(report.process.successful, 3);
    assert_eq!(report.process.failed, 1);
    assert_eq!(s.held("raw_gold"), 3);
    assert_eq!(s.count("gold_ore"), 1);
}

#[test]
fn overflow_is_dropped_at_the_player() {
    let mut s = Scenario::new(base_config());
    s.sandbox.inventory = SandboxInventory::with_slots(0);
    s.line("iron_ore", ORIGIN, 3);

    let report = mined(s.mine(ORIGIN));
    assert_eq!(report.process.overflow, 3);
    assert_eq!(s.sandbox.inventory.dropped_count(&ItemId::new("raw_iron")), 3);
    assert!(s.messages().contains(&"§eInventory full! 3 items were dropped."));
}

#[test]
fn overflow_can_be_deleted() {
    let mut config = base_config();
    config.auto_pickup.full_inventory_action = "delete".into();
    let mut s = Scenario::new(config);
    s.sandbox.inventory = SandboxInventory::with_slots(0);
    s.line("iron_ore", ORIGIN, 3);

    mined(s.mine(ORIGIN));
    assert!(s.sandbox.inventory.dropped.is_empty());
    assert!(s.messages().contains(&"§eInventory full! 3 items were deleted."));
}

#[test]
fn without_auto_pickup_items_drop_at_each_block() {
    let mut config = base_config();
    config.auto_pickup.enabled = false;
    let mut s = Scenario::new(config);
    let positions = s.line("iron_ore", ORIGIN, 3);

    mined(s.mine(ORIGIN));
    assert_eq!(s.held("raw_iron"), 0);
    let spots: Vec<_> = s.sandbox.inventory.dropped.iter().map(|(pos, _)| *pos).collect();
    assert_eq!(spots, positions);
}

#[test]
fn worn_tool_breaks_and_leaves_the_hand_empty() {
    let mut s = Scenario::new(base_config());
    s.sandbox.give_tool(
        s.steve.id,
        ToolDescriptor {
            damage: 57,
            ..ToolDescriptor::new("wooden_pickaxe")
        },
    );
    s.line("coal_ore", ORIGIN, 5);

    let report = mined(s.mine(ORIGIN));
    assert_eq!(report.process.durability, DurabilityOutcome::Broken);
    assert!(s.sandbox.inventory.backpack(&s.steve.id).unwrap().main_hand.is_none());
}

#[test]
fn milestones_are_broadcast() {
    let mut config = base_config();
    config.statistics.milestones.thresholds = vec![3];
    let mut s = Scenario::new(config);
    s.line("iron_ore", ORIGIN, 4);

    let report = mined(s.mine(ORIGIN));
    assert_eq!(report.milestones, vec![3]);
    assert!(s.sandbox.messenger.log.contains(&Chat::Broadcast(
        "§6§lSteve §ehas mined §63 §eblocks with VeinMiner!".to_string()
    )));
}

#[test]
fn completion_effects_play_even_when_nothing_broke() {
    let mut s = Scenario::new(base_config());
    for pos in s.line("gold_ore", ORIGIN, 3) {
        s.sandbox.world.protect(pos);
    }

    let report = mined(s.mine(ORIGIN));
    assert_eq!(report.process.successful, 0);
    assert_eq!(report.process.failed, 3);
    assert_eq!(s.count("gold_ore"), 3);
    assert_eq!(
        s.sandbox.effects.sounds,
        vec![(s.steve.id, "random.levelup".to_string())]
    );
    assert_eq!(s.sandbox.effects.particles, 3);
    assert!(s.messages().contains(&"§cAn error occurred during vein mining."));
}

// ---------------------------------------------------------------------------
// Integrity aborts
// ---------------------------------------------------------------------------

#[test]
fn runaway_search_aborts_without_touching_the_world() {
    // Reach 1 keeps at most 7 members, so the vein never fills up while the
    // wide cube pattern queues more than the 100-iteration cap.
    let mut config = base_config();
    config.max_blocks = 10;
    config.mining_pattern.pattern = "cube".into();
    config.mining_pattern.radius = 2;
    config.activation.max_reach_distance = 1;
    let mut s = Scenario::new(config);

    let iron = BlockType::new("iron_ore");
    for x in -3..=3 {
        for y in 7..=13 {
            for z in -3..=3 {
                s.sandbox.world.set_block(BlockPos::new(x, y, z), &iron).unwrap();
            }
        }
    }
    assert_eq!(s.count("iron_ore"), 343);

    let outcome = s.mine(ORIGIN);
    assert!(
        matches!(outcome, BreakOutcome::Aborted(AbortReason::IterationCap { iterations: 101 })),
        "{:?}",
        outcome
    );
    // Only the vanilla break of the start block happened.
    assert_eq!(s.count("iron_ore"), 342);
    assert_eq!(s.sandbox.inventory.dropped_count(&ItemId::new("iron_ore")), 1);
    assert_eq!(s.held("raw_iron"), 0);
    assert_eq!(s.held("iron_ore"), 0);
    assert!(s.sandbox.messenger.log.is_empty());
    assert!(s.sandbox.effects.sounds.is_empty());
    assert!(!s.miner.guard().is_processing(&s.steve.id));
    assert!(s.miner.players().get(&s.steve.id).is_none_or(|p| {
        p.last_operation.is_none() && p.recent_operations.is_empty()
    }));

    // No cooldown was started, so an immediate second break is searched again.
    let again = s.mine(BlockPos::new(1, 10, 0));
    assert!(
        matches!(again, BreakOutcome::Aborted(AbortReason::IterationCap { .. })),
        "{:?}",
        again
    );
    assert_eq!(s.count("iron_ore"), 341);
}

// ---------------------------------------------------------------------------
// Normal breaks
// ---------------------------------------------------------------------------

#[test]
fn single_block_is_left_to_a_normal_break() {
    let mut s = Scenario::new(base_config());
    s.line("iron_ore", ORIGIN, 1);

    assert_eq!(s.mine(ORIGIN), BreakOutcome::Skipped(SkipReason::TooSmall));
    assert_eq!(s.count("iron_ore"), 0);
    assert_eq!(s.sandbox.inventory.dropped_count(&ItemId::new("iron_ore")), 1);
    // Too small never starts the cooldown.
    assert_eq!(s.miner.players().get(&s.steve.id).and_then(|p| p.last_operation), None);
}

#[test]
fn wrong_tool_is_refused_with_a_notice() {
    let mut s = Scenario::new(base_config());
    s.sandbox.give_tool(s.steve.id, ToolDescriptor::new("iron_axe"));
    s.line("iron_ore", ORIGIN, 4);

    assert_eq!(s.mine(ORIGIN), BreakOutcome::Skipped(SkipReason::WrongTool));
    assert_eq!(s.count("iron_ore"), 3);
    assert!(s.messages().contains(&"§cYou need the correct tool to vein mine this block!"));
    assert!(!s.miner.guard().is_processing(&s.steve.id));
}

#[test]
fn sneak_mode_needs_sneaking() {
    let mut config = base_config();
    config.activation.mode = "sneak".into();
    let mut s = Scenario::new(config);
    s.line("iron_ore", ORIGIN, 4);

    assert_eq!(s.mine(ORIGIN), BreakOutcome::Skipped(SkipReason::ActivationMode));

    s.line("iron_ore", ORIGIN, 4);
    s.steve.sneaking = true;
    assert_eq!(mined(s.mine(ORIGIN)).process.successful, 4);
}

#[test]
fn silent_filters() {
    let mut config = base_config();
    config.disabled_worlds.push("world_nether".into());
    let mut s = Scenario::new(config);
    s.line("stone", ORIGIN, 4);
    assert_eq!(s.mine(ORIGIN), BreakOutcome::Skipped(SkipReason::NotVeinBlock));

    s.line("iron_ore", ORIGIN, 4);
    s.steve.world = "world_nether".into();
    assert_eq!(s.mine(ORIGIN), BreakOutcome::Skipped(SkipReason::WorldDisabled));

    s.line("iron_ore", ORIGIN, 4);
    s.steve.world = "world".into();
    s.sandbox.permissions.deny(s.steve.id, "veinminer.use");
    assert_eq!(s.mine(ORIGIN), BreakOutcome::Skipped(SkipReason::NoPermission));

    s.line("iron_ore", ORIGIN, 4);
    s.sandbox.permissions.grant(s.steve.id, "veinminer.use");
    s.miner.set_enabled(s.steve.id, false);
    assert_eq!(s.mine(ORIGIN), BreakOutcome::Skipped(SkipReason::ToggledOff));
    assert!(s.messages().is_empty());
}

#[test]
fn per_block_permissions() {
    let mut config = base_config();
    config.activation.per_block_permissions = true;
    let mut s = Scenario::new(config);
    s.sandbox.permissions.deny(s.steve.id, "veinminer.blocks.iron_ore");
    s.line("iron_ore", ORIGIN, 4);

    assert_eq!(s.mine(ORIGIN), BreakOutcome::Skipped(SkipReason::BlockPermission));
    assert!(s.messages().contains(&"§cYou don't have permission to vein mine this block type!"));

    s.line("coal_ore", BlockPos::new(0, 20, 0), 4);
    s.clock.advance(1_000);
    assert!(s.mine(BlockPos::new(0, 20, 0)).handled());
}

// ---------------------------------------------------------------------------
// Gate
// ---------------------------------------------------------------------------

#[test]
fn cooldown_rejects_and_notifies() {
    let mut config = base_config();
    config.cooldown_ms = 1_000;
    let mut s = Scenario::new(config);
    s.line("iron_ore", ORIGIN, 3);
    s.line("iron_ore", BlockPos::new(0, 20, 0), 3);

    mined(s.mine(ORIGIN));
    s.clock.advance(400);
    assert_eq!(
        s.mine(BlockPos::new(0, 20, 0)),
        BreakOutcome::Rejected(Rejection::Cooldown {
            remaining_ms: 600,
            notify: true
        })
    );
    assert!(s.messages().contains(&"§cPlease wait before vein mining again!"));

    s.clock.advance(600);
    assert_eq!(mined(s.mine(BlockPos::new(1, 20, 0))).process.successful, 2);
}

#[test]
fn sixty_first_vein_in_a_minute_blocks_the_player() {
    let mut config = base_config();
    config.cooldown_ms = 0;
    config.min_vein_size = 1;
    let mut s = Scenario::new(config);
    let spots: Vec<_> = (0..62).map(|i| BlockPos::new(i * 3, 10, 0)).collect();
    for pos in &spots {
        s.line("iron_ore", *pos, 1);
    }

    for pos in &spots[..60] {
        assert!(s.mine(*pos).handled());
        s.clock.advance(100);
    }
    let outcome = s.mine(spots[60]);
    assert!(matches!(
        outcome,
        BreakOutcome::Rejected(Rejection::RateLimited { .. })
    ));
    assert!(s.messages().contains(&"§cYou've reached your daily vein mining limit!"));

    s.clock.advance(100);
    assert!(matches!(
        s.mine(spots[61]),
        BreakOutcome::Rejected(Rejection::TemporarilyBlocked { .. })
    ));

    s.line("iron_ore", ORIGIN, 2);
    s.clock.advance(5 * 60_000);
    assert!(s.mine(ORIGIN).handled());
}

#[test]
fn daily_block_limit_checks_the_candidate_vein() {
    let mut config = base_config();
    config.limits.enable_limits = true;
    config.limits.max_blocks_per_day = 6;
    let mut s = Scenario::new(config);
    s.line("iron_ore", ORIGIN, 4);
    s.line("iron_ore", BlockPos::new(0, 20, 0), 4);

    mined(s.mine(ORIGIN));
    s.clock.advance(1_000);
    assert_eq!(
        s.mine(BlockPos::new(0, 20, 0)),
        BreakOutcome::Rejected(Rejection::DailyBlockLimit)
    );
    assert!(s.messages().contains(&"§cYou've reached your daily vein mining limit!"));

    s.miner.reset_daily();
    s.line("iron_ore", BlockPos::new(0, 20, 0), 4);
    s.clock.advance(1_000);
    assert!(s.mine(BlockPos::new(0, 20, 0)).handled());
}

// ---------------------------------------------------------------------------
// Maintenance
// ---------------------------------------------------------------------------

#[test]
fn cleanup_forgets_idle_players() {
    let mut s = Scenario::new(base_config());
    s.line("iron_ore", ORIGIN, 3);
    mined(s.mine(ORIGIN));
    assert_eq!(s.miner.players().len(), 1);

    let now = s.miner.now();
    assert_eq!(s.miner.cleanup(now + 1_000), 0);
    assert_eq!(s.miner.cleanup(now + 300_001), 1);
    assert!(s.miner.players().is_empty());
}

#[test]
fn reload_clears_player_state_and_rebuilds_the_pattern() {
    let mut s = Scenario::new(base_config());
    s.line("iron_ore", ORIGIN, 3);
    mined(s.mine(ORIGIN));
    assert_eq!(s.miner.pattern().len(), 6);

    let mut config = base_config();
    config.mining_pattern.include_diagonals = true;
    s.miner.reload(config);
    assert!(s.miner.players().is_empty());
    assert_eq!(s.miner.tool_cache_len(), 0);
    assert_eq!(s.miner.pattern().len(), 26);
    assert_eq!(s.miner.stats(&s.steve.id).unwrap().total_veins, 1);
}

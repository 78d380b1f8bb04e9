//! The vein miner: ties the engine's search and gate to rewards, inventories,
//! messages and statistics.
//!
//! A break goes through, in order: eligibility filters, the abuse gate (which
//! hands out a processing lease), per-block permission and tool checks,
//! discovery, size and daily checks, batch processing, usage recording and
//! statistics. Anything short of a processed vein leaves the break to the
//! host's normal handling.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Instant;

use rand::SeedableRng;
use rand::rngs::StdRng;
use veinmine_engine::clock::{Clock, SystemClock};
use veinmine_engine::gate::{
    AbuseGate, ConcurrencyGuard, PlayerId, PlayerStateStore, RATE_WINDOW_MS, Rejection,
    STALE_ENTRY_MS,
};
use veinmine_engine::search::{NeighborPattern, find_vein};
use veinmine_engine::world::block::BlockType;
use veinmine_engine::world::position::BlockPos;

use crate::block::{TOOL_CACHE_CAPACITY, ToolValidator, VeinCatalog};
use crate::config::{ConfigError, VeinMinerConfig};
use crate::effects::EffectPlayer;
use crate::host::{Host, PlayerContext};
use crate::messages::{ERROR_NOTICE, ERROR_NOTICE_INTERVAL_MS, MessageKey, Messages, completion_tip};
use crate::processor::{BatchProcessor, ProcessReport, ProcessSettings};
use crate::rewards::RewardEngine;
use crate::stats::{PlayerStats, StatsTracker};

pub const PERMISSION_USE: &str = "veinminer.use";
/// Prefix of per-block permissions, followed by the block path.
pub const PERMISSION_BLOCK_PREFIX: &str = "veinminer.blocks.";

/// Why a break was left to normal handling before reaching the gate's
/// verdict or after passing it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    NoPermission,
    ToggledOff,
    WorldDisabled,
    ActivationMode,
    NotVeinBlock,
    BlockPermission,
    WrongTool,
    TooSmall,
}

/// Integrity failures that stop an operation before the world is touched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AbortReason {
    IterationCap { iterations: usize },
    Oversized { found: usize, max: usize },
}

#[derive(Debug, Clone, PartialEq)]
pub struct VeinReport {
    pub block: BlockType,
    pub found: usize,
    /// The vein reached the size limit and may continue past it.
    pub truncated: bool,
    pub process: ProcessReport,
    pub milestones: Vec<u64>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum BreakOutcome {
    Skipped(SkipReason),
    Rejected(Rejection),
    Aborted(AbortReason),
    Mined(VeinReport),
}

impl BreakOutcome {
    /// True when the vein miner handled the break and the host must not.
    pub fn handled(&self) -> bool {
        matches!(self, Self::Mined(_))
    }
}

pub struct VeinMiner {
    config: VeinMinerConfig,
    config_path: Option<PathBuf>,
    pattern: NeighborPattern,
    catalog: VeinCatalog,
    tools: ToolValidator,
    rewards: RewardEngine,
    effects: EffectPlayer,
    messages: Messages,
    settings: ProcessSettings,
    gate: AbuseGate,
    players: PlayerStateStore,
    guard: ConcurrencyGuard,
    stats: StatsTracker,
    disabled: HashSet<PlayerId>,
    clock: Box<dyn Clock>,
    rng: StdRng,
}

impl VeinMiner {
    pub fn new(mut config: VeinMinerConfig) -> Self {
        config.sanitize();
        let stats = StatsTracker::new(&config.statistics, None);
        let mut miner = Self {
            pattern: NeighborPattern::default(),
            catalog: VeinCatalog::default(),
            tools: ToolValidator::new(),
            rewards: RewardEngine::default(),
            effects: EffectPlayer::default(),
            messages: Messages::default(),
            settings: ProcessSettings::default(),
            gate: AbuseGate::default(),
            players: PlayerStateStore::new(),
            guard: ConcurrencyGuard::new(),
            stats,
            disabled: HashSet::new(),
            clock: Box::new(SystemClock),
            rng: StdRng::from_entropy(),
            config_path: None,
            config,
        };
        miner.rebuild();
        miner
    }

    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    pub fn with_rng(mut self, rng: StdRng) -> Self {
        self.rng = rng;
        self
    }

    pub fn with_stats(mut self, mut stats: StatsTracker) -> Self {
        stats.apply_config(&self.config.statistics);
        self.stats = stats;
        self
    }

    /// File read by [`reload_from_disk`](Self::reload_from_disk).
    pub fn with_config_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config_path = Some(path.into());
        self
    }

    // ── Accessors ───────────────────────────────────────────────────────────

    pub fn config(&self) -> &VeinMinerConfig {
        &self.config
    }

    pub fn config_path(&self) -> Option<&Path> {
        self.config_path.as_deref()
    }

    pub fn messages(&self) -> &Messages {
        &self.messages
    }

    pub fn pattern(&self) -> &NeighborPattern {
        &self.pattern
    }

    pub fn catalog(&self) -> &VeinCatalog {
        &self.catalog
    }

    pub fn gate(&self) -> &AbuseGate {
        &self.gate
    }

    pub fn players(&self) -> &PlayerStateStore {
        &self.players
    }

    pub fn guard(&self) -> &ConcurrencyGuard {
        &self.guard
    }

    pub fn tool_cache_len(&self) -> usize {
        self.tools.cached()
    }

    pub fn now(&self) -> u64 {
        self.clock.now_millis()
    }

    // ── Player toggles ──────────────────────────────────────────────────────

    pub fn is_enabled(&self, player: &PlayerId) -> bool {
        !self.disabled.contains(player)
    }

    pub fn set_enabled(&mut self, player: PlayerId, enabled: bool) {
        if enabled {
            self.disabled.remove(&player);
        } else {
            self.disabled.insert(player);
        }
    }

    /// Flip the player's toggle, returning the new state.
    pub fn toggle(&mut self, player: PlayerId) -> bool {
        let enabled = !self.is_enabled(&player);
        self.set_enabled(player, enabled);
        enabled
    }

    // ── Statistics ──────────────────────────────────────────────────────────

    pub fn stats(&self, player: &PlayerId) -> Option<&PlayerStats> {
        self.stats.get(player)
    }

    pub fn stats_tracker(&self) -> &StatsTracker {
        &self.stats
    }

    pub fn save_stats(&mut self) -> anyhow::Result<bool> {
        self.stats.save()
    }

    // ── Lifecycle ───────────────────────────────────────────────────────────

    /// Swap in a new configuration. All per-player engine state, the tool
    /// cache and the neighbor pattern are rebuilt; toggles and statistics
    /// survive.
    pub fn reload(&mut self, mut config: VeinMinerConfig) {
        config.sanitize();
        self.config = config;
        self.players.clear();
        self.guard.clear();
        self.tools.clear();
        self.rebuild();
        self.stats.apply_config(&self.config.statistics);
        tracing::info!("VeinMiner configuration reloaded");
    }

    /// Re-read the config file. On failure the current config stays active.
    pub fn reload_from_disk(&mut self) -> Result<(), ConfigError> {
        let config = match self.config_path.as_deref() {
            Some(path) => VeinMinerConfig::load(path)?,
            None => self.config.clone(),
        };
        self.reload(config);
        Ok(())
    }

    /// Forget stale per-player state and shed an over-full tool cache.
    /// Returns the number of player entries removed.
    pub fn cleanup(&mut self, now: u64) -> usize {
        let removed = self.players.prune_stale(now, STALE_ENTRY_MS, RATE_WINDOW_MS);
        if self.tools.cached() >= TOOL_CACHE_CAPACITY {
            self.tools.clear();
        }
        tracing::debug!(
            "Cleanup removed {} player entries, {} remain",
            removed,
            self.players.len()
        );
        removed
    }

    pub fn reset_daily(&mut self) {
        self.players.reset_daily();
        tracing::info!("Daily vein mining limits reset");
    }

    fn rebuild(&mut self) {
        let config = &self.config;
        self.pattern = NeighborPattern::build(config.pattern_spec());
        self.catalog = VeinCatalog::build(&config.enabled_blocks, &config.blocks);
        self.rewards = RewardEngine::new(config.smelt_policy());
        self.effects = EffectPlayer::new(&config.effects);
        self.messages = Messages::new(&config.messages);
        self.settings = ProcessSettings::from_config(config);
        self.gate = AbuseGate::new(config.gate_limits());
        config.log_summary();
        tracing::debug!(
            "Neighbor pattern {} with {} offsets, {} vein blocks",
            self.pattern.spec().pattern,
            self.pattern.len(),
            self.catalog.len()
        );
    }

    // ── Breaking ────────────────────────────────────────────────────────────

    /// Handle a block broken by `player`. `block` is the type at `pos` as seen
    /// by the host when the break happened.
    pub fn on_block_break(
        &mut self,
        host: &mut Host<'_>,
        player: &PlayerContext,
        pos: BlockPos,
        block: &BlockType,
    ) -> BreakOutcome {
        if let Some(reason) = self.eligibility(host, player, block) {
            return BreakOutcome::Skipped(reason);
        }

        let started = Instant::now();
        let now = self.clock.now_millis();
        let lease = match self.gate.admit(&mut self.players, &self.guard, player.id, now) {
            Ok(lease) => lease,
            Err(rejection) => {
                self.report_rejection(host, player, rejection);
                return BreakOutcome::Rejected(rejection);
            }
        };

        if self.config.activation.per_block_permissions {
            let node = format!("{}{}", PERMISSION_BLOCK_PREFIX, block.path());
            if !host.permissions.has_permission(player.id, &node) {
                let text = self.messages.render(MessageKey::NoPermission, &[]);
                host.messenger.send_message(player.id, &text);
                return BreakOutcome::Skipped(SkipReason::BlockPermission);
            }
        }

        let tool = host.inventory.tool_in_main_hand(player.id);
        if self.config.activation.require_correct_tool
            && !self.tools.is_proper_tool(block, tool.as_ref())
        {
            let text = self.messages.render(MessageKey::WrongTool, &[]);
            host.messenger.send_message(player.id, &text);
            return BreakOutcome::Skipped(SkipReason::WrongTool);
        }

        let max = self.config.max_vein_size();
        let limits = self.config.search_limits(host.world.height_bounds());
        let search = find_vein(host.world, pos, block, &self.pattern, &limits);
        if search.hit_iteration_cap() {
            if self.config.anti_abuse.log_suspicious_activity {
                tracing::warn!(
                    "Vein search for {} at ({}, {}, {}) hit the iteration cap after {} iterations",
                    player.name, pos.x, pos.y, pos.z, search.iterations
                );
            }
            return BreakOutcome::Aborted(AbortReason::IterationCap {
                iterations: search.iterations,
            });
        }
        let vein = search.vein;
        let found = vein.len();
        if found > max * 2 {
            tracing::warn!(
                "Vein for {} has {} blocks, more than twice the limit of {}",
                player.name, found, max
            );
            return BreakOutcome::Aborted(AbortReason::Oversized { found, max });
        }
        if found < self.config.min_vein_size() {
            return BreakOutcome::Skipped(SkipReason::TooSmall);
        }

        if let Err(rejection) = self.gate.check_daily(&self.players, &player.id, found.min(max)) {
            self.report_rejection(host, player, rejection);
            return BreakOutcome::Rejected(rejection);
        }

        let truncated = found >= max;
        if truncated {
            let text = self.messages.render(MessageKey::VeinTooLarge, &[("max", &max)]);
            host.messenger.send_message(player.id, &text);
        }

        let processor = BatchProcessor {
            rewards: &self.rewards,
            effects: &self.effects,
            messages: &self.messages,
            settings: self.settings,
        };
        let process = processor.process(host, player, &vein, tool, &mut self.rng);

        self.gate.mark_operation(&mut self.players, player.id, now);
        drop(lease);
        self.gate
            .record_usage(&mut self.players, player.id, now, process.successful);

        let mut milestones = Vec::new();
        if process.successful > 0 {
            milestones = self.record_stats(host, player, process.successful, now);
            host.messenger
                .send_tip(player.id, &completion_tip(process.successful, process.xp_granted));
        } else {
            self.notify_error(host, player, now);
        }

        let logging = &self.config.logging;
        if logging.enabled && logging.log_vein_mining {
            tracing::info!(
                "{} mined a vein of {} {} ({} failed)",
                player.name,
                process.successful,
                block,
                process.failed
            );
        }
        if logging.enabled && logging.performance_logging {
            tracing::info!(
                "Vein operation for {} took {:?} ({} blocks)",
                player.name,
                started.elapsed(),
                found
            );
        }

        BreakOutcome::Mined(VeinReport {
            block: block.clone(),
            found,
            truncated,
            process,
            milestones,
        })
    }

    /// Silent checks made before the gate is consulted.
    fn eligibility(&self, host: &Host<'_>, player: &PlayerContext, block: &BlockType) -> Option<SkipReason> {
        if !host.permissions.has_permission(player.id, PERMISSION_USE) {
            return Some(SkipReason::NoPermission);
        }
        if !self.is_enabled(&player.id) {
            return Some(SkipReason::ToggledOff);
        }
        if self.config.is_world_disabled(&player.world) {
            return Some(SkipReason::WorldDisabled);
        }
        if !self.config.activation_mode().permits(player.sneaking) {
            return Some(SkipReason::ActivationMode);
        }
        if !self.catalog.contains(block) {
            return Some(SkipReason::NotVeinBlock);
        }
        None
    }

    fn report_rejection(&self, host: &mut Host<'_>, player: &PlayerContext, rejection: Rejection) {
        match rejection {
            Rejection::Cooldown { remaining_ms, .. } => {
                let logging = &self.config.logging;
                if logging.enabled && logging.log_cooldown_violations {
                    tracing::info!("{} is on cooldown ({}ms remaining)", player.name, remaining_ms);
                }
            }
            Rejection::RateLimited { blocked_until } => {
                if self.config.anti_abuse.log_suspicious_activity {
                    tracing::warn!(
                        "{} exceeded {} veins per minute, blocked until {}",
                        player.name,
                        self.gate.limits().max_per_minute,
                        blocked_until
                    );
                }
            }
            _ => {}
        }
        if !rejection.notifies() {
            return;
        }
        let key = match rejection {
            Rejection::Cooldown { .. } => MessageKey::CooldownActive,
            _ => MessageKey::LimitReached,
        };
        let text = self.messages.render(key, &[]);
        host.messenger.send_message(player.id, &text);
    }

    fn record_stats(&mut self, host: &mut Host<'_>, player: &PlayerContext, blocks: usize, now: u64) -> Vec<u64> {
        let reached = self
            .stats
            .record_vein_mine(player.id, &player.name, blocks as u64, now);
        for threshold in &reached {
            let text = self.messages.render(
                MessageKey::MilestoneReached,
                &[("player", &player.name), ("count", threshold)],
            );
            if self.config.statistics.broadcast_milestones {
                host.messenger.broadcast(&text);
            } else {
                host.messenger.send_message(player.id, &text);
            }
            tracing::info!("{} reached the {} block milestone", player.name, threshold);
        }

        if self.config.statistics.auto_save_interval == 0 {
            if let Err(e) = self.stats.save() {
                tracing::error!("Failed to save statistics: {:#}", e);
                self.notify_error(host, player, now);
            }
        }
        reached
    }

    fn notify_error(&mut self, host: &mut Host<'_>, player: &PlayerContext, now: u64) {
        let state = self.players.entry(player.id);
        let due = state
            .last_error_notice
            .is_none_or(|t| now.saturating_sub(t) >= ERROR_NOTICE_INTERVAL_MS);
        if due {
            state.last_error_notice = Some(now);
            host.messenger.send_message(player.id, ERROR_NOTICE);
        }
    }
}

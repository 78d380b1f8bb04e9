//! Plugin configuration: TOML on disk, clamped into safe ranges on load.
//!
//! Every section uses kebab-case keys and falls back to its defaults for
//! anything missing. Out-of-range values are replaced with a warning rather
//! than rejected; only an unreadable or malformed file is an error.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use veinmine_engine::gate::GateLimits;
use veinmine_engine::search::pattern::{MAX_RADIUS, MAX_RANGE, MIN_RADIUS, MIN_RANGE};
use veinmine_engine::search::{MiningPattern, PatternSpec, SearchLimits};
use veinmine_engine::world::HeightBounds;

use crate::durability::DurabilityPolicy;
use crate::rewards::{SmeltPolicy, XpPolicy};

pub const DEFAULT_MAX_BLOCKS: i64 = 64;
/// Cap applied when `max-blocks` is -1.
pub const UNLIMITED_MAX_BLOCKS: i64 = 4096;
pub const DEFAULT_COOLDOWN_MS: i64 = 100;
pub const DEFAULT_BATCH_SIZE: i64 = 10;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("reading config {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("parsing config")]
    Parse(#[from] toml::de::Error),

    #[error("serializing config")]
    Serialize(#[from] toml::ser::Error),
}

// ── Enumerated settings ─────────────────────────────────────────────────────

/// When a break should trigger vein mining.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivationMode {
    Sneak,
    Stand,
    Always,
}

impl ActivationMode {
    fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "sneak" => Some(Self::Sneak),
            "stand" => Some(Self::Stand),
            "always" => Some(Self::Always),
            _ => None,
        }
    }

    pub fn permits(self, sneaking: bool) -> bool {
        match self {
            Self::Sneak => sneaking,
            Self::Stand => !sneaking,
            Self::Always => true,
        }
    }
}

/// What happens to auto-pickup items that do not fit in the inventory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FullInventoryAction {
    Drop,
    Delete,
}

impl FullInventoryAction {
    fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "drop" => Some(Self::Drop),
            "delete" => Some(Self::Delete),
            _ => None,
        }
    }

    /// Past-tense verb used in the inventory-full notice.
    pub fn verb(self) -> &'static str {
        match self {
            Self::Drop => "dropped",
            Self::Delete => "deleted",
        }
    }
}

// ── Sections ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct AutoPickupConfig {
    pub enabled: bool,
    pub full_inventory_action: String,
}

impl Default for AutoPickupConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            full_inventory_action: "drop".into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct AutoSmeltConfig {
    pub enabled: bool,
    pub require_fortune: bool,
    pub give_xp: bool,
    pub xp_multiplier: f64,
    pub whitelist: Vec<String>,
}

impl Default for AutoSmeltConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            require_fortune: false,
            give_xp: true,
            xp_multiplier: 0.5,
            whitelist: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct ToolDurabilityConfig {
    pub multiplier: f64,
    pub respect_unbreaking: bool,
    pub break_on_exceed: bool,
}

impl Default for ToolDurabilityConfig {
    fn default() -> Self {
        Self {
            multiplier: 1.0,
            respect_unbreaking: true,
            break_on_exceed: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct ExperienceConfig {
    pub enabled: bool,
    pub bonus_enabled: bool,
    pub bonus_per_blocks: i64,
    pub multiplier: f64,
}

impl Default for ExperienceConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            bonus_enabled: true,
            bonus_per_blocks: 10,
            multiplier: 0.05,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct MilestoneConfig {
    pub enabled: bool,
    pub thresholds: Vec<u64>,
}

impl Default for MilestoneConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            thresholds: vec![100, 500, 1000, 5000, 10000],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct StatisticsConfig {
    pub enabled: bool,
    /// Seconds between autosaves. Zero saves after every recorded vein.
    pub auto_save_interval: i64,
    pub broadcast_milestones: bool,
    pub file: String,
    pub milestones: MilestoneConfig,
}

impl Default for StatisticsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            auto_save_interval: 300,
            broadcast_milestones: true,
            file: "stats.json".into(),
            milestones: MilestoneConfig::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct LoggingConfig {
    pub enabled: bool,
    pub log_vein_mining: bool,
    pub log_config_loading: bool,
    pub performance_logging: bool,
    pub log_player_toggle: bool,
    pub log_cooldown_violations: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            log_vein_mining: true,
            log_config_loading: true,
            performance_logging: false,
            log_player_toggle: false,
            log_cooldown_violations: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct ActivationConfig {
    pub mode: String,
    pub per_block_permissions: bool,
    pub require_correct_tool: bool,
    pub max_reach_distance: i64,
}

impl Default for ActivationConfig {
    fn default() -> Self {
        Self {
            mode: "sneak".into(),
            per_block_permissions: false,
            require_correct_tool: true,
            max_reach_distance: 100,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct MiningPatternConfig {
    pub pattern: String,
    pub radius: i64,
    pub include_diagonals: bool,
    pub vertical_range: i64,
    pub horizontal_range: i64,
}

impl Default for MiningPatternConfig {
    fn default() -> Self {
        Self {
            pattern: "adjacent".into(),
            radius: 1,
            include_diagonals: true,
            vertical_range: 4,
            horizontal_range: 4,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct LimitsConfig {
    pub enable_limits: bool,
    pub max_veins_per_day: i64,
    pub max_blocks_per_day: i64,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            enable_limits: false,
            max_veins_per_day: 1000,
            max_blocks_per_day: 10_000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct AntiAbuseConfig {
    pub max_veins_per_minute: i64,
    /// Minutes.
    pub temporary_block_duration: i64,
    pub log_suspicious_activity: bool,
}

impl Default for AntiAbuseConfig {
    fn default() -> Self {
        Self {
            max_veins_per_minute: 60,
            temporary_block_duration: 5,
            log_suspicious_activity: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct ParticleConfig {
    pub enabled: bool,
    #[serde(rename = "type")]
    pub kind: String,
    pub count: i64,
    pub radius: f64,
    pub per_block: bool,
}

impl Default for ParticleConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            kind: "explosion".into(),
            count: 3,
            radius: 0.5,
            per_block: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct SoundConfig {
    pub enabled: bool,
    pub completion_sound: String,
    pub volume: f64,
    pub pitch: f64,
    pub per_block_sound: bool,
    pub block_sound: String,
}

impl Default for SoundConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            completion_sound: "random.levelup".into(),
            volume: 1.0,
            pitch: 1.0,
            per_block_sound: false,
            block_sound: "dig.stone".into(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct EffectsConfig {
    pub particles: ParticleConfig,
    pub sounds: SoundConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct EnabledBlocks {
    pub ores: bool,
    pub logs: bool,
    pub leaves: bool,
}

impl Default for EnabledBlocks {
    fn default() -> Self {
        Self {
            ores: true,
            logs: true,
            leaves: true,
        }
    }
}

// ── Root ────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct VeinMinerConfig {
    pub max_blocks: i64,
    pub min_vein_size: i64,
    pub cooldown_ms: i64,
    pub batch_size: i64,
    pub disabled_worlds: Vec<String>,
    pub auto_pickup: AutoPickupConfig,
    pub auto_smelt: AutoSmeltConfig,
    pub tool_durability: ToolDurabilityConfig,
    pub experience: ExperienceConfig,
    pub statistics: StatisticsConfig,
    pub logging: LoggingConfig,
    pub activation: ActivationConfig,
    pub mining_pattern: MiningPatternConfig,
    pub limits: LimitsConfig,
    pub anti_abuse: AntiAbuseConfig,
    pub effects: EffectsConfig,
    pub enabled_blocks: EnabledBlocks,
    /// Per-block toggles keyed by upper-case block name (`IRON_ORE`, `LOG2`).
    pub blocks: IndexMap<String, bool>,
    /// Message template overrides keyed by message name.
    pub messages: IndexMap<String, String>,
}

impl Default for VeinMinerConfig {
    fn default() -> Self {
        Self {
            max_blocks: DEFAULT_MAX_BLOCKS,
            min_vein_size: 2,
            cooldown_ms: DEFAULT_COOLDOWN_MS,
            batch_size: DEFAULT_BATCH_SIZE,
            disabled_worlds: Vec::new(),
            auto_pickup: AutoPickupConfig::default(),
            auto_smelt: AutoSmeltConfig::default(),
            tool_durability: ToolDurabilityConfig::default(),
            experience: ExperienceConfig::default(),
            statistics: StatisticsConfig::default(),
            logging: LoggingConfig::default(),
            activation: ActivationConfig::default(),
            mining_pattern: MiningPatternConfig::default(),
            limits: LimitsConfig::default(),
            anti_abuse: AntiAbuseConfig::default(),
            effects: EffectsConfig::default(),
            enabled_blocks: EnabledBlocks::default(),
            blocks: IndexMap::new(),
            messages: IndexMap::new(),
        }
    }
}

impl VeinMinerConfig {
    /// Parse and sanitize a TOML document.
    pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
        let mut config: Self = toml::from_str(raw)?;
        config.sanitize();
        Ok(config)
    }

    /// Read, parse and sanitize a config file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&raw)
    }

    /// Write this config as TOML, creating parent directories as needed.
    pub fn write(&self, path: &Path) -> Result<(), ConfigError> {
        let io = |source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        };
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(io)?;
        }
        let raw = toml::to_string_pretty(self)?;
        fs::write(path, raw).map_err(io)
    }

    /// Replace every invalid value with its safe default, logging each change.
    pub fn sanitize(&mut self) {
        if self.max_blocks == -1 {
            tracing::warn!(
                "max-blocks is -1 (unlimited), applying safety cap of {}",
                UNLIMITED_MAX_BLOCKS
            );
            self.max_blocks = UNLIMITED_MAX_BLOCKS;
        } else if !(1..=UNLIMITED_MAX_BLOCKS).contains(&self.max_blocks) {
            tracing::warn!(
                "Invalid max-blocks ({}), using default {}",
                self.max_blocks, DEFAULT_MAX_BLOCKS
            );
            self.max_blocks = DEFAULT_MAX_BLOCKS;
        }
        if self.min_vein_size < 1 {
            tracing::warn!("Invalid min-vein-size ({}), using 2", self.min_vein_size);
            self.min_vein_size = 2;
        }
        if self.cooldown_ms < 0 {
            tracing::warn!(
                "Invalid cooldown-ms ({}), using {}",
                self.cooldown_ms, DEFAULT_COOLDOWN_MS
            );
            self.cooldown_ms = DEFAULT_COOLDOWN_MS;
        }
        if !(1..=100).contains(&self.batch_size) {
            tracing::warn!(
                "Invalid batch-size ({}), using {}",
                self.batch_size, DEFAULT_BATCH_SIZE
            );
            self.batch_size = DEFAULT_BATCH_SIZE;
        }

        let pickup = &mut self.auto_pickup;
        match FullInventoryAction::parse(&pickup.full_inventory_action) {
            Some(_) => pickup.full_inventory_action = pickup.full_inventory_action.to_ascii_lowercase(),
            None => {
                tracing::warn!(
                    "Invalid full-inventory-action '{}', using drop",
                    pickup.full_inventory_action
                );
                pickup.full_inventory_action = "drop".into();
            }
        }

        if self.auto_smelt.xp_multiplier < 0.0 || !self.auto_smelt.xp_multiplier.is_finite() {
            tracing::warn!("Invalid auto-smelt xp-multiplier, using 0.5");
            self.auto_smelt.xp_multiplier = 0.5;
        }

        if self.tool_durability.multiplier < 0.0 || !self.tool_durability.multiplier.is_finite() {
            tracing::warn!("Invalid durability multiplier, using 1.0");
            self.tool_durability.multiplier = 1.0;
        }

        if self.experience.bonus_per_blocks < 1 {
            tracing::warn!("Invalid bonus-per-blocks, using 10");
            self.experience.bonus_per_blocks = 10;
        }
        if self.experience.multiplier < 0.0 || !self.experience.multiplier.is_finite() {
            tracing::warn!("Invalid experience multiplier, using 0.05");
            self.experience.multiplier = 0.05;
        }

        if self.statistics.auto_save_interval < 0 {
            tracing::warn!("Invalid auto-save-interval, using 300");
            self.statistics.auto_save_interval = 300;
        }

        if ActivationMode::parse(&self.activation.mode).is_none() {
            tracing::warn!("Invalid activation mode '{}', using sneak", self.activation.mode);
            self.activation.mode = "sneak".into();
        }
        if self.activation.max_reach_distance < 1 {
            self.activation.max_reach_distance = 100;
        }

        let pattern = &mut self.mining_pattern;
        if pattern.pattern.parse::<MiningPattern>().is_err() {
            tracing::warn!("Invalid mining pattern '{}', using adjacent", pattern.pattern);
            pattern.pattern = MiningPattern::Adjacent.to_string();
        }
        if pattern.radius > i64::from(MAX_RADIUS) {
            tracing::warn!("Pattern radius too high, clamping to {}", MAX_RADIUS);
        }
        pattern.radius = pattern.radius.clamp(i64::from(MIN_RADIUS), i64::from(MAX_RADIUS));
        pattern.vertical_range = pattern
            .vertical_range
            .clamp(i64::from(MIN_RANGE), i64::from(MAX_RANGE));
        pattern.horizontal_range = pattern
            .horizontal_range
            .clamp(i64::from(MIN_RANGE), i64::from(MAX_RANGE));

        if self.limits.max_veins_per_day < 0 {
            tracing::warn!("Invalid max-veins-per-day, using 1000");
            self.limits.max_veins_per_day = 1000;
        }
        if self.limits.max_blocks_per_day < 0 {
            tracing::warn!("Invalid max-blocks-per-day, using 10000");
            self.limits.max_blocks_per_day = 10_000;
        }
        if self.anti_abuse.max_veins_per_minute < 0 {
            tracing::warn!("Invalid max-veins-per-minute, using 60");
            self.anti_abuse.max_veins_per_minute = 60;
        }
        if self.anti_abuse.temporary_block_duration < 1 {
            tracing::warn!("Invalid temporary-block-duration, using 5");
            self.anti_abuse.temporary_block_duration = 5;
        }

        let particles = &mut self.effects.particles;
        particles.count = particles.count.clamp(1, 20);
        if particles.radius < 0.0 || !particles.radius.is_finite() {
            particles.radius = 0.0;
        }
        let sounds = &mut self.effects.sounds;
        sounds.volume = if sounds.volume.is_finite() { sounds.volume.clamp(0.0, 1.0) } else { 1.0 };
        sounds.pitch = if sounds.pitch.is_finite() { sounds.pitch.clamp(0.5, 2.0) } else { 1.0 };

        self.blocks = self
            .blocks
            .drain(..)
            .map(|(k, v)| (k.to_ascii_uppercase(), v))
            .collect();
    }

    // ── Typed views (valid after `sanitize`) ────────────────────────────────

    pub fn max_vein_size(&self) -> usize {
        self.max_blocks.max(1) as usize
    }

    pub fn min_vein_size(&self) -> usize {
        self.min_vein_size.max(1) as usize
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size.clamp(1, 100) as usize
    }

    pub fn activation_mode(&self) -> ActivationMode {
        ActivationMode::parse(&self.activation.mode).unwrap_or(ActivationMode::Sneak)
    }

    pub fn full_inventory_action(&self) -> FullInventoryAction {
        FullInventoryAction::parse(&self.auto_pickup.full_inventory_action)
            .unwrap_or(FullInventoryAction::Drop)
    }

    pub fn is_world_disabled(&self, world: &str) -> bool {
        self.disabled_worlds.iter().any(|w| w == world)
    }

    pub fn pattern_spec(&self) -> PatternSpec {
        let pattern = &self.mining_pattern;
        PatternSpec {
            pattern: pattern.pattern.parse().unwrap_or_default(),
            radius: pattern.radius.max(0) as u32,
            vertical_range: pattern.vertical_range.max(0) as u32,
            horizontal_range: pattern.horizontal_range.max(0) as u32,
            include_diagonals: pattern.include_diagonals,
        }
        .clamped()
    }

    pub fn search_limits(&self, bounds: HeightBounds) -> SearchLimits {
        SearchLimits {
            max_size: self.max_vein_size(),
            max_reach: self.activation.max_reach_distance.clamp(1, i64::from(u32::MAX)) as u32,
            bounds,
        }
    }

    pub fn gate_limits(&self) -> GateLimits {
        GateLimits {
            cooldown_ms: self.cooldown_ms.max(0) as u64,
            max_per_minute: self.anti_abuse.max_veins_per_minute.clamp(0, i64::from(u32::MAX)) as u32,
            temporary_block_ms: self.anti_abuse.temporary_block_duration.max(1) as u64 * 60_000,
            daily_limits_enabled: self.limits.enable_limits,
            max_veins_per_day: self.limits.max_veins_per_day.clamp(0, i64::from(u32::MAX)) as u32,
            max_blocks_per_day: self.limits.max_blocks_per_day.max(0) as u64,
        }
    }

    pub fn smelt_policy(&self) -> SmeltPolicy {
        let smelt = &self.auto_smelt;
        SmeltPolicy {
            enabled: smelt.enabled,
            require_fortune: smelt.require_fortune,
            give_xp: smelt.give_xp,
            xp_multiplier: smelt.xp_multiplier,
            whitelist: smelt
                .whitelist
                .iter()
                .map(|id| id.trim())
                .filter(|id| !id.is_empty())
                .map(|id| {
                    let lower = id.to_ascii_lowercase();
                    lower.split_once(':').map_or(lower.clone(), |(_, path)| path.to_string())
                })
                .collect::<HashSet<_>>(),
        }
    }

    pub fn xp_policy(&self) -> XpPolicy {
        XpPolicy {
            enabled: self.experience.enabled,
            bonus_enabled: self.experience.bonus_enabled,
            bonus_per_blocks: self.experience.bonus_per_blocks.max(1) as u32,
            bonus_multiplier: self.experience.multiplier,
        }
    }

    pub fn durability_policy(&self) -> DurabilityPolicy {
        DurabilityPolicy {
            multiplier: self.tool_durability.multiplier,
            respect_unbreaking: self.tool_durability.respect_unbreaking,
            break_on_exceed: self.tool_durability.break_on_exceed,
        }
    }

    /// Log the effective settings, if config-load logging is on.
    pub fn log_summary(&self) {
        if !(self.logging.enabled && self.logging.log_config_loading) {
            return;
        }
        let on_off = |b: bool| if b { "enabled" } else { "disabled" };
        tracing::info!("[Config] Max vein size: {}", self.max_vein_size());
        tracing::info!("[Config] Auto-pickup: {}", on_off(self.auto_pickup.enabled));
        tracing::info!("[Config] Auto-smelt: {}", on_off(self.auto_smelt.enabled));
        tracing::info!("[Config] Full inventory action: {}", self.auto_pickup.full_inventory_action);
        tracing::info!("[Config] Disabled worlds: {}", self.disabled_worlds.len());
        tracing::info!(
            "[Config] Effects: {}",
            on_off(self.effects.particles.enabled || self.effects.sounds.enabled)
        );
        tracing::info!("[Config] Durability multiplier: {}x", self.tool_durability.multiplier);
        tracing::info!("[Config] Mining pattern: {}", self.mining_pattern.pattern);
    }
}

//! Per-player vein mining statistics and milestones, persisted as JSON.

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use veinmine_engine::gate::PlayerId;

use crate::config::StatisticsConfig;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PlayerStats {
    pub player_name: String,
    pub total_veins: u64,
    pub total_blocks: u64,
    pub largest_vein: u64,
    /// Milliseconds since the Unix epoch.
    pub last_mined: Option<u64>,
    pub milestones: BTreeSet<u64>,
}

impl PlayerStats {
    pub fn average_vein(&self) -> f64 {
        if self.total_veins == 0 {
            0.0
        } else {
            self.total_blocks as f64 / self.total_veins as f64
        }
    }

    /// Chat lines for the `stats` subcommand.
    pub fn summary_lines(&self, milestone_count: usize) -> Vec<String> {
        vec![
            "§6=== VeinMiner Statistics ===".to_string(),
            format!("§eTotal veins mined: §f{}", self.total_veins),
            format!("§eTotal blocks mined: §f{}", self.total_blocks),
            format!("§eLargest vein: §f{} blocks", self.largest_vein),
            format!("§eAverage vein size: §f{:.1}", self.average_vein()),
            format!("§eMilestones: §f{}/{}", self.milestones.len(), milestone_count),
        ]
    }
}

/// On-disk layout of the statistics file.
#[derive(Debug, Default, Serialize, Deserialize)]
struct StatsFile {
    #[serde(default)]
    players: IndexMap<PlayerId, PlayerStats>,
}

#[derive(Debug)]
pub struct StatsTracker {
    players: IndexMap<PlayerId, PlayerStats>,
    thresholds: Vec<u64>,
    enabled: bool,
    milestones_enabled: bool,
    path: Option<PathBuf>,
    dirty: bool,
}

impl StatsTracker {
    /// An empty tracker. Without a path, `save` is a no-op.
    pub fn new(config: &StatisticsConfig, path: Option<PathBuf>) -> Self {
        let mut tracker = Self {
            players: IndexMap::new(),
            thresholds: Vec::new(),
            enabled: true,
            milestones_enabled: true,
            path,
            dirty: false,
        };
        tracker.apply_config(config);
        tracker
    }

    /// Load a tracker from `path`. A missing file yields an empty tracker.
    pub fn load(config: &StatisticsConfig, path: &Path) -> Result<Self> {
        let mut tracker = Self::new(config, Some(path.to_path_buf()));
        if !path.exists() {
            return Ok(tracker);
        }
        let raw = fs::read_to_string(path)
            .with_context(|| format!("Failed to read statistics {}", path.display()))?;
        let file: StatsFile = serde_json::from_str(&raw)
            .with_context(|| format!("Failed to parse statistics {}", path.display()))?;
        tracker.players = file.players;
        tracing::info!(
            "Loaded statistics for {} players from {}",
            tracker.players.len(),
            path.display()
        );
        Ok(tracker)
    }

    pub fn apply_config(&mut self, config: &StatisticsConfig) {
        self.enabled = config.enabled;
        self.milestones_enabled = config.milestones.enabled;
        let mut thresholds: Vec<u64> = config
            .milestones
            .thresholds
            .iter()
            .copied()
            .filter(|&t| t > 0)
            .collect();
        thresholds.sort_unstable();
        thresholds.dedup();
        self.thresholds = thresholds;
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn thresholds(&self) -> &[u64] {
        &self.thresholds
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn get(&self, player: &PlayerId) -> Option<&PlayerStats> {
        self.players.get(player)
    }

    pub fn len(&self) -> usize {
        self.players.len()
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }

    /// Record a completed vein of `blocks` blocks.
    ///
    /// Returns the milestones crossed by this vein, in ascending order. Each
    /// milestone is reported at most once per player.
    pub fn record_vein_mine(&mut self, player: PlayerId, name: &str, blocks: u64, now: u64) -> Vec<u64> {
        if !self.enabled || blocks == 0 {
            return Vec::new();
        }
        let stats = self.players.entry(player).or_default();
        let previous = stats.total_blocks;
        stats.player_name = name.to_string();
        stats.total_veins += 1;
        stats.total_blocks += blocks;
        stats.largest_vein = stats.largest_vein.max(blocks);
        stats.last_mined = Some(now);
        self.dirty = true;

        if !self.milestones_enabled {
            return Vec::new();
        }
        let current = stats.total_blocks;
        let reached: Vec<u64> = self
            .thresholds
            .iter()
            .copied()
            .filter(|&t| previous < t && t <= current && !stats.milestones.contains(&t))
            .collect();
        stats.milestones.extend(reached.iter().copied());
        reached
    }

    /// Write the statistics file if anything changed since the last save.
    /// Returns whether a write happened.
    pub fn save(&mut self) -> Result<bool> {
        let Some(path) = self.path.as_deref() else {
            return Ok(false);
        };
        if !self.dirty {
            return Ok(false);
        }
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        let file = StatsFile {
            players: self.players.clone(),
        };
        let raw = serde_json::to_string_pretty(&file).context("Failed to serialize statistics")?;
        fs::write(path, raw)
            .with_context(|| format!("Failed to write statistics {}", path.display()))?;
        self.dirty = false;
        tracing::debug!("Saved statistics for {} players", self.players.len());
        Ok(true)
    }
}

impl Default for StatsTracker {
    fn default() -> Self {
        Self::new(&StatisticsConfig::default(), None)
    }
}

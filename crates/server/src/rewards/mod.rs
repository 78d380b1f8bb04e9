//! Per-block drops and experience.
//!
//! [`RewardEngine::compute`] is a pure function of the block, the tool and
//! the random source: the same seed always yields the same rewards.

pub mod tables;

use std::collections::HashSet;

use indexmap::IndexMap;
use rand::Rng;
use veinmine_engine::world::block::BlockType;

use crate::block::is_leaves;
use crate::item::{ItemId, ToolDescriptor, ToolTraits};

/// Items and experience produced by breaking blocks.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Rewards {
    pub drops: IndexMap<ItemId, u32>,
    pub xp: f64,
}

impl Rewards {
    fn single(item: ItemId, count: u32) -> Self {
        let mut drops = IndexMap::new();
        drops.insert(item, count);
        Self { drops, xp: 0.0 }
    }

    pub fn add_item(&mut self, item: ItemId, count: u32) {
        if count > 0 {
            *self.drops.entry(item).or_default() += count;
        }
    }

    /// Fold another block's rewards into this aggregate.
    pub fn merge(&mut self, other: Rewards) {
        for (item, count) in other.drops {
            self.add_item(item, count);
        }
        self.xp += other.xp;
    }

    pub fn item_count(&self) -> u32 {
        self.drops.values().sum()
    }

    pub fn is_empty(&self) -> bool {
        self.drops.is_empty() && self.xp <= 0.0
    }
}

/// Auto-smelt settings.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SmeltPolicy {
    pub enabled: bool,
    pub require_fortune: bool,
    pub give_xp: bool,
    pub xp_multiplier: f64,
    /// Block paths allowed to smelt. Empty allows every smeltable block.
    pub whitelist: HashSet<String>,
}

/// Vein-wide experience bonus.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct XpPolicy {
    pub enabled: bool,
    pub bonus_enabled: bool,
    pub bonus_per_blocks: u32,
    pub bonus_multiplier: f64,
}

impl Default for XpPolicy {
    fn default() -> Self {
        Self {
            enabled: true,
            bonus_enabled: true,
            bonus_per_blocks: 10,
            bonus_multiplier: 0.05,
        }
    }
}

/// Experience actually granted for a whole vein.
///
/// `round(total * (1 + breaks / per_blocks * multiplier))`, never negative.
/// Nothing is granted when experience is off, nothing broke, or the
/// accumulated total is not positive.
pub fn final_xp(total_xp: f64, successful_breaks: usize, policy: &XpPolicy) -> u32 {
    if !policy.enabled || successful_breaks == 0 || total_xp <= 0.0 {
        return 0;
    }
    let mut xp = total_xp;
    if policy.bonus_enabled && policy.bonus_per_blocks > 0 {
        let factor = 1.0
            + (successful_breaks as f64 / f64::from(policy.bonus_per_blocks))
                * policy.bonus_multiplier;
        xp *= factor.max(0.0);
    }
    xp.round().max(0.0) as u32
}

#[derive(Debug, Clone, Default)]
pub struct RewardEngine {
    smelt: SmeltPolicy,
}

impl RewardEngine {
    pub fn new(smelt: SmeltPolicy) -> Self {
        Self { smelt }
    }

    pub fn smelt_policy(&self) -> &SmeltPolicy {
        &self.smelt
    }

    /// Drops and experience for breaking one `block` with `tool`.
    pub fn compute<R: Rng + ?Sized>(
        &self,
        block: &BlockType,
        tool: Option<&ToolDescriptor>,
        rng: &mut R,
    ) -> Rewards {
        let path = block.path();
        let silk_touch = tool.map_or(0, ToolDescriptor::silk_touch);
        let fortune = tool.map_or(0, ToolDescriptor::fortune);
        let item = |path: &str| ItemId::new(&format!("{}:{}", block.namespace(), path));

        if is_leaves(block) {
            let shears = tool.is_some_and(|t| t.traits().contains(ToolTraits::SHEARS));
            if shears || silk_touch > 0 {
                return Rewards::single(ItemId::from(block), 1);
            }
            return leaf_rewards(path, &item, rng);
        }

        if silk_touch > 0 {
            return Rewards::single(item(tables::silk_touch_drop(path)), 1);
        }

        let smelted = self.should_smelt(path, fortune);
        let drop = match (smelted, tables::smelt_output(path), tables::raw_drop(path)) {
            (true, Some(output), _) => item(output),
            (_, _, Some(raw)) => item(raw),
            _ => ItemId::from(block),
        };
        let count = drop_count(path, fortune, rng);

        let mut xp = f64::from(tables::ore_xp(path));
        if smelted && self.smelt.give_xp {
            xp += tables::smelt_xp(path) * self.smelt.xp_multiplier * f64::from(count);
        }

        let mut rewards = Rewards::single(drop, count);
        rewards.xp = xp;
        rewards
    }

    fn should_smelt(&self, path: &str, fortune: u32) -> bool {
        self.smelt.enabled
            && !(self.smelt.require_fortune && fortune == 0)
            && tables::smelt_output(path).is_some()
            && (self.smelt.whitelist.is_empty() || self.smelt.whitelist.contains(path))
    }
}

/// Base count times a fortune multiplier of `max(0, U{-1..=fortune}) + 1`.
fn drop_count<R: Rng + ?Sized>(path: &str, fortune: u32, rng: &mut R) -> u32 {
    let (low, high) = tables::base_count(path);
    let base = if low == high { low } else { rng.gen_range(low..=high) };
    if fortune == 0 || !tables::fortune_applies(path) {
        return base.max(1);
    }
    let top = i32::try_from(fortune).unwrap_or(i32::MAX);
    let bonus = rng.gen_range(-1..=top).max(0) as u32;
    base.saturating_mul(bonus.saturating_add(1)).max(1)
}

fn leaf_rewards<R: Rng + ?Sized>(
    path: &str,
    item: &impl Fn(&str) -> ItemId,
    rng: &mut R,
) -> Rewards {
    let mut rewards = Rewards::default();
    if let Some((sapling, chance)) = tables::sapling(path) {
        if rng.gen_bool(chance) {
            rewards.add_item(item(sapling), 1);
        }
    }
    if rng.gen_bool(tables::STICK_CHANCE) {
        rewards.add_item(item("stick"), rng.gen_range(1..=2));
    }
    rewards
}

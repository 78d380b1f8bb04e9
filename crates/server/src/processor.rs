//! Applies a discovered vein to the world.
//!
//! Blocks are broken in discovery order, a batch at a time. A block that
//! cannot be cleared is counted as a failure and yields nothing; the rest of
//! the vein is still processed. Items, experience and tool wear are settled
//! once, after the last batch.

use rand::Rng;
use veinmine_engine::search::Vein;

use crate::config::{FullInventoryAction, VeinMinerConfig};
use crate::durability::{DurabilityOutcome, DurabilityPolicy, apply_durability};
use crate::effects::EffectPlayer;
use crate::host::{Host, Location, PlayerContext};
use crate::item::{ItemStack, ToolDescriptor};
use crate::messages::{MessageKey, Messages};
use crate::rewards::{RewardEngine, Rewards, XpPolicy, final_xp};

/// Processing options resolved from config.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProcessSettings {
    pub batch_size: usize,
    pub auto_pickup: bool,
    pub full_inventory_action: FullInventoryAction,
    pub xp: XpPolicy,
    pub durability: DurabilityPolicy,
}

impl ProcessSettings {
    pub fn from_config(config: &VeinMinerConfig) -> Self {
        Self {
            batch_size: config.batch_size(),
            auto_pickup: config.auto_pickup.enabled,
            full_inventory_action: config.full_inventory_action(),
            xp: config.xp_policy(),
            durability: config.durability_policy(),
        }
    }
}

impl Default for ProcessSettings {
    fn default() -> Self {
        Self::from_config(&VeinMinerConfig::default())
    }
}

/// What happened while processing one vein.
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessReport {
    pub successful: usize,
    pub failed: usize,
    pub xp_granted: u32,
    /// Auto-pickup items that did not fit in the inventory.
    pub overflow: u32,
    pub durability: DurabilityOutcome,
}

pub struct BatchProcessor<'a> {
    pub rewards: &'a RewardEngine,
    pub effects: &'a EffectPlayer,
    pub messages: &'a Messages,
    pub settings: ProcessSettings,
}

impl BatchProcessor<'_> {
    pub fn process<R: Rng + ?Sized>(
        &self,
        host: &mut Host<'_>,
        player: &PlayerContext,
        vein: &Vein,
        tool: Option<ToolDescriptor>,
        rng: &mut R,
    ) -> ProcessReport {
        let mut collected = Rewards::default();
        let mut successful = 0;
        let mut failed = 0;

        for (index, batch) in vein.positions().chunks(self.settings.batch_size.max(1)).enumerate() {
            for &pos in batch {
                let rewards = self.rewards.compute(vein.block(), tool.as_ref(), rng);
                if let Err(e) = host.world.clear_block(pos) {
                    tracing::debug!("Failed to break ({}, {}, {}): {}", pos.x, pos.y, pos.z, e);
                    failed += 1;
                    continue;
                }
                successful += 1;

                if self.settings.auto_pickup {
                    collected.merge(rewards);
                } else {
                    collected.xp += rewards.xp;
                    for (item, count) in &rewards.drops {
                        for stack in ItemStack::split(item, *count) {
                            host.inventory.drop_items(pos, stack);
                        }
                    }
                }

                self.effects
                    .block_broken(&mut *host.effects, player.id, Location::center_of(pos), rng);
            }
            tracing::trace!("Processed batch {} ({} blocks)", index + 1, batch.len());
        }

        let overflow = if self.settings.auto_pickup {
            self.deliver(host, player, &collected)
        } else {
            0
        };

        let xp_granted = final_xp(collected.xp, successful, &self.settings.xp);
        if xp_granted > 0 {
            host.inventory.give_experience(player.id, xp_granted);
        }

        let durability = match tool {
            Some(tool) => self.wear_tool(host, player, tool, successful, rng),
            None => DurabilityOutcome::Unchanged,
        };

        self.effects
            .vein_completed(&mut *host.effects, player.id, player.location, rng);

        ProcessReport {
            successful,
            failed,
            xp_granted,
            overflow,
            durability,
        }
    }

    /// Put collected items in the inventory. Returns the overflow count.
    fn deliver(&self, host: &mut Host<'_>, player: &PlayerContext, collected: &Rewards) -> u32 {
        let mut overflow = 0;
        for (item, count) in &collected.drops {
            for stack in ItemStack::split(item, *count) {
                for rest in host.inventory.add_items(player.id, stack) {
                    overflow += rest.count;
                    if self.settings.full_inventory_action == FullInventoryAction::Drop {
                        host.inventory.drop_items(player.location.block(), rest);
                    }
                }
            }
        }
        if overflow > 0 {
            let action = self.settings.full_inventory_action.verb();
            let text = self
                .messages
                .render(MessageKey::InventoryFull, &[("count", &overflow), ("action", &action)]);
            host.messenger.send_message(player.id, &text);
        }
        overflow
    }

    fn wear_tool<R: Rng + ?Sized>(
        &self,
        host: &mut Host<'_>,
        player: &PlayerContext,
        mut tool: ToolDescriptor,
        successful: usize,
        rng: &mut R,
    ) -> DurabilityOutcome {
        let outcome = apply_durability(&mut tool, successful, &self.settings.durability, rng);
        match outcome {
            DurabilityOutcome::Unchanged => {}
            DurabilityOutcome::Broken => {
                host.inventory.set_main_hand(player.id, None);
                tracing::info!("{}'s tool broke after mining {} blocks", player.name, successful);
            }
            DurabilityOutcome::Damaged { .. } | DurabilityOutcome::Clamped { .. } => {
                host.inventory.set_main_hand(player.id, Some(tool));
            }
        }
        outcome
    }
}

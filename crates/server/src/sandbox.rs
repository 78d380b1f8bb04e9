//! In-process stand-ins for the game host: a generated world, inventories,
//! permissions, and recorders for effects and chat.
//!
//! The binary drives the miner through a [`Sandbox`], and the integration
//! tests use the same pieces to script scenarios.

use std::collections::hash_map::DefaultHasher;
use std::collections::{HashMap, HashSet};
use std::hash::{Hash, Hasher};

use indexmap::IndexMap;
use rand::Rng;
use uuid::Uuid;
use veinmine_engine::gate::PlayerId;
use veinmine_engine::world::block::BlockType;
use veinmine_engine::world::position::BlockPos;
use veinmine_engine::world::{BlockAccess, World};

use crate::host::{Effects, Host, Location, Messenger, PlayerContext, PlayerInventory, Permissions};
use crate::item::{ItemId, ItemStack, MAX_STACK_SIZE, ToolDescriptor};
use crate::miner::{BreakOutcome, VeinMiner};

pub const INVENTORY_SLOTS: usize = 36;

/// Ores scattered by [`Sandbox::generate`], with their vein size ranges.
const GENERATED_ORES: &[(&str, usize, usize)] = &[
    ("coal_ore", 6, 16),
    ("iron_ore", 4, 10),
    ("copper_ore", 5, 12),
    ("gold_ore", 3, 8),
    ("redstone_ore", 4, 9),
    ("lapis_ore", 3, 7),
    ("diamond_ore", 2, 6),
];

const GENERATED_TREES: &[(&str, &str)] = &[
    ("oak_log", "oak_leaves"),
    ("birch_log", "birch_leaves"),
    ("spruce_log", "spruce_leaves"),
];

/// Stable identity for an offline player name.
pub fn offline_player_id(name: &str) -> PlayerId {
    let mut hasher = DefaultHasher::new();
    "OfflinePlayer:".hash(&mut hasher);
    name.hash(&mut hasher);
    let high = hasher.finish();
    high.hash(&mut hasher);
    Uuid::from_u64_pair(high, hasher.finish())
}

// ── Inventory ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default)]
pub struct Backpack {
    pub slots: Vec<ItemStack>,
    pub main_hand: Option<ToolDescriptor>,
    pub experience: u64,
}

impl Backpack {
    pub fn count(&self, item: &ItemId) -> u32 {
        self.slots
            .iter()
            .filter(|s| &s.item == item)
            .map(|s| s.count)
            .sum()
    }
}

#[derive(Debug, Clone)]
pub struct SandboxInventory {
    players: HashMap<PlayerId, Backpack>,
    /// Item entities spawned in the world, in spawn order.
    pub dropped: Vec<(BlockPos, ItemStack)>,
    slot_limit: usize,
}

impl SandboxInventory {
    pub fn new() -> Self {
        Self::with_slots(INVENTORY_SLOTS)
    }

    pub fn with_slots(slot_limit: usize) -> Self {
        Self {
            players: HashMap::new(),
            dropped: Vec::new(),
            slot_limit,
        }
    }

    pub fn backpack(&self, player: &PlayerId) -> Option<&Backpack> {
        self.players.get(player)
    }

    pub fn backpack_mut(&mut self, player: PlayerId) -> &mut Backpack {
        self.players.entry(player).or_default()
    }

    pub fn count(&self, player: &PlayerId, item: &ItemId) -> u32 {
        self.players.get(player).map_or(0, |b| b.count(item))
    }

    pub fn experience(&self, player: &PlayerId) -> u64 {
        self.players.get(player).map_or(0, |b| b.experience)
    }

    pub fn dropped_count(&self, item: &ItemId) -> u32 {
        self.dropped
            .iter()
            .filter(|(_, s)| &s.item == item)
            .map(|(_, s)| s.count)
            .sum()
    }
}

impl Default for SandboxInventory {
    fn default() -> Self {
        Self::new()
    }
}

impl PlayerInventory for SandboxInventory {
    fn tool_in_main_hand(&self, player: PlayerId) -> Option<ToolDescriptor> {
        self.players.get(&player).and_then(|b| b.main_hand.clone())
    }

    fn set_main_hand(&mut self, player: PlayerId, tool: Option<ToolDescriptor>) {
        self.backpack_mut(player).main_hand = tool;
    }

    fn add_items(&mut self, player: PlayerId, stack: ItemStack) -> Vec<ItemStack> {
        let limit = self.slot_limit;
        let backpack = self.backpack_mut(player);
        let mut remaining = stack.count;

        for slot in backpack.slots.iter_mut().filter(|s| s.item == stack.item) {
            let room = MAX_STACK_SIZE.saturating_sub(slot.count).min(remaining);
            slot.count += room;
            remaining -= room;
        }
        while remaining > 0 && backpack.slots.len() < limit {
            let n = remaining.min(MAX_STACK_SIZE);
            backpack.slots.push(ItemStack::new(stack.item.clone(), n));
            remaining -= n;
        }

        if remaining == 0 {
            Vec::new()
        } else {
            vec![ItemStack::new(stack.item, remaining)]
        }
    }

    fn drop_items(&mut self, at: BlockPos, stack: ItemStack) {
        self.dropped.push((at, stack));
    }

    fn give_experience(&mut self, player: PlayerId, amount: u32) {
        self.backpack_mut(player).experience += u64::from(amount);
    }
}

// ── Permissions ─────────────────────────────────────────────────────────────

/// Grants everything except explicitly denied nodes.
#[derive(Debug, Clone, Default)]
pub struct SandboxPermissions {
    denied: HashSet<(PlayerId, String)>,
}

impl SandboxPermissions {
    pub fn deny(&mut self, player: PlayerId, node: &str) {
        self.denied.insert((player, node.to_string()));
    }

    pub fn grant(&mut self, player: PlayerId, node: &str) {
        self.denied.remove(&(player, node.to_string()));
    }
}

impl Permissions for SandboxPermissions {
    fn has_permission(&self, player: PlayerId, node: &str) -> bool {
        !self.denied.contains(&(player, node.to_string()))
    }
}

// ── Recorders ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default)]
pub struct RecordingEffects {
    pub sounds: Vec<(PlayerId, String)>,
    pub particles: usize,
}

impl Effects for RecordingEffects {
    fn play_sound(&mut self, player: PlayerId, _at: Location, sound: &str, _volume: f32, _pitch: f32) {
        self.sounds.push((player, sound.to_string()));
    }

    fn spawn_particle(&mut self, _player: PlayerId, _particle: &str, _at: Location) {
        self.particles += 1;
    }
}

/// Everything sent to players, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Chat {
    Message(PlayerId, String),
    Tip(PlayerId, String),
    Broadcast(String),
}

#[derive(Debug, Clone, Default)]
pub struct RecordingMessenger {
    pub log: Vec<Chat>,
}

impl RecordingMessenger {
    pub fn messages_to(&self, player: &PlayerId) -> Vec<&str> {
        self.log
            .iter()
            .filter_map(|c| match c {
                Chat::Message(p, text) if p == player => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }

    pub fn drain(&mut self) -> Vec<Chat> {
        std::mem::take(&mut self.log)
    }
}

impl Messenger for RecordingMessenger {
    fn send_message(&mut self, player: PlayerId, text: &str) {
        self.log.push(Chat::Message(player, text.to_string()));
    }

    fn send_tip(&mut self, player: PlayerId, text: &str) {
        self.log.push(Chat::Tip(player, text.to_string()));
    }

    fn broadcast(&mut self, text: &str) {
        self.log.push(Chat::Broadcast(text.to_string()));
    }
}

// ── Sandbox ─────────────────────────────────────────────────────────────────

/// A generated feature worth breaking.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Landmark {
    pub block: BlockType,
    pub pos: BlockPos,
    pub size: usize,
}

#[derive(Default)]
pub struct Sandbox {
    pub world: World,
    pub inventory: SandboxInventory,
    pub permissions: SandboxPermissions,
    pub effects: RecordingEffects,
    pub messenger: RecordingMessenger,
    pub landmarks: Vec<Landmark>,
    players: IndexMap<String, PlayerContext>,
}

impl Sandbox {
    pub fn new() -> Self {
        Self::default()
    }

    /// Borrow the collaborators as a [`Host`].
    pub fn host(&mut self) -> Host<'_> {
        Host {
            world: &self.world,
            inventory: &mut self.inventory,
            permissions: &self.permissions,
            effects: &mut self.effects,
            messenger: &mut self.messenger,
        }
    }

    /// Add a player standing at the origin of `world`, or return the
    /// existing one.
    pub fn join(&mut self, name: &str) -> PlayerContext {
        self.players
            .entry(name.to_string())
            .or_insert_with(|| PlayerContext {
                id: offline_player_id(name),
                name: name.to_string(),
                world: "world".to_string(),
                sneaking: false,
                location: Location::new(0.5, 1.0, 0.5),
            })
            .clone()
    }

    pub fn player(&self, name: &str) -> Option<&PlayerContext> {
        self.players.get(name)
    }

    pub fn player_mut(&mut self, name: &str) -> Option<&mut PlayerContext> {
        self.players.get_mut(name)
    }

    pub fn players(&self) -> impl Iterator<Item = &PlayerContext> {
        self.players.values()
    }

    pub fn give_tool(&mut self, player: PlayerId, tool: ToolDescriptor) {
        self.inventory.set_main_hand(player, Some(tool));
    }

    /// Break `pos` as `player`. Anything the miner does not handle is broken
    /// the vanilla way: the block is removed and drops itself.
    pub fn break_block(&mut self, miner: &mut VeinMiner, player: &PlayerContext, pos: BlockPos) -> BreakOutcome {
        let block = self.world.get_block(pos);
        let outcome = {
            let mut host = self.host();
            miner.on_block_break(&mut host, player, pos, &block)
        };
        if !outcome.handled() && !block.is_air() {
            match self.world.clear_block(pos) {
                Ok(()) => self.inventory.drop_items(pos, ItemStack::new(ItemId::from(&block), 1)),
                Err(e) => tracing::debug!("Vanilla break at ({}, {}, {}) failed: {}", pos.x, pos.y, pos.z, e),
            }
        }
        outcome
    }

    /// Fill a square of `radius` blocks around the origin with a stone floor
    /// (y -16..=0), ore veins inside it and trees on top. The radius is at
    /// least 8.
    pub fn generate<R: Rng + ?Sized>(&mut self, radius: i64, veins: usize, trees: usize, rng: &mut R) {
        let radius = radius.max(8);
        let stone = BlockType::new("stone");
        let grass = BlockType::new("grass_block");
        for x in -radius..radius {
            for z in -radius..radius {
                for y in -16..0 {
                    self.place(BlockPos::new(x, y, z), &stone);
                }
                self.place(BlockPos::new(x, 0, z), &grass);
            }
        }

        for _ in 0..veins {
            let (ore, min, max) = GENERATED_ORES[rng.gen_range(0..GENERATED_ORES.len())];
            let start = BlockPos::new(
                rng.gen_range(-radius + 2..radius - 2),
                rng.gen_range(-14..-2),
                rng.gen_range(-radius + 2..radius - 2),
            );
            let target = rng.gen_range(min..=max);
            self.grow_vein(BlockType::new(ore), start, target, rng);
        }

        for _ in 0..trees {
            let (log, leaves) = GENERATED_TREES[rng.gen_range(0..GENERATED_TREES.len())];
            let base = BlockPos::new(
                rng.gen_range(-radius + 3..radius - 3),
                1,
                rng.gen_range(-radius + 3..radius - 3),
            );
            let height = rng.gen_range(4..=6);
            self.plant_tree(BlockType::new(log), BlockType::new(leaves), base, height);
        }

        tracing::info!(
            "Generated sandbox world: {} chunks, {} landmarks",
            self.world.chunk_count(),
            self.landmarks.len()
        );
    }

    fn place(&self, pos: BlockPos, block: &BlockType) {
        if let Err(e) = self.world.set_block(pos, block) {
            tracing::debug!("Skipping generated block at ({}, {}, {}): {}", pos.x, pos.y, pos.z, e);
        }
    }

    /// Random walk from `start`, turning stone into `ore`.
    fn grow_vein<R: Rng + ?Sized>(&mut self, ore: BlockType, start: BlockPos, target: usize, rng: &mut R) {
        let stone = BlockType::new("stone");
        let mut placed = 0;
        let mut pos = start;
        for _ in 0..target * 4 {
            if placed == target {
                break;
            }
            if self.world.get_block(pos) == stone {
                self.place(pos, &ore);
                placed += 1;
            }
            let (dx, dy, dz) = match rng.gen_range(0..6) {
                0 => (1, 0, 0),
                1 => (-1, 0, 0),
                2 => (0, 1, 0),
                3 => (0, -1, 0),
                4 => (0, 0, 1),
                _ => (0, 0, -1),
            };
            let next = BlockPos::new(pos.x + dx, (pos.y + dy).clamp(-15, -1), pos.z + dz);
            if self.world.get_block(next) == stone || self.world.get_block(next) == ore {
                pos = next;
            }
        }
        if placed > 0 {
            self.landmarks.push(Landmark { block: ore, pos: start, size: placed });
        }
    }

    fn plant_tree(&mut self, log: BlockType, leaves: BlockType, base: BlockPos, height: i64) {
        let top = base.y + height - 1;
        for y in base.y..=top {
            self.place(BlockPos::new(base.x, y, base.z), &log);
        }
        for dx in -2i64..=2 {
            for dz in -2i64..=2 {
                for dy in -1i64..=1 {
                    let pos = BlockPos::new(base.x + dx, top + dy, base.z + dz);
                    let corner = dx.abs() == 2 && dz.abs() == 2;
                    if corner || (dy == 1 && (dx.abs() == 2 || dz.abs() == 2)) {
                        continue;
                    }
                    if self.world.get_block(pos).is_air() {
                        self.place(pos, &leaves);
                    }
                }
            }
        }
        self.place(BlockPos::new(base.x, top + 2, base.z), &leaves);
        self.landmarks.push(Landmark {
            block: log,
            pos: base,
            size: height as usize,
        });
    }
}

//! Interfaces to the game host: inventories, permissions, effects and chat.
//!
//! The miner never talks to a concrete server; it is handed a [`Host`] that
//! borrows one implementation of each collaborator for the duration of a call.

use veinmine_engine::gate::PlayerId;
use veinmine_engine::world::BlockAccess;
use veinmine_engine::world::position::BlockPos;

use crate::item::{ItemStack, ToolDescriptor};

/// A point in world space.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Location {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Location {
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// The block containing this point.
    pub fn block(&self) -> BlockPos {
        BlockPos::new(self.x.floor() as i64, self.y.floor() as i64, self.z.floor() as i64)
    }

    /// Center of a block.
    pub fn center_of(pos: BlockPos) -> Self {
        Self::new(pos.x as f64 + 0.5, pos.y as f64 + 0.5, pos.z as f64 + 0.5)
    }
}

/// What the host knows about the player who broke a block.
#[derive(Debug, Clone, PartialEq)]
pub struct PlayerContext {
    pub id: PlayerId,
    pub name: String,
    pub world: String,
    pub sneaking: bool,
    pub location: Location,
}

pub trait PlayerInventory {
    fn tool_in_main_hand(&self, player: PlayerId) -> Option<ToolDescriptor>;

    /// Replace the main-hand item. `None` empties the hand.
    fn set_main_hand(&mut self, player: PlayerId, tool: Option<ToolDescriptor>);

    /// Insert a stack, returning whatever did not fit.
    fn add_items(&mut self, player: PlayerId, stack: ItemStack) -> Vec<ItemStack>;

    /// Spawn an item entity in the world.
    fn drop_items(&mut self, at: BlockPos, stack: ItemStack);

    fn give_experience(&mut self, player: PlayerId, amount: u32);
}

pub trait Permissions {
    fn has_permission(&self, player: PlayerId, node: &str) -> bool;
}

pub trait Effects {
    fn play_sound(&mut self, player: PlayerId, at: Location, sound: &str, volume: f32, pitch: f32);

    fn spawn_particle(&mut self, player: PlayerId, particle: &str, at: Location);
}

pub trait Messenger {
    fn send_message(&mut self, player: PlayerId, text: &str);

    /// Short text shown above the hotbar.
    fn send_tip(&mut self, player: PlayerId, text: &str);

    /// Message every online player.
    fn broadcast(&mut self, text: &str);
}

/// Borrowed collaborators for one call into the miner.
pub struct Host<'a> {
    pub world: &'a dyn BlockAccess,
    pub inventory: &'a mut dyn PlayerInventory,
    pub permissions: &'a dyn Permissions,
    pub effects: &'a mut dyn Effects,
    pub messenger: &'a mut dyn Messenger,
}

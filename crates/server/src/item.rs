//! Items, stacks and the tool held in a player's main hand.

use std::fmt;
use std::sync::Arc;

use bitflags::bitflags;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use veinmine_engine::world::block::{BlockType, normalize_id};

/// Largest stack an inventory slot or a dropped entity can hold.
pub const MAX_STACK_SIZE: u32 = 64;

/// A namespaced item identifier such as `minecraft:raw_iron`.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ItemId(Arc<str>);

impl ItemId {
    pub fn new(raw: &str) -> Self {
        Self(normalize_id(raw).into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The identifier without its namespace.
    pub fn path(&self) -> &str {
        self.0.split_once(':').map_or(&self.0, |(_, path)| path)
    }
}

impl fmt::Debug for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ItemId({})", self.0)
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ItemId {
    fn from(raw: &str) -> Self {
        Self::new(raw)
    }
}

/// Blocks drop as the item of the same name.
impl From<&BlockType> for ItemId {
    fn from(block: &BlockType) -> Self {
        Self(block.as_str().into())
    }
}

impl Serialize for ItemId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for ItemId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(Self::new(&raw))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemStack {
    pub item: ItemId,
    pub count: u32,
}

impl ItemStack {
    pub fn new(item: ItemId, count: u32) -> Self {
        Self { item, count }
    }

    /// Split `count` items into stacks of at most [`MAX_STACK_SIZE`].
    pub fn split(item: &ItemId, count: u32) -> impl Iterator<Item = ItemStack> + '_ {
        let full = count / MAX_STACK_SIZE;
        let rest = count % MAX_STACK_SIZE;
        (0..full)
            .map(|_| MAX_STACK_SIZE)
            .chain((rest > 0).then_some(rest))
            .map(move |n| ItemStack::new(item.clone(), n))
    }
}

bitflags! {
    /// Tool classes an item belongs to, derived from its identifier.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ToolTraits: u8 {
        const PICKAXE = 1 << 0;
        const AXE     = 1 << 1;
        const SHOVEL  = 1 << 2;
        const HOE     = 1 << 3;
        const SWORD   = 1 << 4;
        const SHEARS  = 1 << 5;
    }
}

impl ToolTraits {
    pub fn of(item: &ItemId) -> Self {
        let path = item.path();
        let mut traits = Self::empty();
        if path.ends_with("_pickaxe") {
            traits |= Self::PICKAXE;
        }
        if path.ends_with("_axe") {
            traits |= Self::AXE;
        }
        if path.ends_with("_shovel") {
            traits |= Self::SHOVEL;
        }
        if path.ends_with("_hoe") {
            traits |= Self::HOE;
        }
        if path.ends_with("_sword") {
            traits |= Self::SWORD;
        }
        if path == "shears" {
            traits |= Self::SHEARS;
        }
        traits
    }
}

/// Enchantment levels relevant to vein mining. Zero means absent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Enchantments {
    pub fortune: u32,
    pub silk_touch: u32,
    pub unbreaking: u32,
}

/// The item in a player's main hand, with its wear state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolDescriptor {
    pub item: ItemId,
    pub enchantments: Enchantments,
    pub damage: u32,
    /// `None` for items that never wear out.
    pub max_durability: Option<u32>,
    pub unbreakable: bool,
}

impl ToolDescriptor {
    /// A fresh tool with the vanilla durability for its material.
    pub fn new(item: impl Into<ItemId>) -> Self {
        let item = item.into();
        let max_durability = vanilla_durability(&item);
        Self {
            item,
            enchantments: Enchantments::default(),
            damage: 0,
            max_durability,
            unbreakable: false,
        }
    }

    pub fn with_enchantments(mut self, enchantments: Enchantments) -> Self {
        self.enchantments = enchantments;
        self
    }

    pub fn traits(&self) -> ToolTraits {
        ToolTraits::of(&self.item)
    }

    pub fn fortune(&self) -> u32 {
        self.enchantments.fortune
    }

    pub fn silk_touch(&self) -> u32 {
        self.enchantments.silk_touch
    }

    pub fn unbreaking(&self) -> u32 {
        self.enchantments.unbreaking
    }
}

fn vanilla_durability(item: &ItemId) -> Option<u32> {
    let path = item.path();
    if path == "shears" {
        return Some(238);
    }
    if ToolTraits::of(item).is_empty() {
        return None;
    }
    let material = path.split('_').next().unwrap_or_default();
    match material {
        "wooden" => Some(59),
        "stone" => Some(131),
        "iron" => Some(250),
        "golden" => Some(32),
        "diamond" => Some(1561),
        "netherite" => Some(2031),
        _ => None,
    }
}

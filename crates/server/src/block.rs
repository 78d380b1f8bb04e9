//! Which blocks can be vein mined, and with what tool.

use std::collections::HashSet;

use indexmap::IndexMap;
use veinmine_engine::cache::BoundedCache;
use veinmine_engine::world::block::BlockType;

use crate::config::EnabledBlocks;
use crate::item::{ItemId, ToolDescriptor, ToolTraits};

/// Capacity of the tool-validity memo table.
pub const TOOL_CACHE_CAPACITY: usize = 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlockCategory {
    Ore,
    Log,
    Leaves,
}

/// One configurable catalog entry: the `[blocks]` key that toggles it, the
/// block ids it covers and an optional legacy key consulted afterwards.
struct CatalogEntry {
    key: &'static str,
    legacy: Option<&'static str>,
    category: BlockCategory,
    ids: &'static [&'static str],
}

const fn ore(key: &'static str, ids: &'static [&'static str]) -> CatalogEntry {
    CatalogEntry {
        key,
        legacy: None,
        category: BlockCategory::Ore,
        ids,
    }
}

const fn log(key: &'static str, legacy: &'static str, id: &'static [&'static str]) -> CatalogEntry {
    CatalogEntry {
        key,
        legacy: Some(legacy),
        category: BlockCategory::Log,
        ids: id,
    }
}

const fn leaves(key: &'static str, legacy: &'static str, id: &'static [&'static str]) -> CatalogEntry {
    CatalogEntry {
        key,
        legacy: Some(legacy),
        category: BlockCategory::Leaves,
        ids: id,
    }
}

const CATALOG: &[CatalogEntry] = &[
    // ── Ores ────────────────────────────────────────────────────────────
    ore("COAL_ORE", &["coal_ore"]),
    ore("IRON_ORE", &["iron_ore"]),
    ore("GOLD_ORE", &["gold_ore"]),
    ore("DIAMOND_ORE", &["diamond_ore"]),
    ore("EMERALD_ORE", &["emerald_ore"]),
    ore("LAPIS_ORE", &["lapis_ore"]),
    ore("COPPER_ORE", &["copper_ore"]),
    ore("DEEPSLATE_COAL_ORE", &["deepslate_coal_ore"]),
    ore("DEEPSLATE_IRON_ORE", &["deepslate_iron_ore"]),
    ore("DEEPSLATE_GOLD_ORE", &["deepslate_gold_ore"]),
    ore("DEEPSLATE_DIAMOND_ORE", &["deepslate_diamond_ore"]),
    ore("DEEPSLATE_EMERALD_ORE", &["deepslate_emerald_ore"]),
    ore("DEEPSLATE_LAPIS_ORE", &["deepslate_lapis_ore"]),
    ore("DEEPSLATE_COPPER_ORE", &["deepslate_copper_ore"]),
    ore("QUARTZ_ORE", &["quartz_ore", "nether_quartz_ore"]),
    ore("NETHER_GOLD_ORE", &["nether_gold_ore"]),
    ore("REDSTONE_ORE", &["redstone_ore", "lit_redstone_ore"]),
    ore(
        "DEEPSLATE_REDSTONE_ORE",
        &["deepslate_redstone_ore", "lit_deepslate_redstone_ore"],
    ),
    ore("ANCIENT_DEBRIS", &["ancient_debris"]),
    ore(
        "AMETHYST_CLUSTER",
        &[
            "amethyst_cluster",
            "large_amethyst_bud",
            "medium_amethyst_bud",
            "small_amethyst_bud",
        ],
    ),
    // ── Logs ────────────────────────────────────────────────────────────
    log("OAK_LOG", "LOG", &["oak_log"]),
    log("SPRUCE_LOG", "LOG", &["spruce_log"]),
    log("BIRCH_LOG", "LOG", &["birch_log"]),
    log("JUNGLE_LOG", "LOG", &["jungle_log"]),
    log("ACACIA_LOG", "LOG2", &["acacia_log"]),
    log("DARK_OAK_LOG", "LOG2", &["dark_oak_log"]),
    log("MANGROVE_LOG", "MANGROVE_LOG", &["mangrove_log"]),
    log("CHERRY_LOG", "CHERRY_LOG", &["cherry_log"]),
    log("CRIMSON_STEM", "CRIMSON_STEM", &["crimson_stem"]),
    log("WARPED_STEM", "WARPED_STEM", &["warped_stem"]),
    // ── Leaves ──────────────────────────────────────────────────────────
    leaves("OAK_LEAVES", "LEAVES", &["oak_leaves"]),
    leaves("SPRUCE_LEAVES", "LEAVES", &["spruce_leaves"]),
    leaves("BIRCH_LEAVES", "LEAVES", &["birch_leaves"]),
    leaves("JUNGLE_LEAVES", "LEAVES", &["jungle_leaves"]),
    leaves("ACACIA_LEAVES", "LEAVES2", &["acacia_leaves"]),
    leaves("DARK_OAK_LEAVES", "LEAVES2", &["dark_oak_leaves"]),
    leaves("MANGROVE_LEAVES", "MANGROVE_LEAVES", &["mangrove_leaves"]),
    leaves("CHERRY_LEAVES", "CHERRY_LEAVES", &["cherry_leaves"]),
];

/// The set of block types that trigger vein mining.
#[derive(Debug, Clone, Default)]
pub struct VeinCatalog {
    blocks: HashSet<BlockType>,
}

impl VeinCatalog {
    /// Build the catalog from category switches and per-block toggles.
    ///
    /// Toggle keys are matched upper-case. The entry's own key wins over its
    /// legacy key; a block with neither key is enabled.
    pub fn build(enabled: &EnabledBlocks, toggles: &IndexMap<String, bool>) -> Self {
        let toggles: IndexMap<String, bool> = toggles
            .iter()
            .map(|(k, v)| (k.to_ascii_uppercase(), *v))
            .collect();
        let is_enabled = |entry: &CatalogEntry| {
            std::iter::once(entry.key)
                .chain(entry.legacy)
                .find_map(|key| toggles.get(key).copied())
                .unwrap_or(true)
        };

        let blocks = CATALOG
            .iter()
            .filter(|entry| match entry.category {
                BlockCategory::Ore => enabled.ores,
                BlockCategory::Log => enabled.logs,
                BlockCategory::Leaves => enabled.leaves,
            })
            .filter(|entry| is_enabled(entry))
            .flat_map(|entry| entry.ids.iter().map(|id| BlockType::new(id)))
            .collect();
        Self { blocks }
    }

    pub fn contains(&self, block: &BlockType) -> bool {
        self.blocks.contains(block)
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }
}

/// Category of a catalog block, if it is one.
pub fn category_of(block: &BlockType) -> Option<BlockCategory> {
    CATALOG
        .iter()
        .find(|entry| entry.ids.contains(&block.path()))
        .map(|entry| entry.category)
}

pub fn is_leaves(block: &BlockType) -> bool {
    block.path().ends_with("_leaves")
}

/// Tool classes accepted for a block. `None` means any tool, or none.
///
/// Catalog blocks are classed by category; other blocks by their id suffix.
pub fn required_tools(block: &BlockType) -> Option<ToolTraits> {
    match category_of(block) {
        Some(BlockCategory::Ore) => return Some(ToolTraits::PICKAXE),
        Some(BlockCategory::Log) => return Some(ToolTraits::AXE),
        Some(BlockCategory::Leaves) => return Some(leaf_tools()),
        None => {}
    }
    let path = block.path();
    if path.ends_with("_log") || path.ends_with("_stem") {
        Some(ToolTraits::AXE)
    } else if is_leaves(block) {
        Some(leaf_tools())
    } else if path.ends_with("_ore") {
        Some(ToolTraits::PICKAXE)
    } else {
        None
    }
}

fn leaf_tools() -> ToolTraits {
    ToolTraits::SHEARS | ToolTraits::HOE | ToolTraits::AXE
}

/// Memoized "is this the right tool" check, keyed by block and tool item.
#[derive(Debug)]
pub struct ToolValidator {
    cache: BoundedCache<(BlockType, Option<ItemId>), bool>,
}

impl ToolValidator {
    pub fn new() -> Self {
        Self {
            cache: BoundedCache::new(TOOL_CACHE_CAPACITY),
        }
    }

    pub fn is_proper_tool(&mut self, block: &BlockType, tool: Option<&ToolDescriptor>) -> bool {
        let key = (block.clone(), tool.map(|t| t.item.clone()));
        self.cache.get_or_insert_with(key, || match required_tools(block) {
            None => true,
            Some(accepted) => tool.is_some_and(|t| t.traits().intersects(accepted)),
        })
    }

    pub fn cached(&self) -> usize {
        self.cache.len()
    }

    pub fn clear(&mut self) {
        self.cache.clear();
    }
}

impl Default for ToolValidator {
    fn default() -> Self {
        Self::new()
    }
}

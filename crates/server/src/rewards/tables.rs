//! Static drop, experience and smelting tables, keyed by block path
//! (the id without its namespace).

/// What an ore drops without silk touch or smelting. `None` means the block
/// drops itself.
pub fn raw_drop(path: &str) -> Option<&'static str> {
    Some(match path {
        "coal_ore" | "deepslate_coal_ore" => "coal",
        "iron_ore" | "deepslate_iron_ore" => "raw_iron",
        "copper_ore" | "deepslate_copper_ore" => "raw_copper",
        "gold_ore" | "deepslate_gold_ore" => "raw_gold",
        "nether_gold_ore" => "gold_nugget",
        "redstone_ore"
        | "deepslate_redstone_ore"
        | "lit_redstone_ore"
        | "lit_deepslate_redstone_ore" => "redstone",
        "lapis_ore" | "deepslate_lapis_ore" => "lapis_lazuli",
        "diamond_ore" | "deepslate_diamond_ore" => "diamond",
        "emerald_ore" | "deepslate_emerald_ore" => "emerald",
        "quartz_ore" | "nether_quartz_ore" => "quartz",
        _ => return None,
    })
}

/// Base experience for breaking a block.
pub fn ore_xp(path: &str) -> u32 {
    match path {
        "coal_ore" | "deepslate_coal_ore" => 1,
        "iron_ore" | "deepslate_iron_ore" => 1,
        "copper_ore" | "deepslate_copper_ore" => 1,
        "gold_ore" | "deepslate_gold_ore" | "nether_gold_ore" => 1,
        "redstone_ore"
        | "deepslate_redstone_ore"
        | "lit_redstone_ore"
        | "lit_deepslate_redstone_ore" => 2,
        "lapis_ore" | "deepslate_lapis_ore" => 3,
        "diamond_ore" | "deepslate_diamond_ore" => 4,
        "emerald_ore" | "deepslate_emerald_ore" => 5,
        "quartz_ore" | "nether_quartz_ore" => 2,
        "ancient_debris" => 2,
        _ => 0,
    }
}

/// Furnace output for auto-smelting.
pub fn smelt_output(path: &str) -> Option<&'static str> {
    Some(match path {
        "iron_ore" | "deepslate_iron_ore" => "iron_ingot",
        "gold_ore" | "deepslate_gold_ore" | "nether_gold_ore" => "gold_ingot",
        "copper_ore" | "deepslate_copper_ore" => "copper_ingot",
        "ancient_debris" => "netherite_scrap",
        _ => return None,
    })
}

/// Furnace experience per smelted item.
pub fn smelt_xp(path: &str) -> f64 {
    match path {
        "iron_ore" | "deepslate_iron_ore" => 0.7,
        "gold_ore" | "deepslate_gold_ore" | "nether_gold_ore" => 1.0,
        "copper_ore" | "deepslate_copper_ore" => 0.7,
        "ancient_debris" => 2.0,
        _ => 0.0,
    }
}

/// Inclusive range of items dropped before fortune.
pub fn base_count(path: &str) -> (u32, u32) {
    match path {
        "lapis_ore" | "deepslate_lapis_ore" => (4, 9),
        "redstone_ore"
        | "deepslate_redstone_ore"
        | "lit_redstone_ore"
        | "lit_deepslate_redstone_ore" => (4, 5),
        "nether_gold_ore" => (2, 6),
        _ => (1, 1),
    }
}

pub fn fortune_applies(path: &str) -> bool {
    raw_drop(path).is_some()
}

/// Sapling dropped by a leaf block and its chance per block.
pub fn sapling(path: &str) -> Option<(&'static str, f64)> {
    Some(match path {
        "oak_leaves" => ("oak_sapling", 0.05),
        "spruce_leaves" => ("spruce_sapling", 0.05),
        "birch_leaves" => ("birch_sapling", 0.05),
        "jungle_leaves" => ("jungle_sapling", 0.025),
        "acacia_leaves" => ("acacia_sapling", 0.05),
        "dark_oak_leaves" => ("dark_oak_sapling", 0.025),
        "mangrove_leaves" => ("mangrove_propagule", 0.05),
        "cherry_leaves" => ("cherry_sapling", 0.05),
        _ => return None,
    })
}

/// Chance that a broken leaf block drops sticks.
pub const STICK_CHANCE: f64 = 0.02;

/// Silk touch keeps the block, except lit redstone which reverts to unlit.
pub fn silk_touch_drop(path: &str) -> &str {
    match path {
        "lit_redstone_ore" => "redstone_ore",
        "lit_deepslate_redstone_ore" => "deepslate_redstone_ore",
        other => other,
    }
}

//! Player-facing text: configurable templates with `{placeholder}`
//! substitution and `&` colour codes.

use std::fmt::Display;

use indexmap::IndexMap;

/// Minimum spacing between two generic error notices to the same player.
pub const ERROR_NOTICE_INTERVAL_MS: u64 = 5_000;

pub const ERROR_NOTICE: &str = "§cAn error occurred during vein mining.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageKey {
    ReloadSuccess,
    VeinTooLarge,
    CooldownActive,
    WrongTool,
    NoPermission,
    LimitReached,
    MilestoneReached,
    ToggleEnabled,
    ToggleDisabled,
    InventoryFull,
}

impl MessageKey {
    pub const ALL: [MessageKey; 10] = [
        Self::ReloadSuccess,
        Self::VeinTooLarge,
        Self::CooldownActive,
        Self::WrongTool,
        Self::NoPermission,
        Self::LimitReached,
        Self::MilestoneReached,
        Self::ToggleEnabled,
        Self::ToggleDisabled,
        Self::InventoryFull,
    ];

    /// Key under `[messages]` in the config file.
    pub fn config_key(self) -> &'static str {
        match self {
            Self::ReloadSuccess => "reload-success",
            Self::VeinTooLarge => "vein-too-large",
            Self::CooldownActive => "cooldown-active",
            Self::WrongTool => "wrong-tool",
            Self::NoPermission => "no-permission",
            Self::LimitReached => "limit-reached",
            Self::MilestoneReached => "milestone-reached",
            Self::ToggleEnabled => "toggle-enabled",
            Self::ToggleDisabled => "toggle-disabled",
            Self::InventoryFull => "inventory-full",
        }
    }

    pub fn default_template(self) -> &'static str {
        match self {
            Self::ReloadSuccess => "&aConfiguration reloaded successfully!",
            Self::VeinTooLarge => "&cVein size limited to {max} blocks!",
            Self::CooldownActive => "&cPlease wait before vein mining again!",
            Self::WrongTool => "&cYou need the correct tool to vein mine this block!",
            Self::NoPermission => "&cYou don't have permission to vein mine this block type!",
            Self::LimitReached => "&cYou've reached your daily vein mining limit!",
            Self::MilestoneReached => "&6&l{player} &ehas mined &6{count} &eblocks with VeinMiner!",
            Self::ToggleEnabled => "&aVein Mining enabled!",
            Self::ToggleDisabled => "&cVein Mining disabled!",
            Self::InventoryFull => "&eInventory full! {count} items were {action}.",
        }
    }
}

/// Translate `&` colour codes to the section sign the client renders.
pub fn colorize(text: &str) -> String {
    text.replace('&', "§")
}

/// The resolved template set.
#[derive(Debug, Clone)]
pub struct Messages {
    templates: IndexMap<MessageKey, String>,
}

impl Messages {
    /// Defaults, overridden by any matching key in `overrides`.
    pub fn new(overrides: &IndexMap<String, String>) -> Self {
        let templates = MessageKey::ALL
            .into_iter()
            .map(|key| {
                let template = overrides
                    .get(key.config_key())
                    .cloned()
                    .unwrap_or_else(|| key.default_template().to_string());
                (key, template)
            })
            .collect();
        Self { templates }
    }

    pub fn template(&self, key: MessageKey) -> &str {
        self.templates
            .get(&key)
            .map_or_else(|| key.default_template(), String::as_str)
    }

    /// Fill in `{name}` placeholders, then colourize.
    pub fn render(&self, key: MessageKey, args: &[(&str, &dyn Display)]) -> String {
        let mut text = self.template(key).to_string();
        for (name, value) in args {
            text = text.replace(&format!("{{{}}}", name), &value.to_string());
        }
        colorize(&text)
    }
}

impl Default for Messages {
    fn default() -> Self {
        Self::new(&IndexMap::new())
    }
}

/// Hotbar summary after a completed vein.
pub fn completion_tip(blocks: usize, xp: u32) -> String {
    let mut tip = format!("§6Vein Mining: §f{} blocks", blocks);
    if xp > 0 {
        tip.push_str(&format!("§7 (+{} XP)", xp));
    }
    tip
}

//! The `/veinminer` command.

use veinmine_engine::gate::PlayerId;

use crate::host::Permissions;
use crate::messages::MessageKey;
use crate::miner::VeinMiner;

pub const ALIASES: [&str; 3] = ["veinminer", "vm", "vmine"];

pub const PERMISSION_COMMAND: &str = "veinminer.command";
pub const PERMISSION_RELOAD: &str = "veinminer.reload";
pub const PERMISSION_STATS: &str = "veinminer.stats";
pub const PERMISSION_TOGGLE: &str = "veinminer.toggle";

const NO_PERMISSION: &str = "§cYou don't have permission to use this command.";
const PLAYERS_ONLY: &str = "§cThis command can only be used by players.";

/// Who ran a command. The console holds every permission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandSender {
    Console,
    Player { id: PlayerId, name: String },
}

impl CommandSender {
    fn has(&self, permissions: &dyn Permissions, node: &str) -> bool {
        match self {
            Self::Console => true,
            Self::Player { id, .. } => permissions.has_permission(*id, node),
        }
    }
}

pub fn is_command(label: &str) -> bool {
    let label = label.trim_start_matches('/');
    ALIASES.iter().any(|alias| alias.eq_ignore_ascii_case(label))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Subcommand {
    Help,
    Reload,
    Stats,
    Toggle,
    On,
    Off,
    Status,
}

impl Subcommand {
    fn parse(raw: &str) -> Option<Self> {
        match raw.to_ascii_lowercase().as_str() {
            "help" | "?" => Some(Self::Help),
            "reload" | "rl" => Some(Self::Reload),
            "stats" | "statistics" => Some(Self::Stats),
            "toggle" | "t" => Some(Self::Toggle),
            "on" | "enable" => Some(Self::On),
            "off" | "disable" => Some(Self::Off),
            "status" | "info" => Some(Self::Status),
            _ => None,
        }
    }

    fn permission(self) -> Option<&'static str> {
        match self {
            Self::Help => None,
            Self::Reload => Some(PERMISSION_RELOAD),
            Self::Stats => Some(PERMISSION_STATS),
            Self::Toggle | Self::On | Self::Off | Self::Status => Some(PERMISSION_TOGGLE),
        }
    }

    fn players_only(self) -> bool {
        !matches!(self, Self::Help | Self::Reload)
    }
}

/// Run `/veinminer <args…>` and return the lines to show the sender.
pub fn execute(
    miner: &mut VeinMiner,
    sender: &CommandSender,
    permissions: &dyn Permissions,
    args: &[&str],
) -> Vec<String> {
    if !sender.has(permissions, PERMISSION_COMMAND) {
        return vec![NO_PERMISSION.to_string()];
    }
    let Some(first) = args.first() else {
        return help(sender, permissions);
    };
    let Some(sub) = Subcommand::parse(first) else {
        return vec![format!("§cUnknown subcommand '{}'. Use /vm help", first)];
    };
    if let Some(node) = sub.permission() {
        if !sender.has(permissions, node) {
            return vec![NO_PERMISSION.to_string()];
        }
    }

    let player = match sender {
        CommandSender::Player { id, name } => Some((*id, name.as_str())),
        CommandSender::Console => None,
    };
    if sub.players_only() && player.is_none() {
        return vec![PLAYERS_ONLY.to_string()];
    }

    match (sub, player) {
        (Subcommand::Help, _) => help(sender, permissions),
        (Subcommand::Reload, _) => reload(miner),
        (Subcommand::Stats, Some((id, _))) => stats(miner, id),
        (Subcommand::Toggle, Some((id, name))) => {
            let enabled = miner.toggle(id);
            toggled(miner, name, enabled)
        }
        (Subcommand::On, Some((id, name))) => {
            miner.set_enabled(id, true);
            toggled(miner, name, true)
        }
        (Subcommand::Off, Some((id, name))) => {
            miner.set_enabled(id, false);
            toggled(miner, name, false)
        }
        (Subcommand::Status, Some((id, _))) => status(miner, id),
        (_, None) => vec![PLAYERS_ONLY.to_string()],
    }
}

fn help(sender: &CommandSender, permissions: &dyn Permissions) -> Vec<String> {
    let mut lines = vec![
        "§6=== VeinMiner Commands ===".to_string(),
        "§e/vm toggle §7- Toggle vein mining".to_string(),
        "§e/vm on|off §7- Enable or disable vein mining".to_string(),
        "§e/vm status §7- Show your vein mining status".to_string(),
        "§e/vm stats §7- Show your statistics".to_string(),
    ];
    if sender.has(permissions, PERMISSION_RELOAD) {
        lines.push("§e/vm reload §7- Reload the configuration".to_string());
    }
    lines
}

fn reload(miner: &mut VeinMiner) -> Vec<String> {
    match miner.reload_from_disk() {
        Ok(()) => vec![miner.messages().render(MessageKey::ReloadSuccess, &[])],
        Err(e) => {
            tracing::error!("Failed to reload configuration: {}", e);
            vec![format!("§cFailed to reload configuration: {}", e)]
        }
    }
}

fn stats(miner: &VeinMiner, player: PlayerId) -> Vec<String> {
    let tracker = miner.stats_tracker();
    if !tracker.is_enabled() {
        return vec!["§cStatistics are disabled.".to_string()];
    }
    match tracker.get(&player) {
        Some(stats) => stats.summary_lines(tracker.thresholds().len()),
        None => vec!["§eYou haven't mined any veins yet.".to_string()],
    }
}

fn toggled(miner: &VeinMiner, name: &str, enabled: bool) -> Vec<String> {
    let logging = &miner.config().logging;
    if logging.enabled && logging.log_player_toggle {
        tracing::info!(
            "{} {} vein mining",
            name,
            if enabled { "enabled" } else { "disabled" }
        );
    }
    let key = if enabled {
        MessageKey::ToggleEnabled
    } else {
        MessageKey::ToggleDisabled
    };
    vec![miner.messages().render(key, &[])]
}

fn status(miner: &VeinMiner, player: PlayerId) -> Vec<String> {
    let config = miner.config();
    let state = if miner.is_enabled(&player) {
        "§aEnabled"
    } else {
        "§cDisabled"
    };
    let mut lines = vec![
        "§6=== VeinMiner Status ===".to_string(),
        format!("§eVein Mining: {}", state),
        format!("§eActivation: §f{}", config.activation.mode),
        format!("§eMax blocks: §f{}", config.max_vein_size()),
        format!("§ePattern: §f{}", miner.pattern().spec().pattern),
        format!("§eCooldown: §f{}ms", config.cooldown_ms),
    ];

    let limits = miner.gate().limits();
    if limits.daily_limits_enabled {
        let (veins, blocks) = miner
            .players()
            .get(&player)
            .map_or((0, 0), |s| (s.daily_veins, s.daily_blocks));
        lines.push(format!("§eDaily veins: §f{}/{}", veins, limits.max_veins_per_day));
        lines.push(format!("§eDaily blocks: §f{}/{}", blocks, limits.max_blocks_per_day));
    }

    let now = miner.now();
    if miner.gate().is_blocked(miner.players(), &player, now) {
        let until = miner
            .players()
            .get(&player)
            .and_then(|s| s.blocked_until)
            .unwrap_or(now);
        lines.push(format!(
            "§cTemporarily blocked for {}s",
            until.saturating_sub(now).div_ceil(1000)
        ));
    }
    lines
}

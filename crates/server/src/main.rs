use std::cell::RefCell;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::time::Duration;

use rand::SeedableRng;
use rand::rngs::StdRng;
use tokio::io::{AsyncBufReadExt, BufReader};
use veinmine_engine::world::position::BlockPos;
use veinmine_server::command::{self, CommandSender};
use veinmine_server::config::VeinMinerConfig;
use veinmine_server::item::{Enchantments, ToolDescriptor};
use veinmine_server::miner::{BreakOutcome, VeinMiner};
use veinmine_server::sandbox::{Chat, Sandbox};
use veinmine_server::stats::StatsTracker;

const CLEANUP_INTERVAL: Duration = Duration::from_secs(30 * 60);
const DAILY_RESET_INTERVAL: Duration = Duration::from_secs(24 * 60 * 60);
const WORLD_RADIUS: i64 = 32;

struct App {
    miner: VeinMiner,
    sandbox: Sandbox,
}

type SharedApp = Rc<RefCell<App>>;

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let demo_mode = std::env::args().any(|a| a == "--demo");
    let config_path: PathBuf = std::env::args()
        .skip_while(|a| a != "--config")
        .nth(1)
        .unwrap_or_else(|| "veinminer.toml".into())
        .into();
    let seed: u64 = std::env::args()
        .skip_while(|a| a != "--seed")
        .nth(1)
        .and_then(|s| s.parse().ok())
        .unwrap_or_else(rand::random);

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".parse().unwrap()),
        )
        .init();

    tracing::info!("VeinMiner sandbox (seed {})", seed);

    let config = load_config(&config_path);
    let stats_path = config_path
        .parent()
        .unwrap_or_else(|| Path::new(""))
        .join(&config.statistics.file);
    let stats = match StatsTracker::load(&config.statistics, &stats_path) {
        Ok(stats) => stats,
        Err(e) => {
            tracing::error!("Failed to load statistics: {:#}", e);
            StatsTracker::new(&config.statistics, Some(stats_path))
        }
    };
    let auto_save = config.statistics.auto_save_interval;

    let miner = VeinMiner::new(config)
        .with_config_path(&config_path)
        .with_stats(stats)
        .with_rng(StdRng::seed_from_u64(seed.wrapping_add(1)));

    let mut sandbox = Sandbox::new();
    tracing::info!("Generating sandbox world...");
    sandbox.generate(WORLD_RADIUS, 48, 12, &mut StdRng::seed_from_u64(seed));

    let app: SharedApp = Rc::new(RefCell::new(App { miner, sandbox }));

    if demo_mode {
        run_demo(&mut app.borrow_mut());
        save_stats(&app, "Final save");
        return;
    }

    let local = tokio::task::LocalSet::new();
    local
        .run_until(async move {
            spawn_maintenance(&app, auto_save);

            tokio::select! {
                _ = run_console(Rc::clone(&app)) => {}
                _ = tokio::signal::ctrl_c() => {
                    tracing::info!("Ctrl+C received, shutting down...");
                }
            }

            save_stats(&app, "Shutdown save");
        })
        .await;
}

fn load_config(path: &Path) -> VeinMinerConfig {
    if !path.exists() {
        let defaults = VeinMinerConfig::default();
        match defaults.write(path) {
            Ok(()) => tracing::info!("Wrote default config to {}", path.display()),
            Err(e) => tracing::error!("Failed to write default config: {}", e),
        }
        return defaults;
    }
    match VeinMinerConfig::load(path) {
        Ok(config) => {
            tracing::info!("Loaded config from {}", path.display());
            config
        }
        Err(e) => {
            tracing::error!("Failed to load config {}: {}, using defaults", path.display(), e);
            VeinMinerConfig::default()
        }
    }
}

fn save_stats(app: &SharedApp, label: &str) {
    match app.borrow_mut().miner.save_stats() {
        Ok(true) => tracing::info!("{} complete", label),
        Ok(false) => tracing::debug!("{}: nothing to save", label),
        Err(e) => tracing::error!("{} failed: {:#}", label, e),
    }
}

// ── Periodic tasks ──────────────────────────────────────────────────────────

fn spawn_maintenance(app: &SharedApp, auto_save_secs: i64) {
    if auto_save_secs > 0 {
        let app = Rc::clone(app);
        tokio::task::spawn_local(async move {
            let mut interval = tokio::time::interval(Duration::from_secs(auto_save_secs as u64));
            interval.tick().await; // first tick is immediate, skip it
            loop {
                interval.tick().await;
                save_stats(&app, "Statistics autosave");
            }
        });
    }

    let cleanup_app = Rc::clone(app);
    tokio::task::spawn_local(async move {
        let mut interval = tokio::time::interval(CLEANUP_INTERVAL);
        interval.tick().await;
        loop {
            interval.tick().await;
            let mut app = cleanup_app.borrow_mut();
            let now = app.miner.now();
            let removed = app.miner.cleanup(now);
            tracing::info!("Cleaned up {} stale player entries", removed);
        }
    });

    let reset_app = Rc::clone(app);
    tokio::task::spawn_local(async move {
        let mut interval = tokio::time::interval(DAILY_RESET_INTERVAL);
        interval.tick().await;
        loop {
            interval.tick().await;
            let mut app = reset_app.borrow_mut();
            if app.miner.config().limits.enable_limits {
                app.miner.reset_daily();
            }
        }
    });
}

// ── Console ─────────────────────────────────────────────────────────────────

async fn run_console(app: SharedApp) {
    println!("Commands: break <player> <x> <y> <z> [sneak] | vm <player> <args...> | give <player> <item> [fortune=N silk unbreaking=N] | landmarks | quit");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(e) => {
                tracing::error!("Failed to read console input: {}", e);
                break;
            }
        };
        let words: Vec<&str> = line.split_whitespace().collect();
        if words.first() == Some(&"quit") {
            break;
        }
        let mut app = app.borrow_mut();
        if let Err(msg) = handle_line(&mut app, &words) {
            println!("{}", msg);
        }
        print_chat(&mut app.sandbox);
    }
}

fn handle_line(app: &mut App, words: &[&str]) -> Result<(), String> {
    match words {
        [] => Ok(()),
        ["break", name, x, y, z, rest @ ..] => {
            let pos = BlockPos::new(coord(x)?, coord(y)?, coord(z)?);
            let sneaking = rest.first() == Some(&"sneak");
            let player = {
                app.sandbox.join(name);
                let player = app
                    .sandbox
                    .player_mut(name)
                    .ok_or_else(|| format!("unknown player {}", name))?;
                player.sneaking = sneaking;
                player.clone()
            };
            let outcome = app.sandbox.break_block(&mut app.miner, &player, pos);
            println!("{}", describe(&outcome));
            Ok(())
        }
        ["vm", name, args @ ..] => {
            let sender = if name.eq_ignore_ascii_case("console") {
                CommandSender::Console
            } else {
                let player = app.sandbox.join(name);
                CommandSender::Player {
                    id: player.id,
                    name: player.name,
                }
            };
            for line in command::execute(&mut app.miner, &sender, &app.sandbox.permissions, args) {
                println!("{}", plain(&line));
            }
            Ok(())
        }
        ["give", name, item, flags @ ..] => {
            let player = app.sandbox.join(name);
            let mut enchantments = Enchantments::default();
            for flag in flags {
                match flag.split_once('=') {
                    Some(("fortune", n)) => enchantments.fortune = level(n)?,
                    Some(("unbreaking", n)) => enchantments.unbreaking = level(n)?,
                    Some(("silk", n)) => enchantments.silk_touch = level(n)?,
                    None if *flag == "silk" => enchantments.silk_touch = 1,
                    _ => return Err(format!("unknown flag {}", flag)),
                }
            }
            let tool = ToolDescriptor::new(*item).with_enchantments(enchantments);
            println!("Gave {} to {}", tool.item, player.name);
            app.sandbox.give_tool(player.id, tool);
            Ok(())
        }
        ["landmarks"] => {
            for mark in &app.sandbox.landmarks {
                println!(
                    "{} x{} at {} {} {}",
                    mark.block, mark.size, mark.pos.x, mark.pos.y, mark.pos.z
                );
            }
            Ok(())
        }
        _ => Err(format!("unrecognized command: {}", words.join(" "))),
    }
}

fn coord(raw: &str) -> Result<i64, String> {
    raw.parse().map_err(|_| format!("invalid coordinate {}", raw))
}

fn level(raw: &str) -> Result<u32, String> {
    raw.parse().map_err(|_| format!("invalid level {}", raw))
}

fn describe(outcome: &BreakOutcome) -> String {
    match outcome {
        BreakOutcome::Mined(report) => format!(
            "Mined {} of {} {} ({} failed, {} XP)",
            report.process.successful,
            report.found,
            report.block,
            report.process.failed,
            report.process.xp_granted
        ),
        BreakOutcome::Skipped(reason) => format!("Normal break ({:?})", reason),
        BreakOutcome::Rejected(rejection) => format!("Normal break, rejected: {:?}", rejection),
        BreakOutcome::Aborted(reason) => format!("Normal break, aborted: {:?}", reason),
    }
}

/// Strip `§x` colour codes.
fn plain(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars();
    while let Some(c) = chars.next() {
        if c == '§' {
            chars.next();
        } else {
            out.push(c);
        }
    }
    out
}

fn print_chat(sandbox: &mut Sandbox) {
    for chat in sandbox.messenger.drain() {
        match chat {
            Chat::Message(_, text) => println!("[chat] {}", plain(&text)),
            Chat::Tip(_, text) => println!("[tip] {}", plain(&text)),
            Chat::Broadcast(text) => println!("[broadcast] {}", plain(&text)),
        }
    }
}

// ── Demo ────────────────────────────────────────────────────────────────────

/// Break every generated landmark with a sneaking player.
fn run_demo(app: &mut App) {
    tracing::info!("VeinMiner demo");
    let mut player = app.sandbox.join("Steve");
    player.sneaking = true;
    if let Some(p) = app.sandbox.player_mut("Steve") {
        p.sneaking = true;
    }

    let pickaxe = ToolDescriptor::new("diamond_pickaxe").with_enchantments(Enchantments {
        fortune: 2,
        unbreaking: 3,
        ..Enchantments::default()
    });
    let axe = ToolDescriptor::new("iron_axe");

    let landmarks = app.sandbox.landmarks.clone();
    let mut now = app.miner.now();
    for mark in landmarks {
        let tool = if mark.block.path().ends_with("_log") {
            axe.clone()
        } else {
            pickaxe.clone()
        };
        app.sandbox.give_tool(player.id, tool);
        let outcome = app.sandbox.break_block(&mut app.miner, &player, mark.pos);
        tracing::info!(
            "{} at ({}, {}, {}): {}",
            mark.block, mark.pos.x, mark.pos.y, mark.pos.z,
            describe(&outcome)
        );
        print_chat(&mut app.sandbox);

        // Stay clear of the cooldown between landmarks.
        let cooldown = app.miner.config().cooldown_ms.max(0) as u64;
        while app.miner.now() < now + cooldown {
            std::thread::sleep(Duration::from_millis(cooldown.min(50)));
        }
        now = app.miner.now();
    }

    if let Some(stats) = app.miner.stats(&player.id) {
        for line in stats.summary_lines(app.miner.stats_tracker().thresholds().len()) {
            println!("{}", plain(&line));
        }
    }
}

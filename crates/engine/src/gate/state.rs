use std::collections::{HashMap, VecDeque};

use uuid::Uuid;

/// Stable player identity.
pub type PlayerId = Uuid;

/// Everything the engine remembers about one player between operations.
///
/// All timestamps are milliseconds from the engine's [`Clock`](crate::clock::Clock).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlayerState {
    pub last_operation: Option<u64>,
    /// Completed operations inside the rate window, oldest first.
    pub recent_operations: VecDeque<u64>,
    pub daily_veins: u32,
    pub daily_blocks: u64,
    pub blocked_until: Option<u64>,
    pub last_cooldown_notice: Option<u64>,
    pub last_error_notice: Option<u64>,
}

impl PlayerState {
    /// True when nothing here differs from a freshly created entry.
    pub fn is_idle(&self) -> bool {
        *self == Self::default()
    }

    /// Drop rate-window entries at or beyond `window` milliseconds old.
    pub fn prune_window(&mut self, now: u64, window: u64) {
        while let Some(&oldest) = self.recent_operations.front() {
            if now.saturating_sub(oldest) < window {
                break;
            }
            self.recent_operations.pop_front();
        }
    }
}

/// Per-player engine state, keyed by player identity.
///
/// Entries are created lazily on first write, cleared wholesale on reload
/// and pruned when stale.
#[derive(Debug, Default)]
pub struct PlayerStateStore {
    players: HashMap<PlayerId, PlayerState>,
}

impl PlayerStateStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, player: &PlayerId) -> Option<&PlayerState> {
        self.players.get(player)
    }

    pub fn entry(&mut self, player: PlayerId) -> &mut PlayerState {
        self.players.entry(player).or_default()
    }

    pub fn len(&self) -> usize {
        self.players.len()
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }

    pub fn clear(&mut self) {
        self.players.clear();
    }

    /// Zero every player's daily counters.
    pub fn reset_daily(&mut self) {
        for state in self.players.values_mut() {
            state.daily_veins = 0;
            state.daily_blocks = 0;
        }
        self.players.retain(|_, state| !state.is_idle());
    }

    /// Forget timestamps older than `max_age`, expired blocks and the rate
    /// window past `rate_window`, then drop entries left with nothing in them.
    ///
    /// Daily counters and active blocks are never touched. Returns the number
    /// of entries removed.
    pub fn prune_stale(&mut self, now: u64, max_age: u64, rate_window: u64) -> usize {
        let stale = |stamp: &mut Option<u64>| {
            if stamp.is_some_and(|t| now.saturating_sub(t) > max_age) {
                *stamp = None;
            }
        };
        for state in self.players.values_mut() {
            stale(&mut state.last_operation);
            stale(&mut state.last_cooldown_notice);
            stale(&mut state.last_error_notice);
            if state.blocked_until.is_some_and(|until| now >= until) {
                state.blocked_until = None;
            }
            state.prune_window(now, rate_window);
        }
        let before = self.players.len();
        self.players.retain(|_, state| !state.is_idle());
        before - self.players.len()
    }
}

//! Per-player admission control for vein operations.
//!
//! A break is admitted only after four checks, in order, each a hard stop:
//!
//!   1. temporary block (set by rate-limit escalation),
//!   2. cooldown since the last operation,
//!   3. an operation already in flight for the player,
//!   4. the rolling one-minute rate window.
//!
//! The daily quota depends on the size of the vein, so it is a separate
//! check made after discovery ([`AbuseGate::check_daily`]).

pub mod guard;
pub mod state;

pub use guard::{ConcurrencyGuard, ProcessingLease};
pub use state::{PlayerId, PlayerState, PlayerStateStore};

/// Length of the rate-limit window.
pub const RATE_WINDOW_MS: u64 = 60_000;
/// Minimum spacing between two cooldown notices to the same player.
pub const COOLDOWN_NOTICE_INTERVAL_MS: u64 = 1_000;
/// Idle time after which per-player timestamps are forgotten.
pub const STALE_ENTRY_MS: u64 = 300_000;

/// Tunables for the gate, taken from configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GateLimits {
    pub cooldown_ms: u64,
    /// Operations allowed per [`RATE_WINDOW_MS`]. Zero disables the check.
    pub max_per_minute: u32,
    pub temporary_block_ms: u64,
    pub daily_limits_enabled: bool,
    pub max_veins_per_day: u32,
    pub max_blocks_per_day: u64,
}

impl Default for GateLimits {
    fn default() -> Self {
        Self {
            cooldown_ms: 100,
            max_per_minute: 60,
            temporary_block_ms: 5 * 60_000,
            daily_limits_enabled: false,
            max_veins_per_day: 1000,
            max_blocks_per_day: 10_000,
        }
    }
}

/// Why a player was refused. Rejections are expected outcomes, not errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    TemporarilyBlocked { until: u64 },
    /// `notify` is set at most once per [`COOLDOWN_NOTICE_INTERVAL_MS`].
    Cooldown { remaining_ms: u64, notify: bool },
    AlreadyProcessing,
    /// The player exceeded the rate window and is now blocked.
    RateLimited { blocked_until: u64 },
    DailyVeinLimit,
    DailyBlockLimit,
}

impl Rejection {
    /// True for the rejections that should produce a player-facing notice.
    pub fn notifies(&self) -> bool {
        match self {
            Self::Cooldown { notify, .. } => *notify,
            Self::RateLimited { .. } | Self::DailyVeinLimit | Self::DailyBlockLimit => true,
            Self::TemporarilyBlocked { .. } | Self::AlreadyProcessing => false,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct AbuseGate {
    limits: GateLimits,
}

impl AbuseGate {
    pub fn new(limits: GateLimits) -> Self {
        Self { limits }
    }

    pub fn limits(&self) -> &GateLimits {
        &self.limits
    }

    /// Run checks 1 to 4. On success the returned lease marks the player as
    /// processing until it is dropped.
    pub fn admit(
        &self,
        store: &mut PlayerStateStore,
        guard: &ConcurrencyGuard,
        player: PlayerId,
        now: u64,
    ) -> Result<ProcessingLease, Rejection> {
        let state = store.entry(player);

        if let Some(until) = state.blocked_until {
            if now < until {
                return Err(Rejection::TemporarilyBlocked { until });
            }
            state.blocked_until = None;
        }

        if let Some(last) = state.last_operation {
            let elapsed = now.saturating_sub(last);
            if elapsed < self.limits.cooldown_ms {
                let notify = state
                    .last_cooldown_notice
                    .is_none_or(|t| now.saturating_sub(t) > COOLDOWN_NOTICE_INTERVAL_MS);
                if notify {
                    state.last_cooldown_notice = Some(now);
                }
                return Err(Rejection::Cooldown {
                    remaining_ms: self.limits.cooldown_ms - elapsed,
                    notify,
                });
            }
        }

        let lease = guard
            .try_acquire(player)
            .ok_or(Rejection::AlreadyProcessing)?;

        if self.limits.max_per_minute > 0 {
            state.prune_window(now, RATE_WINDOW_MS);
            if state.recent_operations.len() >= self.limits.max_per_minute as usize {
                let blocked_until = now + self.limits.temporary_block_ms;
                state.blocked_until = Some(blocked_until);
                tracing::debug!(
                    "Player {} exceeded {} vein operations per minute, blocked until {}",
                    player, self.limits.max_per_minute, blocked_until
                );
                return Err(Rejection::RateLimited { blocked_until });
            }
        }

        Ok(lease)
    }

    /// Daily quota check for a vein of `candidate` blocks. Always passes when
    /// daily limits are disabled.
    pub fn check_daily(
        &self,
        store: &PlayerStateStore,
        player: &PlayerId,
        candidate: usize,
    ) -> Result<(), Rejection> {
        if !self.limits.daily_limits_enabled {
            return Ok(());
        }
        let (veins, blocks) = store
            .get(player)
            .map_or((0, 0), |s| (s.daily_veins, s.daily_blocks));
        if veins >= self.limits.max_veins_per_day {
            return Err(Rejection::DailyVeinLimit);
        }
        if blocks + candidate as u64 > self.limits.max_blocks_per_day {
            return Err(Rejection::DailyBlockLimit);
        }
        Ok(())
    }

    /// Start the cooldown for `player`.
    pub fn mark_operation(&self, store: &mut PlayerStateStore, player: PlayerId, now: u64) {
        store.entry(player).last_operation = Some(now);
    }

    /// Count a completed operation against the rate window and daily quota.
    pub fn record_usage(
        &self,
        store: &mut PlayerStateStore,
        player: PlayerId,
        now: u64,
        successful_breaks: usize,
    ) {
        if successful_breaks == 0 {
            return;
        }
        let state = store.entry(player);
        if self.limits.max_per_minute > 0 {
            state.prune_window(now, RATE_WINDOW_MS);
            state.recent_operations.push_back(now);
        }
        if self.limits.daily_limits_enabled {
            state.daily_veins += 1;
            state.daily_blocks += successful_breaks as u64;
        }
    }

    /// True while a temporary block is active. Does not mutate state.
    pub fn is_blocked(&self, store: &PlayerStateStore, player: &PlayerId, now: u64) -> bool {
        store
            .get(player)
            .and_then(|s| s.blocked_until)
            .is_some_and(|until| now < until)
    }
}

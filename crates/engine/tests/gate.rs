//! Admission gate, concurrency guard and per-player state.

use std::panic::{AssertUnwindSafe, catch_unwind};

use uuid::Uuid;
use veinmine_engine::cache::BoundedCache;
use veinmine_engine::clock::{Clock, ManualClock};
use veinmine_engine::gate::{
    AbuseGate, ConcurrencyGuard, GateLimits, PlayerStateStore, RATE_WINDOW_MS, Rejection,
    STALE_ENTRY_MS,
};

fn player(n: u128) -> Uuid {
    Uuid::from_u128(n)
}

/// Gate with no cooldown so tests can fire operations back to back.
fn rapid_gate(max_per_minute: u32) -> AbuseGate {
    AbuseGate::new(GateLimits {
        cooldown_ms: 0,
        max_per_minute,
        ..GateLimits::default()
    })
}

// ---------------------------------------------------------------------------
// Concurrency guard
// ---------------------------------------------------------------------------

#[test]
fn second_admit_while_processing_is_rejected() {
    let gate = rapid_gate(0);
    let guard = ConcurrencyGuard::new();
    let mut store = PlayerStateStore::new();
    let p = player(1);

    let lease = gate.admit(&mut store, &guard, p, 0).unwrap();
    assert!(guard.is_processing(&p));
    assert_eq!(lease.player(), p);
    assert_eq!(
        gate.admit(&mut store, &guard, p, 1).unwrap_err(),
        Rejection::AlreadyProcessing
    );

    // Other players are unaffected.
    let other = gate.admit(&mut store, &guard, player(2), 1).unwrap();
    assert_eq!(guard.active_count(), 2);

    drop(lease);
    drop(other);
    assert_eq!(guard.active_count(), 0);
    assert!(gate.admit(&mut store, &guard, p, 2).is_ok());
}

#[test]
fn lease_is_released_when_processing_panics() {
    let guard = ConcurrencyGuard::new();
    let p = player(1);
    let shared = guard.clone();

    let result = catch_unwind(AssertUnwindSafe(|| {
        let _lease = shared.try_acquire(p).unwrap();
        panic!("block processing failed");
    }));
    assert!(result.is_err());
    assert!(!guard.is_processing(&p));
    assert!(guard.try_acquire(p).is_some());
}

// ---------------------------------------------------------------------------
// Cooldown
// ---------------------------------------------------------------------------

#[test]
fn cooldown_rejects_until_elapsed() {
    let gate = AbuseGate::new(GateLimits {
        cooldown_ms: 100,
        ..GateLimits::default()
    });
    let guard = ConcurrencyGuard::new();
    let mut store = PlayerStateStore::new();
    let p = player(1);

    gate.mark_operation(&mut store, p, 1_000);
    assert_eq!(
        gate.admit(&mut store, &guard, p, 1_050).unwrap_err(),
        Rejection::Cooldown {
            remaining_ms: 50,
            notify: true
        }
    );
    assert_eq!(
        gate.admit(&mut store, &guard, p, 1_060).unwrap_err(),
        Rejection::Cooldown {
            remaining_ms: 40,
            notify: false
        }
    );
    assert!(gate.admit(&mut store, &guard, p, 1_100).is_ok());
}

#[test]
fn cooldown_notices_are_throttled_to_one_per_second() {
    let gate = AbuseGate::new(GateLimits {
        cooldown_ms: 5_000,
        ..GateLimits::default()
    });
    let guard = ConcurrencyGuard::new();
    let mut store = PlayerStateStore::new();
    let p = player(1);
    gate.mark_operation(&mut store, p, 0);

    let notified = |store: &mut PlayerStateStore, now| {
        gate.admit(store, &guard, p, now).unwrap_err().notifies()
    };
    assert!(notified(&mut store, 10));
    assert!(!notified(&mut store, 500));
    assert!(!notified(&mut store, 1_010));
    assert!(notified(&mut store, 1_011));
}

// ---------------------------------------------------------------------------
// Rate limit and temporary block
// ---------------------------------------------------------------------------

#[test]
fn sixty_first_operation_in_a_minute_blocks_the_player() {
    let gate = rapid_gate(60);
    let guard = ConcurrencyGuard::new();
    let mut store = PlayerStateStore::new();
    let clock = ManualClock::new(0);
    let p = player(7);

    for _ in 0..60 {
        let lease = gate.admit(&mut store, &guard, p, clock.now_millis()).unwrap();
        drop(lease);
        gate.record_usage(&mut store, p, clock.now_millis(), 3);
        clock.advance(100);
    }

    let now = clock.now_millis();
    let blocked_until = now + GateLimits::default().temporary_block_ms;
    assert_eq!(
        gate.admit(&mut store, &guard, p, now).unwrap_err(),
        Rejection::RateLimited { blocked_until }
    );
    assert!(!guard.is_processing(&p));
    assert!(gate.is_blocked(&store, &p, now));

    clock.advance(1_000);
    assert_eq!(
        gate.admit(&mut store, &guard, p, clock.now_millis()).unwrap_err(),
        Rejection::TemporarilyBlocked {
            until: blocked_until
        }
    );

    // Once the block expires the window has also drained.
    clock.set(blocked_until);
    assert!(!gate.is_blocked(&store, &p, clock.now_millis()));
    assert!(gate.admit(&mut store, &guard, p, clock.now_millis()).is_ok());
    assert_eq!(store.get(&p).unwrap().blocked_until, None);
}

#[test]
fn rate_window_slides() {
    let gate = rapid_gate(2);
    let guard = ConcurrencyGuard::new();
    let mut store = PlayerStateStore::new();
    let p = player(1);

    gate.record_usage(&mut store, p, 0, 1);
    gate.record_usage(&mut store, p, 30_000, 1);
    assert!(gate.admit(&mut store, &guard, p, RATE_WINDOW_MS).is_ok());
    assert_eq!(store.get(&p).unwrap().recent_operations.len(), 1);
}

#[test]
fn zero_per_minute_disables_rate_limit() {
    let gate = rapid_gate(0);
    let guard = ConcurrencyGuard::new();
    let mut store = PlayerStateStore::new();
    let p = player(1);

    for now in 0..200 {
        let _lease = gate.admit(&mut store, &guard, p, now).unwrap();
        gate.record_usage(&mut store, p, now, 1);
    }
    assert!(store.get(&p).unwrap().recent_operations.is_empty());
}

#[test]
fn recording_drops_timestamps_that_left_the_window() {
    let gate = rapid_gate(100);
    let mut store = PlayerStateStore::new();
    let p = player(1);

    for now in [0, 10_000, 59_999] {
        gate.record_usage(&mut store, p, now, 1);
    }
    assert_eq!(store.get(&p).unwrap().recent_operations.len(), 3);

    gate.record_usage(&mut store, p, RATE_WINDOW_MS + 10_000, 1);
    let recent: Vec<u64> = store.get(&p).unwrap().recent_operations.iter().copied().collect();
    assert_eq!(recent, vec![59_999, RATE_WINDOW_MS + 10_000]);
}

#[test]
fn empty_operations_are_not_recorded() {
    let gate = rapid_gate(1);
    let mut store = PlayerStateStore::new();
    gate.record_usage(&mut store, player(1), 0, 0);
    assert!(store.is_empty());
}

// ---------------------------------------------------------------------------
// Daily limits
// ---------------------------------------------------------------------------

#[test]
fn daily_limits_count_veins_and_blocks() {
    let gate = AbuseGate::new(GateLimits {
        daily_limits_enabled: true,
        max_veins_per_day: 2,
        max_blocks_per_day: 100,
        ..GateLimits::default()
    });
    let mut store = PlayerStateStore::new();
    let p = player(1);

    assert!(gate.check_daily(&store, &p, 100).is_ok());
    assert_eq!(
        gate.check_daily(&store, &p, 101),
        Err(Rejection::DailyBlockLimit)
    );

    gate.record_usage(&mut store, p, 0, 60);
    assert!(gate.check_daily(&store, &p, 40).is_ok());
    assert_eq!(
        gate.check_daily(&store, &p, 41),
        Err(Rejection::DailyBlockLimit)
    );

    gate.record_usage(&mut store, p, 1, 1);
    assert_eq!(gate.check_daily(&store, &p, 1), Err(Rejection::DailyVeinLimit));
    assert!(Rejection::DailyVeinLimit.notifies());

    store.reset_daily();
    assert!(gate.check_daily(&store, &p, 100).is_ok());
}

#[test]
fn disabled_daily_limits_never_count() {
    let gate = AbuseGate::new(GateLimits {
        max_veins_per_day: 0,
        ..GateLimits::default()
    });
    let mut store = PlayerStateStore::new();
    let p = player(1);
    gate.record_usage(&mut store, p, 0, 5_000);

    assert!(gate.check_daily(&store, &p, 5_000).is_ok());
    assert_eq!(store.get(&p).unwrap().daily_blocks, 0);
}

// ---------------------------------------------------------------------------
// Store maintenance
// ---------------------------------------------------------------------------

#[test]
fn stale_entries_are_pruned_but_counters_survive() {
    let gate = AbuseGate::new(GateLimits {
        daily_limits_enabled: true,
        ..GateLimits::default()
    });
    let mut store = PlayerStateStore::new();
    let idle = player(1);
    let counted = player(2);
    let blocked = player(3);

    gate.mark_operation(&mut store, idle, 0);
    gate.record_usage(&mut store, counted, 0, 10);
    store.entry(blocked).blocked_until = Some(10 * STALE_ENTRY_MS);

    let now = STALE_ENTRY_MS + 1;
    let removed = store.prune_stale(now, STALE_ENTRY_MS, RATE_WINDOW_MS);
    assert_eq!(removed, 1);
    assert!(store.get(&idle).is_none());

    let state = store.get(&counted).unwrap();
    assert_eq!(state.daily_blocks, 10);
    assert!(state.recent_operations.is_empty());
    assert!(store.get(&blocked).unwrap().blocked_until.is_some());
}

#[test]
fn recent_entries_survive_pruning() {
    let gate = AbuseGate::default();
    let mut store = PlayerStateStore::new();
    gate.mark_operation(&mut store, player(1), 1_000);
    assert_eq!(store.prune_stale(2_000, STALE_ENTRY_MS, RATE_WINDOW_MS), 0);
    assert_eq!(store.len(), 1);

    store.clear();
    assert!(store.is_empty());
}

// ---------------------------------------------------------------------------
// Bounded cache
// ---------------------------------------------------------------------------

#[test]
fn cache_clears_wholesale_at_capacity() {
    let mut cache = BoundedCache::new(2);
    cache.insert("a", true);
    cache.insert("b", false);
    cache.insert("a", false);
    assert_eq!(cache.len(), 2);
    assert_eq!(cache.clears(), 0);

    cache.insert("c", true);
    assert_eq!(cache.len(), 1);
    assert_eq!(cache.clears(), 1);
    assert_eq!(cache.get(&"c"), Some(&true));
    assert_eq!(cache.get(&"a"), None);
}

#[test]
fn cache_miss_computes_once() {
    let mut cache = BoundedCache::new(10);
    let mut calls = 0;
    let first = cache.get_or_insert_with(1, || {
        calls += 1;
        "pickaxe"
    });
    let second = cache.get_or_insert_with(1, || {
        calls += 1;
        "hand"
    });
    assert_eq!(first, "pickaxe");
    assert_eq!(second, "pickaxe");
    assert_eq!(calls, 1);
}

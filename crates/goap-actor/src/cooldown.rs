//! Per-actor cooldown and reservation-failure bookkeeping.
//!
//! Guarded by one `parking_lot::Mutex`, per spec §5's "per-actor cooldown
//! maps and failure counters are guarded by a per-actor mutex" — this is
//! the actor-scoped counterpart to the `_gate` each domain system in
//! `goap-domains` owns for its own state.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use rand::Rng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

/// Reservation failures at or above this count trigger a cooldown.
const RESERVATION_FAILURE_THRESHOLD: u32 = 3;
/// Cooldown length range applied once the failure threshold is hit.
const RESERVATION_COOLDOWN_MS: std::ops::Range<u64> = 40..120;
/// Jitter-sleep range after a single reservation-acquire failure.
pub(crate) const RESERVATION_RETRY_JITTER_MS: std::ops::Range<u64> = 5..25;

#[derive(Default)]
struct Inner {
    reservation_failure_counts: HashMap<String, u32>,
    reservation_cooldown_until: HashMap<String, Instant>,
    plan_cooldown_until: HashMap<String, Instant>,
}

/// The cooldown/backoff state for one actor.
pub(crate) struct CooldownState {
    inner: Mutex<Inner>,
}

impl CooldownState {
    pub(crate) fn new() -> Self {
        Self { inner: Mutex::new(Inner::default()) }
    }

    /// The later of `reservation_cooldown_until[key]` and
    /// `plan_cooldown_until[key]`, if either is still in the future.
    pub(crate) fn gate_until(&self, key: &str, now: Instant) -> Option<Instant> {
        let inner = self.inner.lock();
        let reservation = inner.reservation_cooldown_until.get(key).copied();
        let plan = inner.plan_cooldown_until.get(key).copied();
        [reservation, plan].into_iter().flatten().filter(|&t| t > now).max()
    }

    /// Record a failed reservation acquire for `key`. Returns the jitter
    /// sleep to apply, and sets a cooldown once the failure count reaches
    /// [`RESERVATION_FAILURE_THRESHOLD`] (resetting the count).
    pub(crate) fn record_reservation_failure(&self, key: &str, now: Instant, rng: &mut ChaCha8Rng) -> Duration {
        let mut inner = self.inner.lock();
        let count = inner.reservation_failure_counts.entry(key.to_owned()).or_insert(0);
        *count += 1;
        if *count >= RESERVATION_FAILURE_THRESHOLD {
            *count = 0;
            let cooldown_ms = rng.random_range(RESERVATION_COOLDOWN_MS);
            inner.reservation_cooldown_until.insert(key.to_owned(), now + Duration::from_millis(cooldown_ms));
        }
        let jitter_ms = rng.random_range(RESERVATION_RETRY_JITTER_MS);
        Duration::from_millis(jitter_ms)
    }

    /// Clear the failure count and any stale cooldown for `key` after a
    /// successful acquire.
    pub(crate) fn clear_reservation_failure(&self, key: &str) {
        let mut inner = self.inner.lock();
        inner.reservation_failure_counts.remove(key);
        inner.reservation_cooldown_until.remove(key);
    }

    /// Register (or extend) a plan cooldown for `key` until `until`.
    pub(crate) fn set_plan_cooldown(&self, key: &str, until: Instant) {
        self.inner.lock().plan_cooldown_until.insert(key.to_owned(), until);
    }

    /// Snapshot this actor's cooldown state for persistence. Absolute
    /// deadlines are rebased to "seconds remaining from now", since an
    /// `Instant` has no meaning across a process restart.
    pub(crate) fn capture_state(&self) -> CooldownSnapshot {
        let inner = self.inner.lock();
        let now = Instant::now();
        CooldownSnapshot {
            reservation_failure_counts: inner.reservation_failure_counts.iter().map(|(k, v)| (k.clone(), *v)).collect(),
            reservation_cooldown_remaining: remaining_seconds(&inner.reservation_cooldown_until, now),
            plan_cooldown_remaining: remaining_seconds(&inner.plan_cooldown_until, now),
        }
    }

    /// Restore a previously captured snapshot, rebasing its "seconds
    /// remaining" deadlines against the current instant.
    pub(crate) fn apply_state(&self, snapshot: CooldownSnapshot) {
        let mut inner = self.inner.lock();
        let now = Instant::now();
        inner.reservation_failure_counts = snapshot.reservation_failure_counts.into_iter().collect();
        inner.reservation_cooldown_until = until_map(snapshot.reservation_cooldown_remaining, now);
        inner.plan_cooldown_until = until_map(snapshot.plan_cooldown_remaining, now);
    }
}

fn remaining_seconds(map: &HashMap<String, Instant>, now: Instant) -> Vec<(String, f64)> {
    map.iter()
        .filter(|(_, &until)| until > now)
        .map(|(key, &until)| (key.clone(), (until - now).as_secs_f64()))
        .collect()
}

fn until_map(entries: Vec<(String, f64)>, now: Instant) -> HashMap<String, Instant> {
    entries.into_iter().map(|(key, secs)| (key, now + Duration::from_secs_f64(secs.max(0.0)))).collect()
}

/// A persistable snapshot of one actor's cooldown/backoff state (the
/// `actors.json` persistence chunk's cooldown payload).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CooldownSnapshot {
    /// Consecutive reservation-acquire failures per step key, not yet
    /// enough to trigger a cooldown.
    pub reservation_failure_counts: Vec<(String, u32)>,
    /// Reservation cooldowns still active as of capture, in seconds
    /// remaining.
    pub reservation_cooldown_remaining: Vec<(String, f64)>,
    /// Plan cooldowns still active as of capture, in seconds remaining.
    pub plan_cooldown_remaining: Vec<(String, f64)>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand_chacha::rand_core::SeedableRng;

    #[test]
    fn gate_until_is_none_before_any_failure() {
        let state = CooldownState::new();
        assert!(state.gate_until("harvest|plot_1", Instant::now()).is_none());
    }

    #[test]
    fn three_failures_trigger_a_cooldown() {
        let state = CooldownState::new();
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let now = Instant::now();
        for _ in 0..2 {
            state.record_reservation_failure("harvest|plot_1", now, &mut rng);
        }
        assert!(state.gate_until("harvest|plot_1", now).is_none());
        state.record_reservation_failure("harvest|plot_1", now, &mut rng);
        assert!(state.gate_until("harvest|plot_1", now).is_some());
    }

    #[test]
    fn clearing_failure_removes_cooldown() {
        let state = CooldownState::new();
        let mut rng = ChaCha8Rng::seed_from_u64(2);
        let now = Instant::now();
        for _ in 0..3 {
            state.record_reservation_failure("harvest|plot_1", now, &mut rng);
        }
        assert!(state.gate_until("harvest|plot_1", now).is_some());
        state.clear_reservation_failure("harvest|plot_1");
        assert!(state.gate_until("harvest|plot_1", now).is_none());
    }

    #[test]
    fn capture_and_apply_state_preserves_active_cooldowns() {
        let state = CooldownState::new();
        let now = Instant::now();
        state.set_plan_cooldown("harvest|plot_1", now + Duration::from_secs(30));
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        state.record_reservation_failure("harvest|plot_1", now, &mut rng);

        let snapshot = state.capture_state();
        let restored = CooldownState::new();
        restored.apply_state(snapshot);

        assert!(restored.gate_until("harvest|plot_1", now).is_some());
    }

    #[test]
    fn plan_cooldown_gates_until_it_elapses() {
        let state = CooldownState::new();
        let now = Instant::now();
        state.set_plan_cooldown("harvest|plot_1", now + Duration::from_millis(50));
        assert!(state.gate_until("harvest|plot_1", now).is_some());
        assert!(state.gate_until("harvest|plot_1", now + Duration::from_millis(100)).is_none());
    }
}

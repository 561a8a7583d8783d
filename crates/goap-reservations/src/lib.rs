//! The reservation service: a lock-free table of which actor's plan
//! currently holds each contested entity, and under which mode.
//!
//! `Hard` reservations are exclusive — no other owner may acquire the
//! entity while one is held. `Soft` reservations may be pre-empted by a
//! request with a strictly higher priority; the pre-empted holder simply
//! loses the entity (its step will fail its own reservation re-check and
//! back off, per `ActorHost`'s cooldown-on-failure behavior).

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use goap_types::{EntityId, PlanId, Reservation, ReservationMode, ReservationToken};

/// The lock-free reservation table.
pub struct ReservationService {
    table: DashMap<EntityId, ReservationToken>,
}

/// The outcome of a single-thing acquire attempt within a batch.
enum AcquireOutcome {
    /// A fresh token was inserted (the thing was free, or a `Soft` holder
    /// was pre-empted).
    Acquired,
    /// The thing was already held by the requesting owner; staged for
    /// refresh once the whole batch succeeds.
    SelfMatch,
    /// The thing is held, in a mode/priority that blocks this request.
    Failed,
}

impl Default for ReservationService {
    fn default() -> Self {
        Self::new()
    }
}

impl ReservationService {
    /// Build an empty reservation table.
    #[must_use]
    pub fn new() -> Self {
        Self { table: DashMap::new() }
    }

    /// Attempt to acquire every reservation in `requests` for `owner`'s
    /// `plan_id`, in ascending entity-id order (so two actors racing for an
    /// overlapping set can never deadlock against each other).
    ///
    /// All-or-nothing: on the first failure, every reservation already
    /// acquired by this call is released before returning `false`. A thing
    /// already held by `owner` itself (under an earlier plan) is left
    /// untouched until the whole batch succeeds, then refreshed in place
    /// with the new `plan_id`, `mode`, `priority`, and timestamp — never
    /// rejected as if held by a stranger, and never refreshed on a batch
    /// that ultimately fails.
    pub fn try_acquire_all(
        &self,
        owner: &EntityId,
        plan_id: PlanId,
        requests: &[Reservation],
    ) -> bool {
        let mut sorted: Vec<&Reservation> = requests.iter().collect();
        sorted.sort_by(|a, b| a.thing.cmp(&b.thing));

        let mut acquired: Vec<EntityId> = Vec::with_capacity(sorted.len());
        let mut self_matches: Vec<&Reservation> = Vec::new();
        for request in sorted {
            match self.try_acquire_one(owner, plan_id, request) {
                AcquireOutcome::Acquired => {
                    acquired.push(request.thing.clone());
                }
                AcquireOutcome::SelfMatch => self_matches.push(request),
                AcquireOutcome::Failed => {
                    self.release_all(owner, plan_id, &acquired);
                    return false;
                }
            }
        }
        for request in self_matches {
            self.refresh_self_token(owner, plan_id, request);
        }
        true
    }

    fn try_acquire_one(&self, owner: &EntityId, plan_id: PlanId, request: &Reservation) -> AcquireOutcome {
        match self.table.entry(request.thing.clone()) {
            Entry::Vacant(slot) => {
                slot.insert(token(owner, plan_id, request));
                AcquireOutcome::Acquired
            }
            Entry::Occupied(mut slot) => {
                let existing = slot.get();
                if &existing.owner == owner {
                    return AcquireOutcome::SelfMatch;
                }
                match existing.mode {
                    ReservationMode::Hard => AcquireOutcome::Failed,
                    ReservationMode::Soft => {
                        if request.priority > existing.priority {
                            slot.insert(token(owner, plan_id, request));
                            AcquireOutcome::Acquired
                        } else {
                            AcquireOutcome::Failed
                        }
                    }
                }
            }
        }
    }

    /// Overwrite an already-self-owned token with the new plan's `plan_id`,
    /// `mode`, `priority`, and a fresh timestamp.
    fn refresh_self_token(&self, owner: &EntityId, plan_id: PlanId, request: &Reservation) {
        if let Some(mut slot) = self.table.get_mut(&request.thing) {
            *slot = token(owner, plan_id, request);
        }
    }

    /// Release every listed reservation currently held by `owner`'s
    /// `plan_id`. Entries held by anyone else are left untouched — this is
    /// how a pre-empted owner's later release becomes a no-op.
    pub fn release_all(&self, owner: &EntityId, plan_id: PlanId, things: &[EntityId]) {
        for thing in things {
            self.table.remove_if(thing, |_, held| &held.owner == owner && held.plan_id == plan_id);
        }
    }

    /// Whether `thing` is currently held, in `Hard` mode, by someone other
    /// than `requester`. A `Soft` hold, or a hold owned by `requester`
    /// itself, does not count.
    #[must_use]
    pub fn has_active_reservation(&self, thing: &EntityId, requester: &EntityId) -> bool {
        self.table
            .get(thing)
            .is_some_and(|held| &held.owner != requester && held.mode == ReservationMode::Hard)
    }

    /// Snapshot every held reservation, for persistence.
    #[must_use]
    pub fn capture_state(&self) -> Vec<ReservationToken> {
        self.table.iter().map(|entry| entry.value().clone()).collect()
    }

    /// Replace the table's contents from a previously captured snapshot.
    pub fn apply_state(&self, tokens: Vec<ReservationToken>) {
        self.table.clear();
        for token in tokens {
            self.table.insert(token.thing.clone(), token);
        }
    }
}

fn token(owner: &EntityId, plan_id: PlanId, request: &Reservation) -> ReservationToken {
    ReservationToken {
        thing: request.thing.clone(),
        owner: owner.clone(),
        plan_id,
        mode: request.mode,
        priority: request.priority,
        created_utc: chrono::Utc::now(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reservation(thing: &str, mode: ReservationMode, priority: i32) -> Reservation {
        Reservation {
            thing: EntityId::new(thing),
            mode,
            priority,
        }
    }

    #[test]
    fn hard_reservation_blocks_a_second_owner() {
        let service = ReservationService::new();
        let alice = EntityId::new("alice");
        let bob = EntityId::new("bob");
        let plot = reservation("plot_1", ReservationMode::Hard, 0);

        assert!(service.try_acquire_all(&alice, PlanId::new(), &[plot.clone()]));
        assert!(!service.try_acquire_all(&bob, PlanId::new(), &[plot]));
    }

    #[test]
    fn soft_reservation_is_preempted_by_higher_priority() {
        let service = ReservationService::new();
        let alice = EntityId::new("alice");
        let bob = EntityId::new("bob");

        assert!(service.try_acquire_all(
            &alice,
            PlanId::new(),
            &[reservation("bench", ReservationMode::Soft, 1)]
        ));
        assert!(service.try_acquire_all(
            &bob,
            PlanId::new(),
            &[reservation("bench", ReservationMode::Soft, 5)]
        ));
        assert!(!service.has_active_reservation(&EntityId::new("unrelated"), &alice));
        // A soft hold never counts as an "active reservation" against anyone, including
        // its own holder, since only Hard mode is exclusive.
        assert!(!service.has_active_reservation(&EntityId::new("bench"), &alice));
    }

    #[test]
    fn soft_reservation_resists_equal_or_lower_priority() {
        let service = ReservationService::new();
        let alice = EntityId::new("alice");
        let bob = EntityId::new("bob");

        assert!(service.try_acquire_all(
            &alice,
            PlanId::new(),
            &[reservation("bench", ReservationMode::Soft, 5)]
        ));
        assert!(!service.try_acquire_all(
            &bob,
            PlanId::new(),
            &[reservation("bench", ReservationMode::Soft, 5)]
        ));
    }

    #[test]
    fn failed_batch_releases_partial_acquisitions() {
        let service = ReservationService::new();
        let alice = EntityId::new("alice");
        let bob = EntityId::new("bob");

        assert!(service.try_acquire_all(
            &alice,
            PlanId::new(),
            &[reservation("locked", ReservationMode::Hard, 0)]
        ));
        assert!(!service.try_acquire_all(
            &bob,
            PlanId::new(),
            &[
                reservation("free_one", ReservationMode::Hard, 0),
                reservation("locked", ReservationMode::Hard, 0),
            ]
        ));
        assert!(!service.has_active_reservation(&EntityId::new("free_one"), &bob));
    }

    #[test]
    fn hard_reservation_is_active_against_everyone_but_its_owner() {
        let service = ReservationService::new();
        let alice = EntityId::new("alice");
        let bob = EntityId::new("bob");

        assert!(service.try_acquire_all(
            &alice,
            PlanId::new(),
            &[reservation("plot_1", ReservationMode::Hard, 0)]
        ));
        assert!(service.has_active_reservation(&EntityId::new("plot_1"), &bob));
        assert!(!service.has_active_reservation(&EntityId::new("plot_1"), &alice));
    }

    #[test]
    fn self_reacquire_under_a_new_plan_id_refreshes_instead_of_rejecting() {
        let service = ReservationService::new();
        let alice = EntityId::new("alice");
        let first_plan = PlanId::new();
        let second_plan = PlanId::new();

        assert!(service.try_acquire_all(
            &alice,
            first_plan,
            &[reservation("plot_1", ReservationMode::Hard, 0)]
        ));
        assert!(service.try_acquire_all(
            &alice,
            second_plan,
            &[reservation("plot_1", ReservationMode::Hard, 7)]
        ));

        let refreshed = service
            .capture_state()
            .into_iter()
            .find(|token| token.thing == EntityId::new("plot_1"))
            .map(|token| (token.plan_id, token.priority));
        assert_eq!(refreshed, Some((second_plan, 7)));

        // The stale plan_id no longer owns anything, so releasing under it is a no-op.
        service.release_all(&alice, first_plan, &[EntityId::new("plot_1")]);
        assert!(service.has_active_reservation(&EntityId::new("plot_1"), &EntityId::new("bob")));
    }

    #[test]
    fn self_reacquire_in_a_failing_batch_leaves_the_held_token_untouched() {
        let service = ReservationService::new();
        let alice = EntityId::new("alice");
        let bob = EntityId::new("bob");
        let first_plan = PlanId::new();

        assert!(service.try_acquire_all(
            &alice,
            first_plan,
            &[reservation("plot_1", ReservationMode::Hard, 0)]
        ));
        assert!(service.try_acquire_all(
            &bob,
            PlanId::new(),
            &[reservation("plot_2", ReservationMode::Hard, 0)]
        ));

        let second_plan = PlanId::new();
        assert!(!service.try_acquire_all(
            &alice,
            second_plan,
            &[
                reservation("plot_1", ReservationMode::Hard, 9),
                reservation("plot_2", ReservationMode::Hard, 9),
            ]
        ));

        let still_first_plan = service
            .capture_state()
            .into_iter()
            .find(|token| token.thing == EntityId::new("plot_1"))
            .map(|token| token.plan_id);
        assert_eq!(still_first_plan, Some(first_plan));
    }

    #[test]
    fn release_all_is_a_no_op_for_non_owned_entries() {
        let service = ReservationService::new();
        let alice = EntityId::new("alice");
        let bob = EntityId::new("bob");
        let alice_plan = PlanId::new();

        assert!(service.try_acquire_all(
            &alice,
            alice_plan,
            &[reservation("plot_1", ReservationMode::Hard, 0)]
        ));
        service.release_all(&bob, PlanId::new(), &[EntityId::new("plot_1")]);
        assert!(service.has_active_reservation(&EntityId::new("plot_1"), &bob));
    }
}

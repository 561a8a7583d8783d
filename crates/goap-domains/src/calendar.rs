//! Calendar event tracking.
//!
//! The clock collaborator ([`goap_clock::Clock`]) already derives
//! `WorldTime`'s day/month/season fields; this system only tracks which
//! calendar-defined events are active on the current day and which actors
//! have acknowledged them, giving it state worth a `calendar.json`
//! persistence chunk distinct from `clock.json`.

use std::collections::{BTreeMap, BTreeSet};

use goap_types::{EntityId, WorldTime};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

/// A recurring calendar event, keyed by day-of-year.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalendarEventDef {
    /// Event identifier.
    pub event_id: String,
    /// Day of year (1-based) this event occurs on.
    pub day_of_year: u32,
    /// Display name, for logging.
    pub name: String,
}

struct Inner {
    active_today: BTreeSet<String>,
    last_day_of_year: Option<u32>,
    acknowledged: BTreeMap<String, BTreeSet<EntityId>>,
}

/// The persisted shape of [`CalendarSystem`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CalendarState {
    /// Event ids active as of the last tick.
    pub active_today: BTreeSet<String>,
    /// The day-of-year the last tick observed.
    pub last_day_of_year: Option<u32>,
    /// Event id → actors who have acknowledged it.
    pub acknowledged: BTreeMap<String, BTreeSet<EntityId>>,
}

/// Tracks which calendar events are active today and who has attended them.
pub struct CalendarSystem {
    defs: Vec<CalendarEventDef>,
    gate: Mutex<Inner>,
}

impl CalendarSystem {
    /// Build a system from a fixed event list.
    #[must_use]
    pub fn new(defs: Vec<CalendarEventDef>) -> Self {
        Self {
            defs,
            gate: Mutex::new(Inner {
                active_today: BTreeSet::new(),
                last_day_of_year: None,
                acknowledged: BTreeMap::new(),
            }),
        }
    }

    /// Recompute which events are active for the current day-of-year.
    pub fn tick(&self, world_time: &WorldTime) {
        let mut inner = self.gate.lock();
        if inner.last_day_of_year == Some(world_time.day_of_year) {
            return;
        }
        inner.last_day_of_year = Some(world_time.day_of_year);
        inner.active_today =
            self.defs.iter().filter(|e| e.day_of_year == world_time.day_of_year).map(|e| e.event_id.clone()).collect();
    }

    /// The event ids active today.
    #[must_use]
    pub fn active_today(&self) -> BTreeSet<String> {
        self.gate.lock().active_today.clone()
    }

    /// Record that `actor` has acknowledged (attended) `event_id`. Returns
    /// `false` if the event is not active today.
    pub fn acknowledge(&self, actor: &EntityId, event_id: &str) -> bool {
        let mut inner = self.gate.lock();
        if !inner.active_today.contains(event_id) {
            return false;
        }
        inner.acknowledged.entry(event_id.to_owned()).or_default().insert(actor.clone());
        true
    }

    /// Whether `actor` has already acknowledged `event_id`.
    #[must_use]
    pub fn has_acknowledged(&self, actor: &EntityId, event_id: &str) -> bool {
        self.gate.lock().acknowledged.get(event_id).is_some_and(|actors| actors.contains(actor))
    }

    /// Snapshot this system's state, for persistence.
    #[must_use]
    pub fn capture_state(&self) -> CalendarState {
        let inner = self.gate.lock();
        CalendarState {
            active_today: inner.active_today.clone(),
            last_day_of_year: inner.last_day_of_year,
            acknowledged: inner.acknowledged.clone(),
        }
    }

    /// Restore this system from a previously captured snapshot.
    pub fn apply_state(&self, state: CalendarState) {
        let mut inner = self.gate.lock();
        inner.active_today = state.active_today;
        inner.last_day_of_year = state.last_day_of_year;
        inner.acknowledged = state.acknowledged;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn time(day_of_year: u32) -> WorldTime {
        WorldTime {
            total_world_seconds: 0.0,
            total_world_days: 0.0,
            time_scale: 1.0,
            seconds_per_day: 86_400.0,
            time_of_day: 0.0,
            day_of_year,
            day_of_month: 1,
            month: 1,
            season_index: 0,
            season_name: "Spring".into(),
            year: 1,
            days_per_month: 28,
            season_length_days: 28,
            days_per_year: 112,
        }
    }

    fn defs() -> Vec<CalendarEventDef> {
        vec![CalendarEventDef { event_id: "harvest_fair".into(), day_of_year: 10, name: "Harvest Fair".into() }]
    }

    #[test]
    fn event_becomes_active_on_its_day() {
        let calendar = CalendarSystem::new(defs());
        calendar.tick(&time(10));
        assert!(calendar.active_today().contains("harvest_fair"));
    }

    #[test]
    fn acknowledge_requires_event_to_be_active() {
        let calendar = CalendarSystem::new(defs());
        let actor = EntityId::new("alice");
        assert!(!calendar.acknowledge(&actor, "harvest_fair"));
        calendar.tick(&time(10));
        assert!(calendar.acknowledge(&actor, "harvest_fair"));
        assert!(calendar.has_acknowledged(&actor, "harvest_fair"));
    }
}

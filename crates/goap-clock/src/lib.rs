//! The clock collaborator.
//!
//! Per the spec, the clock's tick *source* is external — only its
//! `snapshot() -> WorldTime` contract matters to the core. This crate
//! defines that contract as the [`Clock`] trait and provides [`SimClock`],
//! a simple wall-clock-scaled default implementation useful for
//! `goap-sim` and for tests that don't want to hand-roll a `WorldTime`.

use std::time::Instant;

use goap_types::WorldTime;
use parking_lot::Mutex;

/// Read-only access to the simulated calendar/time-of-day, plus a
/// persistence restore hook.
pub trait Clock: Send + Sync {
    /// Return the current `WorldTime`.
    fn snapshot(&self) -> WorldTime;

    /// Restore the clock to a previously captured `WorldTime`, for
    /// persistence load. The tick *source* resets relative to this value.
    fn apply_snapshot(&self, time: WorldTime);
}

/// Calendar constants for [`SimClock`]'s default calendar.
#[derive(Debug, Clone, Copy)]
pub struct Calendar {
    /// Simulated seconds in one simulated day.
    pub seconds_per_day: f64,
    /// Days in one month.
    pub days_per_month: u32,
    /// Months in one season.
    pub months_per_season: u32,
    /// Seasons in one year.
    pub seasons_per_year: u32,
    /// Season display names, indexed by season index.
    pub season_names: [&'static str; 4],
}

impl Default for Calendar {
    fn default() -> Self {
        Self {
            seconds_per_day: 86_400.0,
            days_per_month: 28,
            months_per_season: 1,
            seasons_per_year: 4,
            season_names: ["Spring", "Summer", "Autumn", "Winter"],
        }
    }
}

struct ClockState {
    /// Simulated seconds elapsed at the last `apply_snapshot`/start.
    base_world_seconds: f64,
    /// Real `Instant` corresponding to `base_world_seconds`.
    base_instant: Instant,
}

/// A clock driven by the real wall clock, scaled by `time_scale` simulated
/// seconds per real second.
///
/// This is the "tick source" the spec treats as external — any other
/// driver (a fixed-step simulation loop, a replay log) can implement
/// [`Clock`] instead without the rest of the core noticing.
pub struct SimClock {
    calendar: Calendar,
    time_scale: f64,
    state: Mutex<ClockState>,
}

impl SimClock {
    /// Start a clock at simulated time zero, advancing at `time_scale`
    /// simulated seconds per real second.
    #[must_use]
    pub fn new(time_scale: f64, calendar: Calendar) -> Self {
        Self {
            calendar,
            time_scale,
            state: Mutex::new(ClockState {
                base_world_seconds: 0.0,
                base_instant: Instant::now(),
            }),
        }
    }

    fn current_world_seconds(&self, state: &ClockState) -> f64 {
        let elapsed_real = state.base_instant.elapsed().as_secs_f64();
        state.base_world_seconds + elapsed_real * self.time_scale
    }

    fn build_snapshot(&self, total_world_seconds: f64) -> WorldTime {
        let seconds_per_day = self.calendar.seconds_per_day;
        let total_world_days = total_world_seconds / seconds_per_day;
        let time_of_day = total_world_days.fract().max(0.0);

        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let day_index = total_world_days.max(0.0) as u64;
        let days_per_month = u64::from(self.calendar.days_per_month);
        let months_per_season = u64::from(self.calendar.months_per_season);
        let seasons_per_year = u64::from(self.calendar.seasons_per_year);
        let days_per_season = days_per_month.saturating_mul(months_per_season).max(1);
        let days_per_year = days_per_season.saturating_mul(seasons_per_year).max(1);

        let day_of_year = day_index % days_per_year;
        let year = day_index / days_per_year;
        let season_index = day_of_year / days_per_season;
        let day_in_season = day_of_year % days_per_season;
        let month = day_in_season / days_per_month.max(1);
        let day_of_month = day_in_season % days_per_month.max(1);

        #[allow(clippy::cast_possible_truncation)]
        let season_name = self
            .calendar
            .season_names
            .get(season_index as usize % self.calendar.season_names.len())
            .copied()
            .unwrap_or("Unknown")
            .to_owned();

        WorldTime {
            total_world_seconds,
            total_world_days,
            time_scale: self.time_scale,
            seconds_per_day,
            time_of_day,
            #[allow(clippy::cast_possible_truncation)]
            day_of_year: day_of_year as u32 + 1,
            #[allow(clippy::cast_possible_truncation)]
            day_of_month: day_of_month as u32 + 1,
            #[allow(clippy::cast_possible_truncation)]
            month: month as u32 + 1,
            #[allow(clippy::cast_possible_truncation)]
            season_index: season_index as u32,
            season_name,
            #[allow(clippy::cast_possible_truncation)]
            year: year as u32 + 1,
            days_per_month: self.calendar.days_per_month,
            #[allow(clippy::cast_possible_truncation)]
            season_length_days: days_per_season as u32,
            #[allow(clippy::cast_possible_truncation)]
            days_per_year: days_per_year as u32,
        }
    }
}

impl Clock for SimClock {
    fn snapshot(&self) -> WorldTime {
        let state = self.state.lock();
        let seconds = self.current_world_seconds(&state);
        self.build_snapshot(seconds)
    }

    fn apply_snapshot(&self, time: WorldTime) {
        let mut state = self.state.lock();
        state.base_world_seconds = time.total_world_seconds;
        state.base_instant = Instant::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_clock_starts_at_day_zero() {
        let clock = SimClock::new(0.0, Calendar::default());
        let time = clock.snapshot();
        assert_eq!(time.total_world_days, 0.0);
        assert_eq!(time.day_of_year, 1);
        assert_eq!(time.season_name, "Spring");
    }

    #[test]
    fn apply_snapshot_restores_exact_time() {
        let clock = SimClock::new(0.0, Calendar::default());
        let restored = WorldTime {
            total_world_seconds: 200_000.0,
            total_world_days: 200_000.0 / 86_400.0,
            time_scale: 0.0,
            seconds_per_day: 86_400.0,
            time_of_day: 0.0,
            day_of_year: 1,
            day_of_month: 1,
            month: 1,
            season_index: 0,
            season_name: "Spring".into(),
            year: 1,
            days_per_month: 28,
            season_length_days: 28,
            days_per_year: 112,
        };
        clock.apply_snapshot(restored);
        let after = clock.snapshot();
        assert!((after.total_world_seconds - 200_000.0).abs() < 1.0);
    }

    #[test]
    fn season_advances_after_days_per_season() {
        let cal = Calendar::default();
        let clock = SimClock::new(0.0, cal);
        clock.apply_snapshot(WorldTime {
            total_world_seconds: cal.seconds_per_day * f64::from(cal.days_per_month),
            total_world_days: f64::from(cal.days_per_month),
            time_scale: 0.0,
            seconds_per_day: cal.seconds_per_day,
            time_of_day: 0.0,
            day_of_year: 1,
            day_of_month: 1,
            month: 1,
            season_index: 0,
            season_name: "Spring".into(),
            year: 1,
            days_per_month: cal.days_per_month,
            season_length_days: cal.days_per_month,
            days_per_year: cal.days_per_month * cal.seasons_per_year,
        });
        let time = clock.snapshot();
        assert_eq!(time.season_name, "Summer");
    }
}

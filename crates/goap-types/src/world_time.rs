//! `WorldTime`: the simulated calendar/time-of-day snapshot exposed by the
//! clock collaborator. Defined here (rather than in `goap-clock`) so that
//! any crate can embed a `WorldTime` value without depending on the clock
//! trait itself.

use serde::{Deserialize, Serialize};

/// A read-only snapshot of the simulated calendar and time of day.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WorldTime {
    /// Total simulated seconds elapsed since epoch.
    pub total_world_seconds: f64,
    /// Total simulated days elapsed since epoch.
    pub total_world_days: f64,
    /// Simulated-seconds-per-real-second multiplier.
    pub time_scale: f64,
    /// Number of simulated seconds in one simulated day.
    pub seconds_per_day: f64,
    /// Fraction of the current day elapsed, `0.0..1.0`.
    pub time_of_day: f64,
    /// 1-based day of the current year.
    pub day_of_year: u32,
    /// 1-based day of the current month.
    pub day_of_month: u32,
    /// 1-based month of the current year.
    pub month: u32,
    /// 0-based season index.
    pub season_index: u32,
    /// Human-readable season name.
    pub season_name: String,
    /// Calendar year.
    pub year: u32,
    /// Number of days in a month under the current calendar.
    pub days_per_month: u32,
    /// Number of days in a season under the current calendar.
    pub season_length_days: u32,
    /// Number of days in a year under the current calendar.
    pub days_per_year: u32,
}

impl WorldTime {
    /// Format as `HH:mm:ss.fff` for log lines, derived from `time_of_day`.
    #[must_use]
    pub fn format_clock(&self) -> String {
        let total_ms = (self.time_of_day.clamp(0.0, 1.0) * self.seconds_per_day * 1000.0).round();
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let total_ms = total_ms.max(0.0) as u64;
        let ms = total_ms % 1000;
        let total_secs = total_ms / 1000;
        let secs = total_secs % 60;
        let total_mins = total_secs / 60;
        let mins = total_mins % 60;
        let hours = (total_mins / 60) % 24;
        format!("{hours:02}:{mins:02}:{secs:02}.{ms:03}")
    }

    /// Day-of-week index (`0 = first day of the calendar's week cycle`),
    /// derived from the running day count.
    #[must_use]
    pub fn day_of_week(&self) -> u8 {
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let day = self.total_world_days.max(0.0) as u64;
        #[allow(clippy::cast_possible_truncation)]
        let dow = (day % 7) as u8;
        dow
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> WorldTime {
        WorldTime {
            total_world_seconds: 3_723.5,
            total_world_days: 10.0,
            time_scale: 60.0,
            seconds_per_day: 86_400.0,
            time_of_day: 0.5,
            day_of_year: 11,
            day_of_month: 11,
            month: 1,
            season_index: 0,
            season_name: "Spring".into(),
            year: 1,
            days_per_month: 28,
            season_length_days: 28,
            days_per_year: 112,
        }
    }

    #[test]
    fn format_clock_is_noon_at_half_day() {
        let t = sample();
        assert_eq!(t.format_clock(), "12:00:00.000");
    }

    #[test]
    fn day_of_week_wraps_at_seven() {
        let mut t = sample();
        t.total_world_days = 7.0;
        assert_eq!(t.day_of_week(), 0);
        t.total_world_days = 9.0;
        assert_eq!(t.day_of_week(), 2);
    }
}

//! Inactivity self-destruct evaluation.
//!
//! Pure arithmetic over (last activity, threshold in days, now). Callers
//! refresh the first two from the store now and then and re-evaluate against
//! the wall clock as often as they like.

use chrono::{DateTime, TimeDelta, Utc};
use serde::Serialize;

pub const DAY_MS: i64 = 86_400_000;
const HOUR_MS: i64 = 3_600_000;
const MINUTE_MS: i64 = 60_000;
const SECOND_MS: i64 = 1_000;

/// Presentation hint derived from how much of the window has elapsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Urgency {
    Normal,
    Elevated,
    Severe,
}

impl Urgency {
    /// Bands are exclusive on their lower bound: 50 is normal, 80 is elevated.
    pub fn from_progress(progress: f64) -> Self {
        if progress > 80.0 {
            Urgency::Severe
        } else if progress > 50.0 {
            Urgency::Elevated
        } else {
            Urgency::Normal
        }
    }
}

/// Time left, split by floor division. Days are not carried any further.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Remaining {
    pub days: i64,
    pub hours: i64,
    pub minutes: i64,
    pub seconds: i64,
}

impl Remaining {
    pub const ZERO: Remaining = Remaining {
        days: 0,
        hours: 0,
        minutes: 0,
        seconds: 0,
    };

    pub fn from_millis(ms: i64) -> Self {
        let ms = ms.max(0);
        Self {
            days: ms / DAY_MS,
            hours: (ms % DAY_MS) / HOUR_MS,
            minutes: (ms % HOUR_MS) / MINUTE_MS,
            seconds: (ms % MINUTE_MS) / SECOND_MS,
        }
    }

    /// The whole window with nothing elapsed.
    pub fn full(days: u32) -> Self {
        Self::from_millis(window_ms(days))
    }

    pub fn is_zero(&self) -> bool {
        *self == Self::ZERO
    }
}

impl std::fmt::Display for Remaining {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{:02}:{:02}:{:02}:{:02}",
            self.days, self.hours, self.minutes, self.seconds
        )
    }
}

/// Verdict plus everything a countdown display needs.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Countdown {
    pub destructed: bool,
    pub remaining: Remaining,
    /// Percentage of the window elapsed, within 0..=100.
    pub progress: f64,
    pub urgency: Urgency,
    #[serde(with = "chrono::serde::ts_milliseconds_option")]
    pub last_activity: Option<DateTime<Utc>>,
    #[serde(with = "chrono::serde::ts_milliseconds_option")]
    pub deadline: Option<DateTime<Utc>>,
}

fn window_ms(days: u32) -> i64 {
    i64::from(days) * DAY_MS
}

/// Evaluate the self-destruct timer at `now`.
pub fn evaluate(
    last_activity: Option<DateTime<Utc>>,
    threshold_days: u32,
    now: DateTime<Utc>,
) -> Countdown {
    let total_ms = window_ms(threshold_days);

    let Some(last) = last_activity else {
        // Nothing ever happened: the clock has not started.
        return Countdown {
            destructed: false,
            remaining: Remaining::from_millis(total_ms),
            progress: 0.0,
            urgency: Urgency::Normal,
            last_activity: None,
            deadline: None,
        };
    };

    let deadline = last
        .checked_add_signed(TimeDelta::milliseconds(total_ms))
        .unwrap_or(DateTime::<Utc>::MAX_UTC);
    let remaining_ms = (deadline - now).num_milliseconds();

    if remaining_ms <= 0 {
        return Countdown {
            destructed: true,
            remaining: Remaining::ZERO,
            progress: 100.0,
            urgency: Urgency::Severe,
            last_activity: Some(last),
            deadline: Some(deadline),
        };
    }

    // Last activity stamped after `now` (clock skew): show the untouched window.
    if remaining_ms > total_ms {
        return Countdown {
            destructed: false,
            remaining: Remaining::from_millis(total_ms),
            progress: 0.0,
            urgency: Urgency::Normal,
            last_activity: Some(last),
            deadline: Some(deadline),
        };
    }

    let elapsed_ms = total_ms - remaining_ms;
    let progress = (elapsed_ms as f64 * 100.0 / total_ms as f64).clamp(0.0, 100.0);

    Countdown {
        destructed: false,
        remaining: Remaining::from_millis(remaining_ms),
        progress,
        urgency: Urgency::from_progress(progress),
        last_activity: Some(last),
        deadline: Some(deadline),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn remaining_splits_with_floor_division() {
        let ms = 3 * DAY_MS + 4 * HOUR_MS + 5 * MINUTE_MS + 6 * SECOND_MS + 999;
        let r = Remaining::from_millis(ms);
        assert_eq!(
            r,
            Remaining {
                days: 3,
                hours: 4,
                minutes: 5,
                seconds: 6
            }
        );
        assert_eq!(r.to_string(), "03:04:05:06");
    }

    #[test]
    fn days_are_not_carried() {
        let r = Remaining::full(120);
        assert_eq!(r.days, 120);
        assert_eq!(r.to_string(), "120:00:00:00");
    }

    #[test]
    fn negative_millis_clamp_to_zero() {
        assert!(Remaining::from_millis(-5).is_zero());
    }
}

use chrono::{DateTime, TimeDelta, TimeZone, Utc};
use hubqueue::countdown::{DAY_MS, Remaining, Urgency, evaluate};

fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap()
}

fn after(ms: i64) -> DateTime<Utc> {
    t0() + TimeDelta::milliseconds(ms)
}

#[test]
fn no_activity_means_clock_not_started() {
    let c = evaluate(None, 5, t0());
    assert!(!c.destructed);
    assert_eq!(c.remaining.to_string(), "05:00:00:00");
    assert_eq!(c.progress, 0.0);
    assert_eq!(c.urgency, Urgency::Normal);
    assert!(c.deadline.is_none());
}

#[test]
fn past_the_window_is_destructed() {
    let c = evaluate(Some(t0()), 5, after(5 * DAY_MS + 1));
    assert!(c.destructed);
    assert!(c.remaining.is_zero());
    assert_eq!(c.remaining.to_string(), "00:00:00:00");
    assert_eq!(c.progress, 100.0);
    assert_eq!(c.urgency, Urgency::Severe);
}

#[test]
fn exactly_at_the_deadline_is_destructed() {
    let c = evaluate(Some(t0()), 5, after(5 * DAY_MS));
    assert!(c.destructed);
    assert_eq!(c.deadline, Some(after(5 * DAY_MS)));
}

#[test]
fn one_millisecond_before_the_deadline_is_alive() {
    let c = evaluate(Some(t0()), 5, after(5 * DAY_MS - 1));
    assert!(!c.destructed);
    assert_eq!(c.remaining, Remaining::ZERO);
    assert_eq!(c.urgency, Urgency::Severe);
}

#[test]
fn two_days_into_five_is_forty_percent() {
    let c = evaluate(Some(t0()), 5, after(2 * DAY_MS));
    assert!(!c.destructed);
    assert!((c.progress - 40.0).abs() < 1e-9);
    assert_eq!(c.urgency, Urgency::Normal);
    assert_eq!(c.remaining.to_string(), "03:00:00:00");
}

#[test]
fn remaining_is_floored_per_unit() {
    // 1d 2h 3m 4.5s elapsed of 5 days.
    let elapsed = DAY_MS + 2 * 3_600_000 + 3 * 60_000 + 4_500;
    let c = evaluate(Some(t0()), 5, after(elapsed));
    assert_eq!(
        c.remaining,
        Remaining {
            days: 3,
            hours: 21,
            minutes: 56,
            seconds: 55,
        }
    );
}

#[test]
fn urgency_bands_follow_progress() {
    let total = 5 * DAY_MS;
    let at = |pct: i64| evaluate(Some(t0()), 5, after(total * pct / 100)).urgency;

    assert_eq!(at(50), Urgency::Normal);
    assert_eq!(at(51), Urgency::Elevated);
    assert_eq!(at(80), Urgency::Elevated);
    assert_eq!(at(81), Urgency::Severe);
}

#[test]
fn band_edges_are_exclusive() {
    assert_eq!(Urgency::from_progress(0.0), Urgency::Normal);
    assert_eq!(Urgency::from_progress(50.0), Urgency::Normal);
    assert_eq!(Urgency::from_progress(50.1), Urgency::Elevated);
    assert_eq!(Urgency::from_progress(80.0), Urgency::Elevated);
    assert_eq!(Urgency::from_progress(80.1), Urgency::Severe);
}

#[test]
fn activity_in_the_future_shows_the_full_window() {
    let c = evaluate(Some(after(DAY_MS)), 5, t0());
    assert!(!c.destructed);
    assert_eq!(c.progress, 0.0);
    assert_eq!(c.remaining.to_string(), "05:00:00:00");
}

#[test]
fn threshold_change_reevaluates_immediately() {
    let now = after(3 * DAY_MS);
    assert!(!evaluate(Some(t0()), 5, now).destructed);
    assert!(evaluate(Some(t0()), 2, now).destructed);
}

#[test]
fn countdown_serializes_camel_case() {
    let c = evaluate(Some(t0()), 5, after(DAY_MS));
    let json = serde_json::to_value(c).unwrap();
    assert_eq!(json["destructed"], false);
    assert_eq!(json["urgency"], "normal");
    assert_eq!(json["remaining"]["days"], 4);
    assert_eq!(json["lastActivity"], t0().timestamp_millis());
}

//! Check-in state machine.
//!
//! Pure functions from (settings, now) to a derived check-in state. No
//! I/O, no stored state; the coordinator recomputes this on demand.

use chrono::{DateTime, Duration, Local, NaiveDate};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

use crate::settings::SafetySettings;

/// 24-hour HH:MM, leading zero on the hour optional
static TIME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([0-1]?\d|2[0-3]):[0-5]\d$").expect("time regex is valid"));

/// Derived check-in status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CheckInStatus {
    NotDue,
    Due,
    CheckedIn,
    Missed,
    CheckedInLate,
}

/// Full derived state, recomputed from settings and wall-clock time.
/// Never persisted.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CheckInState {
    pub status: CheckInStatus,
    pub check_in_time: Option<DateTime<Local>>,
    pub scheduled_time: Option<DateTime<Local>>,
    pub deadline_time: Option<DateTime<Local>>,
    pub is_overdue: bool,
}

pub fn is_valid_time_format(time: &str) -> bool {
    TIME_RE.is_match(time)
}

pub fn is_valid_grace_period(minutes: u32) -> bool {
    (1..=1440).contains(&minutes)
}

/// Parse "HH:MM" into (hour, minute). None for anything malformed.
pub fn parse_check_in_time(time: &str) -> Option<(u32, u32)> {
    if !is_valid_time_format(time) {
        return None;
    }
    let (hour, minute) = time.split_once(':')?;
    Some((hour.parse().ok()?, minute.parse().ok()?))
}

/// Resolve a wall-clock hour/minute on a given local date. `earliest`
/// picks the first occurrence across a DST fold.
fn local_instant(date: NaiveDate, hour: u32, minute: u32) -> Option<DateTime<Local>> {
    date.and_hms_opt(hour, minute, 0)?
        .and_local_timezone(Local)
        .earliest()
}

/// Today's scheduled check-in instant
pub fn scheduled_time_today(
    settings: &SafetySettings,
    now: DateTime<Local>,
) -> Option<DateTime<Local>> {
    let (hour, minute) = parse_check_in_time(&settings.daily_check_in_time)?;
    local_instant(now.date_naive(), hour, minute)
}

/// Today's deadline: scheduled time plus the grace period
pub fn deadline_today(settings: &SafetySettings, now: DateTime<Local>) -> Option<DateTime<Local>> {
    scheduled_time_today(settings, now)
        .map(|t| t + Duration::minutes(i64::from(settings.grace_period_minutes)))
}

/// The next occurrence of the configured check-in time: today if that
/// instant has not passed yet, otherwise tomorrow at the same clock time.
pub fn next_occurrence(settings: &SafetySettings, now: DateTime<Local>) -> Option<DateTime<Local>> {
    let (hour, minute) = parse_check_in_time(&settings.daily_check_in_time)?;
    let today = local_instant(now.date_naive(), hour, minute)?;
    if today >= now {
        return Some(today);
    }
    now.date_naive()
        .succ_opt()
        .and_then(|tomorrow| local_instant(tomorrow, hour, minute))
}

/// Same local calendar day: year, month and day-of-month all match
pub fn is_same_local_day(d1: DateTime<Local>, d2: DateTime<Local>) -> bool {
    d1.date_naive() == d2.date_naive()
}

/// True once `now` has reached today's scheduled time. Always false when
/// daily check-ins are disabled.
pub fn is_check_in_due_today(settings: &SafetySettings, now: DateTime<Local>) -> bool {
    if !settings.daily_check_in_enabled {
        return false;
    }
    scheduled_time_today(settings, now)
        .map(|scheduled| now >= scheduled)
        .unwrap_or(false)
}

/// True iff the last recorded check-in falls on the same local calendar
/// day as `now`.
pub fn has_checked_in_today(settings: &SafetySettings, now: DateTime<Local>) -> bool {
    settings
        .last_check_in_at
        .map(|at| is_same_local_day(at.with_timezone(&Local), now))
        .unwrap_or(false)
}

/// True once the deadline has passed with no check-in today. Always false
/// when disabled or already checked in.
pub fn has_missed_deadline(settings: &SafetySettings, now: DateTime<Local>) -> bool {
    if !settings.daily_check_in_enabled || has_checked_in_today(settings, now) {
        return false;
    }
    deadline_today(settings, now)
        .map(|deadline| now >= deadline)
        .unwrap_or(false)
}

/// True iff TODAY's check-in landed after today's deadline. A check-in
/// from a previous day never counts, however late it was then.
pub fn did_check_in_late(settings: &SafetySettings, now: DateTime<Local>) -> bool {
    let checked_at = match settings.last_check_in_at {
        Some(at) => at.with_timezone(&Local),
        None => return false,
    };
    if !is_same_local_day(checked_at, now) {
        return false;
    }
    deadline_today(settings, now)
        .map(|deadline| checked_at > deadline)
        .unwrap_or(false)
}

/// Combine the predicates into one snapshot
pub fn check_in_state(settings: &SafetySettings, now: DateTime<Local>) -> CheckInState {
    let checked_in = has_checked_in_today(settings, now);
    let missed = has_missed_deadline(settings, now);

    let status = if !settings.daily_check_in_enabled {
        CheckInStatus::NotDue
    } else if checked_in {
        if did_check_in_late(settings, now) {
            CheckInStatus::CheckedInLate
        } else {
            CheckInStatus::CheckedIn
        }
    } else if missed {
        CheckInStatus::Missed
    } else if is_check_in_due_today(settings, now) {
        CheckInStatus::Due
    } else {
        CheckInStatus::NotDue
    };

    CheckInState {
        status,
        check_in_time: settings
            .last_check_in_at
            .map(|at| at.with_timezone(&Local)),
        scheduled_time: scheduled_time_today(settings, now),
        deadline_time: deadline_today(settings, now),
        is_overdue: missed,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn local(y: i32, mo: u32, d: u32, h: u32, mi: u32) -> DateTime<Local> {
        Local.with_ymd_and_hms(y, mo, d, h, mi, 0).unwrap()
    }

    fn enabled_settings(time: &str, grace: u32) -> SafetySettings {
        SafetySettings {
            daily_check_in_enabled: true,
            daily_check_in_time: time.to_string(),
            grace_period_minutes: grace,
            ..Default::default()
        }
    }

    #[test]
    fn test_time_format_validation() {
        for ok in ["00:00", "9:05", "09:05", "19:59", "23:59", "10:00"] {
            assert!(is_valid_time_format(ok), "{} should be valid", ok);
        }
        for bad in ["25:00", "10:60", "abc", "", "24:00", "10:5", "1000"] {
            assert!(!is_valid_time_format(bad), "{} should be invalid", bad);
        }
    }

    #[test]
    fn test_grace_period_bounds() {
        assert!(!is_valid_grace_period(0));
        assert!(is_valid_grace_period(1));
        assert!(is_valid_grace_period(1440));
        assert!(!is_valid_grace_period(1441));
    }

    #[test]
    fn test_is_same_local_day() {
        assert!(is_same_local_day(
            local(2024, 1, 15, 10, 0),
            local(2024, 1, 15, 23, 59)
        ));
        assert!(!is_same_local_day(
            local(2024, 1, 15, 23, 59),
            local(2024, 1, 16, 10, 0)
        ));
    }

    #[test]
    fn test_disabled_is_never_due_or_missed() {
        let settings = SafetySettings {
            daily_check_in_enabled: false,
            daily_check_in_time: "00:01".to_string(),
            grace_period_minutes: 1,
            ..Default::default()
        };
        let late_in_the_day = local(2024, 1, 15, 23, 0);

        assert!(!is_check_in_due_today(&settings, late_in_the_day));
        assert!(!has_missed_deadline(&settings, late_in_the_day));
        assert_eq!(
            check_in_state(&settings, late_in_the_day).status,
            CheckInStatus::NotDue
        );
    }

    #[test]
    fn test_not_due_before_scheduled_time() {
        let settings = enabled_settings("10:00", 60);
        assert!(!is_check_in_due_today(&settings, local(2024, 1, 15, 9, 59)));
        assert!(is_check_in_due_today(&settings, local(2024, 1, 15, 10, 0)));
    }

    #[test]
    fn test_checked_in_today_is_not_missed() {
        let now = local(2024, 1, 15, 12, 0);
        let mut settings = enabled_settings("10:00", 60);
        settings.last_check_in_at = Some(now.with_timezone(&Utc));

        assert!(has_checked_in_today(&settings, now));
        assert!(!has_missed_deadline(&settings, now));
    }

    #[test]
    fn test_missed_once_grace_expires() {
        let settings = enabled_settings("09:00", 30);

        // Inside the grace window: due, not missed
        let during_grace = local(2024, 1, 15, 9, 20);
        assert!(!has_missed_deadline(&settings, during_grace));
        assert_eq!(
            check_in_state(&settings, during_grace).status,
            CheckInStatus::Due
        );

        // Past the deadline with no check-in
        let now = local(2024, 1, 15, 9, 45);
        let state = check_in_state(&settings, now);
        assert_eq!(state.status, CheckInStatus::Missed);
        assert!(state.is_overdue);
    }

    #[test]
    fn test_late_check_in_wins_over_checked_in() {
        let now = local(2024, 1, 15, 12, 0);
        let mut settings = enabled_settings("09:00", 30);
        // Checked in at 11:00, deadline was 09:30
        settings.last_check_in_at = Some(local(2024, 1, 15, 11, 0).with_timezone(&Utc));

        assert!(did_check_in_late(&settings, now));
        let state = check_in_state(&settings, now);
        assert_eq!(state.status, CheckInStatus::CheckedInLate);
        assert!(!state.is_overdue);
    }

    #[test]
    fn test_on_time_check_in() {
        let now = local(2024, 1, 15, 9, 10);
        let mut settings = enabled_settings("09:00", 30);
        settings.last_check_in_at = Some(now.with_timezone(&Utc));

        assert!(!did_check_in_late(&settings, now));
        assert_eq!(check_in_state(&settings, now).status, CheckInStatus::CheckedIn);
    }

    #[test]
    fn test_stale_late_check_in_does_not_leak_into_today() {
        // Yesterday's check-in was late; today it has no bearing
        let now = local(2024, 1, 16, 8, 0);
        let mut settings = enabled_settings("09:00", 30);
        settings.last_check_in_at = Some(local(2024, 1, 15, 22, 0).with_timezone(&Utc));

        assert!(!did_check_in_late(&settings, now));
        assert_eq!(check_in_state(&settings, now).status, CheckInStatus::NotDue);
    }

    #[test]
    fn test_next_occurrence_rolls_to_tomorrow() {
        let settings = enabled_settings("09:00", 30);

        let before = local(2024, 1, 15, 8, 0);
        assert_eq!(
            next_occurrence(&settings, before),
            Some(local(2024, 1, 15, 9, 0))
        );

        let after = local(2024, 1, 15, 9, 1);
        assert_eq!(
            next_occurrence(&settings, after),
            Some(local(2024, 1, 16, 9, 0))
        );
    }

    #[test]
    fn test_malformed_time_yields_no_schedule() {
        let mut settings = enabled_settings("09:00", 30);
        settings.daily_check_in_time = "nonsense".to_string();
        let now = local(2024, 1, 15, 12, 0);

        assert_eq!(scheduled_time_today(&settings, now), None);
        assert!(!is_check_in_due_today(&settings, now));
        assert!(!has_missed_deadline(&settings, now));
        assert_eq!(check_in_state(&settings, now).status, CheckInStatus::NotDue);
    }

    #[test]
    fn test_status_wire_names() {
        let json = serde_json::to_string(&CheckInStatus::CheckedInLate).unwrap();
        assert_eq!(json, "\"CHECKED_IN_LATE\"");
        let json = serde_json::to_string(&CheckInStatus::NotDue).unwrap();
        assert_eq!(json, "\"NOT_DUE\"");
    }
}

//! Notification scheduler.
//!
//! Keeps the registry of scheduled local notifications: the recurring
//! daily check-in reminder and the one-shot grace-period warning.
//! Rescheduling is cancel-then-create so repeated settings changes never
//! accumulate duplicates, and cancellation filters by this subsystem's
//! notification kinds only.

use std::collections::HashMap;

use chrono::{DateTime, Duration, Local, NaiveDate};
use serde::Serialize;
use tracing::{debug, info};
use uuid::Uuid;

use safety_common::checkin::{self, parse_check_in_time};
use safety_common::error::SafetyError;
use safety_common::settings::SafetySettings;

/// How long after its trigger minute a daily notification is still worth
/// delivering on a tick
const DAILY_FIRE_WINDOW_MINS: i64 = 5;

/// The two notification kinds this subsystem schedules
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum NotificationKind {
    #[serde(rename = "CHECKIN_REMINDER")]
    CheckInReminder,
    #[serde(rename = "MISSED_CHECKIN")]
    MissedCheckIn,
}

impl NotificationKind {
    pub const ALL: [NotificationKind; 2] = [Self::CheckInReminder, Self::MissedCheckIn];

    /// The payload `data.type`, also the cancel-filter key
    pub fn tag(self) -> &'static str {
        match self {
            NotificationKind::CheckInReminder => "CHECKIN_REMINDER",
            NotificationKind::MissedCheckIn => "MISSED_CHECKIN",
        }
    }
}

/// User-actionable notification button
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NotificationAction {
    pub id: &'static str,
    pub label: &'static str,
}

impl NotificationAction {
    pub fn notify_contacts() -> Self {
        Self {
            id: "NOTIFY_CONTACTS",
            label: "Notify Contacts",
        }
    }

    pub fn im_ok() -> Self {
        Self {
            id: "IM_OK",
            label: "I'm OK",
        }
    }
}

/// What gets shown when a notification fires
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NotificationPayload {
    pub title: String,
    pub body: String,
    /// `data.type`; foreign collaborators use their own tags
    pub tag: String,
    pub actions: Vec<NotificationAction>,
}

impl NotificationPayload {
    /// The recurring daily reminder
    pub fn reminder() -> Self {
        Self {
            title: "Daily Check-In".to_string(),
            body: "Time for your daily check-in. Let your contacts know you're OK.".to_string(),
            tag: NotificationKind::CheckInReminder.tag().to_string(),
            actions: Vec::new(),
        }
    }

    /// The grace-period warning, with its two foregrounding actions
    pub fn grace_warning() -> Self {
        Self {
            title: "Missed Check-In".to_string(),
            body: "You missed your daily check-in. Your emergency contacts will be notified."
                .to_string(),
            tag: NotificationKind::MissedCheckIn.tag().to_string(),
            actions: vec![
                NotificationAction::notify_contacts(),
                NotificationAction::im_ok(),
            ],
        }
    }
}

/// When a scheduled notification fires
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Trigger {
    /// Recurring, every day at this local hour/minute
    DailyAt { hour: u32, minute: u32 },
    /// One-shot at this instant
    At(DateTime<Local>),
}

/// A registered notification
#[derive(Debug, Clone)]
pub struct ScheduledNotification {
    pub id: Uuid,
    pub payload: NotificationPayload,
    pub trigger: Trigger,
}

/// Registry of scheduled notifications
#[derive(Default)]
pub struct NotificationScheduler {
    scheduled: Vec<ScheduledNotification>,
    /// Last local date each recurring notification fired
    last_daily_fire: HashMap<Uuid, NaiveDate>,
}

impl NotificationScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register any notification. Other collaborators schedule through
    /// this too, with their own tags.
    pub fn schedule_raw(&mut self, payload: NotificationPayload, trigger: Trigger) -> Uuid {
        let id = Uuid::new_v4();
        self.scheduled.push(ScheduledNotification {
            id,
            payload,
            trigger,
        });
        id
    }

    /// Schedule the recurring daily reminder at the configured check-in
    /// time. Returns None when daily check-ins are disabled.
    pub fn schedule_daily_reminder(
        &mut self,
        settings: &SafetySettings,
    ) -> Result<Option<Uuid>, SafetyError> {
        if !settings.daily_check_in_enabled {
            return Ok(None);
        }
        let (hour, minute) =
            parse_check_in_time(&settings.daily_check_in_time).ok_or_else(|| {
                SafetyError::Validation(format!(
                    "invalid check-in time '{}'",
                    settings.daily_check_in_time
                ))
            })?;

        let id = self.schedule_raw(
            NotificationPayload::reminder(),
            Trigger::DailyAt { hour, minute },
        );
        info!("Daily reminder scheduled at {:02}:{:02}", hour, minute);
        Ok(Some(id))
    }

    /// Schedule the one-shot grace-period warning at scheduled time +
    /// grace period; when that instant has already passed today it rolls
    /// to tomorrow's occurrence.
    pub fn schedule_grace_warning(
        &mut self,
        settings: &SafetySettings,
        now: DateTime<Local>,
    ) -> Result<Option<Uuid>, SafetyError> {
        if !settings.daily_check_in_enabled {
            return Ok(None);
        }
        let deadline = checkin::deadline_today(settings, now).ok_or_else(|| {
            SafetyError::Validation(format!(
                "invalid check-in time '{}'",
                settings.daily_check_in_time
            ))
        })?;
        let warn_at = if deadline > now {
            deadline
        } else {
            deadline + Duration::days(1)
        };

        let id = self.schedule_raw(NotificationPayload::grace_warning(), Trigger::At(warn_at));
        info!("Grace-period warning scheduled for {}", warn_at);
        Ok(Some(id))
    }

    /// Cancel-then-create: the only way the daemon (re)schedules.
    /// Scheduling failures are logged by the caller and non-fatal.
    pub fn reschedule(
        &mut self,
        settings: &SafetySettings,
        now: DateTime<Local>,
    ) -> (
        Result<Option<Uuid>, SafetyError>,
        Result<Option<Uuid>, SafetyError>,
    ) {
        let cancelled = self.cancel_safety_notifications();
        if cancelled > 0 {
            debug!("Cancelled {} safety notifications before rescheduling", cancelled);
        }
        let reminder = self.schedule_daily_reminder(settings);
        let warning = self.schedule_grace_warning(settings, now);
        (reminder, warning)
    }

    /// Remove every notification carrying one of this subsystem's tags,
    /// leaving foreign notifications untouched. Returns how many were
    /// cancelled.
    pub fn cancel_safety_notifications(&mut self) -> usize {
        let before = self.scheduled.len();
        self.scheduled
            .retain(|n| !NotificationKind::ALL.iter().any(|kind| kind.tag() == n.payload.tag));
        let live: Vec<Uuid> = self.scheduled.iter().map(|n| n.id).collect();
        self.last_daily_fire.retain(|id, _| live.contains(id));
        before - self.scheduled.len()
    }

    pub fn scheduled(&self) -> &[ScheduledNotification] {
        &self.scheduled
    }

    /// Collect everything that should fire at `now`. One-shots whose
    /// instant has passed are removed from the registry; recurring
    /// notifications fire at most once per local day, and only within a
    /// short window of their trigger minute.
    pub fn due_notifications(&mut self, now: DateTime<Local>) -> Vec<ScheduledNotification> {
        let mut due = Vec::new();

        let mut keep = Vec::with_capacity(self.scheduled.len());
        for notification in self.scheduled.drain(..) {
            match notification.trigger {
                Trigger::At(at) if at <= now => due.push(notification),
                _ => keep.push(notification),
            }
        }
        self.scheduled = keep;

        let mut fired: Vec<Uuid> = Vec::new();
        for notification in &self.scheduled {
            if let Trigger::DailyAt { hour, minute } = notification.trigger {
                let occurrence = now
                    .date_naive()
                    .and_hms_opt(hour, minute, 0)
                    .and_then(|naive| naive.and_local_timezone(Local).earliest());
                let Some(occurrence) = occurrence else { continue };

                let within_window = now >= occurrence
                    && now < occurrence + Duration::minutes(DAILY_FIRE_WINDOW_MINS);
                let already_fired =
                    self.last_daily_fire.get(&notification.id) == Some(&now.date_naive());
                if within_window && !already_fired {
                    due.push(notification.clone());
                    fired.push(notification.id);
                }
            }
        }
        for id in fired {
            self.last_daily_fire.insert(id, now.date_naive());
        }

        due
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

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

    fn safety_count(scheduler: &NotificationScheduler) -> usize {
        scheduler
            .scheduled()
            .iter()
            .filter(|n| NotificationKind::ALL.iter().any(|k| k.tag() == n.payload.tag))
            .count()
    }

    #[test]
    fn test_reschedule_is_idempotent() {
        let mut scheduler = NotificationScheduler::new();
        let settings = enabled_settings("09:00", 30);
        let now = local(2024, 1, 15, 8, 0);

        scheduler.reschedule(&settings, now);
        scheduler.reschedule(&settings, now);
        scheduler.reschedule(&settings, now);

        // One reminder + one warning, never duplicates
        assert_eq!(safety_count(&scheduler), 2);
    }

    #[test]
    fn test_cancel_spares_foreign_notifications() {
        let mut scheduler = NotificationScheduler::new();
        let settings = enabled_settings("09:00", 30);
        let now = local(2024, 1, 15, 8, 0);

        scheduler.schedule_raw(
            NotificationPayload {
                title: "Booking reminder".to_string(),
                body: "Your appointment is tomorrow".to_string(),
                tag: "BOOKING_REMINDER".to_string(),
                actions: Vec::new(),
            },
            Trigger::At(local(2024, 1, 16, 9, 0)),
        );
        scheduler.reschedule(&settings, now);

        let cancelled = scheduler.cancel_safety_notifications();
        assert_eq!(cancelled, 2);
        assert_eq!(scheduler.scheduled().len(), 1);
        assert_eq!(scheduler.scheduled()[0].payload.tag, "BOOKING_REMINDER");
    }

    #[test]
    fn test_disabled_schedules_nothing() {
        let mut scheduler = NotificationScheduler::new();
        let settings = SafetySettings::default();
        let now = local(2024, 1, 15, 8, 0);

        let (reminder, warning) = scheduler.reschedule(&settings, now);
        assert_eq!(reminder.unwrap(), None);
        assert_eq!(warning.unwrap(), None);
        assert_eq!(safety_count(&scheduler), 0);
    }

    #[test]
    fn test_invalid_time_is_a_scheduling_error() {
        let mut scheduler = NotificationScheduler::new();
        let mut settings = enabled_settings("09:00", 30);
        settings.daily_check_in_time = "99:99".to_string();

        assert!(scheduler.schedule_daily_reminder(&settings).is_err());
    }

    #[test]
    fn test_grace_warning_rolls_to_tomorrow_when_past() {
        let mut scheduler = NotificationScheduler::new();
        let settings = enabled_settings("09:00", 30);

        // Deadline 09:30 already passed at 10:00
        let now = local(2024, 1, 15, 10, 0);
        scheduler.schedule_grace_warning(&settings, now).unwrap();

        match scheduler.scheduled()[0].trigger {
            Trigger::At(at) => assert_eq!(at, local(2024, 1, 16, 9, 30)),
            ref other => panic!("unexpected trigger {:?}", other),
        }
    }

    #[test]
    fn test_grace_warning_today_when_still_ahead() {
        let mut scheduler = NotificationScheduler::new();
        let settings = enabled_settings("09:00", 30);

        let now = local(2024, 1, 15, 8, 0);
        scheduler.schedule_grace_warning(&settings, now).unwrap();

        match scheduler.scheduled()[0].trigger {
            Trigger::At(at) => assert_eq!(at, local(2024, 1, 15, 9, 30)),
            ref other => panic!("unexpected trigger {:?}", other),
        }
    }

    #[test]
    fn test_one_shot_fires_once_and_is_removed() {
        let mut scheduler = NotificationScheduler::new();
        scheduler.schedule_raw(
            NotificationPayload::grace_warning(),
            Trigger::At(local(2024, 1, 15, 9, 30)),
        );

        assert!(scheduler.due_notifications(local(2024, 1, 15, 9, 29)).is_empty());

        let due = scheduler.due_notifications(local(2024, 1, 15, 9, 31));
        assert_eq!(due.len(), 1);
        assert_eq!(due[0].payload.tag, "MISSED_CHECKIN");

        assert!(scheduler.due_notifications(local(2024, 1, 15, 9, 32)).is_empty());
    }

    #[test]
    fn test_daily_fires_once_per_day_within_window() {
        let mut scheduler = NotificationScheduler::new();
        scheduler.schedule_raw(
            NotificationPayload::reminder(),
            Trigger::DailyAt { hour: 9, minute: 0 },
        );

        assert!(scheduler.due_notifications(local(2024, 1, 15, 8, 59)).is_empty());
        assert_eq!(scheduler.due_notifications(local(2024, 1, 15, 9, 0)).len(), 1);
        // Same day: no second fire
        assert!(scheduler.due_notifications(local(2024, 1, 15, 9, 1)).is_empty());
        // Next day it fires again
        assert_eq!(scheduler.due_notifications(local(2024, 1, 16, 9, 2)).len(), 1);
        // Long past the window: skipped for that day
        assert!(scheduler.due_notifications(local(2024, 1, 17, 15, 0)).is_empty());
    }

    #[test]
    fn test_warning_payload_carries_both_actions() {
        let payload = NotificationPayload::grace_warning();
        let ids: Vec<&str> = payload.actions.iter().map(|a| a.id).collect();
        assert_eq!(ids, vec!["NOTIFY_CONTACTS", "IM_OK"]);

        // The reminder has none
        assert!(NotificationPayload::reminder().actions.is_empty());
    }
}

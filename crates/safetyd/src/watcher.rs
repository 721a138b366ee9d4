//! Watcher loop: the daemon's heartbeat.
//!
//! Each tick delivers due notifications, detects a missed deadline, and
//! escalates to the emergency contacts. Rescheduling happens whenever the
//! check-in settings change, cancel-then-create.

use std::sync::Arc;

use chrono::{DateTime, Local};
use tokio::sync::RwLock;
use tracing::{info, warn};

use safety_common::checkin::CheckInStatus;
use safety_common::config::SafetyConfig;
use safety_common::contacts::SafetyContact;
use safety_common::events::EventMetadata;
use safety_common::geolocation::GeoResolver;
use safety_common::messages;
use safety_common::settings::SafetySettings;
use safety_common::store::SafetyStore;
use safety_common::transport::AlertTransport;

use crate::notifier::Notifier;
use crate::scheduler::NotificationScheduler;

/// The settings that drive the notification schedule
type ScheduleKey = (bool, String, u32);

fn schedule_key(settings: &SafetySettings) -> ScheduleKey {
    (
        settings.daily_check_in_enabled,
        settings.daily_check_in_time.clone(),
        settings.grace_period_minutes,
    )
}

pub struct Watcher {
    store: Arc<RwLock<SafetyStore>>,
    scheduler: Arc<RwLock<NotificationScheduler>>,
    resolver: Arc<RwLock<GeoResolver>>,
    notifier: Notifier,
    transport: Arc<dyn AlertTransport>,
    config: SafetyConfig,
    last_schedule_key: Option<ScheduleKey>,
}

impl Watcher {
    pub fn new(
        store: Arc<RwLock<SafetyStore>>,
        scheduler: Arc<RwLock<NotificationScheduler>>,
        resolver: Arc<RwLock<GeoResolver>>,
        notifier: Notifier,
        transport: Arc<dyn AlertTransport>,
        config: SafetyConfig,
    ) -> Self {
        Self {
            store,
            scheduler,
            resolver,
            notifier,
            transport,
            config,
            last_schedule_key: None,
        }
    }

    /// Run forever on the configured tick interval
    pub async fn run(mut self) {
        let mut ticker = tokio::time::interval(self.config.tick_interval());
        loop {
            ticker.tick().await;
            self.tick(Local::now()).await;
        }
    }

    /// One pass: resync the schedule if settings changed, deliver due
    /// notifications, handle a missed deadline.
    pub async fn tick(&mut self, now: DateTime<Local>) {
        let settings = self.store.read().await.settings().clone();
        let key = schedule_key(&settings);
        if self.last_schedule_key.as_ref() != Some(&key) {
            self.resync_schedule(&settings, now).await;
            self.last_schedule_key = Some(key);
        }

        let due = self.scheduler.write().await.due_notifications(now);
        for notification in &due {
            self.notifier.deliver(notification).await;
        }

        self.handle_missed_deadline(now).await;
    }

    /// Cancel-then-create the subsystem's notifications and record the
    /// new handles. Scheduling failures are logged and non-fatal: the
    /// reminder simply does not fire.
    async fn resync_schedule(&self, settings: &SafetySettings, now: DateTime<Local>) {
        let (reminder, warning) = self.scheduler.write().await.reschedule(settings, now);

        let reminder = reminder.unwrap_or_else(|e| {
            warn!("Could not schedule daily reminder: {}", e);
            None
        });
        let warning = warning.unwrap_or_else(|e| {
            warn!("Could not schedule grace-period warning: {}", e);
            None
        });

        if let Err(e) = self
            .store
            .write()
            .await
            .set_notification_handles(reminder, warning)
        {
            warn!("Could not persist notification handles: {}", e);
        }
    }

    /// Detect a deadline passed with no check-in, record it once per day,
    /// and escalate to the configured contacts. The alert always goes out
    /// even when no location can be obtained.
    async fn handle_missed_deadline(&self, now: DateTime<Local>) {
        let snapshot = {
            let store = self.store.read().await;
            let state = store.check_in_state(now);
            if state.status != CheckInStatus::Missed || store.events().missed_today(now) {
                None
            } else {
                let settings = store.settings().clone();
                let targets: Vec<SafetyContact> = if settings.escalation_enabled {
                    store.escalation_targets().into_iter().cloned().collect()
                } else {
                    Vec::new()
                };
                Some((settings, targets))
            }
        };
        let Some((settings, targets)) = snapshot else {
            return;
        };

        // Location fetch happens outside the store lock; any failure
        // degrades to an alert without a position.
        let location = if settings.share_location_on_missed_check_in && !targets.is_empty() {
            match self
                .resolver
                .write()
                .await
                .location_with_fallback(self.config.location_timeout())
                .await
            {
                Ok(fix) => Some(fix),
                Err(e) => {
                    warn!("Proceeding without location: {}", e);
                    None
                }
            }
        } else {
            None
        };

        let notified: Vec<String> = targets.iter().map(|c| c.name.clone()).collect();
        {
            let mut store = self.store.write().await;
            // Re-check under the write guard so two ticks can never
            // record the same day twice.
            if store.events().missed_today(now) {
                return;
            }
            let metadata = EventMetadata {
                location: location.clone(),
                contacts_notified: notified,
                ..Default::default()
            };
            if let Err(e) = store.record_missed_check_in(metadata) {
                warn!("Could not record missed check-in: {}", e);
                return;
            }
        }

        let message = messages::generate_missed_check_in_message(
            &self.config.display_name,
            location.as_ref(),
            settings.share_location_on_missed_check_in,
        );
        for contact in &targets {
            if let Err(e) = self.transport.send(contact, &message) {
                warn!("Alert hand-off to {} failed: {}", contact.name, e);
            }
        }
        if !targets.is_empty() {
            info!("Escalated missed check-in to {} contact(s)", targets.len());
        }
    }
}

//! Local notification delivery via notify-send.
//!
//! Detects the binary once; delivery is fire-and-forget and failures are
//! logged, never propagated. A host without notify-send simply shows no
//! reminders (surfaced elsewhere as a denied notifications permission).

use tracing::{debug, warn};

use crate::scheduler::{NotificationKind, ScheduledNotification};

/// Notification urgency level
#[derive(Debug, Clone, Copy)]
pub enum NotificationUrgency {
    Low,
    Normal,
    Critical,
}

impl NotificationUrgency {
    fn as_str(self) -> &'static str {
        match self {
            NotificationUrgency::Low => "low",
            NotificationUrgency::Normal => "normal",
            NotificationUrgency::Critical => "critical",
        }
    }
}

/// Delivery backend for scheduled notifications
pub struct Notifier {
    available: bool,
}

impl Notifier {
    /// Detect whether notify-send is present on this host
    pub fn detect() -> Self {
        let available = crate::probes::binary_available("notify-send");
        if !available {
            warn!("notify-send not found - local reminders will not be shown");
        }
        Self { available }
    }

    /// A notifier that never delivers (headless hosts and tests)
    pub fn disabled() -> Self {
        Self { available: false }
    }

    pub fn available(&self) -> bool {
        self.available
    }

    /// Show a notification. Missed-check-in warnings go out critical,
    /// everything else normal.
    pub async fn deliver(&self, notification: &ScheduledNotification) {
        if !self.available {
            return;
        }

        let urgency = if notification.payload.tag == NotificationKind::MissedCheckIn.tag() {
            NotificationUrgency::Critical
        } else {
            NotificationUrgency::Normal
        };

        let mut cmd = tokio::process::Command::new("notify-send");
        cmd.args([
            "--urgency",
            urgency.as_str(),
            "--app-name",
            "CareBow Safety",
        ]);
        for action in &notification.payload.actions {
            cmd.arg(format!("--action={}={}", action.id, action.label));
        }
        cmd.arg(&notification.payload.title)
            .arg(&notification.payload.body);

        match cmd.output().await {
            Ok(output) if output.status.success() => {
                debug!("Notification shown: {}", notification.payload.title);
            }
            Ok(output) => {
                warn!(
                    "notify-send failed for '{}': {}",
                    notification.payload.title,
                    String::from_utf8_lossy(&output.stderr).trim()
                );
            }
            Err(e) => {
                warn!(
                    "Error running notify-send for '{}': {}",
                    notification.payload.title, e
                );
            }
        }
    }
}

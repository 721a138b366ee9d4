//! Safety event history.
//!
//! Immutable records of every recordable action (SOS, check-in, missed
//! check-in, test alert). The log is append-only and keeps only the 100
//! most recent entries, newest first.

use chrono::{DateTime, Local, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::checkin::is_same_local_day;
use crate::location::LocationFix;

/// Maximum number of events retained
pub const EVENT_LOG_CAP: usize = 100;

/// Kind of safety event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SafetyEventKind {
    #[serde(rename = "SOS_TRIGGERED")]
    SosTriggered,
    #[serde(rename = "CHECKIN_CONFIRMED")]
    CheckInConfirmed,
    #[serde(rename = "CHECKIN_MISSED")]
    CheckInMissed,
    #[serde(rename = "TEST_ALERT_SENT")]
    TestAlertSent,
}

/// Optional context attached to an event
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EventMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<LocationFix>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub contacts_notified: Vec<String>,
    #[serde(default)]
    pub was_late: bool,
}

/// One immutable entry in the safety event history
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SafetyEvent {
    pub id: Uuid,
    pub kind: SafetyEventKind,
    pub user_id: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub metadata: EventMetadata,
}

impl SafetyEvent {
    /// Create a new event stamped with the current time
    pub fn new(kind: SafetyEventKind, user_id: &str) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind,
            user_id: user_id.to_string(),
            timestamp: Utc::now(),
            metadata: EventMetadata::default(),
        }
    }

    pub fn with_location(mut self, location: LocationFix) -> Self {
        self.metadata.location = Some(location);
        self
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.metadata.note = Some(note.into());
        self
    }

    pub fn with_contacts_notified(mut self, contacts: Vec<String>) -> Self {
        self.metadata.contacts_notified = contacts;
        self
    }

    pub fn with_late(mut self, was_late: bool) -> Self {
        self.metadata.was_late = was_late;
        self
    }

    pub fn with_metadata(mut self, metadata: EventMetadata) -> Self {
        self.metadata = metadata;
        self
    }
}

/// Capped, newest-first event history
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventLog {
    events: Vec<SafetyEvent>,
}

impl EventLog {
    /// Append an event, evicting the oldest once the cap is reached
    pub fn append(&mut self, event: SafetyEvent) {
        self.events.insert(0, event);
        self.events.truncate(EVENT_LOG_CAP);
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Newest first
    pub fn iter(&self) -> impl Iterator<Item = &SafetyEvent> {
        self.events.iter()
    }

    pub fn latest(&self) -> Option<&SafetyEvent> {
        self.events.first()
    }

    pub fn of_kind(&self, kind: SafetyEventKind) -> impl Iterator<Item = &SafetyEvent> {
        self.events.iter().filter(move |e| e.kind == kind)
    }

    /// Whether a missed-check-in event was already recorded today
    pub fn missed_today(&self, now: DateTime<Local>) -> bool {
        self.of_kind(SafetyEventKind::CheckInMissed)
            .any(|e| is_same_local_day(e.timestamp.with_timezone(&Local), now))
    }
}

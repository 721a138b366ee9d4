//! The safety store: single source of truth for settings, the event
//! history and the contact list.
//!
//! One logical writer. Every mutation updates the in-memory state and
//! then persists the whole snapshot atomically, so readers only ever see
//! fully-committed state. The volatile SOS-in-progress flag lives on the
//! store, outside the persisted snapshot.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use crate::checkin::{self, CheckInState};
use crate::contacts::{ContactPatch, NewContact, SafetyContact};
use crate::error::SafetyError;
use crate::events::{EventLog, EventMetadata, SafetyEvent, SafetyEventKind};
use crate::permissions::SafetyPermissions;
use crate::persist;
use crate::phone;
use crate::settings::{EscalationStep, SafetySettings, SettingsPatch};

/// Current schema version of the persisted snapshot
pub const STATE_SCHEMA: u32 = 1;

fn default_schema_version() -> u32 {
    STATE_SCHEMA
}

/// Everything that survives a restart
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersistedState {
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    #[serde(default)]
    pub settings: SafetySettings,
    #[serde(default)]
    pub events: EventLog,
    #[serde(default)]
    pub contacts: Vec<SafetyContact>,
    /// Cached permission grants; refreshed by probes, never authoritative
    #[serde(default)]
    pub permissions: SafetyPermissions,
    #[serde(default = "Utc::now")]
    pub updated_at: DateTime<Utc>,
}

impl Default for PersistedState {
    fn default() -> Self {
        Self {
            schema_version: STATE_SCHEMA,
            settings: SafetySettings::default(),
            events: EventLog::default(),
            contacts: Vec::new(),
            permissions: SafetyPermissions::default(),
            updated_at: Utc::now(),
        }
    }
}

/// Owned, injectable safety state container
pub struct SafetyStore {
    state: PersistedState,
    path: PathBuf,
    user_id: String,
    /// Volatile: an SOS flow is underway. Never persisted.
    sos_in_progress: bool,
}

impl SafetyStore {
    /// Load the store from disk. A missing file starts from defaults; a
    /// corrupt file is logged and replaced by defaults rather than
    /// aborting the safety system.
    pub fn load(path: PathBuf, user_id: impl Into<String>) -> Self {
        let state = match fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str::<PersistedState>(&contents) {
                Ok(state) => state,
                Err(e) => {
                    warn!(
                        "Corrupt safety state at {} ({}) - starting from defaults",
                        path.display(),
                        e
                    );
                    PersistedState::default()
                }
            },
            Err(e) if e.kind() == io::ErrorKind::NotFound => PersistedState::default(),
            Err(e) => {
                warn!(
                    "Could not read safety state at {} ({}) - starting from defaults",
                    path.display(),
                    e
                );
                PersistedState::default()
            }
        };

        Self {
            state,
            path,
            user_id: user_id.into(),
            sos_in_progress: false,
        }
    }

    /// Persist the full snapshot atomically
    fn persist(&mut self) -> Result<(), SafetyError> {
        self.state.updated_at = Utc::now();
        let json = serde_json::to_string_pretty(&self.state)?;
        persist::atomic_write_str(&self.path, &json)?;
        Ok(())
    }

    // ========================================================================
    // Recording operations
    // ========================================================================

    /// Record a confirmed check-in. `was_late` is derived from whether a
    /// missed-deadline event was already recorded today.
    pub fn record_check_in(&mut self, note: Option<String>) -> Result<SafetyEvent, SafetyError> {
        let now_local = Local::now();
        let was_late = self.state.events.missed_today(now_local);

        let mut event =
            SafetyEvent::new(SafetyEventKind::CheckInConfirmed, &self.user_id).with_late(was_late);
        if let Some(note) = note {
            event = event.with_note(note);
        }

        self.state.settings.last_check_in_at = Some(event.timestamp);
        self.state.events.append(event.clone());
        self.persist()?;

        info!("Check-in recorded (late: {})", was_late);
        Ok(event)
    }

    /// Record a missed check-in, with whatever alert context the caller
    /// assembled (location, contacts notified).
    pub fn record_missed_check_in(
        &mut self,
        metadata: EventMetadata,
    ) -> Result<SafetyEvent, SafetyError> {
        let event =
            SafetyEvent::new(SafetyEventKind::CheckInMissed, &self.user_id).with_metadata(metadata);

        self.state.settings.last_missed_check_in_at = Some(event.timestamp);
        self.state.events.append(event.clone());
        self.persist()?;

        warn!("Missed check-in recorded");
        Ok(event)
    }

    /// Record a triggered SOS. Location retrieval is the caller's
    /// responsibility; an SOS without a location is still an SOS.
    pub fn trigger_sos(&mut self, metadata: EventMetadata) -> Result<SafetyEvent, SafetyError> {
        let event =
            SafetyEvent::new(SafetyEventKind::SosTriggered, &self.user_id).with_metadata(metadata);

        self.state.events.append(event.clone());
        self.sos_in_progress = false;
        self.persist()?;

        warn!("SOS recorded for {}", self.user_id);
        Ok(event)
    }

    /// Record that a test alert went out to the given contacts
    pub fn record_test_alert(
        &mut self,
        contacts_notified: Vec<String>,
    ) -> Result<SafetyEvent, SafetyError> {
        let event = SafetyEvent::new(SafetyEventKind::TestAlertSent, &self.user_id)
            .with_contacts_notified(contacts_notified);

        self.state.events.append(event.clone());
        self.persist()?;
        Ok(event)
    }

    /// Mark an SOS flow as underway (volatile)
    pub fn begin_sos(&mut self) {
        self.sos_in_progress = true;
    }

    pub fn sos_in_progress(&self) -> bool {
        self.sos_in_progress
    }

    // ========================================================================
    // Contact management
    // ========================================================================

    /// Add a contact. The first contact is always primary regardless of
    /// the input flag; a new primary demotes every other contact in the
    /// same write.
    pub fn add_contact(&mut self, new: NewContact) -> Result<SafetyContact, SafetyError> {
        if new.name.trim().is_empty() {
            return Err(SafetyError::Validation("contact name is empty".to_string()));
        }
        if !phone::is_valid_phone_number(&new.phone_number) {
            return Err(SafetyError::Validation(format!(
                "invalid phone number '{}'",
                new.phone_number
            )));
        }

        let is_primary = self.state.contacts.is_empty() || new.is_primary;
        if is_primary {
            for contact in &mut self.state.contacts {
                contact.is_primary = false;
            }
        }

        let now = Utc::now();
        let contact = SafetyContact {
            id: Uuid::new_v4(),
            name: new.name.trim().to_string(),
            relationship: new.relationship,
            phone_number: phone::normalize_phone_number(&new.phone_number),
            country_code: new.country_code,
            is_primary,
            can_receive_sms: new.can_receive_sms,
            can_receive_whatsapp: new.can_receive_whatsapp,
            created_at: now,
            updated_at: now,
        };

        self.state.contacts.push(contact.clone());
        self.persist()?;

        info!("Contact added: {} (primary: {})", contact.name, is_primary);
        Ok(contact)
    }

    /// Edit a contact with merge-patch semantics
    pub fn update_contact(
        &mut self,
        id: Uuid,
        patch: ContactPatch,
    ) -> Result<SafetyContact, SafetyError> {
        if let Some(ref number) = patch.phone_number {
            if !phone::is_valid_phone_number(number) {
                return Err(SafetyError::Validation(format!(
                    "invalid phone number '{}'",
                    number
                )));
            }
        }

        let index = self
            .state
            .contacts
            .iter()
            .position(|c| c.id == id)
            .ok_or(SafetyError::ContactNotFound(id))?;

        if patch.is_primary == Some(true) {
            for contact in &mut self.state.contacts {
                contact.is_primary = false;
            }
        }

        let contact = &mut self.state.contacts[index];
        if let Some(name) = patch.name {
            contact.name = name;
        }
        if let Some(relationship) = patch.relationship {
            contact.relationship = Some(relationship);
        }
        if let Some(number) = patch.phone_number {
            contact.phone_number = phone::normalize_phone_number(&number);
        }
        if let Some(country_code) = patch.country_code {
            contact.country_code = Some(country_code);
        }
        if let Some(is_primary) = patch.is_primary {
            contact.is_primary = is_primary;
        }
        if let Some(sms) = patch.can_receive_sms {
            contact.can_receive_sms = sms;
        }
        if let Some(whatsapp) = patch.can_receive_whatsapp {
            contact.can_receive_whatsapp = whatsapp;
        }
        contact.updated_at = Utc::now();
        let updated = contact.clone();

        // A non-empty list must keep exactly one primary, even if the
        // caller just cleared the flag on the only primary.
        self.ensure_primary_invariant();
        self.persist()?;

        Ok(updated)
    }

    /// Delete a contact. Deleting the primary promotes the first
    /// remaining contact.
    pub fn delete_contact(&mut self, id: Uuid) -> Result<(), SafetyError> {
        let index = self
            .state
            .contacts
            .iter()
            .position(|c| c.id == id)
            .ok_or(SafetyError::ContactNotFound(id))?;

        let removed = self.state.contacts.remove(index);
        if removed.is_primary {
            if let Some(first) = self.state.contacts.first_mut() {
                first.is_primary = true;
                first.updated_at = Utc::now();
            }
        }
        self.persist()?;

        info!("Contact removed: {}", removed.name);
        Ok(())
    }

    /// Make exactly one contact primary
    pub fn set_primary_contact(&mut self, id: Uuid) -> Result<(), SafetyError> {
        if !self.state.contacts.iter().any(|c| c.id == id) {
            return Err(SafetyError::ContactNotFound(id));
        }
        let now = Utc::now();
        for contact in &mut self.state.contacts {
            let make_primary = contact.id == id;
            if contact.is_primary != make_primary {
                contact.is_primary = make_primary;
                contact.updated_at = now;
            }
        }
        self.persist()?;
        Ok(())
    }

    fn ensure_primary_invariant(&mut self) {
        if self.state.contacts.is_empty() {
            return;
        }
        let primaries = self.state.contacts.iter().filter(|c| c.is_primary).count();
        if primaries == 1 {
            return;
        }
        // Zero or several primaries: first one wins, the rest are demoted
        let mut seen = false;
        for contact in &mut self.state.contacts {
            if contact.is_primary && !seen {
                seen = true;
            } else {
                contact.is_primary = false;
            }
        }
        if !seen {
            self.state.contacts[0].is_primary = true;
        }
    }

    // ========================================================================
    // Settings
    // ========================================================================

    /// Apply a validated merge-patch to the settings
    pub fn update_settings(&mut self, patch: SettingsPatch) -> Result<(), SafetyError> {
        self.state.settings.apply_patch(patch)?;
        self.persist()
    }

    /// Restore default settings
    pub fn reset_settings(&mut self) -> Result<(), SafetyError> {
        self.state.settings = SafetySettings::default();
        self.persist()
    }

    /// Store the opaque handles of the scheduled notifications
    pub fn set_notification_handles(
        &mut self,
        reminder: Option<Uuid>,
        warning: Option<Uuid>,
    ) -> Result<(), SafetyError> {
        self.state.settings.reminder_notification_id = reminder;
        self.state.settings.warning_notification_id = warning;
        self.persist()
    }

    /// Refresh the cached permission grants
    pub fn set_permissions(&mut self, permissions: SafetyPermissions) -> Result<(), SafetyError> {
        self.state.permissions = permissions;
        self.persist()
    }

    // ========================================================================
    // Read selectors
    // ========================================================================

    pub fn settings(&self) -> &SafetySettings {
        &self.state.settings
    }

    pub fn events(&self) -> &EventLog {
        &self.state.events
    }

    pub fn contacts(&self) -> &[SafetyContact] {
        &self.state.contacts
    }

    pub fn primary_contact(&self) -> Option<&SafetyContact> {
        self.state.contacts.iter().find(|c| c.is_primary)
    }

    pub fn permissions(&self) -> &SafetyPermissions {
        &self.state.permissions
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Derived check-in state for `now`
    pub fn check_in_state(&self, now: DateTime<Local>) -> CheckInState {
        checkin::check_in_state(&self.state.settings, now)
    }

    /// Resolve the escalation policy into the ordered, de-duplicated set
    /// of contacts to alert. Callers gate on `escalation_enabled`.
    pub fn escalation_targets(&self) -> Vec<&SafetyContact> {
        let mut targets: Vec<&SafetyContact> = Vec::new();
        for step in &self.state.settings.escalation_order {
            match step {
                EscalationStep::PrimaryContact => {
                    if let Some(primary) = self.primary_contact() {
                        if !targets.iter().any(|c| c.id == primary.id) {
                            targets.push(primary);
                        }
                    }
                }
                EscalationStep::AllContacts => {
                    for contact in &self.state.contacts {
                        if !targets.iter().any(|c| c.id == contact.id) {
                            targets.push(contact);
                        }
                    }
                }
            }
        }
        targets
    }
}

//! Safety settings: the singleton configuration the coordinator owns.
//!
//! Invalid values are rejected before they are written, never silently
//! clamped. `SettingsPatch` gives callers merge-patch semantics.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::checkin::{is_valid_grace_period, is_valid_time_format};
use crate::error::SafetyError;

/// One step of the escalation policy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EscalationStep {
    PrimaryContact,
    AllContacts,
}

/// Check-in and escalation settings, persisted as part of the safety state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SafetySettings {
    #[serde(default)]
    pub daily_check_in_enabled: bool,

    /// 24-hour "HH:MM", local time
    #[serde(default = "default_check_in_time")]
    pub daily_check_in_time: String,

    /// Minutes after the scheduled time before a check-in counts as missed (1-1440)
    #[serde(default = "default_grace_period")]
    pub grace_period_minutes: u32,

    #[serde(default = "default_true")]
    pub escalation_enabled: bool,

    #[serde(default = "default_escalation_order")]
    pub escalation_order: Vec<EscalationStep>,

    #[serde(default = "default_true")]
    pub share_location_on_sos: bool,

    #[serde(default = "default_true")]
    pub share_location_on_missed_check_in: bool,

    #[serde(default)]
    pub last_check_in_at: Option<DateTime<Utc>>,

    #[serde(default)]
    pub last_missed_check_in_at: Option<DateTime<Utc>>,

    /// Handle of the scheduled daily reminder notification
    #[serde(default)]
    pub reminder_notification_id: Option<Uuid>,

    /// Handle of the scheduled grace-period warning notification
    #[serde(default)]
    pub warning_notification_id: Option<Uuid>,
}

fn default_check_in_time() -> String {
    "09:00".to_string()
}

fn default_grace_period() -> u32 {
    30
}

fn default_true() -> bool {
    true
}

fn default_escalation_order() -> Vec<EscalationStep> {
    vec![EscalationStep::PrimaryContact, EscalationStep::AllContacts]
}

impl Default for SafetySettings {
    fn default() -> Self {
        Self {
            daily_check_in_enabled: false,
            daily_check_in_time: default_check_in_time(),
            grace_period_minutes: default_grace_period(),
            escalation_enabled: true,
            escalation_order: default_escalation_order(),
            share_location_on_sos: true,
            share_location_on_missed_check_in: true,
            last_check_in_at: None,
            last_missed_check_in_at: None,
            reminder_notification_id: None,
            warning_notification_id: None,
        }
    }
}

/// Merge-patch over [`SafetySettings`]: only `Some` fields are applied
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SettingsPatch {
    pub daily_check_in_enabled: Option<bool>,
    pub daily_check_in_time: Option<String>,
    pub grace_period_minutes: Option<u32>,
    pub escalation_enabled: Option<bool>,
    pub escalation_order: Option<Vec<EscalationStep>>,
    pub share_location_on_sos: Option<bool>,
    pub share_location_on_missed_check_in: Option<bool>,
}

impl SafetySettings {
    /// Apply a merge-patch. Every value is validated before anything is
    /// written, so a rejected patch leaves the settings untouched.
    pub fn apply_patch(&mut self, patch: SettingsPatch) -> Result<(), SafetyError> {
        if let Some(ref time) = patch.daily_check_in_time {
            if !is_valid_time_format(time) {
                return Err(SafetyError::Validation(format!(
                    "invalid check-in time '{}': expected 24-hour HH:MM",
                    time
                )));
            }
        }
        if let Some(grace) = patch.grace_period_minutes {
            if !is_valid_grace_period(grace) {
                return Err(SafetyError::Validation(format!(
                    "invalid grace period {} minutes: expected 1-1440",
                    grace
                )));
            }
        }

        if let Some(enabled) = patch.daily_check_in_enabled {
            self.daily_check_in_enabled = enabled;
        }
        if let Some(time) = patch.daily_check_in_time {
            self.daily_check_in_time = time;
        }
        if let Some(grace) = patch.grace_period_minutes {
            self.grace_period_minutes = grace;
        }
        if let Some(enabled) = patch.escalation_enabled {
            self.escalation_enabled = enabled;
        }
        if let Some(order) = patch.escalation_order {
            self.escalation_order = order;
        }
        if let Some(share) = patch.share_location_on_sos {
            self.share_location_on_sos = share;
        }
        if let Some(share) = patch.share_location_on_missed_check_in {
            self.share_location_on_missed_check_in = share;
        }

        Ok(())
    }
}

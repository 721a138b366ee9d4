//! Emergency contact records.
//!
//! The primary-contact invariant (at most one primary; a non-empty list
//! has exactly one) is enforced by the store, which owns all writes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// An emergency contact
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SafetyContact {
    pub id: Uuid,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relationship: Option<String>,
    /// Stored normalized (+{cc}{digits})
    pub phone_number: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country_code: Option<String>,
    #[serde(default)]
    pub is_primary: bool,
    #[serde(default = "default_true")]
    pub can_receive_sms: bool,
    #[serde(default)]
    pub can_receive_whatsapp: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

fn default_true() -> bool {
    true
}

/// Input shape for adding a contact
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewContact {
    pub name: String,
    #[serde(default)]
    pub relationship: Option<String>,
    pub phone_number: String,
    #[serde(default)]
    pub country_code: Option<String>,
    #[serde(default)]
    pub is_primary: bool,
    #[serde(default = "default_true")]
    pub can_receive_sms: bool,
    #[serde(default)]
    pub can_receive_whatsapp: bool,
}

/// Merge-patch for editing a contact
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ContactPatch {
    pub name: Option<String>,
    pub relationship: Option<String>,
    pub phone_number: Option<String>,
    pub country_code: Option<String>,
    pub is_primary: Option<bool>,
    pub can_receive_sms: Option<bool>,
    pub can_receive_whatsapp: Option<bool>,
}

impl SafetyContact {
    /// Preferred outbound channel for this contact
    pub fn channel(&self) -> &'static str {
        if self.can_receive_whatsapp {
            "whatsapp"
        } else {
            "sms"
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_preference() {
        let mut contact = SafetyContact {
            id: Uuid::new_v4(),
            name: "Maya".to_string(),
            relationship: None,
            phone_number: "+15551234567".to_string(),
            country_code: None,
            is_primary: true,
            can_receive_sms: true,
            can_receive_whatsapp: false,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        assert_eq!(contact.channel(), "sms");

        contact.can_receive_whatsapp = true;
        assert_eq!(contact.channel(), "whatsapp");
    }
}

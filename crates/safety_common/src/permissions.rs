//! Cached host permission state.
//!
//! safetyd probes what the host can actually do (deliver notifications,
//! resolve a position) and caches the result here. The cache is refreshed
//! on demand, never trusted blindly at the moment of an emergency.

use serde::{Deserialize, Serialize};

/// Outcome of a permission probe
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PermissionState {
    Granted,
    Denied,
    Undetermined,
}

impl Default for PermissionState {
    fn default() -> Self {
        Self::Undetermined
    }
}

impl PermissionState {
    pub fn is_granted(self) -> bool {
        matches!(self, PermissionState::Granted)
    }
}

/// Cached permission grants for the safety subsystem
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SafetyPermissions {
    #[serde(default)]
    pub location: PermissionState,
    #[serde(default)]
    pub notifications: PermissionState,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_undetermined() {
        let perms = SafetyPermissions::default();
        assert_eq!(perms.location, PermissionState::Undetermined);
        assert_eq!(perms.notifications, PermissionState::Undetermined);
        assert!(!perms.location.is_granted());
    }

    #[test]
    fn test_serde_names() {
        let json = serde_json::to_string(&PermissionState::Granted).unwrap();
        assert_eq!(json, "\"granted\"");
        let state: PermissionState = serde_json::from_str("\"undetermined\"").unwrap();
        assert_eq!(state, PermissionState::Undetermined);
    }
}

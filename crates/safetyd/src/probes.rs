//! Host capability probes.
//!
//! The permission cache reflects what this host can actually do: deliver
//! local notifications and resolve a position. Probes run at startup and
//! on demand, never at the moment of an emergency.

use std::process::Command;

use tracing::info;

use safety_common::config::SafetyConfig;
use safety_common::permissions::{PermissionState, SafetyPermissions};

/// Check if a binary is available on PATH
pub fn binary_available(name: &str) -> bool {
    Command::new("which")
        .arg(name)
        .output()
        .map(|o| o.status.success())
        .unwrap_or(false)
}

/// Probe the notification facility. The cached value is read back
/// through the store without re-prompting.
pub fn request_notification_permission() -> PermissionState {
    if binary_available("notify-send") {
        PermissionState::Granted
    } else {
        PermissionState::Denied
    }
}

/// Probe the positioning facility configured for this host
pub fn request_location_permission(config: &SafetyConfig) -> PermissionState {
    match config.location_command.as_deref() {
        Some(line) => match line.split_whitespace().next() {
            Some(program) if binary_available(program) => PermissionState::Granted,
            _ => PermissionState::Denied,
        },
        None => PermissionState::Denied,
    }
}

/// Probe notification and location capability into a permission snapshot
pub fn probe_permissions(config: &SafetyConfig) -> SafetyPermissions {
    let permissions = SafetyPermissions {
        location: request_location_permission(config),
        notifications: request_notification_permission(),
    };
    info!(
        "Permission probe: notifications {:?}, location {:?}",
        permissions.notifications, permissions.location
    );
    permissions
}

//! Outbound alert message templates.
//!
//! Delivery is delegated to an external SMS/WhatsApp transport; this module
//! only builds the strings it is handed.

use crate::location::LocationFix;

/// SOS alert, with the location sentence when a fix is available
pub fn sos_message(name: &str, location: Option<&LocationFix>) -> String {
    match location {
        Some(fix) => format!(
            "SOS: {} needs help. Please contact them immediately. Location: {}",
            name,
            fix.google_maps_link()
        ),
        None => format!("SOS: {} needs help. Please contact them immediately.", name),
    }
}

/// Missed daily check-in alert
pub fn missed_check_in_message(name: &str, location: Option<&LocationFix>) -> String {
    match location {
        Some(fix) => format!(
            "Alert: {} missed their daily check-in. Please contact them immediately. Location: {}",
            name,
            fix.google_maps_link()
        ),
        None => format!(
            "Alert: {} missed their daily check-in. Please contact them immediately.",
            name
        ),
    }
}

/// Test alert used to verify the contact chain end to end
pub fn test_alert_message(name: &str) -> String {
    format!(
        "This is a test alert from {}'s CareBow safety system. No action needed.",
        name
    )
}

/// SOS message gated on the share-location setting: the link is embedded
/// only when sharing is enabled AND a fix was actually obtained.
pub fn generate_sos_message(name: &str, location: Option<&LocationFix>, share_location: bool) -> String {
    let fix = if share_location { location } else { None };
    sos_message(name, fix)
}

/// Missed check-in message with the same location gating
pub fn generate_missed_check_in_message(
    name: &str,
    location: Option<&LocationFix>,
    share_location: bool,
) -> String {
    let fix = if share_location { location } else { None };
    missed_check_in_message(name, fix)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sos_without_location() {
        let msg = generate_sos_message("Maya", None, false);
        assert!(msg.contains("SOS"));
        assert!(msg.contains("Maya"));
        assert!(!msg.contains("maps.google.com"));
    }

    #[test]
    fn test_sos_with_location() {
        let fix = LocationFix::new(40.0, -74.0, None);
        let msg = generate_sos_message("Maya", Some(&fix), true);
        assert!(msg.contains("https://maps.google.com/?q=40,-74"));
    }

    #[test]
    fn test_sos_location_suppressed_when_sharing_off() {
        let fix = LocationFix::new(40.0, -74.0, None);
        let msg = generate_sos_message("Maya", Some(&fix), false);
        assert!(!msg.contains("maps.google.com"));
    }

    #[test]
    fn test_missed_check_in_wording() {
        let msg = missed_check_in_message("Maya", None);
        assert!(msg.contains("missed their daily check-in"));
        assert!(!msg.contains("Location:"));
    }

    #[test]
    fn test_test_alert_wording() {
        let msg = test_alert_message("Maya");
        assert_eq!(
            msg,
            "This is a test alert from Maya's CareBow safety system. No action needed."
        );
    }
}

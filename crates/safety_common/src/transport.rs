//! Outbound alert transport seam.
//!
//! Delivery of SOS / missed-check-in messages is delegated to an external
//! SMS/WhatsApp gateway. This subsystem only hands messages over; it does
//! not guarantee delivery.

use tracing::info;

use crate::contacts::SafetyContact;
use crate::error::SafetyError;

/// Hand-off point for outbound alert messages
pub trait AlertTransport: Send + Sync {
    fn send(&self, contact: &SafetyContact, message: &str) -> Result<(), SafetyError>;
}

/// Default transport: records the hand-off in the log.
///
/// Stands in wherever no gateway is wired up, so alert flows stay
/// exercisable end to end.
pub struct LogTransport;

impl AlertTransport for LogTransport {
    fn send(&self, contact: &SafetyContact, message: &str) -> Result<(), SafetyError> {
        info!(
            "Alert to {} via {} ({}): {}",
            contact.name,
            contact.channel(),
            contact.phone_number,
            message
        );
        Ok(())
    }
}

//! Location fix type and map link formatting.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A resolved device position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationFix {
    pub lat: f64,
    pub lng: f64,
    /// Horizontal accuracy in meters, when the provider reports one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accuracy: Option<f64>,
    pub timestamp: DateTime<Utc>,
}

impl LocationFix {
    pub fn new(lat: f64, lng: f64, accuracy: Option<f64>) -> Self {
        Self {
            lat,
            lng,
            accuracy,
            timestamp: Utc::now(),
        }
    }

    /// Google Maps link for sharing in alert messages
    pub fn google_maps_link(&self) -> String {
        format!("https://maps.google.com/?q={},{}", self.lat, self.lng)
    }

    /// Apple Maps equivalent, same query parameter shape
    pub fn apple_maps_link(&self) -> String {
        format!("https://maps.apple.com/?q={},{}", self.lat, self.lng)
    }
}

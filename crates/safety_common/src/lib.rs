//! Safety Common - Shared types and logic for the CareBow safety system
//!
//! Everything both safetyd and safetyctl need: the persisted safety store,
//! the pure check-in state machine, contacts, events, alert messages, and
//! the geolocation resolver.

pub mod checkin;
pub mod config;
pub mod contacts;
pub mod error;
pub mod events;
pub mod geolocation;
pub mod location;
pub mod messages;
pub mod permissions;
pub mod persist;
pub mod phone;
pub mod settings;
pub mod store;
pub mod transport;

pub use checkin::{CheckInState, CheckInStatus};
pub use contacts::{ContactPatch, NewContact, SafetyContact};
pub use error::SafetyError;
pub use events::{EventLog, EventMetadata, SafetyEvent, SafetyEventKind};
pub use geolocation::{GeoResolver, LocationProvider, RaceOutcome};
pub use location::LocationFix;
pub use permissions::{PermissionState, SafetyPermissions};
pub use settings::{EscalationStep, SafetySettings, SettingsPatch};
pub use store::SafetyStore;

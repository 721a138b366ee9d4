//! CLI - Command-line argument parsing
//!
//! Defines the CLI structure using clap.
//! Keeps argument parsing separate from execution logic.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// CareBow Safety CLI
#[derive(Parser)]
#[command(name = "safetyctl")]
#[command(about = "CareBow Safety - daily check-ins and emergency escalation", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Path to config file (default: ~/.config/carebow-safety/config.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand)]
pub enum Commands {
    /// Show check-in status, contacts and recent events
    Status {
        /// Output JSON only
        #[arg(long)]
        json: bool,
    },

    /// Record today's "I'm OK" check-in
    Checkin {
        /// Attach a note to the check-in
        #[arg(long)]
        note: Option<String>,
    },

    /// Trigger an immediate SOS alert to your emergency contacts
    Sos {
        /// Attach a note to the alert
        #[arg(long)]
        note: Option<String>,

        /// Do not attach a location even if sharing is enabled
        #[arg(long)]
        no_location: bool,
    },

    /// Send a test alert through the contact chain
    TestAlert,

    /// Manage emergency contacts
    Contacts {
        #[command(subcommand)]
        action: ContactCommands,
    },

    /// Show or change safety settings
    Settings {
        #[command(subcommand)]
        action: SettingsCommands,
    },
}

/// Contact subcommands
#[derive(Subcommand)]
pub enum ContactCommands {
    /// List emergency contacts
    List,

    /// Add an emergency contact
    Add {
        /// Contact name
        name: String,
        /// Phone number (10+ digits, optional +countrycode)
        phone: String,
        /// Relationship to you (e.g. daughter, neighbor)
        #[arg(long)]
        relationship: Option<String>,
        /// Make this contact the primary
        #[arg(long)]
        primary: bool,
        /// Contact can receive WhatsApp messages
        #[arg(long)]
        whatsapp: bool,
    },

    /// Remove a contact (by name or id prefix)
    Remove {
        contact: String,
    },

    /// Make a contact the primary (by name or id prefix)
    SetPrimary {
        contact: String,
    },
}

/// Settings subcommands
#[derive(Subcommand)]
pub enum SettingsCommands {
    /// Show current settings
    Show,

    /// Change settings (only the given flags are applied)
    Set {
        /// Enable or disable the daily check-in
        #[arg(long)]
        daily_check_in: Option<bool>,
        /// Daily check-in time, 24-hour HH:MM
        #[arg(long)]
        time: Option<String>,
        /// Grace period in minutes (1-1440)
        #[arg(long)]
        grace_minutes: Option<u32>,
        /// Enable or disable contact escalation
        #[arg(long)]
        escalation: Option<bool>,
        /// Share location on SOS alerts
        #[arg(long)]
        share_location_on_sos: Option<bool>,
        /// Share location on missed check-in alerts
        #[arg(long)]
        share_location_on_missed: Option<bool>,
    },

    /// Restore default settings
    Reset,
}

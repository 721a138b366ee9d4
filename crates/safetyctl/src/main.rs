//! safetyctl - CareBow Safety control CLI.

mod cli;
mod commands;

use anyhow::Result;
use clap::Parser;
use tracing::Level;

use safety_common::config::SafetyConfig;
use safety_common::geolocation::{GeoResolver, LocationProvider};
use safety_common::store::SafetyStore;

use cli::{Cli, Commands, ContactCommands, SettingsCommands};

#[tokio::main]
async fn main() -> Result<()> {
    // Keep CLI output clean; warnings and errors still reach stderr
    tracing_subscriber::fmt()
        .with_max_level(Level::WARN)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let config = match cli.config {
        Some(ref path) => SafetyConfig::load_from(path)?,
        None => SafetyConfig::load()?,
    };
    let mut store = SafetyStore::load(config.state_file(), config.display_name.clone());

    match cli.command {
        Commands::Status { json } => commands::status(&store, json)?,

        Commands::Checkin { note } => commands::checkin(&mut store, note)?,

        Commands::Sos { note, no_location } => {
            let provider = LocationProvider::from_command_line(config.location_command.as_deref());
            // Location permission as last cached by the daemon's probes
            let mut resolver = GeoResolver::new(provider, store.permissions().location);
            commands::sos(&mut store, &mut resolver, &config, note, no_location).await?;
        }

        Commands::TestAlert => commands::test_alert(&mut store, &config)?,

        Commands::Contacts { action } => match action {
            ContactCommands::List => commands::contacts_list(&store)?,
            ContactCommands::Add {
                name,
                phone,
                relationship,
                primary,
                whatsapp,
            } => commands::contacts_add(&mut store, name, phone, relationship, primary, whatsapp)?,
            ContactCommands::Remove { contact } => commands::contacts_remove(&mut store, &contact)?,
            ContactCommands::SetPrimary { contact } => {
                commands::contacts_set_primary(&mut store, &contact)?
            }
        },

        Commands::Settings { action } => match action {
            SettingsCommands::Show => commands::settings_show(&store)?,
            SettingsCommands::Set {
                daily_check_in,
                time,
                grace_minutes,
                escalation,
                share_location_on_sos,
                share_location_on_missed,
            } => commands::settings_set(
                &mut store,
                daily_check_in,
                time,
                grace_minutes,
                escalation,
                share_location_on_sos,
                share_location_on_missed,
            )?,
            SettingsCommands::Reset => commands::settings_reset(&mut store)?,
        },
    }

    Ok(())
}

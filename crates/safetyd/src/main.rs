//! CareBow safety daemon.
//!
//! Watches the daily check-in schedule, shows reminders, records missed
//! check-ins and escalates to emergency contacts.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use tokio::sync::RwLock;
use tracing::{info, warn, Level};

use safety_common::config::SafetyConfig;
use safety_common::geolocation::{GeoResolver, LocationProvider};
use safety_common::store::SafetyStore;
use safety_common::transport::LogTransport;

use safetyd::notifier::Notifier;
use safetyd::probes;
use safetyd::scheduler::NotificationScheduler;
use safetyd::watcher::Watcher;

/// CareBow safety daemon
#[derive(Parser)]
#[command(name = "safetyd")]
#[command(about = "CareBow safety check-in daemon", long_about = None)]
#[command(version)]
struct Args {
    /// Path to config file (default: ~/.config/carebow-safety/config.toml)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Override the state directory
    #[arg(long)]
    state_dir: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_max_level(Level::INFO)
        .init();

    let args = Args::parse();
    info!("CareBow safety daemon v{} starting", env!("CARGO_PKG_VERSION"));

    let mut config = match args.config {
        Some(path) => SafetyConfig::load_from(&path)?,
        None => SafetyConfig::load()?,
    };
    if let Some(dir) = args.state_dir {
        config.state_dir = Some(dir);
    }

    let mut store = SafetyStore::load(config.state_file(), config.display_name.clone());
    info!(
        "Safety state loaded: {} contact(s), {} event(s)",
        store.contacts().len(),
        store.events().len()
    );

    // Probe host capability into the permission cache
    let permissions = probes::probe_permissions(&config);
    if let Err(e) = store.set_permissions(permissions) {
        warn!("Could not persist permission cache: {}", e);
    }

    let provider = LocationProvider::from_command_line(config.location_command.as_deref());
    let resolver = GeoResolver::new(provider, permissions.location);

    let store = Arc::new(RwLock::new(store));
    let scheduler = Arc::new(RwLock::new(NotificationScheduler::new()));
    let resolver = Arc::new(RwLock::new(resolver));

    let watcher = Watcher::new(
        store,
        scheduler,
        resolver,
        Notifier::detect(),
        Arc::new(LogTransport),
        config,
    );
    tokio::spawn(watcher.run());

    info!("Safety daemon ready");

    tokio::signal::ctrl_c().await?;
    info!("Shutting down gracefully");

    Ok(())
}

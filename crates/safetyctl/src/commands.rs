//! Command execution for safetyctl.

use anyhow::{bail, Result};
use chrono::Local;
use uuid::Uuid;

use safety_common::config::SafetyConfig;
use safety_common::contacts::NewContact;
use safety_common::events::EventMetadata;
use safety_common::geolocation::GeoResolver;
use safety_common::messages;
use safety_common::phone;
use safety_common::settings::SettingsPatch;
use safety_common::store::SafetyStore;
use safety_common::transport::{AlertTransport, LogTransport};

/// Resolve a contact selector (exact name, case-insensitive, or id
/// prefix) to a contact id.
fn resolve_contact(store: &SafetyStore, selector: &str) -> Result<Uuid> {
    let lowered = selector.to_lowercase();
    let matches: Vec<Uuid> = store
        .contacts()
        .iter()
        .filter(|c| {
            c.name.to_lowercase() == lowered || c.id.to_string().starts_with(&lowered)
        })
        .map(|c| c.id)
        .collect();

    match matches.len() {
        0 => bail!("no contact matches '{}'", selector),
        1 => Ok(matches[0]),
        n => bail!("'{}' is ambiguous ({} contacts match)", selector, n),
    }
}

/// `safetyctl status`
pub fn status(store: &SafetyStore, json: bool) -> Result<()> {
    let now = Local::now();
    let state = store.check_in_state(now);

    if json {
        let value = serde_json::json!({
            "check_in": state,
            "settings": store.settings(),
            "permissions": store.permissions(),
            "contacts": store.contacts(),
            "events": store.events().iter().take(10).collect::<Vec<_>>(),
        });
        println!("{}", serde_json::to_string_pretty(&value)?);
        return Ok(());
    }

    println!("Check-in status: {:?}", state.status);
    if let Some(scheduled) = state.scheduled_time {
        println!("  Scheduled today: {}", scheduled.format("%H:%M"));
    }
    if let Some(deadline) = state.deadline_time {
        println!("  Deadline:        {}", deadline.format("%H:%M"));
    }
    if let Some(checked) = state.check_in_time {
        println!("  Last check-in:   {}", checked.format("%Y-%m-%d %H:%M"));
    }
    if state.is_overdue {
        println!("  OVERDUE - contacts will be alerted");
    }

    println!();
    if store.contacts().is_empty() {
        println!("No emergency contacts configured.");
    } else {
        println!("Emergency contacts:");
        for contact in store.contacts() {
            println!(
                "  {} {} ({}){}",
                if contact.is_primary { "*" } else { " " },
                contact.name,
                phone::format_phone_number(&contact.phone_number),
                contact
                    .relationship
                    .as_deref()
                    .map(|r| format!(" - {}", r))
                    .unwrap_or_default()
            );
        }
    }

    if let Some(latest) = store.events().latest() {
        println!();
        println!(
            "Last event: {:?} at {}",
            latest.kind,
            latest
                .timestamp
                .with_timezone(&Local)
                .format("%Y-%m-%d %H:%M")
        );
    }

    Ok(())
}

/// `safetyctl checkin`
pub fn checkin(store: &mut SafetyStore, note: Option<String>) -> Result<()> {
    let event = store.record_check_in(note)?;
    if event.metadata.was_late {
        println!("Check-in recorded (after today's deadline). Your contacts were already alerted.");
    } else {
        println!("Check-in recorded. See you tomorrow.");
    }
    Ok(())
}

/// `safetyctl sos`
pub async fn sos(
    store: &mut SafetyStore,
    resolver: &mut GeoResolver,
    config: &SafetyConfig,
    note: Option<String>,
    no_location: bool,
) -> Result<()> {
    store.begin_sos();

    let share_location = store.settings().share_location_on_sos && !no_location;
    let location = if share_location {
        match resolver.location_with_fallback(config.location_timeout()).await {
            Ok(fix) => Some(fix),
            Err(e) => {
                // The alert goes out regardless
                eprintln!("Could not get a location ({}), sending alert without it", e);
                None
            }
        }
    } else {
        None
    };

    let escalation_enabled = store.settings().escalation_enabled;
    let targets: Vec<_> = if escalation_enabled {
        store.escalation_targets().into_iter().cloned().collect()
    } else {
        Vec::new()
    };

    let message =
        messages::generate_sos_message(&config.display_name, location.as_ref(), share_location);
    let transport = LogTransport;
    for contact in &targets {
        transport.send(contact, &message)?;
        println!("Alerting {} ({})", contact.name, phone::format_phone_number(&contact.phone_number));
    }

    let metadata = EventMetadata {
        location,
        note,
        contacts_notified: targets.iter().map(|c| c.name.clone()).collect(),
        was_late: false,
    };
    store.trigger_sos(metadata)?;

    match targets.len() {
        0 => {
            println!("SOS recorded, but no contacts were alerted.");
            if !escalation_enabled {
                println!("Escalation is disabled (safetyctl settings set --escalation true).");
            } else {
                println!("Add a contact first (safetyctl contacts add <name> <phone>).");
            }
        }
        n => println!("SOS sent to {} contact(s).", n),
    }

    Ok(())
}

/// `safetyctl test-alert`
pub fn test_alert(store: &mut SafetyStore, config: &SafetyConfig) -> Result<()> {
    if store.contacts().is_empty() {
        bail!("no emergency contacts configured");
    }

    let message = messages::test_alert_message(&config.display_name);
    let transport = LogTransport;
    let mut notified = Vec::new();
    for contact in store.contacts().to_vec() {
        transport.send(&contact, &message)?;
        println!("Test alert sent to {}", contact.name);
        notified.push(contact.name);
    }
    store.record_test_alert(notified)?;

    Ok(())
}

/// `safetyctl contacts list`
pub fn contacts_list(store: &SafetyStore) -> Result<()> {
    if store.contacts().is_empty() {
        println!("No emergency contacts configured.");
        return Ok(());
    }
    for contact in store.contacts() {
        println!(
            "{} {}  {}  [{}]{}",
            if contact.is_primary { "*" } else { " " },
            contact.name,
            phone::format_phone_number(&contact.phone_number),
            contact.channel(),
            contact
                .relationship
                .as_deref()
                .map(|r| format!("  ({})", r))
                .unwrap_or_default()
        );
    }
    Ok(())
}

/// `safetyctl contacts add`
pub fn contacts_add(
    store: &mut SafetyStore,
    name: String,
    phone_number: String,
    relationship: Option<String>,
    primary: bool,
    whatsapp: bool,
) -> Result<()> {
    let contact = store.add_contact(NewContact {
        name,
        relationship,
        phone_number,
        country_code: None,
        is_primary: primary,
        can_receive_sms: true,
        can_receive_whatsapp: whatsapp,
    })?;
    println!(
        "Added {} ({}){}",
        contact.name,
        phone::format_phone_number(&contact.phone_number),
        if contact.is_primary { " as primary" } else { "" }
    );
    Ok(())
}

/// `safetyctl contacts remove`
pub fn contacts_remove(store: &mut SafetyStore, selector: &str) -> Result<()> {
    let id = resolve_contact(store, selector)?;
    store.delete_contact(id)?;
    println!("Contact removed.");
    if let Some(primary) = store.primary_contact() {
        println!("Primary contact is now {}.", primary.name);
    }
    Ok(())
}

/// `safetyctl contacts set-primary`
pub fn contacts_set_primary(store: &mut SafetyStore, selector: &str) -> Result<()> {
    let id = resolve_contact(store, selector)?;
    store.set_primary_contact(id)?;
    println!("Primary contact updated.");
    Ok(())
}

/// `safetyctl settings show`
pub fn settings_show(store: &SafetyStore) -> Result<()> {
    let settings = store.settings();
    println!(
        "Daily check-in:        {}",
        if settings.daily_check_in_enabled { "enabled" } else { "disabled" }
    );
    println!("Check-in time:         {}", settings.daily_check_in_time);
    println!("Grace period:          {} minutes", settings.grace_period_minutes);
    println!(
        "Escalation:            {}",
        if settings.escalation_enabled { "enabled" } else { "disabled" }
    );
    println!("Share location (SOS):  {}", settings.share_location_on_sos);
    println!(
        "Share location (miss): {}",
        settings.share_location_on_missed_check_in
    );
    Ok(())
}

/// `safetyctl settings set`
pub fn settings_set(
    store: &mut SafetyStore,
    daily_check_in: Option<bool>,
    time: Option<String>,
    grace_minutes: Option<u32>,
    escalation: Option<bool>,
    share_location_on_sos: Option<bool>,
    share_location_on_missed: Option<bool>,
) -> Result<()> {
    store.update_settings(SettingsPatch {
        daily_check_in_enabled: daily_check_in,
        daily_check_in_time: time,
        grace_period_minutes: grace_minutes,
        escalation_enabled: escalation,
        escalation_order: None,
        share_location_on_sos,
        share_location_on_missed_check_in: share_location_on_missed,
    })?;
    println!("Settings updated.");
    settings_show(store)
}

/// `safetyctl settings reset`
pub fn settings_reset(store: &mut SafetyStore) -> Result<()> {
    store.reset_settings()?;
    println!("Settings restored to defaults.");
    Ok(())
}

//! Status command - show the mesh timestamp and profiles without changing anything.

use chrono::{Local, TimeZone};
use meshguard::{ConfigFile, Freshness, MeshManager, MeshStatus};

use super::common::{load_settings, print_paths};
use crate::error::CliError;

/// Run the status command.
pub fn run(settings: &ConfigFile) -> Result<(), CliError> {
    let config = load_settings(settings)?;
    print_paths(settings, &config);
    println!();

    let active = config.active_profile.clone();
    let outdated = config.outdated_profile.clone();
    let status = MeshManager::with_defaults(config).status()?;

    for line in describe(&status, &active, &outdated) {
        println!("{}", line);
    }
    Ok(())
}

fn describe(status: &MeshStatus, active: &str, outdated: &str) -> Vec<String> {
    let mut lines = Vec::new();

    let updated = match status.timestamp {
        Some(ts) => format_local(ts),
        None => "(not set)".to_string(),
    };
    lines.push(format!("Last change: {}", updated));

    let freshness = match status.freshness {
        Freshness::NoTimestamp => "unknown, created on next check".to_string(),
        Freshness::Fresh { age_secs } => format!("fresh ({})", meshguard::policy::format_age(age_secs)),
        Freshness::Stale { age_secs } => format!("stale ({})", meshguard::policy::format_age(age_secs)),
    };
    lines.push(format!("Mesh:        {}", freshness));

    match status.profiles {
        None => lines.push("Profiles:    (printer config not found)".to_string()),
        Some(ref profiles) if profiles.is_empty() => {
            lines.push("Profiles:    (none)".to_string())
        }
        Some(ref profiles) => {
            lines.push("Profiles:".to_string());
            for name in profiles {
                let tag = if name == active {
                    " (active)"
                } else if name == outdated {
                    " (outdated)"
                } else {
                    ""
                };
                lines.push(format!("  {}{}", name, tag));
            }
        }
    }

    lines
}

fn format_local(ts: i64) -> String {
    match Local.timestamp_opt(ts, 0).single() {
        Some(dt) => dt.format("%Y-%m-%d %H:%M:%S").to_string(),
        None => ts.to_string(),
    }
}

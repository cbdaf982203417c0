//! Check command - run one staleness cycle and exit.

use meshguard::logging::init_logging;
use meshguard::{CheckOutcome, ConfigFile, MeshManager};

use super::common::load_settings;
use crate::error::CliError;

/// Run the check command.
pub fn run(settings: &ConfigFile) -> Result<(), CliError> {
    let config = load_settings(settings)?;
    let _logging = init_logging(config.log_dir.as_deref())?;

    let outcome = MeshManager::with_defaults(config).check()?;
    println!("{}", summary(&outcome));
    Ok(())
}

fn summary(outcome: &CheckOutcome) -> String {
    let label = match outcome {
        CheckOutcome::TimestampCreated { .. } => "Created",
        CheckOutcome::UpToDate { .. } => "Fresh",
        CheckOutcome::Demoted { .. } => "Demoted",
        CheckOutcome::Deferred { .. } => "Deferred",
        CheckOutcome::NothingToDemote { .. } => "Stale",
    };
    format!("{}: {}", label, outcome)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_labels() {
        assert_eq!(
            summary(&CheckOutcome::UpToDate { age_secs: 60 }),
            "Fresh: mesh is up to date (1m old)"
        );
        assert!(summary(&CheckOutcome::Deferred { age_secs: 50_000 }).starts_with("Deferred:"));
    }
}

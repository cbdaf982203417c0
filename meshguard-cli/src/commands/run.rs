//! Run command - watch printer.cfg and demote stale meshes until interrupted.

use meshguard::logging::init_logging;
use meshguard::{ConfigFile, MeshGuardService};
use tokio_util::sync::CancellationToken;
use tracing::info;

use super::common::{load_settings, print_paths};
use crate::error::CliError;

/// Run the daemon.
pub fn run(settings: &ConfigFile) -> Result<(), CliError> {
    let config = load_settings(settings)?;
    let _logging = init_logging(config.log_dir.as_deref())?;

    println!("meshguard v{}", meshguard::VERSION);
    println!("==============");
    println!();
    print_paths(settings, &config);
    println!(
        "Max age:    {}h (checked every {}m)",
        config.max_age.as_secs() / 3600,
        config.check_interval.as_secs() / 60
    );
    println!();
    println!("Press Ctrl+C to stop");
    println!();

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(CliError::Runtime)?;

    let service = MeshGuardService::start(config)?;

    let shutdown = CancellationToken::new();
    let signal = shutdown.clone();
    ctrlc::set_handler(move || {
        info!("Received shutdown signal");
        signal.cancel();
    })
    .map_err(|e| CliError::Signal(e.to_string()))?;

    let cycles = runtime.block_on(service.run(shutdown));

    println!();
    println!("Stopped after {} checks.", cycles);
    Ok(())
}

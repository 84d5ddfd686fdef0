pub mod config;
pub mod db;
pub mod models;
pub mod error;
pub mod hierarchy; // Hospitals, clinics, services
pub mod membership; // Registration, roles, doctor and patient placement
pub mod diagnostics; // Diagnostic catalog and patient records
pub mod reporting; // Read-only statistics

#[cfg(test)]
mod scenario_tests;

pub use error::ClinicError;

use rusqlite::Connection;
use tracing_subscriber::EnvFilter;

use db::DatabaseError;

/// Install the global tracing subscriber. `RUST_LOG` wins over the default
/// filter. Safe to call more than once; later calls are ignored.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .try_init();
}

/// Open the registry at its configured location, creating the data
/// directory and applying pending migrations.
pub fn open_registry() -> Result<Connection, DatabaseError> {
    let path = config::database_path();
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let conn = db::open_database(&path)?;
    tracing::info!(
        path = %path.display(),
        version = config::APP_VERSION,
        "Clinic registry opened"
    );
    Ok(conn)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_tracing_tolerates_repeat_calls() {
        init_tracing();
        init_tracing();
        tracing::info!("subscriber installed");
    }
}

use std::path::PathBuf;

/// Application-level constants
pub const APP_NAME: &str = "ClinicRegistry";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Overrides the registry database location when set.
pub const DB_PATH_ENV: &str = "CLINIC_REGISTRY_DB";

const DB_FILE_NAME: &str = "registry.db";

/// Get the application data directory
/// <platform data dir>/ClinicRegistry, or ./ClinicRegistry when the platform has none
pub fn app_data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_NAME)
}

/// Registry database file
pub fn database_path() -> PathBuf {
    match std::env::var_os(DB_PATH_ENV) {
        Some(path) if !path.is_empty() => PathBuf::from(path),
        _ => app_data_dir().join(DB_FILE_NAME),
    }
}

/// Filter used when `RUST_LOG` is not set
pub fn default_log_filter() -> &'static str {
    "clinic_registry=info"
}

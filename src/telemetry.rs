//! Tracing subscriber setup.

use crate::settings::LogSettings;
use tracing_subscriber::EnvFilter;

/// Installs the global subscriber. An unparsable level falls back to `info`.
/// SQL statement logs emitted through `log` are bridged into the same output.
pub fn init(settings: &LogSettings) {
    let filter = EnvFilter::try_new(&settings.level).unwrap_or_else(|e| {
        eprintln!("invalid LOG_LEVEL '{}': {}; using info", settings.level, e);
        EnvFilter::new("info")
    });

    if settings.json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

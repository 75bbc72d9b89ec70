//! Tether Services Layer
//!
//! Platform-facing pieces of the client: settings files and local input.

pub mod input;
pub mod settings;

pub use input::{IntentSegment, IntentSource, ScriptedIntent};
pub use settings::{ClientSettings, SettingsError};

/// Load settings from `path`, or fall back to defaults when no path is given.
pub fn init_services(path: Option<&std::path::Path>) -> Result<ClientSettings, SettingsError> {
    let settings = match path {
        Some(path) => ClientSettings::load(path)?,
        None => {
            tracing::info!("no settings file given, using defaults");
            ClientSettings::default()
        }
    };
    tracing::info!(
        player = %settings.player.name,
        hash = format_args!("{:#x}", settings.player.resolved_hash()),
        latency_ms = settings.session.latency_ms,
        "services initialized"
    );
    Ok(settings)
}

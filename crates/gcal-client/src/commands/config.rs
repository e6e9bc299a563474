//! Configuration commands.

use std::path::Path;

use gcal_events::CalendarSettings;

use crate::error::{ClientError, ClientResult};

/// Renders the effective configuration as TOML.
pub fn dump(settings: &CalendarSettings, path: &Path) -> ClientResult<String> {
    let toml_str = toml::to_string_pretty(settings)
        .map_err(|e| ClientError::Output(format!("failed to serialize config: {}", e)))?;
    Ok(format!("# config.toml ({})\n{}", path.display(), toml_str))
}

/// Validates the configuration.
pub fn validate(settings: &CalendarSettings) -> ClientResult<String> {
    settings.validate()?;
    Ok(format!(
        "Configuration is valid (calendar {}, profile {}).",
        settings.calendar_id().unwrap_or_default(),
        settings.default_auth_profile
    ))
}

/// Shows the configuration file path.
pub fn path(path: &Path) -> String {
    format!("config: {}", path.display())
}

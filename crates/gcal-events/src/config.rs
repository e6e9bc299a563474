//! Calendar settings.
//!
//! Settings live in a single `config.toml`, at
//! `~/.config/gcal-events/config.toml` by default:
//!
//! ```toml
//! calendar_id = "team@group.calendar.google.com"
//! default_auth_profile = "service_account"
//!
//! [auth_profiles.service_account]
//! credentials_json = "/path/to/service-account.json"
//!
//! [auth_profiles.oauth]
//! credentials_json = "/path/to/oauth-credentials.json"
//! token_json = "/path/to/oauth-token.json"
//! ```
//!
//! Each credentials setting is either a path to a JSON file or an inline
//! table holding the JSON document itself. `GOOGLE_CALENDAR_ID` and
//! `GOOGLE_CALENDAR_AUTH_PROFILE` override the file.

use std::path::{Path, PathBuf};
#[cfg(feature = "google")]
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

#[cfg(feature = "google")]
use crate::auth::{OAuthTokenSource, ServiceAccountTokenSource, TokenSource};
#[cfg(feature = "google")]
use crate::error::EventsResult;

/// Environment variable overriding `calendar_id`.
pub const CALENDAR_ID_ENV: &str = "GOOGLE_CALENDAR_ID";
/// Environment variable overriding `default_auth_profile`.
pub const AUTH_PROFILE_ENV: &str = "GOOGLE_CALENDAR_AUTH_PROFILE";

const APP_DIR: &str = "gcal-events";

/// Supported authentication profiles.
pub const SERVICE_ACCOUNT_PROFILE: &str = "service_account";
pub const OAUTH_PROFILE: &str = "oauth";

/// Errors raised while loading or validating settings.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error(
        "There was no calendar id specified. You must provide a valid calendar id to fetch events for."
    )]
    CalendarIdNotSpecified,

    #[error(
        "Authentication profile [{0}] does not match any of the supported authentication types."
    )]
    InvalidAuthenticationProfile(String),

    #[error("Setting `{setting}` is of type `{kind}` but must be a table or a path to a json file.")]
    CredentialsTypeWrong { setting: String, kind: &'static str },

    #[error("Could not find a credentials file at `{}`.", .0.display())]
    CredentialsJsonDoesNotExist(PathBuf),

    #[error("failed to read `{}`: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config `{}`: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("setting `{setting}` does not hold valid JSON: {source}")]
    InvalidJson {
        setting: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Top-level settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CalendarSettings {
    /// Calendar used when an operation names none.
    pub calendar_id: Option<String>,

    /// `service_account` or `oauth`.
    pub default_auth_profile: String,

    pub auth_profiles: AuthProfiles,
}

impl Default for CalendarSettings {
    fn default() -> Self {
        Self {
            calendar_id: None,
            default_auth_profile: SERVICE_ACCOUNT_PROFILE.to_string(),
            auth_profiles: AuthProfiles::default(),
        }
    }
}

/// Credentials for each authentication profile.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthProfiles {
    pub service_account: ServiceAccountProfile,
    pub oauth: OAuthProfile,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceAccountProfile {
    /// Path to the key file, or the key as an inline table.
    pub credentials_json: Value,
}

impl Default for ServiceAccountProfile {
    fn default() -> Self {
        Self {
            credentials_json: default_credentials_path("service-account-credentials.json"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OAuthProfile {
    /// Path to the OAuth client file, or its content as an inline table.
    pub credentials_json: Value,
    /// Path to the stored token, or the token as an inline table.
    pub token_json: Value,
}

impl Default for OAuthProfile {
    fn default() -> Self {
        Self {
            credentials_json: default_credentials_path("oauth-credentials.json"),
            token_json: default_credentials_path("oauth-token.json"),
        }
    }
}

fn default_credentials_path(file_name: &str) -> Value {
    let dir = dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR);
    Value::String(dir.join(file_name).to_string_lossy().into_owned())
}

impl CalendarSettings {
    /// Loads settings from the default path, falling back to defaults when the
    /// file does not exist, then applies environment overrides.
    pub fn load() -> Result<Self, ConfigError> {
        let path = Self::default_path();
        let mut settings = if path.exists() {
            Self::read(&path)?
        } else {
            Self::default()
        };
        settings.apply_env_overrides(|name| std::env::var(name).ok());
        Ok(settings)
    }

    /// Loads settings from a specific path, then applies environment overrides.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let mut settings = Self::read(path)?;
        settings.apply_env_overrides(|name| std::env::var(name).ok());
        Ok(settings)
    }

    fn read(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Returns the default configuration file path.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(APP_DIR)
            .join("config.toml")
    }

    /// Applies `GOOGLE_CALENDAR_*` overrides read through `lookup`.
    pub fn apply_env_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(calendar_id) = lookup(CALENDAR_ID_ENV) {
            self.calendar_id = Some(calendar_id);
        }
        if let Some(profile) = lookup(AUTH_PROFILE_ENV) {
            self.default_auth_profile = profile;
        }
    }

    /// The configured calendar id, if set and not empty.
    pub fn calendar_id(&self) -> Option<&str> {
        self.calendar_id.as_deref().filter(|id| !id.is_empty())
    }

    /// Checks that a gateway can be built from these settings.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.calendar_id().is_none() {
            return Err(ConfigError::CalendarIdNotSpecified);
        }

        match self.default_auth_profile.as_str() {
            SERVICE_ACCOUNT_PROFILE => validate_setting(
                "auth_profiles.service_account.credentials_json",
                &self.auth_profiles.service_account.credentials_json,
            ),
            OAUTH_PROFILE => {
                validate_setting(
                    "auth_profiles.oauth.credentials_json",
                    &self.auth_profiles.oauth.credentials_json,
                )?;
                validate_setting(
                    "auth_profiles.oauth.token_json",
                    &self.auth_profiles.oauth.token_json,
                )
            }
            other => Err(ConfigError::InvalidAuthenticationProfile(other.to_string())),
        }
    }

    /// Builds the token source for the selected profile.
    #[cfg(feature = "google")]
    pub fn token_source(&self) -> EventsResult<Arc<dyn TokenSource>> {
        self.validate()?;

        if self.default_auth_profile == OAUTH_PROFILE {
            let oauth = &self.auth_profiles.oauth;
            let credentials = read_setting("auth_profiles.oauth.credentials_json", &oauth.credentials_json)?;
            let token = read_setting("auth_profiles.oauth.token_json", &oauth.token_json)?;
            return Ok(Arc::new(OAuthTokenSource::from_json(credentials, token)?));
        }

        let key = read_setting(
            "auth_profiles.service_account.credentials_json",
            &self.auth_profiles.service_account.credentials_json,
        )?;
        Ok(Arc::new(ServiceAccountTokenSource::from_json(key)?))
    }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "table",
    }
}

fn validate_setting(setting: &str, value: &Value) -> Result<(), ConfigError> {
    match value {
        Value::Object(_) => Ok(()),
        Value::String(path) if Path::new(path).exists() => Ok(()),
        Value::String(path) => Err(ConfigError::CredentialsJsonDoesNotExist(PathBuf::from(path))),
        other => Err(ConfigError::CredentialsTypeWrong {
            setting: setting.to_string(),
            kind: kind_of(other),
        }),
    }
}

/// Returns the JSON document a validated setting refers to.
#[cfg(feature = "google")]
fn read_setting(setting: &str, value: &Value) -> Result<Value, ConfigError> {
    let Value::String(path) = value else {
        return Ok(value.clone());
    };
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: PathBuf::from(path),
        source,
    })?;
    serde_json::from_str(&content).map_err(|source| ConfigError::InvalidJson {
        setting: setting.to_string(),
        source,
    })
}

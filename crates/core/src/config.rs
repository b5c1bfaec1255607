use std::{collections::BTreeMap, env, time::Duration};

use serde::Deserialize;

use crate::{ConfigError, Result};

pub const BACKEND_BASE_ENV: &str = "PGEXTRA_DATABASE_BACKEND_BASE";
pub const AUTO_EXTENSION_SET_UP_ENV: &str = "PGEXTRA_AUTO_EXTENSION_SET_UP";
pub const MIGRATION_TIMEOUT_ENV: &str = "PGEXTRA_MIGRATION_TIMEOUT_SECS";

const SUPPORTED_BACKEND_BASES: &[&str] = &["postgres", "postgis"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Version {
    pub major: u16,
    pub minor: u16,
    pub patch: u16,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConnectionConfig {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub user: Option<String>,
    pub password: Option<String>,
    pub database: String,
    pub socket: Option<String>,
    pub extra: BTreeMap<String, String>,
}

/// Process-wide knobs, read once from the environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub backend_base: String,
    pub auto_extension_set_up: bool,
    pub migration_timeout: Option<Duration>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            backend_base: SUPPORTED_BACKEND_BASES[0].to_string(),
            auto_extension_set_up: true,
            migration_timeout: None,
        }
    }
}

impl Settings {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut settings = Self::default();

        if let Some(base) = lookup(BACKEND_BASE_ENV) {
            settings.backend_base = validate_backend_base(base.trim())?;
        }
        if let Some(raw) = lookup(AUTO_EXTENSION_SET_UP_ENV) {
            settings.auto_extension_set_up = parse_bool_setting(AUTO_EXTENSION_SET_UP_ENV, &raw)?;
        }
        if let Some(raw) = lookup(MIGRATION_TIMEOUT_ENV) {
            let seconds = raw.trim().parse::<u64>().map_err(|_| ConfigError::InvalidSetting {
                name: MIGRATION_TIMEOUT_ENV.to_string(),
                value: raw.clone(),
                message: "expected a whole number of seconds".to_string(),
            })?;
            settings.migration_timeout = (seconds > 0).then(|| Duration::from_secs(seconds));
        }

        Ok(settings)
    }
}

fn validate_backend_base(base: &str) -> Result<String> {
    if SUPPORTED_BACKEND_BASES.contains(&base) {
        return Ok(base.to_string());
    }

    Err(ConfigError::InvalidBackendBase {
        value: base.to_string(),
        expected: SUPPORTED_BACKEND_BASES.join(", "),
    }
    .into())
}

fn parse_bool_setting(name: &str, raw: &str) -> Result<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidSetting {
            name: name.to_string(),
            value: raw.to_string(),
            message: "expected a boolean".to_string(),
        }
        .into()),
    }
}

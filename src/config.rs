//! Runtime configuration from the environment
//!
//! A `.env` file in the working directory is loaded first if present.

use std::path::PathBuf;
use thiserror::Error;

pub const TOKEN_VAR: &str = "DISCORD_BOT_TOKEN";
pub const APPLICATION_ID_VAR: &str = "CLIENT_ID";
pub const GUILD_ID_VAR: &str = "GUILD_ID";
pub const STAFF_ROLES_VAR: &str = "STAFF_ROLE_IDS";
pub const DATA_DIR_VAR: &str = "DATA_DIR";

/// Default directory for `scammers.json` and `settings.json`
pub const DEFAULT_DATA_DIR: &str = "data";

/// Errors raised while reading the configuration
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("{key} has an invalid id: {value:?}")]
    Invalid { key: &'static str, value: String },

    #[error("STAFF_ROLE_IDS must list at least one role id")]
    NoStaffRoles,
}

/// Bot configuration
#[derive(Clone, PartialEq, Eq)]
pub struct Config {
    pub token: String,
    pub application_id: u64,
    /// Guild the slash commands are registered in
    pub guild_id: u64,
    pub staff_role_ids: Vec<u64>,
    pub data_dir: PathBuf,
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("token", &"<redacted>")
            .field("application_id", &self.application_id)
            .field("guild_id", &self.guild_id)
            .field("staff_role_ids", &self.staff_role_ids)
            .field("data_dir", &self.data_dir)
            .finish()
    }
}

impl Config {
    /// Read the configuration from the process environment
    ///
    /// # Errors
    /// Returns an error if a required variable is missing or malformed
    pub fn from_env() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the configuration from an arbitrary variable lookup
    ///
    /// # Errors
    /// Returns an error if a required variable is missing or malformed
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let required = |key: &'static str| {
            lookup(key)
                .filter(|value| !value.trim().is_empty())
                .ok_or(ConfigError::Missing(key))
        };

        let token = required(TOKEN_VAR)?.trim().to_string();
        let application_id = parse_id(APPLICATION_ID_VAR, &required(APPLICATION_ID_VAR)?)?;
        let guild_id = parse_id(GUILD_ID_VAR, &required(GUILD_ID_VAR)?)?;

        let staff_role_ids = required(STAFF_ROLES_VAR)?
            .split(',')
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .map(|id| parse_id(STAFF_ROLES_VAR, id))
            .collect::<Result<Vec<_>, _>>()?;
        if staff_role_ids.is_empty() {
            return Err(ConfigError::NoStaffRoles);
        }

        let data_dir = lookup(DATA_DIR_VAR)
            .filter(|dir| !dir.trim().is_empty())
            .map_or_else(|| PathBuf::from(DEFAULT_DATA_DIR), PathBuf::from);

        Ok(Self {
            token,
            application_id,
            guild_id,
            staff_role_ids,
            data_dir,
        })
    }
}

fn parse_id(key: &'static str, value: &str) -> Result<u64, ConfigError> {
    match value.trim().parse::<u64>() {
        Ok(id) if id != 0 => Ok(id),
        _ => Err(ConfigError::Invalid {
            key,
            value: value.to_string(),
        }),
    }
}

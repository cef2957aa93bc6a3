//! File-backed record store
//!
//! Every call re-reads the backing file, and every mutation rewrites it in
//! full. Writes go to a sibling temp file that is renamed over the target.

use crate::STORE_TARGET;
use crate::store::{GuildSettings, NewScammer, Removal, ScammerEntry, StoreError, StoreResult};
use chrono::Utc;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

/// File name of the scammer entry list
pub const SCAMMERS_FILE: &str = "scammers.json";
/// File name of the guild settings map
pub const SETTINGS_FILE: &str = "settings.json";

/// Locations of the two backing files
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorePaths {
    pub scammers: PathBuf,
    pub settings: PathBuf,
}

impl StorePaths {
    /// Standard file names inside `dir`
    #[must_use]
    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref();
        Self {
            scammers: dir.join(SCAMMERS_FILE),
            settings: dir.join(SETTINGS_FILE),
        }
    }
}

type SettingsMap = BTreeMap<u64, GuildSettings>;

/// Durable store for scammer entries and guild settings
#[derive(Debug, Clone)]
pub struct RecordStore {
    paths: StorePaths,
}

impl RecordStore {
    /// Open the store, creating missing directories and seeding missing files
    ///
    /// # Errors
    /// Returns an error if a directory or seed file cannot be created
    pub fn open(paths: StorePaths) -> StoreResult<Self> {
        for path in [&paths.scammers, &paths.settings] {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                fs::create_dir_all(parent).map_err(|e| StoreError::io(parent, e))?;
            }
        }

        if !paths.scammers.exists() {
            write_json(&paths.scammers, &Vec::<ScammerEntry>::new())?;
        }
        if !paths.settings.exists() {
            write_json(&paths.settings, &SettingsMap::new())?;
        }

        info!(
            target: STORE_TARGET,
            scammers = %paths.scammers.display(),
            settings = %paths.settings.display(),
            "Record store opened"
        );
        Ok(Self { paths })
    }

    /// The backing file locations
    #[must_use]
    pub fn paths(&self) -> &StorePaths {
        &self.paths
    }

    /// Settings for a guild, or `None` if it was never configured
    ///
    /// # Errors
    /// Returns an error if the settings file cannot be read or parsed
    pub fn guild_settings(&self, guild_id: u64) -> StoreResult<Option<GuildSettings>> {
        let mut settings = self.read_settings()?;
        Ok(settings.remove(&guild_id))
    }

    /// Overwrite the settings for a guild. No fields are merged.
    ///
    /// # Errors
    /// Returns an error if the settings file cannot be read, parsed or written
    pub fn save_guild_settings(
        &self,
        guild_id: u64,
        data: GuildSettings,
    ) -> StoreResult<GuildSettings> {
        let mut settings = self.read_settings()?;
        settings.insert(guild_id, data.clone());
        write_json(&self.paths.settings, &settings)?;

        info!(target: STORE_TARGET, guild_id, "Guild settings saved");
        Ok(data)
    }

    /// Every entry across all guilds, in insertion order
    ///
    /// # Errors
    /// Returns an error if the scammer file cannot be read or parsed
    pub fn all_scammers(&self) -> StoreResult<Vec<ScammerEntry>> {
        read_json(&self.paths.scammers)
    }

    /// Entries for one guild, optionally restricted to active ones
    ///
    /// # Errors
    /// Returns an error if the scammer file cannot be read or parsed
    pub fn guild_scammers(&self, guild_id: u64, active_only: bool) -> StoreResult<Vec<ScammerEntry>> {
        Ok(self
            .all_scammers()?
            .into_iter()
            .filter(|s| s.guild_id == guild_id && (!active_only || s.is_active()))
            .collect())
    }

    /// Append a new active entry with the next free id
    ///
    /// Duplicates are not rejected here; callers check [`Self::active_scammer`]
    /// first.
    ///
    /// # Errors
    /// Returns an error if the scammer file cannot be read, parsed or written
    pub fn add_scammer(&self, data: NewScammer) -> StoreResult<ScammerEntry> {
        let mut scammers = self.all_scammers()?;
        let id = match scammers.iter().map(|s| s.id).max() {
            None => 1,
            Some(max) => max.checked_add(1).ok_or(StoreError::IdsExhausted(max))?,
        };

        let entry = data.into_entry(id, Utc::now());
        scammers.push(entry.clone());
        write_json(&self.paths.scammers, &scammers)?;

        info!(
            target: STORE_TARGET,
            id = entry.id,
            user_id = entry.user_id,
            guild_id = entry.guild_id,
            "Scammer entry added"
        );
        Ok(entry)
    }

    /// Mark the active entry for the pair as removed
    ///
    /// Returns `None` without writing anything if the user has no active
    /// entry in the guild.
    ///
    /// # Errors
    /// Returns an error if the scammer file cannot be read, parsed or written
    pub fn remove_scammer(
        &self,
        user_id: u64,
        guild_id: u64,
        removal: Removal,
    ) -> StoreResult<Option<ScammerEntry>> {
        let mut scammers = self.all_scammers()?;
        let Some(entry) = scammers
            .iter_mut()
            .find(|s| s.is_active_for(user_id, guild_id))
        else {
            return Ok(None);
        };

        entry.mark_removed(removal, Utc::now());
        let updated = entry.clone();
        write_json(&self.paths.scammers, &scammers)?;

        info!(
            target: STORE_TARGET,
            id = updated.id,
            user_id,
            guild_id,
            "Scammer entry removed"
        );
        Ok(Some(updated))
    }

    /// The active entry for the pair, if any
    ///
    /// # Errors
    /// Returns an error if the scammer file cannot be read or parsed
    pub fn active_scammer(&self, user_id: u64, guild_id: u64) -> StoreResult<Option<ScammerEntry>> {
        Ok(self
            .all_scammers()?
            .into_iter()
            .find(|s| s.is_active_for(user_id, guild_id)))
    }

    /// Active entries for a user, across all guilds unless one is given
    ///
    /// Removed entries are not included, so this is a snapshot of the user's
    /// current marks rather than a full add/remove history.
    ///
    /// # Errors
    /// Returns an error if the scammer file cannot be read or parsed
    pub fn scammer_instances(
        &self,
        user_id: u64,
        guild_id: Option<u64>,
    ) -> StoreResult<Vec<ScammerEntry>> {
        Ok(self
            .all_scammers()?
            .into_iter()
            .filter(|s| {
                s.user_id == user_id
                    && s.is_active()
                    && guild_id.is_none_or(|guild_id| s.guild_id == guild_id)
            })
            .collect())
    }

    fn read_settings(&self) -> StoreResult<SettingsMap> {
        read_json(&self.paths.settings)
    }
}

fn read_json<T: DeserializeOwned>(path: &Path) -> StoreResult<T> {
    let content = fs::read_to_string(path).map_err(|e| StoreError::io(path, e))?;
    Ok(serde_json::from_str(&content)?)
}

fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> StoreResult<()> {
    let json = serde_json::to_string_pretty(value)?;

    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);

    fs::write(&tmp, json).map_err(|e| StoreError::io(&tmp, e))?;
    fs::rename(&tmp, path).map_err(|e| StoreError::io(path, e))
}

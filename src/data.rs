use std::{ops::Deref, sync::Arc};

use crate::config::Config;
use crate::moderation::ModerationService;
use crate::store::{RecordStore, StoreHandle, StorePaths, StoreResult};
use poise::serenity_prelude as serenity;
use serenity::prelude::TypeMapKey;
use tokio::task::JoinHandle;

/// Centralized data structure for the bot
#[derive(Clone)]
pub struct Data(pub Arc<DataInner>);

// Implement TypeMapKey for Data to allow storing it in Serenity's data map
impl TypeMapKey for Data {
    type Value = Data;
}

impl std::fmt::Debug for Data {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Data")
            .field("moderation", &self.moderation)
            .field("store_paths", &self.store_paths)
            .finish()
    }
}

impl Deref for Data {
    type Target = DataInner;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl Data {
    #[must_use]
    pub fn new(moderation: ModerationService, store_paths: StorePaths) -> Self {
        Self(Arc::new(DataInner {
            moderation,
            store_paths,
        }))
    }

    /// Open the record store under the configured data directory and start
    /// its writer task
    ///
    /// # Errors
    /// Returns an error if the data directory or seed files cannot be created
    pub fn open(config: &Config) -> StoreResult<(Self, JoinHandle<()>)> {
        let paths = StorePaths::in_dir(&config.data_dir);
        let store = RecordStore::open(paths.clone())?;
        let (handle, task) = StoreHandle::spawn(store);
        let moderation = ModerationService::new(handle, config.staff_role_ids.iter().copied());
        Ok((Self::new(moderation, paths), task))
    }

    /// Handle to the record store
    #[must_use]
    pub fn store(&self) -> &StoreHandle {
        self.moderation.store()
    }
}

/// Shared state behind [`Data`]
pub struct DataInner {
    pub moderation: ModerationService,
    pub store_paths: StorePaths,
}

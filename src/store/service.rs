//! Single-writer store task
//!
//! [`StoreHandle`] is the only way the bot touches the record store. Requests
//! are queued on a channel and applied one at a time by a blocking task that
//! owns the [`RecordStore`], so concurrent commands cannot interleave their
//! read-modify-write cycles.

use crate::STORE_TARGET;
use crate::store::{
    GuildSettings, NewScammer, RecordStore, Removal, ScammerEntry, StoreError, StoreResult,
};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{error, info};

/// Capacity of the request queue
const QUEUE_CAPACITY: usize = 64;

type Reply<T> = oneshot::Sender<StoreResult<T>>;

/// Requests understood by the store task
#[derive(Debug)]
pub enum StoreRequest {
    GuildSettings {
        guild_id: u64,
        reply: Reply<Option<GuildSettings>>,
    },
    SaveGuildSettings {
        guild_id: u64,
        data: GuildSettings,
        reply: Reply<GuildSettings>,
    },
    AllScammers {
        reply: Reply<Vec<ScammerEntry>>,
    },
    GuildScammers {
        guild_id: u64,
        active_only: bool,
        reply: Reply<Vec<ScammerEntry>>,
    },
    AddScammer {
        data: NewScammer,
        reply: Reply<ScammerEntry>,
    },
    RemoveScammer {
        user_id: u64,
        guild_id: u64,
        removal: Removal,
        reply: Reply<Option<ScammerEntry>>,
    },
    ActiveScammer {
        user_id: u64,
        guild_id: u64,
        reply: Reply<Option<ScammerEntry>>,
    },
    ScammerInstances {
        user_id: u64,
        guild_id: Option<u64>,
        reply: Reply<Vec<ScammerEntry>>,
    },
    /// Stop the store task after the requests queued before it
    Shutdown,
}

/// Cloneable handle to the store task
#[derive(Debug, Clone)]
pub struct StoreHandle {
    tx: mpsc::Sender<StoreRequest>,
}

impl StoreHandle {
    /// Move the store onto its own blocking task
    ///
    /// Must be called from within a tokio runtime.
    #[must_use]
    pub fn spawn(store: RecordStore) -> (Self, JoinHandle<()>) {
        let (tx, rx) = mpsc::channel(QUEUE_CAPACITY);
        let task = tokio::task::spawn_blocking(move || run(&store, rx));
        (Self { tx }, task)
    }

    async fn request<T>(&self, make: impl FnOnce(Reply<T>) -> StoreRequest) -> StoreResult<T> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(make(reply))
            .await
            .map_err(|_| StoreError::Closed)?;
        rx.await.map_err(|_| StoreError::Closed)?
    }

    /// Settings for a guild, or `None` if it was never configured
    ///
    /// # Errors
    /// Returns an error if the store fails or has been shut down
    pub async fn guild_settings(&self, guild_id: u64) -> StoreResult<Option<GuildSettings>> {
        self.request(|reply| StoreRequest::GuildSettings { guild_id, reply })
            .await
    }

    /// Overwrite the settings for a guild
    ///
    /// # Errors
    /// Returns an error if the store fails or has been shut down
    pub async fn save_guild_settings(
        &self,
        guild_id: u64,
        data: GuildSettings,
    ) -> StoreResult<GuildSettings> {
        self.request(|reply| StoreRequest::SaveGuildSettings {
            guild_id,
            data,
            reply,
        })
        .await
    }

    /// Every entry across all guilds
    ///
    /// # Errors
    /// Returns an error if the store fails or has been shut down
    pub async fn all_scammers(&self) -> StoreResult<Vec<ScammerEntry>> {
        self.request(|reply| StoreRequest::AllScammers { reply }).await
    }

    /// Entries for one guild, optionally only the active ones
    ///
    /// # Errors
    /// Returns an error if the store fails or has been shut down
    pub async fn guild_scammers(
        &self,
        guild_id: u64,
        active_only: bool,
    ) -> StoreResult<Vec<ScammerEntry>> {
        self.request(|reply| StoreRequest::GuildScammers {
            guild_id,
            active_only,
            reply,
        })
        .await
    }

    /// Append a new entry. Does not check for an existing active entry.
    ///
    /// # Errors
    /// Returns an error if the store fails or has been shut down
    pub async fn add_scammer(&self, data: NewScammer) -> StoreResult<ScammerEntry> {
        self.request(|reply| StoreRequest::AddScammer { data, reply })
            .await
    }

    /// Reverse the active entry for the pair, `None` if there is none
    ///
    /// # Errors
    /// Returns an error if the store fails or has been shut down
    pub async fn remove_scammer(
        &self,
        user_id: u64,
        guild_id: u64,
        removal: Removal,
    ) -> StoreResult<Option<ScammerEntry>> {
        self.request(|reply| StoreRequest::RemoveScammer {
            user_id,
            guild_id,
            removal,
            reply,
        })
        .await
    }

    /// The active entry for the pair, if any
    ///
    /// # Errors
    /// Returns an error if the store fails or has been shut down
    pub async fn active_scammer(
        &self,
        user_id: u64,
        guild_id: u64,
    ) -> StoreResult<Option<ScammerEntry>> {
        self.request(|reply| StoreRequest::ActiveScammer {
            user_id,
            guild_id,
            reply,
        })
        .await
    }

    /// Active entries for a user, optionally within one guild
    ///
    /// # Errors
    /// Returns an error if the store fails or has been shut down
    pub async fn scammer_instances(
        &self,
        user_id: u64,
        guild_id: Option<u64>,
    ) -> StoreResult<Vec<ScammerEntry>> {
        self.request(|reply| StoreRequest::ScammerInstances {
            user_id,
            guild_id,
            reply,
        })
        .await
    }

    /// Ask the store task to stop once earlier requests are done
    pub async fn shutdown(&self) {
        if self.tx.send(StoreRequest::Shutdown).await.is_err() {
            info!(target: STORE_TARGET, "Record store already stopped");
        }
    }
}

fn run(store: &RecordStore, mut rx: mpsc::Receiver<StoreRequest>) {
    info!(target: STORE_TARGET, "Record store task started");

    while let Some(request) = rx.blocking_recv() {
        match request {
            StoreRequest::GuildSettings { guild_id, reply } => {
                respond(reply, store.guild_settings(guild_id));
            }
            StoreRequest::SaveGuildSettings {
                guild_id,
                data,
                reply,
            } => respond(reply, store.save_guild_settings(guild_id, data)),
            StoreRequest::AllScammers { reply } => respond(reply, store.all_scammers()),
            StoreRequest::GuildScammers {
                guild_id,
                active_only,
                reply,
            } => respond(reply, store.guild_scammers(guild_id, active_only)),
            StoreRequest::AddScammer { data, reply } => respond(reply, store.add_scammer(data)),
            StoreRequest::RemoveScammer {
                user_id,
                guild_id,
                removal,
                reply,
            } => respond(reply, store.remove_scammer(user_id, guild_id, removal)),
            StoreRequest::ActiveScammer {
                user_id,
                guild_id,
                reply,
            } => respond(reply, store.active_scammer(user_id, guild_id)),
            StoreRequest::ScammerInstances {
                user_id,
                guild_id,
                reply,
            } => respond(reply, store.scammer_instances(user_id, guild_id)),
            StoreRequest::Shutdown => {
                info!(target: STORE_TARGET, "Received shutdown request for record store");
                break;
            }
        }
    }

    info!(target: STORE_TARGET, "Record store task shut down");
}

fn respond<T>(reply: Reply<T>, result: StoreResult<T>) {
    if let Err(e) = &result {
        error!(target: STORE_TARGET, error = %e, "Record store operation failed");
    }
    // The caller may have given up waiting; the write has already happened.
    let _ = reply.send(result);
}

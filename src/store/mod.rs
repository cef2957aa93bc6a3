//! Record store for scammer entries and guild settings
//!
//! Two JSON files back the store: a list of [`ScammerEntry`] records and a
//! map of guild id to [`GuildSettings`]. [`RecordStore`] performs the file
//! operations synchronously, and [`StoreHandle`] serializes access to it
//! through a single writer task.

mod error;
mod record;
mod service;
mod store;

pub use error::{StoreError, StoreResult};
pub use record::{GuildSettings, NewScammer, Removal, ScammerEntry};
pub use service::{StoreHandle, StoreRequest};
pub use store::{RecordStore, SCAMMERS_FILE, SETTINGS_FILE, StorePaths};

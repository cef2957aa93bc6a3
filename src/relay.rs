//! Notification relay
//!
//! Forwards add/remove events to a guild's log channel when one is set.

use crate::gateway::GatewayResult;
use crate::store::{GuildSettings, ScammerEntry};
use crate::ERROR_TARGET;
use async_trait::async_trait;
use tracing::{debug, error};

/// Events worth recording in a guild's log channel
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogEvent {
    /// A user was marked as a scammer
    ScammerAdded(ScammerEntry),
    /// A user's active entry was reversed; `reason` on the entry is the original one
    ScammerRemoved(ScammerEntry),
}

impl LogEvent {
    #[must_use]
    pub fn entry(&self) -> &ScammerEntry {
        match self {
            Self::ScammerAdded(entry) | Self::ScammerRemoved(entry) => entry,
        }
    }
}

/// Posts log events to a channel
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn post_log(&self, channel_id: u64, event: &LogEvent) -> GatewayResult<()>;
}

/// Send `event` to the guild's log channel, if configured
///
/// Failures are logged and swallowed; the record change stands regardless.
pub async fn relay<N: Notifier + ?Sized>(notifier: &N, settings: &GuildSettings, event: LogEvent) {
    let Some(channel_id) = settings.log_channel else {
        debug!(guild_id = settings.guild_id, "No log channel configured, skipping relay");
        return;
    };

    if let Err(e) = notifier.post_log(channel_id, &event).await {
        error!(
            target: ERROR_TARGET,
            guild_id = settings.guild_id,
            channel_id,
            entry_id = event.entry().id,
            error = %e,
            "Failed to send to log channel"
        );
    }
}

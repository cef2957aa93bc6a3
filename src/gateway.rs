//! Discord side effects behind small traits
//!
//! The moderation logic only sees [`RoleManager`] and [`Notifier`], so it can
//! be exercised without a gateway connection. [`SerenityGateway`] is the real
//! implementation over serenity's HTTP client.

use crate::embeds;
use crate::relay::{LogEvent, Notifier};
use async_trait::async_trait;
use poise::serenity_prelude::{ChannelId, CreateMessage, GuildId, Http, RoleId, UserId};
use std::sync::Arc;
use thiserror::Error;

/// Audit log reason attached to role changes
const ADD_ROLE_REASON: &str = "Marked as scammer";
const REMOVE_ROLE_REASON: &str = "Removed from scammer list";

/// Errors from Discord side effects. These are logged, never shown to users.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// Discord API error
    #[error("Discord API error: {0}")]
    DiscordApi(#[from] Box<poise::serenity_prelude::Error>),

    /// The target member, role or channel is not reachable
    #[error("Unavailable: {0}")]
    Unavailable(String),
}

impl From<poise::serenity_prelude::Error> for GatewayError {
    fn from(error: poise::serenity_prelude::Error) -> Self {
        Self::DiscordApi(Box::new(error))
    }
}

/// Result type for gateway operations
pub type GatewayResult<T> = Result<T, GatewayError>;

/// Assigns and revokes the configured scammer role
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RoleManager: Send + Sync {
    async fn add_role(&self, guild_id: u64, user_id: u64, role_id: u64) -> GatewayResult<()>;

    async fn remove_role(&self, guild_id: u64, user_id: u64, role_id: u64) -> GatewayResult<()>;
}

/// Serenity-backed gateway
#[derive(Clone)]
pub struct SerenityGateway {
    http: Arc<Http>,
}

impl SerenityGateway {
    #[must_use]
    pub fn new(http: Arc<Http>) -> Self {
        Self { http }
    }
}

fn ids(guild_id: u64, user_id: u64, role_id: u64) -> GatewayResult<(GuildId, UserId, RoleId)> {
    if guild_id == 0 || user_id == 0 || role_id == 0 {
        return Err(GatewayError::Unavailable(format!(
            "invalid ids guild={guild_id} user={user_id} role={role_id}"
        )));
    }
    Ok((GuildId::new(guild_id), UserId::new(user_id), RoleId::new(role_id)))
}

#[async_trait]
impl RoleManager for SerenityGateway {
    async fn add_role(&self, guild_id: u64, user_id: u64, role_id: u64) -> GatewayResult<()> {
        let (guild_id, user_id, role_id) = ids(guild_id, user_id, role_id)?;
        self.http
            .add_member_role(guild_id, user_id, role_id, Some(ADD_ROLE_REASON))
            .await?;
        Ok(())
    }

    async fn remove_role(&self, guild_id: u64, user_id: u64, role_id: u64) -> GatewayResult<()> {
        let (guild_id, user_id, role_id) = ids(guild_id, user_id, role_id)?;
        self.http
            .remove_member_role(guild_id, user_id, role_id, Some(REMOVE_ROLE_REASON))
            .await?;
        Ok(())
    }
}

#[async_trait]
impl Notifier for SerenityGateway {
    async fn post_log(&self, channel_id: u64, event: &LogEvent) -> GatewayResult<()> {
        if channel_id == 0 {
            return Err(GatewayError::Unavailable("log channel id is 0".to_string()));
        }
        ChannelId::new(channel_id)
            .send_message(&*self.http, CreateMessage::new().embed(embeds::log_embed(event)))
            .await?;
        Ok(())
    }
}

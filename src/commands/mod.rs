mod help;
mod scammer;

pub use help::help;
pub use scammer::scammer;

use crate::embeds;
use crate::moderation::ModerationError;
use crate::{Data, Error};
use poise::CreateReply;

/// Reply for callers without a staff role
pub const NO_PERMISSION: &str = "❌ You do not have permission to use this command.";

/// Every command the bot registers
#[must_use]
pub fn all() -> Vec<poise::Command<Data, Error>> {
    vec![scammer(), help()]
}

/// Turn a moderation refusal into the reply the caller sees
///
/// `username` names the target user in the message. Store failures are not
/// a refusal and are handed back as errors.
pub(crate) fn refusal_reply(error: ModerationError, username: &str) -> Result<CreateReply, Error> {
    let reply = match error {
        ModerationError::NotConfigured => CreateReply::default()
            .embed(embeds::setup_required())
            .ephemeral(true),
        ModerationError::AlreadyMarked(existing) => {
            CreateReply::default().embed(embeds::already_marked(username, &existing))
        }
        ModerationError::NotMarked => CreateReply::default().embed(embeds::not_marked(username)),
        ModerationError::PermissionDenied => CreateReply::default()
            .content(NO_PERMISSION)
            .ephemeral(true),
        ModerationError::EmptyList => CreateReply::default()
            .content("There are no scammers in this server.")
            .ephemeral(true),
        ModerationError::NoHistory => CreateReply::default()
            .content(format!("{username} has no scammer history."))
            .ephemeral(true),
        ModerationError::Store(e) => return Err(e.into()),
    };
    Ok(reply)
}

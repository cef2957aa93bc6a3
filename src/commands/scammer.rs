use super::refusal_reply;
use crate::embeds;
use crate::gateway::SerenityGateway;
use crate::moderation::UserRef;
use crate::{Context, Error};
use poise::CreateReply;
use poise::serenity_prelude as serenity;

fn guild_id(ctx: Context<'_>) -> Result<u64, Error> {
    ctx.guild_id()
        .map(serenity::GuildId::get)
        .ok_or_else(|| Error::from("command used outside of a guild"))
}

fn gateway(ctx: Context<'_>) -> SerenityGateway {
    SerenityGateway::new(ctx.serenity_context().http.clone())
}

fn caller(ctx: Context<'_>) -> UserRef {
    UserRef::new(ctx.author().id.get(), ctx.author().name.clone())
}

/// Staff role check for the mutating subcommands
async fn is_staff(ctx: Context<'_>) -> Result<bool, Error> {
    let roles: Vec<u64> = match ctx.author_member().await {
        Some(member) => member.roles.iter().map(|role| role.get()).collect(),
        None => Vec::new(),
    };

    match ctx.data().moderation.ensure_staff(&roles) {
        Ok(()) => Ok(true),
        Err(refusal) => {
            ctx.send(refusal_reply(refusal, &ctx.author().name)?)
                .await?;
            Ok(false)
        }
    }
}

/// Manage scammers in your server
#[poise::command(
    slash_command,
    guild_only,
    subcommands("add", "remove", "show", "check", "setup"),
    subcommand_required,
    default_member_permissions = "MANAGE_ROLES"
)]
pub async fn scammer(_ctx: Context<'_>) -> Result<(), Error> {
    Ok(())
}

/// Add a user to the scammer list
#[poise::command(slash_command, guild_only, check = "is_staff")]
pub async fn add(
    ctx: Context<'_>,
    #[description = "The user to add as a scammer"] user: serenity::User,
    #[description = "The reason for adding the user as a scammer"]
    #[max_length = 1024]
    reason: String,
) -> Result<(), Error> {
    let guild_id = guild_id(ctx)?;
    let gateway = gateway(ctx);
    let target = UserRef::new(user.id.get(), user.name.clone());

    match ctx
        .data()
        .moderation
        .add(&gateway, guild_id, &target, &caller(ctx), reason)
        .await
    {
        Ok(pending) => {
            ctx.send(CreateReply::default().embed(embeds::scammer_added(pending.entry())))
                .await?;
            pending.relay(&gateway).await;
        }
        Err(refusal) => {
            ctx.send(refusal_reply(refusal, &user.name)?).await?;
        }
    }
    Ok(())
}

/// Remove a user from the scammer list
#[poise::command(slash_command, guild_only, check = "is_staff")]
pub async fn remove(
    ctx: Context<'_>,
    #[description = "The user to remove from the scammer list"] user: serenity::User,
    #[description = "The reason for removing the user from the scammer list"]
    #[max_length = 1024]
    reason: String,
) -> Result<(), Error> {
    let guild_id = guild_id(ctx)?;
    let gateway = gateway(ctx);
    let target = UserRef::new(user.id.get(), user.name.clone());

    match ctx
        .data()
        .moderation
        .remove(&gateway, guild_id, &target, &caller(ctx), reason)
        .await
    {
        Ok(pending) => {
            ctx.send(CreateReply::default().embed(embeds::scammer_removed(pending.entry())))
                .await?;
            pending.relay(&gateway).await;
        }
        Err(refusal) => {
            ctx.send(refusal_reply(refusal, &user.name)?).await?;
        }
    }
    Ok(())
}

/// Show all scammers in this server
#[poise::command(slash_command, guild_only)]
pub async fn show(ctx: Context<'_>) -> Result<(), Error> {
    let guild_id = guild_id(ctx)?;

    let reply = match ctx.data().moderation.show(guild_id).await {
        Ok(entries) => CreateReply::default()
            .embed(embeds::scammer_list(&entries))
            .ephemeral(true),
        Err(refusal) => refusal_reply(refusal, "")?,
    };
    ctx.send(reply).await?;
    Ok(())
}

/// Check if a user is a scammer
#[poise::command(slash_command, guild_only, check = "is_staff")]
pub async fn check(
    ctx: Context<'_>,
    #[description = "The user to check"] user: serenity::User,
) -> Result<(), Error> {
    let guild_id = guild_id(ctx)?;

    let reply = match ctx.data().moderation.check(guild_id, user.id.get()).await {
        Ok(entries) => CreateReply::default()
            .embed(embeds::history(&user.name, &entries))
            .ephemeral(true),
        Err(refusal) => refusal_reply(refusal, &user.name)?,
    };
    ctx.send(reply).await?;
    Ok(())
}

/// Setup scammer role and notification channel
#[poise::command(slash_command, guild_only, required_permissions = "MANAGE_ROLES")]
pub async fn setup(
    ctx: Context<'_>,
    #[description = "The role to assign to scammers"] role: serenity::Role,
    #[description = "The channel to send notifications to"] channel: serenity::GuildChannel,
    #[description = "The channel to send logs to (optional)"] logs: Option<serenity::GuildChannel>,
) -> Result<(), Error> {
    let guild_id = guild_id(ctx)?;

    let reply = match ctx
        .data()
        .moderation
        .setup(
            guild_id,
            role.id.get(),
            channel.id.get(),
            logs.as_ref().map(|logs| logs.id.get()),
        )
        .await
    {
        Ok(_) => CreateReply::default()
            .embed(embeds::setup_complete(
                &role.name,
                &channel.name,
                logs.as_ref().map(|logs| logs.name.as_str()),
            ))
            .ephemeral(true),
        Err(refusal) => refusal_reply(refusal, "")?,
    };
    ctx.send(reply).await?;
    Ok(())
}

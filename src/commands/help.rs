use crate::embeds::{self, HelpTopic};
use crate::{Context, Error};
use poise::CreateReply;
use poise::serenity_prelude::{
    ComponentInteractionCollector, ComponentInteractionDataKind, CreateActionRow,
    CreateInteractionResponse, CreateInteractionResponseMessage, CreateSelectMenu,
    CreateSelectMenuKind,
};
use std::time::{Duration, Instant};

/// Custom id of the topic select menu
pub const HELP_MENU_ID: &str = "help-menu";
/// How long the menu stays usable after `/help` is run
pub const HELP_MENU_TIMEOUT: Duration = Duration::from_secs(60);

/// Time left before `deadline`, or `None` once it has passed
fn remaining(deadline: Instant, now: Instant) -> Option<Duration> {
    let left = deadline.saturating_duration_since(now);
    (!left.is_zero()).then_some(left)
}

fn help_menu() -> CreateSelectMenu {
    CreateSelectMenu::new(
        HELP_MENU_ID,
        CreateSelectMenuKind::String {
            options: HelpTopic::ALL.into_iter().map(HelpTopic::menu_option).collect(),
        },
    )
    .placeholder("Select a command")
}

/// Show help information for ScammerGuard
#[poise::command(slash_command)]
pub async fn help(ctx: Context<'_>) -> Result<(), Error> {
    let deadline = Instant::now() + HELP_MENU_TIMEOUT;
    let mut shown = embeds::help_overview();
    let handle = ctx
        .send(
            CreateReply::default()
                .embed(shown.clone())
                .components(vec![CreateActionRow::SelectMenu(help_menu())])
                .ephemeral(true),
        )
        .await?;
    let message_id = handle.message().await?.id;

    while let Some(left) = remaining(deadline, Instant::now()) {
        let Some(interaction) = ComponentInteractionCollector::new(ctx)
            .message_id(message_id)
            .custom_ids(vec![HELP_MENU_ID.to_string()])
            .timeout(left)
            .await
        else {
            break;
        };

        let topic = match &interaction.data.kind {
            ComponentInteractionDataKind::StringSelect { values } => {
                values.first().and_then(|value| HelpTopic::from_value(value))
            }
            _ => None,
        };
        let Some(topic) = topic else {
            continue;
        };

        shown = topic.embed();
        interaction
            .create_response(
                ctx,
                CreateInteractionResponse::UpdateMessage(
                    CreateInteractionResponseMessage::new().embed(shown.clone()),
                ),
            )
            .await?;
    }

    // Window closed: keep the last embed, drop the menu
    handle
        .edit(ctx, CreateReply::default().embed(shown).components(vec![]))
        .await?;
    Ok(())
}

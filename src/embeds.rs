//! Response embeds and text formatting

use crate::relay::LogEvent;
use crate::store::ScammerEntry;
use chrono::{DateTime, Utc};
use derive_more::Display;
use poise::serenity_prelude::{CreateEmbed, CreateEmbedFooter, CreateSelectMenuOption, Timestamp};
use std::fmt::Write as _;

const RED: u32 = 0xFF0000;
const GREEN: u32 = 0x00FF00;
const BLUE: u32 = 0x0099FF;
const ORANGE: u32 = 0xFFA500;

/// Most entries listed by `/scammer show`
pub const SHOW_LIMIT: usize = 25;
/// Discord's limit on an embed description, in characters
pub const DESCRIPTION_LIMIT: usize = 4096;
/// Discord's limit on an embed field value, in characters
pub const FIELD_LIMIT: usize = 1024;
/// Room kept for the "…and N more" line of a truncated description
const TAIL_RESERVE: usize = 40;

/// Render a timestamp with Discord's client-side formatting
fn discord_time(at: DateTime<Utc>) -> String {
    format!("<t:{}:f>", at.timestamp())
}

/// Shorten `text` to `limit` characters, ending in "…" when cut
fn clip(text: &str, limit: usize) -> String {
    if text.chars().count() <= limit {
        return text.to_string();
    }
    let mut clipped: String = text.chars().take(limit.saturating_sub(1)).collect();
    clipped.push('…');
    clipped
}

fn field_value(text: &str) -> String {
    clip(text, FIELD_LIMIT)
}

/// Join `blocks` until the next one would overflow [`DESCRIPTION_LIMIT`]
///
/// `total` counts every entry, rendered or not. Anything left out is
/// summarised as "…and N more".
fn join_within_limit(
    blocks: impl IntoIterator<Item = String>,
    total: usize,
    separator: &str,
) -> String {
    let separator_len = separator.chars().count();
    let mut result = String::new();
    let mut len = 0;
    let mut shown = 0;

    for block in blocks {
        let added = block.chars().count() + if shown == 0 { 0 } else { separator_len };
        let reserve = if shown + 1 == total { 0 } else { TAIL_RESERVE };
        if len + added + reserve > DESCRIPTION_LIMIT {
            break;
        }
        if shown > 0 {
            result.push_str(separator);
        }
        result.push_str(&block);
        len += added;
        shown += 1;
    }

    if total > shown {
        if shown > 0 {
            result.push_str(separator);
        }
        let _ = write!(result, "…and {} more", total - shown);
    }
    result
}

fn base(colour: u32, title: impl Into<String>) -> CreateEmbed {
    CreateEmbed::new()
        .colour(colour)
        .title(title)
        .timestamp(Timestamp::now())
}

pub fn setup_required() -> CreateEmbed {
    base(RED, "⚠️ Setup Required").description("Please setup the bot first using `/scammer setup`")
}

pub fn already_marked(username: &str, existing: &ScammerEntry) -> CreateEmbed {
    base(RED, "⚠️ Already a Scammer")
        .description(format!("{username} is already marked as a scammer."))
        .field("Reason", field_value(&existing.reason), false)
        .field("Added by", field_value(&existing.added_by), false)
        .field("Date", discord_time(existing.timestamp), false)
}

pub fn not_marked(username: &str) -> CreateEmbed {
    base(RED, "⚠️ Not a Scammer").description(format!("{username} is not marked as a scammer."))
}

pub fn scammer_added(entry: &ScammerEntry) -> CreateEmbed {
    base(RED, "✅ Scammer Added")
        .description(format!("{} has been marked as a scammer.", entry.username))
        .field("Reason", field_value(&entry.reason), false)
        .field("Added by", field_value(&entry.added_by), false)
}

pub fn scammer_removed(entry: &ScammerEntry) -> CreateEmbed {
    base(GREEN, "✅ Scammer Removed")
        .description(format!(
            "{} has been removed from the scammer list.",
            entry.username
        ))
        .field(
            "Reason",
            field_value(entry.remove_reason.as_deref().unwrap_or_default()),
            false,
        )
        .field(
            "Removed by",
            field_value(entry.removed_by.as_deref().unwrap_or_default()),
            false,
        )
}

pub fn scammer_list(entries: &[ScammerEntry]) -> CreateEmbed {
    base(RED, "🚨 Scammer List").description(format_scammer_list(entries))
}

pub fn history(username: &str, entries: &[ScammerEntry]) -> CreateEmbed {
    base(ORANGE, format!("📜 Scammer History: {username}")).description(format_history(entries))
}

pub fn setup_complete(role: &str, channel: &str, logs: Option<&str>) -> CreateEmbed {
    base(GREEN, "✅ Setup Complete").description(format_setup_summary(role, channel, logs))
}

/// Embed posted to a guild's log channel
pub fn log_embed(event: &LogEvent) -> CreateEmbed {
    match event {
        LogEvent::ScammerAdded(entry) => base(RED, "📝 Scammer Added")
            .description(format!(
                "{} ({}) was marked as a scammer.",
                entry.username, entry.user_id
            ))
            .field("Reason", field_value(&entry.reason), false)
            .field(
                "Added by",
                field_value(&format!("{} ({})", entry.added_by, entry.added_by_id)),
                false,
            ),
        LogEvent::ScammerRemoved(entry) => base(GREEN, "📝 Scammer Removed")
            .description(format!(
                "{} ({}) was removed from the scammer list.",
                entry.username, entry.user_id
            ))
            .field("Original reason", field_value(&entry.reason), false)
            .field(
                "Removal reason",
                field_value(entry.remove_reason.as_deref().unwrap_or_default()),
                false,
            )
            .field(
                "Removed by",
                field_value(&format!(
                    "{} ({})",
                    entry.removed_by.as_deref().unwrap_or_default(),
                    entry.removed_by_id.unwrap_or_default()
                )),
                false,
            ),
    }
}

/// One line per entry, capped at [`SHOW_LIMIT`] lines and the description limit
#[must_use]
pub fn format_scammer_list(entries: &[ScammerEntry]) -> String {
    let lines = entries.iter().take(SHOW_LIMIT).map(|entry| {
        let marker = if entry.removed { " *(removed)*" } else { "" };
        format!(
            "• {} - Reason: {}{marker}",
            entry.username,
            field_value(&entry.reason)
        )
    });
    join_within_limit(lines, entries.len(), "\n")
}

/// Numbered history blocks for `/scammer check`, within the description limit
#[must_use]
pub fn format_history(entries: &[ScammerEntry]) -> String {
    let blocks = entries
        .iter()
        .enumerate()
        .map(|(index, entry)| {
            let (action, by, reason, at) = if entry.removed {
                (
                    "Removed",
                    entry.removed_by.as_deref().unwrap_or_default(),
                    entry.remove_reason.as_deref().unwrap_or_default(),
                    entry.remove_timestamp.unwrap_or(entry.timestamp),
                )
            } else {
                ("Added", entry.added_by.as_str(), entry.reason.as_str(), entry.timestamp)
            };
            format!(
                "**{}. {action}**\n• **By**: {}\n• **Reason**: {}\n• **Date**: {}",
                index + 1,
                field_value(by),
                field_value(reason),
                discord_time(at)
            )
        });
    join_within_limit(blocks, entries.len(), "\n\n")
}

#[must_use]
pub fn format_setup_summary(role: &str, channel: &str, logs: Option<&str>) -> String {
    let mut summary = format!("Scammer role set to {role}\nNotification channel set to {channel}");
    if let Some(logs) = logs {
        let _ = write!(summary, "\nLog channel set to {logs}");
    }
    summary
}

/// Entries of the `/help` select menu
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum HelpTopic {
    #[display("add")]
    Add,
    #[display("remove")]
    Remove,
    #[display("show")]
    Show,
    #[display("check")]
    Check,
    #[display("setup")]
    Setup,
}

impl HelpTopic {
    pub const ALL: [Self; 5] = [Self::Add, Self::Remove, Self::Show, Self::Check, Self::Setup];

    /// Parse the select menu value
    #[must_use]
    pub fn from_value(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|topic| topic.to_string() == value)
    }

    fn summary(self) -> &'static str {
        match self {
            Self::Add => "Add a user to the scammer list",
            Self::Remove => "Remove a user from the scammer list",
            Self::Show => "Show all scammers in this server",
            Self::Check => "Check if a user is a scammer",
            Self::Setup => "Setup scammer role and notification channel",
        }
    }

    #[must_use]
    pub fn menu_option(self) -> CreateSelectMenuOption {
        CreateSelectMenuOption::new(format!("/scammer {self}"), self.to_string())
            .description(self.summary())
    }

    /// Detail embed shown when the topic is selected
    #[must_use]
    pub fn embed(self) -> CreateEmbed {
        let colour = match self {
            Self::Add => RED,
            Self::Remove => GREEN,
            Self::Show | Self::Check | Self::Setup => BLUE,
        };
        let (usage, example, footer) = match self {
            Self::Add => (
                "`/scammer add [user] [reason]`",
                Some("`/scammer add @User#1234 Scammed 5 members in J4J`"),
                "This command will also assign the configured scammer role to the user",
            ),
            Self::Remove => (
                "`/scammer remove [user] [reason]`",
                Some("`/scammer remove @User#1234 Wrongfully added`"),
                "This command will also remove the scammer role from the user",
            ),
            Self::Show => (
                "`/scammer show`",
                None,
                "Shows up to 25 scammers due to Discord limits",
            ),
            Self::Check => (
                "`/scammer check [user]`",
                Some("`/scammer check @User#1234`"),
                "Shows if a user is marked as a scammer in this server or others",
            ),
            Self::Setup => (
                "`/scammer setup [role] [channel] [logs]`",
                Some("`/scammer setup @Scammer #notifications #logs`"),
                "You must set up the bot before using other commands",
            ),
        };

        let mut embed = base(colour, format!("Command: /scammer {self}"))
            .description(self.summary())
            .field("Usage", usage, false);
        if let Some(example) = example {
            embed = embed.field("Example", example, false);
        }
        embed = embed.field("Required Permissions", "Manage Roles", false);
        if self == Self::Setup {
            embed = embed.field(
                "Parameters",
                "`role` - The role to assign to scammers\n`channel` - The channel to send notifications to\n`logs` - (Optional) The channel to send logs to",
                false,
            );
        }
        embed.footer(CreateEmbedFooter::new(footer))
    }
}

/// Landing embed for `/help`
pub fn help_overview() -> CreateEmbed {
    base(BLUE, "ScammerGuard Help")
        .description("ScammerGuard helps you manage and track scammers in your Discord server.")
        .field(
            "Getting Started",
            "Use `/scammer setup` to configure the bot for your server.",
            false,
        )
        .field(
            "Commands",
            "Select a command from the dropdown menu below to see detailed information.",
            false,
        )
        .footer(CreateEmbedFooter::new(
            "ScammerGuard • Protecting your server from scammers",
        ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{NewScammer, Removal};

    fn entry(id: u64, username: &str, reason: &str) -> ScammerEntry {
        NewScammer {
            user_id: id,
            username: username.to_string(),
            reason: reason.to_string(),
            added_by: "alice".to_string(),
            added_by_id: 2,
            guild_id: 10,
        }
        .into_entry(id, "2024-03-01T12:00:00Z".parse().unwrap())
    }

    #[test]
    fn test_scammer_list_lines() {
        let mut removed = entry(2, "eve", "fake trade");
        removed.mark_removed(
            Removal {
                removed_by: "bob".to_string(),
                removed_by_id: 3,
                reason: "appealed".to_string(),
            },
            Utc::now(),
        );
        let list = format_scammer_list(&[entry(1, "mallory", "phishing"), removed]);
        assert_eq!(
            list,
            "• mallory - Reason: phishing\n• eve - Reason: fake trade *(removed)*"
        );
    }

    #[test]
    fn test_scammer_list_is_capped() {
        let entries: Vec<_> = (1..=30).map(|id| entry(id, "user", "spam")).collect();
        let list = format_scammer_list(&entries);
        assert_eq!(list.lines().count(), SHOW_LIMIT + 1);
        assert!(list.ends_with("…and 5 more"));
    }

    fn description_len(embed: CreateEmbed) -> usize {
        let embed = serde_json::to_value(embed).unwrap();
        embed["description"].as_str().unwrap().chars().count()
    }

    #[test]
    fn test_long_reasons_keep_list_within_limit() {
        let reason = "x".repeat(500);
        let entries: Vec<_> = (1..=SHOW_LIMIT as u64)
            .map(|id| entry(id, "user", &reason))
            .collect();

        let list = format_scammer_list(&entries);
        assert!(list.chars().count() <= DESCRIPTION_LIMIT);
        assert!(description_len(scammer_list(&entries)) <= DESCRIPTION_LIMIT);

        let shown = list.lines().filter(|line| line.starts_with("• ")).count();
        assert!(shown > 0 && shown < SHOW_LIMIT);
        assert!(list.ends_with(&format!("…and {} more", SHOW_LIMIT - shown)));
    }

    #[test]
    fn test_long_reasons_keep_history_within_limit() {
        let reason = "y".repeat(1000);
        let entries: Vec<_> = (1..=10).map(|id| entry(id, "mallory", &reason)).collect();

        let history = format_history(&entries);
        assert!(history.chars().count() <= DESCRIPTION_LIMIT);
        assert!(history.starts_with("**1. Added**"));
        assert!(history.contains("…and "));
    }

    #[test]
    fn test_oversized_reason_is_clipped_in_fields() {
        let long = entry(1, "mallory", &"z".repeat(2000));

        let added = serde_json::to_value(scammer_added(&long)).unwrap();
        let reason = added["fields"][0]["value"].as_str().unwrap();
        assert_eq!(reason.chars().count(), FIELD_LIMIT);
        assert!(reason.ends_with('…'));

        let logged = serde_json::to_value(log_embed(&LogEvent::ScammerAdded(long))).unwrap();
        assert_eq!(
            logged["fields"][0]["value"].as_str().unwrap().chars().count(),
            FIELD_LIMIT
        );
    }

    #[test]
    fn test_clip_counts_characters() {
        assert_eq!(clip("short", 10), "short");
        assert_eq!(clip("ééééé", 3), "éé…");
    }

    #[test]
    fn test_history_blocks() {
        let history = format_history(&[entry(1, "mallory", "phishing"), entry(2, "mallory", "spam")]);
        let ts = "2024-03-01T12:00:00Z".parse::<DateTime<Utc>>().unwrap().timestamp();
        assert_eq!(
            history,
            format!(
                "**1. Added**\n• **By**: alice\n• **Reason**: phishing\n• **Date**: <t:{ts}:f>\n\n\
                 **2. Added**\n• **By**: alice\n• **Reason**: spam\n• **Date**: <t:{ts}:f>"
            )
        );
    }

    #[test]
    fn test_setup_summary() {
        assert_eq!(
            format_setup_summary("Scammer", "alerts", None),
            "Scammer role set to Scammer\nNotification channel set to alerts"
        );
        assert!(format_setup_summary("Scammer", "alerts", Some("logs")).ends_with("\nLog channel set to logs"));
    }

    #[test]
    fn test_help_topic_values() {
        for topic in HelpTopic::ALL {
            assert_eq!(HelpTopic::from_value(&topic.to_string()), Some(topic));
        }
        assert_eq!(HelpTopic::Setup.to_string(), "setup");
        assert_eq!(HelpTopic::from_value("unknown"), None);
    }

    #[test]
    fn test_log_embed_titles() {
        let added = serde_json::to_value(log_embed(&LogEvent::ScammerAdded(entry(
            1, "mallory", "phishing",
        ))))
        .unwrap();
        assert_eq!(added["title"], "📝 Scammer Added");
        assert_eq!(added["description"], "mallory (1) was marked as a scammer.");

        let mut removed = entry(1, "mallory", "phishing");
        removed.mark_removed(
            Removal {
                removed_by: "bob".to_string(),
                removed_by_id: 3,
                reason: "mistake".to_string(),
            },
            Utc::now(),
        );
        let removed = serde_json::to_value(log_embed(&LogEvent::ScammerRemoved(removed))).unwrap();
        assert_eq!(removed["title"], "📝 Scammer Removed");
        assert_eq!(removed["fields"][0]["value"], "phishing");
        assert_eq!(removed["fields"][1]["value"], "mistake");
        assert_eq!(removed["fields"][2]["value"], "bob (3)");
    }
}

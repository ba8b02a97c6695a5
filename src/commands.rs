use crate::filter::{FilterAction, FilterMode};
use crate::{Context, Error};
use poise::command;
use poise::serenity_prelude as serenity;
use std::fmt::Write as _;

/// Word filter configuration and tools
#[command(
    slash_command,
    guild_only,
    required_permissions = "MANAGE_GUILD",
    subcommands(
        "status",
        "enable",
        "disable",
        "action",
        "mode",
        "add_word",
        "remove_word",
        "add_phrase",
        "remove_phrase",
        "list",
        "whitelist_channel",
        "whitelist_role",
        "notice",
        "log_channel",
        "display_names",
        "preset",
        "test",
        "stats",
    )
)]
pub async fn filter(ctx: Context<'_>) -> Result<(), Error> {
    ctx.say("Use one of the /filter subcommands.").await?;
    Ok(())
}

/// Show the current filter configuration
#[command(slash_command, guild_only)]
pub async fn status(ctx: Context<'_>) -> Result<(), Error> {
    let Some(guild_id) = ctx.guild_id() else {
        return Ok(());
    };
    let data = ctx.data();

    let Some(config) = data.get_filter_config(guild_id) else {
        ctx.say("The word filter is not configured for this server.")
            .await?;
        return Ok(());
    };

    let mut summary = format!(
        "**Word filter**: {}\nAction: `{}` | Mode: `{}`\nWords: {} | Phrases: {}\n",
        if config.enabled { "enabled" } else { "disabled" },
        config.action,
        config.mode,
        config.words.len(),
        config.phrases.len(),
    );
    if !config.whitelist_channels.is_empty() || !config.whitelist_roles.is_empty() {
        let _ = writeln!(
            summary,
            "Whitelisted: {} channel(s), {} role(s)",
            config.whitelist_channels.len(),
            config.whitelist_roles.len()
        );
    }
    if let Some(channel) = config.log_channel_id {
        let _ = writeln!(summary, "Mod-log: <#{channel}>");
    }

    ctx.say(summary).await?;
    Ok(())
}

/// Turn the word filter on
#[command(slash_command, guild_only)]
pub async fn enable(ctx: Context<'_>) -> Result<(), Error> {
    let Some(guild_id) = ctx.guild_id() else {
        return Ok(());
    };
    let data = ctx.data();
    data.update_filter_config(guild_id, |config| config.enabled = true);
    data.save().await?;
    ctx.say("Word filter enabled.").await?;
    Ok(())
}

/// Turn the word filter off
#[command(slash_command, guild_only)]
pub async fn disable(ctx: Context<'_>) -> Result<(), Error> {
    let Some(guild_id) = ctx.guild_id() else {
        return Ok(());
    };
    let data = ctx.data();
    data.update_filter_config(guild_id, |config| config.enabled = false);
    data.save().await?;
    ctx.say("Word filter disabled.").await?;
    Ok(())
}

/// Set the enforcement action taken on a match
#[command(slash_command, guild_only)]
pub async fn action(
    ctx: Context<'_>,
    #[description = "Action to take when a message matches"] action: FilterAction,
) -> Result<(), Error> {
    let Some(guild_id) = ctx.guild_id() else {
        return Ok(());
    };
    let data = ctx.data();
    data.update_filter_config(guild_id, |config| config.action = action);
    data.save().await?;
    ctx.say(format!("Filter action set to `{action}`.")).await?;
    Ok(())
}

/// Set the matching mode
#[command(slash_command, guild_only)]
pub async fn mode(
    ctx: Context<'_>,
    #[description = "How patterns are matched against messages"] mode: FilterMode,
) -> Result<(), Error> {
    let Some(guild_id) = ctx.guild_id() else {
        return Ok(());
    };
    let data = ctx.data();
    data.update_filter_config(guild_id, |config| config.mode = mode);
    data.save().await?;
    ctx.say(format!("Filter mode set to `{mode}`.")).await?;
    Ok(())
}

/// Add a banned word
#[command(slash_command, guild_only)]
pub async fn add_word(
    ctx: Context<'_>,
    #[description = "Word to ban (supports * wildcards)"] word: String,
) -> Result<(), Error> {
    let Some(guild_id) = ctx.guild_id() else {
        return Ok(());
    };
    let word = word.trim().to_lowercase();
    if word.is_empty() {
        ctx.say("Cannot add an empty word.").await?;
        return Ok(());
    }

    let data = ctx.data();
    let mut added = false;
    data.update_filter_config(guild_id, |config| {
        if !config.words.contains(&word) {
            config.words.push(word.clone());
            added = true;
        }
    });
    data.save().await?;

    if added {
        ctx.say(format!("Added `{word}` to the banned word list."))
            .await?;
    } else {
        ctx.say(format!("`{word}` is already on the banned word list."))
            .await?;
    }
    Ok(())
}

/// Remove a banned word
#[command(slash_command, guild_only)]
pub async fn remove_word(
    ctx: Context<'_>,
    #[description = "Word to remove"] word: String,
) -> Result<(), Error> {
    let Some(guild_id) = ctx.guild_id() else {
        return Ok(());
    };
    let word = word.trim().to_lowercase();
    let data = ctx.data();
    let mut removed = false;
    data.update_filter_config(guild_id, |config| {
        let before = config.words.len();
        config.words.retain(|existing| existing != &word);
        removed = config.words.len() != before;
    });
    data.save().await?;

    if removed {
        ctx.say(format!("Removed `{word}` from the banned word list."))
            .await?;
    } else {
        ctx.say(format!("`{word}` was not on the banned word list."))
            .await?;
    }
    Ok(())
}

/// Add a banned phrase
#[command(slash_command, guild_only)]
pub async fn add_phrase(
    ctx: Context<'_>,
    #[description = "Phrase to ban (or /regex/ for a raw pattern)"] phrase: String,
) -> Result<(), Error> {
    let Some(guild_id) = ctx.guild_id() else {
        return Ok(());
    };
    let phrase = phrase.trim().to_lowercase();
    if phrase.is_empty() {
        ctx.say("Cannot add an empty phrase.").await?;
        return Ok(());
    }

    let data = ctx.data();
    let mut added = false;
    data.update_filter_config(guild_id, |config| {
        if !config.phrases.contains(&phrase) {
            config.phrases.push(phrase.clone());
            added = true;
        }
    });
    data.save().await?;

    if added {
        ctx.say(format!("Added `{phrase}` to the banned phrase list."))
            .await?;
    } else {
        ctx.say(format!("`{phrase}` is already on the banned phrase list."))
            .await?;
    }
    Ok(())
}

/// Remove a banned phrase
#[command(slash_command, guild_only)]
pub async fn remove_phrase(
    ctx: Context<'_>,
    #[description = "Phrase to remove"] phrase: String,
) -> Result<(), Error> {
    let Some(guild_id) = ctx.guild_id() else {
        return Ok(());
    };
    let phrase = phrase.trim().to_lowercase();
    let data = ctx.data();
    let mut removed = false;
    data.update_filter_config(guild_id, |config| {
        let before = config.phrases.len();
        config.phrases.retain(|existing| existing != &phrase);
        removed = config.phrases.len() != before;
    });
    data.save().await?;

    if removed {
        ctx.say(format!("Removed `{phrase}` from the banned phrase list."))
            .await?;
    } else {
        ctx.say(format!("`{phrase}` was not on the banned phrase list."))
            .await?;
    }
    Ok(())
}

/// List the configured banned words and phrases
#[command(slash_command, guild_only, ephemeral)]
pub async fn list(ctx: Context<'_>) -> Result<(), Error> {
    let Some(guild_id) = ctx.guild_id() else {
        return Ok(());
    };
    let Some(config) = ctx.data().get_filter_config(guild_id) else {
        ctx.say("The word filter is not configured for this server.")
            .await?;
        return Ok(());
    };

    if config.words.is_empty() && config.phrases.is_empty() {
        ctx.say("No banned words or phrases configured.").await?;
        return Ok(());
    }

    let mut listing = String::new();
    if !config.words.is_empty() {
        let _ = writeln!(listing, "**Words**: ||{}||", config.words.join(", "));
    }
    if !config.phrases.is_empty() {
        let _ = writeln!(listing, "**Phrases**: ||{}||", config.phrases.join(", "));
    }
    ctx.say(listing).await?;
    Ok(())
}

/// Exempt a channel from filtering, or lift the exemption
#[command(slash_command, guild_only)]
pub async fn whitelist_channel(
    ctx: Context<'_>,
    #[description = "Channel to toggle"]
    #[channel_types("Text")]
    channel: serenity::GuildChannel,
) -> Result<(), Error> {
    let Some(guild_id) = ctx.guild_id() else {
        return Ok(());
    };
    let channel_id = channel.id.get();
    let data = ctx.data();
    let mut now_whitelisted = false;
    data.update_filter_config(guild_id, |config| {
        if config.whitelist_channels.contains(&channel_id) {
            config.whitelist_channels.retain(|id| *id != channel_id);
        } else {
            config.whitelist_channels.push(channel_id);
            now_whitelisted = true;
        }
    });
    data.save().await?;

    if now_whitelisted {
        ctx.say(format!("<#{channel_id}> is now exempt from filtering."))
            .await?;
    } else {
        ctx.say(format!("<#{channel_id}> is no longer exempt from filtering."))
            .await?;
    }
    Ok(())
}

/// Exempt a role from filtering, or lift the exemption
#[command(slash_command, guild_only)]
pub async fn whitelist_role(
    ctx: Context<'_>,
    #[description = "Role to toggle"] role: serenity::Role,
) -> Result<(), Error> {
    let Some(guild_id) = ctx.guild_id() else {
        return Ok(());
    };
    let role_id = role.id.get();
    let data = ctx.data();
    let mut now_whitelisted = false;
    data.update_filter_config(guild_id, |config| {
        if config.whitelist_roles.contains(&role_id) {
            config.whitelist_roles.retain(|id| *id != role_id);
        } else {
            config.whitelist_roles.push(role_id);
            now_whitelisted = true;
        }
    });
    data.save().await?;

    if now_whitelisted {
        ctx.say(format!("Members with {} are now exempt from filtering.", role.name))
            .await?;
    } else {
        ctx.say(format!(
            "Members with {} are no longer exempt from filtering.",
            role.name
        ))
        .await?;
    }
    Ok(())
}

/// Set the notice sent to offenders, or clear it to use the default
#[command(slash_command, guild_only)]
pub async fn notice(
    ctx: Context<'_>,
    #[description = "Custom notice text (omit to restore the default)"] text: Option<String>,
) -> Result<(), Error> {
    let Some(guild_id) = ctx.guild_id() else {
        return Ok(());
    };
    let data = ctx.data();
    let cleared = text.is_none();
    data.update_filter_config(guild_id, |config| config.notice = text.clone());
    data.save().await?;

    if cleared {
        ctx.say("Offender notice reset to the default.").await?;
    } else {
        ctx.say("Offender notice updated.").await?;
    }
    Ok(())
}

/// Set the mod-log channel, or clear it to stop mod-log notifications
#[command(slash_command, guild_only)]
pub async fn log_channel(
    ctx: Context<'_>,
    #[description = "Channel receiving violation notifications (omit to clear)"]
    #[channel_types("Text")]
    channel: Option<serenity::GuildChannel>,
) -> Result<(), Error> {
    let Some(guild_id) = ctx.guild_id() else {
        return Ok(());
    };
    let data = ctx.data();
    let channel_id = channel.as_ref().map(|c| c.id.get());
    data.update_filter_config(guild_id, |config| config.log_channel_id = channel_id);
    data.save().await?;

    match channel_id {
        Some(id) => ctx.say(format!("Mod-log channel set to <#{id}>.")).await?,
        None => ctx.say("Mod-log channel cleared.").await?,
    };
    Ok(())
}

/// Toggle display-name filtering (matches are logged, names are never edited)
#[command(slash_command, guild_only)]
pub async fn display_names(
    ctx: Context<'_>,
    #[description = "Whether to also scan member display names"] enabled: bool,
) -> Result<(), Error> {
    let Some(guild_id) = ctx.guild_id() else {
        return Ok(());
    };
    let data = ctx.data();
    data.update_filter_config(guild_id, |config| config.filter_display_names = enabled);
    data.save().await?;
    ctx.say(format!(
        "Display-name filtering {}.",
        if enabled { "enabled" } else { "disabled" }
    ))
    .await?;
    Ok(())
}

/// Merge a preset's patterns into this server's filter
#[command(slash_command, guild_only)]
pub async fn preset(
    ctx: Context<'_>,
    #[description = "Preset name"] name: String,
) -> Result<(), Error> {
    let Some(guild_id) = ctx.guild_id() else {
        return Ok(());
    };
    let data = ctx.data();

    let Some(preset) = data.get_preset(&name) else {
        let available = data.preset_names().join(", ");
        ctx.say(format!("Unknown preset `{name}`. Available: {available}"))
            .await?;
        return Ok(());
    };

    let mut added = 0usize;
    data.update_filter_config(guild_id, |config| {
        for word in &preset.words {
            if !config.words.contains(word) {
                config.words.push(word.clone());
                added += 1;
            }
        }
        for phrase in &preset.phrases {
            if !config.phrases.contains(phrase) {
                config.phrases.push(phrase.clone());
                added += 1;
            }
        }
    });
    data.save().await?;

    ctx.say(format!(
        "Applied preset `{}` ({}): {added} new pattern(s).",
        preset.name, preset.category
    ))
    .await?;
    Ok(())
}

/// Preview what the filter would do with a message, without side effects
#[command(slash_command, guild_only, ephemeral)]
pub async fn test(
    ctx: Context<'_>,
    #[description = "Text to run through the filter"] text: String,
) -> Result<(), Error> {
    let Some(guild_id) = ctx.guild_id() else {
        return Ok(());
    };
    let data = ctx.data();
    let report = data.filter.test_message(data, guild_id, &text);

    let mut reply = format!(
        "Would block: **{}**\nNormalized: `{}`\n",
        report.would_block,
        if report.normalized.is_empty() {
            "(empty)"
        } else {
            report.normalized.as_str()
        }
    );
    if report.matches.is_empty() {
        reply.push_str("No patterns matched.");
    } else {
        let _ = writeln!(reply, "Matched patterns:");
        for hit in &report.matches {
            let _ = writeln!(reply, "- `{}` ({})", hit.term, hit.kind);
        }
    }
    ctx.say(reply).await?;
    Ok(())
}

/// Violation statistics for the last 24 hours
#[command(slash_command, guild_only)]
pub async fn stats(ctx: Context<'_>) -> Result<(), Error> {
    let Some(guild_id) = ctx.guild_id() else {
        return Ok(());
    };
    let data = ctx.data();
    let window = chrono::Duration::hours(24);
    let total = data.filter.violations().total_count(guild_id.get(), window);
    let top = data.filter.violations().top_terms(guild_id.get(), window, 5);

    let mut reply = format!("**{total}** violation(s) in the last 24 hours.\n");
    if !top.is_empty() {
        reply.push_str("Top terms:\n");
        for row in &top {
            let _ = writeln!(
                reply,
                "- ||{}|| ({}, {}) — {}",
                row.term, row.kind, row.action, row.count
            );
        }
    }
    ctx.say(reply).await?;
    Ok(())
}

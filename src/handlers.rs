use crate::EVENT_TARGET;
use crate::data::Data;
use crate::filter::{DiscordActions, IncomingMessage};
use poise::serenity_prelude::{
    self as serenity, Context, EventHandler, GuildId, Message, Ready, RoleId,
};
use std::sync::Arc;
use tracing::{error, info, warn};

pub struct Handler;

#[serenity::async_trait]
impl EventHandler for Handler {
    /// Called when the bot is ready, but the cache may not be fully populated yet.
    async fn ready(&self, ctx: Context, ready: Ready) {
        let user_name = ready.user.name.clone();
        let shard_id = ctx.shard_id;
        info!("Connected as {user_name}, shard {shard_id}");
    }

    /// Called when the cache is fully populated.
    async fn cache_ready(&self, ctx: Context, guilds: Vec<GuildId>) {
        let guild_count_cache = ctx.cache.guild_count();
        let guild_count = guilds.len();
        if guild_count != guild_count_cache {
            warn!(
                "Cache guild count mismatch: {guild_count_cache} (cache) vs {guild_count} (actual)"
            );
        }
        info!("Cache ready! The bot is in {guild_count} guild(s)");
    }

    /// Every guild message runs through the word filter.
    async fn message(&self, ctx: Context, msg: Message) {
        if msg.author.bot {
            return;
        }
        let Some(guild_id) = msg.guild_id else {
            return;
        };

        let data = {
            let map = ctx.data.read().await;
            map.get::<Data>().cloned()
        };
        let Some(data) = data else {
            warn!(target: EVENT_TARGET, "Bot data not registered, skipping message check");
            return;
        };

        let incoming = build_incoming(&ctx, &msg, guild_id);
        let actions = DiscordActions::new(Arc::clone(&ctx.http));
        let outcome = data.filter.check_message(&actions, &data, &incoming).await;

        if outcome.term.is_some() {
            // persist the violation log off the message path
            let data = data.clone();
            tokio::spawn(async move {
                if let Err(e) = data.save().await {
                    error!(target: EVENT_TARGET, error = %e, "Failed to persist violation log");
                }
            });
        }
    }
}

/// Project the serenity message onto the slice the filter needs. Bypass and
/// role information comes from the gateway member data and the guild cache;
/// when the guild is not cached the author is treated as having no bypass.
fn build_incoming(ctx: &Context, msg: &Message, guild_id: GuildId) -> IncomingMessage {
    let roles: Vec<RoleId> = msg
        .member
        .as_ref()
        .map(|member| member.roles.clone())
        .unwrap_or_default();

    let display_name = msg
        .member
        .as_ref()
        .and_then(|member| member.nick.clone())
        .or_else(|| msg.author.global_name.clone());

    let has_bypass = msg.guild(&ctx.cache).is_some_and(|guild| {
        guild.owner_id == msg.author.id
            || roles.iter().any(|role_id| {
                guild.roles.get(role_id).is_some_and(|role| {
                    role.permissions.administrator() || role.permissions.manage_messages()
                })
            })
    });

    IncomingMessage {
        guild_id,
        channel_id: msg.channel_id,
        message_id: msg.id,
        author_id: msg.author.id,
        author_is_bot: msg.author.bot,
        roles,
        display_name,
        has_bypass,
        content: msg.content.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Test the Handler struct can be created
    #[test]
    fn test_handler_creation() {
        let _handler = Handler;
        let _another_handler = Handler;
    }

    // Since we can't easily mock Context and Ready objects due to their complex structure,
    // we'll test what we can about our handler implementation.
    #[test]
    fn test_handler_implements_event_handler() {
        // This test verifies at compile time that Handler implements EventHandler
        fn assert_impl<T: EventHandler>() {}
        assert_impl::<Handler>();
    }
}

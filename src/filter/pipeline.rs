//! Enforcement pipeline
//!
//! Turns a match into a graduated, cooldown-aware enforcement run. Rapid
//! repeat violations from the same (guild, user) inside the cooldown window
//! collapse to a bare message delete, so one paste-spammer cannot flood DMs,
//! the mod-log or the punishment queue. Every destructive sub-action is
//! independently best-effort: a permission error or an already-deleted
//! message is logged and dropped, never retried, and never stops the
//! remaining sub-actions.

use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use poise::serenity_prelude as serenity;
use serenity::builder::{CreateEmbed, CreateMessage};
use serenity::{ChannelId, GuildId, Http, MessageId, UserId};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{info, warn};

use super::engine::{MatchResult, MatchSource};
use super::error::FilterResult;
use super::pattern::MatchKind;
use super::policy::{FilterAction, FilterPolicy};
use super::service::IncomingMessage;
use super::store::{ViolationRecord, ViolationStore};
use crate::FILTER_TARGET;

/// Minimum interval between full enforcement runs for one (guild, user).
pub const DEFAULT_COOLDOWN: Duration = Duration::from_millis(5000);

/// Timeout length applied by the mute action.
pub const DEFAULT_MUTE_DURATION: Duration = Duration::from_secs(300);

/// Structured mod-log notification.
///
/// Carries the matched term, kind and action only — the raw message content
/// is never part of a mod-log emission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModLogEntry {
    pub user_id: UserId,
    pub channel_id: ChannelId,
    pub term: String,
    pub kind: MatchKind,
    pub action: FilterAction,
}

/// Capability interface over the destructive Discord-side actions.
///
/// The pipeline only ever talks to this trait; production wires in
/// [`DiscordActions`], tests wire in a mock.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ModActions: Send + Sync {
    async fn delete_message(
        &self,
        channel_id: ChannelId,
        message_id: MessageId,
    ) -> FilterResult<()>;

    async fn send_direct_message(&self, user_id: UserId, text: &str) -> FilterResult<()>;

    async fn timeout_member(
        &self,
        guild_id: GuildId,
        user_id: UserId,
        duration: Duration,
        reason: &str,
    ) -> FilterResult<()>;

    async fn kick_member(&self, guild_id: GuildId, user_id: UserId, reason: &str)
        -> FilterResult<()>;

    async fn ban_member(&self, guild_id: GuildId, user_id: UserId, reason: &str)
        -> FilterResult<()>;

    async fn send_mod_log(&self, channel_id: ChannelId, entry: &ModLogEntry) -> FilterResult<()>;
}

/// Production [`ModActions`] backed by the serenity HTTP client
pub struct DiscordActions {
    http: Arc<Http>,
}

impl DiscordActions {
    #[must_use]
    pub fn new(http: Arc<Http>) -> Self {
        Self { http }
    }
}

#[async_trait]
impl ModActions for DiscordActions {
    async fn delete_message(
        &self,
        channel_id: ChannelId,
        message_id: MessageId,
    ) -> FilterResult<()> {
        channel_id.delete_message(&self.http, message_id).await?;
        Ok(())
    }

    async fn send_direct_message(&self, user_id: UserId, text: &str) -> FilterResult<()> {
        let channel = user_id.create_dm_channel(&self.http).await?;
        channel.id.say(&self.http, text).await?;
        Ok(())
    }

    async fn timeout_member(
        &self,
        guild_id: GuildId,
        user_id: UserId,
        duration: Duration,
        reason: &str,
    ) -> FilterResult<()> {
        let until = Utc::now() + chrono::Duration::seconds(duration.as_secs() as i64);
        guild_id
            .edit_member(
                &self.http,
                user_id,
                serenity::builder::EditMember::new()
                    .disable_communication_until_datetime(until.into())
                    .audit_log_reason(reason),
            )
            .await?;
        Ok(())
    }

    async fn kick_member(
        &self,
        guild_id: GuildId,
        user_id: UserId,
        reason: &str,
    ) -> FilterResult<()> {
        guild_id.kick_with_reason(&self.http, user_id, reason).await?;
        Ok(())
    }

    async fn ban_member(
        &self,
        guild_id: GuildId,
        user_id: UserId,
        reason: &str,
    ) -> FilterResult<()> {
        // 0 delete-message-days: the offending message is already removed by
        // the pipeline's own delete sub-action.
        guild_id
            .ban_with_reason(&self.http, user_id, 0, reason)
            .await?;
        Ok(())
    }

    async fn send_mod_log(&self, channel_id: ChannelId, entry: &ModLogEntry) -> FilterResult<()> {
        let embed = CreateEmbed::new()
            .title("Word filter violation")
            .field("User", format!("<@{}>", entry.user_id), true)
            .field("Channel", format!("<#{}>", entry.channel_id), true)
            .field("Term", format!("||{}||", entry.term), true)
            .field("Kind", entry.kind.to_string(), true)
            .field("Action", entry.action.to_string(), true);
        channel_id
            .send_message(&self.http, CreateMessage::new().embed(embed))
            .await?;
        Ok(())
    }
}

/// Tracks the last full enforcement run per (guild, user).
///
/// Process memory only; never persisted. Entries are independent keys in a
/// concurrent map, so unrelated users never contend.
pub struct CooldownTracker {
    last_full_run: DashMap<(u64, u64), Instant>,
    window: Duration,
}

impl CooldownTracker {
    #[must_use]
    pub fn new(window: Duration) -> Self {
        Self {
            last_full_run: DashMap::new(),
            window,
        }
    }

    /// Whether a full run happened inside the window.
    #[must_use]
    pub fn is_active(&self, guild_id: u64, user_id: u64) -> bool {
        self.last_full_run
            .get(&(guild_id, user_id))
            .is_some_and(|at| at.elapsed() < self.window)
    }

    /// Record a full run now.
    pub fn mark(&self, guild_id: u64, user_id: u64) {
        self.last_full_run.insert((guild_id, user_id), Instant::now());
    }
}

/// What the pipeline did with a match
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Enforcement {
    /// Full run: violation recorded, configured action executed
    Full(FilterAction),
    /// Inside the cooldown window: message suppressed, nothing else
    Suppressed,
}

/// Graduated, cooldown-aware enforcement
pub struct EnforcementPipeline {
    cooldowns: CooldownTracker,
    violations: ViolationStore,
}

impl EnforcementPipeline {
    #[must_use]
    pub fn new(cooldown_window: Duration, violations: ViolationStore) -> Self {
        Self {
            cooldowns: CooldownTracker::new(cooldown_window),
            violations,
        }
    }

    #[must_use]
    pub fn violations(&self) -> &ViolationStore {
        &self.violations
    }

    /// Handle one match against one message.
    pub async fn handle(
        &self,
        actions: &dyn ModActions,
        policy: &FilterPolicy,
        message: &IncomingMessage,
        hit: &MatchResult,
    ) -> Enforcement {
        let guild_id = policy.guild_id.get();
        let user_id = message.author_id.get();

        // Display names cannot be deleted, so a name hit is always log-only.
        let action = match hit.source {
            MatchSource::Content => policy.action,
            MatchSource::DisplayName => FilterAction::LogOnly,
        };
        let mutates = action != FilterAction::LogOnly;

        if self.cooldowns.is_active(guild_id, user_id) {
            if mutates {
                if let Err(error) = actions
                    .delete_message(message.channel_id, message.message_id)
                    .await
                {
                    warn!(
                        target: FILTER_TARGET,
                        user_id,
                        guild_id,
                        error = %error,
                        "Failed to delete message during cooldown"
                    );
                }
            }
            info!(
                target: FILTER_TARGET,
                user_id,
                guild_id,
                term = %hit.term,
                event = "cooldown_suppressed",
                "Violation within cooldown window, full enforcement suppressed"
            );
            return Enforcement::Suppressed;
        }

        self.violations.append(ViolationRecord::new(
            guild_id,
            user_id,
            message.channel_id.get(),
            &hit.term,
            hit.kind,
            action,
        ));

        let reason = format!("Word filter: matched {} \"{}\"", hit.kind, hit.term);
        let notice = policy.notice.clone().unwrap_or_else(|| {
            format!("Your message was removed because it matched this server's word filter (`{}`).", hit.term)
        });

        if mutates {
            if let Err(error) = actions
                .delete_message(message.channel_id, message.message_id)
                .await
            {
                warn!(target: FILTER_TARGET, user_id, guild_id, error = %error, "Failed to delete message");
            }
        }

        match action {
            FilterAction::Delete | FilterAction::LogOnly => {}
            FilterAction::Warn => {
                if let Err(error) = actions.send_direct_message(message.author_id, &notice).await {
                    warn!(target: FILTER_TARGET, user_id, guild_id, error = %error, "Failed to send warning notice");
                }
            }
            FilterAction::Mute => {
                if let Err(error) = actions
                    .timeout_member(policy.guild_id, message.author_id, DEFAULT_MUTE_DURATION, &reason)
                    .await
                {
                    warn!(target: FILTER_TARGET, user_id, guild_id, error = %error, "Failed to timeout member");
                }
                if let Err(error) = actions.send_direct_message(message.author_id, &notice).await {
                    warn!(target: FILTER_TARGET, user_id, guild_id, error = %error, "Failed to send mute notice");
                }
            }
            FilterAction::Kick => {
                if let Err(error) = actions.send_direct_message(message.author_id, &notice).await {
                    warn!(target: FILTER_TARGET, user_id, guild_id, error = %error, "Failed to send kick notice");
                }
                if let Err(error) = actions
                    .kick_member(policy.guild_id, message.author_id, &reason)
                    .await
                {
                    warn!(target: FILTER_TARGET, user_id, guild_id, error = %error, "Failed to kick member");
                }
            }
            FilterAction::Ban => {
                if let Err(error) = actions.send_direct_message(message.author_id, &notice).await {
                    warn!(target: FILTER_TARGET, user_id, guild_id, error = %error, "Failed to send ban notice");
                }
                if let Err(error) = actions
                    .ban_member(policy.guild_id, message.author_id, &reason)
                    .await
                {
                    warn!(target: FILTER_TARGET, user_id, guild_id, error = %error, "Failed to ban member");
                }
            }
        }

        if policy.log_violations {
            if let Some(log_channel) = policy.log_channel {
                let entry = ModLogEntry {
                    user_id: message.author_id,
                    channel_id: message.channel_id,
                    term: hit.term.clone(),
                    kind: hit.kind,
                    action,
                };
                if let Err(error) = actions.send_mod_log(log_channel, &entry).await {
                    warn!(target: FILTER_TARGET, user_id, guild_id, error = %error, "Failed to send mod-log entry");
                }
            }
        }

        self.cooldowns.mark(guild_id, user_id);

        info!(
            target: FILTER_TARGET,
            user_id,
            guild_id,
            term = %hit.term,
            kind = %hit.kind,
            action = %action,
            event = "enforced",
            "Filter violation enforced"
        );

        Enforcement::Full(action)
    }
}

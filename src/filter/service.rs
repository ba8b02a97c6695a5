//! Filter service
//!
//! Front door of the filter system: owns the policy cache, the cooldown
//! tracker and the violation store, and exposes the two entry points —
//! [`FilterService::check_message`] for live enforcement and
//! [`FilterService::test_message`] for side-effect-free configuration
//! preview.

use poise::serenity_prelude::{ChannelId, GuildId, MessageId, RoleId, UserId};
use std::time::Duration;
use tracing::info;

use super::cache::{ConfigSource, PolicyCacheService};
use super::engine::{self, AuthorContext, MatchResult};
use super::normalize::normalize;
use super::pattern::MatchKind;
use super::pipeline::{DEFAULT_COOLDOWN, EnforcementPipeline, ModActions};
use super::policy::FilterAction;
use super::store::ViolationStore;
use crate::FILTER_TARGET;

/// The slice of an incoming chat message the filter needs
#[derive(Debug, Clone)]
pub struct IncomingMessage {
    pub guild_id: GuildId,
    pub channel_id: ChannelId,
    pub message_id: MessageId,
    pub author_id: UserId,
    pub author_is_bot: bool,
    pub roles: Vec<RoleId>,
    pub display_name: Option<String>,
    pub has_bypass: bool,
    pub content: String,
}

/// Result of a live [`FilterService::check_message`] run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CheckOutcome {
    /// Whether the message itself was suppressed
    pub blocked: bool,
    pub term: Option<String>,
    pub kind: Option<MatchKind>,
}

impl CheckOutcome {
    fn clean() -> Self {
        Self::default()
    }
}

/// Result of a [`FilterService::test_message`] preview
#[derive(Debug, Clone)]
pub struct TestReport {
    pub would_block: bool,
    /// Every pattern that matched, in configured order
    pub matches: Vec<MatchResult>,
    pub normalized: String,
}

/// The filter system's front door
pub struct FilterService {
    cache: PolicyCacheService,
    pipeline: EnforcementPipeline,
}

impl Default for FilterService {
    fn default() -> Self {
        Self::new()
    }
}

impl FilterService {
    #[must_use]
    pub fn new() -> Self {
        Self::with_settings(PolicyCacheService::DEFAULT_TTL, DEFAULT_COOLDOWN)
    }

    /// Build a service with explicit cache TTL and cooldown window.
    #[must_use]
    pub fn with_settings(cache_ttl: Duration, cooldown_window: Duration) -> Self {
        Self {
            cache: PolicyCacheService::new(cache_ttl),
            pipeline: EnforcementPipeline::new(cooldown_window, ViolationStore::new()),
        }
    }

    /// The violation audit log.
    #[must_use]
    pub fn violations(&self) -> &ViolationStore {
        self.pipeline.violations()
    }

    /// Drop the cached policy for a guild. Must be called by every code path
    /// that persists new filter configuration.
    pub fn invalidate(&self, guild_id: GuildId) {
        self.cache.invalidate(guild_id);
    }

    /// Check one live message and enforce on a match.
    pub async fn check_message(
        &self,
        actions: &dyn ModActions,
        config: &dyn ConfigSource,
        message: &IncomingMessage,
    ) -> CheckOutcome {
        if message.author_is_bot {
            return CheckOutcome::clean();
        }

        let policy = self.cache.get(config, message.guild_id, false);
        let normalized = normalize(&message.content, policy.smart());
        let author = AuthorContext {
            channel_id: Some(message.channel_id),
            roles: message.roles.clone(),
            has_bypass: message.has_bypass,
        };

        if let Some(hit) = engine::find_match(&policy, &normalized, &author) {
            info!(
                target: FILTER_TARGET,
                guild_id = %message.guild_id,
                user_id = %message.author_id,
                term = %hit.term,
                kind = %hit.kind,
                event = "match",
                "Message matched filter"
            );
            self.pipeline.handle(actions, &policy, message, &hit).await;
            return CheckOutcome {
                blocked: policy.action != FilterAction::LogOnly,
                term: Some(hit.term),
                kind: Some(hit.kind),
            };
        }

        if let Some(name) = message.display_name.as_deref() {
            if let Some(hit) = engine::check_display_name(&policy, name) {
                self.pipeline.handle(actions, &policy, message, &hit).await;
                // names cannot be deleted, so the message is never blocked
                return CheckOutcome {
                    blocked: false,
                    term: Some(hit.term),
                    kind: Some(hit.kind),
                };
            }
        }

        CheckOutcome::clean()
    }

    /// Run the identical normalize-and-match pipeline against arbitrary text
    /// with a forced policy refresh and no side effects. Takes no
    /// [`ModActions`] at all, so it cannot mutate external state.
    pub fn test_message(
        &self,
        config: &dyn ConfigSource,
        guild_id: GuildId,
        text: &str,
    ) -> TestReport {
        let policy = self.cache.get(config, guild_id, true);
        let normalized = normalize(text, policy.smart());
        let matches = if policy.enabled {
            engine::scan_all(&policy, &normalized)
        } else {
            Vec::new()
        };
        TestReport {
            would_block: !matches.is_empty() && policy.action != FilterAction::LogOnly,
            matches,
            normalized,
        }
    }
}

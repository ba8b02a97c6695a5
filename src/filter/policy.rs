//! Filter policy types
//!
//! `GuildFilterConfig` is the raw per-guild configuration row as persisted;
//! `FilterPolicy` is the compiled, immutable value the hot path works with.
//! Config changes always produce a whole new policy through
//! [`FilterPolicy::compile`], never in-place mutation of a live one.

use poise::serenity_prelude as serenity;
use serde::{Deserialize, Serialize};
use serenity::{ChannelId, GuildId, RoleId};
use std::collections::HashSet;

use super::pattern::{CompiledPattern, MatchKind, compile_pattern};

/// What to do with a message once a banned term matches
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    derive_more::Display,
    poise::ChoiceParameter,
)]
#[serde(rename_all = "snake_case")]
pub enum FilterAction {
    /// Remove the message
    #[display("delete")]
    Delete,
    /// Remove the message and notify the author
    #[display("warn")]
    Warn,
    /// Remove, time the author out and notify them
    #[display("mute")]
    Mute,
    /// Remove, notify and kick the author
    #[display("kick")]
    Kick,
    /// Remove, notify and ban the author
    #[display("ban")]
    Ban,
    /// Record the violation without touching the message
    #[display("log_only")]
    LogOnly,
}

/// How configured patterns are applied to message text
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    derive_more::Display,
    poise::ChoiceParameter,
)]
#[serde(rename_all = "snake_case")]
pub enum FilterMode {
    /// Words must match on word boundaries
    #[display("exact")]
    Exact,
    /// Words match anywhere in the text
    #[display("contains")]
    Contains,
    /// Contains matching over aggressively normalized text
    #[display("smart")]
    Smart,
}

/// Raw per-guild filter configuration, as persisted
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GuildFilterConfig {
    /// The ID of the guild
    pub guild_id: u64,
    /// Master switch for the filter
    pub enabled: bool,
    /// Action taken on a match
    pub action: FilterAction,
    /// Matching mode
    pub mode: FilterMode,
    /// Custom notice sent to offenders instead of the default one
    pub notice: Option<String>,
    /// Whether violations are recorded and reported to the mod-log
    pub log_violations: bool,
    /// Channels exempt from filtering
    pub whitelist_channels: Vec<u64>,
    /// Roles exempt from filtering
    pub whitelist_roles: Vec<u64>,
    /// Ordered banned word list
    pub words: Vec<String>,
    /// Ordered banned phrase list
    pub phrases: Vec<String>,
    /// Channel receiving mod-log notifications
    pub log_channel_id: Option<u64>,
    /// Also match member display names (reported as log-only)
    pub filter_display_names: bool,
}

impl Default for GuildFilterConfig {
    fn default() -> Self {
        Self {
            guild_id: 0,
            enabled: false,
            action: FilterAction::Delete,
            mode: FilterMode::Smart,
            notice: None,
            log_violations: true,
            whitelist_channels: Vec::new(),
            whitelist_roles: Vec::new(),
            words: Vec::new(),
            phrases: Vec::new(),
            log_channel_id: None,
            filter_display_names: false,
        }
    }
}

impl GuildFilterConfig {
    /// A fresh config row for a guild, disabled until a moderator enables it.
    #[must_use]
    pub fn for_guild(guild_id: GuildId) -> Self {
        Self {
            guild_id: guild_id.get(),
            ..Default::default()
        }
    }
}

/// Compiled, immutable filter policy for one guild
#[derive(Debug, Clone)]
pub struct FilterPolicy {
    pub guild_id: GuildId,
    pub enabled: bool,
    pub action: FilterAction,
    pub mode: FilterMode,
    pub notice: Option<String>,
    pub log_violations: bool,
    pub whitelist_channels: HashSet<ChannelId>,
    pub whitelist_roles: HashSet<RoleId>,
    /// Word patterns first, then phrase patterns, each list in configured order
    pub patterns: Vec<CompiledPattern>,
    pub log_channel: Option<ChannelId>,
    pub filter_display_names: bool,
}

impl FilterPolicy {
    /// Compile a raw config row into a policy. Patterns that fail to compile
    /// are skipped (already logged by the compiler) and never block the rest.
    #[must_use]
    pub fn compile(config: &GuildFilterConfig) -> Self {
        let mode = config.mode;
        let patterns = config
            .words
            .iter()
            .map(|word| compile_pattern(word, mode, MatchKind::Word))
            .chain(
                config
                    .phrases
                    .iter()
                    .map(|phrase| compile_pattern(phrase, mode, MatchKind::Phrase)),
            )
            .flatten()
            .collect();

        Self {
            guild_id: GuildId::new(config.guild_id.max(1)),
            enabled: config.enabled,
            action: config.action,
            mode,
            notice: config.notice.clone(),
            log_violations: config.log_violations,
            whitelist_channels: config
                .whitelist_channels
                .iter()
                .map(|id| ChannelId::new(*id))
                .collect(),
            whitelist_roles: config
                .whitelist_roles
                .iter()
                .map(|id| RoleId::new(*id))
                .collect(),
            patterns,
            log_channel: config.log_channel_id.map(ChannelId::new),
            filter_display_names: config.filter_display_names,
        }
    }

    /// The policy used when a guild has no config row, or the config store is
    /// unavailable: filtering disabled, nothing else set.
    #[must_use]
    pub fn disabled(guild_id: GuildId) -> Self {
        Self::compile(&GuildFilterConfig::for_guild(guild_id))
    }

    /// Whether text should be normalized with the smart transforms.
    #[must_use]
    pub fn smart(&self) -> bool {
        self.mode == FilterMode::Smart
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = GuildFilterConfig::default();
        assert!(!config.enabled);
        assert_eq!(config.action, FilterAction::Delete);
        assert_eq!(config.mode, FilterMode::Smart);
        assert!(config.log_violations);
        assert!(config.words.is_empty());
    }

    #[test]
    fn test_config_serialization() {
        let config = GuildFilterConfig {
            guild_id: 12345,
            enabled: true,
            action: FilterAction::Mute,
            mode: FilterMode::Exact,
            words: vec!["spam".to_string()],
            phrases: vec!["free nitro".to_string()],
            log_channel_id: Some(67890),
            ..Default::default()
        };

        let serialized = serde_yaml::to_string(&config).expect("Failed to serialize");
        assert!(serialized.contains("guild_id: 12345"));
        assert!(serialized.contains("action: mute"));
        assert!(serialized.contains("mode: exact"));
        assert!(serialized.contains("log_channel_id: 67890"));

        let deserialized: GuildFilterConfig =
            serde_yaml::from_str(&serialized).expect("Failed to deserialize");
        assert_eq!(deserialized.guild_id, 12345);
        assert_eq!(deserialized.action, FilterAction::Mute);
        assert_eq!(deserialized.mode, FilterMode::Exact);
        assert_eq!(deserialized.words, vec!["spam".to_string()]);
    }

    #[test]
    fn test_compile_orders_words_before_phrases() {
        let config = GuildFilterConfig {
            guild_id: 1,
            words: vec!["b".to_string(), "ab".to_string()],
            phrases: vec!["free nitro".to_string()],
            ..Default::default()
        };
        let policy = FilterPolicy::compile(&config);
        assert_eq!(policy.patterns.len(), 3);
        assert_eq!(policy.patterns[0].source, "b");
        assert_eq!(policy.patterns[0].kind, MatchKind::Word);
        assert_eq!(policy.patterns[1].source, "ab");
        assert_eq!(policy.patterns[2].source, "free nitro");
        assert_eq!(policy.patterns[2].kind, MatchKind::Phrase);
    }

    #[test]
    fn test_compile_skips_invalid_patterns() {
        let config = GuildFilterConfig {
            guild_id: 1,
            words: vec!["ok".to_string(), String::new()],
            phrases: vec!["/[broken/".to_string(), "fine".to_string()],
            ..Default::default()
        };
        let policy = FilterPolicy::compile(&config);
        let sources: Vec<&str> = policy.patterns.iter().map(|p| p.source.as_str()).collect();
        assert_eq!(sources, vec!["ok", "fine"]);
    }

    #[test]
    fn test_disabled_policy() {
        let policy = FilterPolicy::disabled(GuildId::new(42));
        assert!(!policy.enabled);
        assert!(policy.patterns.is_empty());
        assert_eq!(policy.guild_id, GuildId::new(42));
    }
}

//! Match engine
//!
//! Scans normalized text against a compiled policy. Guards short-circuit to
//! "no match" before any pattern is consulted; the scan itself is
//! first-match-wins in configured order, words before phrases.

use poise::serenity_prelude::{ChannelId, RoleId};

use super::normalize::normalize;
use super::pattern::MatchKind;
use super::policy::FilterPolicy;

/// Where the matched text came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchSource {
    /// The message body
    Content,
    /// The author's display name
    DisplayName,
}

/// A single pattern hit
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchResult {
    /// The configured term that matched
    pub term: String,
    pub kind: MatchKind,
    pub source: MatchSource,
}

/// The author-and-channel context the guard chain runs against
#[derive(Debug, Clone, Default)]
pub struct AuthorContext {
    pub channel_id: Option<ChannelId>,
    pub roles: Vec<RoleId>,
    /// Author holds manage-messages/administrator or equivalent
    pub has_bypass: bool,
}

/// Scan already-normalized text, returning the first configured pattern that
/// matches. No guards are applied here.
#[must_use]
pub fn scan(policy: &FilterPolicy, normalized: &str) -> Option<MatchResult> {
    policy
        .patterns
        .iter()
        .find(|pattern| pattern.is_match(normalized))
        .map(|pattern| MatchResult {
            term: pattern.source.clone(),
            kind: pattern.kind,
            source: MatchSource::Content,
        })
}

/// Scan already-normalized text and collect every matching pattern, in
/// configured order. Used by the configuration preview path.
#[must_use]
pub fn scan_all(policy: &FilterPolicy, normalized: &str) -> Vec<MatchResult> {
    policy
        .patterns
        .iter()
        .filter(|pattern| pattern.is_match(normalized))
        .map(|pattern| MatchResult {
            term: pattern.source.clone(),
            kind: pattern.kind,
            source: MatchSource::Content,
        })
        .collect()
}

/// Run the guard chain, then scan.
///
/// Guard order: filter disabled, whitelisted channel, whitelisted role,
/// bypass permission, empty pattern list. Each one is a hard short-circuit
/// regardless of what the patterns would match.
#[must_use]
pub fn find_match(
    policy: &FilterPolicy,
    normalized: &str,
    author: &AuthorContext,
) -> Option<MatchResult> {
    if !policy.enabled {
        return None;
    }
    if author
        .channel_id
        .is_some_and(|channel| policy.whitelist_channels.contains(&channel))
    {
        return None;
    }
    if author
        .roles
        .iter()
        .any(|role| policy.whitelist_roles.contains(role))
    {
        return None;
    }
    if author.has_bypass {
        return None;
    }
    if policy.patterns.is_empty() {
        return None;
    }

    scan(policy, normalized)
}

/// Secondary display-name check. The name is normalized and scanned like
/// message content, but a hit is reported as coming from the display name so
/// the pipeline records it without mutating anything (names cannot be
/// deleted).
#[must_use]
pub fn check_display_name(policy: &FilterPolicy, display_name: &str) -> Option<MatchResult> {
    if !policy.enabled || !policy.filter_display_names {
        return None;
    }
    let normalized = normalize(display_name, policy.smart());
    scan(policy, &normalized).map(|hit| MatchResult {
        source: MatchSource::DisplayName,
        ..hit
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::policy::{FilterAction, FilterMode, GuildFilterConfig};
    use poise::serenity_prelude::GuildId;

    fn policy(mode: FilterMode, words: &[&str], phrases: &[&str]) -> FilterPolicy {
        FilterPolicy::compile(&GuildFilterConfig {
            guild_id: 1,
            enabled: true,
            mode,
            words: words.iter().map(ToString::to_string).collect(),
            phrases: phrases.iter().map(ToString::to_string).collect(),
            ..Default::default()
        })
    }

    #[test]
    fn test_first_match_wins_in_configured_order() {
        let policy = policy(FilterMode::Contains, &["b", "ab"], &[]);
        let hit = scan(&policy, "drab text").unwrap();
        assert_eq!(hit.term, "b");
        assert_eq!(hit.kind, MatchKind::Word);
    }

    #[test]
    fn test_words_scanned_before_phrases() {
        let policy = policy(FilterMode::Contains, &["nitro"], &["free nitro"]);
        let hit = scan(&policy, "free nitro here").unwrap();
        assert_eq!(hit.term, "nitro");
    }

    #[test]
    fn test_disabled_policy_never_matches() {
        let mut config = GuildFilterConfig {
            guild_id: 1,
            enabled: false,
            words: vec!["spam".to_string()],
            ..Default::default()
        };
        config.mode = FilterMode::Contains;
        let policy = FilterPolicy::compile(&config);
        assert!(find_match(&policy, "spam", &AuthorContext::default()).is_none());
    }

    #[test]
    fn test_whitelisted_channel_short_circuits() {
        let mut config = GuildFilterConfig {
            guild_id: 1,
            enabled: true,
            mode: FilterMode::Contains,
            words: vec!["spam".to_string()],
            ..Default::default()
        };
        config.whitelist_channels = vec![555];
        let policy = FilterPolicy::compile(&config);

        let author = AuthorContext {
            channel_id: Some(ChannelId::new(555)),
            ..Default::default()
        };
        assert!(find_match(&policy, "spam", &author).is_none());

        let elsewhere = AuthorContext {
            channel_id: Some(ChannelId::new(556)),
            ..Default::default()
        };
        assert!(find_match(&policy, "spam", &elsewhere).is_some());
    }

    #[test]
    fn test_whitelisted_role_short_circuits() {
        let mut config = GuildFilterConfig {
            guild_id: 1,
            enabled: true,
            mode: FilterMode::Contains,
            words: vec!["spam".to_string()],
            ..Default::default()
        };
        config.whitelist_roles = vec![42];
        let policy = FilterPolicy::compile(&config);

        let author = AuthorContext {
            roles: vec![RoleId::new(42), RoleId::new(7)],
            ..Default::default()
        };
        assert!(find_match(&policy, "spam", &author).is_none());
    }

    #[test]
    fn test_bypass_permission_short_circuits() {
        let policy = policy(FilterMode::Contains, &["spam"], &[]);
        let author = AuthorContext {
            has_bypass: true,
            ..Default::default()
        };
        assert!(find_match(&policy, "spam", &author).is_none());
    }

    #[test]
    fn test_empty_pattern_list_never_matches() {
        let policy = policy(FilterMode::Contains, &[], &[]);
        assert!(find_match(&policy, "anything", &AuthorContext::default()).is_none());
    }

    #[test]
    fn test_smart_mode_end_to_end() {
        let policy = policy(FilterMode::Smart, &["hello"], &[]);
        let normalized = normalize("h3ll0", true);
        assert_eq!(normalized, "hello");
        assert!(scan(&policy, &normalized).is_some());

        // plain normalization leaves the leetspeak in place, so no match
        let plain = normalize("h3ll0", false);
        assert!(scan(&policy, &plain).is_none());
    }

    #[test]
    fn test_scan_all_collects_every_hit() {
        let policy = policy(FilterMode::Contains, &["b", "ab"], &["drab text"]);
        let hits = scan_all(&policy, "drab text");
        let terms: Vec<&str> = hits.iter().map(|h| h.term.as_str()).collect();
        assert_eq!(terms, vec!["b", "ab", "drab text"]);
    }

    #[test]
    fn test_display_name_hit_is_log_only_source() {
        let mut config = GuildFilterConfig {
            guild_id: 1,
            enabled: true,
            mode: FilterMode::Smart,
            words: vec!["spam".to_string()],
            ..Default::default()
        };
        config.filter_display_names = true;
        config.action = FilterAction::Ban;
        let policy = FilterPolicy::compile(&config);

        let hit = check_display_name(&policy, "Sp4m Lord").unwrap();
        assert_eq!(hit.source, MatchSource::DisplayName);
        assert_eq!(hit.term, "spam");

        config.filter_display_names = false;
        let policy = FilterPolicy::compile(&config);
        assert!(check_display_name(&policy, "Sp4m Lord").is_none());
    }
}

//! Per-guild policy cache
//!
//! Holds one compiled [`FilterPolicy`] per guild, refreshed on TTL expiry and
//! dropped immediately by [`PolicyCacheService::invalidate`] when a command
//! persists new configuration. Each instance owns its own map and TTL; there
//! is no process-global cache.

use dashmap::DashMap;
use poise::serenity_prelude::GuildId;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::debug;

use super::policy::{FilterPolicy, GuildFilterConfig};
use crate::FILTER_TARGET;

/// Narrow read capability over the external config store.
///
/// Returning `None` means "not configured" — either no row for the guild or
/// the backing store being unavailable — and compiles to a disabled policy so
/// a persistence outage can never block message flow.
pub trait ConfigSource: Send + Sync {
    fn filter_config(&self, guild_id: GuildId) -> Option<GuildFilterConfig>;
}

struct CacheEntry {
    policy: Arc<FilterPolicy>,
    refreshed_at: Instant,
}

/// TTL'd cache of compiled filter policies, one entry per guild
pub struct PolicyCacheService {
    entries: DashMap<GuildId, CacheEntry>,
    ttl: Duration,
}

impl PolicyCacheService {
    /// Default entry lifetime before a config re-read.
    pub const DEFAULT_TTL: Duration = Duration::from_secs(60);

    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            ttl,
        }
    }

    /// Get the policy for a guild, recompiling from the config source on a
    /// miss, an expired entry or a forced refresh.
    ///
    /// Concurrent calls for the same guild may both recompile; the policy is
    /// an immutable value, so last writer wins and both results are correct.
    pub fn get(
        &self,
        source: &dyn ConfigSource,
        guild_id: GuildId,
        force_refresh: bool,
    ) -> Arc<FilterPolicy> {
        if !force_refresh {
            if let Some(entry) = self.entries.get(&guild_id) {
                if entry.refreshed_at.elapsed() < self.ttl {
                    return Arc::clone(&entry.policy);
                }
            }
        }

        let policy = Arc::new(
            source
                .filter_config(guild_id)
                .as_ref()
                .map_or_else(|| FilterPolicy::disabled(guild_id), FilterPolicy::compile),
        );
        debug!(
            target: FILTER_TARGET,
            guild_id = %guild_id,
            patterns = policy.patterns.len(),
            enabled = policy.enabled,
            "Compiled filter policy"
        );
        self.entries.insert(
            guild_id,
            CacheEntry {
                policy: Arc::clone(&policy),
                refreshed_at: Instant::now(),
            },
        );
        policy
    }

    /// Drop the cached policy for a guild so the next message sees freshly
    /// persisted configuration without waiting out the TTL.
    pub fn invalidate(&self, guild_id: GuildId) {
        self.entries.remove(&guild_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct StubSource {
        config: std::sync::Mutex<Option<GuildFilterConfig>>,
        reads: AtomicUsize,
    }

    impl StubSource {
        fn new(config: Option<GuildFilterConfig>) -> Self {
            Self {
                config: std::sync::Mutex::new(config),
                reads: AtomicUsize::new(0),
            }
        }

        fn set(&self, config: GuildFilterConfig) {
            *self.config.lock().unwrap() = Some(config);
        }

        fn reads(&self) -> usize {
            self.reads.load(Ordering::SeqCst)
        }
    }

    impl ConfigSource for StubSource {
        fn filter_config(&self, _guild_id: GuildId) -> Option<GuildFilterConfig> {
            self.reads.fetch_add(1, Ordering::SeqCst);
            self.config.lock().unwrap().clone()
        }
    }

    fn enabled_config(words: &[&str]) -> GuildFilterConfig {
        GuildFilterConfig {
            guild_id: 1,
            enabled: true,
            words: words.iter().map(ToString::to_string).collect(),
            ..Default::default()
        }
    }

    #[test]
    fn test_hit_within_ttl_does_not_reread() {
        let cache = PolicyCacheService::new(Duration::from_secs(60));
        let source = StubSource::new(Some(enabled_config(&["spam"])));
        let guild = GuildId::new(1);

        let first = cache.get(&source, guild, false);
        let second = cache.get(&source, guild, false);
        assert_eq!(source.reads(), 1);
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn test_zero_ttl_rereads_every_time() {
        let cache = PolicyCacheService::new(Duration::ZERO);
        let source = StubSource::new(Some(enabled_config(&["spam"])));
        let guild = GuildId::new(1);

        cache.get(&source, guild, false);
        cache.get(&source, guild, false);
        assert_eq!(source.reads(), 2);
    }

    #[test]
    fn test_force_refresh_rereads() {
        let cache = PolicyCacheService::new(Duration::from_secs(60));
        let source = StubSource::new(Some(enabled_config(&["spam"])));
        let guild = GuildId::new(1);

        cache.get(&source, guild, false);
        cache.get(&source, guild, true);
        assert_eq!(source.reads(), 2);
    }

    #[test]
    fn test_invalidate_picks_up_new_config() {
        let cache = PolicyCacheService::new(Duration::from_secs(60));
        let source = StubSource::new(Some(enabled_config(&["spam"])));
        let guild = GuildId::new(1);

        let before = cache.get(&source, guild, false);
        assert_eq!(before.patterns.len(), 1);

        source.set(enabled_config(&["spam", "eggs"]));
        // still cached
        assert_eq!(cache.get(&source, guild, false).patterns.len(), 1);

        cache.invalidate(guild);
        let after = cache.get(&source, guild, false);
        assert_eq!(after.patterns.len(), 2);
    }

    #[test]
    fn test_absent_config_is_disabled_policy() {
        let cache = PolicyCacheService::new(Duration::from_secs(60));
        let source = StubSource::new(None);
        let policy = cache.get(&source, GuildId::new(9), false);
        assert!(!policy.enabled);
        assert!(policy.patterns.is_empty());
    }
}

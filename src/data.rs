use std::{
    default::Default,
    ops::Deref,
    sync::Arc,
};

use crate::filter::{
    ConfigSource, FilterPreset, FilterService, GuildFilterConfig, ViolationRecord,
    builtin_presets,
};
use dashmap::DashMap;
use poise::serenity_prelude as serenity;
use serenity::prelude::TypeMapKey;
use tracing::info;

/// Centralized data structure for the bot
#[derive(Clone)]
pub struct Data(pub Arc<DataInner>);

// Implement TypeMapKey for Data to allow storing it in Serenity's data map
impl TypeMapKey for Data {
    type Value = Data;
}

impl Default for Data {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Data {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Data")
            .field("filter_configs", &self.filter_configs.len())
            .field("presets", &self.presets.len())
            .finish_non_exhaustive()
    }
}

impl Deref for Data {
    type Target = DataInner;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl Data {
    /// Create a new Data instance
    #[must_use]
    pub fn new() -> Self {
        Self(DataInner::new().into())
    }

    /// Load data from YAML files
    pub async fn load() -> Self {
        Self(Arc::new(DataInner::load().await))
    }

    /// Save data to YAML files
    /// # Errors
    /// This function will return an error if:
    /// - The data directory cannot be created
    /// - Any map cannot be serialized to YAML
    /// - The YAML data cannot be written to its file
    pub async fn save(&self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        self.0.save().await
    }

    /// Get the filter configuration for a specific guild
    #[must_use]
    pub fn get_filter_config(&self, guild_id: serenity::GuildId) -> Option<GuildFilterConfig> {
        self.0
            .filter_configs
            .get(&guild_id)
            .map(|entry| entry.value().clone())
    }

    /// Replace a guild's filter configuration and invalidate its cached
    /// policy so the next message sees the update immediately.
    pub fn set_filter_config(&self, config: GuildFilterConfig) {
        let guild_id = serenity::GuildId::new(config.guild_id.max(1));
        self.0.filter_configs.insert(guild_id, config);
        self.0.filter.invalidate(guild_id);
    }

    /// Fetch-or-default a guild's config, apply `update` to it, store the
    /// result and invalidate the cached policy. Returns the stored value.
    pub fn update_filter_config(
        &self,
        guild_id: serenity::GuildId,
        update: impl FnOnce(&mut GuildFilterConfig),
    ) -> GuildFilterConfig {
        let mut config = self
            .get_filter_config(guild_id)
            .unwrap_or_else(|| GuildFilterConfig::for_guild(guild_id));
        update(&mut config);
        self.set_filter_config(config.clone());
        config
    }

    /// Get a preset by name
    #[must_use]
    pub fn get_preset(&self, name: &str) -> Option<FilterPreset> {
        self.0.presets.get(name).map(|entry| entry.value().clone())
    }

    /// Names of all known presets, sorted
    #[must_use]
    pub fn preset_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .0
            .presets
            .iter()
            .map(|entry| entry.key().clone())
            .collect();
        names.sort_unstable();
        names
    }

    /// Seed the built-in preset library, inserting only names that are not
    /// already present. Safe to call on every startup.
    pub fn seed_presets(&self) {
        let mut seeded = 0usize;
        for preset in builtin_presets() {
            let name = preset.name.clone();
            if !self.0.presets.contains_key(&name) {
                self.0.presets.insert(name, preset);
                seeded += 1;
            }
        }
        if seeded > 0 {
            info!("Seeded {seeded} built-in filter preset(s)");
        }
    }
}

impl ConfigSource for Data {
    fn filter_config(&self, guild_id: serenity::GuildId) -> Option<GuildFilterConfig> {
        self.get_filter_config(guild_id)
    }
}

/// Main centralized data structure for the bot
pub struct DataInner {
    // Map of guild_id -> filter configuration
    pub filter_configs: DashMap<serenity::GuildId, GuildFilterConfig>,
    // Map of preset name -> preset
    pub presets: DashMap<String, FilterPreset>,
    // The filter system: policy cache, cooldowns and violation log
    pub filter: FilterService,
}

impl Default for DataInner {
    fn default() -> Self {
        Self::new()
    }
}

const DATA_DIR: &str = "data";
const CONFIG_FILE: &str = "data/filter_configs.yaml";
const VIOLATIONS_FILE: &str = "data/violations.yaml";
const PRESETS_FILE: &str = "data/presets.yaml";

impl DataInner {
    // Create a new Data instance
    #[must_use]
    pub fn new() -> Self {
        Self {
            filter_configs: DashMap::new(),
            presets: DashMap::new(),
            filter: FilterService::new(),
        }
    }

    /// Load data from YAML files
    ///
    /// Missing or unreadable files yield empty maps; filtering simply starts
    /// unconfigured rather than refusing to run.
    pub async fn load() -> Self {
        let data = Self::new();

        if let Ok(file_content) = tokio::fs::read_to_string(CONFIG_FILE).await {
            if let Ok(configs) = serde_yaml::from_str::<Vec<GuildFilterConfig>>(&file_content) {
                for config in configs {
                    let guild_id = serenity::GuildId::new(config.guild_id.max(1));
                    data.filter_configs.insert(guild_id, config);
                }
            }
        }

        if let Ok(file_content) = tokio::fs::read_to_string(VIOLATIONS_FILE).await {
            if let Ok(records) = serde_yaml::from_str::<Vec<ViolationRecord>>(&file_content) {
                data.filter.violations().import(records);
            }
        }

        if let Ok(file_content) = tokio::fs::read_to_string(PRESETS_FILE).await {
            if let Ok(presets) = serde_yaml::from_str::<Vec<FilterPreset>>(&file_content) {
                for preset in presets {
                    data.presets.insert(preset.name.clone(), preset);
                }
            }
        }

        data
    }

    /// Save data to YAML files
    ///
    /// # Errors
    ///
    /// This function will return an error if:
    /// - The data directory cannot be created
    /// - Any map cannot be serialized to YAML
    /// - The YAML data cannot be written to its file
    pub async fn save(&self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        if !std::path::Path::new(DATA_DIR).exists() {
            tokio::fs::create_dir_all(DATA_DIR).await?;
        }

        let configs: Vec<GuildFilterConfig> = self
            .filter_configs
            .iter()
            .map(|entry| entry.value().clone())
            .collect();
        tokio::fs::write(CONFIG_FILE, serde_yaml::to_string(&configs)?).await?;

        let violations = self.filter.violations().export();
        tokio::fs::write(VIOLATIONS_FILE, serde_yaml::to_string(&violations)?).await?;

        let presets: Vec<FilterPreset> = self
            .presets
            .iter()
            .map(|entry| entry.value().clone())
            .collect();
        tokio::fs::write(PRESETS_FILE, serde_yaml::to_string(&presets)?).await?;

        Ok(())
    }
}

/// Tests for the data module
#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::{FilterAction, FilterMode, IncomingMessage, MockModActions};

    #[test]
    fn test_data_new() {
        let data = Data::new();
        assert_eq!(data.filter_configs.len(), 0);
        assert_eq!(data.presets.len(), 0);
        assert_eq!(
            data.filter
                .violations()
                .total_count(1, chrono::Duration::hours(1)),
            0
        );
    }

    #[test]
    fn test_update_creates_default_config() {
        let data = Data::new();
        let guild_id = serenity::GuildId::new(12345);

        let config = data.update_filter_config(guild_id, |c| {
            c.enabled = true;
            c.words.push("spam".to_string());
        });

        assert_eq!(config.guild_id, 12345);
        assert!(config.enabled);
        assert_eq!(data.get_filter_config(guild_id).unwrap().words, vec!["spam"]);
    }

    #[tokio::test]
    async fn test_set_config_invalidates_cached_policy() {
        let data = Data::new();
        let guild_id = serenity::GuildId::new(12345);

        data.update_filter_config(guild_id, |c| {
            c.enabled = true;
            c.mode = FilterMode::Contains;
            c.words.push("spam".to_string());
        });

        let message = IncomingMessage {
            guild_id,
            channel_id: serenity::ChannelId::new(20),
            message_id: serenity::MessageId::new(30),
            author_id: serenity::UserId::new(40),
            author_is_bot: false,
            roles: Vec::new(),
            display_name: None,
            has_bypass: false,
            content: "eggs".to_string(),
        };

        // warm the policy cache (default TTL is far longer than this test)
        let actions = MockModActions::new();
        let outcome = data.filter.check_message(&actions, &data, &message).await;
        assert!(!outcome.blocked);

        // the config write invalidates, so the next read sees "eggs" banned
        // without waiting out the TTL
        data.update_filter_config(guild_id, |c| c.words.push("eggs".to_string()));
        let mut actions = MockModActions::new();
        actions.expect_delete_message().times(1).returning(|_, _| Ok(()));
        let outcome = data.filter.check_message(&actions, &data, &message).await;
        assert!(outcome.blocked);
    }

    #[test]
    fn test_seed_presets_is_idempotent() {
        let data = Data::new();
        data.seed_presets();
        let first_count = data.presets.len();
        assert!(first_count > 0);

        // user edit survives a re-seed
        let mut edited = data.get_preset("profanity-basic").unwrap();
        edited.words.push("customword".to_string());
        data.presets.insert(edited.name.clone(), edited.clone());

        data.seed_presets();
        assert_eq!(data.presets.len(), first_count);
        assert_eq!(
            data.get_preset("profanity-basic").unwrap().words,
            edited.words
        );
    }

    #[test]
    fn test_config_source_reads_stored_row() {
        let data = Data::new();
        let guild_id = serenity::GuildId::new(777);
        assert!(ConfigSource::filter_config(&data, guild_id).is_none());

        data.set_filter_config(GuildFilterConfig {
            guild_id: 777,
            enabled: true,
            action: FilterAction::Warn,
            ..Default::default()
        });
        let row = ConfigSource::filter_config(&data, guild_id).unwrap();
        assert!(row.enabled);
        assert_eq!(row.action, FilterAction::Warn);
    }
}

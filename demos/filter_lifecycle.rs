use async_trait::async_trait;
use poise::serenity_prelude::{ChannelId, GuildId, MessageId, UserId};
use std::time::Duration;
use word_warden::filter::{
    CooldownTracker, FilterAction, FilterMode, FilterService, GuildFilterConfig, IncomingMessage,
    ModActions, ModLogEntry, normalize,
};
use word_warden::filter::{ConfigSource, FilterResult};

/// ModActions stand-in that prints what the pipeline asked for instead of
/// calling Discord.
struct PrintActions;

#[async_trait]
impl ModActions for PrintActions {
    async fn delete_message(
        &self,
        channel_id: ChannelId,
        message_id: MessageId,
    ) -> FilterResult<()> {
        println!("  -> delete message {message_id} in channel {channel_id}");
        Ok(())
    }

    async fn send_direct_message(&self, user_id: UserId, text: &str) -> FilterResult<()> {
        println!("  -> DM user {user_id}: {text}");
        Ok(())
    }

    async fn timeout_member(
        &self,
        guild_id: GuildId,
        user_id: UserId,
        duration: Duration,
        reason: &str,
    ) -> FilterResult<()> {
        println!("  -> timeout user {user_id} in guild {guild_id} for {duration:?} ({reason})");
        Ok(())
    }

    async fn kick_member(
        &self,
        guild_id: GuildId,
        user_id: UserId,
        reason: &str,
    ) -> FilterResult<()> {
        println!("  -> kick user {user_id} from guild {guild_id} ({reason})");
        Ok(())
    }

    async fn ban_member(
        &self,
        guild_id: GuildId,
        user_id: UserId,
        reason: &str,
    ) -> FilterResult<()> {
        println!("  -> ban user {user_id} from guild {guild_id} ({reason})");
        Ok(())
    }

    async fn send_mod_log(&self, channel_id: ChannelId, entry: &ModLogEntry) -> FilterResult<()> {
        println!(
            "  -> mod-log to {channel_id}: term={} kind={} action={}",
            entry.term, entry.kind, entry.action
        );
        Ok(())
    }
}

struct StaticConfig(GuildFilterConfig);

impl ConfigSource for StaticConfig {
    fn filter_config(&self, _guild_id: GuildId) -> Option<GuildFilterConfig> {
        Some(self.0.clone())
    }
}

#[tokio::main]
async fn main() {
    println!("Filter Lifecycle Walkthrough");
    println!("----------------------------");

    let config = StaticConfig(GuildFilterConfig {
        guild_id: 67890,
        enabled: true,
        action: FilterAction::Warn,
        mode: FilterMode::Smart,
        words: vec!["spam".to_string(), "disc*rd".to_string()],
        phrases: vec!["free nitro".to_string()],
        log_channel_id: Some(111),
        ..Default::default()
    });

    println!("\n--- Normalization ---");
    for raw in ["S.P.A.M", "5p4m", "sp\u{200B}am", "spaaaam"] {
        println!("{raw:?} -> {:?}", normalize(raw, true));
    }

    let service = FilterService::new();
    let actions = PrintActions;

    let message = |content: &str| IncomingMessage {
        guild_id: GuildId::new(67890),
        channel_id: ChannelId::new(222),
        message_id: MessageId::new(333),
        author_id: UserId::new(12345),
        author_is_bot: false,
        roles: Vec::new(),
        display_name: None,
        has_bypass: false,
        content: content.to_string(),
    };

    println!("\n--- First violation (full enforcement) ---");
    let outcome = service
        .check_message(&actions, &config, &message("get your fr33 n1tro here"))
        .await;
    println!("blocked={} term={:?}", outcome.blocked, outcome.term);

    println!("\n--- Second violation inside the cooldown window ---");
    let outcome = service
        .check_message(&actions, &config, &message("s.p.a.m again"))
        .await;
    println!("blocked={} term={:?} (delete only, no second DM)", outcome.blocked, outcome.term);

    println!("\n--- Side-effect-free preview ---");
    let report = service.test_message(&config, GuildId::new(67890), "join d1sc0rd today");
    println!(
        "would_block={} normalized={:?} matches={:?}",
        report.would_block,
        report.normalized,
        report
            .matches
            .iter()
            .map(|hit| hit.term.as_str())
            .collect::<Vec<_>>()
    );

    println!("\n--- Violation log ---");
    for row in service
        .violations()
        .top_terms(67890, chrono::Duration::hours(1), 10)
    {
        println!("{} ({}, {}) x{}", row.term, row.kind, row.action, row.count);
    }

    let cooldown = CooldownTracker::new(Duration::from_secs(5));
    cooldown.mark(67890, 12345);
    println!(
        "\ncooldown active for (67890, 12345): {}",
        cooldown.is_active(67890, 12345)
    );

    println!("\nFilter lifecycle walkthrough completed!");
}

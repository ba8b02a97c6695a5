//! Word filter system for Word Warden
//!
//! This module implements the chat filter: text normalization, pattern
//! compilation, per-guild policy caching, match scanning and the graduated
//! enforcement pipeline.

mod cache;
mod engine;
mod error;
mod normalize;
mod pattern;
mod pipeline;
mod policy;
mod presets;
mod service;
mod store;

pub use cache::{ConfigSource, PolicyCacheService};
pub use engine::{AuthorContext, MatchResult, MatchSource};
pub use error::{FilterError, FilterResult};
pub use normalize::normalize;
pub use pattern::{CompiledPattern, MatchKind, compile_pattern};
pub use pipeline::{
    DEFAULT_COOLDOWN, DEFAULT_MUTE_DURATION, CooldownTracker, DiscordActions, Enforcement,
    EnforcementPipeline, ModActions, ModLogEntry,
};
pub use policy::{FilterAction, FilterMode, FilterPolicy, GuildFilterConfig};
pub use presets::{FilterPreset, builtin_presets};
pub use service::{CheckOutcome, FilterService, IncomingMessage, TestReport};
pub use store::{MAX_TERM_LEN, TermCount, ViolationRecord, ViolationStore};

#[cfg(test)]
pub(crate) use pipeline::MockModActions;

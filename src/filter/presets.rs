//! Seed preset library
//!
//! Small built-in pattern collections a moderator can apply as a starting
//! point instead of typing word lists by hand. Loaded into the data store
//! insert-if-absent at startup, so user edits to a preset survive restarts.

use serde::{Deserialize, Serialize};

/// A named, categorized pattern collection
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilterPreset {
    pub name: String,
    pub description: String,
    pub category: String,
    pub words: Vec<String>,
    pub phrases: Vec<String>,
}

/// The built-in presets seeded at startup.
#[must_use]
pub fn builtin_presets() -> Vec<FilterPreset> {
    vec![
        FilterPreset {
            name: "profanity-basic".to_string(),
            description: "Common profanity, smart-mode friendly".to_string(),
            category: "profanity".to_string(),
            words: ["fuck", "shit", "bitch", "asshole"]
                .map(String::from)
                .to_vec(),
            phrases: Vec::new(),
        },
        FilterPreset {
            name: "scam-bait".to_string(),
            description: "Phrases common in giveaway and nitro scams".to_string(),
            category: "phishing".to_string(),
            words: Vec::new(),
            phrases: ["free nitro", "free robux", "claim your prize", "steam gift"]
                .map(String::from)
                .to_vec(),
        },
        FilterPreset {
            name: "server-invites".to_string(),
            description: "Unsolicited server invite links".to_string(),
            category: "spam".to_string(),
            words: Vec::new(),
            phrases: ["discord.gg/".to_string(), "discord.com/invite/".to_string()].to_vec(),
        },
    ]
}

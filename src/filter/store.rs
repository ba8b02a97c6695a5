//! Violation store
//!
//! Append-only audit log of enforced matches plus the aggregate queries the
//! stats command reads. Purely observational: nothing in the hot path ever
//! consults it to make a blocking decision.

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

use super::pattern::MatchKind;
use super::policy::FilterAction;

/// Matched terms are truncated to this many characters before storage.
pub const MAX_TERM_LEN: usize = 64;

/// One enforced violation, immutable once appended
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ViolationRecord {
    /// Unique ID of this violation
    pub id: String,
    pub guild_id: u64,
    pub user_id: u64,
    pub channel_id: u64,
    /// The configured term that matched, truncated to [`MAX_TERM_LEN`]
    pub term: String,
    pub kind: MatchKind,
    /// The action the pipeline took
    pub action: FilterAction,
    pub timestamp: DateTime<Utc>,
}

impl ViolationRecord {
    #[must_use]
    pub fn new(
        guild_id: u64,
        user_id: u64,
        channel_id: u64,
        term: &str,
        kind: MatchKind,
        action: FilterAction,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            guild_id,
            user_id,
            channel_id,
            term: term.chars().take(MAX_TERM_LEN).collect(),
            kind,
            action,
            timestamp: Utc::now(),
        }
    }
}

/// One row of the top-terms aggregate
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TermCount {
    pub term: String,
    pub kind: MatchKind,
    pub action: FilterAction,
    pub count: usize,
}

/// Store for violation records
#[derive(Clone, Default)]
pub struct ViolationStore {
    records: Arc<DashMap<String, ViolationRecord>>,
}

impl ViolationStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a record. Records are never updated or removed from the hot
    /// path; retention is the caller's concern.
    pub fn append(&self, record: ViolationRecord) {
        self.records.insert(record.id.clone(), record);
    }

    /// Total violations for a guild within the trailing window.
    #[must_use]
    pub fn total_count(&self, guild_id: u64, window: chrono::Duration) -> usize {
        let cutoff = Utc::now() - window;
        self.records
            .iter()
            .filter(|entry| {
                let record = entry.value();
                record.guild_id == guild_id && record.timestamp >= cutoff
            })
            .count()
    }

    /// The most frequently matched terms for a guild within the trailing
    /// window, most frequent first.
    #[must_use]
    pub fn top_terms(&self, guild_id: u64, window: chrono::Duration, limit: usize) -> Vec<TermCount> {
        let cutoff = Utc::now() - window;
        let mut counts: HashMap<(String, MatchKind, FilterAction), usize> = HashMap::new();
        for entry in self.records.iter() {
            let record = entry.value();
            if record.guild_id == guild_id && record.timestamp >= cutoff {
                *counts
                    .entry((record.term.clone(), record.kind, record.action))
                    .or_default() += 1;
            }
        }

        let mut rows: Vec<TermCount> = counts
            .into_iter()
            .map(|((term, kind, action), count)| TermCount {
                term,
                kind,
                action,
                count,
            })
            .collect();
        rows.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.term.cmp(&b.term)));
        rows.truncate(limit);
        rows
    }

    /// Snapshot every record for persistence.
    #[must_use]
    pub fn export(&self) -> Vec<ViolationRecord> {
        self.records
            .iter()
            .map(|entry| entry.value().clone())
            .collect()
    }

    /// Load previously persisted records.
    pub fn import(&self, records: Vec<ViolationRecord>) {
        for record in records {
            self.records.insert(record.id.clone(), record);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(guild_id: u64, term: &str, action: FilterAction) -> ViolationRecord {
        ViolationRecord::new(guild_id, 100, 200, term, MatchKind::Word, action)
    }

    #[test]
    fn test_append_and_count() {
        let store = ViolationStore::new();
        store.append(record(1, "spam", FilterAction::Delete));
        store.append(record(1, "spam", FilterAction::Delete));
        store.append(record(2, "eggs", FilterAction::Warn));

        assert_eq!(store.total_count(1, chrono::Duration::hours(1)), 2);
        assert_eq!(store.total_count(2, chrono::Duration::hours(1)), 1);
        assert_eq!(store.total_count(3, chrono::Duration::hours(1)), 0);
    }

    #[test]
    fn test_window_excludes_old_records() {
        let store = ViolationStore::new();
        let mut old = record(1, "spam", FilterAction::Delete);
        old.timestamp = Utc::now() - chrono::Duration::hours(48);
        store.append(old);
        store.append(record(1, "spam", FilterAction::Delete));

        assert_eq!(store.total_count(1, chrono::Duration::hours(24)), 1);
        assert_eq!(store.total_count(1, chrono::Duration::days(7)), 2);
    }

    #[test]
    fn test_terms_are_truncated() {
        let long = "x".repeat(500);
        let record = ViolationRecord::new(1, 2, 3, &long, MatchKind::Phrase, FilterAction::Delete);
        assert_eq!(record.term.chars().count(), MAX_TERM_LEN);
    }

    #[test]
    fn test_top_terms_orders_by_count() {
        let store = ViolationStore::new();
        for _ in 0..3 {
            store.append(record(1, "spam", FilterAction::Delete));
        }
        store.append(record(1, "eggs", FilterAction::Delete));
        store.append(record(1, "eggs", FilterAction::Delete));
        store.append(record(1, "ham", FilterAction::Delete));
        store.append(record(9, "other-guild", FilterAction::Delete));

        let rows = store.top_terms(1, chrono::Duration::hours(1), 2);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].term, "spam");
        assert_eq!(rows[0].count, 3);
        assert_eq!(rows[1].term, "eggs");
        assert_eq!(rows[1].count, 2);
    }

    #[test]
    fn test_export_import_roundtrip() {
        let store = ViolationStore::new();
        store.append(record(1, "spam", FilterAction::Mute));
        let exported = store.export();

        let restored = ViolationStore::new();
        restored.import(exported);
        assert_eq!(restored.total_count(1, chrono::Duration::hours(1)), 1);
    }
}

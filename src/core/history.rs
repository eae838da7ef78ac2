use crate::core::record::{NotificationRecord, RecordId};
use chrono::{DateTime, Utc};
use std::collections::HashSet;

/// Notification history, newest first, at most one record per identifier.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct History {
    records: Vec<NotificationRecord>,
}

/// Result of merging a fetched batch into a history.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Merge {
    pub history: History,
    /// Records whose identifier was not known before the merge.
    pub added: usize,
    pub changed: bool,
}

impl History {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a history from records in any order. Later duplicates of an
    /// identifier are dropped.
    pub fn from_records(records: Vec<NotificationRecord>) -> Self {
        let mut records = dedup(records);
        sort_newest_first(&mut records);
        Self { records }
    }

    pub fn records(&self) -> &[NotificationRecord] {
        &self.records
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn latest(&self) -> Option<&NotificationRecord> {
        self.records.first()
    }

    /// Exclusive lower bound for the next fetch.
    pub fn after(&self) -> Option<DateTime<Utc>> {
        self.latest().map(|r| r.posted)
    }

    /// Prepends `incoming` (expected newest-first) to this history. The first
    /// occurrence of an identifier wins, so a re-sent record replaces the
    /// local copy.
    pub fn merge(&self, incoming: Vec<NotificationRecord>) -> Merge {
        let known: HashSet<&RecordId> =
            self.records.iter().map(|r| &r.id).collect();
        let incoming = dedup(incoming);
        let added = incoming.iter().filter(|r| !known.contains(&r.id)).count();

        let mut records = incoming;
        records.extend(self.records.iter().cloned());
        let mut records = dedup(records);
        sort_newest_first(&mut records);

        let changed = records != self.records;
        Merge {
            history: History { records },
            added,
            changed,
        }
    }
}

fn dedup(records: Vec<NotificationRecord>) -> Vec<NotificationRecord> {
    let mut seen = HashSet::with_capacity(records.len());
    records
        .into_iter()
        .filter(|r| seen.insert(r.id.clone()))
        .collect()
}

// stable, so equal timestamps keep their relative order
fn sort_newest_first(records: &mut [NotificationRecord]) {
    records.sort_by(|a, b| b.posted.cmp(&a.posted));
}

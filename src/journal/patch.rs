use crate::db::ActivityEntry;
use serde::Deserialize;

/// Partial entry update. Absent fields keep their stored value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct EntryPatch {
    pub date: Option<String>,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub timestamp: Option<i64>,
}

impl EntryPatch {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

pub fn merge(existing: ActivityEntry, patch: EntryPatch) -> ActivityEntry {
    ActivityEntry {
        id: existing.id,
        date: patch.date.unwrap_or(existing.date),
        start_time: patch.start_time.unwrap_or(existing.start_time),
        end_time: patch.end_time.unwrap_or(existing.end_time),
        description: patch.description.unwrap_or(existing.description),
        category: patch.category.unwrap_or(existing.category),
        timestamp: patch.timestamp.unwrap_or(existing.timestamp),
    }
}

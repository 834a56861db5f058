//! Collapses time entries that share a description into one entry per description.

use std::collections::HashMap;

use crate::model::{MergedEntry, RawTimeEntry};

/// Merges by trimmed description in first-occurrence order. Entries without a description pass through one by one.
pub fn merge_entries(entries: &[RawTimeEntry]) -> Vec<MergedEntry> {
    let mut merged: Vec<MergedEntry> = Vec::with_capacity(entries.len());
    let mut index_by_key: HashMap<&str, usize> = HashMap::new();

    for entry in entries {
        let Some(key) = entry.merge_key() else {
            merged.push(start_group(entry, None));
            continue;
        };

        match index_by_key.get(key) {
            Some(&index) => {
                let group = &mut merged[index];
                group.duration_seconds += entry.duration_seconds;
                group.source_ids.push(entry.id);
            }
            None => {
                index_by_key.insert(key, merged.len());
                merged.push(start_group(entry, Some(key.to_string())));
            }
        }
    }

    merged
}

fn start_group(entry: &RawTimeEntry, description: Option<String>) -> MergedEntry {
    MergedEntry {
        id: entry.id,
        description,
        duration_seconds: entry.duration_seconds,
        start: entry.start,
        project_id: entry.project_id,
        source_ids: vec![entry.id],
    }
}

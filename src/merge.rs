//! Merging a fresh fetch into the day's existing snapshot.
//!
//! Records are keyed by [`Record::identity`]. The freshest fetch wins: when an
//! identity appears in both inputs the fresh record is kept, and only the
//! fields it leaves empty are filled from the existing one. Output order is
//! first-seen order over `fresh` followed by `existing`.

use crate::models::Record;
use std::collections::HashMap;
use tracing::debug;

pub fn merge(fresh: Vec<Record>, existing: Vec<Record>) -> Vec<Record> {
    let fresh_len = fresh.len();
    let existing_len = existing.len();

    let mut merged: Vec<Record> = Vec::with_capacity(fresh_len + existing_len);
    let mut slots: HashMap<String, usize> = HashMap::with_capacity(fresh_len + existing_len);

    for record in fresh {
        match slots.get(record.identity()) {
            Some(&i) => merged[i] = record,
            None => {
                slots.insert(record.identity().to_string(), merged.len());
                merged.push(record);
            }
        }
    }
    let from_fresh = merged.len();

    for record in existing {
        match slots.get(record.identity()) {
            Some(&i) if i < from_fresh => merged[i].backfill_from(&record),
            Some(&i) => merged[i] = record,
            None => {
                slots.insert(record.identity().to_string(), merged.len());
                merged.push(record);
            }
        }
    }

    debug!(
        fresh = fresh_len,
        existing = existing_len,
        merged = merged.len(),
        "Merged snapshot"
    );
    merged
}

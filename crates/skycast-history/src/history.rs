//! Search history entries and the pure list operations on them.
//!
//! Every function here takes a snapshot and returns a new one; persistence
//! lives in [`crate::store`].

use chrono::Utc;
use serde::{Deserialize, Serialize};
use skycast_weather::Coordinates;

/// A location the user looked up
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryItem {
    pub id: String,
    pub city: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    /// Creation time, milliseconds since the Unix epoch
    pub timestamp: i64,
    pub coords: Coordinates,
}

impl HistoryItem {
    /// New entry with a fresh id and the current time.
    /// Returns `None` when `city` is blank.
    pub fn new(
        city: &str,
        country: Option<&str>,
        coords: Coordinates,
        state: Option<&str>,
    ) -> Option<Self> {
        let city = city.trim();
        if city.is_empty() {
            return None;
        }

        Some(Self {
            id: uuid::Uuid::new_v4().to_string(),
            city: city.to_string(),
            state: state.map(str::to_string),
            country: country.map(str::to_string),
            timestamp: Utc::now().timestamp_millis(),
            coords,
        })
    }
}

/// Both persisted collections at one point in time
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HistorySnapshot {
    /// Most recent first, at most `limit` entries
    pub active: Vec<HistoryItem>,
    /// Last removed first
    pub removed: Vec<HistoryItem>,
}

/// Prepend `item`, dropping any entry at the same location, then truncate to `limit`.
pub fn insert(active: &[HistoryItem], item: HistoryItem, limit: usize) -> Vec<HistoryItem> {
    let mut updated = Vec::with_capacity(active.len() + 1);
    let coords = item.coords;
    updated.push(item);
    updated.extend(
        active
            .iter()
            .filter(|existing| !existing.coords.is_same_location(&coords))
            .cloned(),
    );
    updated.truncate(limit);
    updated
}

/// Move the entry with `id` onto the removed stack.
/// Returns `None` when no entry has that id.
pub fn remove(snapshot: &HistorySnapshot, id: &str) -> Option<HistorySnapshot> {
    let item = snapshot.active.iter().find(|i| i.id == id)?.clone();

    let mut removed = Vec::with_capacity(snapshot.removed.len() + 1);
    removed.push(item);
    removed.extend(snapshot.removed.iter().cloned());

    let active = snapshot
        .active
        .iter()
        .filter(|i| i.id != id)
        .cloned()
        .collect();

    Some(HistorySnapshot { active, removed })
}

/// Pop the last removed entry back into the active list, ordered by timestamp.
/// Returns `None` when there is nothing to restore.
///
/// The restored entry is not deduplicated by location, so it can sit next to a
/// newer entry for the same place.
pub fn undo(snapshot: &HistorySnapshot, limit: usize) -> Option<HistorySnapshot> {
    let (restored, rest) = snapshot.removed.split_first()?;

    let mut active = snapshot.active.clone();
    active.push(restored.clone());
    active.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
    active.truncate(limit);

    Some(HistorySnapshot {
        active,
        removed: rest.to_vec(),
    })
}

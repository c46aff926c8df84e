//! Persisted search history: active list plus the removed stack used for undo.

use std::sync::Arc;

use skycast_weather::Coordinates;

use crate::error::StorageError;
use crate::history::{self, HistoryItem, HistorySnapshot};
use crate::storage::KeyValueStore;

/// Suffix of the key holding the removed stack
pub const UNDO_KEY_SUFFIX: &str = "_undo";

/// Reads and writes history through two independent stores.
///
/// The active list goes to `durable`, the removed stack to `session` under
/// `<storage_key>_undo`. Queries never fail: unreadable data is logged and read
/// as empty. Mutations report write failures.
pub struct HistoryStore {
    durable: Arc<dyn KeyValueStore>,
    session: Arc<dyn KeyValueStore>,
    storage_key: String,
    undo_key: String,
    limit: usize,
}

impl HistoryStore {
    pub fn new(
        durable: Arc<dyn KeyValueStore>,
        session: Arc<dyn KeyValueStore>,
        storage_key: &str,
        limit: usize,
    ) -> Self {
        Self {
            durable,
            session,
            storage_key: storage_key.to_string(),
            undo_key: format!("{}{}", storage_key, UNDO_KEY_SUFFIX),
            limit,
        }
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Active history, most recent first
    pub fn get_all(&self) -> Vec<HistoryItem> {
        read_or_empty(self.durable.as_ref(), &self.storage_key)
    }

    /// Record a looked-up location. Blank city names leave history untouched.
    pub fn add(
        &self,
        city: &str,
        country: Option<&str>,
        coords: Coordinates,
        state: Option<&str>,
    ) -> Result<Vec<HistoryItem>, StorageError> {
        let current = self.get_all();
        let Some(item) = HistoryItem::new(city, country, coords, state) else {
            return Ok(current);
        };

        tracing::debug!("Adding {} to search history", item.city);
        let updated = history::insert(&current, item, self.limit);
        write_list(self.durable.as_ref(), &self.storage_key, &updated)?;
        Ok(updated)
    }

    /// Remove an entry, keeping it restorable. Unknown ids are a no-op.
    pub fn remove(&self, id: &str) -> Result<Vec<HistoryItem>, StorageError> {
        let snapshot = self.snapshot();
        let Some(next) = history::remove(&snapshot, id) else {
            tracing::debug!("No history entry with id {}", id);
            return Ok(snapshot.active);
        };

        self.commit(&snapshot, &next)?;
        Ok(next.active)
    }

    pub fn can_undo(&self) -> bool {
        !read_or_empty(self.session.as_ref(), &self.undo_key).is_empty()
    }

    /// Restore the most recently removed entry, if any
    pub fn undo_remove(&self) -> Result<Vec<HistoryItem>, StorageError> {
        let snapshot = self.snapshot();
        let Some(next) = history::undo(&snapshot, self.limit) else {
            return Ok(snapshot.active);
        };

        self.commit(&snapshot, &next)?;
        Ok(next.active)
    }

    /// Drop the active list and the removed stack
    pub fn clear(&self) -> Result<(), StorageError> {
        tracing::info!("Clearing search history");
        self.durable.remove(&self.storage_key)?;
        self.session.remove(&self.undo_key)?;
        Ok(())
    }

    /// Write both collections of `next`, durable list first.
    ///
    /// On failure both collections are left as in `previous`.
    fn commit(
        &self,
        previous: &HistorySnapshot,
        next: &HistorySnapshot,
    ) -> Result<(), StorageError> {
        write_list(self.durable.as_ref(), &self.storage_key, &next.active)?;

        if let Err(e) = write_list(self.session.as_ref(), &self.undo_key, &next.removed) {
            let restored = write_list(self.durable.as_ref(), &self.storage_key, &previous.active);
            if let Err(rollback) = restored {
                tracing::error!("Failed to roll back {}: {}", self.storage_key, rollback);
            }
            return Err(e);
        }
        Ok(())
    }

    fn snapshot(&self) -> HistorySnapshot {
        HistorySnapshot {
            active: self.get_all(),
            removed: read_or_empty(self.session.as_ref(), &self.undo_key),
        }
    }
}

fn read_list(store: &dyn KeyValueStore, key: &str) -> Result<Vec<HistoryItem>, StorageError> {
    match store.get(key)? {
        Some(raw) => Ok(serde_json::from_str(&raw)?),
        None => Ok(Vec::new()),
    }
}

fn read_or_empty(store: &dyn KeyValueStore, key: &str) -> Vec<HistoryItem> {
    read_list(store, key).unwrap_or_else(|e| {
        tracing::error!("Failed to load {}: {}", key, e);
        Vec::new()
    })
}

fn write_list(
    store: &dyn KeyValueStore,
    key: &str,
    items: &[HistoryItem],
) -> Result<(), StorageError> {
    let json = serde_json::to_string(items)?;
    store.set(key, &json).map_err(|e| {
        tracing::error!("Failed to save {}: {}", key, e);
        e
    })
}

//! Watchable view of the search history.

use skycast_history::{HistoryItem, HistoryStore};
use skycast_weather::Coordinates;
use std::sync::Arc;
use tokio::sync::watch;

use crate::notify::{
    Notifier, HISTORY_ADD_FAILED, HISTORY_CLEAR_FAILED, HISTORY_REMOVE_FAILED,
    HISTORY_UNDO_FAILED,
};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct HistoryState {
    pub items: Vec<HistoryItem>,
    pub can_undo: bool,
}

/// Mirrors [`HistoryStore`] into a watch channel. Store failures are logged and
/// reported through the notifier; the last good state stays visible.
pub struct SearchHistory {
    store: HistoryStore,
    notifier: Arc<dyn Notifier>,
    state: watch::Sender<HistoryState>,
}

impl SearchHistory {
    pub fn new(store: HistoryStore, notifier: Arc<dyn Notifier>) -> Self {
        let initial = HistoryState {
            items: store.get_all(),
            can_undo: store.can_undo(),
        };
        let (state, _) = watch::channel(initial);
        Self {
            store,
            notifier,
            state,
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<HistoryState> {
        self.state.subscribe()
    }

    pub fn state(&self) -> HistoryState {
        self.state.borrow().clone()
    }

    pub fn items(&self) -> Vec<HistoryItem> {
        self.state.borrow().items.clone()
    }

    pub fn add(&self, city: &str, country: Option<&str>, coords: Coordinates, state: Option<&str>) {
        let result = self.store.add(city, country, coords, state);
        self.apply(result, HISTORY_ADD_FAILED);
    }

    pub fn remove(&self, id: &str) {
        let result = self.store.remove(id);
        self.apply(result, HISTORY_REMOVE_FAILED);
    }

    pub fn undo_remove(&self) {
        let result = self.store.undo_remove();
        self.apply(result, HISTORY_UNDO_FAILED);
    }

    pub fn clear(&self) {
        match self.store.clear() {
            Ok(()) => {
                self.state.send_replace(HistoryState::default());
            }
            Err(e) => self.report(HISTORY_CLEAR_FAILED, &e),
        }
    }

    fn apply(
        &self,
        result: Result<Vec<HistoryItem>, skycast_history::StorageError>,
        failure: &str,
    ) {
        match result {
            Ok(items) => {
                self.state.send_replace(HistoryState {
                    items,
                    can_undo: self.store.can_undo(),
                });
            }
            Err(e) => self.report(failure, &e),
        }
    }

    fn report(&self, failure: &str, error: &skycast_history::StorageError) {
        tracing::error!("{}: {}", failure, error);
        self.notifier.error(failure);
    }
}

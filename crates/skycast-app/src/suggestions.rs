//! Debounced city suggestions.
//!
//! Each debounced search takes the next value of a sequence counter and only
//! writes its result back if the counter still holds that value when the
//! gateway answers. Newer input, a blank query or `clear_suggestions` bumps the counter
//! and so silences whatever is still in flight.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use skycast_weather::{ForecastService, Suggestion};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

use crate::notify::{Notifier, CITY_SEARCH_FAILED};

pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(400);

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SuggestionState {
    pub suggestions: Vec<Suggestion>,
    pub loading: bool,
}

struct Shared {
    state: watch::Sender<SuggestionState>,
    sequence: AtomicU64,
}

impl Shared {
    fn is_current(&self, token: u64) -> bool {
        self.sequence.load(Ordering::SeqCst) == token
    }
}

pub struct SuggestionController {
    service: ForecastService,
    notifier: Arc<dyn Notifier>,
    debounce: Duration,
    shared: Arc<Shared>,
    pending: Mutex<Option<CancellationToken>>,
}

impl SuggestionController {
    pub fn new(service: ForecastService, notifier: Arc<dyn Notifier>, debounce: Duration) -> Self {
        let (state, _) = watch::channel(SuggestionState::default());
        Self {
            service,
            notifier,
            debounce,
            shared: Arc::new(Shared {
                state,
                sequence: AtomicU64::new(0),
            }),
            pending: Mutex::new(None),
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<SuggestionState> {
        self.shared.state.subscribe()
    }

    pub fn state(&self) -> SuggestionState {
        self.shared.state.borrow().clone()
    }

    /// Schedule a search for `query` after the debounce period.
    ///
    /// Must be called from within a tokio runtime.
    pub fn fetch_suggestions(&self, query: &str) {
        self.cancel_timer();

        let query = query.trim().to_string();
        if query.is_empty() {
            self.shared.sequence.fetch_add(1, Ordering::SeqCst);
            self.shared.state.send_replace(SuggestionState::default());
            return;
        }

        let timer = CancellationToken::new();
        *self.pending.lock() = Some(timer.clone());

        let shared = Arc::clone(&self.shared);
        let service = self.service.clone();
        let notifier = Arc::clone(&self.notifier);
        let debounce = self.debounce;

        tokio::spawn(async move {
            tokio::select! {
                _ = timer.cancelled() => return,
                _ = tokio::time::sleep(debounce) => {}
            }

            let token = shared.sequence.fetch_add(1, Ordering::SeqCst) + 1;
            shared.state.send_modify(|s| s.loading = true);
            tracing::debug!("Searching suggestions for {:?} (request {})", query, token);

            let result = service.search_cities(&query).await;

            if !shared.is_current(token) {
                tracing::debug!("Discarding stale suggestions for {:?}", query);
                return;
            }

            let suggestions = match result {
                Ok(suggestions) => suggestions,
                Err(e) => {
                    tracing::error!("{}: {}", CITY_SEARCH_FAILED, e);
                    notifier.error(CITY_SEARCH_FAILED);
                    Vec::new()
                }
            };

            shared.state.send_replace(SuggestionState {
                suggestions,
                loading: false,
            });
        });
    }

    /// Drop the current list and anything pending or in flight.
    pub fn clear_suggestions(&self) {
        self.cancel_timer();
        self.shared.sequence.fetch_add(1, Ordering::SeqCst);
        self.shared.state.send_replace(SuggestionState::default());
    }

    fn cancel_timer(&self) {
        if let Some(timer) = self.pending.lock().take() {
            timer.cancel();
        }
    }
}

impl Drop for SuggestionController {
    fn drop(&mut self) {
        self.cancel_timer();
    }
}

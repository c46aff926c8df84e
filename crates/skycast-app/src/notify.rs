//! Transient user-facing notifications ("toasts").

use tokio::sync::mpsc;

pub const CITY_SEARCH_FAILED: &str = "Failed to search cities";
pub const HISTORY_LOAD_FAILED: &str = "Failed to load search history";
pub const HISTORY_ADD_FAILED: &str = "Failed to add to search history";
pub const HISTORY_REMOVE_FAILED: &str = "Failed to remove from search history";
pub const HISTORY_UNDO_FAILED: &str = "Failed to restore search history entry";
pub const HISTORY_CLEAR_FAILED: &str = "Failed to clear search history";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub message: String,
}

/// Sink for transient error messages
pub trait Notifier: Send + Sync {
    fn error(&self, message: &str);
}

/// Logs notifications only; used when nothing renders them
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn error(&self, message: &str) {
        tracing::warn!(target: "skycast::notify", "{}", message);
    }
}

/// Forwards notifications to the presentation layer
#[derive(Debug, Clone)]
pub struct ChannelNotifier {
    tx: mpsc::UnboundedSender<Notification>,
}

impl ChannelNotifier {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<Notification>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl Notifier for ChannelNotifier {
    fn error(&self, message: &str) {
        let notification = Notification {
            message: message.to_string(),
        };
        if self.tx.send(notification).is_err() {
            tracing::debug!("Notification dropped, receiver gone: {}", message);
        }
    }
}

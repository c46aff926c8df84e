//! Application layer for Skycast.
//!
//! Controllers own the state the presentation layer renders; every state
//! change is published on a `tokio::sync::watch` channel.

pub mod forecast;
pub mod notify;
pub mod search_history;
pub mod session;
pub mod suggestions;

pub use forecast::{ForecastController, ForecastState, GeolocationStatus, LookupKey};
pub use notify::{ChannelNotifier, Notification, Notifier, TracingNotifier};
pub use search_history::{HistoryState, SearchHistory};
pub use session::{Session, SessionParts, SessionSettings};
pub use suggestions::{SuggestionController, SuggestionState};

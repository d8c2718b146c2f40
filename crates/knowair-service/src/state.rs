//! Application state shared across handlers.
//!
//! # Broadcast Channel Behavior
//!
//! Every classified reading is published on `readings_tx` for WebSocket
//! clients:
//!
//! - **Buffer size**: configurable via `server.broadcast_buffer` (default: 100)
//! - **Message loss**: a subscriber that falls behind by more than the buffer
//!   skips the oldest messages
//! - **No blocking**: ingestion never waits on subscribers
//!
//! ```toml
//! [server]
//! bind = "127.0.0.1:8080"
//! broadcast_buffer = 200
//! ```

use std::sync::Arc;

use knowair_store::{Store, StoredReading};
use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, RwLock, broadcast};

use crate::config::Config;

/// Shared application state.
pub struct AppState {
    /// The data store. Holding the lock serializes ingestion, so each
    /// device's readings are classified one at a time in arrival order.
    pub store: Mutex<Store>,
    /// Configuration (RwLock for runtime updates of the alert settings).
    pub config: RwLock<Config>,
    /// Broadcast channel for real-time reading updates.
    pub readings_tx: broadcast::Sender<ReadingEvent>,
}

impl AppState {
    /// Create new application state.
    ///
    /// The broadcast channel buffer size is taken from
    /// `config.server.broadcast_buffer`.
    pub fn new(store: Store, config: Config) -> Arc<Self> {
        let buffer_size = config.server.broadcast_buffer.max(1);
        let (readings_tx, _) = broadcast::channel(buffer_size);
        Arc::new(Self {
            store: Mutex::new(store),
            config: RwLock::new(config),
            readings_tx,
        })
    }
}

/// A newly classified reading, as pushed to live subscribers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReadingEvent {
    /// Device the reading belongs to.
    pub device_id: String,
    /// The stored reading with its classification.
    pub reading: StoredReading,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ServerConfig;

    #[test]
    fn test_app_state_new() {
        let store = Store::open_in_memory().unwrap();
        let state = AppState::new(store, Config::default());
        assert_eq!(state.readings_tx.receiver_count(), 0);
    }

    #[test]
    fn test_zero_buffer_does_not_panic() {
        let config = Config {
            server: ServerConfig {
                broadcast_buffer: 0,
                ..Default::default()
            },
            ..Default::default()
        };
        let state = AppState::new(Store::open_in_memory().unwrap(), config);
        let _rx = state.readings_tx.subscribe();
        assert_eq!(state.readings_tx.receiver_count(), 1);
    }

    #[tokio::test]
    async fn test_config_is_replaceable_at_runtime() {
        let state = AppState::new(Store::open_in_memory().unwrap(), Config::default());
        state.config.write().await.alerts.thresholds.warn_pct = 10.0;
        assert_eq!(state.config.read().await.alerts.thresholds.warn_pct, 10.0);
    }
}

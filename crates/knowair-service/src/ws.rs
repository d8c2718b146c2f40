//! WebSocket stream of classified readings.

use std::sync::Arc;

use axum::{
    Router,
    extract::{
        State, WebSocketUpgrade,
        ws::{Message, WebSocket},
    },
    response::IntoResponse,
    routing::get,
};
use futures::{SinkExt, StreamExt};
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, info, warn};

use crate::state::{AppState, ReadingEvent};

/// Create the WebSocket router.
pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/api/ws", get(ws_handler))
}

async fn ws_handler(ws: WebSocketUpgrade, State(state): State<Arc<AppState>>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// Latest stored reading of every known device, as events.
async fn snapshot(state: &AppState) -> Vec<ReadingEvent> {
    let store = state.store.lock().await;
    let devices = match store.list_devices() {
        Ok(devices) => devices,
        Err(e) => {
            warn!("Failed to list devices for snapshot: {}", e);
            return Vec::new();
        }
    };

    devices
        .into_iter()
        .filter_map(|device| match store.get_latest_reading(&device.id) {
            Ok(reading) => reading.map(|reading| ReadingEvent {
                device_id: device.id,
                reading,
            }),
            Err(e) => {
                warn!(device_id = %device.id, "Failed to load latest reading: {}", e);
                None
            }
        })
        .collect()
}

async fn handle_socket(socket: WebSocket, state: Arc<AppState>) {
    let (mut sender, mut receiver) = socket.split();

    // Subscribe before the snapshot so nothing ingested meanwhile is missed
    let mut rx = state.readings_tx.subscribe();

    info!("WebSocket client connected");

    for event in snapshot(&state).await {
        let Ok(json) = serde_json::to_string(&event) else {
            continue;
        };
        if sender.send(Message::Text(json.into())).await.is_err() {
            info!("WebSocket client disconnected during initial snapshot");
            return;
        }
    }

    debug!("Sent initial snapshot to WebSocket client");

    let mut send_task = tokio::spawn(async move {
        loop {
            let event = match rx.recv().await {
                Ok(event) => event,
                Err(RecvError::Lagged(n)) => {
                    warn!("WebSocket client lagged, dropped {} readings", n);
                    continue;
                }
                Err(RecvError::Closed) => break,
            };

            let json = match serde_json::to_string(&event) {
                Ok(j) => j,
                Err(e) => {
                    warn!("Failed to serialize event: {}", e);
                    continue;
                }
            };

            if sender.send(Message::Text(json.into())).await.is_err() {
                break;
            }
        }
    });

    // Clients only send close frames and pings; axum answers pings itself
    let mut recv_task = tokio::spawn(async move {
        while let Some(result) = receiver.next().await {
            match result {
                Ok(Message::Close(_)) => break,
                Ok(_) => {}
                Err(e) => {
                    warn!("WebSocket receive error: {}", e);
                    break;
                }
            }
        }
    });

    tokio::select! {
        _ = &mut send_task => {
            recv_task.abort();
        },
        _ = &mut recv_task => {
            send_task.abort();
        },
    }

    info!("WebSocket client disconnected");
}

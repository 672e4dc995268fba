use axum::extract::ws::{Message, WebSocket};
use axum::extract::{State, WebSocketUpgrade};
use axum::response::Response;
use axum::Json;
use futures_util::{SinkExt, StreamExt};
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, info, warn};

use backend_application::queries::admin_queries;
use backend_application::AppState;
use backend_domain::{AdminFeedMessage, AdminStats};

pub async fn admin_stats(State(state): State<AppState>) -> Json<AdminStats> {
    Json(admin_queries::admin_stats(&state).await)
}

pub async fn admin_feed(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| handle_feed_socket(socket, state))
}

/// Sends a snapshot, then forwards hub messages until the client leaves or the server stops.
async fn handle_feed_socket(socket: WebSocket, state: AppState) {
    let (mut sender, mut receiver) = socket.split();
    // Subscribe before the snapshot so nothing published in between is lost.
    let mut feed = state.scan_feed.subscribe();
    let mut shutdown = state.shutdown.clone();
    if *shutdown.borrow_and_update() {
        return;
    }

    let snapshot = AdminFeedMessage::Snapshot {
        stats: admin_queries::admin_stats(&state).await,
    };
    if send_json(&mut sender, &snapshot).await.is_err() {
        return;
    }
    info!("admin feed subscriber attached");

    loop {
        tokio::select! {
            message = feed.recv() => match message {
                Ok(message) => {
                    if send_json(&mut sender, &message).await.is_err() {
                        break;
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    warn!("admin feed subscriber lagged, dropped {} messages", skipped);
                }
                Err(RecvError::Closed) => break,
            },
            incoming = receiver.next() => match incoming {
                Some(Ok(Message::Close(_))) | None | Some(Err(_)) => break,
                Some(Ok(_)) => {}
            },
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    let _ = sender.send(Message::Close(None)).await;
                    break;
                }
            }
        }
    }
    debug!("admin feed subscriber detached");
}

async fn send_json<S>(sender: &mut S, message: &AdminFeedMessage) -> Result<(), ()>
where
    S: futures_util::Sink<Message> + Unpin,
{
    let text = serde_json::to_string(message).map_err(|_| ())?;
    sender.send(Message::Text(text)).await.map_err(|_| ())
}

// src/handlers/notifications.rs

use std::collections::HashMap;

use axum::{
    extract::{
        Query, State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::Response,
};
use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use tokio::{sync::mpsc, task::JoinHandle};

use crate::{
    error::AppError,
    models::content::parse_room,
    realtime::NotificationHub,
    state::AppState,
    utils::jwt::verify_jwt,
};

/// Browsers cannot set headers on a WebSocket handshake, so the JWT rides
/// in the query string.
#[derive(Debug, Deserialize)]
pub struct WsParams {
    pub token: String,
}

/// A client frame: join or leave a content room.
#[derive(Debug, Deserialize)]
struct ClientCommand {
    action: String,
    room: String,
}

/// Upgrades to the notifications socket. Auth happens before the upgrade;
/// a bad token never gets a connection.
pub async fn ws_notifications(
    State(state): State<AppState>,
    Query(params): Query<WsParams>,
    ws: WebSocketUpgrade,
) -> Result<Response, AppError> {
    let claims = verify_jwt(&params.token, &state.config.jwt_secret)?;
    let hub = state.hub.clone();

    tracing::debug!("Notification socket opened by user {}", claims.sub);

    Ok(ws.on_upgrade(move |socket| handle_socket(socket, hub)))
}

/// Per-connection loop.
///
/// Outbound frames funnel through one mpsc channel; each joined room gets a
/// forwarder task that copies broadcast events into it. Leaving a room
/// aborts its forwarder, and a lagging room drops events rather than the
/// connection.
async fn handle_socket(socket: WebSocket, hub: NotificationHub) {
    let (mut sink, mut stream) = socket.split();
    let (tx, mut rx) = mpsc::channel::<String>(64);

    let send_task: JoinHandle<()> = tokio::spawn(async move {
        while let Some(frame) = rx.recv().await {
            if sink.send(Message::Text(frame.into())).await.is_err() {
                break;
            }
        }
    });

    let mut joined: HashMap<String, JoinHandle<()>> = HashMap::new();

    while let Some(Ok(msg)) = stream.next().await {
        let text = match msg {
            Message::Text(text) => text,
            Message::Close(_) => break,
            _ => continue,
        };

        let command: ClientCommand = match serde_json::from_str(&text) {
            Ok(command) => command,
            Err(_) => {
                send_error(&tx, "Malformed command").await;
                continue;
            }
        };

        if parse_room(&command.room).is_none() {
            send_error(&tx, &format!("Unknown room '{}'", command.room)).await;
            continue;
        }

        match command.action.as_str() {
            "join" => {
                if joined.contains_key(&command.room) {
                    continue;
                }
                let mut events = hub.subscribe(&command.room).await;
                let forward_tx = tx.clone();
                let handle = tokio::spawn(async move {
                    loop {
                        match events.recv().await {
                            Ok(event) => {
                                let Ok(frame) = serde_json::to_string(&event) else {
                                    continue;
                                };
                                if forward_tx.send(frame).await.is_err() {
                                    break;
                                }
                            }
                            // Slow consumer: skip what was missed, stay attached.
                            Err(tokio::sync::broadcast::error::RecvError::Lagged(_)) => continue,
                            Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
                        }
                    }
                });
                joined.insert(command.room, handle);
            }
            "leave" => {
                if let Some(handle) = joined.remove(&command.room) {
                    handle.abort();
                }
            }
            other => {
                send_error(&tx, &format!("Unknown action '{}'", other)).await;
            }
        }
    }

    for (_, handle) in joined {
        handle.abort();
    }
    send_task.abort();
}

async fn send_error(tx: &mpsc::Sender<String>, message: &str) {
    let frame = serde_json::json!({ "event": "error", "message": message }).to_string();
    let _ = tx.send(frame).await;
}

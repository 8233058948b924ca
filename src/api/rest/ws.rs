use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Path, State};
use axum::response::IntoResponse;
use futures::SinkExt;
use futures::StreamExt;
use tracing::{info, warn};
use uuid::Uuid;

use crate::engine::session::SessionCommand;
use crate::error::AppError;
use crate::models::geo::LocationFix;
use crate::state::AppState;

/// Live channel for one navigation session: snapshots flow out, location
/// fixes flow in. Unknown sessions are rejected before the upgrade.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    Path(id): Path<Uuid>,
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, AppError> {
    let cmd_tx = state
        .sessions
        .get(&id)
        .map(|handle| handle.cmd_tx.clone())
        .ok_or_else(|| AppError::NotFound(format!("session {} not found", id)))?;

    Ok(ws.on_upgrade(move |socket| handle_socket(socket, state, id, cmd_tx)))
}

async fn handle_socket(
    socket: WebSocket,
    state: Arc<AppState>,
    id: Uuid,
    cmd_tx: tokio::sync::mpsc::Sender<SessionCommand>,
) {
    let (mut sender, mut receiver) = socket.split();
    let mut events = state.nav_events_tx.subscribe();

    info!(session_id = %id, "navigation websocket connected");

    // Latest snapshot first so a reconnecting client can render immediately.
    let latest = state.snapshots.get(&id).map(|entry| entry.value().clone());
    if let Some(snapshot) = latest {
        if let Ok(json) = serde_json::to_string(&snapshot) {
            if sender.send(Message::Text(json.into())).await.is_err() {
                return;
            }
        }
    }

    let send_task = tokio::spawn(async move {
        while let Ok(snapshot) = events.recv().await {
            if snapshot.session_id != id {
                continue;
            }

            let json = match serde_json::to_string(&snapshot) {
                Ok(json) => json,
                Err(err) => {
                    warn!(error = %err, "failed to serialize snapshot for ws");
                    continue;
                }
            };

            if sender.send(Message::Text(json.into())).await.is_err() {
                break;
            }
        }
    });

    let recv_task = tokio::spawn(async move {
        while let Some(Ok(message)) = receiver.next().await {
            let Message::Text(text) = message else {
                continue;
            };

            match serde_json::from_str::<LocationFix>(&text) {
                Ok(fix) => {
                    if cmd_tx.send(SessionCommand::Fix(fix)).await.is_err() {
                        break;
                    }
                }
                Err(err) => warn!(error = %err, "ignoring malformed location fix"),
            }
        }
    });

    tokio::select! {
        _ = send_task => {},
        _ = recv_task => {},
    }

    info!(session_id = %id, "navigation websocket disconnected");
}

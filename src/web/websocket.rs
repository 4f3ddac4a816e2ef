//! Live-update WebSocket channel.
//!
//! One persistent connection per subscriber. The server pushes serialized
//! `LiveUpdate` messages; the channel is receive-only from the client's
//! perspective, so incoming frames are drained and ignored apart from close.

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::Response,
};
use futures::{SinkExt, StreamExt};
use tracing::debug;

use super::AppState;

pub async fn avatar_positions_ws(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| handle_subscriber(socket, state))
}

async fn handle_subscriber(socket: WebSocket, state: AppState) {
    let (id, mut rx) = state.broadcaster.subscribe().await;

    // New joiners see current state without waiting for the next ingestion
    state.pipeline.replay_latest_to(id).await;

    let (mut ws_write, mut ws_read) = socket.split();

    let mut read_task = tokio::spawn(async move {
        while let Some(frame) = ws_read.next().await {
            match frame {
                Ok(Message::Close(_)) => break,
                Err(e) => {
                    debug!("Subscriber read error: {}", e);
                    break;
                }
                _ => {}
            }
        }
    });

    loop {
        tokio::select! {
            maybe_message = rx.recv() => {
                match maybe_message {
                    Some(message) => {
                        if let Err(e) = ws_write.send(Message::Text(message)).await {
                            debug!("Subscriber {} write error: {}", id, e);
                            break;
                        }
                    }
                    None => break,
                }
            }
            _ = &mut read_task => break,
        }
    }

    state.broadcaster.unsubscribe(id).await;
}

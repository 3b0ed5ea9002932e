//! Observer WebSocket: every validated upstream frame goes out as one text
//! message. Inbound messages are read and discarded; a close frame or a
//! failed send ends the session.

use std::sync::Arc;

use axum::extract::ws::{Message, Utf8Bytes, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use futures::{SinkExt, StreamExt};
use tokio::sync::{mpsc, watch};
use tracing::{debug, info};

use strider_relay::Frame;

use crate::state::AppState;

pub async fn ws_upgrade(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_ws(socket, state))
}

async fn handle_ws(socket: WebSocket, state: Arc<AppState>) {
    let (mut sender, mut receiver) = socket.split();
    let (tx, mut rx) = mpsc::unbounded_channel::<Frame>();
    let subscription = state.relay.subscribe(tx);
    let id = subscription.id();
    let mut shutdown = state.shutdown.clone();
    info!(subscriber = %id, "observer connected");

    // Drain this observer's frames into the socket.
    let mut send_task = tokio::spawn(async move {
        while let Some(frame) = rx.recv().await {
            let Some(message) = text_message(frame) else { continue };
            if sender.send(message).await.is_err() {
                break;
            }
        }
    });

    // Consume incoming messages (pings, close frames) but ignore content.
    let mut recv_task = tokio::spawn(async move {
        while let Some(Ok(msg)) = receiver.next().await {
            if matches!(msg, Message::Close(_)) {
                break;
            }
        }
    });

    tokio::select! {
        _ = &mut send_task => recv_task.abort(),
        _ = &mut recv_task => send_task.abort(),
        _ = shutdown_signalled(&mut shutdown) => {
            debug!(subscriber = %id, "closing observer for shutdown");
            send_task.abort();
            recv_task.abort();
        }
    }

    drop(subscription);
    info!(subscriber = %id, "observer disconnected");
}

/// Text message sharing the frame's buffer. `None` for non-UTF-8 bytes,
/// which validated frames never are.
fn text_message(frame: Frame) -> Option<Message> {
    Utf8Bytes::try_from(frame.into_bytes()).ok().map(Message::Text)
}

/// Resolves once the flag turns true. Never resolves if the sender is gone.
async fn shutdown_signalled(shutdown: &mut watch::Receiver<bool>) {
    if shutdown.wait_for(|stop| *stop).await.is_err() {
        std::future::pending::<()>().await;
    }
}

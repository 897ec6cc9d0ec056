use axum::extract::ws::{CloseFrame, Message, WebSocket};
use futures_util::stream::SplitSink;
use futures_util::{SinkExt, StreamExt};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::{interval, timeout};

use crate::chat::Caller;
use crate::state::AppState;
use crate::ws::protocol::{self, ServerEvent};
use crate::ws::ConnectionHandle;

/// Server-side keepalive for a WebSocket connection.
#[derive(Debug, Clone, Copy)]
pub struct Heartbeat {
    /// Time between server pings
    pub interval: Duration,
    /// Time allowed for the pong after each ping
    pub pong_timeout: Duration,
}

/// Run the actor-per-connection pattern for an authenticated WebSocket.
///
/// - Writer task: owns the sink, serializes hub events from the connection
///   handle and forwards control frames (ping/pong/close)
/// - Ping task: sends periodic pings and ends on a missed pong
/// - Reader loop: decodes client commands and dispatches them to the hub;
///   it stops when the client goes away or the ping task ends
///
/// Other parts of the system reach this client through its
/// `ConnectionHandle` in the registry.
pub async fn run_connection(socket: WebSocket, state: AppState, user_id: String) {
    let (ws_sender, mut ws_receiver) = socket.split();
    let (handle, events_rx) = ConnectionHandle::channel();
    let (control_tx, control_rx) = mpsc::unbounded_channel::<Message>();
    let connection_id = handle.id();

    let writer_handle = tokio::spawn(writer_task(ws_sender, events_rx, control_rx));

    state.hub.connect(&user_id, handle.clone()).await;
    let caller = Caller::new(user_id.clone(), Some(handle));

    tracing::info!(
        user_id = %user_id,
        connection_id = %connection_id,
        "WebSocket actor started"
    );

    let (pong_tx, mut pong_rx) = mpsc::unbounded_channel::<()>();

    let ping_tx = control_tx.clone();
    let heartbeat = state.heartbeat;
    let mut ping_handle = tokio::spawn(async move {
        let mut ping_timer = interval(heartbeat.interval);
        // Skip the first immediate tick
        ping_timer.tick().await;

        loop {
            ping_timer.tick().await;

            if ping_tx.send(Message::Ping(vec![1, 2, 3, 4].into())).is_err() {
                break;
            }

            match timeout(heartbeat.pong_timeout, pong_rx.recv()).await {
                Ok(Some(())) => {}
                _ => {
                    let _ = ping_tx.send(Message::Close(Some(CloseFrame {
                        code: 1001,
                        reason: "Pong timeout".into(),
                    })));
                    break;
                }
            }
        }
    });

    loop {
        let next = tokio::select! {
            next = ws_receiver.next() => next,
            _ = &mut ping_handle => {
                tracing::warn!(user_id = %user_id, "Pong timeout, dropping connection");
                break;
            }
        };

        match next {
            Some(Ok(msg)) => match msg {
                Message::Text(text) => {
                    protocol::handle_text_message(text.as_str(), &caller, &state.hub).await;
                }
                Message::Binary(_) => {
                    tracing::debug!(user_id = %user_id, "Ignoring binary frame");
                    caller.reply(ServerEvent::Error {
                        request_id: None,
                        code: 400,
                        message: "Binary frames are not supported".to_string(),
                    });
                }
                Message::Pong(_) => {
                    let _ = pong_tx.send(());
                }
                Message::Ping(data) => {
                    let _ = control_tx.send(Message::Pong(data));
                }
                Message::Close(frame) => {
                    tracing::info!(
                        user_id = %user_id,
                        reason = ?frame,
                        "Client initiated close"
                    );
                    break;
                }
            },
            Some(Err(e)) => {
                tracing::warn!(
                    user_id = %user_id,
                    error = %e,
                    "WebSocket receive error"
                );
                break;
            }
            None => {
                tracing::info!(user_id = %user_id, "WebSocket stream ended");
                break;
            }
        }
    }

    writer_handle.abort();
    ping_handle.abort();

    let was_current = state.hub.disconnect(&user_id, connection_id).await;

    tracing::info!(
        user_id = %user_id,
        connection_id = %connection_id,
        was_current,
        "WebSocket actor stopped"
    );
}

/// Writer task: serializes hub events and forwards control frames to the
/// WebSocket sink until either channel closes or the sink fails.
async fn writer_task(
    mut ws_sender: SplitSink<WebSocket, Message>,
    mut events_rx: mpsc::UnboundedReceiver<ServerEvent>,
    mut control_rx: mpsc::UnboundedReceiver<Message>,
) {
    loop {
        let msg = tokio::select! {
            Some(event) = events_rx.recv() => match serde_json::to_string(&event) {
                Ok(json) => Message::Text(json.into()),
                Err(e) => {
                    tracing::error!(error = %e, "Failed to encode server event");
                    continue;
                }
            },
            Some(control) = control_rx.recv() => control,
            else => break,
        };

        if ws_sender.send(msg).await.is_err() {
            break;
        }
    }
}

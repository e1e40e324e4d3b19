//! WebSocket transport for a bridge session.
//!
//! The socket is split: a writer task drains the connection's [`Outbound`]
//! queue into frames while this task feeds inbound frames to the session.

use axum::extract::ws::{Message, WebSocket};
use futures_util::{stream::SplitSink, SinkExt, StreamExt};
use tokio::sync::mpsc;
use tracing::{debug, info};

use super::handlers::AppState;
use crate::bridge::{ConnectionHandle, ConnectionId, Outbound};

/// Serve one upgraded connection until either side goes away.
pub async fn handle_socket(socket: WebSocket, state: AppState) {
    let (conn, outbound) = ConnectionHandle::new(ConnectionId::new());
    let id = conn.id();
    info!(conn = %id, "client connected");

    let (sink, mut stream) = socket.split();
    let writer = tokio::spawn(write_outbound(sink, outbound, id));

    let session = state.bridge.session(conn);
    if let Err(e) = session.on_open().await {
        debug!(conn = %id, "session did not start: {}", e);
    }

    while let Some(frame) = stream.next().await {
        match frame {
            Ok(Message::Binary(bytes)) => session.on_message(&bytes).await,
            Ok(Message::Text(text)) => session.on_message(text.as_str().as_bytes()).await,
            Ok(Message::Close(_)) => break,
            // Ping/pong are answered by the transport
            Ok(_) => {}
            Err(e) => session.on_error(e),
        }
    }

    session.on_close();
    drop(session);

    if let Err(e) = writer.await {
        debug!(conn = %id, "writer task failed: {}", e);
    }
    info!(conn = %id, "client disconnected");
}

async fn write_outbound(
    mut sink: SplitSink<WebSocket, Message>,
    mut rx: mpsc::UnboundedReceiver<Outbound>,
    id: ConnectionId,
) {
    while let Some(item) = rx.recv().await {
        match item {
            Outbound::Text(text) => {
                if sink.send(Message::Text(text.into())).await.is_err() {
                    debug!(conn = %id, "socket gone, dropping output");
                    break;
                }
            }
            Outbound::Close => {
                let _ = sink.send(Message::Close(None)).await;
                break;
            }
        }
    }
    let _ = sink.close().await;
}

//! WebSocket trace channel.
//!
//! GET /websockets?trace_id=...
//!
//! Binds the socket to a trace id in the [`TraceRegistry`]. Log lines for
//! that trace arrive as JSON text frames; the socket is closed when the job
//! ends. A socket opened without a trace id is closed straight away.
//!
//! [`TraceRegistry`]: crate::kernel::TraceRegistry

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Extension, Query,
    },
    response::Response,
};
use serde::Deserialize;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::kernel::{ChannelMessage, TraceRegistry};
use crate::server::app::AxumAppState;

#[derive(Deserialize)]
pub struct StreamQuery {
    trace_id: Option<String>,
}

pub async fn websocket_handler(
    ws: WebSocketUpgrade,
    Extension(state): Extension<AxumAppState>,
    Query(query): Query<StreamQuery>,
) -> Response {
    let traces = state.server_deps.traces.clone();
    ws.on_upgrade(move |socket| handle_socket(socket, traces, query.trace_id))
}

async fn handle_socket(mut socket: WebSocket, traces: TraceRegistry, trace_id: Option<String>) {
    let Some(trace_id) = trace_id.filter(|id| !id.is_empty()) else {
        warn!("Channel opened without a trace id, closing");
        let _ = socket.send(Message::Close(None)).await;
        return;
    };

    let (tx, mut rx) = mpsc::unbounded_channel();
    traces.register(&trace_id, &tx);

    loop {
        tokio::select! {
            message = rx.recv() => match message {
                Some(ChannelMessage::Event(line)) => {
                    if socket.send(Message::Text(line.to_string())).await.is_err() {
                        break;
                    }
                }
                Some(ChannelMessage::Close) | None => {
                    let _ = socket.send(Message::Close(None)).await;
                    break;
                }
            },
            incoming = socket.recv() => match incoming {
                Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                // Client frames carry nothing
                Some(Ok(_)) => {}
            },
        }
    }

    debug!(trace_id = %trace_id, "Channel disconnected");
    traces.unregister(&trace_id, &tx);
    traces.cleanup();
}

//! WebSocket upgrade handler.

use axum::extract::WebSocketUpgrade;
use axum::extract::ws::WebSocket;
use axum::response::Response;
use bytes::Bytes;
use futures::{StreamExt, SinkExt, future};
use tracing::info;

use crate::state::AppState;
use crate::wire;

/// Upgrades the request and attaches the socket to `tag` on the relay.
pub fn upgrade(state: AppState, tag: String, ws: WebSocketUpgrade) -> Response {
    ws.on_upgrade(move |socket| handle_socket(state, tag, socket))
}

/// Drives an established socket as one relay session.
async fn handle_socket(state: AppState, tag: String, socket: WebSocket) {
    let format = state.relay.config().frame_format;
    let (ws_tx, ws_rx) = socket.split();

    let stream = ws_rx.filter_map(|msg| future::ready(wire::inbound_frame(msg)));
    let sink = ws_tx.with(move |data: Bytes| {
        future::ready(Ok::<_, axum::Error>(wire::outbound_message(data, format)))
    });

    info!(tag = %tag, "WebSocket connection established");
    state.relay.attach(&tag, stream, sink).await;
    info!(tag = %tag, "WebSocket connection closed");
}

//! Live canvas WebSocket handler
//!
//! Every text frame from the client is a draw request. Every accepted write,
//! from this client or any other, comes back as a change message text frame.

use crate::api::AppState;
use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::IntoResponse,
};
use futures::{Sink, SinkExt, Stream, StreamExt};
use heximage_core::{DrawGateway, Subscription};
use std::fmt;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Pongs waiting for the writer task
const PONG_BUFFER: usize = 8;

/// WebSocket upgrade handler
pub async fn live_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// Handle WebSocket connection
async fn handle_socket(socket: WebSocket, state: Arc<AppState>) {
    let (sink, stream) = socket.split();
    serve_connection(sink, stream, state).await;
}

/// Run one live connection until either side ends it. The subscription is
/// dropped, and so leaves the hub, before this returns.
async fn serve_connection<K, S, E>(sink: K, stream: S, state: Arc<AppState>)
where
    K: Sink<Message> + Unpin + Send + 'static,
    S: Stream<Item = Result<Message, E>> + Unpin,
    E: fmt::Display,
{
    let subscription = state.hub.join();
    let subscriber_id = subscription.id();
    info!(subscriber_id = %subscriber_id, "Live canvas connection established");

    let (pong_tx, pong_rx) = mpsc::channel(PONG_BUFFER);
    let mut writer = tokio::spawn(write_changes(sink, subscription, pong_rx));

    let writer_done = tokio::select! {
        _ = &mut writer => {
            debug!(subscriber_id = %subscriber_id, "Writer finished first");
            true
        }
        _ = read_draws(stream, &state.gateway, pong_tx) => false,
    };

    if !writer_done {
        writer.abort();
        let _ = writer.await;
    }
    info!(subscriber_id = %subscriber_id, "Live canvas connection ended");
}

/// Forward hub messages and pongs to the client
async fn write_changes<K>(
    mut sink: K,
    mut subscription: Subscription,
    mut pongs: mpsc::Receiver<Vec<u8>>,
) where
    K: Sink<Message> + Unpin,
{
    loop {
        let frame = tokio::select! {
            message = subscription.recv() => match message {
                Some(message) => Message::Text(message.as_str().to_string()),
                None => {
                    debug!(subscriber_id = %subscription.id(), "Dropped by hub, closing");
                    let _ = sink.send(Message::Close(None)).await;
                    return;
                }
            },
            Some(data) = pongs.recv() => Message::Pong(data),
        };

        if sink.send(frame).await.is_err() {
            return;
        }
    }
}

/// Apply draw requests from the client until it goes away
async fn read_draws<S, E>(mut stream: S, gateway: &DrawGateway, pongs: mpsc::Sender<Vec<u8>>)
where
    S: Stream<Item = Result<Message, E>> + Unpin,
    E: fmt::Display,
{
    while let Some(msg) = stream.next().await {
        match msg {
            Ok(Message::Text(text)) => match gateway.handle_draw_json(&text).await {
                Ok(outcome) => {
                    debug!(pixel = %outcome.pixel, published = outcome.published, "Live draw")
                }
                Err(e) => warn!(code = e.code(), error = %e, "Rejected live draw"),
            },
            Ok(Message::Ping(data)) => {
                if pongs.try_send(data).is_err() {
                    debug!("Pong queue full, skipping");
                }
            }
            Ok(Message::Close(_)) => break,
            Err(e) => {
                debug!("WebSocket read error: {}", e);
                break;
            }
            _ => {}
        }
    }
}

//! WebSocket endpoint for dashboard connections.
//!
//! Each connection registers with the channel registry on upgrade and starts
//! unsubscribed; the dashboard sends `{"event":"join-channel","data":<name>}`
//! to pick its channel. Membership is transient: a reconnecting dashboard
//! must re-join explicitly.

use std::sync::Arc;

use futures_util::{SinkExt, StreamExt};
use log::{debug, info, warn};
use tokio::sync::mpsc;
use warp::ws::{Message, WebSocket, Ws};
use warp::{Filter, Rejection, Reply};

use crate::realtime::events::ClientMessage;
use crate::realtime::registry::ChannelRegistry;

/// GET /ws
pub fn ws_route(
    registry: Arc<ChannelRegistry>,
) -> impl Filter<Extract = impl Reply, Error = Rejection> + Clone {
    warp::path("ws")
        .and(warp::path::end())
        .and(warp::ws())
        .map(move |ws: Ws| {
            let registry = registry.clone();
            ws.on_upgrade(move |socket| handle_connection(socket, registry))
        })
}

async fn handle_connection(socket: WebSocket, registry: Arc<ChannelRegistry>) {
    let (mut sink, mut stream) = socket.split();

    // Registry hands us serialized frames; an unbounded buffer decouples
    // fan-out from slow sockets (backpressure is an external concern here).
    let (tx, mut rx) = mpsc::unbounded_channel::<String>();
    let id = registry.connect(tx);
    info!("dashboard connection {} established", id);

    let forward = tokio::spawn(async move {
        while let Some(frame) = rx.recv().await {
            if sink.send(Message::text(frame)).await.is_err() {
                break;
            }
        }
    });

    while let Some(result) = stream.next().await {
        let message = match result {
            Ok(message) => message,
            Err(e) => {
                debug!("connection {} read error: {}", id, e);
                break;
            }
        };
        if message.is_close() {
            break;
        }
        let Ok(text) = message.to_str() else {
            continue;
        };
        match serde_json::from_str::<ClientMessage>(text) {
            Ok(ClientMessage::JoinChannel(channel)) => {
                registry.join(id, &channel);
            }
            Err(_) => {
                warn!("connection {} sent an unrecognized message", id);
            }
        }
    }

    registry.disconnect(id);
    forward.abort();
    info!("dashboard connection {} closed", id);
}

//! Bidirectional forwarding loop for `/ws/snapshots/{match_id}`: the
//! client-facing axum socket on one side, the real engine node's
//! websocket on the other. Modeled on the sink/stream split-and-forward
//! loop used for proxied websocket traffic elsewhere in the corpus.

use axum::extract::ws::{Message as AxumMessage, WebSocket};
use futures_util::{SinkExt, StreamExt};
use tokio_tungstenite::tungstenite::Message as TungsteniteMessage;
use tracing::warn;

pub async fn bridge(client_socket: WebSocket, upstream_url: String) {
    let upstream = match tokio_tungstenite::connect_async(&upstream_url).await {
        Ok((stream, _response)) => stream,
        Err(e) => {
            warn!(url = %upstream_url, error = %e, "failed to connect to upstream snapshot websocket");
            return;
        }
    };

    let (mut client_sink, mut client_stream) = client_socket.split();
    let (mut upstream_sink, mut upstream_stream) = upstream.split();

    let client_to_upstream = async {
        while let Some(Ok(msg)) = client_stream.next().await {
            let forwarded = match msg {
                AxumMessage::Text(t) => TungsteniteMessage::Text(t.as_str().into()),
                AxumMessage::Binary(b) => TungsteniteMessage::Binary(b.to_vec()),
                AxumMessage::Ping(p) => TungsteniteMessage::Ping(p.to_vec()),
                AxumMessage::Pong(p) => TungsteniteMessage::Pong(p.to_vec()),
                AxumMessage::Close(_) => break,
            };
            if upstream_sink.send(forwarded).await.is_err() {
                break;
            }
        }
    };

    let upstream_to_client = async {
        while let Some(Ok(msg)) = upstream_stream.next().await {
            let forwarded = match msg {
                TungsteniteMessage::Text(t) => AxumMessage::Text(t.as_str().into()),
                TungsteniteMessage::Binary(b) => AxumMessage::Binary(b.into()),
                TungsteniteMessage::Ping(p) => AxumMessage::Ping(p.into()),
                TungsteniteMessage::Pong(p) => AxumMessage::Pong(p.into()),
                TungsteniteMessage::Close(_) => break,
                TungsteniteMessage::Frame(_) => continue,
            };
            if client_sink.send(forwarded).await.is_err() {
                break;
            }
        }
    };

    tokio::select! {
        _ = client_to_upstream => {}
        _ = upstream_to_client => {}
    }
}

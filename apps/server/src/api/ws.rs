//! WebSocket endpoint for sync progress.
//!
//! Adapts axum's socket to the hub's transport-agnostic frames. The upgrade
//! is always accepted; a caller without valid credentials is closed by the
//! hub with code 4401 so the client can tell it apart from a network error.

use std::sync::Arc;

use axum::{
    extract::{
        ws::{CloseFrame, Message, WebSocket, WebSocketUpgrade},
        Query, State,
    },
    http::HeaderMap,
    response::Response,
    routing::get,
    Router,
};
use futures::{future, SinkExt, StreamExt};
use matchsync_realtime::{CloseReason, WsFrame};
use serde::Deserialize;

use crate::{
    auth::{bearer_token, resolve_user},
    main_lib::AppState,
};

/// Largest message or frame the socket buffers before handing it to the hub.
/// Twice the hub's own limit; messages between the two get the hub's 1009.
fn transport_limit(max_message_bytes: usize) -> usize {
    max_message_bytes.saturating_mul(2)
}

#[derive(Debug, Deserialize)]
struct WsParams {
    token: Option<String>,
}

fn to_message(frame: WsFrame) -> Message {
    match frame {
        WsFrame::Text { data, .. } => Message::Text(data.into()),
        WsFrame::Binary(data) => Message::Binary(data.into()),
        WsFrame::Ping(data) => Message::Ping(data.into()),
        WsFrame::Pong(data) => Message::Pong(data.into()),
        WsFrame::Close(reason) => Message::Close(reason.map(|r| CloseFrame {
            code: r.code,
            reason: r.reason.into(),
        })),
    }
}

/// axum hands over complete messages, so text is never fragmented here.
fn to_frame(message: Message) -> WsFrame {
    match message {
        Message::Text(text) => WsFrame::text(text.as_str()),
        Message::Binary(data) => WsFrame::Binary(data.to_vec()),
        Message::Ping(data) => WsFrame::Ping(data.to_vec()),
        Message::Pong(data) => WsFrame::Pong(data.to_vec()),
        Message::Close(frame) => {
            WsFrame::Close(frame.map(|f| CloseReason::new(f.code, f.reason.as_str())))
        }
    }
}

async fn ws_handler(
    State(state): State<Arc<AppState>>,
    Query(params): Query<WsParams>,
    headers: HeaderMap,
    ws: WebSocketUpgrade,
) -> Response {
    let token = params.token.as_deref().or_else(|| bearer_token(&headers));
    let user_id = resolve_user(state.auth.as_ref(), token);
    let limit = transport_limit(state.hub.config().max_message_bytes);
    ws.max_message_size(limit)
        .max_frame_size(limit)
        .on_upgrade(move |socket| serve_socket(state, socket, user_id))
}

async fn serve_socket(state: Arc<AppState>, socket: WebSocket, user_id: Option<String>) {
    let (sink, stream) = socket.split();
    let sink = sink.with(|frame: WsFrame| future::ready(Ok::<_, axum::Error>(to_message(frame))));
    let stream = stream.map(|message| message.map(to_frame));
    state
        .hub
        .handle_connection(sink, stream, user_id, state.shutdown.child_token())
        .await;
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/ws", get(ws_handler))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_conversion() {
        match to_message(WsFrame::Close(Some(CloseReason::unauthenticated()))) {
            Message::Close(Some(frame)) => assert_eq!(frame.code, 4401),
            other => panic!("unexpected message {other:?}"),
        }
        assert_eq!(to_frame(Message::Text("hello".into())), WsFrame::text("hello"));
        assert_eq!(to_frame(Message::Close(None)), WsFrame::Close(None));
    }

    #[test]
    fn test_transport_limit_tracks_hub_limit() {
        let hub_limit = matchsync_realtime::HubConfig::default().max_message_bytes;
        let limit = transport_limit(hub_limit);
        assert!(limit > hub_limit);
        assert!(limit <= 16 * 1024);
        assert_eq!(transport_limit(usize::MAX), usize::MAX);
    }
}

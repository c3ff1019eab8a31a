//! The `/ws` upgrade handler: connection lifecycle, inbound frame parsing,
//! and outbound fan-out for one client socket. Follows a split-sink /
//! forwarding-task shape, adapted to a bidirectional socket with a dedicated
//! close-signal channel for connection supersession.

use std::sync::Arc;

use axum::extract::ws::{CloseFrame, Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Query, State};
use axum::response::Response;
use futures::{SinkExt, StreamExt};
use tracing::{debug, info, warn};

use crate::runtime::protocol::{unix_timestamp_millis, ClientMessage, ServerMessage};
use crate::runtime::{CommandError, RoomRuntime, CLOSE_SUPERSEDED};
use crate::store::RoomStore;

use super::dto::WsConnectQuery;

const LOG_TARGET: &str = "server::ws";
const CLOSE_MISSING_PARAMS: u16 = 1008;
const CLOSE_NORMAL: u16 = 1000;

pub async fn ws_handler<S: RoomStore + 'static>(
    State(runtime): State<Arc<RoomRuntime<S>>>,
    Query(query): Query<WsConnectQuery>,
    ws: WebSocketUpgrade,
) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, runtime, query))
}

async fn handle_socket<S: RoomStore + 'static>(
    socket: WebSocket,
    runtime: Arc<RoomRuntime<S>>,
    query: WsConnectQuery,
) {
    let (Some(room_id), Some(user_id), Some(username)) =
        (query.room_id, query.user_id, query.username)
    else {
        close_with(socket, CLOSE_MISSING_PARAMS, "roomId, userId and username are required").await;
        return;
    };

    let connection = match runtime.connect(&room_id, &user_id).await {
        Ok(connection) => connection,
        Err(err) => {
            let reason = match err {
                CommandError::NotFound(_) => "room not found".to_string(),
                other => other.to_string(),
            };
            close_with(socket, CLOSE_MISSING_PARAMS, &reason).await;
            return;
        }
    };

    let (mut sink, mut stream) = socket.split();
    let mut outbound = connection.receiver;
    let mut close_signal = connection.close_signal;
    let mut last_chat_at: Option<i64> = None;

    loop {
        tokio::select! {
            biased;

            closed = &mut close_signal => {
                let code = closed.unwrap_or(CLOSE_SUPERSEDED);
                let _ = sink
                    .send(Message::Close(Some(CloseFrame {
                        code,
                        reason: "superseded by a new connection".into(),
                    })))
                    .await;
                break;
            }

            outgoing = outbound.recv() => {
                match outgoing {
                    Some(message) => {
                        let terminator = matches!(
                            message,
                            ServerMessage::RoomClosed | ServerMessage::UserKicked { .. }
                        );
                        let Ok(text) = serde_json::to_string(&message) else {
                            continue;
                        };
                        if sink.send(Message::Text(text)).await.is_err() {
                            break;
                        }
                        if terminator {
                            let reason = if matches!(message, ServerMessage::RoomClosed) {
                                "Room closed by owner"
                            } else {
                                "Kicked"
                            };
                            let _ = sink
                                .send(Message::Close(Some(CloseFrame {
                                    code: CLOSE_NORMAL,
                                    reason: reason.into(),
                                })))
                                .await;
                            break;
                        }
                    }
                    None => break,
                }
            }

            incoming = stream.next() => {
                match incoming {
                    Some(Ok(Message::Text(text))) => {
                        handle_client_frame(&runtime, &room_id, &user_id, &username, &text, &mut last_chat_at).await;
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Err(err)) => {
                        warn!(target: LOG_TARGET, %room_id, %user_id, %err, "socket read error");
                        break;
                    }
                    _ => {}
                }
            }
        }
    }

    runtime.disconnect(&room_id, &user_id).await;
}

async fn handle_client_frame<S: RoomStore + 'static>(
    runtime: &RoomRuntime<S>,
    room_id: &str,
    user_id: &str,
    username: &str,
    text: &str,
    last_chat_at: &mut Option<i64>,
) {
    let Ok(client_message) = serde_json::from_str::<ClientMessage>(text) else {
        debug!(target: LOG_TARGET, %room_id, %user_id, "dropped malformed frame");
        return;
    };
    let room_id = room_id.to_string();
    let user_id = user_id.to_string();
    let now = unix_timestamp_millis();

    match client_message {
        ClientMessage::Chat { message } => {
            if let Some(previous) = *last_chat_at {
                if now - previous < runtime.chat_rate_limit_ms() {
                    runtime.send_error(&room_id, &user_id, "chat rate limit exceeded").await;
                    return;
                }
            }
            *last_chat_at = Some(now);
            if let Err(err) = runtime.handle_chat(&room_id, &user_id, username, &message, now).await {
                runtime.send_error(&room_id, &user_id, err.to_string()).await;
            }
        }
        ClientMessage::Action { action } => {
            if let Err(err) = runtime.handle_action(&room_id, &user_id, action, now).await {
                runtime.send_error(&room_id, &user_id, err.to_string()).await;
            }
        }
    }
}

async fn close_with(mut socket: WebSocket, code: u16, reason: &str) {
    let _ = socket
        .send(Message::Close(Some(CloseFrame {
            code,
            reason: reason.to_string().into(),
        })))
        .await;
    info!(target: LOG_TARGET, code, reason, "connection rejected before handshake completed");
}

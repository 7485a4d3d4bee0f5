pub mod handlers;

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Query, State,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
};
use futures::{sink::SinkExt, stream::StreamExt};
use serde::Deserialize;
use std::sync::Arc;
use tokio::sync::mpsc;

use crate::error::GameError;
use crate::protocol::{ClientMessage, ServerMessage, PROTOCOL_VERSION};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct WsQuery {
    pub user_id: Option<String>,
}

/// WebSocket upgrade handler
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    Query(params): Query<WsQuery>,
    State(state): State<Arc<AppState>>,
) -> Response {
    let Some(user_id) = params
        .user_id
        .map(|id| id.trim().to_string())
        .filter(|id| !id.is_empty())
    else {
        return (StatusCode::BAD_REQUEST, "user_id is required").into_response();
    };

    tracing::info!(user = %user_id, "WebSocket connection request");
    ws.on_upgrade(move |socket| handle_socket(socket, user_id, state))
}

async fn send_json(
    sender: &mut futures::stream::SplitSink<WebSocket, Message>,
    msg: &ServerMessage,
) -> bool {
    match serde_json::to_string(msg) {
        Ok(json) => sender.send(Message::Text(json.into())).await.is_ok(),
        Err(e) => {
            tracing::error!("Failed to serialize server message: {}", e);
            true
        }
    }
}

/// Handle individual WebSocket connection
async fn handle_socket(socket: WebSocket, user_id: String, state: Arc<AppState>) {
    let (mut sender, mut receiver) = socket.split();
    let (outbox_tx, mut outbox_rx) = mpsc::channel(state.config.outbox_capacity);
    let conn = state.connections.register(&user_id, outbox_tx).await;

    tracing::info!(user = %user_id, conn = %conn, "WebSocket connected");

    let welcome = ServerMessage::Welcome {
        protocol: PROTOCOL_VERSION.to_string(),
        user_id: user_id.clone(),
        server_now: chrono::Utc::now().to_rfc3339(),
    };
    if !send_json(&mut sender, &welcome).await {
        tracing::error!("Failed to send welcome message");
        handlers::handle_disconnect(&state, conn, &user_id).await;
        return;
    }

    loop {
        tokio::select! {
            // Room events queued for this connection
            queued = outbox_rx.recv() => {
                match queued {
                    Some(msg) => {
                        if !send_json(&mut sender, &msg).await {
                            break;
                        }
                    }
                    None => break,
                }
            }

            // Handle client messages
            ws_msg = receiver.next() => {
                match ws_msg {
                    Some(Ok(Message::Text(text))) => {
                        tracing::debug!(user = %user_id, "Received message: {}", text);

                        let reply = match serde_json::from_str::<ClientMessage>(&text) {
                            Ok(client_msg) => {
                                handlers::handle_message(&state, conn, &user_id, client_msg).await
                            }
                            Err(e) => {
                                tracing::debug!(user = %user_id, "Failed to parse client message: {}", e);
                                let err = GameError::Validation(format!("Invalid message format: {}", e));
                                Some(ServerMessage::error(&err))
                            }
                        };
                        if let Some(reply) = reply {
                            if !send_json(&mut sender, &reply).await {
                                tracing::error!("Failed to send response");
                                break;
                            }
                        }
                    }
                    Some(Ok(Message::Close(_))) => {
                        tracing::info!(user = %user_id, "WebSocket closed");
                        break;
                    }
                    Some(Ok(Message::Ping(data))) => {
                        if sender.send(Message::Pong(data)).await.is_err() {
                            break;
                        }
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        tracing::warn!(user = %user_id, "WebSocket error: {}", e);
                        break;
                    }
                    None => break,
                }
            }
        }
    }

    handlers::handle_disconnect(&state, conn, &user_id).await;
    tracing::info!(user = %user_id, conn = %conn, "WebSocket connection closed");
}

//! WebSocket upgrade handler

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::Response,
};
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::app::AppState;
use crate::game::error::GameError;
use crate::game::registry::RoomMessage;
use crate::util::rate_limit::ConnectionRateLimiter;
use crate::ws::protocol::{ClientMsg, ServerMsg};

/// Outbound queue depth per connection
const OUTBOUND_CAPACITY: usize = 64;

/// Work for a connection's writer task
#[derive(Debug)]
pub enum Outbound {
    /// Direct reply to this connection only
    Message(ServerMsg),
    /// Switch the connection over to a session room
    Subscribe(broadcast::Receiver<RoomMessage>),
}

/// WebSocket upgrade handler
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    let connection_id = Uuid::new_v4();
    debug!(connection_id = %connection_id, "WebSocket upgrade");
    ws.on_upgrade(move |socket| handle_socket(socket, connection_id, state))
}

/// Handle the upgraded WebSocket connection
async fn handle_socket(socket: WebSocket, connection_id: Uuid, state: AppState) {
    info!(connection_id = %connection_id, "New WebSocket connection");

    let (ws_sink, ws_stream) = socket.split();
    let (outbound_tx, outbound_rx) = mpsc::channel(OUTBOUND_CAPACITY);

    let writer_handle = tokio::spawn(run_writer(connection_id, ws_sink, outbound_rx));

    run_reader(connection_id, &state, ws_stream, outbound_tx).await;

    state.lobby.disconnect(connection_id);
    writer_handle.abort();

    info!(connection_id = %connection_id, "WebSocket connection closed");
}

/// Reader loop: WebSocket -> lobby / dispatcher
async fn run_reader(
    connection_id: Uuid,
    state: &AppState,
    mut ws_stream: SplitStream<WebSocket>,
    outbound: mpsc::Sender<Outbound>,
) {
    let rate_limiter = state
        .config
        .ws_message_rate_limit
        .map(ConnectionRateLimiter::new);

    while let Some(result) = ws_stream.next().await {
        match result {
            Ok(Message::Text(text)) => {
                if let Some(limiter) = &rate_limiter {
                    if !limiter.check() {
                        warn!(connection_id = %connection_id, "Rate limited client message");
                        continue;
                    }
                }

                let client_msg = match serde_json::from_str::<ClientMsg>(&text) {
                    Ok(msg) => msg,
                    Err(e) => {
                        warn!(connection_id = %connection_id, error = %e, "Failed to parse client message");
                        continue;
                    }
                };

                for out in handle_client_msg(state, connection_id, client_msg) {
                    if outbound.send(out).await.is_err() {
                        debug!(connection_id = %connection_id, "Writer gone");
                        return;
                    }
                }
            }
            Ok(Message::Binary(_)) => {
                warn!(connection_id = %connection_id, "Received binary message, ignoring");
            }
            Ok(Message::Ping(_)) | Ok(Message::Pong(_)) => {}
            Ok(Message::Close(_)) => {
                info!(connection_id = %connection_id, "Client initiated close");
                break;
            }
            Err(e) => {
                error!(connection_id = %connection_id, error = %e, "WebSocket error");
                break;
            }
        }
    }
}

/// Route one client message. Returns what must go back to this connection.
pub fn handle_client_msg(state: &AppState, connection_id: Uuid, msg: ClientMsg) -> Vec<Outbound> {
    match msg {
        ClientMsg::JoinSession {
            session_id,
            player_name,
            player_id,
        } => match state
            .lobby
            .join_connection(connection_id, &session_id, player_name, player_id)
        {
            Ok(joined) => {
                info!(
                    connection_id = %connection_id,
                    session_id = %session_id,
                    player_id = %joined.player_id,
                    "Player joined session"
                );
                vec![
                    Outbound::Message(joined.reply),
                    Outbound::Subscribe(joined.room),
                ]
            }
            Err(GameError::SessionNotFound(session_id)) => {
                vec![Outbound::Message(ServerMsg::SessionNotFound { session_id })]
            }
            Err(e) => vec![error_reply(e)],
        },
        ClientMsg::PlayerInput { session_id, input } => {
            match state.dispatcher.dispatch(&connection_id, &session_id, input) {
                Ok(()) => Vec::new(),
                Err(e) => {
                    debug!(connection_id = %connection_id, error = %e, "Input rejected");
                    vec![error_reply(e)]
                }
            }
        }
        ClientMsg::PlayerReady { session_id } => {
            match state.lobby.toggle_ready(connection_id, &session_id) {
                Ok(_) => Vec::new(),
                Err(e) => vec![error_reply(e)],
            }
        }
    }
}

fn error_reply(e: GameError) -> Outbound {
    Outbound::Message(ServerMsg::Error {
        message: e.to_string(),
    })
}

enum WriterEvent {
    Outbound(Option<Outbound>),
    Room(Result<RoomMessage, broadcast::error::RecvError>),
}

/// Writer task: direct replies and room broadcasts -> WebSocket
async fn run_writer(
    connection_id: Uuid,
    mut ws_sink: SplitSink<WebSocket, Message>,
    mut outbound: mpsc::Receiver<Outbound>,
) {
    let mut room: Option<broadcast::Receiver<RoomMessage>> = None;

    loop {
        let event = tokio::select! {
            out = outbound.recv() => WriterEvent::Outbound(out),
            received = recv_room(&mut room) => WriterEvent::Room(received),
        };

        match event {
            WriterEvent::Outbound(Some(Outbound::Message(msg))) => {
                if let Err(e) = send_msg(&mut ws_sink, &msg).await {
                    debug!(connection_id = %connection_id, error = %e, "WebSocket send failed");
                    break;
                }
            }
            WriterEvent::Outbound(Some(Outbound::Subscribe(rx))) => {
                room = Some(rx);
            }
            WriterEvent::Outbound(None) => break,
            WriterEvent::Room(Ok(room_msg)) => {
                if room_msg.except == Some(connection_id) {
                    continue;
                }
                if let Err(e) = send_msg(&mut ws_sink, &room_msg.msg).await {
                    debug!(connection_id = %connection_id, error = %e, "WebSocket send failed");
                    break;
                }
            }
            WriterEvent::Room(Err(broadcast::error::RecvError::Lagged(n))) => {
                // Snapshots are full state, the next one catches the client up
                warn!(
                    connection_id = %connection_id,
                    lagged_count = n,
                    "Client lagged, skipping {} messages", n
                );
            }
            WriterEvent::Room(Err(broadcast::error::RecvError::Closed)) => {
                debug!(connection_id = %connection_id, "Session room closed");
                room = None;
            }
        }
    }
}

async fn recv_room(
    room: &mut Option<broadcast::Receiver<RoomMessage>>,
) -> Result<RoomMessage, broadcast::error::RecvError> {
    match room {
        Some(rx) => rx.recv().await,
        None => std::future::pending().await,
    }
}

/// Send a message over WebSocket
async fn send_msg(sink: &mut SplitSink<WebSocket, Message>, msg: &ServerMsg) -> Result<(), String> {
    let json = serde_json::to_string(msg).map_err(|e| e.to_string())?;
    sink.send(Message::Text(json))
        .await
        .map_err(|e| e.to_string())
}

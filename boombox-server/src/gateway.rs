use std::time::Instant;

use axum::{
    extract::{
        ws::{Message, WebSocket},
        State, WebSocketUpgrade,
    },
    response::IntoResponse,
};
use boombox_core::{next_connection_id, ConnectionId, OutboundEvent, Recipients, Track};
use dashmap::DashMap;
use futures_util::{SinkExt, StreamExt};
use log::{info, warn};
use serde::Serialize;
use tokio::sync::mpsc;

use crate::{
    context::ServerContext,
    schemas::{Command, CommandParseError},
};

/// The transport adapter: owns the set of live gateway connections and fans
/// outbound coordinator events out to them.
#[derive(Default)]
pub struct Gateway {
    connections: DashMap<ConnectionId, Connection>,
}

struct Connection {
    sender: mpsc::UnboundedSender<String>,
}

/// Explicit per-connection state, passed to every command handler instead of
/// living in ambient globals.
struct Session {
    connection_id: ConnectionId,
}

/// Error replies go only to the issuing connection, never to the room.
#[derive(Debug, Serialize)]
struct ErrorReply<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    code: &'a str,
    message: &'a str,
}

impl Gateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Delivers a coordinator event to its resolved recipients. Connections
    /// that disappeared in the meantime are skipped.
    pub fn deliver(&self, event: OutboundEvent) {
        let payload = serde_json::to_string(&event.event).expect("serializes properly");

        match event.recipients {
            Recipients::Only(id) => self.send_to(id, &payload),
            Recipients::Some(ids) => {
                for id in ids {
                    self.send_to(id, &payload);
                }
            }
        }
    }

    pub fn send_error(&self, connection_id: ConnectionId, code: &str, message: &str) {
        let payload = serde_json::to_string(&ErrorReply {
            kind: "error",
            code,
            message,
        })
        .expect("serializes properly");

        self.send_to(connection_id, &payload);
    }

    fn register(&self, connection_id: ConnectionId, sender: mpsc::UnboundedSender<String>) {
        self.connections.insert(connection_id, Connection { sender });
    }

    fn unregister(&self, connection_id: ConnectionId) {
        self.connections.remove(&connection_id);
    }

    fn send_to(&self, connection_id: ConnectionId, payload: &str) {
        if let Some(connection) = self.connections.get(&connection_id) {
            // The connection may be mid-close, in which case the frame is lost
            // along with its recipient
            let _ = connection.sender.send(payload.to_string());
        }
    }
}

pub async fn ws_route(
    ws: WebSocketUpgrade,
    State(context): State<ServerContext>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, context))
}

async fn handle_socket(socket: WebSocket, context: ServerContext) {
    let session = Session {
        connection_id: next_connection_id(),
    };

    let (sender, mut outbox) = mpsc::unbounded_channel::<String>();

    context.gateway.register(session.connection_id, sender);
    info!("Connection {} opened", session.connection_id);

    let (mut ws_sender, mut ws_receiver) = socket.split();

    let writer = tokio::spawn(async move {
        while let Some(frame) = outbox.recv().await {
            if ws_sender.send(Message::Text(frame)).await.is_err() {
                break;
            }
        }
    });

    while let Some(Ok(message)) = ws_receiver.next().await {
        match message {
            Message::Text(text) => handle_command(&context, &session, &text),
            Message::Close(_) => break,
            _ => {}
        }
    }

    // Leaving rooms happens synchronously with the disconnect, so host
    // reassignment and room cleanup are settled before the next command
    context.gateway.unregister(session.connection_id);
    context
        .coordinator
        .disconnect(session.connection_id, Instant::now());

    writer.abort();

    info!("Connection {} closed", session.connection_id);
}

fn handle_command(context: &ServerContext, session: &Session, text: &str) {
    let command = match Command::parse(text) {
        Ok(command) => command,
        Err(CommandParseError::Unrecognized(reason)) => {
            warn!(
                "Dropping message from connection {}: {}",
                session.connection_id, reason
            );
            return;
        }
        Err(CommandParseError::InvalidPayload(message)) => {
            context
                .gateway
                .send_error(session.connection_id, "invalid-payload", &message);
            return;
        }
    };

    let coordinator = &context.coordinator;
    let connection_id = session.connection_id;
    let now = Instant::now();

    let result = match command {
        Command::CreateRoom(body) => coordinator
            .create_room(connection_id, body.display_name, now)
            .map(|_| ()),
        Command::JoinRoom(body) => {
            coordinator.join_room(&body.room_id, connection_id, body.display_name, now)
        }
        Command::PlaylistAdd(body) => {
            Track::new(body.track.id, body.track.title, &body.track.source, body.track.url)
                .and_then(|track| coordinator.playlist_add(&body.room_id, track, now))
        }
        Command::PlaylistRemove(body) => {
            coordinator.playlist_remove(&body.room_id, &body.track_id, now)
        }
        Command::PlayerPlay(body) => coordinator.play(&body.room_id, body.track_id, now),
        Command::PlayerPause(body) => coordinator.pause(&body.room_id, now),
        Command::PlayerResume(body) => coordinator.resume(&body.room_id, body.position, now),
        Command::PlayerNext(body) => coordinator.next(&body.room_id, now),
        Command::PlayerPrev(body) => coordinator.previous(&body.room_id, now),
        Command::PlayerSeek(body) => coordinator.seek(&body.room_id, body.time, now),
        Command::PlayerVolume(body) => {
            coordinator.set_volume(&body.room_id, connection_id, body.volume)
        }
        Command::PlayerLoop(body) => coordinator.set_loop_mode(&body.room_id, &body.mode, now),
        Command::ChatMessage(body) => coordinator.chat(
            &body.room_id,
            body.display_name,
            body.message,
            body.timestamp,
            now,
        ),
        Command::SyncRequest(body) => {
            coordinator.sync_request(&body.room_id, connection_id, now)
        }
        Command::TrackEnded(body) => coordinator.track_ended(&body.room_id, now),
    };

    if let Err(error) = result {
        context
            .gateway
            .send_error(connection_id, error.code(), &error.to_string());
    }
}

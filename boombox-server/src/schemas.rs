//! The inbound command envelope for the gateway socket.
//!
//! Commands are tagged JSON objects: `{"type": "player-play", "roomId": …}`.
//! Unknown command names are logged and dropped; recognized commands with a
//! bad payload produce an error reply to the sender.

use serde::Deserialize;
use serde_json::Value;

/// A command received from a client over the gateway.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum Command {
    CreateRoom(CreateRoomSchema),
    JoinRoom(JoinRoomSchema),
    PlaylistAdd(PlaylistAddSchema),
    PlaylistRemove(PlaylistRemoveSchema),
    PlayerPlay(PlayerPlaySchema),
    PlayerPause(RoomCommandSchema),
    PlayerResume(PlayerResumeSchema),
    PlayerNext(RoomCommandSchema),
    PlayerPrev(RoomCommandSchema),
    PlayerSeek(PlayerSeekSchema),
    PlayerVolume(PlayerVolumeSchema),
    PlayerLoop(PlayerLoopSchema),
    ChatMessage(ChatMessageSchema),
    SyncRequest(RoomCommandSchema),
    /// Sent by a rendering engine when the current track ends naturally.
    /// Not part of the client-facing command set.
    TrackEnded(RoomCommandSchema),
}

/// The command names, used to tell an unknown name apart from a recognized
/// command whose payload failed to parse.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "kebab-case")]
enum CommandKind {
    CreateRoom,
    JoinRoom,
    PlaylistAdd,
    PlaylistRemove,
    PlayerPlay,
    PlayerPause,
    PlayerResume,
    PlayerNext,
    PlayerPrev,
    PlayerSeek,
    PlayerVolume,
    PlayerLoop,
    ChatMessage,
    SyncRequest,
    TrackEnded,
}

#[derive(Debug)]
pub enum CommandParseError {
    /// Not a JSON object with a known `type`; logged and dropped
    Unrecognized(String),
    /// A known command with missing or malformed fields; replied to as an
    /// error
    InvalidPayload(String),
}

impl Command {
    pub fn parse(text: &str) -> Result<Self, CommandParseError> {
        let value: Value = serde_json::from_str(text)
            .map_err(|e| CommandParseError::Unrecognized(format!("not valid JSON: {e}")))?;

        let name = value
            .get("type")
            .and_then(Value::as_str)
            .ok_or_else(|| CommandParseError::Unrecognized("missing `type` field".to_string()))?;

        serde_json::from_value::<CommandKind>(Value::String(name.to_string())).map_err(|_| {
            CommandParseError::Unrecognized(format!("unknown command `{name}`"))
        })?;

        serde_json::from_value(value)
            .map_err(|e| CommandParseError::InvalidPayload(e.to_string()))
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateRoomSchema {
    #[serde(default)]
    pub display_name: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinRoomSchema {
    pub room_id: String,
    #[serde(default)]
    pub display_name: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaylistAddSchema {
    pub room_id: String,
    pub track: TrackSchema,
}

/// The source is kept as a raw string so that an unsupported value surfaces
/// as a domain error instead of a parse failure.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackSchema {
    pub id: String,
    pub title: String,
    pub source: String,
    pub url: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaylistRemoveSchema {
    pub room_id: String,
    pub track_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerPlaySchema {
    pub room_id: String,
    pub track_id: String,
}

/// Commands that carry nothing besides the room they act on.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomCommandSchema {
    pub room_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerResumeSchema {
    pub room_id: String,
    #[serde(default)]
    pub position: f32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerSeekSchema {
    pub room_id: String,
    pub time: f32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerVolumeSchema {
    pub room_id: String,
    pub volume: f32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerLoopSchema {
    pub room_id: String,
    pub mode: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessageSchema {
    pub room_id: String,
    pub display_name: String,
    pub message: String,
    pub timestamp: i64,
}

use crossbeam::channel::{Receiver, Sender};
use serde::Serialize;

use crate::{ConnectionId, LoopMode, PlaybackState, RoomId, Track, TrackId};

pub type EventSender = Sender<OutboundEvent>;
pub type EventReceiver = Receiver<OutboundEvent>;

/// The connections an event is addressed to.
///
/// Recipients are resolved to concrete connection ids while the room lock is
/// held, so the FIFO event bus preserves per-observer ordering even though
/// delivery happens outside the lock.
#[derive(Debug, Clone, PartialEq)]
pub enum Recipients {
    Only(ConnectionId),
    Some(Vec<ConnectionId>),
}

/// An event leaving the coordinator, ready for the transport to deliver.
#[derive(Debug, Clone)]
pub struct OutboundEvent {
    pub recipients: Recipients,
    pub event: RoomEvent,
}

/// Events emitted by the room managers.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum RoomEvent {
    /// Reply to the creator of a fresh room
    #[serde(rename_all = "camelCase")]
    RoomCreated {
        room_id: RoomId,
        playlist: Vec<Track>,
        loop_mode: LoopMode,
    },
    /// Reply to a joiner, seeding its player with the live playback state
    #[serde(rename_all = "camelCase")]
    RoomJoined {
        room_id: RoomId,
        playlist: Vec<Track>,
        loop_mode: LoopMode,
        current_track_id: Option<TrackId>,
        playback_state: PlaybackState,
        position: f32,
    },
    /// A member joined, sent to everyone else in the room
    #[serde(rename_all = "camelCase")]
    UserJoined { display_name: String },
    /// A member left, sent to everyone remaining in the room
    #[serde(rename_all = "camelCase")]
    UserLeft { display_name: String },
    /// The playlist changed in any way
    PlaylistUpdated { playlist: Vec<Track> },
    /// A track started playing from the given position
    #[serde(rename_all = "camelCase")]
    Play { track_id: TrackId, position: f32 },
    Pause,
    Resume { position: f32 },
    Seek { time: f32 },
    LoopModeChanged { mode: LoopMode },
    /// Volume echo to the issuing connection. Volume is per-client and never
    /// broadcast to the room.
    PlayerVolume { volume: f32 },
    /// Chat is relayed verbatim to the whole room, sender included
    #[serde(rename_all = "camelCase")]
    ChatMessage {
        display_name: String,
        message: String,
        timestamp: i64,
    },
    /// Reply to a sync request with the authoritative playback position
    #[serde(rename_all = "camelCase")]
    SyncResponse {
        current_track_id: Option<TrackId>,
        playback_state: PlaybackState,
        position: f32,
        loop_mode: LoopMode,
    },
}

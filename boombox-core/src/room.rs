use std::{str::FromStr, time::Instant};

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::{RoomError, Track, TrackId};

pub type RoomId = String;
pub type ConnectionId = u64;

/// A participant in a room, identified by its transport connection.
#[derive(Debug, Clone)]
pub struct Member {
    pub connection_id: ConnectionId,
    pub display_name: String,
    pub is_host: bool,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum PlaybackState {
    /// No track is being played. This is also the state a room falls back to
    /// when its current track is removed or the playlist runs out.
    #[default]
    Idle,
    Playing,
    Paused,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum LoopMode {
    #[default]
    NoLoop,
    /// Repeat the current track when it ends naturally. Manual next/prev are
    /// not affected.
    SingleLoop,
    /// Wrap around at both ends, for natural track endings and manual
    /// next/prev alike.
    PlaylistLoop,
}

/// The authoritative shared state of one listening session.
///
/// Mutated exclusively through the managers, each of which takes the room's
/// slot lock for the full duration of a command.
#[derive(Debug)]
pub struct Room {
    pub id: RoomId,
    pub playlist: Vec<Track>,
    pub current_track_id: Option<TrackId>,
    pub playback_state: PlaybackState,
    /// Authoritative position in seconds at the time of `last_event_time`.
    pub last_known_position: f32,
    /// When the last playback-affecting event was applied.
    pub last_event_time: Instant,
    pub loop_mode: LoopMode,
    /// Insertion order is meaningful: the first member is promoted when the
    /// host leaves.
    pub members: Vec<Member>,
    pub created_at: DateTime<Utc>,
    pub last_activity: Instant,
}

/// A read-only projection of a room, served over the query surface.
#[derive(Debug, Clone)]
pub struct RoomSummary {
    pub room_id: RoomId,
    pub playlist: Vec<Track>,
    pub current_track_id: Option<TrackId>,
    pub member_count: usize,
    pub loop_mode: LoopMode,
    pub created_at: DateTime<Utc>,
}

impl Member {
    pub fn host(connection_id: ConnectionId, display_name: String) -> Self {
        Self {
            connection_id,
            display_name,
            is_host: true,
        }
    }

    pub fn guest(connection_id: ConnectionId, display_name: String) -> Self {
        Self {
            connection_id,
            display_name,
            is_host: false,
        }
    }
}

impl Room {
    /// Creates a room with its host as sole member. A room never exists
    /// without at least one member.
    pub fn new(id: RoomId, host: Member, now: Instant) -> Self {
        Self {
            id,
            playlist: Vec::new(),
            current_track_id: None,
            playback_state: PlaybackState::default(),
            last_known_position: 0.,
            last_event_time: now,
            loop_mode: LoopMode::default(),
            members: vec![Member {
                is_host: true,
                ..host
            }],
            created_at: Utc::now(),
            last_activity: now,
        }
    }

    /// Records activity. `last_activity` never moves backwards.
    pub fn touch(&mut self, now: Instant) {
        self.last_activity = self.last_activity.max(now);
    }

    /// The authoritative playback position at `now`: the last stored position,
    /// advanced by wall-clock time only while playing.
    pub fn position_at(&self, now: Instant) -> f32 {
        let elapsed = match self.playback_state {
            PlaybackState::Playing => now.saturating_duration_since(self.last_event_time),
            _ => std::time::Duration::ZERO,
        };

        self.last_known_position + elapsed.as_secs_f32()
    }

    pub fn track_index(&self, track_id: &str) -> Option<usize> {
        self.playlist.iter().position(|t| t.id == track_id)
    }

    pub fn track(&self, track_id: &str) -> Option<&Track> {
        self.playlist.iter().find(|t| t.id == track_id)
    }

    /// Index of the current track in the playlist, if one is set.
    pub fn current_index(&self) -> Option<usize> {
        self.current_track_id
            .as_deref()
            .and_then(|id| self.track_index(id))
    }

    pub fn member(&self, connection_id: ConnectionId) -> Option<&Member> {
        self.members
            .iter()
            .find(|m| m.connection_id == connection_id)
    }

    pub fn member_mut(&mut self, connection_id: ConnectionId) -> Option<&mut Member> {
        self.members
            .iter_mut()
            .find(|m| m.connection_id == connection_id)
    }

    /// Every member's connection id, for room-wide broadcasts.
    pub fn member_ids(&self) -> Vec<ConnectionId> {
        self.members.iter().map(|m| m.connection_id).collect()
    }

    /// Every member's connection id except one, for broadcast-to-others.
    pub fn member_ids_except(&self, excluded: ConnectionId) -> Vec<ConnectionId> {
        self.members
            .iter()
            .map(|m| m.connection_id)
            .filter(|id| *id != excluded)
            .collect()
    }

    pub fn summary(&self) -> RoomSummary {
        RoomSummary {
            room_id: self.id.clone(),
            playlist: self.playlist.clone(),
            current_track_id: self.current_track_id.clone(),
            member_count: self.members.len(),
            loop_mode: self.loop_mode,
            created_at: self.created_at,
        }
    }
}

impl LoopMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NoLoop => "no-loop",
            Self::SingleLoop => "single-loop",
            Self::PlaylistLoop => "playlist-loop",
        }
    }
}

impl PlaybackState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Playing => "playing",
            Self::Paused => "paused",
        }
    }
}

impl FromStr for LoopMode {
    type Err = RoomError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "no-loop" => Ok(Self::NoLoop),
            "single-loop" => Ok(Self::SingleLoop),
            "playlist-loop" => Ok(Self::PlaylistLoop),
            other => Err(RoomError::InvalidLoopMode(other.to_string())),
        }
    }
}

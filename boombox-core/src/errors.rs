use thiserror::Error;

use crate::{RoomId, TrackId};

pub type RoomResult<T> = Result<T, RoomError>;

/// Everything that can go wrong while handling a room command.
///
/// Errors are always resolved at the command and reported only to the issuing
/// connection. A failed command leaves room state untouched.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RoomError {
    #[error("Room {0} does not exist")]
    RoomNotFound(RoomId),
    #[error("Room {0} already exists")]
    RoomAlreadyExists(RoomId),
    #[error("Track {0} is not in the playlist")]
    TrackNotFound(TrackId),
    #[error("Unsupported track source: {0}")]
    UnsupportedTrackSource(String),
    #[error("Invalid loop mode: {0}")]
    InvalidLoopMode(String),
    #[error("No next track to advance to")]
    NoNextTrack,
    #[error("No previous track to go back to")]
    NoPreviousTrack,
    #[error("The playlist is empty")]
    EmptyPlaylist,
}

impl RoomError {
    /// Stable machine-readable code carried by error replies.
    pub fn code(&self) -> &'static str {
        match self {
            Self::RoomNotFound(_) => "room-not-found",
            Self::RoomAlreadyExists(_) => "room-already-exists",
            Self::TrackNotFound(_) => "track-not-found",
            Self::UnsupportedTrackSource(_) => "unsupported-track-source",
            Self::InvalidLoopMode(_) => "invalid-loop-mode",
            Self::NoNextTrack => "no-next-track",
            Self::NoPreviousTrack => "no-previous-track",
            Self::EmptyPlaylist => "empty-playlist",
        }
    }
}

//! All schemas that are exposed from the query endpoints are defined here
//! along with the ToSerialized impls

use boombox_core::{RoomSummary as CoreRoomSummary, Track as CoreTrack};
use serde::Serialize;
use utoipa::ToSchema;

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Track {
    id: String,
    title: String,
    source: String,
    url: String,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RoomSummary {
    room_id: String,
    playlist: Vec<Track>,
    current_track_id: Option<String>,
    user_count: usize,
    loop_mode: String,
    created_at: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct RoomExists {
    pub exists: bool,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct Playlist {
    pub playlist: Vec<Track>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct Health {
    pub status: &'static str,
    pub timestamp: String,
}

/// Helper trait to convert any type into a serialized version
pub trait ToSerialized<T>
where
    T: Serialize,
{
    fn to_serialized(&self) -> T;
}

impl<I, O> ToSerialized<Vec<O>> for Vec<I>
where
    I: ToSerialized<O>,
    O: Serialize,
{
    fn to_serialized(&self) -> Vec<O> {
        self.iter().map(|x| x.to_serialized()).collect()
    }
}

impl ToSerialized<Track> for CoreTrack {
    fn to_serialized(&self) -> Track {
        Track {
            id: self.id.clone(),
            title: self.title.clone(),
            source: self.source.as_str().to_string(),
            url: self.url.clone(),
        }
    }
}

impl ToSerialized<RoomSummary> for CoreRoomSummary {
    fn to_serialized(&self) -> RoomSummary {
        RoomSummary {
            room_id: self.room_id.clone(),
            playlist: self.playlist.to_serialized(),
            current_track_id: self.current_track_id.clone(),
            user_count: self.member_count,
            loop_mode: self.loop_mode.as_str().to_string(),
            created_at: self.created_at.to_rfc3339(),
        }
    }
}

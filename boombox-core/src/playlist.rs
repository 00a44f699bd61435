use std::time::Instant;

use crate::{CoordinatorContext, PlaybackState, Recipients, RoomEvent, RoomResult, Track};

/// Manages a room's playlist and resolves current-track invalidation when it
/// changes.
pub struct PlaylistManager {
    context: CoordinatorContext,
}

impl PlaylistManager {
    pub fn new(context: &CoordinatorContext) -> Self {
        Self {
            context: context.clone(),
        }
    }

    /// Adds a track, or replaces the track with the same id in place.
    pub fn add(&self, room_id: &str, track: Track, now: Instant) -> RoomResult<()> {
        self.context.rooms.with_room(room_id, |room| {
            room.touch(now);

            match room.track_index(&track.id) {
                Some(index) => room.playlist[index] = track,
                None => room.playlist.push(track),
            }

            self.context.emit(
                Recipients::Some(room.member_ids()),
                RoomEvent::PlaylistUpdated {
                    playlist: room.playlist.clone(),
                },
            );

            Ok(())
        })
    }

    /// Removes a track if present. Removing the current track leaves the room
    /// idle with no current track; it deliberately does not auto-advance.
    pub fn remove(&self, room_id: &str, track_id: &str, now: Instant) -> RoomResult<()> {
        self.context.rooms.with_room(room_id, |room| {
            room.touch(now);

            if let Some(index) = room.track_index(track_id) {
                room.playlist.remove(index);

                if room.current_track_id.as_deref() == Some(track_id) {
                    room.current_track_id = None;
                    room.playback_state = PlaybackState::Idle;
                    room.last_known_position = 0.;
                    room.last_event_time = now;
                }
            }

            self.context.emit(
                Recipients::Some(room.member_ids()),
                RoomEvent::PlaylistUpdated {
                    playlist: room.playlist.clone(),
                },
            );

            Ok(())
        })
    }
}

#[cfg(test)]
mod test {
    use std::time::Instant;

    use super::PlaylistManager;
    use crate::{
        CoordinatorContext, EventReceiver, Member, PlaybackState, Track, TrackSource,
    };

    fn track(id: &str, title: &str) -> Track {
        Track {
            id: id.to_string(),
            title: title.to_string(),
            source: TrackSource::Local,
            url: format!("/media/{id}"),
        }
    }

    fn setup() -> (PlaylistManager, CoordinatorContext, EventReceiver) {
        let (context, receiver) = CoordinatorContext::for_test();

        context
            .rooms
            .create(
                "abc123".to_string(),
                Member::host(1, "Ada".to_string()),
                Instant::now(),
            )
            .unwrap();

        (PlaylistManager::new(&context), context, receiver)
    }

    #[test]
    fn adding_appends_and_broadcasts() {
        let (manager, context, receiver) = setup();

        manager
            .add("abc123", track("t1", "Song A"), Instant::now())
            .unwrap();

        let playlist = context
            .rooms
            .read_room("abc123", |room| room.playlist.clone())
            .unwrap();

        assert_eq!(playlist.len(), 1);
        assert_eq!(receiver.len(), 1);
    }

    #[test]
    fn adding_a_colliding_id_replaces_in_place() {
        let (manager, context, _receiver) = setup();
        let now = Instant::now();

        manager.add("abc123", track("t1", "Song A"), now).unwrap();
        manager.add("abc123", track("t2", "Song B"), now).unwrap();
        manager.add("abc123", track("t1", "Song A2"), now).unwrap();

        let playlist = context
            .rooms
            .read_room("abc123", |room| room.playlist.clone())
            .unwrap();

        assert_eq!(playlist.len(), 2);
        assert_eq!(playlist[0].id, "t1");
        assert_eq!(playlist[0].title, "Song A2");
    }

    #[test]
    fn removing_the_current_track_forces_idle() {
        let (manager, context, _receiver) = setup();
        let now = Instant::now();

        manager.add("abc123", track("t1", "Song A"), now).unwrap();

        context
            .rooms
            .with_room("abc123", |room| {
                room.current_track_id = Some("t1".to_string());
                room.playback_state = PlaybackState::Playing;
                Ok(())
            })
            .unwrap();

        manager.remove("abc123", "t1", now).unwrap();

        context
            .rooms
            .read_room("abc123", |room| {
                assert_eq!(room.current_track_id, None);
                assert_eq!(room.playback_state, PlaybackState::Idle);
            })
            .unwrap();
    }

    #[test]
    fn removing_another_track_keeps_the_current_one() {
        let (manager, context, _receiver) = setup();
        let now = Instant::now();

        manager.add("abc123", track("t1", "Song A"), now).unwrap();
        manager.add("abc123", track("t2", "Song B"), now).unwrap();

        context
            .rooms
            .with_room("abc123", |room| {
                room.current_track_id = Some("t1".to_string());
                room.playback_state = PlaybackState::Playing;
                Ok(())
            })
            .unwrap();

        manager.remove("abc123", "t2", now).unwrap();

        context
            .rooms
            .read_room("abc123", |room| {
                assert_eq!(room.current_track_id.as_deref(), Some("t1"));
                assert_eq!(room.playback_state, PlaybackState::Playing);
            })
            .unwrap();
    }

    #[test]
    fn removing_an_absent_track_is_a_no_op() {
        let (manager, context, receiver) = setup();

        manager
            .remove("abc123", "ghost", Instant::now())
            .unwrap();

        let playlist = context
            .rooms
            .read_room("abc123", |room| room.playlist.clone())
            .unwrap();

        assert!(playlist.is_empty());
        // The playlist broadcast still goes out, mirroring a real removal
        assert_eq!(receiver.len(), 1);
    }
}

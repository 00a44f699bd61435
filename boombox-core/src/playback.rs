use std::time::Instant;

use crate::{
    ConnectionId, CoordinatorContext, LoopMode, PlaybackState, Recipients, Room, RoomError,
    RoomEvent, RoomResult, TrackId,
};

/// The playback state machine. Every transition stamps the room's event time
/// and broadcasts the resulting event to all members.
///
/// Commands whose preconditions do not hold (pausing while idle, resuming
/// with no current track, seeking with no current track) are ignored without
/// an event, leaving room state untouched.
pub struct PlaybackController {
    context: CoordinatorContext,
}

impl PlaybackController {
    pub fn new(context: &CoordinatorContext) -> Self {
        Self {
            context: context.clone(),
        }
    }

    /// Starts playing the given track from the beginning.
    pub fn play(&self, room_id: &str, track_id: TrackId, now: Instant) -> RoomResult<()> {
        self.context.rooms.with_room(room_id, |room| {
            if room.track(&track_id).is_none() {
                return Err(RoomError::TrackNotFound(track_id));
            }

            room.touch(now);
            self.start_track(room, track_id, now);

            Ok(())
        })
    }

    /// Freezes playback at the elapsed position.
    pub fn pause(&self, room_id: &str, now: Instant) -> RoomResult<()> {
        self.context.rooms.with_room(room_id, |room| {
            if room.playback_state != PlaybackState::Playing {
                return Ok(());
            }

            room.touch(now);
            room.last_known_position = room.position_at(now);
            room.last_event_time = now;
            room.playback_state = PlaybackState::Paused;

            self.context
                .emit(Recipients::Some(room.member_ids()), RoomEvent::Pause);

            Ok(())
        })
    }

    /// Resumes the current track from the given position.
    pub fn resume(&self, room_id: &str, position: f32, now: Instant) -> RoomResult<()> {
        self.context.rooms.with_room(room_id, |room| {
            let resumable = room.playback_state != PlaybackState::Playing
                && room.current_track_id.is_some();

            if !resumable {
                return Ok(());
            }

            room.touch(now);
            room.last_known_position = position;
            room.last_event_time = now;
            room.playback_state = PlaybackState::Playing;

            self.context.emit(
                Recipients::Some(room.member_ids()),
                RoomEvent::Resume { position },
            );

            Ok(())
        })
    }

    /// Moves the playback position without changing state.
    pub fn seek(&self, room_id: &str, time: f32, now: Instant) -> RoomResult<()> {
        self.context.rooms.with_room(room_id, |room| {
            if room.current_track_id.is_none() {
                return Ok(());
            }

            room.touch(now);
            room.last_known_position = time;
            room.last_event_time = now;

            self.context
                .emit(Recipients::Some(room.member_ids()), RoomEvent::Seek { time });

            Ok(())
        })
    }

    pub fn next(&self, room_id: &str, now: Instant) -> RoomResult<()> {
        self.context.rooms.with_room(room_id, |room| {
            if room.playlist.is_empty() {
                return Err(RoomError::EmptyPlaylist);
            }

            let index = Self::next_index(room).ok_or(RoomError::NoNextTrack)?;
            let track_id = room.playlist[index].id.clone();

            room.touch(now);
            self.start_track(room, track_id, now);

            Ok(())
        })
    }

    pub fn previous(&self, room_id: &str, now: Instant) -> RoomResult<()> {
        self.context.rooms.with_room(room_id, |room| {
            if room.playlist.is_empty() {
                return Err(RoomError::EmptyPlaylist);
            }

            let index = Self::prev_index(room).ok_or(RoomError::NoPreviousTrack)?;
            let track_id = room.playlist[index].id.clone();

            room.touch(now);
            self.start_track(room, track_id, now);

            Ok(())
        })
    }

    pub fn set_loop_mode(&self, room_id: &str, mode: &str, now: Instant) -> RoomResult<()> {
        self.context.rooms.with_room(room_id, |room| {
            let mode: LoopMode = mode.parse()?;

            room.touch(now);
            room.loop_mode = mode;

            self.context.emit(
                Recipients::Some(room.member_ids()),
                RoomEvent::LoopModeChanged { mode },
            );

            Ok(())
        })
    }

    /// Volume is per-client: it is echoed back to the issuing connection and
    /// never stored in room state or broadcast.
    pub fn set_volume(
        &self,
        room_id: &str,
        connection_id: ConnectionId,
        volume: f32,
    ) -> RoomResult<()> {
        self.context.rooms.read_room(room_id, |_| ())?;

        if (0. ..=100.).contains(&volume) {
            self.context.emit(
                Recipients::Only(connection_id),
                RoomEvent::PlayerVolume { volume },
            );
        }

        Ok(())
    }

    /// A rendering engine signaled the natural end of the current track.
    ///
    /// Single-loop replays the same track from the start; playlist-loop wraps
    /// to the next track; otherwise the room advances, falling back to idle
    /// at the end of the playlist without an event, since every member's
    /// engine just finished on its own.
    pub fn track_ended(&self, room_id: &str, now: Instant) -> RoomResult<()> {
        self.context.rooms.with_room(room_id, |room| {
            room.touch(now);

            if room.loop_mode == LoopMode::SingleLoop {
                if let Some(track_id) = room.current_track_id.clone() {
                    self.start_track(room, track_id, now);
                }

                return Ok(());
            }

            match Self::next_index(room) {
                Some(index) => {
                    let track_id = room.playlist[index].id.clone();
                    self.start_track(room, track_id, now);
                }
                None => {
                    room.playback_state = PlaybackState::Idle;
                    room.last_known_position = 0.;
                    room.last_event_time = now;
                }
            }

            Ok(())
        })
    }

    fn start_track(&self, room: &mut Room, track_id: TrackId, now: Instant) {
        room.current_track_id = Some(track_id.clone());
        room.playback_state = PlaybackState::Playing;
        room.last_known_position = 0.;
        room.last_event_time = now;

        self.context.emit(
            Recipients::Some(room.member_ids()),
            RoomEvent::Play {
                track_id,
                position: 0.,
            },
        );
    }

    // The next/prev index rules. With no current track the index is treated
    // as -1, so `next` lands on the first track. Single-loop does not
    // constrain manual next/prev; it only affects track_ended.
    fn next_index(room: &Room) -> Option<usize> {
        let len = room.playlist.len();

        if len == 0 {
            return None;
        }

        match room.loop_mode {
            LoopMode::PlaylistLoop => Some(room.current_index().map_or(0, |i| (i + 1) % len)),
            _ => match room.current_index() {
                Some(i) if i + 1 < len => Some(i + 1),
                Some(_) => None,
                None => Some(0),
            },
        }
    }

    fn prev_index(room: &Room) -> Option<usize> {
        let len = room.playlist.len();

        if len == 0 {
            return None;
        }

        match room.loop_mode {
            LoopMode::PlaylistLoop => {
                Some(room.current_index().map_or(len - 1, |i| (i + len - 1) % len))
            }
            _ => match room.current_index() {
                Some(i) if i > 0 => Some(i - 1),
                _ => None,
            },
        }
    }
}

#[cfg(test)]
mod test {
    use std::time::{Duration, Instant};

    use super::PlaybackController;
    use crate::{
        CoordinatorContext, EventReceiver, LoopMode, Member, PlaybackState, Recipients,
        RoomError, RoomEvent, Track, TrackSource,
    };

    const ROOM: &str = "abc123";

    fn track(id: &str) -> Track {
        Track {
            id: id.to_string(),
            title: format!("Song {id}"),
            source: TrackSource::Local,
            url: format!("/media/{id}"),
        }
    }

    fn setup(track_ids: &[&str]) -> (PlaybackController, CoordinatorContext, EventReceiver) {
        let (context, receiver) = CoordinatorContext::for_test();

        context
            .rooms
            .create(
                ROOM.to_string(),
                Member::host(1, "Ada".to_string()),
                Instant::now(),
            )
            .unwrap();

        context
            .rooms
            .with_room(ROOM, |room| {
                room.playlist = track_ids.iter().map(|id| track(id)).collect();
                Ok(())
            })
            .unwrap();

        (PlaybackController::new(&context), context, receiver)
    }

    fn current_track(context: &CoordinatorContext) -> Option<String> {
        context
            .rooms
            .read_room(ROOM, |room| room.current_track_id.clone())
            .unwrap()
    }

    #[test]
    fn play_requires_the_track_to_exist() {
        let (controller, context, _receiver) = setup(&["t1"]);

        let result = controller.play(ROOM, "ghost".to_string(), Instant::now());

        assert_eq!(result, Err(RoomError::TrackNotFound("ghost".to_string())));
        assert_eq!(current_track(&context), None);
    }

    #[test]
    fn play_starts_from_zero_and_broadcasts() {
        let (controller, context, receiver) = setup(&["t1"]);

        controller
            .play(ROOM, "t1".to_string(), Instant::now())
            .unwrap();

        context
            .rooms
            .read_room(ROOM, |room| {
                assert_eq!(room.playback_state, PlaybackState::Playing);
                assert_eq!(room.last_known_position, 0.);
            })
            .unwrap();

        let event = receiver.recv().unwrap();
        assert_eq!(event.recipients, Recipients::Some(vec![1]));
        assert!(matches!(
            event.event,
            RoomEvent::Play { ref track_id, position } if track_id == "t1" && position == 0.
        ));
    }

    #[test]
    fn pause_freezes_the_elapsed_position() {
        let (controller, context, _receiver) = setup(&["t1"]);
        let start = Instant::now();

        controller.play(ROOM, "t1".to_string(), start).unwrap();
        controller
            .pause(ROOM, start + Duration::from_secs(5))
            .unwrap();

        context
            .rooms
            .read_room(ROOM, |room| {
                assert_eq!(room.playback_state, PlaybackState::Paused);
                assert!((room.last_known_position - 5.).abs() < 0.01);
            })
            .unwrap();
    }

    #[test]
    fn pause_while_not_playing_is_ignored() {
        let (controller, context, receiver) = setup(&["t1"]);

        controller.pause(ROOM, Instant::now()).unwrap();

        context
            .rooms
            .read_room(ROOM, |room| {
                assert_eq!(room.playback_state, PlaybackState::Idle);
            })
            .unwrap();

        assert!(receiver.is_empty());
    }

    #[test]
    fn resume_restores_playback_at_the_given_position() {
        let (controller, context, _receiver) = setup(&["t1"]);
        let start = Instant::now();

        controller.play(ROOM, "t1".to_string(), start).unwrap();
        controller.pause(ROOM, start + Duration::from_secs(5)).unwrap();
        controller
            .resume(ROOM, 5., start + Duration::from_secs(8))
            .unwrap();

        context
            .rooms
            .read_room(ROOM, |room| {
                assert_eq!(room.playback_state, PlaybackState::Playing);
                assert_eq!(room.last_known_position, 5.);
            })
            .unwrap();
    }

    #[test]
    fn resume_without_a_current_track_is_ignored() {
        let (controller, context, receiver) = setup(&["t1"]);

        controller.resume(ROOM, 5., Instant::now()).unwrap();

        context
            .rooms
            .read_room(ROOM, |room| {
                assert_eq!(room.playback_state, PlaybackState::Idle);
            })
            .unwrap();

        assert!(receiver.is_empty());
    }

    #[test]
    fn seek_moves_the_position_without_changing_state() {
        let (controller, context, _receiver) = setup(&["t1"]);
        let start = Instant::now();

        controller.play(ROOM, "t1".to_string(), start).unwrap();
        controller.pause(ROOM, start + Duration::from_secs(2)).unwrap();
        controller.seek(ROOM, 42., start + Duration::from_secs(3)).unwrap();

        context
            .rooms
            .read_room(ROOM, |room| {
                assert_eq!(room.playback_state, PlaybackState::Paused);
                assert_eq!(room.last_known_position, 42.);
            })
            .unwrap();
    }

    #[test]
    fn next_advances_in_playlist_order() {
        let (controller, context, _receiver) = setup(&["t1", "t2", "t3"]);
        let now = Instant::now();

        controller.play(ROOM, "t1".to_string(), now).unwrap();
        controller.next(ROOM, now).unwrap();

        assert_eq!(current_track(&context).as_deref(), Some("t2"));
    }

    #[test]
    fn next_with_no_current_track_starts_from_the_beginning() {
        let (controller, context, _receiver) = setup(&["t1", "t2"]);

        controller.next(ROOM, Instant::now()).unwrap();

        assert_eq!(current_track(&context).as_deref(), Some("t1"));
    }

    #[test]
    fn next_at_the_end_without_looping_fails_and_changes_nothing() {
        let (controller, context, _receiver) = setup(&["t1", "t2"]);
        let now = Instant::now();

        controller.play(ROOM, "t2".to_string(), now).unwrap();
        let result = controller.next(ROOM, now);

        assert_eq!(result, Err(RoomError::NoNextTrack));
        assert_eq!(current_track(&context).as_deref(), Some("t2"));

        context
            .rooms
            .read_room(ROOM, |room| {
                assert_eq!(room.playback_state, PlaybackState::Playing);
            })
            .unwrap();
    }

    #[test]
    fn next_on_an_empty_playlist_fails() {
        let (controller, _, _receiver) = setup(&[]);

        let result = controller.next(ROOM, Instant::now());

        assert_eq!(result, Err(RoomError::EmptyPlaylist));
    }

    #[test]
    fn next_wraps_back_to_the_start_in_playlist_loop() {
        let (controller, context, _receiver) = setup(&["t1", "t2", "t3"]);
        let now = Instant::now();

        controller.set_loop_mode(ROOM, "playlist-loop", now).unwrap();
        controller.play(ROOM, "t1".to_string(), now).unwrap();

        for _ in 0..3 {
            controller.next(ROOM, now).unwrap();
        }

        assert_eq!(current_track(&context).as_deref(), Some("t1"));
    }

    #[test]
    fn previous_mirrors_next() {
        let (controller, context, _receiver) = setup(&["t1", "t2"]);
        let now = Instant::now();

        controller.play(ROOM, "t2".to_string(), now).unwrap();
        controller.previous(ROOM, now).unwrap();
        assert_eq!(current_track(&context).as_deref(), Some("t1"));

        let result = controller.previous(ROOM, now);
        assert_eq!(result, Err(RoomError::NoPreviousTrack));
    }

    #[test]
    fn previous_wraps_to_the_end_in_playlist_loop() {
        let (controller, context, _receiver) = setup(&["t1", "t2", "t3"]);
        let now = Instant::now();

        controller.set_loop_mode(ROOM, "playlist-loop", now).unwrap();
        controller.play(ROOM, "t1".to_string(), now).unwrap();
        controller.previous(ROOM, now).unwrap();

        assert_eq!(current_track(&context).as_deref(), Some("t3"));
    }

    #[test]
    fn single_loop_does_not_constrain_manual_next() {
        let (controller, context, _receiver) = setup(&["t1", "t2"]);
        let now = Instant::now();

        controller.set_loop_mode(ROOM, "single-loop", now).unwrap();
        controller.play(ROOM, "t1".to_string(), now).unwrap();
        controller.next(ROOM, now).unwrap();

        assert_eq!(current_track(&context).as_deref(), Some("t2"));
    }

    #[test]
    fn set_loop_mode_rejects_unknown_modes() {
        let (controller, context, _receiver) = setup(&[]);

        let result = controller.set_loop_mode(ROOM, "shuffle", Instant::now());

        assert_eq!(
            result,
            Err(RoomError::InvalidLoopMode("shuffle".to_string()))
        );

        context
            .rooms
            .read_room(ROOM, |room| {
                assert_eq!(room.loop_mode, LoopMode::NoLoop);
            })
            .unwrap();
    }

    #[test]
    fn volume_is_echoed_only_to_the_sender() {
        let (controller, _, receiver) = setup(&[]);

        controller.set_volume(ROOM, 1, 70.).unwrap();

        let event = receiver.recv().unwrap();
        assert_eq!(event.recipients, Recipients::Only(1));
        assert!(matches!(event.event, RoomEvent::PlayerVolume { volume } if volume == 70.));
    }

    #[test]
    fn out_of_range_volume_is_ignored() {
        let (controller, _, receiver) = setup(&[]);

        controller.set_volume(ROOM, 1, 140.).unwrap();

        assert!(receiver.is_empty());
    }

    #[test]
    fn track_ended_replays_the_same_track_in_single_loop() {
        let (controller, context, receiver) = setup(&["t1", "t2"]);
        let now = Instant::now();

        controller.set_loop_mode(ROOM, "single-loop", now).unwrap();
        controller.play(ROOM, "t1".to_string(), now).unwrap();

        // Drain loop-mode-changed and play
        receiver.recv().unwrap();
        receiver.recv().unwrap();

        controller.track_ended(ROOM, now + Duration::from_secs(180)).unwrap();

        assert_eq!(current_track(&context).as_deref(), Some("t1"));

        let event = receiver.recv().unwrap();
        assert!(matches!(
            event.event,
            RoomEvent::Play { ref track_id, position } if track_id == "t1" && position == 0.
        ));
    }

    #[test]
    fn track_ended_advances_to_the_next_track() {
        let (controller, context, _receiver) = setup(&["t1", "t2"]);
        let now = Instant::now();

        controller.play(ROOM, "t1".to_string(), now).unwrap();
        controller.track_ended(ROOM, now).unwrap();

        assert_eq!(current_track(&context).as_deref(), Some("t2"));
    }

    #[test]
    fn track_ended_at_the_end_falls_back_to_idle() {
        let (controller, context, receiver) = setup(&["t1", "t2"]);
        let now = Instant::now();

        controller.play(ROOM, "t2".to_string(), now).unwrap();
        receiver.recv().unwrap();

        controller.track_ended(ROOM, now).unwrap();

        context
            .rooms
            .read_room(ROOM, |room| {
                assert_eq!(room.playback_state, PlaybackState::Idle);
            })
            .unwrap();

        assert!(receiver.is_empty());
    }

    #[test]
    fn track_ended_wraps_around_in_playlist_loop() {
        let (controller, context, _receiver) = setup(&["t1", "t2"]);
        let now = Instant::now();

        controller.set_loop_mode(ROOM, "playlist-loop", now).unwrap();
        controller.play(ROOM, "t2".to_string(), now).unwrap();
        controller.track_ended(ROOM, now).unwrap();

        assert_eq!(current_track(&context).as_deref(), Some("t1"));
    }
}

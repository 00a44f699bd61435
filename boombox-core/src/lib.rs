use std::{sync::Arc, time::Instant};

use crossbeam::channel::unbounded;

mod config;
mod errors;
mod events;
mod membership;
mod playback;
mod playlist;
mod registry;
mod room;
mod sync;
mod track;
mod util;

pub use config::*;
pub use errors::*;
pub use events::*;
pub use registry::*;
pub use room::*;
pub use track::*;
pub use util::*;

use membership::MembershipManager;
use playback::PlaybackController;
use playlist::PlaylistManager;
use sync::SyncCoordinator;

/// The boombox coordinator, facilitating room management, shared playback
/// control, and position synchronization.
///
/// Commands take an explicit `now` so that position arithmetic and the
/// inactivity sweep never depend on a hidden clock.
pub struct Coordinator {
    context: CoordinatorContext,
    membership: MembershipManager,
    playlist: PlaylistManager,
    playback: PlaybackController,
    sync: SyncCoordinator,
    event_receiver: EventReceiver,
}

/// A type passed to the managers, to access rooms and emit events.
#[derive(Clone)]
pub struct CoordinatorContext {
    pub config: Config,
    pub rooms: Arc<RoomRegistry>,

    event_sender: EventSender,
}

impl Coordinator {
    pub fn new(config: Config) -> Self {
        let (event_sender, event_receiver) = unbounded();

        let context = CoordinatorContext {
            config,
            event_sender,
            rooms: Default::default(),
        };

        Self {
            membership: MembershipManager::new(&context),
            playlist: PlaylistManager::new(&context),
            playback: PlaybackController::new(&context),
            sync: SyncCoordinator::new(&context),
            event_receiver,
            context,
        }
    }

    pub fn config(&self) -> &Config {
        &self.context.config
    }

    /// Receive outbound events from the coordinator. Blocks until one is
    /// available.
    pub fn wait_for_event(&self) -> OutboundEvent {
        self.event_receiver
            .recv()
            .expect("event is received without error")
    }

    // Room lifecycle

    pub fn create_room(
        &self,
        connection_id: ConnectionId,
        display_name: Option<String>,
        now: Instant,
    ) -> RoomResult<RoomId> {
        self.membership.create_room(connection_id, display_name, now)
    }

    pub fn join_room(
        &self,
        room_id: &str,
        connection_id: ConnectionId,
        display_name: Option<String>,
        now: Instant,
    ) -> RoomResult<()> {
        self.membership.join(room_id, connection_id, display_name, now)
    }

    /// Removes a disconnecting connection from every room it belongs to.
    pub fn disconnect(&self, connection_id: ConnectionId, now: Instant) {
        self.membership.disconnect(connection_id, now);
    }

    /// Deletes every room inactive for longer than the configured threshold.
    pub fn sweep(&self, now: Instant) -> usize {
        self.context
            .rooms
            .sweep(now, self.context.config.max_room_inactivity)
    }

    // Playlist

    pub fn playlist_add(&self, room_id: &str, track: Track, now: Instant) -> RoomResult<()> {
        self.playlist.add(room_id, track, now)
    }

    pub fn playlist_remove(&self, room_id: &str, track_id: &str, now: Instant) -> RoomResult<()> {
        self.playlist.remove(room_id, track_id, now)
    }

    // Playback

    pub fn play(&self, room_id: &str, track_id: TrackId, now: Instant) -> RoomResult<()> {
        self.playback.play(room_id, track_id, now)
    }

    pub fn pause(&self, room_id: &str, now: Instant) -> RoomResult<()> {
        self.playback.pause(room_id, now)
    }

    pub fn resume(&self, room_id: &str, position: f32, now: Instant) -> RoomResult<()> {
        self.playback.resume(room_id, position, now)
    }

    pub fn seek(&self, room_id: &str, time: f32, now: Instant) -> RoomResult<()> {
        self.playback.seek(room_id, time, now)
    }

    pub fn next(&self, room_id: &str, now: Instant) -> RoomResult<()> {
        self.playback.next(room_id, now)
    }

    pub fn previous(&self, room_id: &str, now: Instant) -> RoomResult<()> {
        self.playback.previous(room_id, now)
    }

    pub fn set_loop_mode(&self, room_id: &str, mode: &str, now: Instant) -> RoomResult<()> {
        self.playback.set_loop_mode(room_id, mode, now)
    }

    pub fn set_volume(
        &self,
        room_id: &str,
        connection_id: ConnectionId,
        volume: f32,
    ) -> RoomResult<()> {
        self.playback.set_volume(room_id, connection_id, volume)
    }

    /// A rendering engine signaled that the current track finished naturally.
    pub fn track_ended(&self, room_id: &str, now: Instant) -> RoomResult<()> {
        self.playback.track_ended(room_id, now)
    }

    // Chat and sync

    /// Relays a chat message verbatim to everyone in the room.
    pub fn chat(
        &self,
        room_id: &str,
        display_name: String,
        message: String,
        timestamp: i64,
        now: Instant,
    ) -> RoomResult<()> {
        self.context.rooms.with_room(room_id, |room| {
            room.touch(now);

            self.context.emit(
                Recipients::Some(room.member_ids()),
                RoomEvent::ChatMessage {
                    display_name,
                    message,
                    timestamp,
                },
            );

            Ok(())
        })
    }

    pub fn sync_request(
        &self,
        room_id: &str,
        connection_id: ConnectionId,
        now: Instant,
    ) -> RoomResult<()> {
        self.sync.sync_request(room_id, connection_id, now)
    }

    // Read-only projections

    pub fn room_summary(&self, room_id: &str) -> RoomResult<RoomSummary> {
        self.context.rooms.read_room(room_id, |room| room.summary())
    }

    pub fn room_exists(&self, room_id: &str) -> bool {
        self.context.rooms.exists(room_id)
    }

    pub fn playlist(&self, room_id: &str) -> RoomResult<Vec<Track>> {
        self.context
            .rooms
            .read_room(room_id, |room| room.playlist.clone())
    }
}

impl CoordinatorContext {
    pub fn emit(&self, recipients: Recipients, event: RoomEvent) {
        self.event_sender
            .send(OutboundEvent { recipients, event })
            .expect("event is sent");
    }

    /// Creates a free-standing context with its own event channel.
    /// Only used in tests.
    #[cfg(test)]
    pub fn for_test() -> (Self, EventReceiver) {
        let (event_sender, event_receiver) = unbounded();

        let context = Self {
            config: Config::default(),
            event_sender,
            rooms: Default::default(),
        };

        (context, event_receiver)
    }
}

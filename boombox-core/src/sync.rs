use std::time::Instant;

use crate::{ConnectionId, CoordinatorContext, Recipients, RoomEvent, RoomResult};

/// Reconciles a joining, reconnecting, or manually-resyncing client with the
/// room's live playback position.
///
/// The room itself is the authority: the reply is computed from the state the
/// coordinator already tracks, so no peer has to be online or well-behaved
/// for a resync to succeed.
pub struct SyncCoordinator {
    context: CoordinatorContext,
}

impl SyncCoordinator {
    pub fn new(context: &CoordinatorContext) -> Self {
        Self {
            context: context.clone(),
        }
    }

    pub fn sync_request(
        &self,
        room_id: &str,
        connection_id: ConnectionId,
        now: Instant,
    ) -> RoomResult<()> {
        self.context.rooms.read_room(room_id, |room| {
            self.context.emit(
                Recipients::Only(connection_id),
                RoomEvent::SyncResponse {
                    current_track_id: room.current_track_id.clone(),
                    playback_state: room.playback_state,
                    position: room.position_at(now),
                    loop_mode: room.loop_mode,
                },
            );
        })
    }
}

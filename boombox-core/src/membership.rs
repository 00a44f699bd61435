use std::time::Instant;

use log::info;

use crate::{
    random_string, ConnectionId, CoordinatorContext, Member, Recipients, RoomError, RoomEvent,
    RoomId, RoomResult,
};

/// Manages who is in a room and which member is host.
///
/// Membership mutation is serialized per room by the registry, so host
/// reassignment is deterministic: when the host leaves, the first remaining
/// member in insertion order is promoted.
pub struct MembershipManager {
    context: CoordinatorContext,
}

impl MembershipManager {
    pub fn new(context: &CoordinatorContext) -> Self {
        Self {
            context: context.clone(),
        }
    }

    /// Creates a room with the requesting connection as host and replies with
    /// the fresh room state. Generated ids that happen to collide are simply
    /// rerolled.
    pub fn create_room(
        &self,
        connection_id: ConnectionId,
        display_name: Option<String>,
        now: Instant,
    ) -> RoomResult<RoomId> {
        let display_name = self.display_name(display_name);
        let host = Member::host(connection_id, display_name.clone());

        let room_id = loop {
            let candidate = random_string(self.context.config.room_id_length);

            match self
                .context
                .rooms
                .create(candidate.clone(), host.clone(), now)
            {
                Ok(()) => break candidate,
                Err(RoomError::RoomAlreadyExists(_)) => continue,
                Err(other) => return Err(other),
            }
        };

        info!("Room {} created by {}", room_id, display_name);

        self.context.emit(
            Recipients::Only(connection_id),
            RoomEvent::RoomCreated {
                room_id: room_id.clone(),
                playlist: Vec::new(),
                loop_mode: Default::default(),
            },
        );

        Ok(room_id)
    }

    /// Adds a connection to a room, or updates its display name if it is
    /// already a member. The reply seeds the joiner with the authoritative
    /// playback position so its player can start in the right place.
    pub fn join(
        &self,
        room_id: &str,
        connection_id: ConnectionId,
        display_name: Option<String>,
        now: Instant,
    ) -> RoomResult<()> {
        let display_name = self.display_name(display_name);

        self.context.rooms.with_room(room_id, |room| {
            room.touch(now);

            match room.member_mut(connection_id) {
                Some(member) => member.display_name = display_name.clone(),
                None => room
                    .members
                    .push(Member::guest(connection_id, display_name.clone())),
            }

            info!("{} joined room {}", display_name, room.id);

            self.context.emit(
                Recipients::Only(connection_id),
                RoomEvent::RoomJoined {
                    room_id: room.id.clone(),
                    playlist: room.playlist.clone(),
                    loop_mode: room.loop_mode,
                    current_track_id: room.current_track_id.clone(),
                    playback_state: room.playback_state,
                    position: room.position_at(now),
                },
            );

            self.context.emit(
                Recipients::Some(room.member_ids_except(connection_id)),
                RoomEvent::UserJoined {
                    display_name: display_name.clone(),
                },
            );

            Ok(())
        })
    }

    /// Removes a connection from a room. Promotes a new host if needed, and
    /// lets the registry delete the room once it has no members left.
    pub fn leave(&self, room_id: &str, connection_id: ConnectionId, now: Instant) -> RoomResult<()> {
        self.context.rooms.with_room(room_id, |room| {
            let Some(index) = room
                .members
                .iter()
                .position(|m| m.connection_id == connection_id)
            else {
                return Ok(());
            };

            let member = room.members.remove(index);
            room.touch(now);

            if member.is_host {
                if let Some(successor) = room.members.first_mut() {
                    successor.is_host = true;
                }
            }

            info!("{} left room {}", member.display_name, room.id);

            if !room.members.is_empty() {
                self.context.emit(
                    Recipients::Some(room.member_ids()),
                    RoomEvent::UserLeft {
                        display_name: member.display_name,
                    },
                );
            }

            Ok(())
        })
    }

    /// Removes a disconnecting connection from every room it belongs to.
    pub fn disconnect(&self, connection_id: ConnectionId, now: Instant) {
        for room_id in self.context.rooms.rooms_of_connection(connection_id) {
            // The room may have been swept in the meantime, which is fine
            let _ = self.leave(&room_id, connection_id, now);
        }
    }

    fn display_name(&self, display_name: Option<String>) -> String {
        display_name
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| self.context.config.default_display_name.clone())
    }
}

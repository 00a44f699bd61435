use std::{
    sync::Arc,
    time::{Duration, Instant},
};

use dashmap::{mapref::entry::Entry, DashMap};
use log::info;
use parking_lot::Mutex;

use crate::{ConnectionId, Member, Room, RoomError, RoomId, RoomResult};

/// Owns every live room. The id→room map is the only state shared across
/// rooms; the rooms themselves are independent and never locked together.
#[derive(Debug, Default)]
pub struct RoomRegistry {
    rooms: DashMap<RoomId, Arc<RoomSlot>>,
}

/// A room behind its serialization lock. Commands addressed to the same room
/// hold the lock for their full duration, which is what makes command
/// handling single-writer per room.
#[derive(Debug)]
struct RoomSlot {
    state: Mutex<SlotState>,
}

/// A slot is tombstoned before it is removed from the map, so a handle
/// obtained concurrently observes a fully-deleted room rather than a
/// half-deleted one.
#[derive(Debug)]
enum SlotState {
    Open(Room),
    Closed,
}

impl RoomRegistry {
    /// Creates a room with the given host as sole member. The map entry is
    /// claimed atomically, so two concurrent creates for the same id cannot
    /// both succeed.
    pub fn create(&self, id: RoomId, host: Member, now: Instant) -> RoomResult<()> {
        match self.rooms.entry(id.clone()) {
            Entry::Occupied(_) => Err(RoomError::RoomAlreadyExists(id)),
            Entry::Vacant(entry) => {
                let room = Room::new(id, host, now);

                entry.insert(Arc::new(RoomSlot {
                    state: Mutex::new(SlotState::Open(room)),
                }));

                Ok(())
            }
        }
    }

    /// Runs a mutating command against a room under its lock.
    ///
    /// If the command leaves the room without members, the room is deleted
    /// before the lock is released, per the room lifecycle.
    pub fn with_room<T>(
        &self,
        id: &str,
        f: impl FnOnce(&mut Room) -> RoomResult<T>,
    ) -> RoomResult<T> {
        let slot = self.slot(id)?;
        let mut state = slot.state.lock();

        let room = match &mut *state {
            SlotState::Open(room) => room,
            SlotState::Closed => return Err(RoomError::RoomNotFound(id.to_string())),
        };

        let result = f(room)?;

        if room.members.is_empty() {
            info!("Room {} has no members left, deleting it", id);

            *state = SlotState::Closed;
            self.rooms.remove(id);
        }

        Ok(result)
    }

    /// Runs a read-only projection against a room under its lock.
    pub fn read_room<T>(&self, id: &str, f: impl FnOnce(&Room) -> T) -> RoomResult<T> {
        let slot = self.slot(id)?;
        let state = slot.state.lock();

        match &*state {
            SlotState::Open(room) => Ok(f(room)),
            SlotState::Closed => Err(RoomError::RoomNotFound(id.to_string())),
        }
    }

    /// Idempotent removal.
    pub fn delete(&self, id: &str) {
        let Ok(slot) = self.slot(id) else {
            return;
        };

        let mut state = slot.state.lock();

        *state = SlotState::Closed;
        self.rooms.remove(id);
    }

    pub fn exists(&self, id: &str) -> bool {
        self.read_room(id, |_| ()).is_ok()
    }

    /// Deletes every room that has been inactive longer than `max_inactive`.
    /// Returns how many rooms were deleted.
    ///
    /// Each room is checked under its own lock, so a sweep never races an
    /// in-flight command: the room is either swept before the command locks
    /// it (and the command sees `RoomNotFound`), or after it completes.
    pub fn sweep(&self, now: Instant, max_inactive: Duration) -> usize {
        let mut removed = 0;

        for (id, slot) in self.collect_slots() {
            let mut state = slot.state.lock();

            let stale = match &*state {
                SlotState::Open(room) => {
                    now.saturating_duration_since(room.last_activity) > max_inactive
                }
                SlotState::Closed => false,
            };

            if stale {
                info!("Sweeping inactive room {}", id);

                *state = SlotState::Closed;
                self.rooms.remove(&id);
                removed += 1;
            }
        }

        removed
    }

    /// Ids of every room the given connection is a member of. Used to fan a
    /// disconnect out into one leave per room.
    pub fn rooms_of_connection(&self, connection_id: ConnectionId) -> Vec<RoomId> {
        self.collect_slots()
            .into_iter()
            .filter_map(|(id, slot)| match &*slot.state.lock() {
                SlotState::Open(room) => room.member(connection_id).map(|_| id),
                SlotState::Closed => None,
            })
            .collect()
    }

    fn slot(&self, id: &str) -> RoomResult<Arc<RoomSlot>> {
        self.rooms
            .get(id)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| RoomError::RoomNotFound(id.to_string()))
    }

    // Snapshots the map so slot locks are never taken while map shards are
    // held, which would deadlock against removal under a slot lock.
    fn collect_slots(&self) -> Vec<(RoomId, Arc<RoomSlot>)> {
        self.rooms
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().clone()))
            .collect()
    }
}

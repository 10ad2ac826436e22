//! Registry of who is present on which document.
//!
//! The registry is the only cross-connection state of the session layer.
//! All rooms live behind one lock; every operation, including the
//! notifications it queues for room members, happens inside that critical
//! section so that rosters and presence events are never observed out of
//! order. A member whose outbound queue overflows is removed in the same
//! critical section, as if its transport had failed.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::{debug, info, warn};

use crate::models::{Presence, PresenceJoinedMessage, PresenceLeftMessage, RosterMessage, SendMessage, SessionError};
use crate::ws::outbox::Outbox;

struct Member {
    presence: Presence,
    outbox: Outbox,
}

/// Members of one document, in join order. Never empty while stored.
#[derive(Default)]
struct Room {
    members: Vec<Member>,
}

impl Room {
    fn position(&self, connection_id: &str) -> Option<usize> {
        self.members
            .iter()
            .position(|m| m.presence.connection_id == connection_id)
    }

    fn roster(&self) -> Vec<Presence> {
        self.members.iter().map(|m| m.presence.clone()).collect()
    }

    /// Queue `msg` for every member but `except`; returns how many took it.
    fn notify(&self, msg: &SendMessage, except: Option<&str>) -> usize {
        let mut delivered = 0;
        for member in &self.members {
            if Some(member.presence.connection_id.as_str()) == except {
                continue;
            }
            if member.outbox.send(msg.clone()) {
                delivered += 1;
            }
        }
        delivered
    }

    fn stalled(&self) -> Vec<String> {
        self.members
            .iter()
            .filter(|m| m.outbox.is_stalled())
            .map(|m| m.presence.connection_id.clone())
            .collect()
    }
}

#[derive(Default)]
struct Rooms {
    rooms: HashMap<String, Room>,
    /// connection id -> document id; a connection is in at most one room
    memberships: HashMap<String, String>,
}

impl Rooms {
    fn insert(&mut self, document_id: &str, presence: Presence, outbox: Outbox) -> Vec<Presence> {
        let connection_id = presence.connection_id.clone();
        if let Some(previous) = self.memberships.get(&connection_id).cloned() {
            self.remove(&previous, &connection_id);
        }

        let room = self.rooms.entry(document_id.to_string()).or_insert_with(|| {
            info!("Room created for document {}", document_id);
            Room::default()
        });

        let joined = SendMessage::PresenceJoined(PresenceJoinedMessage {
            presence: presence.clone(),
        });
        room.notify(&joined, None);

        room.members.push(Member {
            presence,
            outbox: outbox.clone(),
        });
        let roster = room.roster();
        outbox.send(SendMessage::Roster(RosterMessage {
            document_id: document_id.to_string(),
            presences: roster.clone(),
        }));

        self.memberships.insert(connection_id, document_id.to_string());
        self.drop_stalled(document_id);
        roster
    }

    fn remove(&mut self, document_id: &str, connection_id: &str) -> Option<Presence> {
        let removed = self.detach(document_id, connection_id);
        self.drop_stalled(document_id);
        removed
    }

    fn detach(&mut self, document_id: &str, connection_id: &str) -> Option<Presence> {
        let room = self.rooms.get_mut(document_id)?;
        let index = room.position(connection_id)?;
        let member = room.members.remove(index);

        if self.memberships.get(connection_id).map(String::as_str) == Some(document_id) {
            self.memberships.remove(connection_id);
        }

        let left = SendMessage::PresenceLeft(PresenceLeftMessage {
            connection_id: connection_id.to_string(),
        });
        room.notify(&left, None);

        if room.members.is_empty() {
            self.rooms.remove(document_id);
            info!("Cleaned up empty room: {}", document_id);
        }
        Some(member.presence)
    }

    /// Remove every member of the room whose outbox overflowed. Each removal
    /// notifies the rest, which may stall further members.
    fn drop_stalled(&mut self, document_id: &str) {
        loop {
            let stalled = match self.rooms.get(document_id) {
                Some(room) => room.stalled(),
                None => return,
            };
            if stalled.is_empty() {
                return;
            }
            for connection_id in stalled {
                if self.detach(document_id, &connection_id).is_some() {
                    let failure = SessionError::TransportFailure("outbound queue overflowed".to_string());
                    warn!("Evicted connection {} from document {}: {}", connection_id, document_id, failure);
                }
            }
        }
    }
}

/// Counts reported by diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RegistryStats {
    pub rooms: usize,
    pub presences: usize,
}

#[derive(Default)]
pub struct PresenceRegistry {
    inner: Mutex<Rooms>,
}

impl PresenceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Rooms> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Add a presence to the room of `document_id`, creating the room if needed.
    ///
    /// Existing members are sent `presence-joined` and the joiner's outbox is
    /// sent the roster. The returned roster includes the joined presence, in
    /// join order. A connection already present elsewhere is removed from its
    /// previous room first.
    pub fn join(&self, document_id: &str, presence: Presence, outbox: Outbox) -> Vec<Presence> {
        self.lock().insert(document_id, presence, outbox)
    }

    /// Remove a connection from a room, deleting the room when it empties.
    ///
    /// Remaining members are sent `presence-left`. Unknown connections and
    /// rooms are a no-op.
    pub fn leave(&self, document_id: &str, connection_id: &str) -> Option<Presence> {
        let removed = self.lock().remove(document_id, connection_id);
        if removed.is_none() {
            debug!("Connection {} was not present in room {}", connection_id, document_id);
        }
        removed
    }

    /// Remove a connection from whatever room it is in.
    pub fn evict(&self, connection_id: &str) -> Option<(String, Presence)> {
        let mut rooms = self.lock();
        let document_id = rooms.memberships.get(connection_id)?.clone();
        let presence = rooms.remove(&document_id, connection_id)?;
        Some((document_id, presence))
    }

    /// Current roster of a document, `None` when no room exists for it.
    pub fn snapshot(&self, document_id: &str) -> Option<Vec<Presence>> {
        self.lock().rooms.get(document_id).map(Room::roster)
    }

    pub fn room_of(&self, connection_id: &str) -> Option<String> {
        self.lock().memberships.get(connection_id).cloned()
    }

    /// Queue `msg` for every member of the room except `sender_connection_id`.
    ///
    /// Returns `None` when the sender is not a member of the room. Peers
    /// whose queue is full are evicted and not counted.
    pub(crate) fn broadcast_from(
        &self,
        document_id: &str,
        sender_connection_id: &str,
        msg: &SendMessage,
    ) -> Option<usize> {
        let mut rooms = self.lock();
        let room = rooms.rooms.get(document_id)?;
        room.position(sender_connection_id)?;
        let delivered = room.notify(msg, Some(sender_connection_id));
        rooms.drop_stalled(document_id);
        Some(delivered)
    }

    pub fn stats(&self) -> RegistryStats {
        let rooms = self.lock();
        RegistryStats {
            rooms: rooms.rooms.len(),
            presences: rooms.memberships.len(),
        }
    }
}

use std::collections::HashMap;

use tokio::sync::RwLock;
use tracing::debug;

use crate::{
    conn::{SharedSocket, Socket},
    types::{BroadcastError, SocketId},
};

type Members = HashMap<SocketId, SharedSocket>;

/// Thread-safe mapping from room name to its member sockets.
///
/// A room exists exactly while it has at least one member: it is created by
/// the first `join` naming it and removed when its last member leaves or it
/// is disbanded. The member count is always the size of the member set, read
/// under the same lock that guards mutation.
///
/// All critical sections are short and never call into a [`Socket`].
#[derive(Default)]
pub struct RoomRegistry {
    rooms: RwLock<HashMap<String, Members>>,
}

impl RoomRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self {
            rooms: RwLock::new(HashMap::new()),
        }
    }

    /// Adds `socket` to `room`, creating the room if needed.
    ///
    /// Joining a room the socket is already in leaves it unchanged.
    pub async fn join(&self, room: &str, socket: &SharedSocket) -> Result<(), BroadcastError> {
        let mut rooms = self.rooms.write().await;
        let members = rooms.entry(room.to_owned()).or_default();
        if members.contains_key(socket.id()) {
            return Ok(());
        }
        members.insert(socket.id().clone(), SharedSocket::clone(socket));
        debug!(room, socket_id = %socket.id(), members = members.len(), "socket joined room");
        Ok(())
    }

    /// Removes `socket` from `room`; a room left empty is dropped.
    ///
    /// Leaving a room the socket is not in, or a room that does not exist,
    /// is a no-op.
    pub async fn leave(&self, room: &str, socket: &dyn Socket) -> Result<(), BroadcastError> {
        let mut rooms = self.rooms.write().await;
        let Some(members) = rooms.get_mut(room) else {
            return Ok(());
        };
        if members.remove(socket.id()).is_none() {
            return Ok(());
        }
        debug!(room, socket_id = %socket.id(), members = members.len(), "socket left room");
        if members.is_empty() {
            rooms.remove(room);
            debug!(room, "room removed");
        }
        Ok(())
    }

    /// Removes `socket` from every room it belongs to and returns those
    /// room names.
    pub async fn leave_all(&self, socket: &dyn Socket) -> Vec<String> {
        let mut rooms = self.rooms.write().await;
        let mut left = Vec::new();
        rooms.retain(|name, members| {
            if members.remove(socket.id()).is_some() {
                left.push(name.clone());
            }
            !members.is_empty()
        });
        debug!(socket_id = %socket.id(), rooms = left.len(), "socket left all rooms");
        left
    }

    /// Number of sockets currently in `room`.
    pub async fn len(&self, room: &str) -> usize {
        let rooms = self.rooms.read().await;
        rooms.get(room).map_or(0, HashMap::len)
    }

    /// Whether the socket with `socket_id` is a member of `room`.
    pub async fn contains(&self, room: &str, socket_id: &SocketId) -> bool {
        let rooms = self.rooms.read().await;
        rooms
            .get(room)
            .is_some_and(|members| members.contains_key(socket_id))
    }

    /// Copies the members of `room`, minus `excluding`, into a new vector.
    ///
    /// The lock is released on return, so the snapshot can be used for I/O.
    pub async fn members(&self, room: &str, excluding: Option<&SocketId>) -> Vec<SharedSocket> {
        let rooms = self.rooms.read().await;
        let Some(members) = rooms.get(room) else {
            return Vec::new();
        };
        members
            .iter()
            .filter(|(id, _)| Some(*id) != excluding)
            .map(|(_, socket)| SharedSocket::clone(socket))
            .collect()
    }

    /// Names of every live room.
    pub async fn rooms(&self) -> Vec<String> {
        self.rooms.read().await.keys().cloned().collect()
    }

    /// Names of every room the socket with `socket_id` belongs to.
    pub async fn rooms_of(&self, socket_id: &SocketId) -> Vec<String> {
        let rooms = self.rooms.read().await;
        rooms
            .iter()
            .filter(|(_, members)| members.contains_key(socket_id))
            .map(|(name, _)| name.clone())
            .collect()
    }

    /// Removes `room` and all of its members, then runs each former
    /// member's [`Socket::leave`] hook.
    ///
    /// The hooks run after the lock is released, so a hook may re-enter the
    /// registry. A `join` racing with a disband is not excluded: it simply
    /// recreates the room once the removal is done.
    pub async fn disband(&self, room: &str) -> Vec<SharedSocket> {
        let removed = {
            let mut rooms = self.rooms.write().await;
            rooms.remove(room)
        };
        let Some(members) = removed else {
            return Vec::new();
        };

        let sockets: Vec<SharedSocket> = members.into_values().collect();
        debug!(room, members = sockets.len(), "room disbanded");
        for socket in &sockets {
            socket.leave(room).await;
        }
        sockets
    }
}

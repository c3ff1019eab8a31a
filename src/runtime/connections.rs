use std::collections::HashMap;

use tokio::sync::{mpsc, oneshot};
use tracing::warn;

use crate::domain::UserId;

use super::protocol::ServerMessage;
use super::LOG_TARGET;

/// Bounded per-client outbound queue (§5: "a per-client send must either
/// timeout or be buffered with a bounded queue whose overflow closes the
/// connection"). 64 frames is generous for chat/state traffic on one room.
pub const OUTBOUND_QUEUE_DEPTH: usize = 64;

/// WebSocket close code used to supersede a client's prior connection
/// (§4.6: "a second connection for the same user closes the first with
/// code 1011").
pub const CLOSE_SUPERSEDED: u16 = 1011;

struct Connection {
    sender: mpsc::Sender<ServerMessage>,
    /// Fired to tell the superseded connection's socket task to close itself
    /// with a specific code; the task owns the matching receiver.
    closer: oneshot::Sender<u16>,
}

pub struct ConnectionHandle {
    pub receiver: mpsc::Receiver<ServerMessage>,
    pub close_signal: oneshot::Receiver<u16>,
}

/// The set of connected sockets for one room, keyed by userId so a second
/// connection for the same user can be detected and the first superseded.
#[derive(Default)]
pub struct RoomConnections {
    connections: HashMap<UserId, Connection>,
}

impl RoomConnections {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a new connection for `user_id`. If one already existed, its
    /// close signal fires with `CLOSE_SUPERSEDED` so its socket task exits.
    pub fn register(&mut self, user_id: UserId) -> ConnectionHandle {
        let (sender, receiver) = mpsc::channel(OUTBOUND_QUEUE_DEPTH);
        let (closer, close_signal) = oneshot::channel();
        if let Some(previous) = self.connections.insert(user_id, Connection { sender, closer }) {
            let _ = previous.closer.send(CLOSE_SUPERSEDED);
        }
        ConnectionHandle { receiver, close_signal }
    }

    pub fn remove(&mut self, user_id: &UserId) {
        self.connections.remove(user_id);
    }

    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }

    pub fn contains(&self, user_id: &UserId) -> bool {
        self.connections.contains_key(user_id)
    }

    /// Sends one message to a single recipient, dropping the connection if
    /// its queue is full rather than blocking the room lock on a slow client.
    pub fn send_to(&mut self, user_id: &UserId, message: ServerMessage) {
        let Some(connection) = self.connections.get(user_id) else {
            return;
        };
        if connection.sender.try_send(message).is_err() {
            warn!(target: LOG_TARGET, %user_id, "outbound queue full or closed, dropping connection");
            self.connections.remove(user_id);
        }
    }

    /// Sends a per-recipient message built from `make` to every connection.
    /// Used for masked fan-out where each viewer's frame differs.
    pub fn broadcast_each(&mut self, mut make: impl FnMut(&UserId) -> ServerMessage) {
        let mut dead = Vec::new();
        for (user_id, connection) in self.connections.iter() {
            let message = make(user_id);
            if connection.sender.try_send(message).is_err() {
                dead.push(user_id.clone());
            }
        }
        for user_id in dead {
            warn!(target: LOG_TARGET, %user_id, "outbound queue full or closed, dropping connection");
            self.connections.remove(&user_id);
        }
    }

    /// Sends the same message to every connection.
    pub fn broadcast(&mut self, message: ServerMessage) {
        self.broadcast_each(|_| message.clone());
    }

    /// Closes and removes every connection, e.g. on room deletion.
    pub fn close_all(&mut self, message: ServerMessage) {
        self.broadcast(message);
        self.connections.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registering_twice_for_one_user_supersedes_the_first() {
        let mut conns = RoomConnections::new();
        let first = conns.register("alice".to_string());
        let _second = conns.register("alice".to_string());
        assert_eq!(first.close_signal.blocking_recv().unwrap(), CLOSE_SUPERSEDED);
        assert!(conns.contains(&"alice".to_string()));
    }

    #[test]
    fn remove_drops_connection_and_empties_room() {
        let mut conns = RoomConnections::new();
        conns.register("alice".to_string());
        assert!(!conns.is_empty());
        conns.remove(&"alice".to_string());
        assert!(conns.is_empty());
    }

    #[test]
    fn send_to_unknown_user_is_a_no_op() {
        let mut conns = RoomConnections::new();
        conns.send_to(&"ghost".to_string(), ServerMessage::RoomClosed);
    }

    #[test]
    fn overflowing_outbound_queue_drops_the_connection() {
        let mut conns = RoomConnections::new();
        conns.register("alice".to_string());
        for _ in 0..(OUTBOUND_QUEUE_DEPTH + 1) {
            conns.send_to(&"alice".to_string(), ServerMessage::RoomClosed);
        }
        assert!(!conns.contains(&"alice".to_string()));
    }

    #[test]
    fn broadcast_each_sends_distinct_message_per_recipient() {
        let mut conns = RoomConnections::new();
        let mut alice = conns.register("alice".to_string());
        let mut bob = conns.register("bob".to_string());
        conns.broadcast_each(|uid| ServerMessage::Error { message: uid.clone() });
        assert_eq!(
            alice.receiver.try_recv().unwrap(),
            ServerMessage::Error { message: "alice".to_string() }
        );
        assert_eq!(
            bob.receiver.try_recv().unwrap(),
            ServerMessage::Error { message: "bob".to_string() }
        );
    }

    #[test]
    fn close_all_empties_the_registry() {
        let mut conns = RoomConnections::new();
        conns.register("alice".to_string());
        conns.register("bob".to_string());
        conns.close_all(ServerMessage::RoomClosed);
        assert!(conns.is_empty());
    }
}

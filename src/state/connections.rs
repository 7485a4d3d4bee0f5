use std::collections::HashMap;
use tokio::sync::{mpsc, RwLock};
use ulid::Ulid;

use crate::protocol::ServerMessage;
use crate::types::{RoomCode, UserId};

pub type ConnectionId = Ulid;

struct Connection {
    user_id: UserId,
    room: Option<RoomCode>,
    outbox: mpsc::Sender<ServerMessage>,
}

/// Open sockets, which user they belong to and which room they are bound to.
/// A user may have several connections at once (tabs, devices).
#[derive(Default)]
pub struct ConnectionTable {
    connections: RwLock<HashMap<ConnectionId, Connection>>,
}

impl ConnectionTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn register(
        &self,
        user_id: &str,
        outbox: mpsc::Sender<ServerMessage>,
    ) -> ConnectionId {
        let id = Ulid::new();
        self.connections.write().await.insert(
            id,
            Connection {
                user_id: user_id.to_string(),
                room: None,
                outbox,
            },
        );
        id
    }

    /// Forget a connection; returns the room it was bound to
    pub async fn unregister(&self, id: ConnectionId) -> Option<RoomCode> {
        self.connections
            .write()
            .await
            .remove(&id)
            .and_then(|c| c.room)
    }

    /// Bind a connection to `room`; returns the room it was bound to before
    pub async fn bind(&self, id: ConnectionId, room: RoomCode) -> Option<RoomCode> {
        self.set_binding(id, Some(room)).await
    }

    /// Put back a binding returned by [`bind`](Self::bind)
    pub async fn set_binding(&self, id: ConnectionId, room: Option<RoomCode>) -> Option<RoomCode> {
        match self.connections.write().await.get_mut(&id) {
            Some(conn) => std::mem::replace(&mut conn.room, room),
            None => None,
        }
    }

    /// Detach every connection of `user_id` from `room`
    pub async fn unbind_user(&self, user_id: &str, room: &RoomCode) {
        for conn in self.connections.write().await.values_mut() {
            if conn.user_id == user_id && conn.room.as_ref() == Some(room) {
                conn.room = None;
            }
        }
    }

    pub async fn room_of(&self, id: ConnectionId) -> Option<RoomCode> {
        self.connections
            .read()
            .await
            .get(&id)
            .and_then(|c| c.room.clone())
    }

    /// Whether `user_id` has any connection other than `except` bound to `room`
    pub async fn user_has_other_binding(
        &self,
        user_id: &str,
        room: &RoomCode,
        except: ConnectionId,
    ) -> bool {
        self.connections.read().await.iter().any(|(id, c)| {
            *id != except && c.user_id == user_id && c.room.as_ref() == Some(room)
        })
    }

    /// Queue `message` on the connections of `user_id`; with a `scope`, only
    /// on those bound to that room.
    ///
    /// Never waits: a full or closed outbox drops the message for that
    /// connection only. Returns how many connections accepted it.
    pub async fn send_to_user(
        &self,
        user_id: &str,
        scope: Option<&RoomCode>,
        message: &ServerMessage,
    ) -> usize {
        let connections = self.connections.read().await;
        let mut delivered = 0;
        let targets = connections
            .iter()
            .filter(|(_, c)| c.user_id == user_id)
            .filter(|(_, c)| scope.is_none() || c.room.as_ref() == scope);
        for (id, conn) in targets {
            match conn.outbox.try_send(message.clone()) {
                Ok(()) => delivered += 1,
                Err(mpsc::error::TrySendError::Full(_)) => {
                    tracing::warn!(conn = %id, user = %user_id, "Outbox full, dropping message");
                }
                Err(mpsc::error::TrySendError::Closed(_)) => {
                    tracing::debug!(conn = %id, user = %user_id, "Outbox closed");
                }
            }
        }
        delivered
    }

    pub async fn len(&self) -> usize {
        self.connections.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.connections.read().await.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn msg() -> ServerMessage {
        ServerMessage::Error {
            code: "TEST".to_string(),
            msg: "hello".to_string(),
        }
    }

    #[tokio::test]
    async fn test_send_reaches_every_connection_of_user() {
        let table = ConnectionTable::new();
        let (tx1, mut rx1) = mpsc::channel(4);
        let (tx2, mut rx2) = mpsc::channel(4);
        let (tx3, mut rx3) = mpsc::channel(4);
        table.register("alice", tx1).await;
        table.register("alice", tx2).await;
        table.register("bob", tx3).await;

        assert_eq!(table.send_to_user("alice", None, &msg()).await, 2);
        assert!(rx1.try_recv().is_ok());
        assert!(rx2.try_recv().is_ok());
        assert!(rx3.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_full_outbox_drops_without_blocking() {
        let table = ConnectionTable::new();
        let (slow_tx, mut slow_rx) = mpsc::channel(1);
        let (fast_tx, mut fast_rx) = mpsc::channel(8);
        table.register("alice", slow_tx).await;
        table.register("alice", fast_tx).await;

        table.send_to_user("alice", None, &msg()).await;
        let delivered = table.send_to_user("alice", None, &msg()).await;
        assert_eq!(delivered, 1);

        assert!(slow_rx.try_recv().is_ok());
        assert!(slow_rx.try_recv().is_err());
        assert!(fast_rx.try_recv().is_ok());
        assert!(fast_rx.try_recv().is_ok());
    }

    #[tokio::test]
    async fn test_bindings() {
        let table = ConnectionTable::new();
        let code: RoomCode = "ABCD".parse().unwrap();
        let (tx, _rx) = mpsc::channel(1);
        let first = table.register("alice", tx.clone()).await;
        let second = table.register("alice", tx).await;

        table.bind(first, code.clone()).await;
        assert_eq!(table.room_of(first).await, Some(code.clone()));
        assert!(!table.user_has_other_binding("alice", &code, first).await);

        table.bind(second, code.clone()).await;
        assert!(table.user_has_other_binding("alice", &code, first).await);

        let other: RoomCode = "WXYZ".parse().unwrap();
        assert_eq!(table.bind(second, other).await, Some(code.clone()));
        assert!(!table.user_has_other_binding("alice", &code, first).await);
        table.set_binding(second, Some(code.clone())).await;
        assert!(table.user_has_other_binding("alice", &code, first).await);

        table.unbind_user("alice", &code).await;
        assert!(!table.user_has_other_binding("alice", &code, first).await);
        assert_eq!(table.unregister(first).await, None);
        assert_eq!(table.len().await, 1);
    }

    #[tokio::test]
    async fn test_scoped_send_skips_other_rooms() {
        let table = ConnectionTable::new();
        let here: RoomCode = "ABCD".parse().unwrap();
        let there: RoomCode = "WXYZ".parse().unwrap();
        let (tx1, mut rx1) = mpsc::channel(4);
        let (tx2, mut rx2) = mpsc::channel(4);
        let a = table.register("alice", tx1).await;
        let b = table.register("alice", tx2).await;
        table.bind(a, here.clone()).await;
        table.bind(b, there).await;

        assert_eq!(table.send_to_user("alice", Some(&here), &msg()).await, 1);
        assert!(rx1.try_recv().is_ok());
        assert!(rx2.try_recv().is_err());
    }
}

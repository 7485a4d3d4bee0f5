//! Outbound delivery and background room tasks.
//!
//! Deliveries are computed from a committed room snapshot and sent after the
//! room's exclusive section has been released, while the caller still holds
//! that commit's delivery turn.

use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;

use crate::protocol::ServerMessage;
use crate::room::{GameRoom, RoomView};
use crate::state::{AppState, ConnectionTable};
use crate::types::*;
use crate::ws::handlers;

/// One message for one user
#[derive(Debug, Clone)]
pub struct Delivery {
    pub user_id: UserId,
    /// Restrict to connections bound to this room; `None` reaches them all
    pub scope: Option<RoomCode>,
    pub message: ServerMessage,
}

impl Delivery {
    pub fn to_member(room: &RoomCode, user_id: &str, message: ServerMessage) -> Self {
        Self {
            user_id: user_id.to_string(),
            scope: Some(room.clone()),
            message,
        }
    }
}

/// One message per room member, each carrying the room as that member sees it
pub fn fan_out<F>(room: &GameRoom, mut render: F) -> Vec<Delivery>
where
    F: FnMut(&Player, RoomView) -> ServerMessage,
{
    room.players
        .iter()
        .map(|player| {
            let view = room.view_for(Some(player.user_id.as_str()));
            Delivery::to_member(&room.code, &player.user_id, render(player, view))
        })
        .collect()
}

/// Queue every delivery without waiting on slow connections
pub async fn deliver(connections: &ConnectionTable, deliveries: Vec<Delivery>) {
    for delivery in deliveries {
        let sent = connections
            .send_to_user(&delivery.user_id, delivery.scope.as_ref(), &delivery.message)
            .await;
        if sent == 0 {
            tracing::trace!(user = %delivery.user_id, "No live connection for delivery");
        }
    }
}

fn remaining(deadline: DateTime<Utc>) -> Duration {
    (deadline - Utc::now()).to_std().unwrap_or(Duration::ZERO)
}

/// Schedule the server-side end of `room`'s Day, if the room is in Day and
/// server timers are enabled
pub async fn arm_day_timer(state: &Arc<AppState>, room: &GameRoom) {
    if !state.config.server_timer {
        return;
    }
    let (Some(started_at), Some(deadline)) = (room.day_started_at, room.day_deadline()) else {
        return;
    };

    let delay = remaining(deadline);
    let code = room.code.clone();
    let task_state = state.clone();
    let task_code = code.clone();
    state
        .timers
        .arm(code.clone(), delay, async move {
            handlers::expire_day(&task_state, task_code, started_at).await;
        })
        .await;
    tracing::debug!(room = %code, delay_secs = delay.as_secs(), "Day timer armed");
}

/// Re-arm Day timers for rooms loaded from the store. Overdue Days expire
/// right away.
pub async fn resume_day_timers(state: &Arc<AppState>, rooms: &[GameRoom]) {
    for room in rooms.iter().filter(|r| r.phase == Phase::Day) {
        arm_day_timer(state, room).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    #[test]
    fn test_fan_out_renders_per_viewer() {
        let mut room = GameRoom::new("ABCD".parse().unwrap(), "a".to_string(), Default::default());
        room.join("b", MAX_PLAYERS).unwrap();
        room.players[0].role = Some(Role::Mayor);
        room.players[1].role = Some(Role::Villager);

        let deliveries = fan_out(&room, |_, view| ServerMessage::State { room: view });
        assert_eq!(deliveries.len(), 2);
        for delivery in &deliveries {
            let view = delivery.message.room().unwrap();
            let own = view
                .players
                .iter()
                .find(|p| p.user_id == delivery.user_id)
                .unwrap();
            assert!(own.role.is_some());
            assert!(view
                .players
                .iter()
                .filter(|p| p.user_id != delivery.user_id)
                .all(|p| p.role.is_none()));
        }
    }

    #[tokio::test]
    async fn test_deliver_uses_room_scope() {
        let connections = ConnectionTable::new();
        let code: RoomCode = "ABCD".parse().unwrap();
        let (tx, mut rx) = mpsc::channel(4);
        let (other_tx, mut other_rx) = mpsc::channel(4);
        let bound = connections.register("a", tx).await;
        connections.register("a", other_tx).await;
        connections.bind(bound, code.clone()).await;

        let message = ServerMessage::Error {
            code: "X".to_string(),
            msg: "y".to_string(),
        };
        deliver(
            &connections,
            vec![Delivery::to_member(&code, "a", message.clone())],
        )
        .await;

        assert_eq!(rx.try_recv().unwrap(), message);
        assert!(other_rx.try_recv().is_err());
    }
}

//! WebSocket message dispatch
//!
//! Each command runs its room transition inside `RoomRegistry::with_room`,
//! then fans the committed room out to the members, each rendered for that
//! member. Deliveries are queued before the commit is dropped, which keeps
//! them in commit order. Failures are returned to the caller and go only to
//! the requester.

use chrono::{DateTime, Utc};
use std::sync::Arc;

use crate::broadcast::{self, fan_out, Delivery};
use crate::error::{GameError, GameResult, Rejection};
use crate::protocol::{ClientMessage, ServerMessage};
use crate::room::{GameRoom, JoinOutcome, VoteOutcome};
use crate::state::{AppState, ConnectionId};
use crate::types::*;

/// Handle one client command. Returns a reply for the requester only when
/// the command was refused.
pub async fn handle_message(
    state: &Arc<AppState>,
    conn: ConnectionId,
    user_id: &str,
    msg: ClientMessage,
) -> Option<ServerMessage> {
    let room = msg.room_code().cloned();
    let result = match msg {
        ClientMessage::Create { settings } => {
            handle_create(state, conn, user_id, settings.unwrap_or_default()).await
        }
        ClientMessage::Join { room_code } => handle_join(state, conn, user_id, room_code).await,
        ClientMessage::Leave { room_code } => handle_leave(state, user_id, room_code).await,
        ClientMessage::UpdateSettings {
            room_code,
            settings,
        } => update_settings(state, user_id, &room_code, &settings)
            .await
            .map(|_| ()),
        ClientMessage::Start { room_code } => handle_start(state, user_id, room_code).await,
        ClientMessage::SelectWord { room_code, word } => {
            handle_select_word(state, user_id, room_code, word).await
        }
        ClientMessage::Question { room_code, text } => {
            handle_question(state, user_id, room_code, text).await
        }
        ClientMessage::MayorResponse {
            room_code,
            question_index,
            token,
        } => handle_mayor_response(state, user_id, room_code, question_index, token).await,
        ClientMessage::TimeUp { room_code } => handle_time_up(state, user_id, room_code).await,
        ClientMessage::Vote {
            room_code,
            target_user_id,
        } => handle_vote(state, user_id, room_code, target_user_id).await,
    };

    match result {
        Ok(()) => None,
        Err(err) => {
            tracing::debug!(user = %user_id, room = ?room, code = err.code(), "Command rejected: {}", err);
            Some(ServerMessage::error(&err))
        }
    }
}

/// Open a lobby hosted by `user_id`. Shared with the HTTP API.
pub async fn create_room(
    state: &Arc<AppState>,
    user_id: &str,
    patch: &SettingsPatch,
) -> GameResult<GameRoom> {
    let settings = GameSettings::default().merged(patch)?;
    state.registry.create(user_id, settings).await
}

async fn handle_create(
    state: &Arc<AppState>,
    conn: ConnectionId,
    user_id: &str,
    patch: SettingsPatch,
) -> GameResult<()> {
    let room = create_room(state, user_id, &patch).await?;
    let previous = state.connections.bind(conn, room.code.clone()).await;

    let view = room.view_for(Some(user_id));
    broadcast::deliver(
        &state.connections,
        vec![Delivery::to_member(
            &room.code,
            user_id,
            ServerMessage::State { room: view },
        )],
    )
    .await;

    if let Some(previous) = previous.filter(|previous| *previous != room.code) {
        release_room(state, conn, user_id, previous).await;
    }
    Ok(())
}

async fn handle_join(
    state: &Arc<AppState>,
    conn: ConnectionId,
    user_id: &str,
    code: RoomCode,
) -> GameResult<()> {
    let profile = state
        .directory
        .resolve_profiles(&[user_id.to_string()])
        .await
        .remove(user_id)
        .unwrap_or_else(|| Profile {
            display_name: user_id.to_string(),
            avatar_url: None,
        });

    // Bound before the room is locked, so a disconnect of another of this
    // user's connections sees this one once it holds the room
    let previous = state.connections.bind(conn, code.clone()).await;
    let max_players = state.config.max_players;
    let done = match state
        .registry
        .with_room(&code, |room| room.join(user_id, max_players))
        .await
    {
        Ok(done) => done,
        Err(err) => {
            state.connections.set_binding(conn, previous).await;
            return Err(err);
        }
    };

    let reconnected = done.value == JoinOutcome::Reconnected;
    tracing::info!(room = %code, user = %user_id, reconnected, "Player joined");

    let deliveries = fan_out(&done.room, |_, view| ServerMessage::PlayerJoined {
        user_id: user_id.to_string(),
        profile: profile.clone(),
        reconnected,
        room: view,
    });
    broadcast::deliver(&state.connections, deliveries).await;
    drop(done);

    if let Some(previous) = previous.filter(|previous| *previous != code) {
        release_room(state, conn, user_id, previous).await;
    }
    Ok(())
}

async fn handle_leave(state: &Arc<AppState>, user_id: &str, code: RoomCode) -> GameResult<()> {
    let done = state
        .registry
        .with_room(&code, |room| room.leave(user_id))
        .await?;
    let outcome = &done.value;
    tracing::info!(room = %code, user = %user_id, new_host = ?outcome.new_host, "Player left");

    let remaining = (!outcome.room_empty).then_some(&done.room);
    let mut deliveries = match remaining {
        Some(room) => fan_out(room, |_, view| ServerMessage::PlayerLeft {
            user_id: user_id.to_string(),
            new_host: outcome.new_host.clone(),
            room: Some(view),
        }),
        None => Vec::new(),
    };
    // The leaver is no longer a member but still hears about it
    deliveries.push(Delivery {
        user_id: user_id.to_string(),
        scope: Some(code.clone()),
        message: ServerMessage::PlayerLeft {
            user_id: user_id.to_string(),
            new_host: outcome.new_host.clone(),
            room: remaining.map(|room| room.view_for(Some(user_id))),
        },
    });

    broadcast::deliver(&state.connections, deliveries).await;
    state.connections.unbind_user(user_id, &code).await;
    Ok(())
}

/// Host changes lobby settings. Shared with the HTTP API.
pub async fn update_settings(
    state: &Arc<AppState>,
    user_id: &str,
    code: &RoomCode,
    patch: &SettingsPatch,
) -> GameResult<GameRoom> {
    let done = state
        .registry
        .with_room(code, |room| room.update_settings(user_id, patch))
        .await?;
    tracing::info!(room = %code, user = %user_id, "Settings updated");

    let deliveries = fan_out(&done.room, |_, view| ServerMessage::SettingsUpdated { room: view });
    broadcast::deliver(&state.connections, deliveries).await;
    Ok(done.into_parts().1)
}

async fn handle_start(state: &Arc<AppState>, user_id: &str, code: RoomCode) -> GameResult<()> {
    let words = state.words;
    let done = state
        .registry
        .with_room(&code, |room| {
            let mut rng = rand::rng();
            room.start(user_id, &words, &mut rng)
        })
        .await?;
    tracing::info!(room = %code, user = %user_id, players = done.room.players.len(), "Game started");

    let deliveries = fan_out(&done.room, |player, view| ServerMessage::Started {
        role: player.role,
        room: view,
    });
    broadcast::deliver(&state.connections, deliveries).await;
    Ok(())
}

async fn handle_select_word(
    state: &Arc<AppState>,
    user_id: &str,
    code: RoomCode,
    word: String,
) -> GameResult<()> {
    let done = state
        .registry
        .with_room(&code, |room| room.select_word(user_id, &word))
        .await?;
    tracing::info!(room = %code, user = %user_id, "Word selected, day started");

    let day_duration_seconds = done.room.settings.day_duration_seconds;
    let deliveries = fan_out(&done.room, |_, view| ServerMessage::DayStart {
        day_duration_seconds,
        room: view,
    });
    broadcast::deliver(&state.connections, deliveries).await;
    broadcast::arm_day_timer(state, &done.room).await;
    Ok(())
}

async fn handle_question(
    state: &Arc<AppState>,
    user_id: &str,
    code: RoomCode,
    text: String,
) -> GameResult<()> {
    let done = state
        .registry
        .with_room(&code, |room| room.ask_question(user_id, &text))
        .await?;
    let asked = &done.value;
    tracing::info!(room = %code, user = %user_id, index = asked.index, is_guess = asked.is_guess, "Question asked");

    let question = done
        .room
        .questions
        .get(asked.index)
        .cloned()
        .ok_or(GameError::QuestionNotFound(asked.index))?;
    let mut deliveries = fan_out(&done.room, |_, view| ServerMessage::NewQuestion {
        question_index: asked.index,
        question: question.clone(),
        room: view,
    });

    if asked.is_guess {
        state.timers.cancel(&code).await;
        deliveries.extend(fan_out(&done.room, |_, view| ServerMessage::WordGuessed {
            guessed_by: user_id.to_string(),
            room: view,
        }));
        deliveries.extend(fan_out(&done.room, |_, view| ServerMessage::VotingStart {
            vote_mode: VoteMode::FindSeer,
            room: view,
        }));
    }
    broadcast::deliver(&state.connections, deliveries).await;
    Ok(())
}

async fn handle_mayor_response(
    state: &Arc<AppState>,
    user_id: &str,
    code: RoomCode,
    question_index: usize,
    token: TokenKind,
) -> GameResult<()> {
    let done = state
        .registry
        .with_room(&code, |room| room.mayor_respond(user_id, question_index, token))
        .await?;
    tracing::info!(room = %code, user = %user_id, question_index, ?token, "Mayor responded");

    let remaining = done.room.token_budget;
    let deliveries = fan_out(&done.room, |_, view| ServerMessage::TokenResponse {
        question_index,
        token,
        remaining,
        room: view,
    });
    broadcast::deliver(&state.connections, deliveries).await;
    Ok(())
}

fn voting_started(room: &GameRoom) -> Vec<Delivery> {
    let vote_mode = room.vote_mode.unwrap_or(VoteMode::FindWerewolf);
    fan_out(room, |_, view| ServerMessage::VotingStart {
        vote_mode,
        room: view,
    })
}

async fn handle_time_up(state: &Arc<AppState>, user_id: &str, code: RoomCode) -> GameResult<()> {
    match state
        .registry
        .with_room(&code, |room| room.time_up(user_id))
        .await
    {
        Ok(done) => {
            state.timers.cancel(&code).await;
            tracing::info!(room = %code, user = %user_id, "Time up, voting started");
            broadcast::deliver(&state.connections, voting_started(&done.room)).await;
            Ok(())
        }
        // Late countdown from a client after the Day already ended
        Err(GameError::Precondition(Rejection::WrongPhase { actual, .. })) if actual > Phase::Day => {
            tracing::debug!(room = %code, user = %user_id, phase = ?actual, "Ignoring late time_up");
            Ok(())
        }
        Err(err) => Err(err),
    }
}

/// Server-side end of the Day that began at `started_at`
pub async fn expire_day(state: &Arc<AppState>, code: RoomCode, started_at: DateTime<Utc>) {
    state.timers.forget(&code).await;
    match state
        .registry
        .with_room(&code, |room| room.expire_day(started_at))
        .await
    {
        Ok(done) => {
            tracing::info!(room = %code, "Day timer expired, voting started");
            broadcast::deliver(&state.connections, voting_started(&done.room)).await;
        }
        Err(err) => {
            tracing::debug!(room = %code, "Day timer no longer applies: {}", err);
        }
    }
}

async fn handle_vote(
    state: &Arc<AppState>,
    user_id: &str,
    code: RoomCode,
    target: UserId,
) -> GameResult<()> {
    let done = state
        .registry
        .with_room(&code, |room| room.cast_vote(user_id, &target))
        .await?;
    let room = &done.room;
    tracing::info!(room = %code, user = %user_id, target = %target, "Vote cast");

    let (votes_count, total_voters) = match &done.value {
        VoteOutcome::Pending { cast, eligible } => (*cast, *eligible),
        VoteOutcome::Decided(_) => (room.votes.len(), room.votes.len()),
    };
    let mut deliveries = fan_out(room, |_, view| ServerMessage::VoteCast {
        voter_id: user_id.to_string(),
        votes_count,
        total_voters,
        room: view,
    });

    if let VoteOutcome::Decided(resolution) = &done.value {
        tracing::info!(
            room = %code,
            winner = ?resolution.winner,
            eliminated = ?resolution.eliminated,
            "Game over"
        );
        deliveries.extend(fan_out(room, |_, view| ServerMessage::GameOver {
            winner: resolution.winner,
            eliminated: resolution.eliminated.clone(),
            vote_counts: resolution.counts.clone(),
            room: view,
        }));
    }
    broadcast::deliver(&state.connections, deliveries).await;
    Ok(())
}

/// Connection closed. The player stays on the roster, marked offline, unless
/// another of their connections is still in the room.
pub async fn handle_disconnect(state: &Arc<AppState>, conn: ConnectionId, user_id: &str) {
    if let Some(code) = state.connections.unregister(conn).await {
        release_room(state, conn, user_id, code).await;
    }
}

/// `conn` no longer serves `user_id` in `code`: mark the player offline there
/// if none of their other connections is bound to it.
async fn release_room(state: &Arc<AppState>, conn: ConnectionId, user_id: &str, code: RoomCode) {
    let guard = match state.registry.lock(&code).await {
        Ok(guard) => guard,
        Err(err) => {
            tracing::debug!(room = %code, user = %user_id, "Disconnect not recorded: {}", err);
            return;
        }
    };
    // Checked while holding the room: a join binds before it locks the room
    if guard.room().player(user_id).is_none()
        || state
            .connections
            .user_has_other_binding(user_id, &code, conn)
            .await
    {
        return;
    }

    match state
        .registry
        .apply(guard, |room| room.set_connected(user_id, false))
        .await
    {
        Ok(done) if done.value => {
            tracing::info!(room = %code, user = %user_id, "Player disconnected");
            let deliveries = fan_out(&done.room, |_, view| ServerMessage::PlayerDisconnected {
                user_id: user_id.to_string(),
                room: view,
            });
            broadcast::deliver(&state.connections, deliveries).await;
        }
        Ok(_) => {}
        Err(err) => {
            tracing::debug!(room = %code, user = %user_id, "Disconnect not recorded: {}", err);
        }
    }
}

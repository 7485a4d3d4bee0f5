//! The per-room state machine.
//!
//! ```text
//! Lobby ──start──▶ Night ──select_word──▶ Day ──guess──────▶ Voting ──last vote──▶ Ended
//!                                          └──time_up──────▶ (FindSeer / FindWerewolf)
//! ```
//!
//! Every transition validates all of its preconditions before touching any
//! field, so a rejected command leaves the room exactly as it was. Nothing here
//! does I/O; callers hold the room's exclusive section while invoking these.

mod day;
mod lobby;
mod view;
mod vote;

pub use day::Asked;
pub use lobby::{JoinOutcome, LeaveOutcome};
pub use view::{PlayerView, RoomView};
pub use vote::{Resolution, VoteOutcome};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{GameResult, Rejection};
use crate::types::*;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GameRoom {
    pub code: RoomCode,
    pub host: UserId,
    /// Join order is significant: host promotion and role seating follow it
    pub players: Vec<Player>,
    pub phase: Phase,
    pub secret_word: Option<String>,
    pub word_options: Vec<String>,
    pub token_budget: TokenBudget,
    pub token_log: Vec<TokenUsage>,
    pub questions: Vec<Question>,
    pub word_guessed_by: Option<UserId>,
    pub votes: Vec<Vote>,
    pub vote_mode: Option<VoteMode>,
    pub winner: Option<Winner>,
    pub eliminated: Option<UserId>,
    pub settings: GameSettings,
    pub day_started_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    /// Incremented on every applied transition
    pub version: u64,
}

impl GameRoom {
    /// A fresh lobby with the creator as host and only player
    pub fn new(code: RoomCode, host: UserId, settings: GameSettings) -> Self {
        Self {
            code,
            players: vec![Player::new(host.clone())],
            host,
            phase: Phase::Lobby,
            secret_word: None,
            word_options: Vec::new(),
            token_budget: settings.token_counts,
            token_log: Vec::new(),
            questions: Vec::new(),
            word_guessed_by: None,
            votes: Vec::new(),
            vote_mode: None,
            winner: None,
            eliminated: None,
            settings,
            day_started_at: None,
            created_at: Utc::now(),
            version: 1,
        }
    }

    pub fn player(&self, user_id: &str) -> Option<&Player> {
        self.players.iter().find(|p| p.user_id == user_id)
    }

    fn player_mut(&mut self, user_id: &str) -> Option<&mut Player> {
        self.players.iter_mut().find(|p| p.user_id == user_id)
    }

    pub fn role_of(&self, user_id: &str) -> Option<Role> {
        self.player(user_id).and_then(|p| p.role)
    }

    pub fn is_host(&self, user_id: &str) -> bool {
        self.host == user_id
    }

    pub fn player_ids(&self) -> Vec<UserId> {
        self.players.iter().map(|p| p.user_id.clone()).collect()
    }

    /// A lobby nobody is left in; the registry drops these
    pub fn is_abandoned(&self) -> bool {
        self.phase == Phase::Lobby && self.players.is_empty()
    }

    /// When the current Day runs out, if the room is in Day
    pub fn day_deadline(&self) -> Option<DateTime<Utc>> {
        if self.phase != Phase::Day {
            return None;
        }
        self.day_started_at
            .map(|start| start + chrono::Duration::seconds(i64::from(self.settings.day_duration_seconds)))
    }

    fn ensure_phase(&self, expected: Phase) -> GameResult<()> {
        if self.phase != expected {
            return Err(Rejection::WrongPhase {
                expected,
                actual: self.phase,
            }
            .into());
        }
        Ok(())
    }

    fn ensure_host(&self, actor: &str) -> GameResult<()> {
        if !self.is_host(actor) {
            return Err(Rejection::NotHost.into());
        }
        Ok(())
    }

    fn ensure_player(&self, actor: &str) -> GameResult<&Player> {
        self.player(actor).ok_or_else(|| Rejection::NotInRoom.into())
    }

    fn ensure_mayor(&self, actor: &str) -> GameResult<()> {
        if self.ensure_player(actor)?.role != Some(Role::Mayor) {
            return Err(Rejection::NotMayor.into());
        }
        Ok(())
    }

    fn bump(&mut self) {
        self.version += 1;
    }
}

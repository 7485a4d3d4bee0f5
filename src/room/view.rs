//! Viewer-specific redaction of a room.
//!
//! Every outbound path renders rooms through [`GameRoom::view_for`]; nothing
//! serializes a `GameRoom` directly to a client.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::GameRoom;
use crate::types::*;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PlayerView {
    pub user_id: UserId,
    /// Only the viewer's own role until the game ends
    pub role: Option<Role>,
    pub connected: bool,
}

/// What one viewer is allowed to see of a room
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RoomView {
    pub code: RoomCode,
    pub host: UserId,
    pub players: Vec<PlayerView>,
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
    pub day_deadline: Option<DateTime<Utc>>,
    pub version: u64,
}

impl GameRoom {
    /// Project the room for `viewer`. `None` is an anonymous onlooker.
    pub fn view_for(&self, viewer: Option<&str>) -> RoomView {
        let ended = self.phase == Phase::Ended;
        let viewer_role = viewer.and_then(|id| self.role_of(id));

        let players = self
            .players
            .iter()
            .map(|p| PlayerView {
                user_id: p.user_id.clone(),
                role: if ended || viewer == Some(p.user_id.as_str()) {
                    p.role
                } else {
                    None
                },
                connected: p.connected,
            })
            .collect();

        let secret_word = if ended || viewer_role.is_some_and(Role::knows_word) {
            self.secret_word.clone()
        } else {
            None
        };

        let word_options = if viewer_role == Some(Role::Mayor) && self.phase == Phase::Night {
            self.word_options.clone()
        } else {
            Vec::new()
        };

        RoomView {
            code: self.code.clone(),
            host: self.host.clone(),
            players,
            phase: self.phase,
            secret_word,
            word_options,
            token_budget: self.token_budget,
            token_log: self.token_log.clone(),
            questions: self.questions.clone(),
            word_guessed_by: self.word_guessed_by.clone(),
            votes: self.votes.clone(),
            vote_mode: self.vote_mode,
            winner: self.winner,
            eliminated: self.eliminated.clone(),
            settings: self.settings.clone(),
            day_started_at: self.day_started_at,
            day_deadline: self.day_deadline(),
            version: self.version,
        }
    }
}

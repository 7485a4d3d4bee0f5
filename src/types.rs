use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::GameError;

/// Opaque user identifier issued by the external auth service
pub type UserId = String;

/// Length of every room code on the wire
pub const ROOM_CODE_LENGTH: usize = 4;

/// Hard cap on the roster size (the role table is only defined up to eight seats)
pub const MAX_PLAYERS: usize = 8;

/// Minimum roster needed to start a game
pub const MIN_PLAYERS: usize = 4;

/// Four uppercase ASCII letters. Input is case-insensitive and normalized on parse.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RoomCode(String);

impl RoomCode {
    /// Caller guarantees `code` is already four uppercase ASCII letters
    pub(crate) fn from_generated(code: String) -> Self {
        Self(code)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for RoomCode {
    type Err = GameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.len() != ROOM_CODE_LENGTH || !trimmed.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(GameError::Validation(format!(
                "room code must be {} letters, got {:?}",
                ROOM_CODE_LENGTH, s
            )));
        }
        Ok(Self(trimmed.to_ascii_uppercase()))
    }
}

impl TryFrom<String> for RoomCode {
    type Error = GameError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<RoomCode> for String {
    fn from(code: RoomCode) -> Self {
        code.0
    }
}

impl fmt::Display for RoomCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Phase {
    Lobby,
    Night,
    Day,
    Voting,
    Ended,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Mayor,
    Seer,
    Werewolf,
    Villager,
}

impl Role {
    /// Roles that learn the secret word once it is chosen
    pub fn knows_word(self) -> bool {
        matches!(self, Role::Mayor | Role::Seer | Role::Werewolf)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub enum TokenKind {
    Yes,
    No,
    Maybe,
    SoClose,
}

impl TokenKind {
    pub const ALL: [TokenKind; 4] = [
        TokenKind::Yes,
        TokenKind::No,
        TokenKind::Maybe,
        TokenKind::SoClose,
    ];
}

/// Remaining (or configured) count per token kind
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TokenBudget {
    pub yes: u32,
    pub no: u32,
    pub maybe: u32,
    pub so_close: u32,
}

impl Default for TokenBudget {
    fn default() -> Self {
        Self {
            yes: 10,
            no: 10,
            maybe: 3,
            so_close: 1,
        }
    }
}

impl TokenBudget {
    pub fn get(&self, kind: TokenKind) -> u32 {
        match kind {
            TokenKind::Yes => self.yes,
            TokenKind::No => self.no,
            TokenKind::Maybe => self.maybe,
            TokenKind::SoClose => self.so_close,
        }
    }

    fn slot(&mut self, kind: TokenKind) -> &mut u32 {
        match kind {
            TokenKind::Yes => &mut self.yes,
            TokenKind::No => &mut self.no,
            TokenKind::Maybe => &mut self.maybe,
            TokenKind::SoClose => &mut self.so_close,
        }
    }

    /// Take one token of `kind`. Returns false when none are left.
    pub fn spend(&mut self, kind: TokenKind) -> bool {
        let slot = self.slot(kind);
        if *slot == 0 {
            return false;
        }
        *slot -= 1;
        true
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GameSettings {
    pub day_duration_seconds: u32,
    pub token_counts: TokenBudget,
    pub word_category: String,
    pub difficulty: Difficulty,
}

impl Default for GameSettings {
    fn default() -> Self {
        Self {
            day_duration_seconds: 240,
            token_counts: TokenBudget::default(),
            word_category: "general".to_string(),
            difficulty: Difficulty::Medium,
        }
    }
}

/// Partial settings sent by the host; absent fields keep their current value
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct SettingsPatch {
    #[serde(default)]
    pub day_duration_seconds: Option<u32>,
    #[serde(default)]
    pub token_counts: Option<TokenBudget>,
    #[serde(default)]
    pub word_category: Option<String>,
    #[serde(default)]
    pub difficulty: Option<Difficulty>,
}

impl GameSettings {
    /// Merge a patch into a copy of these settings, rejecting nonsensical values
    pub fn merged(&self, patch: &SettingsPatch) -> Result<GameSettings, GameError> {
        let mut next = self.clone();
        if let Some(seconds) = patch.day_duration_seconds {
            if seconds == 0 {
                return Err(GameError::Validation(
                    "day_duration_seconds must be positive".to_string(),
                ));
            }
            next.day_duration_seconds = seconds;
        }
        if let Some(tokens) = patch.token_counts {
            next.token_counts = tokens;
        }
        if let Some(ref category) = patch.word_category {
            let category = category.trim();
            if category.is_empty() {
                return Err(GameError::Validation(
                    "word_category must not be empty".to_string(),
                ));
            }
            next.word_category = category.to_string();
        }
        if let Some(difficulty) = patch.difficulty {
            next.difficulty = difficulty;
        }
        Ok(next)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Player {
    pub user_id: UserId,
    pub role: Option<Role>,
    pub connected: bool,
}

impl Player {
    pub fn new(user_id: UserId) -> Self {
        Self {
            user_id,
            role: None,
            connected: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Question {
    pub asker: UserId,
    pub text: String,
    pub response: Option<TokenKind>,
    pub is_guess: bool,
    pub asked_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TokenUsage {
    pub question_index: usize,
    pub token: TokenKind,
    pub used_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Vote {
    pub voter: UserId,
    pub target: UserId,
    pub cast_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum VoteMode {
    /// Word was guessed; werewolves try to name the seer
    FindSeer,
    /// Time ran out; everyone else tries to name a werewolf
    FindWerewolf,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Winner {
    Village,
    Werewolf,
}

/// Display data resolved from the user directory
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Profile {
    pub display_name: String,
    pub avatar_url: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_room_code_normalizes_case() {
        let code: RoomCode = " abCd ".parse().unwrap();
        assert_eq!(code.as_str(), "ABCD");
    }

    #[test]
    fn test_room_code_rejects_bad_shapes() {
        for bad in ["ABC", "ABCDE", "AB1D", "", "ÄBCD"] {
            let result = bad.parse::<RoomCode>();
            assert!(
                matches!(result, Err(GameError::Validation(_))),
                "{bad:?} should be rejected"
            );
        }
    }

    #[test]
    fn test_room_code_deserializes_through_validation() {
        let code: RoomCode = serde_json::from_str("\"wxyz\"").unwrap();
        assert_eq!(code.to_string(), "WXYZ");
        assert!(serde_json::from_str::<RoomCode>("\"TOOLONG\"").is_err());
    }

    #[test]
    fn test_token_kind_wire_names() {
        assert_eq!(
            serde_json::to_string(&TokenKind::SoClose).unwrap(),
            "\"soClose\""
        );
        let kind: TokenKind = serde_json::from_str("\"maybe\"").unwrap();
        assert_eq!(kind, TokenKind::Maybe);
        assert!(serde_json::from_str::<TokenKind>("\"perhaps\"").is_err());
    }

    #[test]
    fn test_token_budget_spend_stops_at_zero() {
        let mut budget = TokenBudget {
            yes: 1,
            no: 0,
            maybe: 0,
            so_close: 0,
        };
        assert!(budget.spend(TokenKind::Yes));
        assert!(!budget.spend(TokenKind::Yes));
        assert!(!budget.spend(TokenKind::No));
        assert_eq!(budget.get(TokenKind::Yes), 0);
    }

    #[test]
    fn test_settings_merge_keeps_absent_fields() {
        let base = GameSettings::default();
        let patch = SettingsPatch {
            day_duration_seconds: Some(120),
            ..Default::default()
        };
        let merged = base.merged(&patch).unwrap();
        assert_eq!(merged.day_duration_seconds, 120);
        assert_eq!(merged.word_category, "general");
        assert_eq!(merged.token_counts, TokenBudget::default());
    }

    #[test]
    fn test_settings_merge_rejects_zero_duration() {
        let patch = SettingsPatch {
            day_duration_seconds: Some(0),
            ..Default::default()
        };
        assert!(GameSettings::default().merged(&patch).is_err());
    }
}

//! Error taxonomy shared by the state machine, registry and gateway.

use crate::types::{Phase, RoomCode, TokenKind};

/// Why a well-formed command was refused. Only used to pick the client-facing
/// code and message; control flow treats every variant the same.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum Rejection {
    #[error("not allowed during {actual:?}, requires {expected:?}")]
    WrongPhase { expected: Phase, actual: Phase },

    #[error("only the host can do that")]
    NotHost,

    #[error("only the mayor can do that")]
    NotMayor,

    #[error("you are not in this game")]
    NotInRoom,

    #[error("room is full ({0} players)")]
    RoomFull(usize),

    #[error("game already started")]
    GameInProgress,

    #[error("need at least {needed} players, have {have}")]
    NotEnoughPlayers { needed: usize, have: usize },

    #[error("no {0:?} tokens left")]
    TokensExhausted(TokenKind),

    #[error("question {0} already has a response")]
    AlreadyAnswered(usize),

    #[error("word is not one of the offered options")]
    InvalidWord,

    #[error("you cannot vote in this round")]
    IneligibleVoter,

    #[error("that player cannot be voted for")]
    InvalidTarget,
}

impl Rejection {
    pub fn code(&self) -> &'static str {
        match self {
            Rejection::WrongPhase { .. } => "WRONG_PHASE",
            Rejection::NotHost => "NOT_HOST",
            Rejection::NotMayor => "NOT_MAYOR",
            Rejection::NotInRoom => "NOT_IN_ROOM",
            Rejection::RoomFull(_) => "ROOM_FULL",
            Rejection::GameInProgress => "GAME_IN_PROGRESS",
            Rejection::NotEnoughPlayers { .. } => "NOT_ENOUGH_PLAYERS",
            Rejection::TokensExhausted(_) => "TOKENS_EXHAUSTED",
            Rejection::AlreadyAnswered(_) => "ALREADY_ANSWERED",
            Rejection::InvalidWord => "INVALID_WORD",
            Rejection::IneligibleVoter => "INELIGIBLE_VOTER",
            Rejection::InvalidTarget => "INVALID_TARGET",
        }
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum GameError {
    #[error("room {0} not found")]
    RoomNotFound(RoomCode),

    #[error("question {0} not found")]
    QuestionNotFound(usize),

    #[error(transparent)]
    Precondition(#[from] Rejection),

    #[error("could not allocate a unique room code after {0} attempts")]
    Exhausted(u32),

    #[error("invalid request: {0}")]
    Validation(String),

    #[error("failed to persist room: {0}")]
    Storage(String),
}

impl GameError {
    /// Stable code carried in the error envelope
    pub fn code(&self) -> &'static str {
        match self {
            GameError::RoomNotFound(_) => "ROOM_NOT_FOUND",
            GameError::QuestionNotFound(_) => "QUESTION_NOT_FOUND",
            GameError::Precondition(rejection) => rejection.code(),
            GameError::Exhausted(_) => "ROOM_CODES_EXHAUSTED",
            GameError::Validation(_) => "VALIDATION",
            GameError::Storage(_) => "STORAGE",
        }
    }

    /// Infrastructure failures the caller may retry with backoff
    pub fn is_retryable(&self) -> bool {
        matches!(self, GameError::Exhausted(_) | GameError::Storage(_))
    }

    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            GameError::RoomNotFound(_) | GameError::QuestionNotFound(_)
        )
    }
}

pub type GameResult<T> = Result<T, GameError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_precondition_uses_rejection_code() {
        let err: GameError = Rejection::NotHost.into();
        assert_eq!(err.code(), "NOT_HOST");
        assert_eq!(err.to_string(), "only the host can do that");
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_only_infrastructure_errors_are_retryable() {
        assert!(GameError::Exhausted(100).is_retryable());
        assert!(GameError::Storage("disk full".into()).is_retryable());
        assert!(!GameError::Validation("bad".into()).is_retryable());
        assert!(!GameError::QuestionNotFound(3).is_retryable());
    }
}

use crate::error::GameError;
use crate::room::RoomView;
use crate::types::*;
use serde::{Deserialize, Serialize};

pub const PROTOCOL_VERSION: &str = "1.0";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "t", rename_all = "snake_case")]
pub enum ClientMessage {
    Create {
        #[serde(default)]
        settings: Option<SettingsPatch>,
    },
    Join {
        room_code: RoomCode,
    },
    Leave {
        room_code: RoomCode,
    },
    UpdateSettings {
        room_code: RoomCode,
        settings: SettingsPatch,
    },
    // Host-only
    Start {
        room_code: RoomCode,
    },
    // Mayor-only
    SelectWord {
        room_code: RoomCode,
        word: String,
    },
    Question {
        room_code: RoomCode,
        text: String,
    },
    // Mayor-only
    MayorResponse {
        room_code: RoomCode,
        question_index: usize,
        token: TokenKind,
    },
    // Host-only
    TimeUp {
        room_code: RoomCode,
    },
    Vote {
        room_code: RoomCode,
        target_user_id: UserId,
    },
}

impl ClientMessage {
    pub fn room_code(&self) -> Option<&RoomCode> {
        match self {
            ClientMessage::Create { .. } => None,
            ClientMessage::Join { room_code }
            | ClientMessage::Leave { room_code }
            | ClientMessage::UpdateSettings { room_code, .. }
            | ClientMessage::Start { room_code }
            | ClientMessage::SelectWord { room_code, .. }
            | ClientMessage::Question { room_code, .. }
            | ClientMessage::MayorResponse { room_code, .. }
            | ClientMessage::TimeUp { room_code }
            | ClientMessage::Vote { room_code, .. } => Some(room_code),
        }
    }
}

/// Every room-scoped event carries the full room as seen by its recipient
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "t", rename_all = "snake_case")]
pub enum ServerMessage {
    Welcome {
        protocol: String,
        user_id: UserId,
        /// ISO8601
        server_now: String,
    },
    State {
        room: RoomView,
    },
    PlayerJoined {
        user_id: UserId,
        profile: Profile,
        reconnected: bool,
        room: RoomView,
    },
    PlayerLeft {
        user_id: UserId,
        new_host: Option<UserId>,
        /// None once the room was deleted
        room: Option<RoomView>,
    },
    PlayerDisconnected {
        user_id: UserId,
        room: RoomView,
    },
    SettingsUpdated {
        room: RoomView,
    },
    Started {
        /// The recipient's own role
        role: Option<Role>,
        room: RoomView,
    },
    DayStart {
        day_duration_seconds: u32,
        room: RoomView,
    },
    NewQuestion {
        question_index: usize,
        question: Question,
        room: RoomView,
    },
    TokenResponse {
        question_index: usize,
        token: TokenKind,
        remaining: TokenBudget,
        room: RoomView,
    },
    WordGuessed {
        guessed_by: UserId,
        room: RoomView,
    },
    VotingStart {
        vote_mode: VoteMode,
        room: RoomView,
    },
    VoteCast {
        voter_id: UserId,
        votes_count: usize,
        total_voters: usize,
        room: RoomView,
    },
    GameOver {
        winner: Winner,
        eliminated: Option<UserId>,
        vote_counts: Vec<(UserId, u32)>,
        room: RoomView,
    },
    Error {
        code: String,
        msg: String,
    },
}

impl ServerMessage {
    pub fn error(err: &GameError) -> Self {
        ServerMessage::Error {
            code: err.code().to_string(),
            msg: err.to_string(),
        }
    }

    /// The room snapshot carried by this event, if any
    pub fn room(&self) -> Option<&RoomView> {
        match self {
            ServerMessage::Welcome { .. } | ServerMessage::Error { .. } => None,
            ServerMessage::PlayerLeft { room, .. } => room.as_ref(),
            ServerMessage::State { room }
            | ServerMessage::PlayerJoined { room, .. }
            | ServerMessage::PlayerDisconnected { room, .. }
            | ServerMessage::SettingsUpdated { room }
            | ServerMessage::Started { room, .. }
            | ServerMessage::DayStart { room, .. }
            | ServerMessage::NewQuestion { room, .. }
            | ServerMessage::TokenResponse { room, .. }
            | ServerMessage::WordGuessed { room, .. }
            | ServerMessage::VotingStart { room, .. }
            | ServerMessage::VoteCast { room, .. }
            | ServerMessage::GameOver { room, .. } => Some(room),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Rejection;

    #[test]
    fn test_decode_mayor_response() {
        let json = r#"{"t":"mayor_response","room_code":"abcd","question_index":2,"token":"soClose"}"#;
        match serde_json::from_str::<ClientMessage>(json).unwrap() {
            ClientMessage::MayorResponse {
                room_code,
                question_index,
                token,
            } => {
                assert_eq!(room_code.as_str(), "ABCD");
                assert_eq!(question_index, 2);
                assert_eq!(token, TokenKind::SoClose);
            }
            other => panic!("Expected MayorResponse, got {other:?}"),
        }
    }

    #[test]
    fn test_decode_rejects_bad_payloads() {
        let bad = [
            r#"{"t":"join","room_code":"ABCDE"}"#,
            r#"{"t":"join","room_code":"AB1D"}"#,
            r#"{"t":"mayor_response","room_code":"ABCD","question_index":0,"token":"perhaps"}"#,
            r#"{"t":"dance","room_code":"ABCD"}"#,
            r#"{"t":"vote","room_code":"ABCD"}"#,
        ];
        for json in bad {
            assert!(
                serde_json::from_str::<ClientMessage>(json).is_err(),
                "accepted {json}"
            );
        }
    }

    #[test]
    fn test_create_without_settings() {
        let msg: ClientMessage = serde_json::from_str(r#"{"t":"create"}"#).unwrap();
        assert_eq!(msg, ClientMessage::Create { settings: None });
        assert!(msg.room_code().is_none());
    }

    #[test]
    fn test_error_envelope() {
        let msg = ServerMessage::error(&Rejection::NotMayor.into());
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["t"], "error");
        assert_eq!(json["code"], "NOT_MAYOR");
        assert!(msg.room().is_none());
    }
}

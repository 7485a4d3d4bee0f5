use chrono::{DateTime, Utc};

use super::GameRoom;
use crate::error::{GameError, GameResult, Rejection};
use crate::types::*;

/// What happened to an asked question
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Asked {
    pub index: usize,
    pub is_guess: bool,
}

fn normalize(text: &str) -> String {
    text.trim().to_lowercase()
}

impl GameRoom {
    /// Mayor fixes the secret word from the offered options; Day begins
    pub fn select_word(&mut self, actor: &str, word: &str) -> GameResult<()> {
        self.ensure_phase(Phase::Night)?;
        self.ensure_mayor(actor)?;
        if !self.word_options.iter().any(|w| w == word) {
            return Err(Rejection::InvalidWord.into());
        }

        self.secret_word = Some(word.to_string());
        self.day_started_at = Some(Utc::now());
        self.phase = Phase::Day;
        self.bump();
        Ok(())
    }

    /// Record a question. A question equal to the secret word (ignoring case and
    /// surrounding whitespace) is a correct guess and opens the seer hunt.
    pub fn ask_question(&mut self, actor: &str, text: &str) -> GameResult<Asked> {
        self.ensure_phase(Phase::Day)?;
        self.ensure_player(actor)?;
        if text.trim().is_empty() {
            return Err(GameError::Validation("question must not be empty".to_string()));
        }

        let is_guess = self
            .secret_word
            .as_deref()
            .is_some_and(|word| normalize(word) == normalize(text));

        self.questions.push(Question {
            asker: actor.to_string(),
            text: text.to_string(),
            response: None,
            is_guess,
            asked_at: Utc::now(),
        });
        let index = self.questions.len() - 1;

        if is_guess {
            self.word_guessed_by = Some(actor.to_string());
            self.open_voting(VoteMode::FindSeer);
        }
        self.bump();
        Ok(Asked { index, is_guess })
    }

    /// Mayor answers a question by spending one token
    pub fn mayor_respond(
        &mut self,
        actor: &str,
        question_index: usize,
        token: TokenKind,
    ) -> GameResult<()> {
        self.ensure_phase(Phase::Day)?;
        self.ensure_mayor(actor)?;
        let question = self
            .questions
            .get(question_index)
            .ok_or(GameError::QuestionNotFound(question_index))?;
        if question.response.is_some() {
            return Err(Rejection::AlreadyAnswered(question_index).into());
        }
        if self.token_budget.get(token) == 0 {
            return Err(Rejection::TokensExhausted(token).into());
        }

        self.token_budget.spend(token);
        self.questions[question_index].response = Some(token);
        self.token_log.push(TokenUsage {
            question_index,
            token,
            used_at: Utc::now(),
        });
        self.bump();
        Ok(())
    }

    /// Host declares the Day over without a correct guess
    pub fn time_up(&mut self, actor: &str) -> GameResult<()> {
        self.ensure_host(actor)?;
        self.ensure_phase(Phase::Day)?;
        self.open_voting(VoteMode::FindWerewolf);
        self.bump();
        Ok(())
    }

    /// Server-side timer expiry for the Day that began at `started_at`.
    ///
    /// Rejected if the room has already left that Day.
    pub fn expire_day(&mut self, started_at: DateTime<Utc>) -> GameResult<()> {
        self.ensure_phase(Phase::Day)?;
        if self.day_started_at != Some(started_at) {
            return Err(Rejection::WrongPhase {
                expected: Phase::Day,
                actual: self.phase,
            }
            .into());
        }
        self.open_voting(VoteMode::FindWerewolf);
        self.bump();
        Ok(())
    }

    fn open_voting(&mut self, mode: VoteMode) {
        self.phase = Phase::Voting;
        self.vote_mode = Some(mode);
        self.votes.clear();
    }
}

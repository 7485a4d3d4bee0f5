use chrono::Utc;
use serde::Serialize;

use super::GameRoom;
use crate::error::{GameResult, Rejection};
use crate::types::*;

/// Final tally of a finished vote
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Resolution {
    pub eliminated: Option<UserId>,
    pub winner: Winner,
    /// Votes per target, in the order targets first received a vote
    pub counts: Vec<(UserId, u32)>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VoteOutcome {
    /// Still waiting on other voters
    Pending { cast: usize, eligible: usize },
    /// Last eligible vote arrived; the room is now Ended
    Decided(Resolution),
}

/// Count votes per target and pick the one with the strictly highest count.
///
/// Ties go to whichever target reached the shared maximum first in iteration
/// order, so the result depends on the order votes were recorded.
pub fn tally(votes: &[Vote]) -> (Option<UserId>, Vec<(UserId, u32)>) {
    let mut counts: Vec<(UserId, u32)> = Vec::new();
    for vote in votes {
        match counts.iter_mut().find(|(target, _)| *target == vote.target) {
            Some((_, n)) => *n += 1,
            None => counts.push((vote.target.clone(), 1)),
        }
    }

    let mut max = 0;
    let mut eliminated = None;
    for (target, n) in &counts {
        if *n > max {
            max = *n;
            eliminated = Some(target.clone());
        }
    }
    (eliminated, counts)
}

impl GameRoom {
    /// Whether `user_id` gets a ballot in the current vote mode
    pub fn can_vote(&self, user_id: &str) -> bool {
        match (self.vote_mode, self.role_of(user_id)) {
            (Some(VoteMode::FindSeer), Some(role)) => role == Role::Werewolf,
            (Some(VoteMode::FindWerewolf), Some(role)) => role != Role::Werewolf,
            _ => false,
        }
    }

    pub fn eligible_voter_count(&self) -> usize {
        self.players
            .iter()
            .filter(|p| self.can_vote(&p.user_id))
            .count()
    }

    fn is_valid_target(&self, actor: &str, target: &str) -> bool {
        if actor == target {
            return false;
        }
        match self.player(target) {
            None => false,
            Some(p) if self.vote_mode == Some(VoteMode::FindSeer) => p.role != Some(Role::Mayor),
            Some(_) => true,
        }
    }

    /// Record (or replace) `actor`'s vote; resolves the game once every eligible
    /// voter has a live vote.
    pub fn cast_vote(&mut self, actor: &str, target: &str) -> GameResult<VoteOutcome> {
        self.ensure_phase(Phase::Voting)?;
        self.ensure_player(actor)?;
        if !self.can_vote(actor) {
            return Err(Rejection::IneligibleVoter.into());
        }
        if !self.is_valid_target(actor, target) {
            return Err(Rejection::InvalidTarget.into());
        }

        let now = Utc::now();
        match self.votes.iter_mut().find(|v| v.voter == actor) {
            Some(existing) => {
                existing.target = target.to_string();
                existing.cast_at = now;
            }
            None => self.votes.push(Vote {
                voter: actor.to_string(),
                target: target.to_string(),
                cast_at: now,
            }),
        }
        self.bump();

        let eligible = self.eligible_voter_count();
        if self.votes.len() < eligible {
            return Ok(VoteOutcome::Pending {
                cast: self.votes.len(),
                eligible,
            });
        }
        Ok(VoteOutcome::Decided(self.resolve()))
    }

    fn resolve(&mut self) -> Resolution {
        let (eliminated, counts) = tally(&self.votes);
        let eliminated_role = eliminated.as_deref().and_then(|id| self.role_of(id));

        let winner = match self.vote_mode {
            Some(VoteMode::FindSeer) if eliminated_role == Some(Role::Seer) => Winner::Werewolf,
            Some(VoteMode::FindSeer) => Winner::Village,
            _ if eliminated_role == Some(Role::Werewolf) => Winner::Village,
            _ => Winner::Werewolf,
        };

        self.eliminated = eliminated.clone();
        self.winner = Some(winner);
        self.phase = Phase::Ended;
        self.bump();

        Resolution {
            eliminated,
            winner,
            counts,
        }
    }
}

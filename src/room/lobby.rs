use rand::Rng;

use super::GameRoom;
use crate::error::{GameResult, Rejection};
use crate::roles;
use crate::types::*;
use crate::words::{WordSelector, WORD_OPTION_COUNT};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinOutcome {
    /// Added to the roster
    Joined,
    /// Already on the roster; marked connected again
    Reconnected,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeaveOutcome {
    /// Set when the leaver was host and someone took over
    pub new_host: Option<UserId>,
    /// Nobody left; the room should be deleted
    pub room_empty: bool,
}

impl GameRoom {
    /// Join the lobby, or reconnect an existing roster entry in any phase
    pub fn join(&mut self, user_id: &str, max_players: usize) -> GameResult<JoinOutcome> {
        if let Some(player) = self.player_mut(user_id) {
            player.connected = true;
            self.bump();
            return Ok(JoinOutcome::Reconnected);
        }

        if self.phase != Phase::Lobby {
            return Err(Rejection::GameInProgress.into());
        }
        let cap = max_players.min(MAX_PLAYERS);
        if self.players.len() >= cap {
            return Err(Rejection::RoomFull(cap).into());
        }

        self.players.push(Player::new(user_id.to_string()));
        self.bump();
        Ok(JoinOutcome::Joined)
    }

    /// Leave the lobby for good. The earliest remaining joiner inherits host.
    pub fn leave(&mut self, user_id: &str) -> GameResult<LeaveOutcome> {
        self.ensure_phase(Phase::Lobby)?;
        let index = self
            .players
            .iter()
            .position(|p| p.user_id == user_id)
            .ok_or(Rejection::NotInRoom)?;

        self.players.remove(index);
        let mut new_host = None;
        if self.host == user_id {
            if let Some(first) = self.players.first() {
                self.host = first.user_id.clone();
                new_host = Some(self.host.clone());
            }
        }
        self.bump();

        Ok(LeaveOutcome {
            new_host,
            room_empty: self.players.is_empty(),
        })
    }

    /// Flip a player's connection flag. Returns whether anything changed.
    pub fn set_connected(&mut self, user_id: &str, connected: bool) -> GameResult<bool> {
        let player = self.player_mut(user_id).ok_or(Rejection::NotInRoom)?;
        if player.connected == connected {
            return Ok(false);
        }
        player.connected = connected;
        self.bump();
        Ok(true)
    }

    /// Host-only settings change; also resets the token budget to the new defaults
    pub fn update_settings(&mut self, actor: &str, patch: &SettingsPatch) -> GameResult<()> {
        self.ensure_host(actor)?;
        self.ensure_phase(Phase::Lobby)?;
        let merged = self.settings.merged(patch)?;

        self.token_budget = merged.token_counts;
        self.settings = merged;
        self.bump();
        Ok(())
    }

    /// Deal roles, offer words to the mayor and move to Night
    pub fn start<R: Rng + ?Sized>(
        &mut self,
        actor: &str,
        words: &WordSelector,
        rng: &mut R,
    ) -> GameResult<()> {
        self.ensure_host(actor)?;
        self.ensure_phase(Phase::Lobby)?;
        if self.players.len() < MIN_PLAYERS {
            return Err(Rejection::NotEnoughPlayers {
                needed: MIN_PLAYERS,
                have: self.players.len(),
            }
            .into());
        }

        let roles = roles::assign(self.players.len(), rng)?;
        let options = words.draw(
            WORD_OPTION_COUNT,
            &self.settings.word_category,
            self.settings.difficulty,
            rng,
        );

        for (player, role) in self.players.iter_mut().zip(roles) {
            player.role = Some(role);
        }
        self.word_options = options;
        self.token_budget = self.settings.token_counts;
        self.token_log.clear();
        self.phase = Phase::Night;
        self.bump();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::super::tests::*;
    use super::*;
    use crate::error::GameError;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_join_adds_in_order() {
        let room = lobby(4);
        assert_eq!(room.player_ids(), vec!["p0", "p1", "p2", "p3"]);
        assert!(room.players.iter().all(|p| p.connected && p.role.is_none()));
    }

    #[test]
    fn test_join_twice_reconnects() {
        let mut room = lobby(2);
        room.set_connected("p1", false).unwrap();
        assert_eq!(room.join("p1", MAX_PLAYERS).unwrap(), JoinOutcome::Reconnected);
        assert_eq!(room.players.len(), 2);
        assert!(room.player("p1").unwrap().connected);
    }

    #[test]
    fn test_join_rejected_when_full() {
        let mut room = lobby(8);
        let err = room.join("late", MAX_PLAYERS).unwrap_err();
        assert_eq!(err, GameError::Precondition(Rejection::RoomFull(8)));
        assert_eq!(room.players.len(), 8);
    }

    #[test]
    fn test_join_respects_lower_configured_cap() {
        let mut room = lobby(4);
        let err = room.join("p4", 4).unwrap_err();
        assert_eq!(err.code(), "ROOM_FULL");
    }

    #[test]
    fn test_join_after_start_only_reconnects() {
        let mut room = started(4, 1);
        let err = room.join("stranger", MAX_PLAYERS).unwrap_err();
        assert_eq!(err, GameError::Precondition(Rejection::GameInProgress));

        room.set_connected("p2", false).unwrap();
        assert_eq!(room.join("p2", MAX_PLAYERS).unwrap(), JoinOutcome::Reconnected);
        assert!(room.role_of("p2").is_some());
    }

    #[test]
    fn test_host_leaving_promotes_earliest_joiner() {
        let mut room = lobby(4);
        let outcome = room.leave("p0").unwrap();
        assert_eq!(outcome.new_host.as_deref(), Some("p1"));
        assert!(!outcome.room_empty);
        assert_eq!(room.host, "p1");
        assert_eq!(room.player_ids(), vec!["p1", "p2", "p3"]);
    }

    #[test]
    fn test_non_host_leaving_keeps_host() {
        let mut room = lobby(3);
        let outcome = room.leave("p1").unwrap();
        assert_eq!(outcome.new_host, None);
        assert_eq!(room.host, "p0");
    }

    #[test]
    fn test_last_leaver_empties_room() {
        let mut room = lobby(1);
        let outcome = room.leave("p0").unwrap();
        assert!(outcome.room_empty);
        assert!(room.is_abandoned());
    }

    #[test]
    fn test_leave_outside_lobby_is_rejected() {
        let mut room = started(4, 2);
        let before = room.clone();
        let err = room.leave("p1").unwrap_err();
        assert_eq!(err.code(), "WRONG_PHASE");
        assert_eq!(room, before);
    }

    #[test]
    fn test_update_settings_resets_budget() {
        let mut room = lobby(2);
        let patch = SettingsPatch {
            token_counts: Some(TokenBudget {
                yes: 4,
                no: 4,
                maybe: 2,
                so_close: 0,
            }),
            word_category: Some("food".to_string()),
            ..Default::default()
        };
        room.update_settings("p0", &patch).unwrap();
        assert_eq!(room.token_budget.yes, 4);
        assert_eq!(room.settings.word_category, "food");
        assert_tokens_conserved(&room);
    }

    #[test]
    fn test_update_settings_host_only() {
        let mut room = lobby(2);
        let err = room
            .update_settings("p1", &SettingsPatch::default())
            .unwrap_err();
        assert_eq!(err, GameError::Precondition(Rejection::NotHost));
    }

    #[test]
    fn test_start_needs_four_players() {
        let mut room = lobby(3);
        let before = room.clone();
        let mut rng = StdRng::seed_from_u64(1);
        let err = room
            .start("p0", &WordSelector::default(), &mut rng)
            .unwrap_err();
        assert_eq!(
            err,
            GameError::Precondition(Rejection::NotEnoughPlayers { needed: 4, have: 3 })
        );
        assert_eq!(room, before);
    }

    #[test]
    fn test_start_host_only() {
        let mut room = lobby(4);
        let mut rng = StdRng::seed_from_u64(1);
        let err = room
            .start("p2", &WordSelector::default(), &mut rng)
            .unwrap_err();
        assert_eq!(err.code(), "NOT_HOST");
        assert_eq!(room.phase, Phase::Lobby);
    }

    #[test]
    fn test_start_deals_roles_and_words() {
        let room = started(4, 17);
        assert_eq!(room.phase, Phase::Night);
        assert_eq!(all_with_role(&room, Role::Mayor).len(), 1);
        assert_eq!(all_with_role(&room, Role::Seer).len(), 1);
        assert_eq!(all_with_role(&room, Role::Werewolf).len(), 1);
        assert_eq!(all_with_role(&room, Role::Villager).len(), 1);
        assert_eq!(room.word_options.len(), 5);
        assert!(room.secret_word.is_none());
        assert_tokens_conserved(&room);
    }

    #[test]
    fn test_seven_players_get_two_werewolves() {
        let room = started(7, 23);
        assert_eq!(all_with_role(&room, Role::Werewolf).len(), 2);
        assert_eq!(all_with_role(&room, Role::Villager).len(), 3);
    }

    #[test]
    fn test_start_twice_is_rejected() {
        let mut room = started(4, 1);
        let mut rng = StdRng::seed_from_u64(1);
        let err = room
            .start("p0", &WordSelector::default(), &mut rng)
            .unwrap_err();
        assert_eq!(err.code(), "WRONG_PHASE");
    }
}

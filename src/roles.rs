use rand::seq::SliceRandom;
use rand::Rng;

use crate::error::{GameResult, Rejection};
use crate::types::Role;

/// Smallest roster that can hold mayor, seer and one werewolf
pub const MIN_ROLE_SEATS: usize = 3;

/// Rosters of this size or larger get a second werewolf
pub const SECOND_WEREWOLF_AT: usize = 7;

/// Build the role multiset for `player_count` seats and shuffle it.
///
/// Always one mayor and one seer, one werewolf (two from seven players), the
/// rest villagers. Index `i` belongs to the `i`-th player in join order.
pub fn assign<R: Rng + ?Sized>(player_count: usize, rng: &mut R) -> GameResult<Vec<Role>> {
    if player_count < MIN_ROLE_SEATS {
        return Err(Rejection::NotEnoughPlayers {
            needed: MIN_ROLE_SEATS,
            have: player_count,
        }
        .into());
    }

    let mut roles = vec![Role::Mayor, Role::Seer, Role::Werewolf];
    if player_count >= SECOND_WEREWOLF_AT {
        roles.push(Role::Werewolf);
    }
    roles.resize(player_count, Role::Villager);

    roles.shuffle(rng);
    Ok(roles)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::GameError;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn count(roles: &[Role], role: Role) -> usize {
        roles.iter().filter(|r| **r == role).count()
    }

    #[test]
    fn test_role_counts_for_every_roster_size() {
        let mut rng = StdRng::seed_from_u64(99);
        for n in 3..=8 {
            let roles = assign(n, &mut rng).unwrap();
            assert_eq!(roles.len(), n);
            assert_eq!(count(&roles, Role::Mayor), 1);
            assert_eq!(count(&roles, Role::Seer), 1);
            let wolves = if n >= 7 { 2 } else { 1 };
            assert_eq!(count(&roles, Role::Werewolf), wolves, "n = {n}");
            assert_eq!(count(&roles, Role::Villager), n - 2 - wolves);
        }
    }

    #[test]
    fn test_too_few_seats_is_rejected() {
        let mut rng = StdRng::seed_from_u64(0);
        let result = assign(2, &mut rng);
        assert!(matches!(
            result,
            Err(GameError::Precondition(Rejection::NotEnoughPlayers { needed: 3, have: 2 }))
        ));
    }

    #[test]
    fn test_mayor_seat_varies_between_draws() {
        let mut rng = StdRng::seed_from_u64(5);
        let seats: std::collections::HashSet<usize> = (0..50)
            .map(|_| {
                assign(6, &mut rng)
                    .unwrap()
                    .iter()
                    .position(|r| *r == Role::Mayor)
                    .unwrap()
            })
            .collect();
        assert!(seats.len() > 1);
    }
}

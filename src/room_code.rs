use rand::Rng;

use crate::error::{GameError, GameResult};
use crate::types::{RoomCode, ROOM_CODE_LENGTH};

const CODE_CHARS: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ";

/// Give up after this many collisions with live rooms
pub const MAX_ATTEMPTS: u32 = 100;

/// Generate a random 4-letter code
fn generate_code<R: Rng + ?Sized>(rng: &mut R) -> RoomCode {
    let code: String = (0..ROOM_CODE_LENGTH)
        .map(|_| CODE_CHARS[rng.random_range(0..CODE_CHARS.len())] as char)
        .collect();
    RoomCode::from_generated(code)
}

/// Draw codes until one is not taken by a live room.
///
/// `is_live` must answer whether a room with this code exists and is not Ended.
pub fn allocate<R, F>(rng: &mut R, is_live: F) -> GameResult<RoomCode>
where
    R: Rng + ?Sized,
    F: Fn(&RoomCode) -> bool,
{
    for _ in 0..MAX_ATTEMPTS {
        let code = generate_code(rng);
        if !is_live(&code) {
            return Ok(code);
        }
    }
    Err(GameError::Exhausted(MAX_ATTEMPTS))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::cell::Cell;

    #[test]
    fn test_generated_codes_are_four_uppercase_letters() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..200 {
            let code = allocate(&mut rng, |_| false).unwrap();
            assert_eq!(code.as_str().len(), 4);
            assert!(code.as_str().chars().all(|c| c.is_ascii_uppercase()));
        }
    }

    #[test]
    fn test_allocate_retries_on_collision() {
        let mut rng = StdRng::seed_from_u64(1);
        let calls = Cell::new(0);
        let code = allocate(&mut rng, |_| {
            calls.set(calls.get() + 1);
            calls.get() < 5
        })
        .unwrap();
        assert_eq!(calls.get(), 5);
        assert_eq!(code.as_str().len(), 4);
    }

    #[test]
    fn test_allocate_gives_up_after_bound() {
        let mut rng = StdRng::seed_from_u64(1);
        let calls = Cell::new(0u32);
        let result = allocate(&mut rng, |_| {
            calls.set(calls.get() + 1);
            true
        });
        assert_eq!(result, Err(GameError::Exhausted(MAX_ATTEMPTS)));
        assert_eq!(calls.get(), MAX_ATTEMPTS);
    }
}

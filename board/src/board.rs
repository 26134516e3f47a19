//! In-memory board state and move application (spec §3, §4.2).

use crate::types::{CubeOwner, PlayerSide};
use crate::BoardError;

/// A backgammon position plus the match context needed to round-trip a
/// position/match ID pair (spec §3 "Board state").
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Board {
    /// Indexed `0` (off) .. `24` (points 1..24) .. `25` (bar), own perspective.
    pub p1: [i32; 26],
    pub p2: [i32; 26],
    pub cube_value: u32,
    pub cube_owner: CubeOwner,
    pub turn: PlayerSide,
    pub dice: Option<(u8, u8)>,
    pub match_length: Option<u16>,
    pub score: (u16, u16),
}

impl Board {
    /// The standard starting position (spec §4.2), P1 on roll, cube centered
    /// at 1, money game.
    #[must_use]
    pub fn starting() -> Self {
        let mut side = [0i32; 26];
        side[24] = 2;
        side[13] = 5;
        side[8] = 3;
        side[6] = 5;
        Self {
            p1: side,
            p2: side,
            cube_value: 1,
            cube_owner: CubeOwner::Center,
            turn: PlayerSide::P1,
            dice: None,
            match_length: None,
            score: (0, 0),
        }
    }

    fn side_mut(&mut self, player: PlayerSide) -> (&mut [i32; 26], &mut [i32; 26]) {
        match player {
            PlayerSide::P1 => (&mut self.p1, &mut self.p2),
            PlayerSide::P2 => (&mut self.p2, &mut self.p1),
        }
    }

    #[must_use]
    pub fn side(&self, player: PlayerSide) -> &[i32; 26] {
        match player {
            PlayerSide::P1 => &self.p1,
            PlayerSide::P2 => &self.p2,
        }
    }

    /// Apply a move's parts in order (spec §4.2 `applyMoveParts`).
    ///
    /// Out-of-range indices or a part whose source slot is already empty are
    /// silently skipped, leaving the rest of the move to apply.
    pub fn apply_move_parts(&mut self, player: PlayerSide, parts: &[crate::moves::MovePart]) {
        let (mine, opp) = self.side_mut(player);
        for part in parts {
            let (from, to) = (part.from as usize, part.to as usize);
            if from > 25 || to > 25 {
                continue;
            }
            if mine[from] <= 0 {
                continue;
            }
            mine[from] -= 1;
            if part.hit && (1..=24).contains(&to) {
                if opp[to] > 0 {
                    opp[to] -= 1;
                    opp[25] += 1;
                }
            }
            mine[to] += 1;
        }
    }

    /// Checks the at-rest invariants from spec §3: each player's 26 slots
    /// sum to 15, no slot is negative, cube value is a power of two, and
    /// dice (if set) are both in `1..=6`.
    pub fn check_invariants(&self) -> Result<(), BoardError> {
        for side in [self.p1, self.p2] {
            if side.iter().any(|&n| n < 0) {
                return Err(BoardError::NegativeSlot);
            }
            let sum: i32 = side.iter().sum();
            if sum != 15 {
                return Err(BoardError::CheckerCountMismatch(sum));
            }
        }
        if !self.cube_value.is_power_of_two() {
            return Err(BoardError::InvalidCubeValue(self.cube_value));
        }
        if let Some((d1, d2)) = self.dice {
            if !(1..=6).contains(&d1) || !(1..=6).contains(&d2) {
                return Err(BoardError::InvalidDice(d1, d2));
            }
        }
        Ok(())
    }
}

//! Position ID / match ID bit-packed codec (spec §4.2).
//!
//! Both ids are little-endian bit streams: bit 0 of byte 0 is the first bit
//! written. Fields are packed least-significant-bit first, in field order.

use base64::engine::general_purpose::STANDARD_NO_PAD;
use base64::Engine;

use crate::board::Board;
use crate::types::{CubeOwner, PlayerSide};
use crate::BoardError;

const POSITION_BYTES: usize = 10;
const MATCH_BYTES: usize = 9;

struct BitWriter {
    buf: Vec<u8>,
    pos: usize,
}

impl BitWriter {
    fn new(byte_len: usize) -> Self {
        Self {
            buf: vec![0u8; byte_len],
            pos: 0,
        }
    }

    fn write_bit(&mut self, bit: bool) {
        let byte = self.pos / 8;
        let offset = self.pos % 8;
        if bit {
            self.buf[byte] |= 1 << offset;
        }
        self.pos += 1;
    }

    fn write_bits(&mut self, value: u64, width: u8) {
        for i in 0..width {
            self.write_bit((value >> i) & 1 == 1);
        }
    }

    fn write_unary(&mut self, count: i32) {
        for _ in 0..count {
            self.write_bit(true);
        }
        self.write_bit(false);
    }
}

struct BitReader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> BitReader<'a> {
    fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    fn read_bit(&mut self) -> bool {
        let byte = self.pos / 8;
        let offset = self.pos % 8;
        self.pos += 1;
        if byte >= self.buf.len() {
            return false;
        }
        (self.buf[byte] >> offset) & 1 == 1
    }

    fn read_bits(&mut self, width: u8) -> u64 {
        let mut value = 0u64;
        for i in 0..width {
            if self.read_bit() {
                value |= 1 << i;
            }
        }
        value
    }

    fn read_unary(&mut self) -> i32 {
        let mut count = 0;
        while self.read_bit() {
            count += 1;
        }
        count
    }
}

/// Points 1..24, then bar (25); the order position IDs pack per side.
const SIDE_SLOTS: [usize; 25] = [
    1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 13, 14, 15, 16, 17, 18, 19, 20, 21, 22, 23, 24, 25,
];

/// Encode a board's occupancy into the 14-char position ID (spec §4.2).
#[must_use]
pub fn encode_position_id(board: &Board) -> String {
    let (mine, opp) = match board.turn {
        PlayerSide::P1 => (&board.p1, &board.p2),
        PlayerSide::P2 => (&board.p2, &board.p1),
    };
    let mut writer = BitWriter::new(POSITION_BYTES);
    for &slot in &SIDE_SLOTS {
        writer.write_unary(mine[slot]);
    }
    for &slot in &SIDE_SLOTS {
        writer.write_unary(opp[slot]);
    }
    STANDARD_NO_PAD.encode(writer.buf)
}

/// Decode a position ID given which side is on roll, per spec §4.2: "the
/// roller bit from the match ID must be read before the position bytes are
/// distributed". Returns `(p1, p2)` arrays.
pub fn decode_position_id(
    id: &str,
    roller: PlayerSide,
) -> Result<([i32; 26], [i32; 26]), BoardError> {
    let bytes = STANDARD_NO_PAD
        .decode(id)
        .map_err(|_| BoardError::InvalidPositionId(id.to_string()))?;
    if bytes.len() != POSITION_BYTES {
        return Err(BoardError::InvalidPositionId(id.to_string()));
    }
    let mut reader = BitReader::new(&bytes);

    let mut decode_side = || -> Result<[i32; 26], BoardError> {
        let mut side = [0i32; 26];
        for &slot in &SIDE_SLOTS {
            side[slot] = reader.read_unary();
        }
        let on_board: i32 = side.iter().sum();
        if on_board > 15 {
            return Err(BoardError::InvalidPositionId(id.to_string()));
        }
        side[0] = 15 - on_board;
        Ok(side)
    };

    let first = decode_side()?;
    let second = decode_side()?;

    Ok(match roller {
        PlayerSide::P1 => (first, second),
        PlayerSide::P2 => (second, first),
    })
}

fn cube_owner_code(owner: CubeOwner) -> u64 {
    match owner {
        CubeOwner::P1 => 0b00,
        CubeOwner::P2 => 0b01,
        CubeOwner::Center => 0b11,
    }
}

fn cube_owner_from_code(code: u64) -> CubeOwner {
    match code {
        0b00 => CubeOwner::P1,
        0b01 => CubeOwner::P2,
        _ => CubeOwner::Center,
    }
}

/// Encode match context into the 12-char match ID (spec §4.2).
#[must_use]
pub fn encode_match_id(board: &Board) -> String {
    let mut writer = BitWriter::new(MATCH_BYTES);

    let cube_exponent = board.cube_value.trailing_zeros().min(15) as u64;
    writer.write_bits(cube_exponent, 4);
    writer.write_bits(cube_owner_code(board.cube_owner), 2);
    let roller = match board.turn {
        PlayerSide::P1 => 0u64,
        PlayerSide::P2 => 1u64,
    };
    writer.write_bits(roller, 1);
    writer.write_bits(0, 1); // crawford flag
    writer.write_bits(0b001, 3); // game state: in progress
    writer.write_bits(roller, 1); // decision owner == roller
    writer.write_bits(0, 1); // double offered
    writer.write_bits(0b00, 2); // resignation
    let (d1, d2) = board.dice.unwrap_or((0, 0));
    writer.write_bits(d1 as u64, 3);
    writer.write_bits(d2 as u64, 3);
    writer.write_bits(board.match_length.unwrap_or(0) as u64, 15);
    writer.write_bits(board.score.0 as u64, 15);
    writer.write_bits(board.score.1 as u64, 15);

    STANDARD_NO_PAD.encode(writer.buf)
}

/// Decoded match-id fields relevant to reconstructing a `Board`.
pub struct DecodedMatchId {
    pub cube_value: u32,
    pub cube_owner: CubeOwner,
    pub roller: PlayerSide,
    pub dice: Option<(u8, u8)>,
    pub match_length: Option<u16>,
    pub score: (u16, u16),
}

/// Decode a match ID (spec §4.2).
pub fn decode_match_id(id: &str) -> Result<DecodedMatchId, BoardError> {
    let bytes = STANDARD_NO_PAD
        .decode(id)
        .map_err(|_| BoardError::InvalidMatchId(id.to_string()))?;
    if bytes.len() != MATCH_BYTES {
        return Err(BoardError::InvalidMatchId(id.to_string()));
    }
    let mut reader = BitReader::new(&bytes);

    let cube_exponent = reader.read_bits(4) as u32;
    let cube_owner = cube_owner_from_code(reader.read_bits(2));
    let roller_bit = reader.read_bits(1);
    let _crawford = reader.read_bits(1);
    let _game_state = reader.read_bits(3);
    let _decision_owner = reader.read_bits(1);
    let _double_offered = reader.read_bits(1);
    let _resignation = reader.read_bits(2);
    let d1 = reader.read_bits(3) as u8;
    let d2 = reader.read_bits(3) as u8;
    let match_length = reader.read_bits(15) as u16;
    let score_p1 = reader.read_bits(15) as u16;
    let score_p2 = reader.read_bits(15) as u16;

    let roller = if roller_bit == 0 {
        PlayerSide::P1
    } else {
        PlayerSide::P2
    };
    let dice = if d1 == 0 && d2 == 0 {
        None
    } else {
        Some((d1, d2))
    };
    let match_length = if match_length == 0 {
        None
    } else {
        Some(match_length)
    };

    Ok(DecodedMatchId {
        cube_value: 1u32 << cube_exponent,
        cube_owner,
        roller,
        dice,
        match_length,
        score: (score_p1, score_p2),
    })
}

/// `positionId:matchId`, the content-addressable key (spec GLOSSARY "GNU ID").
#[must_use]
pub fn to_gnu_id(board: &Board) -> String {
    format!("{}:{}", encode_position_id(board), encode_match_id(board))
}

/// Reconstruct a board from a `positionId:matchId` pair.
pub fn from_gnu_id(gnu_id: &str) -> Result<Board, BoardError> {
    let (position_id, match_id) = gnu_id
        .split_once(':')
        .ok_or_else(|| BoardError::InvalidGnuId(gnu_id.to_string()))?;
    let decoded_match = decode_match_id(match_id)?;
    let (p1, p2) = decode_position_id(position_id, decoded_match.roller)?;
    Ok(Board {
        p1,
        p2,
        cube_value: decoded_match.cube_value,
        cube_owner: decoded_match.cube_owner,
        turn: decoded_match.roller,
        dice: decoded_match.dice,
        match_length: decoded_match.match_length,
        score: decoded_match.score,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starting_position_round_trips() {
        let board = Board::starting();
        let gnu_id = to_gnu_id(&board);
        let decoded = from_gnu_id(&gnu_id).unwrap();
        assert_eq!(decoded, board);
        assert_eq!(to_gnu_id(&decoded), gnu_id);
    }

    #[test]
    fn position_id_is_14_chars() {
        let board = Board::starting();
        assert_eq!(encode_position_id(&board).len(), 14);
    }

    #[test]
    fn match_id_is_12_chars() {
        let board = Board::starting();
        assert_eq!(encode_match_id(&board).len(), 12);
    }

    #[test]
    fn match_id_round_trips_dice_and_score() {
        let mut board = Board::starting();
        board.turn = PlayerSide::P2;
        board.dice = Some((6, 2));
        board.match_length = Some(7);
        board.score = (3, 5);
        board.cube_value = 4;
        board.cube_owner = CubeOwner::P2;

        let decoded = decode_match_id(&encode_match_id(&board)).unwrap();
        assert_eq!(decoded.roller, PlayerSide::P2);
        assert_eq!(decoded.dice, Some((6, 2)));
        assert_eq!(decoded.match_length, Some(7));
        assert_eq!(decoded.score, (3, 5));
        assert_eq!(decoded.cube_value, 4);
        assert_eq!(decoded.cube_owner, CubeOwner::P2);
    }

    #[test]
    fn roller_determines_side_assignment_on_decode() {
        let mut board = Board::starting();
        board.p1[13] = 4;
        board.p1[24] = 3;
        board.turn = PlayerSide::P1;
        let gnu_id = to_gnu_id(&board);
        let decoded = from_gnu_id(&gnu_id).unwrap();
        assert_eq!(decoded.p1, board.p1);
        assert_eq!(decoded.p2, board.p2);
    }

    #[test]
    fn money_game_has_no_match_length() {
        let board = Board::starting();
        let decoded = decode_match_id(&encode_match_id(&board)).unwrap();
        assert_eq!(decoded.match_length, None);
    }
}

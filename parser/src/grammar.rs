//! Hand-written recognizer for the transcript grammar (spec §4.1).

use board::parse_move_text;

use crate::types::{new_game, Game, GameResult, HalfPly, ParsedMatch, Ply};
use crate::ParseError;

/// Parse a full match transcript. Returns `ParseError::Unparseable` only on
/// a structural failure; missing match length or missing game scores are
/// tolerated (spec §4.1 "Failure").
pub fn parse_transcript(text: &str) -> Result<ParsedMatch, ParseError> {
    let lines: Vec<&str> = text.lines().map(str::trim).filter(|l| !l.is_empty()).collect();

    let mut idx = 0;
    let match_length = if let Some(line) = lines.first() {
        match try_parse_match_header(line) {
            Some(n) => {
                idx = 1;
                Some(n)
            }
            None => None,
        }
    } else {
        None
    };

    let mut games: Vec<Game> = Vec::new();
    let mut current: Option<Game> = None;

    while idx < lines.len() {
        let line = lines[idx];

        if let Some(game_number) = try_parse_game_header(line) {
            if let Some(g) = current.take() {
                games.push(g);
            }
            let mut game = new_game(game_number);
            idx += 1;
            if idx < lines.len() {
                if let Some((p1, s1, p2, s2)) = try_parse_score_line(lines[idx]) {
                    game.player1 = Some(p1);
                    game.player2 = Some(p2);
                    game.starting_score = (s1, s2);
                    idx += 1;
                }
            }
            current = Some(game);
            continue;
        }

        if let Some(ply) = try_parse_ply_line(line)? {
            let game = current.get_or_insert_with(|| new_game(0));
            game.plies.push(ply);
            idx += 1;
            continue;
        }

        if let Some(result) = try_parse_terminal_line(line) {
            if let Some(game) = current.as_mut() {
                game.result = Some(result);
            }
            idx += 1;
            continue;
        }

        // Unrecognized stray line: ignored, ply alignment is unaffected.
        idx += 1;
    }

    if let Some(g) = current.take() {
        games.push(g);
    }

    Ok(ParsedMatch { match_length, games })
}

fn try_parse_match_header(line: &str) -> Option<u16> {
    let mut it = line.split_whitespace();
    let n: u16 = it.next()?.parse().ok()?;
    let point = it.next()?;
    if !point.eq_ignore_ascii_case("point") {
        return None;
    }
    let m = it.next()?;
    if !m.to_ascii_lowercase().starts_with("match") {
        return None;
    }
    Some(n)
}

fn try_parse_game_header(line: &str) -> Option<u32> {
    let mut it = line.split_whitespace();
    if it.next()? != "Game" {
        return None;
    }
    it.next()?.parse().ok()
}

/// `^(name)\s*:\s*(score)\s{2,}(name)\s*:\s*(score)$`
fn try_parse_score_line(line: &str) -> Option<(String, u16, String, u16)> {
    let (left, right) = split_on_double_space(line)?;
    let (p1, s1) = split_name_score(&left)?;
    let (p2, s2) = split_name_score(&right)?;
    Some((p1, s1, p2, s2))
}

fn split_name_score(segment: &str) -> Option<(String, u16)> {
    let (name, score) = segment.split_once(':')?;
    let score: u16 = score.trim().parse().ok()?;
    Some((name.trim().to_string(), score))
}

/// `^(\d+)\)\s*(p1half)(  +(p2half))?$`
fn try_parse_ply_line(line: &str) -> Result<Option<Ply>, ParseError> {
    let Some(paren_idx) = line.find(')') else {
        return Ok(None);
    };
    let prefix = &line[..paren_idx];
    if prefix.is_empty() || !prefix.bytes().all(|b| b.is_ascii_digit()) {
        return Ok(None);
    }
    let ply_number: u32 = prefix
        .parse()
        .map_err(|_| ParseError::Unparseable("ply number overflow".to_string()))?;

    let rest = line[paren_idx + 1..].trim_start();
    let (p1_text, p2_text) = match split_on_double_space(rest) {
        Some((a, b)) => (a, Some(b)),
        None => (rest.to_string(), None),
    };

    let p1 = parse_half_ply(p1_text.trim());
    let p2 = p2_text.map(|t| parse_half_ply(t.trim()));

    Ok(Some(Ply {
        ply_number,
        p1,
        p2,
    }))
}

fn parse_half_ply(col: &str) -> HalfPly {
    if col.is_empty() {
        return HalfPly::NoMove;
    }
    if let Some(rest) = col.strip_prefix("Doubles => ") {
        if let Ok(value) = rest.trim().parse() {
            return HalfPly::Double { value };
        }
    }
    if col == "Takes" {
        return HalfPly::Take;
    }
    if col == "Drops" {
        return HalfPly::Drop;
    }
    if let Some(rest) = col.strip_prefix("Wins") {
        let rest = rest.trim();
        if let Some(points) = rest.split_whitespace().next().and_then(|t| t.parse().ok()) {
            return HalfPly::Win { points };
        }
    }
    if let Some(half) = try_parse_dice_half(col) {
        return half;
    }
    HalfPly::Unknown {
        text: col.to_string(),
    }
}

/// `DD: TOKENS` where DD are two digits each in `1..=6`.
fn try_parse_dice_half(col: &str) -> Option<HalfPly> {
    let bytes = col.as_bytes();
    if bytes.len() < 3 || bytes[2] != b':' {
        return None;
    }
    let d1 = (bytes[0] as char).to_digit(10)?;
    let d2 = (bytes[1] as char).to_digit(10)?;
    if !(1..=6).contains(&d1) || !(1..=6).contains(&d2) {
        return None;
    }
    let tokens_text = col[3..].trim();
    let parts = if tokens_text.is_empty() {
        Vec::new()
    } else {
        parse_move_text(tokens_text)
    };
    Some(HalfPly::Move {
        dice: (d1 as u8, d2 as u8),
        parts,
    })
}

/// A line such as `Gary wins 2 points and the match` outside a ply row.
fn try_parse_terminal_line(line: &str) -> Option<GameResult> {
    let idx = line.find("Wins").or_else(|| line.find("wins"))?;
    let (name_part, rest) = line.split_at(idx);
    let rest = rest
        .trim_start_matches("Wins")
        .trim_start_matches("wins")
        .trim();
    let points: u32 = rest.split_whitespace().next()?.parse().ok()?;
    let wins_match = line.contains("and the match");
    Some(GameResult {
        winner_name: name_part.trim().to_string(),
        points,
        wins_match,
    })
}

fn split_on_double_space(s: &str) -> Option<(String, String)> {
    let bytes = s.as_bytes();
    let mut i = 0;
    while i + 1 < bytes.len() {
        if bytes[i] == b' ' && bytes[i + 1] == b' ' {
            let mut j = i;
            while j < bytes.len() && bytes[j] == b' ' {
                j += 1;
            }
            let left = s[..i].trim().to_string();
            let right = s[j..].trim().to_string();
            if right.is_empty() {
                return None;
            }
            return Some((left, right));
        }
        i += 1;
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use board::MovePart;

    #[test]
    fn parses_match_length_header() {
        let m = parse_transcript("7 point match\n\nGame 1\nGary : 0  Hailey : 0\n").unwrap();
        assert_eq!(m.match_length, Some(7));
        assert_eq!(m.games.len(), 1);
        assert_eq!(m.games[0].player1.as_deref(), Some("Gary"));
        assert_eq!(m.games[0].starting_score, (0, 0));
    }

    #[test]
    fn missing_match_header_does_not_abort() {
        let m = parse_transcript("Game 1\nGary : 0  Hailey : 0\n").unwrap();
        assert_eq!(m.match_length, None);
        assert_eq!(m.games.len(), 1);
    }

    #[test]
    fn bar_reentry_ply_parses_both_dialects() {
        let text = "7 point match\n\nGame 1\nGary : 0  Hailey : 0\n  8) 61:                               62: bar/19* 24/18\n";
        let m = parse_transcript(text).unwrap();
        let ply = &m.games[0].plies[0];
        assert_eq!(ply.ply_number, 8);
        assert_eq!(ply.p1, HalfPly::NoMove);
        assert_eq!(
            ply.p2,
            Some(HalfPly::Move {
                dice: (6, 2),
                parts: vec![MovePart::new(25, 19, true), MovePart::new(24, 18, false)],
            })
        );

        let text2 = "7 point match\n\nGame 1\nGary : 0  Hailey : 0\n  8) 61:                               62: 25/19* 24/18\n";
        let m2 = parse_transcript(text2).unwrap();
        assert_eq!(m2.games[0].plies[0].p2, ply.p2);
    }

    #[test]
    fn forced_pass_has_empty_parts() {
        let text = "Game 1\nGary : 0  Hailey : 0\n  3) 31:  \n";
        let m = parse_transcript(text).unwrap();
        assert_eq!(
            m.games[0].plies[0].p1,
            HalfPly::Move {
                dice: (3, 1),
                parts: vec![]
            }
        );
    }

    #[test]
    fn doubles_takes_drops_and_wins_are_recognized() {
        let text = "Game 1\nGary : 0  Hailey : 0\n  5) Doubles => 2                        Takes\n  6) Drops\n";
        let m = parse_transcript(text).unwrap();
        assert_eq!(m.games[0].plies[0].p1, HalfPly::Double { value: 2 });
        assert_eq!(m.games[0].plies[0].p2, Some(HalfPly::Take));
        assert_eq!(m.games[0].plies[1].p1, HalfPly::Drop);
    }

    #[test]
    fn unknown_text_is_preserved_without_breaking_alignment() {
        let text = "Game 1\nGary : 0  Hailey : 0\n  1) garbled text here             31: 8/5 6/5\n";
        let m = parse_transcript(text).unwrap();
        match &m.games[0].plies[0].p1 {
            HalfPly::Unknown { text } => assert_eq!(text, "garbled text here"),
            other => panic!("expected Unknown, got {other:?}"),
        }
    }

    #[test]
    fn game_header_without_score_line_has_null_players() {
        let text = "Game 1\n  1) 31: 8/5 6/5\n";
        let m = parse_transcript(text).unwrap();
        assert_eq!(m.games[0].player1, None);
        assert_eq!(m.games[0].player2, None);
        assert_eq!(m.games[0].plies.len(), 1);
    }
}

//! Move representation and canonical-equivalence comparison (spec §3, §4.4).

use std::fmt;

/// One checker's movement within a larger move.
///
/// `from` is `1..=25` (`25` = bar). `to` is `0..=24` (`0` = bearoff).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct MovePart {
    pub from: u8,
    pub to: u8,
    pub hit: bool,
}

impl MovePart {
    #[must_use]
    pub fn new(from: u8, to: u8, hit: bool) -> Self {
        Self { from, to, hit }
    }

    /// Canonical token text, e.g. `8/5`, `6/3*`, `bar/19*`, `8/off`.
    #[must_use]
    pub fn token(self) -> String {
        let from = if self.from == 25 {
            "bar".to_string()
        } else {
            self.from.to_string()
        };
        let to = if self.to == 0 {
            "off".to_string()
        } else {
            self.to.to_string()
        };
        if self.hit {
            format!("{from}/{to}*")
        } else {
            format!("{from}/{to}")
        }
    }
}

impl fmt::Display for MovePart {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.token())
    }
}

/// An ordered list of single-checker parts (spec §3 "Move").
pub type Move = Vec<MovePart>;

/// Render a full move as space-separated canonical tokens, in part order.
#[must_use]
pub fn format_move(mv: &[MovePart]) -> String {
    mv.iter().map(|p| p.token()).collect::<Vec<_>>().join(" ")
}

/// Parse one whitespace-delimited move token, expanding the `(n)` shorthand
/// repeat suffix used in engine output (spec §4.3/§4.4). `*` is kept only on
/// the first expanded copy. Unknown tokens return `None` and are dropped by
/// the caller (spec §4.1).
///
/// Accepts `^(bar|\d+)/(off|\d+)(\*)?(\((\d+)\))?$`, case-insensitively on
/// `bar`/`off`.
#[must_use]
pub fn parse_move_token(raw: &str) -> Option<Vec<MovePart>> {
    let (body, repeat) = match raw.rsplit_once('(') {
        Some((b, rest)) => {
            let digits = rest.strip_suffix(')')?;
            let n: u32 = digits.parse().ok()?;
            (b, n)
        }
        None => (raw, 1),
    };

    let (body, hit) = match body.strip_suffix('*') {
        Some(b) => (b, true),
        None => (body, false),
    };

    let (from_str, to_str) = body.split_once('/')?;

    let from = parse_side(from_str, 25)?;
    let to = parse_side(to_str, 0)?;

    if repeat == 0 {
        return Some(Vec::new());
    }

    let mut parts = Vec::with_capacity(repeat as usize);
    parts.push(MovePart::new(from, to, hit));
    for _ in 1..repeat {
        parts.push(MovePart::new(from, to, false));
    }
    Some(parts)
}

fn parse_side(s: &str, special: u8) -> Option<u8> {
    if s.eq_ignore_ascii_case("bar") || s.eq_ignore_ascii_case("off") {
        return Some(special);
    }
    s.parse::<u8>().ok()
}

/// Parse a full whitespace-separated move text into parts, dropping any
/// token that fails to parse (spec §4.1 "Unknown tokens are silently
/// dropped").
#[must_use]
pub fn parse_move_text(text: &str) -> Vec<MovePart> {
    text.split_whitespace()
        .filter_map(parse_move_token)
        .flatten()
        .collect()
}

/// The canonical form of a move: the sorted multiset of its part tokens
/// (spec §4.4). Two moves are equivalent iff their canonical forms match.
#[must_use]
pub fn canonical_form(mv: &[MovePart]) -> Vec<String> {
    let mut tokens: Vec<String> = mv.iter().map(|p| p.token()).collect();
    tokens.sort();
    tokens
}

/// Canonical form of raw move text, after shorthand expansion.
#[must_use]
pub fn canonical_form_of_text(text: &str) -> Vec<String> {
    canonical_form(&parse_move_text(text))
}

/// Whether two moves are canonically equivalent (spec §4.4, §3).
#[must_use]
pub fn moves_equivalent(a: &[MovePart], b: &[MovePart]) -> bool {
    canonical_form(a) == canonical_form(b)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shorthand_expansion_matches_spec_example() {
        // Seed 3: "8/5(2) 6/3*(2)" canonicalizes to {8/5, 8/5, 6/3*, 6/3}.
        let parts = parse_move_text("8/5(2) 6/3*(2)");
        let mut canon = canonical_form(&parts);
        canon.sort();
        let mut expected = vec![
            "8/5".to_string(),
            "8/5".to_string(),
            "6/3*".to_string(),
            "6/3".to_string(),
        ];
        expected.sort();
        assert_eq!(canon, expected);
    }

    #[test]
    fn canonicalization_is_commutative_under_reordering() {
        let a = parse_move_text("8/5 6/3*");
        let b = parse_move_text("6/3* 8/5");
        assert!(moves_equivalent(&a, &b));
    }

    #[test]
    fn bar_and_off_round_trip_through_tokens() {
        let parts = parse_move_text("bar/19* 24/18");
        assert_eq!(parts[0], MovePart::new(25, 19, true));
        assert_eq!(parts[1], MovePart::new(24, 18, false));
        assert_eq!(format_move(&parts), "bar/19* 24/18");
    }

    #[test]
    fn unknown_tokens_are_dropped() {
        let parts = parse_move_text("8/5 garbage 6/3");
        assert_eq!(parts.len(), 2);
    }

    #[test]
    fn reflexive_equivalence() {
        let a = parse_move_text("8/3 6/3");
        assert!(moves_equivalent(&a, &a));
    }
}

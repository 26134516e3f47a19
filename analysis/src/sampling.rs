//! Distractor sampling for quiz choices (spec §4.5 steps 6-7, §9).
//!
//! Uses the OS CSPRNG rather than a seedable PRNG: the selection has no
//! adversarial stakes, but a biased sampler would be a foot-gun later.

use engine::Candidate;
use rand::{rngs::OsRng, Rng};

use crate::quiz::MoveEquity;

fn to_move_equity(candidate: &Candidate) -> Option<MoveEquity> {
    Some(MoveEquity {
        move_text: candidate.move_text.clone(),
        equity: candidate.equity?,
    })
}

/// Pick the "higher" distractor: the candidate at index 2 when the user
/// played the second-best move, otherwise a uniformly random candidate
/// ranked strictly above the user's.
pub fn sample_higher(candidates: &[Candidate], user_rank: usize) -> Option<MoveEquity> {
    if user_rank == 0 {
        return None;
    }
    if user_rank == 1 {
        return candidates.get(2).and_then(to_move_equity);
    }
    let idx = OsRng.gen_range(0..user_rank);
    candidates.get(idx).and_then(to_move_equity)
}

/// Pick the "lower" distractor: uniformly random from the window just below
/// the user's rank.
pub fn sample_lower(candidates: &[Candidate], user_rank: usize) -> Option<MoveEquity> {
    let len = candidates.len();
    if user_rank + 1 >= len {
        return None;
    }
    let hi = (user_rank + 2).min(len - 1);
    let idx = if hi == user_rank + 1 {
        user_rank + 1
    } else {
        OsRng.gen_range(user_rank + 1..=hi)
    };
    candidates.get(idx).and_then(to_move_equity)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(text: &str, equity: f64) -> Candidate {
        Candidate {
            move_text: text.to_string(),
            parts: board::parse_move_text(text),
            equity: Some(equity),
            mwc: None,
        }
    }

    #[test]
    fn rank_one_prefers_index_two() {
        let candidates = vec![
            candidate("8/3 6/3", 0.087),
            candidate("8/5 6/3", 0.05),
            candidate("8/5 8/3", 0.01),
        ];
        let higher = sample_higher(&candidates, 1).unwrap();
        assert_eq!(higher.move_text, "8/5 8/3");
    }

    #[test]
    fn rank_zero_has_no_higher_sample() {
        let candidates = vec![candidate("8/3 6/3", 0.087)];
        assert!(sample_higher(&candidates, 0).is_none());
    }

    #[test]
    fn high_rank_samples_from_window_below() {
        let candidates: Vec<Candidate> = (0..10)
            .map(|i| candidate(&format!("move{i}"), 1.0 - i as f64 * 0.1))
            .collect();
        let lower = sample_lower(&candidates, 8).unwrap();
        assert_eq!(lower.move_text, "move9");
    }

    #[test]
    fn last_rank_has_no_lower_sample() {
        let candidates = vec![candidate("a", 0.1), candidate("b", 0.0)];
        assert!(sample_lower(&candidates, 1).is_none());
    }
}

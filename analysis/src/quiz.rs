//! Quiz record types and content-addressed identity (spec §3).

use board::PlayerSide;
use sha1::{Digest, Sha1};

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct MoveEquity {
    #[serde(rename = "move")]
    pub move_text: String,
    pub equity: f64,
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct UserAnswer {
    pub name: String,
    #[serde(rename = "move")]
    pub move_text: String,
    pub equity: f64,
    pub rank: usize,
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct QuizContext {
    #[serde(rename = "gameNumber")]
    pub game_number: u32,
    #[serde(rename = "plyIndex")]
    pub ply_index: u32,
    pub player: PlayerSide,
    pub dice: (u8, u8),
    #[serde(rename = "equityDiff")]
    pub equity_diff: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
pub struct QuizCounters {
    #[serde(rename = "playCount")]
    pub play_count: u32,
    #[serde(rename = "correctAnswers")]
    pub correct_answers: u32,
}

/// Content-addressed quiz entity (spec §3 "Quiz record").
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct QuizRecord {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(rename = "gnuId")]
    pub gnu_id: String,
    pub best: MoveEquity,
    pub user: UserAnswer,
    #[serde(rename = "higherSample", skip_serializing_if = "Option::is_none")]
    pub higher_sample: Option<MoveEquity>,
    #[serde(rename = "lowerSample", skip_serializing_if = "Option::is_none")]
    pub lower_sample: Option<MoveEquity>,
    pub context: QuizContext,
    pub quiz: QuizCounters,
}

impl QuizRecord {
    /// `correctAnswers ≤ playCount` and `equityDiff ≥ threshold` (spec §3, §8).
    #[must_use]
    pub fn check_invariants(&self, threshold: f64) -> bool {
        self.quiz.correct_answers <= self.quiz.play_count
            && self.context.equity_diff >= threshold
    }
}

/// `id = truncate(SHA1(gnuId|player|gameNumber|plyIndex|userName), 16 hex chars)`
/// (spec §3 "Identity"). Depends only on its five inputs, so equal inputs
/// always produce equal ids (spec §8).
#[must_use]
pub fn compute_id(
    gnu_id: &str,
    player: PlayerSide,
    game_number: u32,
    ply_index: u32,
    user_name: &str,
) -> String {
    let preimage = format!("{gnu_id}|{player}|{game_number}|{ply_index}|{user_name}");
    let mut hasher = Sha1::new();
    hasher.update(preimage.as_bytes());
    let digest = hasher.finalize();
    let hex: String = digest.iter().map(|b| format!("{b:02x}")).collect();
    hex[..16].to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_record() -> QuizRecord {
        QuizRecord {
            id: "id1".to_string(),
            kind: "move".to_string(),
            gnu_id: "abc:def".to_string(),
            best: MoveEquity {
                move_text: "8/3 6/3".to_string(),
                equity: 0.2,
            },
            user: UserAnswer {
                name: "gary".to_string(),
                move_text: "8/3 8/5".to_string(),
                equity: 0.0,
                rank: 5,
            },
            higher_sample: None,
            lower_sample: None,
            context: QuizContext {
                game_number: 1,
                ply_index: 8,
                player: PlayerSide::P1,
                dice: (6, 1),
                equity_diff: 0.2,
            },
            quiz: QuizCounters {
                play_count: 3,
                correct_answers: 2,
            },
        }
    }

    #[test]
    fn invariants_hold_for_a_well_formed_record() {
        assert!(sample_record().check_invariants(0.08));
    }

    #[test]
    fn invariants_fail_when_correct_answers_exceed_play_count() {
        let mut record = sample_record();
        record.quiz.correct_answers = record.quiz.play_count + 1;
        assert!(!record.check_invariants(0.08));
    }

    #[test]
    fn invariants_fail_when_equity_diff_is_below_threshold() {
        let mut record = sample_record();
        record.context.equity_diff = 0.01;
        assert!(!record.check_invariants(0.08));
    }

    #[test]
    fn id_is_deterministic_given_same_inputs() {
        let a = compute_id("abc:def", PlayerSide::P1, 1, 8, "gary");
        let b = compute_id("abc:def", PlayerSide::P1, 1, 8, "gary");
        assert_eq!(a, b);
        assert_eq!(a.len(), 16);
    }

    #[test]
    fn id_changes_with_any_input() {
        let base = compute_id("abc:def", PlayerSide::P1, 1, 8, "gary");
        assert_ne!(base, compute_id("abc:def", PlayerSide::P2, 1, 8, "gary"));
        assert_ne!(base, compute_id("abc:def", PlayerSide::P1, 2, 8, "gary"));
        assert_ne!(base, compute_id("abc:def", PlayerSide::P1, 1, 9, "gary"));
        assert_ne!(base, compute_id("abc:def", PlayerSide::P1, 1, 8, "hailey"));
    }
}

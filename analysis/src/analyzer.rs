//! Per-ply analysis driver (spec §4.5 "Position analyzer").

use board::{moves_equivalent, to_gnu_id, Board, PlayerSide};
use engine::{EngineDriver, EngineRequest};
use parser::{Game, HalfPly, ParsedMatch};

use crate::quiz::{compute_id, MoveEquity, QuizContext, QuizCounters, QuizRecord, UserAnswer};
use crate::sampling::{sample_higher, sample_lower};

#[derive(Debug, Clone)]
pub struct AnalyzeOptions {
    /// Exact player name to restrict analysis to; `None` analyzes both sides.
    pub user_name: Option<String>,
    pub threshold: f64,
}

fn player_name(game: &Game, side: PlayerSide) -> Option<&str> {
    match side {
        PlayerSide::P1 => game.player1.as_deref(),
        PlayerSide::P2 => game.player2.as_deref(),
    }
}

/// Walk every ply of every game in `match_`, calling the engine through
/// `driver` for every move half-ply, and return quiz records for every
/// mistake that clears `opts.threshold` (spec §4.5).
///
/// Records are sorted by `equityDiff` descending across the whole match,
/// ties broken by insertion order (spec §4.5 "Sorting").
pub async fn analyze_match(
    match_: &ParsedMatch,
    driver: &EngineDriver,
    opts: &AnalyzeOptions,
) -> Vec<QuizRecord> {
    let mut records = Vec::new();

    for game in &match_.games {
        let mut board = Board::starting();
        board.match_length = match_.match_length;
        board.score = game.starting_score;

        for ply in &game.plies {
            analyze_half_ply(
                &mut board,
                game,
                ply.ply_number,
                PlayerSide::P1,
                &ply.p1,
                driver,
                opts,
                &mut records,
            )
            .await;

            if let Some(p2) = &ply.p2 {
                analyze_half_ply(
                    &mut board,
                    game,
                    ply.ply_number,
                    PlayerSide::P2,
                    p2,
                    driver,
                    opts,
                    &mut records,
                )
                .await;
            }
        }
    }

    records.sort_by(|a, b| {
        b.context
            .equity_diff
            .partial_cmp(&a.context.equity_diff)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    records
}

#[allow(clippy::too_many_arguments)]
async fn analyze_half_ply(
    board: &mut Board,
    game: &Game,
    ply_number: u32,
    side: PlayerSide,
    half_ply: &HalfPly,
    driver: &EngineDriver,
    opts: &AnalyzeOptions,
    records: &mut Vec<QuizRecord>,
) {
    let HalfPly::Move { dice, parts } = half_ply else {
        return;
    };

    board.turn = side;
    board.dice = Some(*dice);

    let should_score = match &opts.user_name {
        Some(wanted) => player_name(game, side) == Some(wanted.as_str()),
        None => true,
    };

    if should_score {
        if let Some(record) = score_ply(board, game, ply_number, side, *dice, parts, driver, opts)
            .await
        {
            records.push(record);
        }
    }

    board.apply_move_parts(side, parts);
}

#[allow(clippy::too_many_arguments)]
async fn score_ply(
    board: &Board,
    game: &Game,
    ply_number: u32,
    side: PlayerSide,
    dice: (u8, u8),
    played_parts: &[board::MovePart],
    driver: &EngineDriver,
    opts: &AnalyzeOptions,
) -> Option<QuizRecord> {
    let Some(user_name) = player_name(game, side) else {
        return None;
    };

    let gnu_id = to_gnu_id(board);
    let Some((position_id, match_id)) = gnu_id.split_once(':') else {
        tracing::error!(
            error = %crate::AnalysisError::MalformedGnuId(gnu_id.clone()),
            "skipping ply"
        );
        return None;
    };

    let request = EngineRequest {
        match_id: match_id.to_string(),
        position_id: Some(position_id.to_string()),
        position_index: None,
        dice: Some(dice),
    };
    let result = driver.analyze(&request).await;
    if !result.engine_available || result.moves.is_empty() {
        return None;
    }

    let user_rank = result
        .moves
        .iter()
        .position(|c| moves_equivalent(&c.parts, played_parts))?;

    let best = &result.moves[0];
    let user_candidate = &result.moves[user_rank];
    let (best_equity, user_equity) = (best.equity?, user_candidate.equity?);

    let equity_diff = best_equity - user_equity;
    if equity_diff < opts.threshold {
        return None;
    }

    let higher_sample = sample_higher(&result.moves, user_rank);
    let lower_sample = sample_lower(&result.moves, user_rank);

    let id = compute_id(&gnu_id, side, game.game_number, ply_number, user_name);

    Some(QuizRecord {
        id,
        kind: "move".to_string(),
        gnu_id,
        best: MoveEquity {
            move_text: best.move_text.clone(),
            equity: best_equity,
        },
        user: UserAnswer {
            name: user_name.to_string(),
            move_text: user_candidate.move_text.clone(),
            equity: user_equity,
            rank: user_rank,
        },
        higher_sample,
        lower_sample,
        context: QuizContext {
            game_number: game.game_number,
            ply_index: ply_number,
            player: side,
            dice,
            equity_diff,
        },
        quiz: QuizCounters::default(),
    })
}

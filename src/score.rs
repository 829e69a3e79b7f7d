//! Beauty scoring for finished puzzles.
//!
//! The score is a weighted sum of hand-chosen aesthetics: a flat reward
//! for any forced mate, a penalty for solving from material advantage,
//! a bonus for solutions no longer than the announced mate, and bonuses
//! for sacrifices and underpromotions found along the solution line.

use shakmaty::{Chess, Color, Move, Position, Role, Square};

use crate::puzzle::Puzzle;
use crate::rules;

pub const MATE_MOVES_DIFF: f64 = 5.0;
pub const SACRIFICE: f64 = 10.0;
pub const UNDER_PROMOTION: f64 = 15.0;
pub const CP: f64 = 0.02;
pub const PIECE_DIFF: f64 = -1.5;
pub const MATE_REWARD: f64 = 250.0;

/// Score returned for a puzzle whose FEN does not parse.
pub const INVALID_FEN_SCORE: f64 = -100.0;

/// Plies after which the greedy capture walk gives up; synthesized
/// positions can otherwise alternate captures pathologically.
const CAPTURE_WALK_MAX_PLIES: u32 = 16;

fn piece_value(role: Role) -> i32 {
    match role {
        Role::Pawn => 1,
        Role::Knight | Role::Bishop => 3,
        Role::Rook => 5,
        Role::Queen => 9,
        Role::King => 0,
    }
}

/// Compute the beauty score of a puzzle. Pure and deterministic.
///
/// An unparseable position scores [`INVALID_FEN_SCORE`]; a solution
/// containing an unparseable or illegal move scores 0.
#[must_use]
pub fn score(puzzle: &Puzzle) -> f64 {
    let start = match rules::position_from_fen(&puzzle.position) {
        Ok(pos) => pos,
        Err(_) => return INVALID_FEN_SCORE,
    };

    let mut total = 0.0;
    if puzzle.mate_in > 0 {
        total += MATE_REWARD;
    }
    total += PIECE_DIFF * f64::from(material_gap(&start));

    if start.is_game_over() {
        return total;
    }
    if puzzle.mate_in == 0 {
        return total + CP * f64::from(puzzle.cp);
    }

    // Bonus for announcing the mate no earlier than the solution
    // delivers it; a solution that drags past the announced distance
    // dilutes the bonus.
    let length_gap = puzzle.solution.len() as i32 / 2 - puzzle.mate_in as i32 + 1;
    total += if length_gap == 0 {
        MATE_MOVES_DIFF
    } else {
        MATE_MOVES_DIFF / f64::from(length_gap)
    };

    let mut pos = start;
    let mut under_promotions = 0i32;
    let mut sacrificed = 0i32;
    for (ply, mv) in puzzle.solution.iter().enumerate() {
        let played = match rules::play_uci(&mut pos, mv) {
            Ok(m) => m,
            Err(_) => return 0.0,
        };
        if ply % 2 == 1 {
            continue;
        }
        // Promotions are judged on the promotion itself, not on the
        // capture race that follows.
        match played.promotion() {
            Some(role) => {
                if role != Role::Queen {
                    under_promotions += 1;
                }
                continue;
            }
            None => {}
        }
        let lost = material_lost(pos.clone(), 0);
        if lost >= 0 {
            sacrificed += lost;
        }
    }

    total + SACRIFICE * f64::from(sacrificed) + UNDER_PROMOTION * f64::from(under_promotions)
}

/// Material balance from the mover's point of view, in pawn units.
fn material_gap(pos: &Chess) -> i32 {
    let mut white = 0;
    let mut black = 0;
    for sq in Square::ALL {
        if let Some(piece) = pos.board().piece_at(sq) {
            match piece.color {
                Color::White => white += piece_value(piece.role),
                Color::Black => black += piece_value(piece.role),
            }
        }
    }
    match pos.turn() {
        Color::White => white - black,
        Color::Black => black - white,
    }
}

/// Net material the side to move wins back in a greedy capture race:
/// each side alternately takes the most valuable piece it can reach
/// until no capture is left. Positive means the previous mover's piece
/// investment is actually lost.
fn material_lost(mut pos: Chess, depth: u32) -> i32 {
    if depth >= CAPTURE_WALK_MAX_PLIES {
        return 0;
    }

    let mut best: Option<Move> = None;
    let mut best_value = 0;
    for mv in pos.legal_moves() {
        if let Some(victim) = mv.capture() {
            let value = piece_value(victim);
            if value > best_value {
                best_value = value;
                best = Some(mv);
            }
        }
    }

    let Some(capture) = best else {
        return 0;
    };
    pos.play_unchecked(&capture);
    best_value - material_lost(pos, depth + 1)
}

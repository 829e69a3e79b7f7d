//! Position synthesizer: random generation and annealing mutation.
//!
//! Every FEN leaving this module keeps the placement invariants the
//! rest of the pipeline relies on: both kings present, never adjacent
//! or mutually attacking, each king unattacked at the moment it is
//! seated, and no pawn on rank 1 or rank 8.

use std::fmt;

use log::debug;
use once_cell::sync::Lazy;
use rand::seq::SliceRandom;
use rand::Rng;
use rand_distr::{Distribution, Normal};
use serde::Deserialize;

use crate::board::attacks::KING_ATTACKS;
use crate::board::{
    is_pawn, side_attacks, Board, Color, FenError, Position, Square, BLACK_BISHOP, BLACK_KING,
    BLACK_KNIGHT, BLACK_PAWN, BLACK_QUEEN, BLACK_ROOK, CASTLE_BLACK_K, CASTLE_BLACK_Q,
    CASTLE_WHITE_K, CASTLE_WHITE_Q, NON_KING_CODES, WHITE_BISHOP, WHITE_KING, WHITE_KNIGHT,
    WHITE_PAWN, WHITE_QUEEN, WHITE_ROOK,
};

/// Most non-king pieces a synthesized board may carry; the two kings
/// come on top.
pub const MAX_NON_KING_PIECES: u32 = 30;

/// Gaussian noise applied to the mutation step size.
static STEP_NOISE: Lazy<Normal<f64>> =
    Lazy::new(|| Normal::new(1.0, 0.5).expect("valid noise distribution"));

/// Squares that must be safe from the opponent for each castling
/// letter, keyed `(letter bit, squares)`.
const CASTLE_PATHS: [(u8, &[Square]); 4] = [
    (CASTLE_WHITE_K, &[Square(7, 5), Square(7, 6)]),
    (CASTLE_WHITE_Q, &[Square(7, 1), Square(7, 2), Square(7, 3)]),
    (CASTLE_BLACK_K, &[Square(0, 5), Square(0, 6)]),
    (CASTLE_BLACK_Q, &[Square(0, 1), Square(0, 2), Square(0, 3)]),
];

/// Errors surfaced by the synthesizer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PositionError {
    /// Piece counts add up past the 30 non-king maximum
    InvalidPieceCount { total: u32 },
    /// The input FEN could not be parsed
    InvalidFen(FenError),
}

impl fmt::Display for PositionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PositionError::InvalidPieceCount { total } => {
                write!(
                    f,
                    "piece counts add up to {total}, must be at most {MAX_NON_KING_PIECES}"
                )
            }
            PositionError::InvalidFen(e) => write!(f, "invalid FEN: {e}"),
        }
    }
}

impl std::error::Error for PositionError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            PositionError::InvalidFen(e) => Some(e),
            PositionError::InvalidPieceCount { .. } => None,
        }
    }
}

impl From<FenError> for PositionError {
    fn from(e: FenError) -> Self {
        PositionError::InvalidFen(e)
    }
}

/// Per-side piece counts for random generation.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
pub struct PieceCountConfig {
    pub white_q: u8,
    pub white_r: u8,
    pub white_b: u8,
    pub white_n: u8,
    pub white_p: u8,
    pub black_q: u8,
    pub black_r: u8,
    pub black_b: u8,
    pub black_n: u8,
    pub black_p: u8,
}

impl PieceCountConfig {
    /// Total non-king pieces the config asks for.
    #[must_use]
    pub fn total(&self) -> u32 {
        [
            self.white_q,
            self.white_r,
            self.white_b,
            self.white_n,
            self.white_p,
            self.black_q,
            self.black_r,
            self.black_b,
            self.black_n,
            self.black_p,
        ]
        .iter()
        .map(|&n| u32::from(n))
        .sum()
    }

    fn piece_bag(&self) -> Vec<u8> {
        let counts = [
            (WHITE_QUEEN, self.white_q),
            (WHITE_ROOK, self.white_r),
            (WHITE_BISHOP, self.white_b),
            (WHITE_KNIGHT, self.white_n),
            (WHITE_PAWN, self.white_p),
            (BLACK_QUEEN, self.black_q),
            (BLACK_ROOK, self.black_r),
            (BLACK_BISHOP, self.black_b),
            (BLACK_KNIGHT, self.black_n),
            (BLACK_PAWN, self.black_p),
        ];
        let mut bag = Vec::with_capacity(self.total() as usize);
        for (code, count) in counts {
            bag.extend(std::iter::repeat(code).take(usize::from(count)));
        }
        bag
    }
}

/// Generate a random position from the piece counts and render it as a
/// FEN string.
///
/// Pieces land on uniformly drawn empty squares (pawns restricted to
/// ranks 2..=7), then the white and black kings are seated on squares
/// the opponent does not attack. Side to move is a coin flip; castling
/// rights and en-passant are derived from the final board.
pub fn generate_random_fen<R: Rng>(
    cfg: &PieceCountConfig,
    rng: &mut R,
) -> Result<String, PositionError> {
    let total = cfg.total();
    if total > MAX_NON_KING_PIECES {
        return Err(PositionError::InvalidPieceCount { total });
    }

    let mut board = Board::empty();
    let mut bag = cfg.piece_bag();
    bag.shuffle(rng);
    for code in bag {
        place_piece(&mut board, code, rng);
    }

    seat_kings(&mut board, None, None, rng);
    let white_to_move = rng.gen_bool(0.5);

    let mut pos = Position::new(board, white_to_move);
    pos.castling_rights = derive_castling(&board);
    pos.en_passant_file = derive_en_passant(&board, white_to_move, rng.gen_range(0..8));
    Ok(pos.to_fen())
}

/// Mutate a position toward `piece_target` non-king pieces and render
/// the result.
///
/// The step size is `floor((piece_target - current) * n)` with
/// `n ~ Normal(1, 0.5)`, clamped so at least one piece survives and the
/// board never exceeds the 30-piece cap. A zero step swaps one piece
/// for a different type instead. Kings keep their squares whenever
/// those squares are still legal, so small mutations preserve the shape
/// of the position.
pub fn mutate_fen<R: Rng>(
    fen: &str,
    piece_target: u32,
    rng: &mut R,
) -> Result<String, PositionError> {
    let parsed = Position::try_from_fen(fen)?;
    let mut board = parsed.board;

    // Lift the kings; they are re-seated after the material changes.
    let white_king_prev = board.king_square(Color::White);
    let black_king_prev = board.king_square(Color::Black);
    if let Some(sq) = white_king_prev {
        board.clear(sq);
    }
    if let Some(sq) = black_king_prev {
        board.clear(sq);
    }

    let current = board.non_king_count() as i32;
    let noise = STEP_NOISE.sample(rng);
    let raw = ((f64::from(piece_target as i32 - current)) * noise).floor() as i32;
    let delta = raw.clamp(-current + 1, MAX_NON_KING_PIECES as i32 - current);
    debug!("mutating {current} pieces by {delta} toward {piece_target}");

    match delta {
        0 => swap_piece(&mut board, rng),
        d if d > 0 => {
            for _ in 0..d {
                let code = NON_KING_CODES[rng.gen_range(0..NON_KING_CODES.len())];
                place_piece(&mut board, code, rng);
            }
        }
        d => {
            for _ in 0..-d {
                remove_piece(&mut board, rng);
            }
        }
    }

    seat_kings(&mut board, white_king_prev, black_king_prev, rng);

    let mut pos = Position::new(board, parsed.white_to_move);
    pos.castling_rights = derive_castling(&board);
    pos.en_passant_file = derive_en_passant(&board, parsed.white_to_move, rng.gen_range(0..8));
    Ok(pos.to_fen())
}

/// Drop `code` on a uniformly drawn empty square, retrying until one is
/// found. Pawns only ever land on rows 1..=6.
fn place_piece<R: Rng>(board: &mut Board, code: u8, rng: &mut R) -> Square {
    loop {
        let row = if is_pawn(code) {
            rng.gen_range(1..7)
        } else {
            rng.gen_range(0..8)
        };
        let sq = Square(row, rng.gen_range(0..8));
        if board.is_empty_at(sq) {
            board.set(sq, code);
            return sq;
        }
    }
}

/// Replace one piece on the board with a freshly drawn type at a new
/// square. No-op when every occupant already has the drawn type.
fn swap_piece<R: Rng>(board: &mut Board, rng: &mut R) {
    let code = NON_KING_CODES[rng.gen_range(0..NON_KING_CODES.len())];
    if !board.pieces().any(|(_, c)| c != code) {
        return;
    }
    loop {
        let sq = Square(rng.gen_range(0..8), rng.gen_range(0..8));
        let occupant = board.get(sq);
        if occupant != 0 && occupant != code {
            board.clear(sq);
            place_piece(board, code, rng);
            return;
        }
    }
}

/// Clear the first occupied square found scanning onward from a random
/// seed index, wrapping around the board.
fn remove_piece<R: Rng>(board: &mut Board, rng: &mut R) {
    let seed = rng.gen_range(0..64);
    for offset in 0..64 {
        let sq = Square::from_index((seed + offset) % 64);
        if !board.is_empty_at(sq) {
            board.clear(sq);
            return;
        }
    }
}

/// Seat both kings, preferring their previous squares when still empty
/// and unattacked. The white king goes first and its attack squares are
/// folded into the white set before the black king is filtered against
/// it, which is what keeps the kings from ever touching.
fn seat_kings<R: Rng>(
    board: &mut Board,
    white_prev: Option<Square>,
    black_prev: Option<Square>,
    rng: &mut R,
) {
    let white_attacks = side_attacks(board, Color::White);
    let black_attacks = side_attacks(board, Color::Black);

    let white_sq = seat_one_king(board, WHITE_KING, white_prev, black_attacks, rng);
    let white_attacks = white_attacks | KING_ATTACKS[white_sq.index()];
    seat_one_king(board, BLACK_KING, black_prev, white_attacks, rng);
}

fn seat_one_king<R: Rng>(
    board: &mut Board,
    king: u8,
    prev: Option<Square>,
    enemy_attacks: u64,
    rng: &mut R,
) -> Square {
    if let Some(sq) = prev {
        if board.is_empty_at(sq) && enemy_attacks & sq.bit() == 0 {
            board.set(sq, king);
            return sq;
        }
    }
    loop {
        let sq = Square(rng.gen_range(0..8), rng.gen_range(0..8));
        if board.is_empty_at(sq) && enemy_attacks & sq.bit() == 0 {
            board.set(sq, king);
            return sq;
        }
    }
}

/// Castling rights for the board: a letter is granted only when the
/// king sits on its home square and the opponent attacks none of the
/// path squares for that wing.
fn derive_castling(board: &Board) -> u8 {
    let white_attacks = side_attacks(board, Color::White);
    let black_attacks = side_attacks(board, Color::Black);
    let white_home = board.get(Square(7, 4)) == WHITE_KING;
    let black_home = board.get(Square(0, 4)) == BLACK_KING;

    let mut rights = 0u8;
    for (bit, path) in CASTLE_PATHS {
        let white_wing = bit == CASTLE_WHITE_K || bit == CASTLE_WHITE_Q;
        if white_wing && !white_home || !white_wing && !black_home {
            continue;
        }
        let enemy = if white_wing {
            black_attacks
        } else {
            white_attacks
        };
        if path.iter().all(|sq| enemy & sq.bit() == 0) {
            rights |= bit;
        }
    }
    rights
}

/// En-passant file for the board, or `None` when the double-push shape
/// is missing on the drawn file. The emission is speculative: it checks
/// the shape, not the actual last move.
fn derive_en_passant(board: &Board, white_to_move: bool, file: usize) -> Option<usize> {
    let shape = if white_to_move {
        board.get(Square(4, file)) == BLACK_PAWN
            && board.is_empty_at(Square(5, file))
            && board.is_empty_at(Square(6, file))
    } else {
        board.get(Square(3, file)) == WHITE_PAWN
            && board.is_empty_at(Square(2, file))
            && board.is_empty_at(Square(1, file))
    };
    shape.then_some(file)
}

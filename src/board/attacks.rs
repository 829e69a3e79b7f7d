//! Attack-square generation over the byte board.
//!
//! Results are 64-bit bitboards keyed by `row * 8 + col`. Knight and
//! king moves are occupancy-independent and precomputed; sliders walk
//! their rays and stop at the first occupied square, which is itself
//! included in the attack set. Pawn attacks are the two forward
//! diagonals for the pawn's color regardless of occupancy.

use once_cell::sync::Lazy;

use super::{
    Board, Color, Square, BLACK_BIT, WHITE_BISHOP, WHITE_KING, WHITE_KNIGHT, WHITE_PAWN,
    WHITE_QUEEN, WHITE_ROOK,
};

const KNIGHT_DELTAS: [(isize, isize); 8] = [
    (2, 1),
    (1, 2),
    (-1, 2),
    (-2, 1),
    (-2, -1),
    (-1, -2),
    (1, -2),
    (2, -1),
];

const KING_DELTAS: [(isize, isize); 8] = [
    (1, 0),
    (-1, 0),
    (0, 1),
    (0, -1),
    (1, 1),
    (1, -1),
    (-1, 1),
    (-1, -1),
];

const BISHOP_RAYS: [(isize, isize); 4] = [(-1, 1), (1, 1), (1, -1), (-1, -1)];
const ROOK_RAYS: [(isize, isize); 4] = [(-1, 0), (1, 0), (0, 1), (0, -1)];

fn leaper_table(deltas: &[(isize, isize)]) -> [u64; 64] {
    let mut table = [0u64; 64];
    for (idx, slot) in table.iter_mut().enumerate() {
        let r = (idx / 8) as isize;
        let c = (idx % 8) as isize;
        let mut mask = 0u64;
        for &(dr, dc) in deltas {
            let nr = r + dr;
            let nc = c + dc;
            if (0..8).contains(&nr) && (0..8).contains(&nc) {
                mask |= 1u64 << (nr * 8 + nc);
            }
        }
        *slot = mask;
    }
    table
}

pub static KNIGHT_ATTACKS: Lazy<[u64; 64]> = Lazy::new(|| leaper_table(&KNIGHT_DELTAS));

pub static KING_ATTACKS: Lazy<[u64; 64]> = Lazy::new(|| leaper_table(&KING_DELTAS));

/// Pawn attack tables indexed `[color][square]`, white first. Row 0 is
/// rank 8, so white pawns attack toward smaller rows.
pub static PAWN_ATTACKS: Lazy<[[u64; 64]; 2]> = Lazy::new(|| {
    let mut white = [0u64; 64];
    let mut black = [0u64; 64];
    for idx in 0..64 {
        let r = (idx / 8) as isize;
        let c = (idx % 8) as isize;
        for dc in [-1, 1] {
            let nc = c + dc;
            if !(0..8).contains(&nc) {
                continue;
            }
            if r - 1 >= 0 {
                white[idx] |= 1u64 << ((r - 1) * 8 + nc);
            }
            if r + 1 < 8 {
                black[idx] |= 1u64 << ((r + 1) * 8 + nc);
            }
        }
    }
    [white, black]
});

fn ray_attacks(board: &Board, sq: Square, rays: &[(isize, isize)]) -> u64 {
    let mut mask = 0u64;
    for &(dr, dc) in rays {
        let mut r = sq.0 as isize + dr;
        let mut c = sq.1 as isize + dc;
        while (0..8).contains(&r) && (0..8).contains(&c) {
            let target = Square(r as usize, c as usize);
            mask |= target.bit();
            if !board.is_empty_at(target) {
                break;
            }
            r += dr;
            c += dc;
        }
    }
    mask
}

/// Squares attacked by the piece with `code` standing on `sq`.
///
/// Returns an empty bitboard for the empty code.
#[must_use]
pub fn piece_attacks(code: u8, board: &Board, sq: Square) -> u64 {
    let color_slot = usize::from(code & BLACK_BIT != 0);
    match code & !BLACK_BIT {
        WHITE_PAWN => PAWN_ATTACKS[color_slot][sq.index()],
        WHITE_KNIGHT => KNIGHT_ATTACKS[sq.index()],
        WHITE_BISHOP => ray_attacks(board, sq, &BISHOP_RAYS),
        WHITE_ROOK => ray_attacks(board, sq, &ROOK_RAYS),
        WHITE_QUEEN => {
            ray_attacks(board, sq, &BISHOP_RAYS) | ray_attacks(board, sq, &ROOK_RAYS)
        }
        WHITE_KING => KING_ATTACKS[sq.index()],
        _ => 0,
    }
}

/// Union of the attack squares of every piece of `color`, kings
/// included.
#[must_use]
pub fn side_attacks(board: &Board, color: Color) -> u64 {
    board
        .pieces()
        .filter(|&(_, code)| Color::of(code) == color)
        .fold(0u64, |acc, (sq, code)| acc | piece_attacks(code, board, sq))
}

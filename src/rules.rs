//! Thin adapter over the shakmaty rules library.
//!
//! The synthesizer emits castling rights without checking rook
//! placement, speculative en-passant targets, and material that no
//! real game could reach (say, nine pawns of one color), all of which
//! strict position validation rejects. Parsing here tolerates those
//! kinds of noise while still refusing genuinely broken positions,
//! such as a non-mover left in check.

use std::fmt;

use shakmaty::fen::Fen;
use shakmaty::uci::UciMove;
use shakmaty::{CastlingMode, Chess, EnPassantMode, Move, Position};

/// Error type for rules-library failures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RulesError {
    /// The FEN string did not parse
    InvalidFen,
    /// The position is unreachable or otherwise rejected
    IllegalPosition,
    /// A move string did not parse or is not legal here
    IllegalMove { mv: String },
}

impl fmt::Display for RulesError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RulesError::InvalidFen => write!(f, "invalid FEN"),
            RulesError::IllegalPosition => write!(f, "illegal position"),
            RulesError::IllegalMove { mv } => write!(f, "illegal move '{mv}'"),
        }
    }
}

impl std::error::Error for RulesError {}

/// Parse a FEN into a playable position.
pub fn position_from_fen(fen: &str) -> Result<Chess, RulesError> {
    let parsed: Fen = fen.parse().map_err(|_| RulesError::InvalidFen)?;
    parsed
        .into_position(CastlingMode::Standard)
        .or_else(|e| e.ignore_too_much_material())
        .or_else(|e| e.ignore_invalid_castling_rights())
        .or_else(|e| e.ignore_invalid_ep_square())
        .map_err(|_| RulesError::IllegalPosition)
}

/// Decode a long-algebraic move string, verify it is legal in `pos`,
/// and play it.
pub fn play_uci(pos: &mut Chess, mv: &str) -> Result<Move, RulesError> {
    let uci = UciMove::from_ascii(mv.as_bytes()).map_err(|_| RulesError::IllegalMove {
        mv: mv.to_string(),
    })?;
    let decoded = uci.to_move(pos).map_err(|_| RulesError::IllegalMove {
        mv: mv.to_string(),
    })?;
    pos.play_unchecked(&decoded);
    Ok(decoded)
}

/// Render a position back to FEN, with legality-filtered en passant.
#[must_use]
pub fn fen_of(pos: &Chess) -> String {
    Fen::from_position(pos.clone(), EnPassantMode::Legal).to_string()
}

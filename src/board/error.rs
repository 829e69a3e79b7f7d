//! Error types for FEN handling.

use std::fmt;

/// Error type for FEN parsing failures
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FenError {
    /// FEN string has too few fields (needs at least 4)
    TooFewFields { found: usize },
    /// Wrong number of ranks in the placement field
    BadRankCount { found: usize },
    /// A rank describes more or fewer than 8 files
    BadFileCount { rank: usize, files: usize },
    /// Invalid piece character in the placement field
    InvalidPiece { ch: char },
    /// Invalid side to move (must be 'w' or 'b')
    InvalidSideToMove { found: String },
    /// Invalid castling character
    InvalidCastling { ch: char },
    /// Invalid en passant square
    InvalidEnPassant { found: String },
}

impl fmt::Display for FenError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FenError::TooFewFields { found } => {
                write!(f, "FEN must have at least 4 fields, found {found}")
            }
            FenError::BadRankCount { found } => {
                write!(f, "FEN placement must have 8 ranks, found {found}")
            }
            FenError::BadFileCount { rank, files } => {
                write!(f, "rank {rank} describes {files} files, expected 8")
            }
            FenError::InvalidPiece { ch } => {
                write!(f, "invalid piece character '{ch}' in FEN")
            }
            FenError::InvalidSideToMove { found } => {
                write!(f, "invalid side to move '{found}', expected 'w' or 'b'")
            }
            FenError::InvalidCastling { ch } => {
                write!(f, "invalid castling character '{ch}' in FEN")
            }
            FenError::InvalidEnPassant { found } => {
                write!(f, "invalid en passant square '{found}'")
            }
        }
    }
}

impl std::error::Error for FenError {}
